use serde::{Deserialize, Serialize};

/// Queue payload for one webhook delivery.
#[derive(Debug, Clone, Deserialize)]
pub struct CallbackTask {
    pub callback_url: String,
    /// Event name, e.g. `post.published` or `comment.approved`.
    pub event: String,
    pub payload: serde_json::Value,
    /// Platform-side identifier used to de-duplicate deliveries across
    /// redeliveries. Absent for fire-and-forget callbacks.
    pub callback_id: Option<String>,
}

/// The JSON envelope POSTed to the subscriber.
#[derive(Debug, Serialize)]
pub struct CallbackEnvelope<'a> {
    pub event: &'a str,
    pub payload: &'a serde_json::Value,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_task_deserializes() {
        let task: CallbackTask = serde_json::from_str(
            r#"{
                "callback_url": "https://subscriber.example/hook",
                "event": "post.published",
                "payload": {"post_id": 42},
                "callback_id": "cb-9"
            }"#,
        )
        .unwrap();
        assert_eq!(task.event, "post.published");
        assert_eq!(task.payload["post_id"], 42);
        assert_eq!(task.callback_id.as_deref(), Some("cb-9"));
    }

    #[test]
    fn test_envelope_shape() {
        let payload = serde_json::json!({"post_id": 42});
        let envelope = CallbackEnvelope {
            event: "post.published",
            payload: &payload,
        };
        let rendered = serde_json::to_value(&envelope).unwrap();
        assert_eq!(rendered["event"], "post.published");
        assert_eq!(rendered["payload"]["post_id"], 42);
    }
}
