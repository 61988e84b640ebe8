use amqp_worker::{TaskError, TaskHandler, TaskOutcome};
use async_trait::async_trait;

use crate::error::CallbacksError;
use crate::models::CallbackTask;
use crate::sender::CallbackSender;
use crate::store::CallbackStore;

/// Relays platform events to subscriber webhooks.
///
/// Delivery is at-least-once: the ledger is written after the
/// subscriber accepts, so a crash between the two can produce a
/// duplicate delivery, never a lost one. A `410 Gone` from the
/// subscriber is treated as an unsubscribe, not a failure.
pub struct CallbackHandler<S, C> {
    store: S,
    sender: C,
}

impl<S, C> CallbackHandler<S, C> {
    pub fn new(store: S, sender: C) -> Self {
        Self { store, sender }
    }
}

#[async_trait]
impl<S, C> TaskHandler for CallbackHandler<S, C>
where
    S: CallbackStore,
    C: CallbackSender,
{
    type Payload = CallbackTask;

    fn name(&self) -> &str {
        "callbacks"
    }

    fn resource_key(&self, payload: &CallbackTask) -> Option<String> {
        Some(payload.callback_url.clone())
    }

    async fn handle(&self, task: CallbackTask) -> Result<TaskOutcome, TaskError> {
        if !is_http_url(&task.callback_url) {
            return Err(TaskError::payload(format!(
                "callback_url must be an absolute http(s) URL, got '{}'",
                task.callback_url
            )));
        }
        if task.event.trim().is_empty() {
            return Err(TaskError::payload("callback event must not be empty"));
        }

        if let Some(callback_id) = &task.callback_id {
            if self.store.was_delivered(callback_id).await? {
                tracing::info!(callback_id = %callback_id, "Callback already delivered, skipping");
                return Ok(TaskOutcome::skipped("callback already delivered"));
            }
        }

        let status = self
            .sender
            .deliver(&task.callback_url, &task.event, &task.payload)
            .await?;

        if status == 410 {
            tracing::info!(url = %task.callback_url, "Subscriber gone, dropping callback");
            return Ok(TaskOutcome::skipped("subscriber gone"));
        }
        if !(200..300).contains(&status) {
            return Err(CallbacksError::Rejected {
                url: task.callback_url,
                status,
            }
            .into());
        }

        if let Some(callback_id) = &task.callback_id {
            self.store.mark_delivered(callback_id).await?;
        }

        tracing::info!(
            url = %task.callback_url,
            event = %task.event,
            http_status = status,
            "Callback delivered"
        );
        Ok(TaskOutcome::Completed)
    }
}

fn is_http_url(s: &str) -> bool {
    s.starts_with("http://") || s.starts_with("https://")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sender::MockCallbackSender;
    use crate::store::MockCallbackStore;
    use serde_json::json;

    fn task(callback_id: Option<&str>) -> CallbackTask {
        CallbackTask {
            callback_url: "https://subscriber.example/hook".to_string(),
            event: "post.published".to_string(),
            payload: json!({"post_id": 42}),
            callback_id: callback_id.map(str::to_string),
        }
    }

    #[tokio::test]
    async fn test_delivers_and_marks() {
        let mut store = MockCallbackStore::new();
        store
            .expect_was_delivered()
            .withf(|id| id == "cb-9")
            .returning(|_| Ok(false));
        store
            .expect_mark_delivered()
            .withf(|id| id == "cb-9")
            .times(1)
            .returning(|_| Ok(()));

        let mut sender = MockCallbackSender::new();
        sender
            .expect_deliver()
            .withf(|url, event, payload| {
                url == "https://subscriber.example/hook"
                    && event == "post.published"
                    && payload["post_id"] == 42
            })
            .times(1)
            .returning(|_, _, _| Ok(200));

        let handler = CallbackHandler::new(store, sender);
        let outcome = handler.handle(task(Some("cb-9"))).await.unwrap();
        assert_eq!(outcome, TaskOutcome::Completed);
    }

    #[tokio::test]
    async fn test_duplicate_delivery_is_skipped() {
        let mut store = MockCallbackStore::new();
        store.expect_was_delivered().returning(|_| Ok(true));
        store.expect_mark_delivered().times(0);

        let mut sender = MockCallbackSender::new();
        sender.expect_deliver().times(0);

        let handler = CallbackHandler::new(store, sender);
        let outcome = handler.handle(task(Some("cb-9"))).await.unwrap();
        assert!(matches!(outcome, TaskOutcome::Skipped { .. }));
    }

    #[tokio::test]
    async fn test_anonymous_callback_skips_the_ledger() {
        let mut store = MockCallbackStore::new();
        store.expect_was_delivered().times(0);
        store.expect_mark_delivered().times(0);

        let mut sender = MockCallbackSender::new();
        sender.expect_deliver().returning(|_, _, _| Ok(204));

        let handler = CallbackHandler::new(store, sender);
        let outcome = handler.handle(task(None)).await.unwrap();
        assert_eq!(outcome, TaskOutcome::Completed);
    }

    #[tokio::test]
    async fn test_gone_subscriber_is_skipped_not_retried() {
        let mut store = MockCallbackStore::new();
        store.expect_was_delivered().returning(|_| Ok(false));
        store.expect_mark_delivered().times(0);

        let mut sender = MockCallbackSender::new();
        sender.expect_deliver().returning(|_, _, _| Ok(410));

        let handler = CallbackHandler::new(store, sender);
        let outcome = handler.handle(task(Some("cb-9"))).await.unwrap();
        match outcome {
            TaskOutcome::Skipped { reason } => assert!(reason.contains("gone")),
            other => panic!("expected skip, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_rejection_is_retryable_and_attributed() {
        let mut store = MockCallbackStore::new();
        store.expect_was_delivered().returning(|_| Ok(false));
        store.expect_mark_delivered().times(0);

        let mut sender = MockCallbackSender::new();
        sender.expect_deliver().returning(|_, _, _| Ok(503));

        let handler = CallbackHandler::new(store, sender);
        let err = handler.handle(task(Some("cb-9"))).await.unwrap_err();
        assert!(!err.is_permanent());
        assert_eq!(err.resource(), Some("https://subscriber.example/hook"));
    }

    #[tokio::test]
    async fn test_bad_url_is_payload_error() {
        let handler = CallbackHandler::new(MockCallbackStore::new(), MockCallbackSender::new());
        let err = handler
            .handle(CallbackTask {
                callback_url: "subscriber.example/hook".to_string(),
                ..task(None)
            })
            .await
            .unwrap_err();
        assert!(err.is_permanent());
    }

    #[tokio::test]
    async fn test_empty_event_is_payload_error() {
        let handler = CallbackHandler::new(MockCallbackStore::new(), MockCallbackSender::new());
        let err = handler
            .handle(CallbackTask {
                event: " ".to_string(),
                ..task(None)
            })
            .await
            .unwrap_err();
        assert!(err.is_permanent());
    }

    #[tokio::test]
    async fn test_resource_key_is_callback_url() {
        let handler = CallbackHandler::new(MockCallbackStore::new(), MockCallbackSender::new());
        assert_eq!(
            handler.resource_key(&task(None)),
            Some("https://subscriber.example/hook".to_string())
        );
    }
}
