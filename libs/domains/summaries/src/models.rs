use serde::{Deserialize, Serialize};

/// Queue payload enqueued when a post needs a summary.
#[derive(Debug, Clone, Deserialize)]
pub struct SummaryTask {
    pub post_id: i64,
    /// Preferred AI provider; advisory, the worker uses its configured
    /// model and records which one actually ran.
    pub provider: Option<String>,
    #[serde(default)]
    pub options: SummaryOptions,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SummaryOptions {
    /// Regenerate even if the post already has a summary.
    #[serde(default)]
    pub force: bool,
}

/// A blog post as served by the platform API.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Post {
    pub id: i64,
    pub title: String,
    pub body: String,
    pub summary: Option<String>,
}

/// Persisted outcome of a summarization run.
#[derive(Debug, Clone, Serialize)]
pub struct PostSummary {
    pub summary: String,
    pub model: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_task_options_default() {
        let task: SummaryTask = serde_json::from_str(r#"{"post_id": 3}"#).unwrap();
        assert_eq!(task.post_id, 3);
        assert!(task.provider.is_none());
        assert!(!task.options.force);
    }

    #[test]
    fn test_task_with_force() {
        let task: SummaryTask =
            serde_json::from_str(r#"{"post_id": 3, "provider": "openai", "options": {"force": true}}"#)
                .unwrap();
        assert_eq!(task.provider.as_deref(), Some("openai"));
        assert!(task.options.force);
    }
}
