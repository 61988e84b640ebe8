use ai_client::AiError;
use amqp_worker::TaskError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SummariesError {
    #[error("Post store error: {0}")]
    Store(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("AI provider error: {0}")]
    Ai(#[from] AiError),

    #[error("Model returned an empty summary")]
    EmptySummary,
}

pub type SummariesResult<T> = Result<T, SummariesError>;

impl From<SummariesError> for TaskError {
    fn from(err: SummariesError) -> Self {
        TaskError::downstream(err.to_string()).with_source(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_summary_is_retryable() {
        let task_err: TaskError = SummariesError::EmptySummary.into();
        assert!(!task_err.is_permanent());
    }
}
