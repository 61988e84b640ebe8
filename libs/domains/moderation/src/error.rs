use ai_client::AiError;
use amqp_worker::TaskError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ModerationError {
    #[error("Comment store error: {0}")]
    Store(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("AI provider error: {0}")]
    Ai(#[from] AiError),

    #[error("Unusable model verdict: {0}")]
    InvalidVerdict(String),
}

pub type ModerationResult<T> = Result<T, ModerationError>;

/// Everything here is an external failure. Store/API errors, provider
/// errors, and a garbled model reply are all worth another attempt, so
/// they map to the retryable side of the task contract.
impl From<ModerationError> for TaskError {
    fn from(err: ModerationError) -> Self {
        TaskError::downstream(err.to_string()).with_source(err)
    }
}
