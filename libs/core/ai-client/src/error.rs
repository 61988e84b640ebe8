use thiserror::Error;

pub type AiResult<T> = Result<T, AiError>;

#[derive(Debug, Error)]
pub enum AiError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("AI API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("AI API returned no completion")]
    EmptyResponse,

    #[error("Configuration error: {0}")]
    Config(String),
}

impl AiError {
    /// Whether a retry against the same endpoint could plausibly succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            AiError::Http(e) => e.is_timeout() || e.is_connect() || e.is_request(),
            AiError::Api { status, .. } => *status == 429 || *status >= 500,
            AiError::EmptyResponse => true,
            AiError::Config(_) => false,
        }
    }
}
