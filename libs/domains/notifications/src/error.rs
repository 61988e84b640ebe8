use amqp_worker::TaskError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum NotificationsError {
    #[error("Mail store error: {0}")]
    Store(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// A recipient address from the payload does not parse. Permanent;
    /// redelivering the same address cannot succeed.
    #[error("Invalid recipient address: {0}")]
    InvalidAddress(String),

    /// The configured sender address does not parse. Retryable so the
    /// message survives to the DLQ while the configuration gets fixed.
    #[error("Invalid sender configuration: {0}")]
    BadSender(String),

    #[error("Mail has neither an html nor a text body")]
    EmptyBody,

    #[error("Failed to compose message: {0}")]
    Compose(#[from] lettre::error::Error),

    #[error("SMTP delivery failed: {0}")]
    Smtp(String),
}

pub type NotificationsResult<T> = Result<T, NotificationsError>;

impl From<NotificationsError> for TaskError {
    fn from(err: NotificationsError) -> Self {
        match err {
            NotificationsError::InvalidAddress(_) | NotificationsError::EmptyBody => {
                TaskError::payload(err.to_string())
            }
            other => TaskError::downstream(other.to_string()).with_source(other),
        }
    }
}
