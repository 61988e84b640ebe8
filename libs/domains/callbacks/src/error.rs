use amqp_worker::TaskError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CallbacksError {
    #[error("Callback store error: {0}")]
    Store(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Transport-level failure reaching the subscriber.
    #[error("'{url}' unreachable: {message}")]
    Unreachable { url: String, message: String },

    /// The subscriber answered but refused the delivery.
    #[error("Subscriber '{url}' rejected the callback with status {status}")]
    Rejected { url: String, status: u16 },
}

pub type CallbacksResult<T> = Result<T, CallbacksError>;

impl From<CallbacksError> for TaskError {
    fn from(err: CallbacksError) -> Self {
        match &err {
            CallbacksError::Unreachable { url, .. } | CallbacksError::Rejected { url, .. } => {
                let resource = url.clone();
                TaskError::downstream_for(resource, err.to_string()).with_source(err)
            }
            _ => TaskError::downstream(err.to_string()).with_source(err),
        }
    }
}
