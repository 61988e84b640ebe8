use amqp_worker::TaskError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PagesError {
    #[error("Page store error: {0}")]
    Store(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Render failed for '{path}': {message}")]
    Render { path: String, message: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The store handed back a path that would escape the output root.
    #[error("Refusing to write outside the output root: '{0}'")]
    BadPath(String),
}

pub type PagesResult<T> = Result<T, PagesError>;

impl From<PagesError> for TaskError {
    fn from(err: PagesError) -> Self {
        TaskError::downstream(err.to_string()).with_source(err)
    }
}
