use amqp_worker::TaskError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LinksError {
    #[error("Link store error: {0}")]
    Store(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Transport-level failure reaching an external site or peer API
    /// (DNS, refused connection, timeout). Carries the target so the
    /// circuit breaker can attribute the failure.
    #[error("'{url}' unreachable: {message}")]
    Unreachable { url: String, message: String },

    /// The peer API answered but refused the request.
    #[error("Peer '{peer_api}' rejected the request with status {status}")]
    PeerRejected { peer_api: String, status: u16 },
}

pub type LinksResult<T> = Result<T, LinksError>;

impl From<LinksError> for TaskError {
    fn from(err: LinksError) -> Self {
        match &err {
            LinksError::Unreachable { url, .. } => {
                let resource = url.clone();
                TaskError::downstream_for(resource, err.to_string()).with_source(err)
            }
            LinksError::PeerRejected { peer_api, .. } => {
                let resource = peer_api.clone();
                TaskError::downstream_for(resource, err.to_string()).with_source(err)
            }
            _ => TaskError::downstream(err.to_string()).with_source(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unreachable_carries_resource() {
        let err = LinksError::Unreachable {
            url: "https://peer.example".to_string(),
            message: "connection refused".to_string(),
        };
        let task_err: TaskError = err.into();
        assert_eq!(task_err.resource(), Some("https://peer.example"));
        assert!(!task_err.is_permanent());
    }

    #[test]
    fn test_peer_rejection_carries_resource() {
        let err = LinksError::PeerRejected {
            peer_api: "https://peer.example/api".to_string(),
            status: 500,
        };
        let task_err: TaskError = err.into();
        assert_eq!(task_err.resource(), Some("https://peer.example/api"));
    }

    #[test]
    fn test_store_error_has_no_resource() {
        let task_err: TaskError = LinksError::Store("save failed".to_string()).into();
        assert!(task_err.resource().is_none());
    }
}
