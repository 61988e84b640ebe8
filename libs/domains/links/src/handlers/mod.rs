pub mod audit;
pub mod connect;
pub mod monitor;
pub mod push;

pub use audit::AuditHandler;
pub use connect::ConnectHandler;
pub use monitor::MonitorHandler;
pub use push::PushHandler;

/// Payload URLs must be absolute; relative paths or bare hosts are a
/// producer bug, not something to retry.
pub(crate) fn is_http_url(s: &str) -> bool {
    s.starts_with("http://") || s.starts_with("https://")
}
