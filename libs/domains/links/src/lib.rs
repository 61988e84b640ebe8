//! Link Exchange Domain
//!
//! Four workers keep the blogroll honest:
//!
//! - **audit** checks that a link still resolves and records the status
//! - **connect** introduces this site to a peer and records the peer
//! - **push** delivers link updates to peers that already know us
//! - **monitor** watches a URL for reachability and backlinks
//!
//! Outbound HTTP to other sites goes through [`PeerClient`]; link
//! records live behind the platform API via [`LinkStore`]. Failures
//! against a peer are attributed to its URL so the circuit breaker can
//! stop retry storms against dead sites.

pub mod error;
pub mod handlers;
pub mod models;
pub mod peer;
pub mod store;

// Re-export commonly used types
pub use error::{LinksError, LinksResult};
pub use handlers::{AuditHandler, ConnectHandler, MonitorHandler, PushHandler};
pub use models::{
    AuditOutcome, AuditTask, ConnectTask, ExchangeRequest, Link, MonitorReport, MonitorTask,
    PeerLink, PushDelivery, PushTask, SiteIdentity,
};
pub use peer::{HttpPeerClient, PageProbe, PeerClient};
pub use store::{HttpLinkStore, LinkStore};
