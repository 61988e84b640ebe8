//! Callback Relay Domain
//!
//! Consumes callback tasks and POSTs platform events to subscriber
//! webhooks. Deliveries carrying a `callback_id` are de-duplicated
//! against the platform's ledger; failures are attributed to the
//! subscriber URL so the circuit breaker can quiet dead endpoints.

pub mod error;
pub mod handler;
pub mod models;
pub mod sender;
pub mod store;

// Re-export commonly used types
pub use error::{CallbacksError, CallbacksResult};
pub use handler::CallbackHandler;
pub use models::{CallbackEnvelope, CallbackTask};
pub use sender::{CallbackSender, HttpCallbackSender};
pub use store::{CallbackStore, HttpCallbackStore};
