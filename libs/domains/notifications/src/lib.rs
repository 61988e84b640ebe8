//! Mail Notifications Domain
//!
//! Consumes mail tasks and delivers them through an SMTP relay. Mails
//! carrying a `mail_id` are de-duplicated against the platform's
//! delivery ledger so broker redeliveries never send twice.

pub mod error;
pub mod handler;
pub mod models;
pub mod provider;
pub mod store;

// Re-export commonly used types
pub use error::{NotificationsError, NotificationsResult};
pub use handler::MailHandler;
pub use models::{MailAttachment, MailTask};
pub use provider::{MailProvider, SendReceipt, SmtpConfig, SmtpMailer};
pub use store::{HttpMailStore, MailStore};
