//! Comment Moderation Domain
//!
//! Consumes moderation tasks and decides whether a pending blog comment
//! gets published. The verdict comes from a chat model; the comment
//! itself lives behind the platform API.
//!
//! # Usage
//!
//! ```rust,no_run
//! use ai_client::OpenAiChatModel;
//! use core_config::{platform::PlatformApiConfig, FromEnv};
//! use domain_moderation::{HttpCommentStore, ModerationHandler};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let store = HttpCommentStore::new(PlatformApiConfig::from_env()?)?;
//! let model = OpenAiChatModel::from_env()?;
//! let handler = ModerationHandler::new(store, model);
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod handler;
pub mod models;
pub mod store;

// Re-export commonly used types
pub use error::{ModerationError, ModerationResult};
pub use handler::ModerationHandler;
pub use models::{Comment, CommentStatus, ModerationTask, ModerationVerdict, Verdict};
pub use store::{CommentStore, HttpCommentStore};
