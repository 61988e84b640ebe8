//! Post Summarization Domain
//!
//! Consumes summary tasks and writes a short AI-generated summary back
//! to the post record. Summaries are only generated once unless the
//! task forces a refresh.

pub mod error;
pub mod handler;
pub mod models;
pub mod store;

// Re-export commonly used types
pub use error::{SummariesError, SummariesResult};
pub use handler::SummariesHandler;
pub use models::{Post, PostSummary, SummaryOptions, SummaryTask};
pub use store::{HttpPostStore, PostStore};
