//! Chat-completion client
//!
//! A thin client for OpenAI-compatible chat APIs, used by the moderation
//! and summarization workers. Domain crates depend on the [`ChatModel`]
//! trait so tests can swap in scripted models.

mod error;
mod model;
mod openai;

pub use error::{AiError, AiResult};
pub use model::{ChatCompletion, ChatModel, ChatRequest};
pub use openai::{AiConfig, OpenAiChatModel};
