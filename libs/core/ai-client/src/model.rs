use async_trait::async_trait;

use crate::error::AiResult;

/// A single chat-completion request.
#[derive(Debug, Clone, PartialEq)]
pub struct ChatRequest {
    pub system: Option<String>,
    pub prompt: String,
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
}

impl ChatRequest {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            system: None,
            prompt: prompt.into(),
            temperature: None,
            max_tokens: None,
        }
    }

    pub fn with_system(mut self, system: impl Into<String>) -> Self {
        self.system = Some(system.into());
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }
}

/// A completed chat response.
#[derive(Debug, Clone, PartialEq)]
pub struct ChatCompletion {
    pub content: String,
    pub model: String,
    pub tokens_used: u32,
}

/// Trait for chat-completion backends
///
/// Implementations can target any OpenAI-compatible completion API.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ChatModel: Send + Sync {
    /// Run one completion round-trip.
    async fn complete(&self, request: ChatRequest) -> AiResult<ChatCompletion>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_builder() {
        let request = ChatRequest::new("Summarize this post")
            .with_system("You are an editor")
            .with_temperature(0.2)
            .with_max_tokens(512);

        assert_eq!(request.prompt, "Summarize this post");
        assert_eq!(request.system.as_deref(), Some("You are an editor"));
        assert_eq!(request.temperature, Some(0.2));
        assert_eq!(request.max_tokens, Some(512));
    }

    #[tokio::test]
    async fn test_mock_model() {
        let mut model = MockChatModel::new();
        model.expect_complete().returning(|_| {
            Ok(ChatCompletion {
                content: "ok".to_string(),
                model: "test".to_string(),
                tokens_used: 3,
            })
        });

        let completion = model.complete(ChatRequest::new("hi")).await.unwrap();
        assert_eq!(completion.content, "ok");
    }
}
