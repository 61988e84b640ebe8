use ai_client::{ChatModel, ChatRequest};
use amqp_worker::{TaskError, TaskHandler, TaskOutcome};
use async_trait::async_trait;

use crate::error::SummariesError;
use crate::models::{Post, PostSummary, SummaryTask};
use crate::store::PostStore;

const SYSTEM_PROMPT: &str = "You summarize blog posts for a preview box. \
Write two or three plain sentences covering what the post is about and its \
main takeaway. No markdown, no quotes around the text, no 'this post' framing.";

const MAX_SUMMARY_TOKENS: u32 = 400;

/// Posts longer than this are truncated before prompting. Keeps the
/// request inside the provider's context window for very long articles.
const MAX_BODY_CHARS: usize = 12_000;

/// Generates and persists AI summaries for blog posts.
pub struct SummariesHandler<S, M> {
    store: S,
    model: M,
}

impl<S, M> SummariesHandler<S, M> {
    pub fn new(store: S, model: M) -> Self {
        Self { store, model }
    }
}

#[async_trait]
impl<S, M> TaskHandler for SummariesHandler<S, M>
where
    S: PostStore,
    M: ChatModel,
{
    type Payload = SummaryTask;

    fn name(&self) -> &str {
        "summaries"
    }

    async fn handle(&self, task: SummaryTask) -> Result<TaskOutcome, TaskError> {
        if task.post_id <= 0 {
            return Err(TaskError::payload(format!(
                "post_id must be positive, got {}",
                task.post_id
            )));
        }

        let Some(post) = self.store.get_post(task.post_id).await? else {
            tracing::info!(post_id = task.post_id, "Post gone, nothing to summarize");
            return Ok(TaskOutcome::skipped("post not found"));
        };

        if post.summary.is_some() && !task.options.force {
            return Ok(TaskOutcome::skipped("post already summarized"));
        }

        if post.body.trim().is_empty() {
            return Ok(TaskOutcome::skipped("post has no content"));
        }

        if let Some(provider) = &task.provider {
            tracing::debug!(post_id = post.id, provider = %provider, "Provider hint on task");
        }

        let request = ChatRequest::new(summary_prompt(&post))
            .with_system(SYSTEM_PROMPT)
            .with_temperature(0.3)
            .with_max_tokens(MAX_SUMMARY_TOKENS);

        let completion = self
            .model
            .complete(request)
            .await
            .map_err(SummariesError::Ai)?;

        let summary = completion.content.trim();
        if summary.is_empty() {
            return Err(SummariesError::EmptySummary.into());
        }

        let record = PostSummary {
            summary: summary.to_string(),
            model: completion.model,
        };
        self.store.save_summary(post.id, &record).await?;

        tracing::info!(
            post_id = post.id,
            model = %record.model,
            chars = record.summary.len(),
            "Post summarized"
        );
        Ok(TaskOutcome::Completed)
    }
}

fn summary_prompt(post: &Post) -> String {
    let body: String = post.body.chars().take(MAX_BODY_CHARS).collect();
    format!("Title: {}\n\n{}", post.title, body)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::SummaryOptions;
    use crate::store::MockPostStore;
    use ai_client::{AiResult, ChatCompletion};

    struct CannedModel {
        reply: &'static str,
    }

    #[async_trait]
    impl ChatModel for CannedModel {
        async fn complete(&self, _request: ChatRequest) -> AiResult<ChatCompletion> {
            Ok(ChatCompletion {
                content: self.reply.to_string(),
                model: "gpt-test".to_string(),
                tokens_used: 30,
            })
        }
    }

    fn task(post_id: i64, force: bool) -> SummaryTask {
        SummaryTask {
            post_id,
            provider: None,
            options: SummaryOptions { force },
        }
    }

    fn post(id: i64, summary: Option<&str>) -> Post {
        Post {
            id,
            title: "On writing queues".to_string(),
            body: "A long body about message queues and their failure modes.".to_string(),
            summary: summary.map(str::to_string),
        }
    }

    #[tokio::test]
    async fn test_summarizes_post_without_summary() {
        let mut store = MockPostStore::new();
        store
            .expect_get_post()
            .returning(|id| Ok(Some(post(id, None))));
        store
            .expect_save_summary()
            .withf(|id, record| {
                *id == 3 && record.summary == "A practical tour of queue failure modes."
            })
            .times(1)
            .returning(|_, _| Ok(()));

        let handler = SummariesHandler::new(
            store,
            CannedModel {
                reply: "  A practical tour of queue failure modes.  ",
            },
        );

        let outcome = handler.handle(task(3, false)).await.unwrap();
        assert_eq!(outcome, TaskOutcome::Completed);
    }

    #[tokio::test]
    async fn test_existing_summary_is_skipped() {
        let mut store = MockPostStore::new();
        store
            .expect_get_post()
            .returning(|id| Ok(Some(post(id, Some("already here")))));
        store.expect_save_summary().times(0);

        let handler = SummariesHandler::new(store, CannedModel { reply: "fresh" });

        let outcome = handler.handle(task(3, false)).await.unwrap();
        match outcome {
            TaskOutcome::Skipped { reason } => assert!(reason.contains("already")),
            other => panic!("expected skip, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_force_regenerates_existing_summary() {
        let mut store = MockPostStore::new();
        store
            .expect_get_post()
            .returning(|id| Ok(Some(post(id, Some("stale")))));
        store
            .expect_save_summary()
            .times(1)
            .returning(|_, _| Ok(()));

        let handler = SummariesHandler::new(store, CannedModel { reply: "fresh take" });

        let outcome = handler.handle(task(3, true)).await.unwrap();
        assert_eq!(outcome, TaskOutcome::Completed);
    }

    #[tokio::test]
    async fn test_missing_post_is_skipped() {
        let mut store = MockPostStore::new();
        store.expect_get_post().returning(|_| Ok(None));
        store.expect_save_summary().times(0);

        let handler = SummariesHandler::new(store, CannedModel { reply: "unused" });

        let outcome = handler.handle(task(404, false)).await.unwrap();
        assert!(matches!(outcome, TaskOutcome::Skipped { .. }));
    }

    #[tokio::test]
    async fn test_empty_post_body_is_skipped() {
        let mut store = MockPostStore::new();
        store.expect_get_post().returning(|id| {
            Ok(Some(Post {
                id,
                title: "Draft".to_string(),
                body: "   ".to_string(),
                summary: None,
            }))
        });
        store.expect_save_summary().times(0);

        let handler = SummariesHandler::new(store, CannedModel { reply: "unused" });

        let outcome = handler.handle(task(5, false)).await.unwrap();
        match outcome {
            TaskOutcome::Skipped { reason } => assert!(reason.contains("no content")),
            other => panic!("expected skip, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_blank_model_reply_is_retryable() {
        let mut store = MockPostStore::new();
        store
            .expect_get_post()
            .returning(|id| Ok(Some(post(id, None))));
        store.expect_save_summary().times(0);

        let handler = SummariesHandler::new(store, CannedModel { reply: "   " });

        let err = handler.handle(task(3, false)).await.unwrap_err();
        assert!(!err.is_permanent());
    }

    #[tokio::test]
    async fn test_invalid_post_id_is_payload_error() {
        let handler = SummariesHandler::new(MockPostStore::new(), CannedModel { reply: "x" });

        let err = handler.handle(task(-1, false)).await.unwrap_err();
        assert!(err.is_permanent());
    }
}
