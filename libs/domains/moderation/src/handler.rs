use ai_client::{ChatModel, ChatRequest};
use amqp_worker::{TaskError, TaskHandler, TaskOutcome};
use async_trait::async_trait;

use crate::error::ModerationError;
use crate::models::{parse_verdict, Comment, CommentStatus, ModerationTask, ModerationVerdict};
use crate::store::CommentStore;

const SYSTEM_PROMPT: &str = "You are the comment moderator for a personal blog. \
Judge whether the comment should be published. Reject spam, link farming, abuse, \
and bare advertising; approve genuine discussion, including critical comments. \
Reply with a single JSON object: {\"verdict\": \"approve\" or \"reject\", \
\"reason\": \"one short sentence\"}.";

const MAX_VERDICT_TOKENS: u32 = 256;

/// Moderates pending comments with an AI verdict.
pub struct ModerationHandler<S, M> {
    store: S,
    model: M,
}

impl<S, M> ModerationHandler<S, M> {
    pub fn new(store: S, model: M) -> Self {
        Self { store, model }
    }
}

#[async_trait]
impl<S, M> TaskHandler for ModerationHandler<S, M>
where
    S: CommentStore,
    M: ChatModel,
{
    type Payload = ModerationTask;

    fn name(&self) -> &str {
        "moderation"
    }

    async fn handle(&self, task: ModerationTask) -> Result<TaskOutcome, TaskError> {
        if task.comment_id <= 0 {
            return Err(TaskError::payload(format!(
                "comment_id must be positive, got {}",
                task.comment_id
            )));
        }

        let Some(comment) = self.store.get_comment(task.comment_id).await? else {
            tracing::info!(comment_id = task.comment_id, "Comment gone, nothing to moderate");
            return Ok(TaskOutcome::skipped("comment not found"));
        };

        if comment.status != CommentStatus::Pending && !task.force {
            return Ok(TaskOutcome::skipped("comment already moderated"));
        }

        let request = ChatRequest::new(moderation_prompt(&comment))
            .with_system(SYSTEM_PROMPT)
            .with_temperature(0.0)
            .with_max_tokens(MAX_VERDICT_TOKENS);

        let completion = self
            .model
            .complete(request)
            .await
            .map_err(ModerationError::Ai)?;

        let (verdict, reason) = parse_verdict(&completion.content)?;
        let record = ModerationVerdict {
            verdict,
            reason,
            model: completion.model,
        };

        self.store.save_verdict(comment.id, &record).await?;

        tracing::info!(
            comment_id = comment.id,
            verdict = %record.verdict,
            "Comment moderated"
        );
        Ok(TaskOutcome::Completed)
    }
}

fn moderation_prompt(comment: &Comment) -> String {
    format!("Author: {}\n\nComment:\n{}", comment.author, comment.body)
}
