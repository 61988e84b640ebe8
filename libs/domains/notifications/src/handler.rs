use amqp_worker::{TaskError, TaskHandler, TaskOutcome};
use async_trait::async_trait;

use crate::models::MailTask;
use crate::provider::MailProvider;
use crate::store::MailStore;

/// Delivers queued mail through a [`MailProvider`].
///
/// Delivery is at-least-once: the ledger is written after the relay
/// accepts the message, so a crash between the two can produce a
/// duplicate mail, never a lost one.
pub struct MailHandler<S, P> {
    store: S,
    provider: P,
}

impl<S, P> MailHandler<S, P> {
    pub fn new(store: S, provider: P) -> Self {
        Self { store, provider }
    }
}

#[async_trait]
impl<S, P> TaskHandler for MailHandler<S, P>
where
    S: MailStore,
    P: MailProvider,
{
    type Payload = MailTask;

    fn name(&self) -> &str {
        "mail"
    }

    async fn handle(&self, task: MailTask) -> Result<TaskOutcome, TaskError> {
        if task.to.trim().is_empty() {
            return Err(TaskError::payload("mail recipient must not be empty"));
        }
        if task.subject.trim().is_empty() {
            return Err(TaskError::payload("mail subject must not be empty"));
        }
        if task.html.is_none() && task.text.is_none() {
            return Err(TaskError::payload("mail needs an html or text body"));
        }

        if let Some(mail_id) = &task.mail_id {
            if self.store.was_sent(mail_id).await? {
                tracing::info!(mail_id = %mail_id, "Mail already delivered, skipping");
                return Ok(TaskOutcome::skipped("mail already sent"));
            }
        }

        let receipt = self.provider.send(&task).await?;

        if let Some(mail_id) = &task.mail_id {
            self.store.mark_sent(mail_id).await?;
        }

        tracing::info!(
            to = %task.to,
            provider = self.provider.name(),
            relay_message_id = ?receipt.relay_message_id,
            "Mail delivered"
        );
        Ok(TaskOutcome::Completed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::NotificationsError;
    use crate::provider::{MockMailProvider, SendReceipt};
    use crate::store::MockMailStore;

    fn task(mail_id: Option<&str>) -> MailTask {
        MailTask {
            to: "reader@example.com".to_string(),
            subject: "Weekly digest".to_string(),
            html: None,
            text: Some("hello".to_string()),
            mail_id: mail_id.map(str::to_string),
            attachments: vec![],
        }
    }

    fn accepting_provider() -> MockMailProvider {
        let mut provider = MockMailProvider::new();
        provider.expect_send().returning(|_| {
            Ok(SendReceipt {
                relay_message_id: Some("250-ok".to_string()),
            })
        });
        provider.expect_name().return_const("smtp");
        provider
    }

    #[tokio::test]
    async fn test_sends_and_marks_delivered() {
        let mut store = MockMailStore::new();
        store
            .expect_was_sent()
            .withf(|id| id == "mail-1")
            .returning(|_| Ok(false));
        store
            .expect_mark_sent()
            .withf(|id| id == "mail-1")
            .times(1)
            .returning(|_| Ok(()));

        let handler = MailHandler::new(store, accepting_provider());
        let outcome = handler.handle(task(Some("mail-1"))).await.unwrap();
        assert_eq!(outcome, TaskOutcome::Completed);
    }

    #[tokio::test]
    async fn test_duplicate_delivery_is_skipped() {
        let mut store = MockMailStore::new();
        store.expect_was_sent().returning(|_| Ok(true));
        store.expect_mark_sent().times(0);

        let mut provider = MockMailProvider::new();
        provider.expect_send().times(0);

        let handler = MailHandler::new(store, provider);
        let outcome = handler.handle(task(Some("mail-1"))).await.unwrap();
        match outcome {
            TaskOutcome::Skipped { reason } => assert!(reason.contains("already")),
            other => panic!("expected skip, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_anonymous_mail_skips_the_ledger() {
        let mut store = MockMailStore::new();
        store.expect_was_sent().times(0);
        store.expect_mark_sent().times(0);

        let handler = MailHandler::new(store, accepting_provider());
        let outcome = handler.handle(task(None)).await.unwrap();
        assert_eq!(outcome, TaskOutcome::Completed);
    }

    #[tokio::test]
    async fn test_missing_body_is_payload_error() {
        let handler = MailHandler::new(MockMailStore::new(), MockMailProvider::new());
        let mut bad = task(None);
        bad.text = None;

        let err = handler.handle(bad).await.unwrap_err();
        assert!(err.is_permanent());
    }

    #[tokio::test]
    async fn test_blank_recipient_is_payload_error() {
        let handler = MailHandler::new(MockMailStore::new(), MockMailProvider::new());
        let mut bad = task(None);
        bad.to = "  ".to_string();

        let err = handler.handle(bad).await.unwrap_err();
        assert!(err.is_permanent());
    }

    #[tokio::test]
    async fn test_relay_failure_is_retryable_and_not_marked() {
        let mut store = MockMailStore::new();
        store.expect_was_sent().returning(|_| Ok(false));
        store.expect_mark_sent().times(0);

        let mut provider = MockMailProvider::new();
        provider
            .expect_send()
            .returning(|_| Err(NotificationsError::Smtp("451 relay busy".to_string())));

        let handler = MailHandler::new(store, provider);
        let err = handler.handle(task(Some("mail-1"))).await.unwrap_err();
        assert!(!err.is_permanent());
    }
}
