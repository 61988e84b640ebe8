use serde::Deserialize;

/// Queue payload for one outgoing mail.
#[derive(Debug, Clone, Deserialize)]
pub struct MailTask {
    pub to: String,
    pub subject: String,
    pub html: Option<String>,
    pub text: Option<String>,
    /// Platform-side identifier used to de-duplicate deliveries across
    /// redeliveries. Absent for fire-and-forget mail.
    pub mail_id: Option<String>,
    #[serde(default)]
    pub attachments: Vec<MailAttachment>,
}

/// A file already hosted by the platform, linked at the bottom of the
/// message. The relay never embeds file contents.
#[derive(Debug, Clone, Deserialize)]
pub struct MailAttachment {
    pub filename: String,
    pub url: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minimal_mail_task() {
        let task: MailTask = serde_json::from_str(
            r#"{"to": "reader@example.com", "subject": "Hi", "text": "hello"}"#,
        )
        .unwrap();
        assert_eq!(task.to, "reader@example.com");
        assert!(task.html.is_none());
        assert!(task.mail_id.is_none());
        assert!(task.attachments.is_empty());
    }

    #[test]
    fn test_mail_task_with_attachments() {
        let task: MailTask = serde_json::from_str(
            r#"{
                "to": "reader@example.com",
                "subject": "Your export",
                "html": "<p>done</p>",
                "mail_id": "mail-123",
                "attachments": [{"filename": "export.zip", "url": "https://quill.example/files/export.zip"}]
            }"#,
        )
        .unwrap();
        assert_eq!(task.mail_id.as_deref(), Some("mail-123"));
        assert_eq!(task.attachments.len(), 1);
        assert_eq!(task.attachments[0].filename, "export.zip");
    }
}
