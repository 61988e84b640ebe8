use async_trait::async_trait;
use core_config::{env_or_default, env_parse_or_default, env_required, ConfigError, FromEnv};
use lettre::{
    message::{header::ContentType, Mailbox, MultiPart, SinglePart},
    transport::smtp::authentication::Credentials,
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};

use crate::error::{NotificationsError, NotificationsResult};
use crate::models::{MailAttachment, MailTask};

/// Outcome of a delivery attempt.
#[derive(Debug)]
pub struct SendReceipt {
    /// Message id reported by the relay, when it gives one.
    pub relay_message_id: Option<String>,
}

/// Something that can deliver one mail.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MailProvider: Send + Sync {
    async fn send(&self, mail: &MailTask) -> NotificationsResult<SendReceipt>;

    fn name(&self) -> &'static str;
}

/// SMTP relay configuration.
#[derive(Clone)]
pub struct SmtpConfig {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    pub from_email: String,
    pub from_name: String,
    pub use_tls: bool,
}

impl FromEnv for SmtpConfig {
    fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            host: env_required("SMTP_HOST")?,
            port: env_parse_or_default("SMTP_PORT", 587)?,
            username: env_or_default("SMTP_USERNAME", ""),
            password: env_or_default("SMTP_PASSWORD", ""),
            from_email: env_required("MAIL_FROM_ADDRESS")?,
            from_name: env_or_default("MAIL_FROM_NAME", "Quill"),
            use_tls: matches!(
                env_or_default("SMTP_USE_TLS", "true").as_str(),
                "true" | "1"
            ),
        })
    }
}

/// Mail provider backed by an SMTP relay via lettre.
pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    config: SmtpConfig,
}

impl SmtpMailer {
    pub fn new(config: SmtpConfig) -> NotificationsResult<Self> {
        let transport = if config.use_tls {
            let creds = Credentials::new(config.username.clone(), config.password.clone());
            AsyncSmtpTransport::<Tokio1Executor>::relay(&config.host)
                .map_err(|e| NotificationsError::Smtp(e.to_string()))?
                .credentials(creds)
                .port(config.port)
                .build()
        } else if !config.username.is_empty() {
            let creds = Credentials::new(config.username.clone(), config.password.clone());
            AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(&config.host)
                .credentials(creds)
                .port(config.port)
                .build()
        } else {
            // No auth, for a local Mailpit
            AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(&config.host)
                .port(config.port)
                .build()
        };

        Ok(Self { transport, config })
    }

    pub fn from_env() -> Result<Self, NotificationsError> {
        let config =
            SmtpConfig::from_env().map_err(|e| NotificationsError::Smtp(e.to_string()))?;
        Self::new(config)
    }

    fn build_message(&self, mail: &MailTask) -> NotificationsResult<Message> {
        let from: Mailbox = format!("{} <{}>", self.config.from_name, self.config.from_email)
            .parse()
            .map_err(|e| {
                NotificationsError::BadSender(format!("{}: {}", self.config.from_email, e))
            })?;
        let to: Mailbox = mail
            .to
            .parse()
            .map_err(|e| NotificationsError::InvalidAddress(format!("{}: {}", mail.to, e)))?;

        let builder = Message::builder().from(from).to(to).subject(&mail.subject);

        let text = mail
            .text
            .as_deref()
            .map(|t| text_with_links(t, &mail.attachments));
        let html = mail
            .html
            .as_deref()
            .map(|h| html_with_links(h, &mail.attachments));

        let message = match (text, html) {
            (Some(text), Some(html)) => builder.multipart(
                MultiPart::alternative()
                    .singlepart(
                        SinglePart::builder()
                            .header(ContentType::TEXT_PLAIN)
                            .body(text),
                    )
                    .singlepart(
                        SinglePart::builder()
                            .header(ContentType::TEXT_HTML)
                            .body(html),
                    ),
            )?,
            (Some(text), None) => builder.header(ContentType::TEXT_PLAIN).body(text)?,
            (None, Some(html)) => builder.header(ContentType::TEXT_HTML).body(html)?,
            (None, None) => return Err(NotificationsError::EmptyBody),
        };

        Ok(message)
    }
}

#[async_trait]
impl MailProvider for SmtpMailer {
    async fn send(&self, mail: &MailTask) -> NotificationsResult<SendReceipt> {
        let message = self.build_message(mail)?;

        let response = self
            .transport
            .send(message)
            .await
            .map_err(|e| NotificationsError::Smtp(e.to_string()))?;

        let relay_message_id = response.message().next().map(|s| s.to_string());

        tracing::info!(to = %mail.to, subject = %mail.subject, "Mail sent");
        Ok(SendReceipt { relay_message_id })
    }

    fn name(&self) -> &'static str {
        "smtp"
    }
}

// Attachment names and URLs come from the platform's own upload records.
fn text_with_links(text: &str, attachments: &[MailAttachment]) -> String {
    if attachments.is_empty() {
        return text.to_string();
    }
    let mut out = String::from(text);
    out.push_str("\n\nAttachments:\n");
    for a in attachments {
        out.push_str(&format!("- {}: {}\n", a.filename, a.url));
    }
    out
}

fn html_with_links(html: &str, attachments: &[MailAttachment]) -> String {
    if attachments.is_empty() {
        return html.to_string();
    }
    let mut out = String::from(html);
    out.push_str("\n<hr><p>Attachments:</p>\n<ul>\n");
    for a in attachments {
        out.push_str(&format!(
            "  <li><a href=\"{}\">{}</a></li>\n",
            a.url, a.filename
        ));
    }
    out.push_str("</ul>\n");
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mailer() -> SmtpMailer {
        SmtpMailer::new(SmtpConfig {
            host: "localhost".to_string(),
            port: 1025,
            username: String::new(),
            password: String::new(),
            from_email: "noreply@quill.example".to_string(),
            from_name: "Quill".to_string(),
            use_tls: false,
        })
        .unwrap()
    }

    fn mail(html: Option<&str>, text: Option<&str>) -> MailTask {
        MailTask {
            to: "reader@example.com".to_string(),
            subject: "Weekly digest".to_string(),
            html: html.map(str::to_string),
            text: text.map(str::to_string),
            mail_id: None,
            attachments: vec![],
        }
    }

    #[test]
    fn test_builds_multipart_when_both_bodies_present() {
        let message = mailer()
            .build_message(&mail(Some("<p>hi</p>"), Some("hi")))
            .unwrap();
        let rendered = String::from_utf8_lossy(&message.formatted()).to_string();
        assert!(rendered.contains("text/plain"));
        assert!(rendered.contains("text/html"));
    }

    #[test]
    fn test_builds_single_part_html() {
        let message = mailer().build_message(&mail(Some("<p>hi</p>"), None)).unwrap();
        let rendered = String::from_utf8_lossy(&message.formatted()).to_string();
        assert!(rendered.contains("text/html"));
        assert!(!rendered.contains("multipart/alternative"));
    }

    #[test]
    fn test_empty_body_is_rejected() {
        let err = mailer().build_message(&mail(None, None)).unwrap_err();
        assert!(matches!(err, NotificationsError::EmptyBody));
    }

    #[test]
    fn test_invalid_recipient_is_rejected() {
        let mut bad = mail(None, Some("hi"));
        bad.to = "not an address".to_string();
        let err = mailer().build_message(&bad).unwrap_err();
        assert!(matches!(err, NotificationsError::InvalidAddress(_)));
    }

    #[test]
    fn test_attachment_links_are_appended() {
        let mut task = mail(Some("<p>done</p>"), Some("done"));
        task.attachments = vec![MailAttachment {
            filename: "export.zip".to_string(),
            url: "https://quill.example/f/1".to_string(),
        }];
        let message = mailer().build_message(&task).unwrap();
        let rendered = String::from_utf8_lossy(&message.formatted()).to_string();
        assert!(rendered.contains("export.zip"));
    }

    #[test]
    fn test_config_from_env_defaults() {
        temp_env::with_vars(
            [
                ("SMTP_HOST", Some("smtp.example")),
                ("SMTP_PORT", None),
                ("SMTP_USERNAME", None),
                ("SMTP_PASSWORD", None),
                ("MAIL_FROM_ADDRESS", Some("noreply@quill.example")),
                ("MAIL_FROM_NAME", None),
                ("SMTP_USE_TLS", None),
            ],
            || {
                let config = SmtpConfig::from_env().unwrap();
                assert_eq!(config.host, "smtp.example");
                assert_eq!(config.port, 587);
                assert_eq!(config.from_name, "Quill");
                assert!(config.use_tls);
            },
        );
    }

    #[test]
    fn test_config_requires_from_address() {
        temp_env::with_vars(
            [("SMTP_HOST", Some("smtp.example")), ("MAIL_FROM_ADDRESS", None)],
            || {
                assert!(SmtpConfig::from_env().is_err());
            },
        );
    }
}
