//! Mail delivery client

use serde::Serialize;
use thiserror::Error;

use crate::config::MailConfig;

#[derive(Debug, Error)]
pub enum MailError {
    #[error("Mail API request failed: {0}")]
    Request(#[from] reqwest::Error),
}

/// An outbound message with optional attachments.
#[derive(Debug, Clone)]
pub struct OutgoingMail {
    pub to: String,
    pub cc: Vec<String>,
    pub subject: String,
    pub text_body: String,
    pub html_body: String,
    pub attachments: Vec<MailAttachment>,
}

/// A file attached to an outbound message, content base64-encoded.
#[derive(Debug, Clone)]
pub struct MailAttachment {
    pub name: String,
    pub content_base64: String,
    pub content_type: String,
}

/// Postmark wire format
#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct PostmarkMessage {
    from: String,
    to: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    cc: Option<String>,
    subject: String,
    text_body: String,
    html_body: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    attachments: Vec<PostmarkAttachment>,
}

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct PostmarkAttachment {
    name: String,
    content: String,
    content_type: String,
}

/// Mail client over the Postmark HTTP API.
///
/// Constructed once at process start from [`MailConfig`]; a missing server
/// token leaves the client disabled and every send becomes a logged no-op.
#[derive(Clone)]
pub struct Mailer {
    http: reqwest::Client,
    config: MailConfig,
}

impl Mailer {
    pub fn new(config: MailConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            config,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.config.is_enabled()
    }

    /// Deliver one message. Single attempt, no retry.
    pub async fn send(&self, mail: OutgoingMail) -> Result<(), MailError> {
        let Some(token) = self.config.server_token.as_deref() else {
            tracing::debug!(to = %mail.to, "mail delivery disabled, dropping message");
            return Ok(());
        };

        let message = PostmarkMessage {
            from: format!("{} <{}>", self.config.from_name, self.config.from_address),
            to: mail.to,
            cc: if mail.cc.is_empty() {
                None
            } else {
                Some(mail.cc.join(","))
            },
            subject: mail.subject,
            text_body: mail.text_body,
            html_body: mail.html_body,
            attachments: mail
                .attachments
                .into_iter()
                .map(|a| PostmarkAttachment {
                    name: a.name,
                    content: a.content_base64,
                    content_type: a.content_type,
                })
                .collect(),
        };

        let url = format!("{}/email", self.config.api_url.trim_end_matches('/'));
        self.http
            .post(url)
            .header("X-Postmark-Server-Token", token)
            .json(&message)
            .send()
            .await?
            .error_for_status()?;

        Ok(())
    }
}
