//! Mail delivery backends.

use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;
use tracing::info;

/// Error type for mail delivery.
#[derive(Debug, Error)]
pub enum MailError {
    #[error("HTTP error: {0}")]
    Http(String),

    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    #[error("Invalid message: {0}")]
    InvalidMessage(String),
}

/// A plain-text mail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MailMessage {
    pub to: String,
    pub subject: String,
    pub body: String,
}

/// Trait for mail delivery backends.
#[async_trait]
pub trait MailSender: Send + Sync {
    /// Backend name (e.g., "mailtrap", "log").
    fn name(&self) -> &str;

    /// Deliver a single message.
    async fn send(&self, message: &MailMessage) -> Result<(), MailError>;
}

/// Sends mail through the Mailtrap HTTP sending API.
pub struct MailtrapSender {
    client: reqwest::Client,
    api_token: String,
    api_base: String,
    from_address: String,
    from_name: String,
}

impl MailtrapSender {
    pub fn new(
        api_token: impl Into<String>,
        from_address: impl Into<String>,
        from_name: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, MailError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| MailError::Http(e.to_string()))?;

        Ok(Self {
            client,
            api_token: api_token.into(),
            api_base: "https://send.api.mailtrap.io".to_string(),
            from_address: from_address.into(),
            from_name: from_name.into(),
        })
    }

    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into();
        self
    }

    fn build_request<'a>(&'a self, message: &'a MailMessage) -> MailtrapRequest<'a> {
        MailtrapRequest {
            from: MailtrapAddress {
                email: &self.from_address,
                name: Some(&self.from_name).filter(|n| !n.is_empty()),
            },
            to: vec![MailtrapAddress {
                email: &message.to,
                name: None,
            }],
            subject: &message.subject,
            text: &message.body,
        }
    }
}

#[derive(Debug, Serialize)]
struct MailtrapRequest<'a> {
    from: MailtrapAddress<'a>,
    to: Vec<MailtrapAddress<'a>>,
    subject: &'a str,
    text: &'a str,
}

#[derive(Debug, Serialize)]
struct MailtrapAddress<'a> {
    email: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    name: Option<&'a String>,
}

#[async_trait]
impl MailSender for MailtrapSender {
    fn name(&self) -> &str {
        "mailtrap"
    }

    async fn send(&self, message: &MailMessage) -> Result<(), MailError> {
        if message.to.trim().is_empty() {
            return Err(MailError::InvalidMessage("empty recipient".to_string()));
        }

        let response = self
            .client
            .post(format!("{}/api/send", self.api_base.trim_end_matches('/')))
            .bearer_auth(&self.api_token)
            .json(&self.build_request(message))
            .send()
            .await
            .map_err(|e| MailError::Http(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(MailError::Api {
                status: status.as_u16(),
                message,
            });
        }

        Ok(())
    }
}

/// Writes mail to the log instead of delivering it.
#[derive(Debug, Default)]
pub struct LogMailSender;

impl LogMailSender {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl MailSender for LogMailSender {
    fn name(&self) -> &str {
        "log"
    }

    async fn send(&self, message: &MailMessage) -> Result<(), MailError> {
        info!(
            to = %message.to,
            subject = %message.subject,
            "Mail delivery disabled, message body:\n{}",
            message.body
        );
        Ok(())
    }
}
