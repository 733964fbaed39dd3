//! Mail configuration.

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::mailer::{LogMailSender, MailError, MailSender, MailtrapSender};

/// Mail backend type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MailProvider {
    /// Mailtrap HTTP sending API.
    Mailtrap,
    /// Log messages instead of sending them.
    #[default]
    Log,
}

/// Notification mail configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MailConfig {
    #[serde(default)]
    pub provider: MailProvider,
    /// API token (required for Mailtrap).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_token: Option<String>,
    /// Custom API base URL.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_base: Option<String>,
    #[serde(default = "default_from_address")]
    pub from_address: String,
    #[serde(default = "default_from_name")]
    pub from_name: String,
    /// Base URL of the ticket UI, used to link tickets in messages.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub app_url: Option<String>,
    /// Request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout_secs: u32,
}

fn default_from_address() -> String {
    "support@ticketmanagement.com".to_string()
}

fn default_from_name() -> String {
    "Ticket Support".to_string()
}

fn default_timeout() -> u32 {
    10
}

impl Default for MailConfig {
    fn default() -> Self {
        Self {
            provider: MailProvider::default(),
            api_token: None,
            api_base: None,
            from_address: default_from_address(),
            from_name: default_from_name(),
            app_url: None,
            timeout_secs: default_timeout(),
        }
    }
}

impl MailConfig {
    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), String> {
        if self.provider == MailProvider::Mailtrap
            && self.api_token.as_deref().map_or(true, |t| t.trim().is_empty())
        {
            return Err("mail.api_token is required for the mailtrap provider".to_string());
        }
        if !self.from_address.contains('@') {
            return Err(format!(
                "mail.from_address is not an email address: {}",
                self.from_address
            ));
        }
        if self.timeout_secs == 0 {
            return Err("mail.timeout_secs must be greater than 0".to_string());
        }
        Ok(())
    }
}

/// Build the mail backend for a configuration.
///
/// No configuration means mail is logged rather than sent.
pub fn build_mail_sender(config: Option<&MailConfig>) -> Result<Arc<dyn MailSender>, MailError> {
    let Some(config) = config else {
        return Ok(Arc::new(LogMailSender::new()));
    };

    match config.provider {
        MailProvider::Log => Ok(Arc::new(LogMailSender::new())),
        MailProvider::Mailtrap => {
            let api_token = config.api_token.clone().ok_or_else(|| {
                MailError::InvalidMessage("mailtrap provider requires an api token".to_string())
            })?;
            let mut sender = MailtrapSender::new(
                api_token,
                config.from_address.clone(),
                config.from_name.clone(),
                Duration::from_secs(config.timeout_secs as u64),
            )?;
            if let Some(ref api_base) = config.api_base {
                sender = sender.with_api_base(api_base.clone());
            }
            Ok(Arc::new(sender))
        }
    }
}
