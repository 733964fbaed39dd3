//! Assignment notifications.

mod config;
mod mailer;
mod notifier;

pub use config::{build_mail_sender, MailConfig, MailProvider};
pub use mailer::{LogMailSender, MailError, MailMessage, MailSender, MailtrapSender};
pub use notifier::Notifier;
