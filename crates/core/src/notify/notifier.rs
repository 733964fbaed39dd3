//! Best-effort assignment notifications.

use std::sync::Arc;

use tracing::{info, warn};

use super::mailer::{MailMessage, MailSender};
use crate::metrics;
use crate::ticket::Ticket;
use crate::user::User;

/// Tells an assignee about a ticket. Never fails the caller.
pub struct Notifier {
    sender: Arc<dyn MailSender>,
    app_url: Option<String>,
}

impl Notifier {
    pub fn new(sender: Arc<dyn MailSender>) -> Self {
        Self {
            sender,
            app_url: None,
        }
    }

    /// Base URL used to link the ticket in the message body.
    pub fn with_app_url(mut self, app_url: impl Into<String>) -> Self {
        let app_url = app_url.into();
        self.app_url = Some(app_url).filter(|u| !u.trim().is_empty());
        self
    }

    /// Compose the assignment message for a ticket.
    pub fn compose(&self, ticket: &Ticket, assignee: &User) -> MailMessage {
        let mut body = format!(
            "Hi {},\n\nA ticket has been assigned to you.\n\n\
             Ticket ID: {}\n\
             Title: {}\n\
             Priority: {}\n",
            assignee.name, ticket.id, ticket.title, ticket.priority
        );

        if !ticket.summary.is_empty() {
            body.push_str(&format!("Summary: {}\n", ticket.summary));
        }
        if !ticket.related_skills.is_empty() {
            body.push_str(&format!(
                "Related skills: {}\n",
                ticket.related_skills.join(", ")
            ));
        }
        if !ticket.helpful_notes.is_empty() {
            body.push_str(&format!("\nNotes:\n{}\n", ticket.helpful_notes));
        }
        if let Some(app_url) = &self.app_url {
            body.push_str(&format!(
                "\nView ticket: {}/tickets/{}\n",
                app_url.trim_end_matches('/'),
                ticket.id
            ));
        }

        MailMessage {
            to: assignee.email.clone(),
            subject: format!("Ticket assigned: {}", ticket.title),
            body,
        }
    }

    /// Send the assignment message. Delivery failures are logged and dropped.
    ///
    /// Returns whether the message was handed off successfully.
    pub async fn notify(&self, ticket: &Ticket, assignee: &User) -> bool {
        let message = self.compose(ticket, assignee);

        match self.sender.send(&message).await {
            Ok(()) => {
                info!(
                    "Notified {} about ticket {} via {}",
                    assignee.email,
                    ticket.id,
                    self.sender.name()
                );
                metrics::NOTIFICATIONS.with_label_values(&["sent"]).inc();
                true
            }
            Err(e) => {
                warn!(
                    "Failed to notify {} about ticket {}: {}",
                    assignee.email, ticket.id, e
                );
                metrics::NOTIFICATIONS.with_label_values(&["failed"]).inc();
                false
            }
        }
    }
}
