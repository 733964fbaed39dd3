//! Testing utilities and mock implementations.
//!
//! Mocks for the external services the workflow talks to, so the full
//! triage path can be exercised against in-memory SQLite stores.
//!
//! # Example
//!
//! ```rust,ignore
//! use triage_core::testing::{MockLlmClient, MockMailSender};
//!
//! let llm = Arc::new(MockLlmClient::new("primary"));
//! let mail = Arc::new(MockMailSender::new());
//!
//! llm.push_response(fixtures::triage_json("high", &["React"])).await;
//! mail.set_failing(true).await;
//! ```

mod counting_store;
mod mock_llm;
mod mock_mail;

pub use counting_store::CountingTicketStore;
pub use mock_llm::MockLlmClient;
pub use mock_mail::MockMailSender;

/// Test fixtures and helper functions.
pub mod fixtures {
    use chrono::Utc;

    use crate::ticket::{Priority, Ticket, TicketStatus};
    use crate::user::{Role, User};

    /// A freshly created, untriaged ticket.
    pub fn ticket(id: &str, title: &str) -> Ticket {
        let now = Utc::now();
        Ticket {
            id: id.to_string(),
            title: title.to_string(),
            description: format!("Description of {}", title.to_lowercase()),
            created_by: "user-1".to_string(),
            status: TicketStatus::Open,
            priority: Priority::Medium,
            summary: String::new(),
            helpful_notes: String::new(),
            related_skills: Vec::new(),
            assigned_to: None,
            processed: false,
            created_at: now,
            updated_at: now,
        }
    }

    fn user(email: &str, role: Role, skills: &[&str]) -> User {
        User {
            id: format!("user-{}", email.split('@').next().unwrap_or(email)),
            email: email.to_string(),
            name: email.split('@').next().unwrap_or(email).to_string(),
            role,
            skills: skills.iter().map(|s| s.to_string()).collect(),
            created_at: Utc::now(),
        }
    }

    pub fn moderator(email: &str, skills: &[&str]) -> User {
        user(email, Role::Moderator, skills)
    }

    pub fn admin(email: &str) -> User {
        user(email, Role::Admin, &[])
    }

    /// Model output in the expected JSON shape.
    pub fn triage_json(priority: &str, skills: &[&str]) -> String {
        serde_json::json!({
            "summary": "Generated summary",
            "priority": priority,
            "helpfulNotes": "Generated notes",
            "relatedSkills": skills,
        })
        .to_string()
    }
}
