//! Core ticket data types.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ============================================================================
// Status
// ============================================================================

/// Lifecycle status of a ticket.
///
/// Only `Open` counts as "not yet triaged". The workflow moves a ticket to
/// `Todo` when it picks it up and to `InProgress` once the analysis is
/// persisted. `Resolved` and `Closed` are set by humans.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "snake_case")]
pub enum TicketStatus {
    #[default]
    Open,
    Todo,
    InProgress,
    Resolved,
    Closed,
}

impl TicketStatus {
    /// Returns the persisted label.
    pub fn as_str(&self) -> &'static str {
        match self {
            TicketStatus::Open => "open",
            TicketStatus::Todo => "todo",
            TicketStatus::InProgress => "in_progress",
            TicketStatus::Resolved => "resolved",
            TicketStatus::Closed => "closed",
        }
    }

    /// Returns true if the triage workflow has not touched this ticket yet.
    pub fn is_pre_triage(&self) -> bool {
        matches!(self, TicketStatus::Open)
    }
}

impl fmt::Display for TicketStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TicketStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace([' ', '-'], "_").as_str() {
            "open" => Ok(TicketStatus::Open),
            "todo" => Ok(TicketStatus::Todo),
            "in_progress" => Ok(TicketStatus::InProgress),
            "resolved" => Ok(TicketStatus::Resolved),
            "closed" => Ok(TicketStatus::Closed),
            other => Err(format!("unknown ticket status: {}", other)),
        }
    }
}

// ============================================================================
// Priority
// ============================================================================

/// Canonical ticket priority. No other label is ever persisted.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    Low,
    #[default]
    Medium,
    High,
}

impl Priority {
    /// Coerce a free-form label into a canonical priority.
    ///
    /// Matching is case-insensitive and ignores surrounding whitespace.
    /// Anything that is not `low`, `medium` or `high` becomes `Medium`.
    pub fn coerce(raw: &str) -> Self {
        match raw.trim().to_lowercase().as_str() {
            "low" => Priority::Low,
            "high" => Priority::High,
            _ => Priority::Medium,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::Low => "low",
            Priority::Medium => "medium",
            Priority::High => "high",
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Ticket
// ============================================================================

/// A support ticket.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Ticket {
    /// Unique identifier (UUID v4).
    pub id: String,
    pub title: String,
    pub description: String,
    /// User who opened the ticket.
    pub created_by: String,
    pub status: TicketStatus,
    pub priority: Priority,
    /// Short model-written summary.
    pub summary: String,
    /// Notes for the assignee.
    pub helpful_notes: String,
    /// Skill tags in the order the model returned them.
    pub related_skills: Vec<String>,
    /// Assignee user id, `None` while unassigned.
    pub assigned_to: Option<String>,
    /// Set once triage has finished; the workflow never touches the ticket again.
    pub processed: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A partial set of ticket fields to write in one atomic update.
///
/// `None` leaves a field untouched. `assigned_to` is doubly optional so that
/// clearing the assignee can be expressed as `Some(None)`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TicketUpdate {
    pub status: Option<TicketStatus>,
    pub priority: Option<Priority>,
    pub summary: Option<String>,
    pub helpful_notes: Option<String>,
    pub related_skills: Option<Vec<String>>,
    pub assigned_to: Option<Option<String>>,
    pub processed: Option<bool>,
}

impl TicketUpdate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_status(mut self, status: TicketStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = Some(priority);
        self
    }

    pub fn with_summary(mut self, summary: impl Into<String>) -> Self {
        self.summary = Some(summary.into());
        self
    }

    pub fn with_helpful_notes(mut self, notes: impl Into<String>) -> Self {
        self.helpful_notes = Some(notes.into());
        self
    }

    pub fn with_related_skills(mut self, skills: Vec<String>) -> Self {
        self.related_skills = Some(skills);
        self
    }

    pub fn with_assigned_to(mut self, user_id: Option<String>) -> Self {
        self.assigned_to = Some(user_id);
        self
    }

    pub fn with_processed(mut self, processed: bool) -> Self {
        self.processed = Some(processed);
        self
    }

    /// Returns true if no field would be written.
    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_priority_coerce_canonical() {
        assert_eq!(Priority::coerce("low"), Priority::Low);
        assert_eq!(Priority::coerce("HIGH"), Priority::High);
        assert_eq!(Priority::coerce(" Medium "), Priority::Medium);
    }

    #[test]
    fn test_priority_coerce_unknown_is_medium() {
        for raw in ["critical", "", "urgent", "p1", "lowest", "hi gh"] {
            assert_eq!(Priority::coerce(raw), Priority::Medium, "raw = {:?}", raw);
        }
    }

    #[test]
    fn test_status_parse_legacy_labels() {
        assert_eq!("In Progress".parse::<TicketStatus>().unwrap(), TicketStatus::InProgress);
        assert_eq!("TODO".parse::<TicketStatus>().unwrap(), TicketStatus::Todo);
        assert_eq!("in-progress".parse::<TicketStatus>().unwrap(), TicketStatus::InProgress);
        assert!("escalated".parse::<TicketStatus>().is_err());
    }

    #[test]
    fn test_only_open_is_pre_triage() {
        assert!(TicketStatus::Open.is_pre_triage());
        assert!(!TicketStatus::Todo.is_pre_triage());
        assert!(!TicketStatus::InProgress.is_pre_triage());
        assert!(!TicketStatus::Closed.is_pre_triage());
    }

    #[test]
    fn test_status_serde_labels() {
        let json = serde_json::to_string(&TicketStatus::InProgress).unwrap();
        assert_eq!(json, "\"in_progress\"");
        let parsed: Priority = serde_json::from_str("\"high\"").unwrap();
        assert_eq!(parsed, Priority::High);
    }

    #[test]
    fn test_update_builder() {
        assert!(TicketUpdate::new().is_empty());

        let update = TicketUpdate::new()
            .with_status(TicketStatus::Todo)
            .with_assigned_to(None);
        assert!(!update.is_empty());
        assert_eq!(update.status, Some(TicketStatus::Todo));
        assert_eq!(update.assigned_to, Some(None));
        assert_eq!(update.priority, None);
    }
}
