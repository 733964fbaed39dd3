use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Audit event types
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AuditEvent {
    // System events
    ServiceStarted {
        version: String,
        config_hash: String,
    },
    ServiceStopped {
        reason: String,
    },

    // Triage workflow
    TriageStarted {
        ticket_id: String,
    },
    /// The ticket was already processed; nothing was written.
    TriageSkipped {
        ticket_id: String,
        reason: String,
    },
    TicketStatusChanged {
        ticket_id: String,
        from_status: String,
        to_status: String,
    },
    TicketAnalyzed {
        ticket_id: String,
        /// Priority as returned by the model.
        raw_priority: String,
        /// Priority actually persisted.
        priority: String,
        related_skills: Vec<String>,
    },
    TicketAssigned {
        ticket_id: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        assignee_id: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        assignee_role: Option<String>,
    },
    NotificationAttempted {
        ticket_id: String,
        recipient_id: String,
        delivered: bool,
    },
    TriageCompleted {
        ticket_id: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        assigned_to: Option<String>,
        duration_ms: u64,
    },
    /// A workflow attempt failed.
    TriageFailed {
        ticket_id: String,
        attempt: u32,
        error: String,
        retriable: bool,
        /// Whether the dispatcher will try again.
        will_retry: bool,
    },
}

impl AuditEvent {
    /// Returns the event type as a string for storage
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::ServiceStarted { .. } => "service_started",
            Self::ServiceStopped { .. } => "service_stopped",
            Self::TriageStarted { .. } => "triage_started",
            Self::TriageSkipped { .. } => "triage_skipped",
            Self::TicketStatusChanged { .. } => "ticket_status_changed",
            Self::TicketAnalyzed { .. } => "ticket_analyzed",
            Self::TicketAssigned { .. } => "ticket_assigned",
            Self::NotificationAttempted { .. } => "notification_attempted",
            Self::TriageCompleted { .. } => "triage_completed",
            Self::TriageFailed { .. } => "triage_failed",
        }
    }

    /// Ticket the event refers to, if any
    pub fn ticket_id(&self) -> Option<&str> {
        match self {
            Self::ServiceStarted { .. } | Self::ServiceStopped { .. } => None,
            Self::TriageStarted { ticket_id }
            | Self::TriageSkipped { ticket_id, .. }
            | Self::TicketStatusChanged { ticket_id, .. }
            | Self::TicketAnalyzed { ticket_id, .. }
            | Self::TicketAssigned { ticket_id, .. }
            | Self::NotificationAttempted { ticket_id, .. }
            | Self::TriageCompleted { ticket_id, .. }
            | Self::TriageFailed { ticket_id, .. } => Some(ticket_id),
        }
    }

    /// User the event refers to, if any
    pub fn user_id(&self) -> Option<&str> {
        match self {
            Self::TicketAssigned { assignee_id, .. } => assignee_id.as_deref(),
            Self::NotificationAttempted { recipient_id, .. } => Some(recipient_id),
            Self::TriageCompleted { assigned_to, .. } => assigned_to.as_deref(),
            _ => None,
        }
    }
}

/// A stored audit record with metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditRecord {
    pub id: i64,
    pub timestamp: DateTime<Utc>,
    pub event_type: String,
    pub ticket_id: Option<String>,
    pub user_id: Option<String>,
    pub data: AuditEvent,
}

impl AuditRecord {
    /// Build an unsaved record for an event.
    pub fn from_event(timestamp: DateTime<Utc>, event: AuditEvent) -> Self {
        Self {
            id: 0,
            timestamp,
            event_type: event.event_type().to_string(),
            ticket_id: event.ticket_id().map(String::from),
            user_id: event.user_id().map(String::from),
            data: event,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_service_events_have_no_ids() {
        let event = AuditEvent::ServiceStarted {
            version: "0.1.0".to_string(),
            config_hash: "abc123".to_string(),
        };
        assert_eq!(event.event_type(), "service_started");
        assert_eq!(event.ticket_id(), None);
        assert_eq!(event.user_id(), None);
    }

    #[test]
    fn test_assignment_event_ids() {
        let event = AuditEvent::TicketAssigned {
            ticket_id: "t-1".to_string(),
            assignee_id: Some("u-9".to_string()),
            assignee_role: Some("moderator".to_string()),
        };
        assert_eq!(event.event_type(), "ticket_assigned");
        assert_eq!(event.ticket_id(), Some("t-1"));
        assert_eq!(event.user_id(), Some("u-9"));

        let unassigned = AuditEvent::TicketAssigned {
            ticket_id: "t-1".to_string(),
            assignee_id: None,
            assignee_role: None,
        };
        assert_eq!(unassigned.user_id(), None);
    }

    #[test]
    fn test_failure_event() {
        let event = AuditEvent::TriageFailed {
            ticket_id: "t-2".to_string(),
            attempt: 2,
            error: "analysis backend down".to_string(),
            retriable: true,
            will_retry: true,
        };
        assert_eq!(event.event_type(), "triage_failed");
        assert_eq!(event.ticket_id(), Some("t-2"));
    }

    #[test]
    fn test_serialized_form_is_tagged() {
        let event = AuditEvent::TicketAnalyzed {
            ticket_id: "t-3".to_string(),
            raw_priority: "Critical".to_string(),
            priority: "medium".to_string(),
            related_skills: vec!["React".to_string()],
        };
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("\"type\":\"ticket_analyzed\""));
        assert!(json.contains("\"raw_priority\":\"Critical\""));

        let parsed: AuditEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, event);
    }

    #[test]
    fn test_record_from_event() {
        let record = AuditRecord::from_event(
            Utc::now(),
            AuditEvent::TriageCompleted {
                ticket_id: "t-4".to_string(),
                assigned_to: Some("u-1".to_string()),
                duration_ms: 12,
            },
        );
        assert_eq!(record.id, 0);
        assert_eq!(record.event_type, "triage_completed");
        assert_eq!(record.ticket_id.as_deref(), Some("t-4"));
        assert_eq!(record.user_id.as_deref(), Some("u-1"));
    }
}
