//! Types for the triage dispatcher.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::workflow::WorkflowError;

/// Errors returned by the dispatcher.
#[derive(Debug, Error)]
pub enum DispatcherError {
    /// The event queue is full.
    #[error("event queue is full")]
    QueueFull,

    /// The dispatcher has been dropped.
    #[error("event queue is closed")]
    QueueClosed,

    /// Another invocation for the same ticket is running on this node.
    #[error("ticket {0} is already being processed")]
    AlreadyInFlight(String),

    /// The workflow failed and will not be retried.
    #[error("triage failed after {attempts} attempt(s): {source}")]
    Workflow {
        attempts: u32,
        #[source]
        source: WorkflowError,
    },
}

/// A "ticket created" event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TicketCreatedEvent {
    pub ticket_id: String,
    pub received_at: DateTime<Utc>,
}

impl TicketCreatedEvent {
    pub fn new(ticket_id: impl Into<String>) -> Self {
        Self {
            ticket_id: ticket_id.into(),
            received_at: Utc::now(),
        }
    }
}

/// Current status of the dispatcher.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DispatcherStatus {
    /// Whether the background loops are running.
    pub running: bool,
    /// Workflows currently executing.
    pub in_flight: usize,
    /// Events waiting in the queue.
    pub queued: usize,
    /// Tickets not yet marked processed.
    pub unprocessed_count: usize,
    /// Unprocessed tickets the scan no longer re-submits because their
    /// last run used up its attempts or failed permanently.
    pub exhausted: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_serialization() {
        let status = DispatcherStatus {
            running: true,
            in_flight: 2,
            queued: 1,
            unprocessed_count: 5,
            exhausted: 1,
        };
        let json = serde_json::to_value(&status).unwrap();
        assert_eq!(json["running"], true);
        assert_eq!(json["in_flight"], 2);
        assert_eq!(json["unprocessed_count"], 5);
        assert_eq!(json["exhausted"], 1);
    }

    #[test]
    fn test_workflow_error_display() {
        let err = DispatcherError::Workflow {
            attempts: 3,
            source: WorkflowError::TicketNotFound("t-1".to_string()),
        };
        assert_eq!(
            err.to_string(),
            "triage failed after 3 attempt(s): Ticket not found: t-1"
        );
    }
}
