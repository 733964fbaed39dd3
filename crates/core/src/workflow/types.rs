//! Workflow step, outcome and error types.

use std::fmt;
use std::time::Duration;

use thiserror::Error;

use crate::analysis::AnalysisError;
use crate::assignment::AssignmentError;
use crate::ticket::{Ticket, TicketError};

/// The ordered steps of one triage run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WorkflowStep {
    Fetch,
    IdempotencyCheck,
    NormalizeStatus,
    Analyze,
    PersistAnalysis,
    Assign,
    Notify,
    MarkProcessed,
}

impl WorkflowStep {
    pub fn as_str(&self) -> &'static str {
        match self {
            WorkflowStep::Fetch => "fetch",
            WorkflowStep::IdempotencyCheck => "idempotency_check",
            WorkflowStep::NormalizeStatus => "normalize_status",
            WorkflowStep::Analyze => "analyze",
            WorkflowStep::PersistAnalysis => "persist_analysis",
            WorkflowStep::Assign => "assign",
            WorkflowStep::Notify => "notify",
            WorkflowStep::MarkProcessed => "mark_processed",
        }
    }
}

impl fmt::Display for WorkflowStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of a successful workflow invocation.
#[derive(Debug, Clone)]
pub enum TriageOutcome {
    /// The ticket had already been processed; nothing was written.
    AlreadyProcessed,
    /// All steps ran; `ticket` is the final persisted state.
    Completed { ticket: Ticket },
}

impl TriageOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            TriageOutcome::AlreadyProcessed => "already_processed",
            TriageOutcome::Completed { .. } => "completed",
        }
    }
}

/// Errors that abort a workflow invocation.
#[derive(Debug, Error)]
pub enum WorkflowError {
    /// The ticket does not exist. Never retried.
    #[error("Ticket not found: {0}")]
    TicketNotFound(String),

    #[error("Ticket store failed during {step}: {source}")]
    Store {
        step: WorkflowStep,
        #[source]
        source: TicketError,
    },

    #[error("Analysis failed: {0}")]
    Analysis(#[from] AnalysisError),

    #[error("Assignment failed: {0}")]
    Assignment(#[from] AssignmentError),

    #[error("Deadline of {0:?} exceeded")]
    DeadlineExceeded(Duration),
}

impl WorkflowError {
    /// Wrap a store error raised while running `step`.
    ///
    /// A ticket that disappears mid-run is reported as not found.
    pub fn store(step: WorkflowStep, source: TicketError) -> Self {
        match source {
            TicketError::NotFound(id) => WorkflowError::TicketNotFound(id),
            source => WorkflowError::Store { step, source },
        }
    }

    /// Returns true if re-running the whole workflow may succeed.
    pub fn is_retriable(&self) -> bool {
        match self {
            WorkflowError::TicketNotFound(_) => false,
            WorkflowError::Store { source, .. } => !matches!(source, TicketError::Validation(_)),
            WorkflowError::Analysis(e) => e.is_retriable(),
            WorkflowError::Assignment(_) => true,
            WorkflowError::DeadlineExceeded(_) => true,
        }
    }

    /// The step that failed, when known.
    pub fn step(&self) -> Option<WorkflowStep> {
        match self {
            WorkflowError::TicketNotFound(_) | WorkflowError::DeadlineExceeded(_) => None,
            WorkflowError::Store { step, .. } => Some(*step),
            WorkflowError::Analysis(_) => Some(WorkflowStep::Analyze),
            WorkflowError::Assignment(_) => Some(WorkflowStep::Assign),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::LlmError;
    use crate::user::UserError;

    #[test]
    fn test_store_not_found_becomes_ticket_not_found() {
        let err = WorkflowError::store(
            WorkflowStep::PersistAnalysis,
            TicketError::NotFound("t-1".to_string()),
        );
        assert!(matches!(err, WorkflowError::TicketNotFound(ref id) if id == "t-1"));
        assert!(!err.is_retriable());
        assert_eq!(err.step(), None);
    }

    #[test]
    fn test_retriable_classification() {
        let db = WorkflowError::store(
            WorkflowStep::Assign,
            TicketError::Database("locked".to_string()),
        );
        assert!(db.is_retriable());
        assert_eq!(db.step(), Some(WorkflowStep::Assign));

        let invalid = WorkflowError::store(
            WorkflowStep::Assign,
            TicketError::Validation("bad".to_string()),
        );
        assert!(!invalid.is_retriable());

        let analysis = WorkflowError::from(AnalysisError::Transient {
            model: "m".to_string(),
            source: LlmError::Timeout(Duration::from_secs(1)),
        });
        assert!(analysis.is_retriable());
        assert_eq!(analysis.step(), Some(WorkflowStep::Analyze));

        let assignment =
            WorkflowError::from(AssignmentError::Store(UserError::Database("x".to_string())));
        assert!(assignment.is_retriable());

        assert!(WorkflowError::DeadlineExceeded(Duration::from_secs(5)).is_retriable());
    }

    #[test]
    fn test_error_display_names_step() {
        let err = WorkflowError::store(
            WorkflowStep::MarkProcessed,
            TicketError::Database("disk I/O error".to_string()),
        );
        assert_eq!(
            err.to_string(),
            "Ticket store failed during mark_processed: Database error: disk I/O error"
        );
    }
}
