//! Ticket triage workflow.
//!
//! [`TriageWorkflow`] composes the ticket store, the analysis client, the
//! assignment resolver and the notifier into the ordered triage steps.

mod engine;
mod types;

pub use engine::TriageWorkflow;
pub use types::{TriageOutcome, WorkflowError, WorkflowStep};
