//! Event-driven triage dispatcher.
//!
//! Delivers "ticket created" events to the [`crate::workflow::TriageWorkflow`]:
//! - **Queue**: bounded, one task per event, parallel across tickets
//! - **Retries**: whole-workflow, exponential backoff, skipped for permanent errors
//! - **Scan**: periodic re-submission of unprocessed tickets

mod config;
mod runner;
mod types;

pub use config::DispatcherConfig;
pub use runner::TriageDispatcher;
pub use types::{DispatcherError, DispatcherStatus, TicketCreatedEvent};
