//! Ops listener and service wiring for the triage service.

pub mod api;
pub mod metrics;
pub mod state;
