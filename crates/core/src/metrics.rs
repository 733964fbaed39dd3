//! Prometheus metrics for core components.
//!
//! Covers the triage workflow, the dispatcher that retries it, and the
//! external services it talks to (LLM and mail backends).

use once_cell::sync::Lazy;
use prometheus::{HistogramOpts, HistogramVec, IntCounter, IntCounterVec, IntGauge, Opts};

// =============================================================================
// Workflow
// =============================================================================

/// Workflow invocations by outcome.
pub static TRIAGE_RUNS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("triage_runs_total", "Total triage workflow invocations"),
        &["result"], // "completed", "already_processed", "failed"
    )
    .unwrap()
});

/// Workflow duration in seconds.
pub static TRIAGE_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new(
            "triage_duration_seconds",
            "Duration of a single triage workflow invocation",
        )
        .buckets(vec![0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 60.0]),
        &["result"],
    )
    .unwrap()
});

/// Assignments by kind of assignee.
pub static ASSIGNMENTS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("triage_assignments_total", "Total ticket assignments"),
        &["kind"], // "moderator", "admin", "none"
    )
    .unwrap()
});

/// Notifications by delivery result.
pub static NOTIFICATIONS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("triage_notifications_total", "Total assignment notifications"),
        &["result"], // "sent", "failed"
    )
    .unwrap()
});

// =============================================================================
// Dispatcher
// =============================================================================

/// Workflow retries scheduled by the dispatcher.
pub static WORKFLOW_RETRIES: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new("triage_workflow_retries_total", "Total workflow retries").unwrap()
});

/// Events dropped because the ticket was already being processed.
pub static DUPLICATE_EVENTS: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new(
        "triage_duplicate_events_total",
        "Ticket-created events dropped while the ticket was in flight",
    )
    .unwrap()
});

/// Workflows currently running.
pub static IN_FLIGHT: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new("triage_in_flight", "Triage workflows currently running").unwrap()
});

// =============================================================================
// External services
// =============================================================================

/// Analysis requests by model and result.
pub static ANALYSIS_REQUESTS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("triage_analysis_requests_total", "Total LLM analysis requests"),
        &["model", "result"], // result: "success", "error"
    )
    .unwrap()
});

/// Substitutions of the fallback model for the primary.
pub static ANALYSIS_FALLBACKS: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new(
        "triage_analysis_fallbacks_total",
        "Times the fallback model replaced the primary",
    )
    .unwrap()
});

/// Analyses that produced unusable output and fell back to the default triage.
pub static ANALYSIS_DEFAULTED: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new(
        "triage_analysis_defaulted_total",
        "Analyses replaced by the default triage result",
    )
    .unwrap()
});

/// LLM token usage.
pub static LLM_TOKENS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("triage_llm_tokens_total", "Total LLM tokens used"),
        &["provider", "direction"], // direction: "input", "output"
    )
    .unwrap()
});

// =============================================================================
// Helper functions
// =============================================================================

/// Get all core metrics for registration in a registry.
pub fn all_metrics() -> Vec<Box<dyn prometheus::core::Collector>> {
    vec![
        // Workflow
        Box::new(TRIAGE_RUNS.clone()),
        Box::new(TRIAGE_DURATION.clone()),
        Box::new(ASSIGNMENTS.clone()),
        Box::new(NOTIFICATIONS.clone()),
        // Dispatcher
        Box::new(WORKFLOW_RETRIES.clone()),
        Box::new(DUPLICATE_EVENTS.clone()),
        Box::new(IN_FLIGHT.clone()),
        // External services
        Box::new(ANALYSIS_REQUESTS.clone()),
        Box::new(ANALYSIS_FALLBACKS.clone()),
        Box::new(ANALYSIS_DEFAULTED.clone()),
        Box::new(LLM_TOKENS.clone()),
    ]
}
