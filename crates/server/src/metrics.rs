//! Prometheus metrics for the HTTP surface.
//!
//! Workflow and model metrics live in `triage_core::metrics` and are
//! registered into the same registry here.

use once_cell::sync::Lazy;
use prometheus::{
    self, Encoder, HistogramOpts, HistogramVec, IntCounterVec, IntGauge, IntGaugeVec, Opts,
    Registry, TextEncoder,
};
use regex_lite::Regex;

use triage_core::{TicketFilter, TicketStatus};

use crate::state::AppState;

/// Global metrics registry.
pub static REGISTRY: Lazy<Registry> = Lazy::new(|| {
    let registry = Registry::new();
    register_metrics(&registry);
    registry
});

// =============================================================================
// HTTP Request Metrics
// =============================================================================

/// HTTP request duration in seconds.
pub static HTTP_REQUEST_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new(
            "triage_http_request_duration_seconds",
            "HTTP request duration in seconds",
        )
        .buckets(vec![0.001, 0.005, 0.01, 0.05, 0.1, 0.5, 1.0, 5.0]),
        &["method", "path", "status"],
    )
    .unwrap()
});

/// HTTP requests total count.
pub static HTTP_REQUESTS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("triage_http_requests_total", "Total HTTP requests"),
        &["method", "path", "status"],
    )
    .unwrap()
});

/// HTTP requests currently in flight.
pub static HTTP_REQUESTS_IN_FLIGHT: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new(
        "triage_http_requests_in_flight",
        "Number of HTTP requests currently being processed",
    )
    .unwrap()
});

/// Events accepted or rejected by the intake endpoint.
pub static EVENTS_RECEIVED: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "triage_events_received_total",
            "Ticket-created events received over HTTP",
        ),
        &["result"],
    )
    .unwrap()
});

// =============================================================================
// Dispatcher and Ticket Metrics (collected dynamically)
// =============================================================================

/// Dispatcher running state (1 = running, 0 = stopped).
pub static DISPATCHER_RUNNING: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new(
        "triage_dispatcher_running",
        "Whether the dispatcher is running (1) or stopped (0)",
    )
    .unwrap()
});

/// Events waiting in the dispatcher queue.
pub static DISPATCHER_QUEUED: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new(
        "triage_dispatcher_queued",
        "Events waiting in the dispatcher queue",
    )
    .unwrap()
});

/// Tickets by current status (collected dynamically).
pub static TICKETS_BY_STATUS: Lazy<IntGaugeVec> = Lazy::new(|| {
    IntGaugeVec::new(
        Opts::new("triage_tickets_by_status", "Current ticket count by status"),
        &["status"],
    )
    .unwrap()
});

/// Tickets not yet triaged.
pub static TICKETS_UNPROCESSED: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new(
        "triage_tickets_unprocessed",
        "Tickets not yet marked processed",
    )
    .unwrap()
});

// =============================================================================
// Registration
// =============================================================================

fn register_metrics(registry: &Registry) {
    // HTTP
    registry
        .register(Box::new(HTTP_REQUEST_DURATION.clone()))
        .unwrap();
    registry
        .register(Box::new(HTTP_REQUESTS_TOTAL.clone()))
        .unwrap();
    registry
        .register(Box::new(HTTP_REQUESTS_IN_FLIGHT.clone()))
        .unwrap();
    registry
        .register(Box::new(EVENTS_RECEIVED.clone()))
        .unwrap();

    // Dispatcher and tickets
    registry
        .register(Box::new(DISPATCHER_RUNNING.clone()))
        .unwrap();
    registry
        .register(Box::new(DISPATCHER_QUEUED.clone()))
        .unwrap();
    registry
        .register(Box::new(TICKETS_BY_STATUS.clone()))
        .unwrap();
    registry
        .register(Box::new(TICKETS_UNPROCESSED.clone()))
        .unwrap();

    // Core metrics (workflow, analysis, notifications)
    for metric in triage_core::metrics::all_metrics() {
        registry.register(metric).unwrap();
    }
}

/// Encode all metrics as Prometheus text format.
pub fn encode_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        tracing::warn!("Failed to encode metrics: {}", e);
    }
    String::from_utf8_lossy(&buffer).into_owned()
}

/// Collect dynamic metrics from current application state.
///
/// Called before encoding so the gauges reflect the dispatcher and store.
pub fn collect_dynamic_metrics(state: &AppState) {
    let status = state.dispatcher().status();
    DISPATCHER_RUNNING.set(if status.running { 1 } else { 0 });
    DISPATCHER_QUEUED.set(status.queued as i64);
    TICKETS_UNPROCESSED.set(status.unprocessed_count as i64);

    let ticket_store = state.ticket_store();
    for ticket_status in [
        TicketStatus::Open,
        TicketStatus::Todo,
        TicketStatus::InProgress,
        TicketStatus::Resolved,
        TicketStatus::Closed,
    ] {
        let filter = TicketFilter::new().with_status(ticket_status);
        if let Ok(count) = ticket_store.count(&filter) {
            TICKETS_BY_STATUS
                .with_label_values(&[ticket_status.as_str()])
                .set(count);
        }
    }
}

static UUID_SEGMENT: Lazy<Option<Regex>> = Lazy::new(|| {
    Regex::new(r"[0-9a-fA-F]{8}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{12}")
        .ok()
});

static TICKET_SEGMENT: Lazy<Option<Regex>> =
    Lazy::new(|| Regex::new(r"/tickets/[^/]+").ok());

/// Normalize a path for metric labels (replace IDs with placeholders).
pub fn normalize_path(path: &str) -> String {
    let mut result = path.to_string();
    if let Some(re) = UUID_SEGMENT.as_ref() {
        result = re.replace_all(&result, "{id}").into_owned();
    }
    if let Some(re) = TICKET_SEGMENT.as_ref() {
        result = re.replace_all(&result, "/tickets/{id}").into_owned();
    }
    result
}
