//! Ticket-created event intake and manual re-triage.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, warn};
use triage_core::{DispatcherError, Ticket, TriageOutcome, WorkflowError};

use super::ErrorResponse;
use crate::metrics::EVENTS_RECEIVED;
use crate::state::AppState;

/// Body of a "ticket created" event.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TicketCreatedRequest {
    pub ticket_id: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EventAccepted {
    pub ticket_id: String,
    pub accepted: bool,
}

/// Result of an inline triage run.
#[derive(Debug, Serialize)]
pub struct TriageResponse {
    pub outcome: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ticket: Option<Ticket>,
}

type ApiError = (StatusCode, Json<ErrorResponse>);

/// Accept a "ticket created" event and queue it for the dispatcher.
pub async fn ticket_created(
    State(state): State<Arc<AppState>>,
    Json(request): Json<TicketCreatedRequest>,
) -> Result<(StatusCode, Json<EventAccepted>), ApiError> {
    let ticket_id = request.ticket_id.trim();
    if ticket_id.is_empty() {
        EVENTS_RECEIVED.with_label_values(&["rejected"]).inc();
        return Err(ErrorResponse::with_status(
            StatusCode::BAD_REQUEST,
            "ticketId must not be empty",
        ));
    }

    match state.dispatcher().submit(ticket_id) {
        Ok(()) => {
            EVENTS_RECEIVED.with_label_values(&["accepted"]).inc();
            info!("Queued ticket-created event for {}", ticket_id);
            Ok((
                StatusCode::ACCEPTED,
                Json(EventAccepted {
                    ticket_id: ticket_id.to_string(),
                    accepted: true,
                }),
            ))
        }
        Err(e) => {
            EVENTS_RECEIVED.with_label_values(&["rejected"]).inc();
            warn!("Rejected ticket-created event for {}: {}", ticket_id, e);
            Err(ErrorResponse::with_status(
                StatusCode::SERVICE_UNAVAILABLE,
                e.to_string(),
            ))
        }
    }
}

/// Run the workflow for one ticket and wait for the result.
pub async fn triage_ticket(
    State(state): State<Arc<AppState>>,
    Path(ticket_id): Path<String>,
) -> Result<Json<TriageResponse>, ApiError> {
    match state.dispatcher().dispatch(&ticket_id).await {
        Ok(outcome) => {
            let name = outcome.as_str();
            let ticket = match outcome {
                TriageOutcome::Completed { ticket } => Some(ticket),
                TriageOutcome::AlreadyProcessed => None,
            };
            Ok(Json(TriageResponse {
                outcome: name,
                ticket,
            }))
        }
        Err(e) => {
            let status = match &e {
                DispatcherError::AlreadyInFlight(_) => StatusCode::CONFLICT,
                DispatcherError::Workflow {
                    source: WorkflowError::TicketNotFound(_),
                    ..
                } => StatusCode::NOT_FOUND,
                DispatcherError::Workflow { .. } => StatusCode::BAD_GATEWAY,
                DispatcherError::QueueFull | DispatcherError::QueueClosed => {
                    StatusCode::SERVICE_UNAVAILABLE
                }
            };
            Err(ErrorResponse::with_status(status, e.to_string()))
        }
    }
}
