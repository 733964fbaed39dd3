use axum::{
    extract::{Query, State},
    http::StatusCode,
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use triage_core::{AuditFilter, AuditRecord};

use super::ErrorResponse;
use crate::state::AppState;

const MAX_LIMIT: i64 = 1000;
const DEFAULT_LIMIT: i64 = 100;

/// Query parameters for the audit endpoint
#[derive(Debug, Deserialize)]
pub struct AuditQueryParams {
    pub ticket_id: Option<String>,
    pub event_type: Option<String>,
    pub user_id: Option<String>,
    /// Events at or after this timestamp (RFC 3339)
    pub from: Option<DateTime<Utc>>,
    /// Events at or before this timestamp (RFC 3339)
    pub to: Option<DateTime<Utc>>,
    /// Default 100, max 1000
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct AuditQueryResponse {
    pub events: Vec<AuditRecord>,
    /// Total matching events, ignoring limit/offset
    pub total: i64,
    pub limit: i64,
    pub offset: i64,
}

/// Query audit events
pub async fn query_audit(
    State(state): State<Arc<AppState>>,
    Query(params): Query<AuditQueryParams>,
) -> Result<Json<AuditQueryResponse>, (StatusCode, Json<ErrorResponse>)> {
    let limit = params.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT);
    let offset = params.offset.unwrap_or(0).max(0);

    let mut base_filter = AuditFilter::new();
    if let Some(ticket_id) = params.ticket_id {
        base_filter = base_filter.with_ticket_id(ticket_id);
    }
    if let Some(event_type) = params.event_type {
        base_filter = base_filter.with_event_type(event_type);
    }
    if let Some(user_id) = params.user_id {
        base_filter = base_filter.with_user_id(user_id);
    }
    if let Some(from) = params.from {
        base_filter = base_filter.since(from);
    }
    if let Some(to) = params.to {
        base_filter = base_filter.until(to);
    }

    let query_filter = base_filter.clone().with_limit(limit).with_offset(offset);

    let events = state.audit_store().query(&query_filter).map_err(|e| {
        ErrorResponse::with_status(
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("Failed to query audit events: {}", e),
        )
    })?;

    let total = state.audit_store().count(&base_filter).map_err(|e| {
        ErrorResponse::with_status(
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("Failed to count audit events: {}", e),
        )
    })?;

    Ok(Json(AuditQueryResponse {
        events,
        total,
        limit,
        offset,
    }))
}
