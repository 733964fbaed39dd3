pub mod audit;
pub mod events;
pub mod handlers;
pub mod middleware;
pub mod routes;

use axum::{http::StatusCode, Json};
use serde::Serialize;

pub use routes::create_router;

/// JSON error body shared by all handlers.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl ErrorResponse {
    pub fn with_status(status: StatusCode, error: impl Into<String>) -> (StatusCode, Json<Self>) {
        (
            status,
            Json(Self {
                error: error.into(),
            }),
        )
    }
}
