//! Ticket storage trait and types.

use thiserror::Error;

use crate::ticket::{Ticket, TicketStatus, TicketUpdate};

/// Error type for ticket operations.
#[derive(Debug, Error)]
pub enum TicketError {
    /// Ticket not found.
    #[error("Ticket not found: {0}")]
    NotFound(String),
    /// Request rejected before touching storage.
    #[error("Invalid ticket: {0}")]
    Validation(String),
    /// Database error.
    #[error("Database error: {0}")]
    Database(String),
}

/// Request to create a new ticket.
#[derive(Debug, Clone)]
pub struct CreateTicketRequest {
    pub title: String,
    pub description: String,
    /// User creating the ticket.
    pub created_by: String,
}

impl CreateTicketRequest {
    pub fn new(
        title: impl Into<String>,
        description: impl Into<String>,
        created_by: impl Into<String>,
    ) -> Self {
        Self {
            title: title.into(),
            description: description.into(),
            created_by: created_by.into(),
        }
    }

    /// Check that title and description are present.
    pub fn validate(&self) -> Result<(), TicketError> {
        if self.title.trim().is_empty() {
            return Err(TicketError::Validation("title must not be empty".to_string()));
        }
        if self.description.trim().is_empty() {
            return Err(TicketError::Validation(
                "description must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}

/// Filter for querying tickets.
#[derive(Debug, Clone, Default)]
pub struct TicketFilter {
    /// Filter by status.
    pub status: Option<TicketStatus>,
    /// Filter by the idempotency flag.
    pub processed: Option<bool>,
    /// Filter by creator.
    pub created_by: Option<String>,
    /// Filter by assignee.
    pub assigned_to: Option<String>,
    /// Maximum number of results.
    pub limit: i64,
    /// Offset for pagination.
    pub offset: i64,
}

impl TicketFilter {
    /// Create a new filter with defaults.
    pub fn new() -> Self {
        Self {
            limit: 100,
            ..Default::default()
        }
    }

    pub fn with_status(mut self, status: TicketStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn with_processed(mut self, processed: bool) -> Self {
        self.processed = Some(processed);
        self
    }

    pub fn with_created_by(mut self, created_by: impl Into<String>) -> Self {
        self.created_by = Some(created_by.into());
        self
    }

    pub fn with_assigned_to(mut self, user_id: impl Into<String>) -> Self {
        self.assigned_to = Some(user_id.into());
        self
    }

    pub fn with_limit(mut self, limit: i64) -> Self {
        self.limit = limit;
        self
    }

    pub fn with_offset(mut self, offset: i64) -> Self {
        self.offset = offset;
        self
    }
}

/// Trait for ticket storage backends.
///
/// Every write is a single atomic operation on one ticket. Callers never
/// hold a transaction across calls.
pub trait TicketStore: Send + Sync {
    /// Create a new ticket in the `open`, unprocessed state.
    fn create(&self, request: CreateTicketRequest) -> Result<Ticket, TicketError>;

    /// Get a ticket by ID.
    fn get(&self, id: &str) -> Result<Option<Ticket>, TicketError>;

    /// Write the given fields and bump `updated_at`, returning the stored ticket.
    fn update_fields(&self, id: &str, update: &TicketUpdate) -> Result<Ticket, TicketError>;

    /// List tickets matching the filter, oldest first.
    fn list(&self, filter: &TicketFilter) -> Result<Vec<Ticket>, TicketError>;

    /// Count tickets matching the filter.
    fn count(&self, filter: &TicketFilter) -> Result<i64, TicketError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_rejects_blank_fields() {
        let request = CreateTicketRequest::new("  ", "body", "u1");
        assert!(matches!(request.validate(), Err(TicketError::Validation(_))));

        let request = CreateTicketRequest::new("Title", "", "u1");
        assert!(matches!(request.validate(), Err(TicketError::Validation(_))));

        let request = CreateTicketRequest::new("Title", "Body", "u1");
        assert!(request.validate().is_ok());
    }

    #[test]
    fn test_filter_defaults() {
        let filter = TicketFilter::new();
        assert_eq!(filter.limit, 100);
        assert_eq!(filter.offset, 0);
        assert!(filter.processed.is_none());

        let filter = TicketFilter::new().with_processed(false).with_limit(5);
        assert_eq!(filter.processed, Some(false));
        assert_eq!(filter.limit, 5);
    }

    #[test]
    fn test_error_display() {
        let err = TicketError::NotFound("abc".to_string());
        assert_eq!(err.to_string(), "Ticket not found: abc");
    }
}
