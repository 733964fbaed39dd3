use std::sync::Arc;
use triage_core::{AuditStore, Config, SanitizedConfig, TicketStore, TriageDispatcher};

/// Shared application state
pub struct AppState {
    config: Config,
    audit_store: Arc<dyn AuditStore>,
    ticket_store: Arc<dyn TicketStore>,
    dispatcher: Arc<TriageDispatcher>,
}

impl AppState {
    pub fn new(
        config: Config,
        audit_store: Arc<dyn AuditStore>,
        ticket_store: Arc<dyn TicketStore>,
        dispatcher: Arc<TriageDispatcher>,
    ) -> Self {
        Self {
            config,
            audit_store,
            ticket_store,
            dispatcher,
        }
    }

    pub fn sanitized_config(&self) -> SanitizedConfig {
        SanitizedConfig::from(&self.config)
    }

    pub fn audit_store(&self) -> &dyn AuditStore {
        self.audit_store.as_ref()
    }

    pub fn ticket_store(&self) -> &dyn TicketStore {
        self.ticket_store.as_ref()
    }

    pub fn dispatcher(&self) -> &TriageDispatcher {
        self.dispatcher.as_ref()
    }
}
