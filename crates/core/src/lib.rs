pub mod analysis;
pub mod assignment;
pub mod audit;
pub mod config;
pub mod metrics;
pub mod notify;
pub mod orchestrator;
pub mod testing;
pub mod ticket;
pub mod user;
pub mod workflow;

pub use analysis::{
    build_analysis_client, AnalysisClient, AnalysisConfig, AnalysisError, LlmClient, LlmError,
    LlmProvider, TriageResult,
};
pub use assignment::{AssignmentError, AssignmentResolver};
pub use audit::{
    create_audit_system, AuditError, AuditEvent, AuditFilter, AuditHandle, AuditRecord,
    AuditStore, AuditWriter, SqliteAuditStore,
};
pub use config::{
    load_config, load_config_from_str, validate_config, Config, ConfigError, SanitizedConfig,
};
pub use notify::{build_mail_sender, MailConfig, MailError, MailMessage, MailSender, Notifier};
pub use orchestrator::{
    DispatcherConfig, DispatcherError, DispatcherStatus, TicketCreatedEvent, TriageDispatcher,
};
pub use ticket::{
    CreateTicketRequest, Priority, SqliteTicketStore, Ticket, TicketError, TicketFilter,
    TicketStatus, TicketStore, TicketUpdate,
};
pub use user::{CreateUserRequest, Role, SqliteUserStore, User, UserError, UserStore};
pub use workflow::{TriageOutcome, TriageWorkflow, WorkflowError, WorkflowStep};
