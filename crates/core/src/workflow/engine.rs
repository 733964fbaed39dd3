//! The triage workflow.

use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, info, warn};

use super::types::{TriageOutcome, WorkflowError, WorkflowStep};
use crate::analysis::AnalysisClient;
use crate::assignment::AssignmentResolver;
use crate::audit::{AuditEvent, AuditHandle};
use crate::metrics;
use crate::notify::Notifier;
use crate::ticket::{Priority, Ticket, TicketStatus, TicketStore, TicketUpdate};

/// Runs the triage steps for one "ticket created" event.
///
/// Safe to invoke repeatedly for the same ticket: once `processed` is set,
/// later invocations return [`TriageOutcome::AlreadyProcessed`] without
/// writing anything. Every step persists its own changes and hands the
/// stored snapshot to the next one.
pub struct TriageWorkflow {
    tickets: Arc<dyn TicketStore>,
    analysis: AnalysisClient,
    resolver: AssignmentResolver,
    notifier: Notifier,
    audit: Option<AuditHandle>,
}

impl TriageWorkflow {
    pub fn new(
        tickets: Arc<dyn TicketStore>,
        analysis: AnalysisClient,
        resolver: AssignmentResolver,
        notifier: Notifier,
    ) -> Self {
        Self {
            tickets,
            analysis,
            resolver,
            notifier,
            audit: None,
        }
    }

    pub fn with_audit(mut self, audit: AuditHandle) -> Self {
        self.audit = Some(audit);
        self
    }

    /// Process a "ticket created" event.
    pub async fn process_ticket_created(
        &self,
        ticket_id: &str,
    ) -> Result<TriageOutcome, WorkflowError> {
        let started = Instant::now();
        let result = self.run(ticket_id, started).await;

        let label = match &result {
            Ok(outcome) => outcome.as_str(),
            Err(_) => "failed",
        };
        metrics::TRIAGE_RUNS.with_label_values(&[label]).inc();
        metrics::TRIAGE_DURATION
            .with_label_values(&[label])
            .observe(started.elapsed().as_secs_f64());

        result
    }

    async fn run(&self, ticket_id: &str, started: Instant) -> Result<TriageOutcome, WorkflowError> {
        // 1. Fetch
        let ticket = self
            .tickets
            .get(ticket_id)
            .map_err(|e| WorkflowError::store(WorkflowStep::Fetch, e))?
            .ok_or_else(|| WorkflowError::TicketNotFound(ticket_id.to_string()))?;

        // 2. Idempotency check
        if ticket.processed {
            info!("Ticket {} already processed, skipping", ticket.id);
            self.emit(AuditEvent::TriageSkipped {
                ticket_id: ticket.id.clone(),
                reason: "already processed".to_string(),
            })
            .await;
            return Ok(TriageOutcome::AlreadyProcessed);
        }

        info!("Triage started for ticket {}", ticket.id);
        self.emit(AuditEvent::TriageStarted {
            ticket_id: ticket.id.clone(),
        })
        .await;

        let ticket = self.normalize_status(ticket).await?;

        // 4. Analyze
        let triage = self
            .analysis
            .analyze(&ticket.title, &ticket.description)
            .await?;

        // 5. Persist analysis
        let priority = Priority::coerce(&triage.priority);
        if priority.as_str() != triage.priority {
            debug!(
                "Coerced priority {:?} to {} for ticket {}",
                triage.priority, priority, ticket.id
            );
        }
        let previous_status = ticket.status;
        let ticket = self.update(
            &ticket.id,
            WorkflowStep::PersistAnalysis,
            TicketUpdate::new()
                .with_priority(priority)
                .with_summary(triage.summary)
                .with_helpful_notes(triage.helpful_notes)
                .with_related_skills(triage.related_skills)
                .with_status(TicketStatus::InProgress),
        )?;
        self.emit(AuditEvent::TicketAnalyzed {
            ticket_id: ticket.id.clone(),
            raw_priority: triage.priority,
            priority: ticket.priority.to_string(),
            related_skills: ticket.related_skills.clone(),
        })
        .await;
        self.emit_status_change(&ticket, previous_status).await;

        // 6. Assign
        let assignee = self.resolver.resolve(&ticket.related_skills)?;
        let ticket = self.update(
            &ticket.id,
            WorkflowStep::Assign,
            TicketUpdate::new().with_assigned_to(assignee.as_ref().map(|u| u.id.clone())),
        )?;
        let kind = assignee.as_ref().map(|u| u.role.as_str()).unwrap_or("none");
        metrics::ASSIGNMENTS.with_label_values(&[kind]).inc();
        self.emit(AuditEvent::TicketAssigned {
            ticket_id: ticket.id.clone(),
            assignee_id: assignee.as_ref().map(|u| u.id.clone()),
            assignee_role: assignee.as_ref().map(|u| u.role.to_string()),
        })
        .await;

        // 7. Notify
        match &assignee {
            Some(user) => {
                let delivered = self.notifier.notify(&ticket, user).await;
                self.emit(AuditEvent::NotificationAttempted {
                    ticket_id: ticket.id.clone(),
                    recipient_id: user.id.clone(),
                    delivered,
                })
                .await;
            }
            None => warn!("Ticket {} left unassigned, no notification sent", ticket.id),
        }

        // 8. Mark processed
        let ticket = self.update(
            &ticket.id,
            WorkflowStep::MarkProcessed,
            TicketUpdate::new().with_processed(true),
        )?;

        let duration_ms = started.elapsed().as_millis() as u64;
        info!(
            "Triage completed for ticket {} in {}ms (priority={}, assigned_to={:?})",
            ticket.id, duration_ms, ticket.priority, ticket.assigned_to
        );
        self.emit(AuditEvent::TriageCompleted {
            ticket_id: ticket.id.clone(),
            assigned_to: ticket.assigned_to.clone(),
            duration_ms,
        })
        .await;

        Ok(TriageOutcome::Completed { ticket })
    }

    /// Step 3: move a ticket out of its initial status.
    async fn normalize_status(&self, ticket: Ticket) -> Result<Ticket, WorkflowError> {
        if !ticket.status.is_pre_triage() {
            return Ok(ticket);
        }

        let previous = ticket.status;
        let ticket = self.update(
            &ticket.id,
            WorkflowStep::NormalizeStatus,
            TicketUpdate::new().with_status(TicketStatus::Todo),
        )?;
        self.emit_status_change(&ticket, previous).await;
        Ok(ticket)
    }

    fn update(
        &self,
        ticket_id: &str,
        step: WorkflowStep,
        update: TicketUpdate,
    ) -> Result<Ticket, WorkflowError> {
        debug!("Ticket {}: {}", ticket_id, step);
        self.tickets
            .update_fields(ticket_id, &update)
            .map_err(|e| WorkflowError::store(step, e))
    }

    async fn emit_status_change(&self, ticket: &Ticket, previous: TicketStatus) {
        if ticket.status == previous {
            return;
        }
        info!("Ticket {}: {} -> {}", ticket.id, previous, ticket.status);
        self.emit(AuditEvent::TicketStatusChanged {
            ticket_id: ticket.id.clone(),
            from_status: previous.to_string(),
            to_status: ticket.status.to_string(),
        })
        .await;
    }

    async fn emit(&self, event: AuditEvent) {
        if let Some(ref audit) = self.audit {
            audit.emit(event).await;
        }
    }
}
