//! Triage dispatcher implementation.
//!
//! Consumes "ticket created" events from a bounded queue and runs the triage
//! workflow for each on its own task, retrying failed runs. A periodic scan
//! re-submits tickets that were never processed, which covers lost events
//! and tickets created while the service was down. A ticket whose run gave
//! up is left to a fresh event; the scan does not spend another retry
//! budget on it.

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::audit::{AuditEvent, AuditHandle};
use crate::metrics;
use crate::ticket::{TicketFilter, TicketStore};
use crate::workflow::{TriageOutcome, TriageWorkflow, WorkflowError};

use super::config::DispatcherConfig;
use super::types::{DispatcherError, DispatcherStatus, TicketCreatedEvent};

/// How long `stop` waits for running workflows to finish.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

/// State shared with spawned tasks.
struct Shared {
    config: DispatcherConfig,
    workflow: Arc<TriageWorkflow>,
    tickets: Arc<dyn TicketStore>,
    audit: Option<AuditHandle>,
    in_flight: Mutex<HashSet<String>>,
    /// Tickets whose last run used up its attempts or failed permanently.
    exhausted: Mutex<HashSet<String>>,
}

/// Removes a ticket from the in-flight set when dropped.
struct InFlightGuard {
    shared: Arc<Shared>,
    ticket_id: String,
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.shared.in_flight_set().remove(&self.ticket_id);
        metrics::IN_FLIGHT.dec();
    }
}

impl Shared {
    fn in_flight_set(&self) -> MutexGuard<'_, HashSet<String>> {
        // The set holds plain ids; a panic while holding the lock cannot
        // leave it inconsistent.
        self.in_flight.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn exhausted_set(&self) -> MutexGuard<'_, HashSet<String>> {
        self.exhausted.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn claim(self: &Arc<Self>, ticket_id: &str) -> Option<InFlightGuard> {
        if !self.in_flight_set().insert(ticket_id.to_string()) {
            return None;
        }
        metrics::IN_FLIGHT.inc();
        Some(InFlightGuard {
            shared: Arc::clone(self),
            ticket_id: ticket_id.to_string(),
        })
    }

    async fn emit(&self, event: AuditEvent) {
        if let Some(ref audit) = self.audit {
            audit.emit(event).await;
        }
    }

    /// Run the workflow for one ticket with the configured retry policy.
    async fn dispatch(self: &Arc<Self>, ticket_id: &str) -> Result<TriageOutcome, DispatcherError> {
        let Some(_guard) = self.claim(ticket_id) else {
            debug!("Ticket {} already in flight, dropping event", ticket_id);
            metrics::DUPLICATE_EVENTS.inc();
            return Err(DispatcherError::AlreadyInFlight(ticket_id.to_string()));
        };

        let max_attempts = self.config.max_attempts();
        let mut attempt = 0;

        loop {
            attempt += 1;

            let result = match self.config.run_timeout() {
                Some(deadline) => {
                    match tokio::time::timeout(
                        deadline,
                        self.workflow.process_ticket_created(ticket_id),
                    )
                    .await
                    {
                        Ok(result) => result,
                        Err(_) => Err(WorkflowError::DeadlineExceeded(deadline)),
                    }
                }
                None => self.workflow.process_ticket_created(ticket_id).await,
            };

            let err = match result {
                Ok(outcome) => {
                    self.exhausted_set().remove(ticket_id);
                    return Ok(outcome);
                }
                Err(err) => err,
            };

            let will_retry = err.is_retriable() && attempt < max_attempts;
            self.emit(AuditEvent::TriageFailed {
                ticket_id: ticket_id.to_string(),
                attempt,
                error: err.to_string(),
                retriable: err.is_retriable(),
                will_retry,
            })
            .await;

            if !will_retry {
                if !matches!(err, WorkflowError::TicketNotFound(_)) {
                    self.exhausted_set().insert(ticket_id.to_string());
                }
                if err.is_retriable() {
                    error!(
                        "Triage for ticket {} failed after {} attempts: {}",
                        ticket_id, attempt, err
                    );
                } else {
                    warn!("Triage for ticket {} failed permanently: {}", ticket_id, err);
                }
                return Err(DispatcherError::Workflow {
                    attempts: attempt,
                    source: err,
                });
            }

            let delay = self.config.backoff_for(attempt);
            warn!(
                "Triage attempt {}/{} for ticket {} failed: {}; retrying in {:?}",
                attempt, max_attempts, ticket_id, err, delay
            );
            metrics::WORKFLOW_RETRIES.inc();
            tokio::time::sleep(delay).await;
        }
    }
}

/// In-process consumer of "ticket created" events.
pub struct TriageDispatcher {
    shared: Arc<Shared>,
    running: Arc<AtomicBool>,
    queue_tx: mpsc::Sender<TicketCreatedEvent>,
    queue_rx: Arc<tokio::sync::Mutex<mpsc::Receiver<TicketCreatedEvent>>>,
    shutdown_tx: broadcast::Sender<()>,
    tasks: tokio::sync::Mutex<Vec<JoinHandle<()>>>,
}

impl TriageDispatcher {
    /// Create a new dispatcher. Nothing runs until [`start`](Self::start).
    pub fn new(
        config: DispatcherConfig,
        workflow: Arc<TriageWorkflow>,
        tickets: Arc<dyn TicketStore>,
        audit: Option<AuditHandle>,
    ) -> Self {
        let (queue_tx, queue_rx) = mpsc::channel(config.queue_capacity.max(1));
        let (shutdown_tx, _) = broadcast::channel(1);

        Self {
            shared: Arc::new(Shared {
                config,
                workflow,
                tickets,
                audit,
                in_flight: Mutex::new(HashSet::new()),
                exhausted: Mutex::new(HashSet::new()),
            }),
            running: Arc::new(AtomicBool::new(false)),
            queue_tx,
            queue_rx: Arc::new(tokio::sync::Mutex::new(queue_rx)),
            shutdown_tx,
            tasks: tokio::sync::Mutex::new(Vec::new()),
        }
    }

    /// Enqueue a "ticket created" event without waiting.
    pub fn submit(&self, ticket_id: &str) -> Result<(), DispatcherError> {
        self.queue_tx
            .try_send(TicketCreatedEvent::new(ticket_id))
            .map_err(|e| match e {
                mpsc::error::TrySendError::Full(_) => DispatcherError::QueueFull,
                mpsc::error::TrySendError::Closed(_) => DispatcherError::QueueClosed,
            })
    }

    /// Run the workflow for a ticket inline, with retries.
    pub async fn dispatch(&self, ticket_id: &str) -> Result<TriageOutcome, DispatcherError> {
        self.shared.dispatch(ticket_id).await
    }

    /// Start the queue consumer and the scan loop.
    pub async fn start(&self) {
        if !self.shared.config.enabled {
            info!("Triage dispatcher disabled, events will not be consumed");
            return;
        }
        if self.running.swap(true, Ordering::SeqCst) {
            warn!("Dispatcher already running");
            return;
        }

        info!("Starting triage dispatcher");

        // Pick up tickets left unprocessed by a previous run.
        let recovered = Self::scan_unprocessed(&self.shared, &self.queue_tx);
        if recovered > 0 {
            info!("Recovered {} unprocessed tickets", recovered);
        }

        let mut tasks = self.tasks.lock().await;
        tasks.push(self.spawn_consumer_loop());
        if let Some(interval) = self.shared.config.scan_interval() {
            tasks.push(self.spawn_scan_loop(interval));
        }

        info!("Triage dispatcher started");
    }

    /// Stop the background loops and wait briefly for running workflows.
    pub async fn stop(&self) {
        if !self.running.swap(false, Ordering::SeqCst) {
            debug!("Dispatcher not running");
            return;
        }

        info!("Stopping triage dispatcher");
        let _ = self.shutdown_tx.send(());

        for task in self.tasks.lock().await.drain(..) {
            if let Err(e) = task.await {
                error!("Dispatcher task ended abnormally: {}", e);
            }
        }

        let waited = tokio::time::timeout(SHUTDOWN_GRACE, async {
            while !self.shared.in_flight_set().is_empty() {
                tokio::time::sleep(Duration::from_millis(50)).await;
            }
        })
        .await;
        if waited.is_err() {
            warn!(
                "Stopped with {} workflows still running",
                self.shared.in_flight_set().len()
            );
        }

        info!("Triage dispatcher stopped");
    }

    /// Get current dispatcher status.
    pub fn status(&self) -> DispatcherStatus {
        let unprocessed_count = self
            .shared
            .tickets
            .count(&TicketFilter::new().with_processed(false))
            .unwrap_or(0) as usize;

        DispatcherStatus {
            running: self.running.load(Ordering::Relaxed),
            in_flight: self.shared.in_flight_set().len(),
            queued: self.queue_tx.max_capacity() - self.queue_tx.capacity(),
            unprocessed_count,
            exhausted: self.shared.exhausted_set().len(),
        }
    }

    fn spawn_consumer_loop(&self) -> JoinHandle<()> {
        let shared = Arc::clone(&self.shared);
        let queue_rx = Arc::clone(&self.queue_rx);
        let mut shutdown_rx = self.shutdown_tx.subscribe();

        tokio::spawn(async move {
            let mut rx = queue_rx.lock().await;
            info!("Event consumer started");
            loop {
                tokio::select! {
                    _ = shutdown_rx.recv() => {
                        info!("Event consumer received shutdown signal");
                        break;
                    }
                    event = rx.recv() => {
                        let Some(event) = event else {
                            break;
                        };
                        debug!(
                            "Received ticket-created event for {} (queued at {})",
                            event.ticket_id, event.received_at
                        );
                        let shared = Arc::clone(&shared);
                        tokio::spawn(async move {
                            match shared.dispatch(&event.ticket_id).await {
                                Ok(outcome) => debug!(
                                    "Ticket {} handled: {}",
                                    event.ticket_id,
                                    outcome.as_str()
                                ),
                                Err(DispatcherError::AlreadyInFlight(_)) => {}
                                Err(e) => debug!("Ticket {} not triaged: {}", event.ticket_id, e),
                            }
                        });
                    }
                }
            }
            info!("Event consumer stopped");
        })
    }

    fn spawn_scan_loop(&self, interval: Duration) -> JoinHandle<()> {
        let shared = Arc::clone(&self.shared);
        let queue_tx = self.queue_tx.clone();
        let running = Arc::clone(&self.running);
        let mut shutdown_rx = self.shutdown_tx.subscribe();

        tokio::spawn(async move {
            info!("Scan loop started (every {:?})", interval);
            loop {
                tokio::select! {
                    _ = shutdown_rx.recv() => {
                        info!("Scan loop received shutdown signal");
                        break;
                    }
                    _ = tokio::time::sleep(interval) => {
                        if !running.load(Ordering::Relaxed) {
                            break;
                        }
                        let submitted = Self::scan_unprocessed(&shared, &queue_tx);
                        if submitted > 0 {
                            info!("Scan re-submitted {} unprocessed tickets", submitted);
                        }
                    }
                }
            }
        })
    }

    /// Queue up to `scan_batch_size` unprocessed tickets that are neither
    /// running nor exhausted.
    fn scan_unprocessed(shared: &Shared, queue_tx: &mpsc::Sender<TicketCreatedEvent>) -> usize {
        let batch_size = shared.config.scan_batch_size;
        // Exhausted tickets are oldest-first too; widen the page so they
        // cannot crowd out newer ones.
        let skipped = shared.exhausted_set().len() as i64;
        let filter = TicketFilter::new()
            .with_processed(false)
            .with_limit(batch_size.saturating_add(skipped));

        let tickets = match shared.tickets.list(&filter) {
            Ok(tickets) => tickets,
            Err(e) => {
                error!("Failed to scan for unprocessed tickets: {}", e);
                return 0;
            }
        };

        let mut submitted = 0;
        for ticket in tickets {
            if submitted >= batch_size {
                break;
            }
            if shared.in_flight_set().contains(&ticket.id)
                || shared.exhausted_set().contains(&ticket.id)
            {
                continue;
            }
            match queue_tx.try_send(TicketCreatedEvent::new(ticket.id)) {
                Ok(()) => submitted += 1,
                Err(mpsc::error::TrySendError::Full(_)) => {
                    warn!("Event queue full, deferring remaining tickets to the next scan");
                    break;
                }
                Err(mpsc::error::TrySendError::Closed(_)) => break,
            }
        }
        submitted as usize
    }
}
