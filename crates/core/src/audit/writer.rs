use std::sync::Arc;

use tokio::sync::mpsc;

use super::{AuditEventEnvelope, AuditHandle, AuditRecord, AuditStore};

/// Background task draining audit events into an [`AuditStore`]
pub struct AuditWriter {
    rx: mpsc::Receiver<AuditEventEnvelope>,
    store: Arc<dyn AuditStore>,
}

impl AuditWriter {
    pub fn new(rx: mpsc::Receiver<AuditEventEnvelope>, store: Arc<dyn AuditStore>) -> Self {
        Self { rx, store }
    }

    /// Consume events until every [`AuditHandle`] has been dropped.
    ///
    /// Storage failures are logged; the writer keeps going.
    pub async fn run(mut self) {
        tracing::info!("Audit writer started");
        let mut written = 0u64;

        while let Some(envelope) = self.rx.recv().await {
            let record = AuditRecord::from_event(envelope.timestamp, envelope.event);
            match self.store.insert(&record) {
                Ok(_) => written += 1,
                Err(e) => tracing::error!(
                    "Failed to write audit event {}: {}",
                    record.event_type,
                    e
                ),
            }
        }

        tracing::info!("Audit writer shutting down after {} events", written);
    }
}

/// Create a handle/writer pair.
///
/// Spawn the writer with `tokio::spawn(writer.run())` and clone the handle
/// into every component that emits events.
pub fn create_audit_system(
    store: Arc<dyn AuditStore>,
    buffer_size: usize,
) -> (AuditHandle, AuditWriter) {
    let (tx, rx) = mpsc::channel(buffer_size);
    (AuditHandle::new(tx), AuditWriter::new(rx, store))
}
