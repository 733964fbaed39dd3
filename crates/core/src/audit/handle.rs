use chrono::{DateTime, Utc};
use tokio::sync::mpsc;

use super::AuditEvent;

/// An event stamped with the time it was emitted
#[derive(Debug, Clone)]
pub struct AuditEventEnvelope {
    pub timestamp: DateTime<Utc>,
    pub event: AuditEvent,
}

impl AuditEventEnvelope {
    fn now(event: AuditEvent) -> Self {
        Self {
            timestamp: Utc::now(),
            event,
        }
    }
}

/// Cloneable sender for audit events.
///
/// Emitting never fails the caller: a full or closed channel is logged and
/// the event is dropped.
#[derive(Clone)]
pub struct AuditHandle {
    tx: mpsc::Sender<AuditEventEnvelope>,
}

impl AuditHandle {
    pub fn new(tx: mpsc::Sender<AuditEventEnvelope>) -> Self {
        Self { tx }
    }

    /// Emit an event, waiting for channel capacity
    pub async fn emit(&self, event: AuditEvent) {
        if let Err(e) = self.tx.send(AuditEventEnvelope::now(event)).await {
            tracing::error!("Failed to emit audit event: {}", e);
        }
    }

    /// Emit an event without waiting. Returns false if it was dropped.
    pub fn try_emit(&self, event: AuditEvent) -> bool {
        match self.tx.try_send(AuditEventEnvelope::now(event)) {
            Ok(()) => true,
            Err(e) => {
                tracing::error!("Failed to emit audit event: {}", e);
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn started(ticket_id: &str) -> AuditEvent {
        AuditEvent::TriageStarted {
            ticket_id: ticket_id.to_string(),
        }
    }

    #[tokio::test]
    async fn test_emit_stamps_event() {
        let (tx, mut rx) = mpsc::channel(10);
        let handle = AuditHandle::new(tx);

        let before = Utc::now();
        handle.emit(started("t-1")).await;

        let envelope = rx.recv().await.unwrap();
        assert!(envelope.timestamp >= before);
        assert_eq!(envelope.event.ticket_id(), Some("t-1"));
    }

    #[tokio::test]
    async fn test_clones_share_channel() {
        let (tx, mut rx) = mpsc::channel(10);
        let first = AuditHandle::new(tx);
        let second = first.clone();

        first.emit(started("t-1")).await;
        second.emit(started("t-2")).await;

        assert_eq!(rx.recv().await.unwrap().event.ticket_id(), Some("t-1"));
        assert_eq!(rx.recv().await.unwrap().event.ticket_id(), Some("t-2"));
    }

    #[test]
    fn test_try_emit_drops_when_full() {
        let (tx, _rx) = mpsc::channel(1);
        let handle = AuditHandle::new(tx);

        assert!(handle.try_emit(started("t-1")));
        assert!(!handle.try_emit(started("t-2")));
    }

    #[tokio::test]
    async fn test_emit_on_closed_channel_does_not_panic() {
        let (tx, rx) = mpsc::channel::<AuditEventEnvelope>(10);
        let handle = AuditHandle::new(tx);
        drop(rx);

        handle.emit(started("t-1")).await;
        assert!(!handle.try_emit(started("t-2")));
    }
}
