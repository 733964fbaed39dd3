//! Ticket store wrapper that counts calls.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use crate::ticket::{
    CreateTicketRequest, Ticket, TicketError, TicketFilter, TicketStore, TicketUpdate,
};

/// Delegates to another [`TicketStore`] and counts reads and writes.
///
/// Used to assert that a run performed no writes at all.
pub struct CountingTicketStore {
    inner: Arc<dyn TicketStore>,
    reads: AtomicUsize,
    writes: AtomicUsize,
}

impl CountingTicketStore {
    pub fn new(inner: Arc<dyn TicketStore>) -> Self {
        Self {
            inner,
            reads: AtomicUsize::new(0),
            writes: AtomicUsize::new(0),
        }
    }

    pub fn read_count(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }

    /// Calls to `create` and `update_fields`, successful or not.
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    pub fn reset(&self) {
        self.reads.store(0, Ordering::SeqCst);
        self.writes.store(0, Ordering::SeqCst);
    }
}

impl TicketStore for CountingTicketStore {
    fn create(&self, request: CreateTicketRequest) -> Result<Ticket, TicketError> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        self.inner.create(request)
    }

    fn get(&self, id: &str) -> Result<Option<Ticket>, TicketError> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        self.inner.get(id)
    }

    fn update_fields(&self, id: &str, update: &TicketUpdate) -> Result<Ticket, TicketError> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        self.inner.update_fields(id, update)
    }

    fn list(&self, filter: &TicketFilter) -> Result<Vec<Ticket>, TicketError> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        self.inner.list(filter)
    }

    fn count(&self, filter: &TicketFilter) -> Result<i64, TicketError> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        self.inner.count(filter)
    }
}
