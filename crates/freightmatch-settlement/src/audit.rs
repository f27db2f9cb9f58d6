//! Audit sink seam — the append-only settlement trail.
//!
//! The sink is an external collaborator: the engine writes to it after
//! commit, never reads it back, and never lets a sink failure undo a
//! committed transaction (failures are retried once and logged).

use parking_lot::Mutex;

use freightmatch_types::{AuditEvent, Result};

/// Write-only audit trail consumed by the settlement engine.
pub trait AuditSink: Send + Sync {
    /// Append one event. Implementations should be fast; the engine calls
    /// this on the request path (post-commit).
    fn record(&self, event: &AuditEvent) -> Result<()>;
}

/// In-memory append-only sink, used in tests and single-process deployments.
#[derive(Default)]
pub struct MemoryAuditSink {
    events: Mutex<Vec<AuditEvent>>,
}

impl MemoryAuditSink {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the recorded trail, in append order.
    #[must_use]
    pub fn events(&self) -> Vec<AuditEvent> {
        self.events.lock().clone()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.events.lock().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.events.lock().is_empty()
    }
}

impl AuditSink for MemoryAuditSink {
    fn record(&self, event: &AuditEvent) -> Result<()> {
        self.events.lock().push(event.clone());
        Ok(())
    }
}

/// Sink that only emits a structured log line; for deployments where the
/// real trail lives behind a log shipper.
#[derive(Default)]
pub struct TracingAuditSink;

impl AuditSink for TracingAuditSink {
    fn record(&self, event: &AuditEvent) -> Result<()> {
        tracing::info!(
            acting_user = %event.acting_user_id,
            action = %event.action,
            shipment_id = %event.shipment_id,
            offer_id = ?event.offer_id,
            committed = event.outcome.is_committed(),
            hash = %event.hash_short(),
            "audit event"
        );
        Ok(())
    }
}
