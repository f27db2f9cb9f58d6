//! Notification emitter seam.
//!
//! Invoked post-commit, once per affected party: the shipment owner, the
//! winning carrier, and each losing carrier. Delivery is at-least-once best
//! effort — the engine retries a failed emit once and then logs it; a
//! committed settlement is never undone for a notification failure.

use parking_lot::Mutex;

use freightmatch_types::{Notification, Result};

/// Outbound notification channel consumed by the settlement engine.
pub trait NotificationEmitter: Send + Sync {
    fn notify(&self, notification: &Notification) -> Result<()>;
}

/// In-memory emitter, used in tests and single-process deployments.
#[derive(Default)]
pub struct MemoryEmitter {
    sent: Mutex<Vec<Notification>>,
}

impl MemoryEmitter {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of everything emitted so far, in send order.
    #[must_use]
    pub fn sent(&self) -> Vec<Notification> {
        self.sent.lock().clone()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.sent.lock().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sent.lock().is_empty()
    }
}

impl NotificationEmitter for MemoryEmitter {
    fn notify(&self, notification: &Notification) -> Result<()> {
        self.sent.lock().push(notification.clone());
        Ok(())
    }
}

/// Emitter that only logs; for deployments where delivery rides on the log
/// pipeline or is wired up later.
#[derive(Default)]
pub struct TracingEmitter;

impl NotificationEmitter for TracingEmitter {
    fn notify(&self, notification: &Notification) -> Result<()> {
        tracing::info!(
            user_id = %notification.user_id,
            kind = %notification.kind,
            shipment_id = %notification.shipment_id,
            "notification queued"
        );
        Ok(())
    }
}
