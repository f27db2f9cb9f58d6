//! Notification types emitted after a committed settlement.
//!
//! The settlement engine fans these out to the notification emitter once per
//! affected party. Delivery is at-least-once best effort; the emitter is an
//! external collaborator and its failures never undo a committed
//! transaction.

use serde::{Deserialize, Serialize};

use crate::{ShipmentId, UserId};

/// What the notification is about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    /// To the shipment owner: settlement committed.
    ShipmentSettled,
    /// To the winning carrier: your offer was accepted.
    OfferWon,
    /// To each losing carrier: your offer was rejected.
    OfferLost,
    /// To an affected party: the shipment was cancelled.
    ShipmentCancelled,
}

impl std::fmt::Display for NotificationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ShipmentSettled => write!(f, "SHIPMENT_SETTLED"),
            Self::OfferWon => write!(f, "OFFER_WON"),
            Self::OfferLost => write!(f, "OFFER_LOST"),
            Self::ShipmentCancelled => write!(f, "SHIPMENT_CANCELLED"),
        }
    }
}

/// A single queued notification to one user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notification {
    pub user_id: UserId,
    pub kind: NotificationKind,
    pub shipment_id: ShipmentId,
    /// Opaque payload for the delivery layer (price, route, template data).
    pub payload: serde_json::Value,
}

impl Notification {
    #[must_use]
    pub fn new(
        user_id: UserId,
        kind: NotificationKind,
        shipment_id: ShipmentId,
        payload: serde_json::Value,
    ) -> Self {
        Self {
            user_id,
            kind,
            shipment_id,
            payload,
        }
    }
}
