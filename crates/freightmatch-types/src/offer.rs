//! Offer types for the FreightMatch marketplace.
//!
//! An offer is a carrier's bid to fulfill a shipment at a given price. It is
//! resolved (accepted or rejected) exactly once by the settlement
//! transaction and is immutable afterward.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::{OfferId, ShipmentId, UserId};

/// Resolution state of an offer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OfferStatus {
    /// Competing; not yet resolved by settlement.
    Pending,
    /// The winning bid. At most one per shipment, ever.
    Accepted,
    /// Lost the settlement, was individually rejected, or swept by
    /// cancellation.
    Rejected,
}

impl std::fmt::Display for OfferStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pending => write!(f, "PENDING"),
            Self::Accepted => write!(f, "ACCEPTED"),
            Self::Rejected => write!(f, "REJECTED"),
        }
    }
}

/// A carrier's bid on a shipment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Offer {
    pub id: OfferId,
    pub shipment_id: ShipmentId,
    pub carrier_id: UserId,
    /// Bid price in the platform currency. Strictly positive.
    pub price: Decimal,
    pub message: Option<String>,
    pub status: OfferStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Offer {
    /// Create a pending offer.
    #[must_use]
    pub fn new(
        shipment_id: ShipmentId,
        carrier_id: UserId,
        price: Decimal,
        message: Option<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: OfferId::new(),
            shipment_id,
            carrier_id,
            price,
            message,
            status: OfferStatus::Pending,
            created_at: now,
            updated_at: now,
        }
    }

    #[must_use]
    pub fn is_pending(&self) -> bool {
        self.status == OfferStatus::Pending
    }

    #[must_use]
    pub fn is_resolved(&self) -> bool {
        self.status != OfferStatus::Pending
    }
}

impl std::fmt::Display for Offer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Offer[{}] shipment={} carrier={} price={} ({})",
            self.id, self.shipment_id, self.carrier_id, self.price, self.status,
        )
    }
}

/// Test helpers.
#[cfg(any(test, feature = "test-helpers"))]
impl Offer {
    pub fn dummy(shipment_id: ShipmentId, price: Decimal) -> Self {
        Self::new(shipment_id, UserId::new(), price, None)
    }

    pub fn dummy_for_carrier(shipment_id: ShipmentId, carrier_id: UserId, price: Decimal) -> Self {
        Self::new(shipment_id, carrier_id, price, None)
    }
}
