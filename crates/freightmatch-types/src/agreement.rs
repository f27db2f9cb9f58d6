//! Agreement types — the binding record created when an offer is accepted.
//!
//! An [`Agreement`] captures the price split at settlement time. It is the
//! authoritative commission record: `agreed_price == commission_amount +
//! carrier_receives` exactly, to the cent, and any accounting mirror must be
//! reconstructible from it.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::{AgreementId, OfferId, ShipmentId, UserId};

/// Lifecycle status of an agreement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgreementStatus {
    /// Created at settlement; awaiting carrier confirmation.
    Pending,
    /// Confirmed by the carrier.
    Accepted,
    /// Declined by the carrier post-settlement, or swept by cancellation.
    Rejected,
    /// Delivery confirmed; the agreement is closed.
    Completed,
}

impl std::fmt::Display for AgreementStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pending => write!(f, "PENDING"),
            Self::Accepted => write!(f, "ACCEPTED"),
            Self::Rejected => write!(f, "REJECTED"),
            Self::Completed => write!(f, "COMPLETED"),
        }
    }
}

/// The binding record linking a shipment, its winning offer, and the
/// commission split. Created exactly once per accepted offer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Agreement {
    /// Deterministic from (shipment, offer) — see [`AgreementId::deterministic`].
    pub id: AgreementId,
    pub offer_id: OfferId,
    pub shipment_id: ShipmentId,
    pub sender_id: UserId,
    pub carrier_id: UserId,
    /// The winning offer's price.
    pub agreed_price: Decimal,
    /// The platform's cut.
    pub commission_amount: Decimal,
    /// What the carrier is paid: `agreed_price - commission_amount`.
    pub carrier_receives: Decimal,
    pub status: AgreementStatus,
    pub created_at: DateTime<Utc>,
}

impl Agreement {
    /// Money conservation: the split must sum to the agreed price exactly.
    #[must_use]
    pub fn conserves_price(&self) -> bool {
        self.commission_amount + self.carrier_receives == self.agreed_price
    }

    #[must_use]
    pub fn is_open(&self) -> bool {
        matches!(self.status, AgreementStatus::Pending | AgreementStatus::Accepted)
    }
}

impl std::fmt::Display for Agreement {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Agreement[{}] shipment={} price={} commission={} carrier={} ({})",
            self.id,
            self.shipment_id,
            self.agreed_price,
            self.commission_amount,
            self.carrier_receives,
            self.status,
        )
    }
}
