//! Shipment model and lifecycle status for the FreightMatch marketplace.
//!
//! `ShipmentStatus` is a closed enum: the transition graph in
//! `freightmatch-rules` matches on it exhaustively, so a new status fails to
//! compile rather than silently falling through. Two legacy spellings from
//! previously persisted records (`ACCEPTED`, `ASSIGNED`) are still accepted
//! as *input* and folded to their canonical variant at the parse boundary;
//! serialization always emits the canonical spelling.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::{FreightmatchError, Result, ShipmentId, UserId};

/// Lifecycle status of a shipment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd)]
pub enum ShipmentStatus {
    /// Posted, not yet visible to carriers.
    Pending,
    /// Open for bidding.
    Open,
    /// Actively collecting carrier offers.
    WaitingForOffers,
    /// Settlement committed: exactly one offer accepted.
    OfferAccepted,
    /// Carrier has started executing the shipment.
    InProgress,
    /// Cargo picked up at the origin.
    PickedUp,
    /// Cargo on the road.
    InTransit,
    /// Cargo handed over at the destination.
    Delivered,
    /// Delivery confirmed and agreement closed. Final state.
    Completed,
    /// Cancelled by the sender. Final state.
    Cancelled,
}

impl ShipmentStatus {
    /// Every canonical status, in lifecycle order.
    pub const ALL: [Self; 10] = [
        Self::Pending,
        Self::Open,
        Self::WaitingForOffers,
        Self::OfferAccepted,
        Self::InProgress,
        Self::PickedUp,
        Self::InTransit,
        Self::Delivered,
        Self::Completed,
        Self::Cancelled,
    ];

    /// Canonical wire spelling (SCREAMING_SNAKE_CASE).
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::Open => "OPEN",
            Self::WaitingForOffers => "WAITING_FOR_OFFERS",
            Self::OfferAccepted => "OFFER_ACCEPTED",
            Self::InProgress => "IN_PROGRESS",
            Self::PickedUp => "PICKED_UP",
            Self::InTransit => "IN_TRANSIT",
            Self::Delivered => "DELIVERED",
            Self::Completed => "COMPLETED",
            Self::Cancelled => "CANCELLED",
        }
    }

    /// Parse a raw status string as stored or sent by clients.
    ///
    /// Normalization: surrounding whitespace is trimmed, hyphens fold to
    /// underscores, case is ignored. Legacy aliases resolve to their
    /// canonical variant: `ACCEPTED → OFFER_ACCEPTED`,
    /// `ASSIGNED → IN_PROGRESS`.
    ///
    /// # Errors
    /// Returns [`FreightmatchError::InvalidStatus`] for anything outside the
    /// canonical set and the two aliases.
    pub fn from_raw(raw: &str) -> Result<Self> {
        let normalized = raw.trim().to_ascii_lowercase().replace('-', "_");
        match normalized.as_str() {
            "pending" => Ok(Self::Pending),
            "open" => Ok(Self::Open),
            "waiting_for_offers" => Ok(Self::WaitingForOffers),
            "offer_accepted" => Ok(Self::OfferAccepted),
            "in_progress" => Ok(Self::InProgress),
            "picked_up" => Ok(Self::PickedUp),
            "in_transit" => Ok(Self::InTransit),
            "delivered" => Ok(Self::Delivered),
            "completed" => Ok(Self::Completed),
            "cancelled" => Ok(Self::Cancelled),
            // Legacy spellings kept for previously persisted records.
            "accepted" => Ok(Self::OfferAccepted),
            "assigned" => Ok(Self::InProgress),
            _ => Err(FreightmatchError::InvalidStatus {
                raw: raw.to_string(),
            }),
        }
    }

    /// Whether this status has no outgoing transitions.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Cancelled)
    }

    /// Whether carriers may still submit offers on a shipment in this status.
    #[must_use]
    pub fn accepts_offers(&self) -> bool {
        matches!(self, Self::Pending | Self::Open | Self::WaitingForOffers)
    }
}

impl std::fmt::Display for ShipmentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// Normalize on read, canonicalize on write: serde goes through `from_raw`,
// so records persisted with legacy spellings still deserialize, while
// everything we write uses the canonical spelling.
impl Serialize for ShipmentStatus {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for ShipmentStatus {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Self::from_raw(&raw).map_err(serde::de::Error::custom)
    }
}

/// A transport request posted by a sender.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Shipment {
    pub id: ShipmentId,
    /// The requester who owns this shipment for its whole lifetime.
    pub sender_id: UserId,
    pub pickup_city: String,
    pub delivery_city: String,
    pub status: ShipmentStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Shipment {
    /// Create a shipment open for carrier offers.
    #[must_use]
    pub fn new(
        sender_id: UserId,
        pickup_city: impl Into<String>,
        delivery_city: impl Into<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: ShipmentId::new(),
            sender_id,
            pickup_city: pickup_city.into(),
            delivery_city: delivery_city.into(),
            status: ShipmentStatus::WaitingForOffers,
            created_at: now,
            updated_at: now,
        }
    }

    #[must_use]
    pub fn is_owned_by(&self, user_id: UserId) -> bool {
        self.sender_id == user_id
    }
}

impl std::fmt::Display for Shipment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Shipment[{}] {} -> {} ({})",
            self.id, self.pickup_city, self.delivery_city, self.status,
        )
    }
}

/// Test helpers.
#[cfg(any(test, feature = "test-helpers"))]
impl Shipment {
    pub fn dummy(sender_id: UserId) -> Self {
        Self::new(sender_id, "Istanbul", "Ankara")
    }

    pub fn dummy_with_status(sender_id: UserId, status: ShipmentStatus) -> Self {
        let mut shipment = Self::dummy(sender_id);
        shipment.status = status;
        shipment
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn canonical_spellings_parse() {
        for status in ShipmentStatus::ALL {
            assert_eq!(ShipmentStatus::from_raw(status.as_str()).unwrap(), status);
        }
    }

    #[test]
    fn parse_normalizes_case_and_hyphens() {
        assert_eq!(
            ShipmentStatus::from_raw("waiting-for-offers").unwrap(),
            ShipmentStatus::WaitingForOffers
        );
        assert_eq!(
            ShipmentStatus::from_raw("  Picked_Up ").unwrap(),
            ShipmentStatus::PickedUp
        );
        assert_eq!(
            ShipmentStatus::from_raw("In-Transit").unwrap(),
            ShipmentStatus::InTransit
        );
    }

    #[test]
    fn legacy_aliases_fold_to_canonical() {
        assert_eq!(
            ShipmentStatus::from_raw("ACCEPTED").unwrap(),
            ShipmentStatus::OfferAccepted
        );
        assert_eq!(
            ShipmentStatus::from_raw("assigned").unwrap(),
            ShipmentStatus::InProgress
        );
    }

    #[test]
    fn unknown_status_rejected() {
        let err = ShipmentStatus::from_raw("TELEPORTED").unwrap_err();
        assert!(matches!(err, FreightmatchError::InvalidStatus { .. }));
        let msg = format!("{err}");
        assert!(msg.contains("TELEPORTED"), "Got: {msg}");
    }

    #[test]
    fn terminal_states() {
        assert!(ShipmentStatus::Completed.is_terminal());
        assert!(ShipmentStatus::Cancelled.is_terminal());
        for status in ShipmentStatus::ALL {
            if !matches!(status, ShipmentStatus::Completed | ShipmentStatus::Cancelled) {
                assert!(!status.is_terminal(), "{status} should not be terminal");
            }
        }
    }

    #[test]
    fn offer_window_statuses() {
        assert!(ShipmentStatus::Pending.accepts_offers());
        assert!(ShipmentStatus::Open.accepts_offers());
        assert!(ShipmentStatus::WaitingForOffers.accepts_offers());
        assert!(!ShipmentStatus::OfferAccepted.accepts_offers());
        assert!(!ShipmentStatus::Cancelled.accepts_offers());
    }

    #[test]
    fn serde_emits_canonical_spelling() {
        let json = serde_json::to_string(&ShipmentStatus::OfferAccepted).unwrap();
        assert_eq!(json, "\"OFFER_ACCEPTED\"");
    }

    #[test]
    fn serde_reads_legacy_spelling() {
        let status: ShipmentStatus = serde_json::from_str("\"ACCEPTED\"").unwrap();
        assert_eq!(status, ShipmentStatus::OfferAccepted);

        let status: ShipmentStatus = serde_json::from_str("\"assigned\"").unwrap();
        assert_eq!(status, ShipmentStatus::InProgress);
    }

    #[test]
    fn serde_rejects_unknown_spelling() {
        let result: std::result::Result<ShipmentStatus, _> = serde_json::from_str("\"BOGUS\"");
        assert!(result.is_err());
    }

    #[test]
    fn legacy_record_roundtrips_canonically() {
        // A record persisted before the alias cleanup deserializes and then
        // re-serializes with the canonical spelling.
        let json = r#"{
            "id": "0192c1a0-0000-7000-8000-000000000001",
            "sender_id": "0192c1a0-0000-7000-8000-000000000002",
            "pickup_city": "Izmir",
            "delivery_city": "Bursa",
            "status": "assigned",
            "created_at": "2024-05-01T10:00:00Z",
            "updated_at": "2024-05-02T10:00:00Z"
        }"#;
        let shipment: Shipment = serde_json::from_str(json).unwrap();
        assert_eq!(shipment.status, ShipmentStatus::InProgress);

        let out = serde_json::to_string(&shipment).unwrap();
        assert!(out.contains("IN_PROGRESS"));
        assert!(!out.contains("assigned"));
    }

    #[test]
    fn new_shipment_waits_for_offers() {
        let shipment = Shipment::new(UserId::new(), "Istanbul", "Ankara");
        assert_eq!(shipment.status, ShipmentStatus::WaitingForOffers);
        assert!(shipment.status.accepts_offers());
    }

    #[test]
    fn ownership_check() {
        let owner = UserId::new();
        let shipment = Shipment::dummy(owner);
        assert!(shipment.is_owned_by(owner));
        assert!(!shipment.is_owned_by(UserId::new()));
    }

    #[test]
    fn display_contains_route() {
        let shipment = Shipment::dummy(UserId::new());
        let s = format!("{shipment}");
        assert!(s.contains("Istanbul"));
        assert!(s.contains("Ankara"));
    }
}
