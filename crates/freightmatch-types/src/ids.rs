//! Globally unique identifiers used throughout FreightMatch.
//!
//! All entity IDs use UUIDv7 for time-ordered lexicographic sorting.
//! `AgreementId` additionally has a deterministic derivation from the
//! (shipment, offer) pair it settles.

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ---------------------------------------------------------------------------
// ShipmentId
// ---------------------------------------------------------------------------

/// Globally unique shipment identifier. Uses UUIDv7 for time-ordered sorting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
pub struct ShipmentId(pub Uuid);

impl ShipmentId {
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    #[must_use]
    pub fn from_bytes(bytes: [u8; 16]) -> Self {
        Self(Uuid::from_bytes(bytes))
    }

    /// Extract the embedded timestamp (milliseconds since UNIX epoch) from UUIDv7.
    #[must_use]
    pub fn timestamp_ms(&self) -> u64 {
        let bytes = self.0.as_bytes();
        u64::from_be_bytes([
            0, 0, bytes[0], bytes[1], bytes[2], bytes[3], bytes[4], bytes[5],
        ])
    }
}

impl Default for ShipmentId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ShipmentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// OfferId
// ---------------------------------------------------------------------------

/// Globally unique identifier for a carrier's offer on a shipment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
pub struct OfferId(pub Uuid);

impl OfferId {
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    #[must_use]
    pub fn from_bytes(bytes: [u8; 16]) -> Self {
        Self(Uuid::from_bytes(bytes))
    }
}

impl Default for OfferId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for OfferId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// UserId
// ---------------------------------------------------------------------------

/// Unique identifier for a marketplace participant (shipper or carrier).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
pub struct UserId(pub Uuid);

impl UserId {
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    #[must_use]
    pub fn from_bytes(bytes: [u8; 16]) -> Self {
        Self(Uuid::from_bytes(bytes))
    }
}

impl Default for UserId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// AgreementId
// ---------------------------------------------------------------------------

/// Globally unique agreement identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
pub struct AgreementId(pub Uuid);

impl AgreementId {
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    /// Deterministic `AgreementId` from the shipment and winning offer.
    ///
    /// An agreement is 1:1 with its accepted offer, so settling the same
    /// (shipment, offer) pair twice yields the **exact same** id — a replayed
    /// settlement collides instead of silently minting a second agreement.
    #[must_use]
    pub fn deterministic(shipment_id: ShipmentId, offer_id: OfferId) -> Self {
        use sha2::{Digest, Sha256};
        let mut hasher = Sha256::new();
        hasher.update(b"freightmatch:agreement_id:v2:");
        hasher.update(shipment_id.0.as_bytes());
        hasher.update(offer_id.0.as_bytes());
        let hash = hasher.finalize();
        let bytes: [u8; 16] = hash[..16].try_into().expect("SHA-256 produces 32 bytes");
        Self(Uuid::from_bytes(bytes))
    }
}

impl Default for AgreementId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for AgreementId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "agr:{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shipment_id_uniqueness() {
        let a = ShipmentId::new();
        let b = ShipmentId::new();
        assert_ne!(a, b);
    }

    #[test]
    fn shipment_id_ordering() {
        let a = ShipmentId::new();
        let b = ShipmentId::new();
        assert!(a < b);
    }

    #[test]
    #[allow(clippy::cast_possible_truncation)]
    fn shipment_id_timestamp_extraction() {
        let before = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap()
            .as_millis() as u64;
        let id = ShipmentId::new();
        let after = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap()
            .as_millis() as u64;
        let ts = id.timestamp_ms();
        assert!(
            ts >= before && ts <= after,
            "ts={ts}, before={before}, after={after}"
        );
    }

    #[test]
    fn offer_id_uniqueness() {
        let a = OfferId::new();
        let b = OfferId::new();
        assert_ne!(a, b);
    }

    #[test]
    fn agreement_id_deterministic() {
        let shipment = ShipmentId::new();
        let offer = OfferId::new();
        let a = AgreementId::deterministic(shipment, offer);
        let b = AgreementId::deterministic(shipment, offer);
        assert_eq!(a, b);

        let c = AgreementId::deterministic(shipment, OfferId::new());
        assert_ne!(a, c);
    }

    #[test]
    fn agreement_id_display_prefix() {
        let id = AgreementId::new();
        assert!(format!("{id}").starts_with("agr:"));
    }

    #[test]
    fn serde_roundtrips() {
        let sid = ShipmentId::new();
        let json = serde_json::to_string(&sid).unwrap();
        let back: ShipmentId = serde_json::from_str(&json).unwrap();
        assert_eq!(sid, back);

        let oid = OfferId::new();
        let json = serde_json::to_string(&oid).unwrap();
        let back: OfferId = serde_json::from_str(&json).unwrap();
        assert_eq!(oid, back);
    }
}
