//! Audit event types for the FreightMatch settlement trail.
//!
//! Every settlement decision (committed or denied) produces an
//! [`AuditEvent`] for the append-only audit sink: who acted, what they did,
//! on which shipment/offer, and how it ended.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{OfferId, ShipmentId, UserId};

/// The settlement action an audit event records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditAction {
    /// An offer was accepted (the settlement transaction).
    OfferAccept,
    /// A single offer was rejected by the shipment owner.
    OfferReject,
    /// The shipment was cancelled.
    ShipmentCancel,
    /// The shipment advanced along a post-settlement leg.
    ShipmentAdvance,
}

impl std::fmt::Display for AuditAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::OfferAccept => write!(f, "OFFER_ACCEPT"),
            Self::OfferReject => write!(f, "OFFER_REJECT"),
            Self::ShipmentCancel => write!(f, "SHIPMENT_CANCEL"),
            Self::ShipmentAdvance => write!(f, "SHIPMENT_ADVANCE"),
        }
    }
}

/// How the audited attempt ended.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "result", content = "code")]
pub enum AuditOutcome {
    /// The transaction committed.
    Committed,
    /// The attempt was denied; carries the error code for forensics.
    Denied(String),
}

impl AuditOutcome {
    #[must_use]
    pub fn is_committed(&self) -> bool {
        matches!(self, Self::Committed)
    }
}

/// One entry in the append-only settlement audit trail.
///
/// The `payload_hash` is a SHA-256 digest over the event's identifying
/// fields, so a stored trail can be checked for tampering without re-reading
/// the entities it refers to.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEvent {
    pub acting_user_id: UserId,
    pub action: AuditAction,
    pub shipment_id: ShipmentId,
    /// Absent for shipment-level actions (cancel, advance).
    pub offer_id: Option<OfferId>,
    pub outcome: AuditOutcome,
    /// SHA-256 over the identifying fields, hex-encoded on the wire.
    #[serde(with = "hex_hash")]
    pub payload_hash: [u8; 32],
    pub recorded_at: DateTime<Utc>,
}

impl AuditEvent {
    /// Build an event, stamping `recorded_at` and computing the payload hash.
    #[must_use]
    pub fn now(
        acting_user_id: UserId,
        action: AuditAction,
        shipment_id: ShipmentId,
        offer_id: Option<OfferId>,
        outcome: AuditOutcome,
    ) -> Self {
        let recorded_at = Utc::now();
        let payload_hash =
            Self::compute_hash(acting_user_id, action, shipment_id, offer_id, &outcome);
        Self {
            acting_user_id,
            action,
            shipment_id,
            offer_id,
            outcome,
            payload_hash,
            recorded_at,
        }
    }

    fn compute_hash(
        acting_user_id: UserId,
        action: AuditAction,
        shipment_id: ShipmentId,
        offer_id: Option<OfferId>,
        outcome: &AuditOutcome,
    ) -> [u8; 32] {
        use sha2::{Digest, Sha256};
        let mut hasher = Sha256::new();
        hasher.update(b"freightmatch:audit:v2:");
        hasher.update(acting_user_id.0.as_bytes());
        hasher.update(action.to_string().as_bytes());
        hasher.update(shipment_id.0.as_bytes());
        if let Some(offer_id) = offer_id {
            hasher.update(offer_id.0.as_bytes());
        }
        match outcome {
            AuditOutcome::Committed => hasher.update(b"committed"),
            AuditOutcome::Denied(code) => hasher.update(code.as_bytes()),
        }
        hasher.finalize().into()
    }

    /// Recompute the hash and compare against the stored one.
    #[must_use]
    pub fn verify_hash(&self) -> bool {
        Self::compute_hash(
            self.acting_user_id,
            self.action,
            self.shipment_id,
            self.offer_id,
            &self.outcome,
        ) == self.payload_hash
    }

    /// Short hex prefix of the payload hash, for log lines.
    #[must_use]
    pub fn hash_short(&self) -> String {
        hex::encode(&self.payload_hash[..4])
    }
}

mod hex_hash {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(
        hash: &[u8; 32],
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&hex::encode(hash))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<[u8; 32], D::Error> {
        let raw = String::deserialize(deserializer)?;
        let bytes = hex::decode(&raw).map_err(serde::de::Error::custom)?;
        bytes
            .try_into()
            .map_err(|_| serde::de::Error::custom("payload hash must be 32 bytes"))
    }
}
