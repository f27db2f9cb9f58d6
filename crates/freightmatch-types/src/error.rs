//! Error types for the FreightMatch settlement core.
//!
//! All errors use the `FM_ERR_` prefix convention for easy grepping in logs.
//! Error codes are grouped by subsystem:
//! - 1xx: Shipment / status errors
//! - 2xx: Offer errors
//! - 3xx: Money / commission errors
//! - 4xx: Authorization errors
//! - 5xx: Transaction / concurrency errors
//! - 6xx: Agreement errors
//! - 9xx: General / internal errors

use thiserror::Error;

use crate::{AgreementId, OfferId, ShipmentId, ShipmentStatus, UserId};

fn fmt_statuses(statuses: &[ShipmentStatus]) -> String {
    statuses
        .iter()
        .map(ShipmentStatus::as_str)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Central error enum for all FreightMatch operations.
#[derive(Debug, Clone, Error)]
pub enum FreightmatchError {
    // =================================================================
    // Shipment / Status Errors (1xx)
    // =================================================================
    /// The requested shipment does not exist.
    #[error("FM_ERR_100: Shipment not found: {0}")]
    ShipmentNotFound(ShipmentId),

    /// A raw status string is outside the canonical set and known aliases.
    #[error("FM_ERR_101: Invalid shipment status: {raw:?}")]
    InvalidStatus { raw: String },

    /// The requested status change has no edge in the transition graph.
    /// Carries the legal next-states for client guidance.
    #[error(
        "FM_ERR_102: Illegal transition {from} -> {to}; allowed next: [{}]",
        fmt_statuses(.allowed)
    )]
    IllegalTransition {
        from: ShipmentStatus,
        to: ShipmentStatus,
        allowed: Vec<ShipmentStatus>,
    },

    /// The shipment is past its bidding window; no new offers.
    #[error("FM_ERR_103: Shipment {shipment_id} no longer accepts offers (status {status})")]
    ShipmentClosedForOffers {
        shipment_id: ShipmentId,
        status: ShipmentStatus,
    },

    /// A shipment with this ID already exists.
    #[error("FM_ERR_104: Shipment already exists: {0}")]
    DuplicateShipment(ShipmentId),

    // =================================================================
    // Offer Errors (2xx)
    // =================================================================
    /// The offer does not exist, or does not belong to the named shipment.
    #[error("FM_ERR_200: Offer not found: {0}")]
    OfferNotFound(OfferId),

    /// The offer was already accepted or rejected; resolution happens once.
    #[error("FM_ERR_201: Offer already resolved: {0}")]
    OfferAlreadyResolved(OfferId),

    /// An offer with this ID already exists on the shipment.
    #[error("FM_ERR_202: Offer already exists: {0}")]
    DuplicateOffer(OfferId),

    // =================================================================
    // Money / Commission Errors (3xx)
    // =================================================================
    /// A monetary amount failed validation (zero, negative, bad scale).
    #[error("FM_ERR_300: Invalid amount: {reason}")]
    InvalidAmount { reason: String },

    /// The commission rate is outside [0, 1).
    #[error("FM_ERR_301: Invalid commission rate: {rate}")]
    InvalidCommissionRate { rate: rust_decimal::Decimal },

    // =================================================================
    // Authorization Errors (4xx)
    // =================================================================
    /// The acting user is not allowed to perform this operation.
    #[error("FM_ERR_400: User {user_id} is not authorized on shipment {shipment_id}")]
    Unauthorized {
        user_id: UserId,
        shipment_id: ShipmentId,
    },

    // =================================================================
    // Transaction / Concurrency Errors (5xx)
    // =================================================================
    /// The shipment's write lock could not be acquired in time; the caller
    /// may retry.
    #[error("FM_ERR_500: Concurrent modification on shipment {0}, try again")]
    ConcurrentModification(ShipmentId),

    /// The durable store failed mid-transaction; distinct from business-rule
    /// errors so callers can tell "request invalid" from "try again later".
    #[error("FM_ERR_501: Store unavailable: {reason}")]
    StoreUnavailable { reason: String },

    // =================================================================
    // Agreement Errors (6xx)
    // =================================================================
    /// No agreement exists for this shipment.
    #[error("FM_ERR_600: No agreement for shipment {0}")]
    AgreementNotFound(ShipmentId),

    /// An agreement was already created for this shipment (1:1 with the
    /// accepted offer).
    #[error("FM_ERR_601: Agreement already exists: {0}")]
    AgreementAlreadyExists(AgreementId),

    // =================================================================
    // General / Internal (9xx)
    // =================================================================
    /// Unrecoverable internal error.
    #[error("FM_ERR_900: Internal error: {0}")]
    Internal(String),

    /// Serialization / deserialization error.
    #[error("FM_ERR_901: Serialization error: {0}")]
    Serialization(String),
}

impl FreightmatchError {
    /// Whether the caller should retry the same request.
    ///
    /// Only lock contention qualifies; everything else is either a terminal
    /// business-rule failure or an infrastructure fault the caller cannot
    /// fix by retrying immediately.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::ConcurrentModification(_))
    }

    /// Whether this is a business-rule rejection (the request itself was
    /// invalid) as opposed to an infrastructure or concurrency failure.
    #[must_use]
    pub fn is_business_rule(&self) -> bool {
        !matches!(
            self,
            Self::ConcurrentModification(_)
                | Self::StoreUnavailable { .. }
                | Self::Internal(_)
                | Self::Serialization(_)
        )
    }

    /// The stable `FM_ERR_` code, for audit records and client mapping.
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::ShipmentNotFound(_) => "FM_ERR_100",
            Self::InvalidStatus { .. } => "FM_ERR_101",
            Self::IllegalTransition { .. } => "FM_ERR_102",
            Self::ShipmentClosedForOffers { .. } => "FM_ERR_103",
            Self::DuplicateShipment(_) => "FM_ERR_104",
            Self::OfferNotFound(_) => "FM_ERR_200",
            Self::OfferAlreadyResolved(_) => "FM_ERR_201",
            Self::DuplicateOffer(_) => "FM_ERR_202",
            Self::InvalidAmount { .. } => "FM_ERR_300",
            Self::InvalidCommissionRate { .. } => "FM_ERR_301",
            Self::Unauthorized { .. } => "FM_ERR_400",
            Self::ConcurrentModification(_) => "FM_ERR_500",
            Self::StoreUnavailable { .. } => "FM_ERR_501",
            Self::AgreementNotFound(_) => "FM_ERR_600",
            Self::AgreementAlreadyExists(_) => "FM_ERR_601",
            Self::Internal(_) => "FM_ERR_900",
            Self::Serialization(_) => "FM_ERR_901",
        }
    }
}

/// Crate-wide `Result` alias.
pub type Result<T> = std::result::Result<T, FreightmatchError>;

impl From<serde_json::Error> for FreightmatchError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_contains_prefix() {
        let err = FreightmatchError::ShipmentNotFound(ShipmentId::new());
        let msg = format!("{err}");
        assert!(msg.starts_with("FM_ERR_100"), "Got: {msg}");
    }

    #[test]
    fn illegal_transition_lists_allowed_next() {
        let err = FreightmatchError::IllegalTransition {
            from: ShipmentStatus::WaitingForOffers,
            to: ShipmentStatus::Delivered,
            allowed: vec![ShipmentStatus::OfferAccepted, ShipmentStatus::Cancelled],
        };
        let msg = format!("{err}");
        assert!(msg.contains("FM_ERR_102"));
        assert!(msg.contains("OFFER_ACCEPTED, CANCELLED"), "Got: {msg}");
    }

    #[test]
    fn retryable_classification() {
        assert!(FreightmatchError::ConcurrentModification(ShipmentId::new()).is_retryable());
        assert!(!FreightmatchError::OfferNotFound(OfferId::new()).is_retryable());
        assert!(
            !FreightmatchError::StoreUnavailable {
                reason: "disk".into()
            }
            .is_retryable()
        );
    }

    #[test]
    fn business_rule_classification() {
        assert!(FreightmatchError::OfferAlreadyResolved(OfferId::new()).is_business_rule());
        assert!(
            FreightmatchError::Unauthorized {
                user_id: UserId::new(),
                shipment_id: ShipmentId::new(),
            }
            .is_business_rule()
        );
        assert!(!FreightmatchError::ConcurrentModification(ShipmentId::new()).is_business_rule());
        assert!(
            !FreightmatchError::StoreUnavailable {
                reason: "down".into()
            }
            .is_business_rule()
        );
        assert!(!FreightmatchError::Internal("boom".into()).is_business_rule());
    }

    #[test]
    fn code_matches_display_prefix() {
        let errors = [
            FreightmatchError::ShipmentNotFound(ShipmentId::new()),
            FreightmatchError::OfferAlreadyResolved(OfferId::new()),
            FreightmatchError::InvalidAmount {
                reason: "zero".into(),
            },
            FreightmatchError::ConcurrentModification(ShipmentId::new()),
            FreightmatchError::Internal("test".into()),
        ];
        for err in errors {
            let msg = format!("{err}");
            assert!(
                msg.starts_with(err.code()),
                "Display {msg:?} does not start with code {}",
                err.code()
            );
        }
    }

    #[test]
    fn all_errors_have_fm_err_prefix() {
        let errors: Vec<Box<dyn std::error::Error>> = vec![
            Box::new(FreightmatchError::DuplicateOffer(OfferId::new())),
            Box::new(FreightmatchError::InvalidStatus { raw: "x".into() }),
            Box::new(FreightmatchError::AgreementNotFound(ShipmentId::new())),
            Box::new(FreightmatchError::Serialization("bad json".into())),
            Box::new(FreightmatchError::InvalidCommissionRate {
                rate: rust_decimal::Decimal::new(15, 1),
            }),
        ];
        for err in errors {
            let msg = format!("{err}");
            assert!(
                msg.starts_with("FM_ERR_"),
                "Error missing FM_ERR_ prefix: {msg}"
            );
        }
    }
}
