//! # freightmatch-types
//!
//! Shared types, errors, and configuration for the **FreightMatch**
//! shipment settlement core.
//!
//! This crate is the leaf dependency of the workspace — every other crate
//! depends on it. It defines:
//!
//! - **Identifiers**: [`ShipmentId`], [`OfferId`], [`UserId`], [`AgreementId`]
//! - **Shipment model**: [`Shipment`], [`ShipmentStatus`] (with legacy alias parsing)
//! - **Offer model**: [`Offer`], [`OfferStatus`]
//! - **Agreement model**: [`Agreement`], [`AgreementStatus`]
//! - **Audit model**: [`AuditEvent`], [`AuditAction`], [`AuditOutcome`]
//! - **Notification model**: [`Notification`], [`NotificationKind`]
//! - **Configuration**: [`SettlementConfig`]
//! - **Errors**: [`FreightmatchError`] with `FM_ERR_` prefix codes
//! - **Constants**: system-wide limits and defaults

pub mod agreement;
pub mod audit;
pub mod config;
pub mod constants;
pub mod error;
pub mod ids;
pub mod notification;
pub mod offer;
pub mod shipment;

// Re-export all primary types at crate root for ergonomic imports:
//   use freightmatch_types::{Shipment, ShipmentStatus, Offer, Agreement, ...};

pub use agreement::*;
pub use audit::*;
pub use config::*;
pub use error::*;
pub use ids::*;
pub use notification::*;
pub use offer::*;
pub use shipment::*;

// Constants are accessed via `freightmatch_types::constants::FOO`
// (not re-exported to avoid name collisions).
