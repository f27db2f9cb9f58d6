//! # freightmatch-rules
//!
//! **Rules Plane**: the shipment status registry and the commission
//! calculator. Everything in this crate is a pure function — no side
//! effects, no I/O, no store access — so both can be called outside any
//! transaction for pre-validation and re-checked inside one for the
//! authoritative decision.
//!
//! - [`transitions`]: the canonical status set and the legal transition
//!   graph between statuses, including idempotent same-status re-application
//!   and legacy-alias-tolerant raw-string entry points.
//! - [`commission`]: the platform fee split, exact to the cent.

pub mod commission;
pub mod transitions;

pub use commission::{split, CommissionSplit};
pub use transitions::{next_valid_statuses, validate_raw_transition, validate_transition};
