//! # freightmatch-settlement
//!
//! **Finality Plane**: the atomic offer-acceptance transaction and the
//! lifecycle operations around it.
//!
//! ## Architecture
//!
//! The [`SettlementEngine`] receives an accept/reject/cancel/advance request
//! and:
//! 1. Validates preconditions through the rules plane (`freightmatch-rules`)
//! 2. Stages every mutation inside one store transaction
//!    (`freightmatch-store`) — winner accepted, siblings rejected, shipment
//!    transitioned, agreement created with the commission split
//! 3. Commits all-or-nothing; lock contention is retried transparently once
//! 4. Post-commit, emits an audit event and fans out notifications — both
//!    are external collaborators whose failures are logged, never allowed to
//!    undo the committed settlement
//!
//! ## Guarantees
//!
//! - At most one accepted offer per shipment, ever
//! - `commission_amount + carrier_receives == agreed_price`, to the cent
//! - Shipment status only ever moves along the transition graph
//! - Two racing accepts on one shipment: exactly one wins

pub mod audit;
pub mod engine;
pub mod notify;

pub use audit::{AuditSink, MemoryAuditSink, TracingAuditSink};
pub use engine::SettlementEngine;
pub use notify::{MemoryEmitter, NotificationEmitter, TracingEmitter};
