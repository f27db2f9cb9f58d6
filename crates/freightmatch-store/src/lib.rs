//! # freightmatch-store
//!
//! **Persistence Plane**: the transactional store backing the settlement
//! core. One lock-guarded cell per shipment (shipment row + offer ledger +
//! agreement slot), staged-copy transactions with all-or-nothing commit,
//! bounded lock waits, and no cross-shipment contention.
//!
//! The store is deliberately dumb about business rules: it enforces only
//! structural invariants (duplicate ids, one agreement per shipment, offer
//! resolution happening once). Transition legality, authorization, and
//! commission arithmetic live in `freightmatch-rules` and are orchestrated
//! by `freightmatch-settlement`.

pub mod ledger;
pub mod store;

pub use ledger::OfferLedger;
pub use store::{ShipmentStore, ShipmentTxn};
