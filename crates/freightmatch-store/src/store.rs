//! Transactional in-memory shipment store.
//!
//! One lock-guarded cell per shipment holds the shipment row, its offer
//! ledger, and its agreement slot. A [`ShipmentStore::transaction`] stages
//! every mutation on a cloned working copy and publishes it in a single
//! assignment under the cell lock, so a failing closure leaves the cell
//! untouched — commit and rollback are all-or-nothing by construction.
//!
//! Concurrency model: transactions on the *same* shipment serialize on the
//! cell's mutex; transactions on *different* shipments share nothing beyond
//! the brief map read-lock and run fully in parallel. Lock acquisition is
//! bounded: a transaction that cannot take the cell within its timeout
//! fails with `ConcurrentModification` instead of deadlocking.

use std::{collections::HashMap, sync::Arc, time::Duration};

use chrono::Utc;
use freightmatch_types::{
    constants, Agreement, AgreementStatus, FreightmatchError, Offer, OfferId, Result, Shipment,
    ShipmentId, ShipmentStatus,
};
use parking_lot::{Mutex, RwLock};

use crate::ledger::OfferLedger;

/// Everything the store knows about one shipment. Cloned wholesale into a
/// transaction's working copy.
#[derive(Debug, Clone)]
struct ShipmentState {
    shipment: Shipment,
    ledger: OfferLedger,
    agreement: Option<Agreement>,
    version: u64,
}

/// A staged view of one shipment inside a transaction.
///
/// All mutators touch the working copy only; nothing is visible to other
/// readers until the transaction closure returns `Ok` and the store
/// publishes the copy.
pub struct ShipmentTxn {
    state: ShipmentState,
}

impl ShipmentTxn {
    #[must_use]
    pub fn shipment(&self) -> &Shipment {
        &self.state.shipment
    }

    #[must_use]
    pub fn ledger(&self) -> &OfferLedger {
        &self.state.ledger
    }

    #[must_use]
    pub fn agreement(&self) -> Option<&Agreement> {
        self.state.agreement.as_ref()
    }

    /// Stage a status change, stamping `updated_at`. Transition legality is
    /// the caller's concern (the rules plane validates before staging).
    pub fn set_status(&mut self, next: ShipmentStatus) {
        self.state.shipment.status = next;
        self.state.shipment.updated_at = Utc::now();
    }

    /// Stage a new offer into the ledger.
    pub fn insert_offer(&mut self, offer: Offer) -> Result<()> {
        self.state.ledger.insert(offer)
    }

    /// Stage the settlement resolution: winner accepted, pending siblings
    /// rejected. See [`OfferLedger::resolve_winner`].
    pub fn resolve_winner(&mut self, offer_id: OfferId) -> Result<(Offer, Vec<Offer>)> {
        self.state.ledger.resolve_winner(offer_id)
    }

    /// Stage a single-offer rejection. See [`OfferLedger::reject`].
    pub fn reject_offer(&mut self, offer_id: OfferId) -> Result<bool> {
        self.state.ledger.reject(offer_id)
    }

    /// Stage rejection of every pending offer (cancellation sweep).
    pub fn reject_all_pending(&mut self) -> Vec<Offer> {
        self.state.ledger.reject_all_pending()
    }

    /// Stage the agreement created by settlement.
    ///
    /// # Errors
    /// Returns [`FreightmatchError::AgreementAlreadyExists`] if the shipment
    /// already has one — agreements are 1:1 with the accepted offer.
    pub fn put_agreement(&mut self, agreement: Agreement) -> Result<()> {
        if let Some(existing) = &self.state.agreement {
            return Err(FreightmatchError::AgreementAlreadyExists(existing.id));
        }
        self.state.agreement = Some(agreement);
        Ok(())
    }

    /// Stage an agreement status change.
    ///
    /// # Errors
    /// Returns [`FreightmatchError::AgreementNotFound`] if no agreement has
    /// been created for this shipment.
    pub fn set_agreement_status(&mut self, status: AgreementStatus) -> Result<()> {
        let shipment_id = self.state.shipment.id;
        let agreement = self
            .state
            .agreement
            .as_mut()
            .ok_or(FreightmatchError::AgreementNotFound(shipment_id))?;
        agreement.status = status;
        Ok(())
    }
}

/// The durable store stand-in: single source of truth for shipments,
/// offers, and agreements.
pub struct ShipmentStore {
    cells: RwLock<HashMap<ShipmentId, Arc<Mutex<ShipmentState>>>>,
    /// Bound on lock waits for the read accessors.
    lock_timeout: Duration,
}

impl ShipmentStore {
    #[must_use]
    pub fn new() -> Self {
        Self {
            cells: RwLock::new(HashMap::new()),
            lock_timeout: Duration::from_millis(constants::DEFAULT_LOCK_TIMEOUT_MS),
        }
    }

    #[must_use]
    pub fn with_lock_timeout(mut self, lock_timeout: Duration) -> Self {
        self.lock_timeout = lock_timeout;
        self
    }

    /// Register a new shipment.
    ///
    /// # Errors
    /// Returns [`FreightmatchError::DuplicateShipment`] on id collision.
    pub fn insert_shipment(&self, shipment: Shipment) -> Result<()> {
        let mut cells = self.cells.write();
        if cells.contains_key(&shipment.id) {
            return Err(FreightmatchError::DuplicateShipment(shipment.id));
        }
        let id = shipment.id;
        cells.insert(
            id,
            Arc::new(Mutex::new(ShipmentState {
                shipment,
                ledger: OfferLedger::new(),
                agreement: None,
                version: 0,
            })),
        );
        tracing::debug!(shipment_id = %id, "shipment registered");
        Ok(())
    }

    /// Run `f` against a staged copy of the shipment's state and publish the
    /// copy if it returns `Ok`. All-or-nothing: an `Err` from `f` discards
    /// every staged mutation.
    ///
    /// Transactions on the same shipment serialize on the cell lock; waiting
    /// is bounded by `timeout`.
    ///
    /// # Errors
    /// - [`FreightmatchError::ShipmentNotFound`] if the shipment is not
    ///   registered.
    /// - [`FreightmatchError::ConcurrentModification`] if the cell lock
    ///   cannot be taken within `timeout`.
    /// - Whatever `f` returns.
    pub fn transaction<T>(
        &self,
        shipment_id: ShipmentId,
        timeout: Duration,
        f: impl FnOnce(&mut ShipmentTxn) -> Result<T>,
    ) -> Result<T> {
        let cell = self.cell(shipment_id)?;
        let mut guard = cell
            .try_lock_for(timeout)
            .ok_or(FreightmatchError::ConcurrentModification(shipment_id))?;

        let mut txn = ShipmentTxn {
            state: guard.clone(),
        };
        let value = f(&mut txn)?;

        let mut committed = txn.state;
        committed.version = guard.version + 1;
        *guard = committed;
        tracing::debug!(shipment_id = %shipment_id, version = guard.version, "transaction committed");
        Ok(value)
    }

    /// Snapshot of the shipment row.
    pub fn get_shipment(&self, shipment_id: ShipmentId) -> Result<Shipment> {
        self.read(shipment_id, |state| state.shipment.clone())
    }

    /// Snapshot of every offer on the shipment, in ledger order.
    pub fn offers(&self, shipment_id: ShipmentId) -> Result<Vec<Offer>> {
        self.read(shipment_id, |state| state.ledger.iter().cloned().collect())
    }

    /// Snapshot of one offer.
    pub fn get_offer(&self, shipment_id: ShipmentId, offer_id: OfferId) -> Result<Offer> {
        self.read(shipment_id, |state| state.ledger.get(&offer_id).cloned())?
            .ok_or(FreightmatchError::OfferNotFound(offer_id))
    }

    /// Snapshot of the shipment's agreement, if settlement has happened.
    pub fn agreement(&self, shipment_id: ShipmentId) -> Result<Option<Agreement>> {
        self.read(shipment_id, |state| state.agreement.clone())
    }

    /// The cell's commit counter; bumps exactly once per committed
    /// transaction.
    pub fn version(&self, shipment_id: ShipmentId) -> Result<u64> {
        self.read(shipment_id, |state| state.version)
    }

    #[must_use]
    pub fn contains(&self, shipment_id: ShipmentId) -> bool {
        self.cells.read().contains_key(&shipment_id)
    }

    #[must_use]
    pub fn shipment_count(&self) -> usize {
        self.cells.read().len()
    }

    fn cell(&self, shipment_id: ShipmentId) -> Result<Arc<Mutex<ShipmentState>>> {
        self.cells
            .read()
            .get(&shipment_id)
            .cloned()
            .ok_or(FreightmatchError::ShipmentNotFound(shipment_id))
    }

    fn read<T>(&self, shipment_id: ShipmentId, f: impl FnOnce(&ShipmentState) -> T) -> Result<T> {
        let cell = self.cell(shipment_id)?;
        let guard = cell
            .try_lock_for(self.lock_timeout)
            .ok_or(FreightmatchError::ConcurrentModification(shipment_id))?;
        Ok(f(&guard))
    }
}

impl Default for ShipmentStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use freightmatch_types::UserId;
    use rust_decimal::Decimal;

    fn store_with_shipment() -> (ShipmentStore, Shipment) {
        let store = ShipmentStore::new();
        let shipment = Shipment::dummy(UserId::new());
        store.insert_shipment(shipment.clone()).unwrap();
        (store, shipment)
    }

    fn txn_timeout() -> Duration {
        Duration::from_millis(500)
    }

    #[test]
    fn insert_and_read_back() {
        let (store, shipment) = store_with_shipment();
        let read = store.get_shipment(shipment.id).unwrap();
        assert_eq!(read.id, shipment.id);
        assert_eq!(read.status, ShipmentStatus::WaitingForOffers);
        assert_eq!(store.version(shipment.id).unwrap(), 0);
    }

    #[test]
    fn duplicate_shipment_blocked() {
        let (store, shipment) = store_with_shipment();
        let err = store.insert_shipment(shipment).unwrap_err();
        assert!(matches!(err, FreightmatchError::DuplicateShipment(_)));
    }

    #[test]
    fn missing_shipment_errors() {
        let store = ShipmentStore::new();
        let err = store.get_shipment(ShipmentId::new()).unwrap_err();
        assert!(matches!(err, FreightmatchError::ShipmentNotFound(_)));
    }

    #[test]
    fn committed_transaction_is_visible() {
        let (store, shipment) = store_with_shipment();
        let offer = Offer::dummy(shipment.id, Decimal::new(1000, 0));
        let offer_id = offer.id;

        store
            .transaction(shipment.id, txn_timeout(), |txn| {
                txn.insert_offer(offer.clone())?;
                Ok(())
            })
            .unwrap();

        assert_eq!(store.offers(shipment.id).unwrap().len(), 1);
        assert_eq!(store.get_offer(shipment.id, offer_id).unwrap().id, offer_id);
        assert_eq!(store.version(shipment.id).unwrap(), 1);
    }

    #[test]
    fn failed_transaction_rolls_back_everything() {
        let (store, shipment) = store_with_shipment();
        let offer = Offer::dummy(shipment.id, Decimal::new(1000, 0));

        let err = store
            .transaction(shipment.id, txn_timeout(), |txn| -> Result<()> {
                txn.insert_offer(offer.clone())?;
                txn.set_status(ShipmentStatus::OfferAccepted);
                Err(FreightmatchError::Internal("forced failure".into()))
            })
            .unwrap_err();
        assert!(matches!(err, FreightmatchError::Internal(_)));

        // Nothing the closure staged is observable.
        assert!(store.offers(shipment.id).unwrap().is_empty());
        assert_eq!(
            store.get_shipment(shipment.id).unwrap().status,
            ShipmentStatus::WaitingForOffers
        );
        assert_eq!(store.version(shipment.id).unwrap(), 0);
    }

    #[test]
    fn agreement_slot_is_write_once() {
        let (store, shipment) = store_with_shipment();
        let offer = Offer::dummy(shipment.id, Decimal::new(1000, 0));
        let agreement = Agreement {
            id: freightmatch_types::AgreementId::deterministic(shipment.id, offer.id),
            offer_id: offer.id,
            shipment_id: shipment.id,
            sender_id: shipment.sender_id,
            carrier_id: offer.carrier_id,
            agreed_price: offer.price,
            commission_amount: Decimal::new(1000, 2),
            carrier_receives: Decimal::new(99_000, 2),
            status: AgreementStatus::Pending,
            created_at: Utc::now(),
        };

        store
            .transaction(shipment.id, txn_timeout(), |txn| {
                txn.put_agreement(agreement.clone())
            })
            .unwrap();

        let err = store
            .transaction(shipment.id, txn_timeout(), |txn| {
                txn.put_agreement(agreement.clone())
            })
            .unwrap_err();
        assert!(matches!(err, FreightmatchError::AgreementAlreadyExists(_)));
        assert!(store.agreement(shipment.id).unwrap().is_some());
    }

    #[test]
    fn lock_contention_times_out_with_concurrent_modification() {
        let (store, shipment) = store_with_shipment();
        let store = std::sync::Arc::new(store);

        let holder = std::sync::Arc::clone(&store);
        let shipment_id = shipment.id;
        let (started_tx, started_rx) = std::sync::mpsc::channel();
        let handle = std::thread::spawn(move || {
            holder
                .transaction(shipment_id, Duration::from_secs(5), |_txn| {
                    started_tx.send(()).unwrap();
                    std::thread::sleep(Duration::from_millis(300));
                    Ok(())
                })
                .unwrap();
        });

        // Wait until the holder is inside the transaction, then contend with
        // a timeout far shorter than the holder's sleep.
        started_rx.recv().unwrap();
        let err = store
            .transaction(shipment_id, Duration::from_millis(20), |_txn| Ok(()))
            .unwrap_err();
        assert!(matches!(err, FreightmatchError::ConcurrentModification(_)));

        handle.join().unwrap();
    }

    #[test]
    fn transactions_on_same_shipment_serialize() {
        let (store, shipment) = store_with_shipment();
        let store = std::sync::Arc::new(store);
        let shipment_id = shipment.id;

        let mut handles = Vec::new();
        for _ in 0..8 {
            let store = std::sync::Arc::clone(&store);
            handles.push(std::thread::spawn(move || {
                store
                    .transaction(shipment_id, Duration::from_secs(5), |txn| {
                        let offer =
                            Offer::dummy(shipment_id, Decimal::new(1000, 0));
                        txn.insert_offer(offer)?;
                        Ok(())
                    })
                    .unwrap();
            }));
        }
        for handle in handles {
            handle.join().unwrap();
        }

        // Every transaction committed exactly once: 8 offers, version 8.
        assert_eq!(store.offers(shipment_id).unwrap().len(), 8);
        assert_eq!(store.version(shipment_id).unwrap(), 8);
    }

    #[test]
    fn different_shipments_do_not_contend() {
        let store = std::sync::Arc::new(ShipmentStore::new());
        let a = Shipment::dummy(UserId::new());
        let b = Shipment::dummy(UserId::new());
        store.insert_shipment(a.clone()).unwrap();
        store.insert_shipment(b.clone()).unwrap();

        // Hold shipment A's lock; a transaction on B must not be affected
        // even with a tiny timeout.
        let holder = std::sync::Arc::clone(&store);
        let a_id = a.id;
        let (started_tx, started_rx) = std::sync::mpsc::channel();
        let handle = std::thread::spawn(move || {
            holder
                .transaction(a_id, Duration::from_secs(5), |_txn| {
                    started_tx.send(()).unwrap();
                    std::thread::sleep(Duration::from_millis(200));
                    Ok(())
                })
                .unwrap();
        });

        started_rx.recv().unwrap();
        store
            .transaction(b.id, Duration::from_millis(20), |txn| {
                txn.set_status(ShipmentStatus::Cancelled);
                Ok(())
            })
            .unwrap();
        assert_eq!(
            store.get_shipment(b.id).unwrap().status,
            ShipmentStatus::Cancelled
        );

        handle.join().unwrap();
    }
}
