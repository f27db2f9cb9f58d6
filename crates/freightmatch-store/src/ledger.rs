//! Per-shipment offer ledger.
//!
//! The ledger owns every offer bid on one shipment and is the only code
//! that flips offer statuses, so the at-most-one-winner invariant is
//! enforced structurally: [`OfferLedger::resolve_winner`] accepts the winner
//! and rejects all pending siblings in the same call, and every other
//! mutator refuses to touch a resolved offer.

use std::collections::BTreeMap;

use chrono::Utc;
use freightmatch_types::{FreightmatchError, Offer, OfferId, OfferStatus, Result};

/// The competing offers on a single shipment.
///
/// Backed by a `BTreeMap` so iteration order is deterministic (offer IDs are
/// UUIDv7, so this is also submission order).
#[derive(Debug, Clone, Default)]
pub struct OfferLedger {
    offers: BTreeMap<OfferId, Offer>,
}

impl OfferLedger {
    #[must_use]
    pub fn new() -> Self {
        Self {
            offers: BTreeMap::new(),
        }
    }

    /// Add a new offer to the ledger.
    ///
    /// # Errors
    /// Returns [`FreightmatchError::DuplicateOffer`] on id collision.
    pub fn insert(&mut self, offer: Offer) -> Result<()> {
        if self.offers.contains_key(&offer.id) {
            return Err(FreightmatchError::DuplicateOffer(offer.id));
        }
        self.offers.insert(offer.id, offer);
        Ok(())
    }

    #[must_use]
    pub fn get(&self, offer_id: &OfferId) -> Option<&Offer> {
        self.offers.get(offer_id)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.offers.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.offers.is_empty()
    }

    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.offers.values().filter(|o| o.is_pending()).count()
    }

    /// The winning offer, if settlement has happened.
    #[must_use]
    pub fn accepted(&self) -> Option<&Offer> {
        self.offers
            .values()
            .find(|o| o.status == OfferStatus::Accepted)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Offer> {
        self.offers.values()
    }

    /// Accept one offer and reject every pending sibling, as one mutation.
    ///
    /// Returns the accepted winner and the siblings that were newly
    /// rejected (for notification fan-out). Siblings already rejected are
    /// not returned again.
    ///
    /// # Errors
    /// - [`FreightmatchError::OfferNotFound`] if `offer_id` is not in the
    ///   ledger.
    /// - [`FreightmatchError::OfferAlreadyResolved`] if the named offer, or
    ///   any sibling, has already been accepted.
    pub fn resolve_winner(&mut self, offer_id: OfferId) -> Result<(Offer, Vec<Offer>)> {
        let winner = self
            .offers
            .get(&offer_id)
            .ok_or(FreightmatchError::OfferNotFound(offer_id))?;
        if winner.is_resolved() {
            return Err(FreightmatchError::OfferAlreadyResolved(offer_id));
        }
        if let Some(existing) = self.accepted() {
            // A pending winner alongside an accepted sibling means a prior
            // settlement was interrupted before sweeping; refuse rather than
            // mint a second winner.
            return Err(FreightmatchError::OfferAlreadyResolved(existing.id));
        }

        let now = Utc::now();
        let mut losers = Vec::new();
        for offer in self.offers.values_mut() {
            if offer.id == offer_id {
                offer.status = OfferStatus::Accepted;
                offer.updated_at = now;
            } else if offer.is_pending() {
                offer.status = OfferStatus::Rejected;
                offer.updated_at = now;
                losers.push(offer.clone());
            }
        }
        let winner = self.offers[&offer_id].clone();
        Ok((winner, losers))
    }

    /// Reject a single offer without touching its siblings.
    ///
    /// Idempotent: rejecting an already-rejected offer is a no-op success
    /// (`Ok(false)`); `Ok(true)` means the offer was pending and is now
    /// rejected.
    ///
    /// # Errors
    /// - [`FreightmatchError::OfferNotFound`] if absent.
    /// - [`FreightmatchError::OfferAlreadyResolved`] if the offer was
    ///   accepted — a winner cannot be unilaterally rejected through this
    ///   path.
    pub fn reject(&mut self, offer_id: OfferId) -> Result<bool> {
        let offer = self
            .offers
            .get_mut(&offer_id)
            .ok_or(FreightmatchError::OfferNotFound(offer_id))?;
        match offer.status {
            OfferStatus::Accepted => Err(FreightmatchError::OfferAlreadyResolved(offer_id)),
            OfferStatus::Rejected => Ok(false),
            OfferStatus::Pending => {
                offer.status = OfferStatus::Rejected;
                offer.updated_at = Utc::now();
                Ok(true)
            }
        }
    }

    /// Reject every pending offer (cancellation sweep). Returns the newly
    /// rejected offers.
    pub fn reject_all_pending(&mut self) -> Vec<Offer> {
        let now = Utc::now();
        let mut swept = Vec::new();
        for offer in self.offers.values_mut() {
            if offer.is_pending() {
                offer.status = OfferStatus::Rejected;
                offer.updated_at = now;
                swept.push(offer.clone());
            }
        }
        swept
    }

    /// The at-most-one-winner invariant, checkable at any time.
    #[must_use]
    pub fn at_most_one_accepted(&self) -> bool {
        self.offers
            .values()
            .filter(|o| o.status == OfferStatus::Accepted)
            .count()
            <= 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use freightmatch_types::ShipmentId;
    use rust_decimal::Decimal;

    fn ledger_with(prices: &[i64]) -> (OfferLedger, Vec<OfferId>) {
        let shipment_id = ShipmentId::new();
        let mut ledger = OfferLedger::new();
        let mut ids = Vec::new();
        for &price in prices {
            let offer = Offer::dummy(shipment_id, Decimal::new(price, 0));
            ids.push(offer.id);
            ledger.insert(offer).unwrap();
        }
        (ledger, ids)
    }

    #[test]
    fn insert_and_lookup() {
        let (ledger, ids) = ledger_with(&[1000, 1200]);
        assert_eq!(ledger.len(), 2);
        assert_eq!(ledger.pending_count(), 2);
        assert!(ledger.get(&ids[0]).is_some());
        assert!(ledger.get(&OfferId::new()).is_none());
    }

    #[test]
    fn duplicate_insert_blocked() {
        let shipment_id = ShipmentId::new();
        let offer = Offer::dummy(shipment_id, Decimal::new(1000, 0));
        let mut ledger = OfferLedger::new();
        ledger.insert(offer.clone()).unwrap();
        let err = ledger.insert(offer).unwrap_err();
        assert!(matches!(err, FreightmatchError::DuplicateOffer(_)));
    }

    #[test]
    fn resolve_winner_rejects_siblings() {
        let (mut ledger, ids) = ledger_with(&[1000, 1200, 900]);
        let (winner, losers) = ledger.resolve_winner(ids[0]).unwrap();

        assert_eq!(winner.id, ids[0]);
        assert_eq!(winner.status, OfferStatus::Accepted);
        assert_eq!(losers.len(), 2);
        assert!(losers.iter().all(|o| o.status == OfferStatus::Rejected));
        assert_eq!(ledger.pending_count(), 0);
        assert!(ledger.at_most_one_accepted());
        assert_eq!(ledger.accepted().unwrap().id, ids[0]);
    }

    #[test]
    fn resolve_winner_twice_blocked() {
        let (mut ledger, ids) = ledger_with(&[1000, 1200]);
        ledger.resolve_winner(ids[0]).unwrap();

        // The winner itself is resolved now.
        let err = ledger.resolve_winner(ids[0]).unwrap_err();
        assert!(matches!(err, FreightmatchError::OfferAlreadyResolved(_)));

        // And so is the loser.
        let err = ledger.resolve_winner(ids[1]).unwrap_err();
        assert!(
            matches!(err, FreightmatchError::OfferAlreadyResolved(id) if id == ids[1]),
            "Got: {err:?}"
        );
    }

    #[test]
    fn resolve_unknown_offer() {
        let (mut ledger, _) = ledger_with(&[1000]);
        let err = ledger.resolve_winner(OfferId::new()).unwrap_err();
        assert!(matches!(err, FreightmatchError::OfferNotFound(_)));
    }

    #[test]
    fn losers_exclude_previously_rejected() {
        let (mut ledger, ids) = ledger_with(&[1000, 1200, 900]);
        ledger.reject(ids[2]).unwrap();

        let (_, losers) = ledger.resolve_winner(ids[0]).unwrap();
        // ids[2] was already rejected before settlement; only ids[1] is a
        // fresh loser to notify.
        assert_eq!(losers.len(), 1);
        assert_eq!(losers[0].id, ids[1]);
    }

    #[test]
    fn reject_is_idempotent() {
        let (mut ledger, ids) = ledger_with(&[1000]);
        assert!(ledger.reject(ids[0]).unwrap());
        assert!(!ledger.reject(ids[0]).unwrap());
        assert_eq!(ledger.get(&ids[0]).unwrap().status, OfferStatus::Rejected);
    }

    #[test]
    fn reject_accepted_offer_blocked() {
        let (mut ledger, ids) = ledger_with(&[1000, 1200]);
        ledger.resolve_winner(ids[0]).unwrap();
        let err = ledger.reject(ids[0]).unwrap_err();
        assert!(matches!(err, FreightmatchError::OfferAlreadyResolved(_)));
    }

    #[test]
    fn cancellation_sweep_rejects_pending() {
        let (mut ledger, ids) = ledger_with(&[1000, 1200, 900]);
        ledger.reject(ids[0]).unwrap();

        let swept = ledger.reject_all_pending();
        assert_eq!(swept.len(), 2);
        assert_eq!(ledger.pending_count(), 0);
        assert!(ledger.accepted().is_none());
    }

    #[test]
    fn deterministic_iteration_order() {
        let (ledger, ids) = ledger_with(&[1000, 1200, 900]);
        let mut sorted = ids.clone();
        sorted.sort();
        let iterated: Vec<OfferId> = ledger.iter().map(|o| o.id).collect();
        assert_eq!(iterated, sorted);
    }
}
