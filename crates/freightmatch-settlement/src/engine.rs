//! The settlement engine — atomic offer acceptance and the surrounding
//! lifecycle operations.
//!
//! `accept_offer` is the core transaction:
//! 1. Re-read shipment + full offer set under the shipment's write lock
//! 2. Re-validate every precondition against the fresh state
//! 3. Winning offer → ACCEPTED
//! 4. Every pending sibling → REJECTED
//! 5. Shipment → OFFER_ACCEPTED
//! 6. Commission split computed on the winning price
//! 7. Agreement created (status PENDING)
//! 8. Commit as one unit; any failure discards all staged state
//! 9. Post-commit: audit event + notifications (never roll back the commit)
//!
//! Lock contention (`ConcurrentModification`) is retried transparently once
//! before surfacing; every other precondition failure is terminal.

use std::sync::Arc;

use chrono::Utc;
use rust_decimal::Decimal;

use freightmatch_rules::{commission, transitions::validate_transition};
use freightmatch_store::ShipmentStore;
use freightmatch_types::{
    constants, Agreement, AgreementId, AgreementStatus, AuditAction, AuditEvent, AuditOutcome,
    FreightmatchError, Notification, NotificationKind, Offer, OfferId, Result, SettlementConfig,
    Shipment, ShipmentId, ShipmentStatus, UserId,
};

use crate::audit::AuditSink;
use crate::notify::NotificationEmitter;

/// Everything a committed acceptance produced, carried out of the
/// transaction for post-commit fan-out.
struct SettledAccept {
    agreement: Agreement,
    winner: Offer,
    losers: Vec<Offer>,
}

/// Orchestrates the shipment/offer/agreement lifecycle against the
/// transactional store, with the rules plane deciding legality and the
/// audit/notification collaborators informed after commit.
pub struct SettlementEngine {
    store: Arc<ShipmentStore>,
    config: SettlementConfig,
    audit: Arc<dyn AuditSink>,
    notifier: Arc<dyn NotificationEmitter>,
}

impl SettlementEngine {
    #[must_use]
    pub fn new(
        store: Arc<ShipmentStore>,
        config: SettlementConfig,
        audit: Arc<dyn AuditSink>,
        notifier: Arc<dyn NotificationEmitter>,
    ) -> Self {
        Self {
            store,
            config,
            audit,
            notifier,
        }
    }

    #[must_use]
    pub fn store(&self) -> &ShipmentStore {
        &self.store
    }

    #[must_use]
    pub fn config(&self) -> &SettlementConfig {
        &self.config
    }

    /// Post a new shipment, open for carrier offers.
    ///
    /// # Errors
    /// Returns [`FreightmatchError::DuplicateShipment`] on id collision.
    pub fn post_shipment(
        &self,
        sender_id: UserId,
        pickup_city: impl Into<String>,
        delivery_city: impl Into<String>,
    ) -> Result<Shipment> {
        let shipment = Shipment::new(sender_id, pickup_city, delivery_city);
        self.store.insert_shipment(shipment.clone())?;
        tracing::info!(
            shipment_id = %shipment.id,
            sender_id = %sender_id,
            route = %format!("{} -> {}", shipment.pickup_city, shipment.delivery_city),
            "shipment posted"
        );
        Ok(shipment)
    }

    /// Submit a carrier's offer on a shipment that still accepts bids.
    ///
    /// # Errors
    /// - [`FreightmatchError::InvalidAmount`] for a non-positive or
    ///   sub-cent price.
    /// - [`FreightmatchError::ShipmentNotFound`] /
    ///   [`FreightmatchError::ShipmentClosedForOffers`] for a missing or
    ///   already-settled shipment.
    pub fn submit_offer(
        &self,
        shipment_id: ShipmentId,
        carrier_id: UserId,
        price: Decimal,
        message: Option<String>,
    ) -> Result<Offer> {
        if price <= Decimal::ZERO {
            return Err(FreightmatchError::InvalidAmount {
                reason: format!("offer price must be positive, got {price}"),
            });
        }
        if price.normalize().scale() > constants::MONEY_SCALE {
            return Err(FreightmatchError::InvalidAmount {
                reason: format!(
                    "offer price {price} has more than {} decimal places",
                    constants::MONEY_SCALE
                ),
            });
        }

        let offer = self.run_with_retry(shipment_id, || {
            self.store
                .transaction(shipment_id, self.config.lock_timeout(), |txn| {
                    let status = txn.shipment().status;
                    if !status.accepts_offers()
                        || txn.ledger().len() >= constants::MAX_OFFERS_PER_SHIPMENT
                    {
                        return Err(FreightmatchError::ShipmentClosedForOffers {
                            shipment_id,
                            status,
                        });
                    }
                    let offer = Offer::new(shipment_id, carrier_id, price, message.clone());
                    txn.insert_offer(offer.clone())?;
                    Ok(offer)
                })
        })?;

        tracing::info!(
            shipment_id = %shipment_id,
            offer_id = %offer.id,
            carrier_id = %carrier_id,
            price = %price,
            "offer submitted"
        );
        Ok(offer)
    }

    /// Accept one offer: the settlement transaction.
    ///
    /// Preconditions, checked in order, each with its own error kind:
    /// 1. shipment exists — [`FreightmatchError::ShipmentNotFound`]
    /// 2. caller owns it — [`FreightmatchError::Unauthorized`]
    /// 3. offer exists under it and is pending —
    ///    [`FreightmatchError::OfferNotFound`] /
    ///    [`FreightmatchError::OfferAlreadyResolved`]
    /// 4. the transition to OFFER_ACCEPTED is legal —
    ///    [`FreightmatchError::IllegalTransition`]
    ///
    /// All preconditions are validated *inside* the shipment's write lock,
    /// so a racing acceptance on a sibling offer is seen before any state
    /// is touched. Exactly one of two racing calls can win; the other fails
    /// with `OfferAlreadyResolved` (or `ConcurrentModification` on lock
    /// timeout, which is retried transparently once).
    pub fn accept_offer(
        &self,
        shipment_id: ShipmentId,
        offer_id: OfferId,
        acting_user_id: UserId,
    ) -> Result<Agreement> {
        // The commission rate is read once per call, never mid-transaction.
        let commission_rate = self.config.commission_rate;

        let outcome = self.run_with_retry(shipment_id, || {
            self.store
                .transaction(shipment_id, self.config.lock_timeout(), |txn| {
                    let shipment = txn.shipment();

                    if !shipment.is_owned_by(acting_user_id) {
                        return Err(FreightmatchError::Unauthorized {
                            user_id: acting_user_id,
                            shipment_id,
                        });
                    }

                    let offer = txn
                        .ledger()
                        .get(&offer_id)
                        .ok_or(FreightmatchError::OfferNotFound(offer_id))?;
                    if offer.is_resolved() {
                        return Err(FreightmatchError::OfferAlreadyResolved(offer_id));
                    }

                    validate_transition(shipment.status, ShipmentStatus::OfferAccepted)?;

                    let (winner, losers) = txn.resolve_winner(offer_id)?;
                    txn.set_status(ShipmentStatus::OfferAccepted);

                    let split = commission::split(winner.price, commission_rate)?;
                    let agreement = Agreement {
                        id: AgreementId::deterministic(shipment_id, offer_id),
                        offer_id,
                        shipment_id,
                        sender_id: txn.shipment().sender_id,
                        carrier_id: winner.carrier_id,
                        agreed_price: winner.price,
                        commission_amount: split.commission_amount,
                        carrier_receives: split.carrier_receives,
                        status: AgreementStatus::Pending,
                        created_at: Utc::now(),
                    };
                    txn.put_agreement(agreement.clone())?;

                    Ok(SettledAccept {
                        agreement,
                        winner,
                        losers,
                    })
                })
        });

        match outcome {
            Ok(settled) => {
                tracing::info!(
                    shipment_id = %shipment_id,
                    offer_id = %offer_id,
                    agreement_id = %settled.agreement.id,
                    agreed_price = %settled.agreement.agreed_price,
                    commission = %settled.agreement.commission_amount,
                    losers = settled.losers.len(),
                    "offer accepted"
                );
                self.after_accept(acting_user_id, &settled);
                Ok(settled.agreement)
            }
            Err(err) => {
                self.audit_denied(
                    acting_user_id,
                    AuditAction::OfferAccept,
                    shipment_id,
                    Some(offer_id),
                    &err,
                );
                Err(err)
            }
        }
    }

    /// Reject a single pending offer, leaving siblings and the shipment
    /// status untouched.
    ///
    /// Owner-only. Idempotent: rejecting an already-rejected offer succeeds
    /// as a no-op. An accepted offer cannot be unilaterally rejected through
    /// this path ([`FreightmatchError::OfferAlreadyResolved`]).
    pub fn reject_offer(
        &self,
        shipment_id: ShipmentId,
        offer_id: OfferId,
        acting_user_id: UserId,
    ) -> Result<()> {
        let outcome = self.run_with_retry(shipment_id, || {
            self.store
                .transaction(shipment_id, self.config.lock_timeout(), |txn| {
                    if !txn.shipment().is_owned_by(acting_user_id) {
                        return Err(FreightmatchError::Unauthorized {
                            user_id: acting_user_id,
                            shipment_id,
                        });
                    }
                    let changed = txn.reject_offer(offer_id)?;
                    let offer = txn
                        .ledger()
                        .get(&offer_id)
                        .cloned()
                        .ok_or(FreightmatchError::OfferNotFound(offer_id))?;
                    Ok((changed, offer))
                })
        });

        match outcome {
            Ok((changed, offer)) => {
                tracing::info!(
                    shipment_id = %shipment_id,
                    offer_id = %offer_id,
                    changed,
                    "offer rejected"
                );
                self.record_audit(AuditEvent::now(
                    acting_user_id,
                    AuditAction::OfferReject,
                    shipment_id,
                    Some(offer_id),
                    AuditOutcome::Committed,
                ));
                if changed {
                    self.send_notification(Notification::new(
                        offer.carrier_id,
                        NotificationKind::OfferLost,
                        shipment_id,
                        serde_json::json!({ "offer_id": offer.id, "price": offer.price }),
                    ));
                }
                Ok(())
            }
            Err(err) => {
                self.audit_denied(
                    acting_user_id,
                    AuditAction::OfferReject,
                    shipment_id,
                    Some(offer_id),
                    &err,
                );
                Err(err)
            }
        }
    }

    /// Cancel a shipment: transition to CANCELLED, reject every pending
    /// offer, and reject a still-open agreement, all in one commit.
    ///
    /// Owner-only. Idempotent on an already-cancelled shipment; illegal on a
    /// completed one.
    pub fn cancel_shipment(
        &self,
        shipment_id: ShipmentId,
        acting_user_id: UserId,
    ) -> Result<Shipment> {
        let outcome = self.run_with_retry(shipment_id, || {
            self.store
                .transaction(shipment_id, self.config.lock_timeout(), |txn| {
                    if !txn.shipment().is_owned_by(acting_user_id) {
                        return Err(FreightmatchError::Unauthorized {
                            user_id: acting_user_id,
                            shipment_id,
                        });
                    }
                    validate_transition(txn.shipment().status, ShipmentStatus::Cancelled)?;

                    let swept = txn.reject_all_pending();
                    let open_carrier = txn
                        .agreement()
                        .filter(|agreement| agreement.is_open())
                        .map(|agreement| agreement.carrier_id);
                    if open_carrier.is_some() {
                        txn.set_agreement_status(AgreementStatus::Rejected)?;
                    }
                    txn.set_status(ShipmentStatus::Cancelled);

                    Ok((txn.shipment().clone(), swept, open_carrier))
                })
        });

        match outcome {
            Ok((shipment, swept, open_carrier)) => {
                tracing::info!(
                    shipment_id = %shipment_id,
                    swept = swept.len(),
                    "shipment cancelled"
                );
                self.record_audit(AuditEvent::now(
                    acting_user_id,
                    AuditAction::ShipmentCancel,
                    shipment_id,
                    None,
                    AuditOutcome::Committed,
                ));
                for offer in &swept {
                    self.send_notification(Notification::new(
                        offer.carrier_id,
                        NotificationKind::ShipmentCancelled,
                        shipment_id,
                        serde_json::json!({ "offer_id": offer.id }),
                    ));
                }
                if let Some(carrier_id) = open_carrier {
                    self.send_notification(Notification::new(
                        carrier_id,
                        NotificationKind::ShipmentCancelled,
                        shipment_id,
                        serde_json::json!({ "agreement": "rejected" }),
                    ));
                }
                Ok(shipment)
            }
            Err(err) => {
                self.audit_denied(
                    acting_user_id,
                    AuditAction::ShipmentCancel,
                    shipment_id,
                    None,
                    &err,
                );
                Err(err)
            }
        }
    }

    /// Advance a settled shipment along its execution legs (IN_PROGRESS,
    /// PICKED_UP, IN_TRANSIT, DELIVERED, COMPLETED).
    ///
    /// `next_raw` is normalized at the boundary, so legacy spellings remain
    /// valid inputs. Authorized for the shipment owner or the winning
    /// carrier. `CANCELLED` delegates to [`Self::cancel_shipment`];
    /// OFFER_ACCEPTED is only reachable through [`Self::accept_offer`]. On
    /// the DELIVERED → COMPLETED edge the agreement advances to COMPLETED in
    /// the same commit.
    pub fn advance_shipment(
        &self,
        shipment_id: ShipmentId,
        next_raw: &str,
        acting_user_id: UserId,
    ) -> Result<Shipment> {
        let next = ShipmentStatus::from_raw(next_raw)?;
        if next == ShipmentStatus::Cancelled {
            return self.cancel_shipment(shipment_id, acting_user_id);
        }

        let outcome = self.run_with_retry(shipment_id, || {
            self.store
                .transaction(shipment_id, self.config.lock_timeout(), |txn| {
                    let shipment = txn.shipment();
                    let winning_carrier = txn.ledger().accepted().map(|offer| offer.carrier_id);
                    let authorized = shipment.is_owned_by(acting_user_id)
                        || winning_carrier == Some(acting_user_id);
                    if !authorized {
                        return Err(FreightmatchError::Unauthorized {
                            user_id: acting_user_id,
                            shipment_id,
                        });
                    }

                    if next == ShipmentStatus::OfferAccepted && shipment.status != next {
                        // Settlement is the only path into OFFER_ACCEPTED.
                        return Err(FreightmatchError::IllegalTransition {
                            from: shipment.status,
                            to: next,
                            allowed: freightmatch_rules::next_valid_statuses(shipment.status)
                                .iter()
                                .copied()
                                .filter(|s| *s != ShipmentStatus::OfferAccepted)
                                .collect(),
                        });
                    }
                    validate_transition(shipment.status, next)?;

                    txn.set_status(next);
                    if next == ShipmentStatus::Completed
                        && txn.agreement().is_some_and(Agreement::is_open)
                    {
                        txn.set_agreement_status(AgreementStatus::Completed)?;
                    }
                    Ok(txn.shipment().clone())
                })
        });

        match outcome {
            Ok(shipment) => {
                tracing::info!(
                    shipment_id = %shipment_id,
                    status = %shipment.status,
                    "shipment advanced"
                );
                self.record_audit(AuditEvent::now(
                    acting_user_id,
                    AuditAction::ShipmentAdvance,
                    shipment_id,
                    None,
                    AuditOutcome::Committed,
                ));
                Ok(shipment)
            }
            Err(err) => {
                self.audit_denied(
                    acting_user_id,
                    AuditAction::ShipmentAdvance,
                    shipment_id,
                    None,
                    &err,
                );
                Err(err)
            }
        }
    }

    // -----------------------------------------------------------------
    // Internals
    // -----------------------------------------------------------------

    /// Retry loop for lock contention: `ConcurrentModification` is retried
    /// transparently until `max_commit_attempts` is exhausted; every other
    /// error is terminal.
    fn run_with_retry<T>(&self, shipment_id: ShipmentId, f: impl Fn() -> Result<T>) -> Result<T> {
        let mut attempt = 0;
        loop {
            attempt += 1;
            match f() {
                Err(err) if err.is_retryable() && attempt < self.config.max_commit_attempts => {
                    tracing::debug!(
                        shipment_id = %shipment_id,
                        attempt,
                        "lock contention, retrying"
                    );
                }
                other => return other,
            }
        }
    }

    fn after_accept(&self, acting_user_id: UserId, settled: &SettledAccept) {
        let agreement = &settled.agreement;
        self.record_audit(AuditEvent::now(
            acting_user_id,
            AuditAction::OfferAccept,
            agreement.shipment_id,
            Some(agreement.offer_id),
            AuditOutcome::Committed,
        ));

        self.send_notification(Notification::new(
            agreement.sender_id,
            NotificationKind::ShipmentSettled,
            agreement.shipment_id,
            serde_json::json!({
                "agreement_id": agreement.id,
                "agreed_price": agreement.agreed_price,
                "carrier_id": agreement.carrier_id,
            }),
        ));
        self.send_notification(Notification::new(
            settled.winner.carrier_id,
            NotificationKind::OfferWon,
            agreement.shipment_id,
            serde_json::json!({
                "offer_id": settled.winner.id,
                "carrier_receives": agreement.carrier_receives,
            }),
        ));
        for loser in &settled.losers {
            self.send_notification(Notification::new(
                loser.carrier_id,
                NotificationKind::OfferLost,
                agreement.shipment_id,
                serde_json::json!({ "offer_id": loser.id, "price": loser.price }),
            ));
        }
    }

    fn audit_denied(
        &self,
        acting_user_id: UserId,
        action: AuditAction,
        shipment_id: ShipmentId,
        offer_id: Option<OfferId>,
        err: &FreightmatchError,
    ) {
        // Only business-rule denials are settlement decisions worth a trail
        // entry; lock timeouts and store faults are transient noise.
        if err.is_business_rule() {
            self.record_audit(AuditEvent::now(
                acting_user_id,
                action,
                shipment_id,
                offer_id,
                AuditOutcome::Denied(err.code().to_string()),
            ));
        }
    }

    /// Append to the audit trail; a sink failure is retried once, then
    /// logged. It never propagates — the transaction is already committed.
    fn record_audit(&self, event: AuditEvent) {
        for attempt in 0..=constants::POST_COMMIT_RETRIES {
            match self.audit.record(&event) {
                Ok(()) => return,
                Err(err) if attempt < constants::POST_COMMIT_RETRIES => {
                    tracing::debug!(error = %err, attempt, "audit record failed, retrying");
                }
                Err(err) => {
                    tracing::warn!(
                        error = %err,
                        shipment_id = %event.shipment_id,
                        action = %event.action,
                        "audit record dropped after retries"
                    );
                }
            }
        }
    }

    /// Emit one notification; same at-least-once best-effort discipline as
    /// [`Self::record_audit`].
    fn send_notification(&self, notification: Notification) {
        for attempt in 0..=constants::POST_COMMIT_RETRIES {
            match self.notifier.notify(&notification) {
                Ok(()) => return,
                Err(err) if attempt < constants::POST_COMMIT_RETRIES => {
                    tracing::debug!(error = %err, attempt, "notification failed, retrying");
                }
                Err(err) => {
                    tracing::warn!(
                        error = %err,
                        user_id = %notification.user_id,
                        kind = %notification.kind,
                        "notification dropped after retries"
                    );
                }
            }
        }
    }
}
