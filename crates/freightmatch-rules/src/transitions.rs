//! The shipment status registry: canonical statuses and the legal
//! transition graph between them.
//!
//! The graph is defined only over the canonical [`ShipmentStatus`] variants;
//! legacy spellings (`ACCEPTED`, `ASSIGNED`) are folded to canonical at the
//! parse boundary, so the table never needs alias-specific edges. Absence of
//! an edge means the transition is illegal. Re-applying the current status
//! is always legal (idempotent no-op), which lets callers retry without
//! special-casing "already there".

use freightmatch_types::{FreightmatchError, Result, ShipmentStatus};

/// The outgoing edge set for a status. Empty for terminal states.
///
/// Not transactional — UI/API layers use this to render the legal actions
/// for a shipment without touching the store.
#[must_use]
pub fn next_valid_statuses(current: ShipmentStatus) -> &'static [ShipmentStatus] {
    match current {
        ShipmentStatus::Pending | ShipmentStatus::Open | ShipmentStatus::WaitingForOffers => {
            &[ShipmentStatus::OfferAccepted, ShipmentStatus::Cancelled]
        }
        ShipmentStatus::OfferAccepted => &[
            ShipmentStatus::InProgress,
            ShipmentStatus::PickedUp,
            ShipmentStatus::Cancelled,
        ],
        ShipmentStatus::InProgress => &[
            ShipmentStatus::PickedUp,
            ShipmentStatus::InTransit,
            ShipmentStatus::Cancelled,
        ],
        ShipmentStatus::PickedUp => &[ShipmentStatus::InTransit, ShipmentStatus::Cancelled],
        ShipmentStatus::InTransit => &[ShipmentStatus::Delivered, ShipmentStatus::Cancelled],
        ShipmentStatus::Delivered => &[ShipmentStatus::Completed, ShipmentStatus::Cancelled],
        ShipmentStatus::Completed | ShipmentStatus::Cancelled => &[],
    }
}

/// Check a typed transition against the graph.
///
/// `current == next` is always valid (idempotent re-application). Otherwise
/// `next` must be in `current`'s outgoing edge set.
///
/// # Errors
/// Returns [`FreightmatchError::IllegalTransition`] carrying the allowed
/// next-states for client guidance.
pub fn validate_transition(current: ShipmentStatus, next: ShipmentStatus) -> Result<()> {
    if current == next {
        return Ok(());
    }
    let allowed = next_valid_statuses(current);
    if allowed.contains(&next) {
        tracing::debug!(from = %current, to = %next, "status transition validated");
        Ok(())
    } else {
        Err(FreightmatchError::IllegalTransition {
            from: current,
            to: next,
            allowed: allowed.to_vec(),
        })
    }
}

/// Raw-string boundary form of [`validate_transition`].
///
/// Both sides are normalized via [`ShipmentStatus::from_raw`] (case folded,
/// hyphens to underscores, legacy aliases resolved), so previously persisted
/// spellings stay valid inputs. Returns the canonical pair on success.
///
/// # Errors
/// [`FreightmatchError::InvalidStatus`] if either string is outside the
/// canonical set; [`FreightmatchError::IllegalTransition`] as in the typed
/// form.
pub fn validate_raw_transition(
    current_raw: &str,
    next_raw: &str,
) -> Result<(ShipmentStatus, ShipmentStatus)> {
    let current = ShipmentStatus::from_raw(current_raw)?;
    let next = ShipmentStatus::from_raw(next_raw)?;
    validate_transition(current, next)?;
    Ok((current, next))
}
