//! Commission arithmetic — the platform's cut of an agreed price.
//!
//! The split must conserve money exactly: `commission_amount +
//! carrier_receives == agreed_price` to the cent. The commission side is
//! rounded to [`constants::MONEY_SCALE`] decimal places with
//! midpoint-away-from-zero rounding (NOT the default banker's rounding);
//! the carrier side is then computed by subtraction, so any rounding
//! remainder lands on the carrier side instead of each side rounding
//! independently and leaking a cent.

use freightmatch_types::{constants, FreightmatchError, Result};
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

/// The two sides of a settled price.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommissionSplit {
    /// The platform's cut, rounded to the money scale.
    pub commission_amount: Decimal,
    /// What the carrier is paid: `agreed_price - commission_amount`.
    pub carrier_receives: Decimal,
}

impl CommissionSplit {
    /// The agreed price this split was computed from.
    #[must_use]
    pub fn total(&self) -> Decimal {
        self.commission_amount + self.carrier_receives
    }
}

/// Compute the commission split for an agreed price.
///
/// # Errors
/// - [`FreightmatchError::InvalidAmount`] if `agreed_price` is not strictly
///   positive or carries more decimal places than the money scale.
/// - [`FreightmatchError::InvalidCommissionRate`] if `commission_rate` is
///   outside `[0, 1)`.
pub fn split(agreed_price: Decimal, commission_rate: Decimal) -> Result<CommissionSplit> {
    if agreed_price <= Decimal::ZERO {
        return Err(FreightmatchError::InvalidAmount {
            reason: format!("agreed price must be positive, got {agreed_price}"),
        });
    }
    if agreed_price.normalize().scale() > constants::MONEY_SCALE {
        return Err(FreightmatchError::InvalidAmount {
            reason: format!(
                "agreed price {agreed_price} has more than {} decimal places",
                constants::MONEY_SCALE
            ),
        });
    }
    if commission_rate < Decimal::ZERO || commission_rate >= Decimal::ONE {
        return Err(FreightmatchError::InvalidCommissionRate {
            rate: commission_rate,
        });
    }

    let commission_amount = (agreed_price * commission_rate)
        .round_dp_with_strategy(constants::MONEY_SCALE, RoundingStrategy::MidpointAwayFromZero);
    let carrier_receives = agreed_price - commission_amount;

    Ok(CommissionSplit {
        commission_amount,
        carrier_receives,
    })
}
