//! Configuration for the FreightMatch settlement engine.

use std::time::Duration;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::{constants, FreightmatchError, Result};

/// Tunables for the settlement transaction.
///
/// The commission rate is externally configured and read at call time; it is
/// never hot-reloaded mid-transaction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SettlementConfig {
    /// Platform commission rate, `0 <= rate < 1`.
    pub commission_rate: Decimal,
    /// Bound on waiting for a shipment's write lock.
    pub lock_timeout_ms: u64,
    /// Commit attempts per call (initial + transparent retries on lock
    /// contention).
    pub max_commit_attempts: u32,
}

impl SettlementConfig {
    /// Build a config, validating the commission rate.
    ///
    /// # Errors
    /// Returns [`FreightmatchError::InvalidCommissionRate`] if `rate` is
    /// outside `[0, 1)`.
    pub fn new(commission_rate: Decimal, lock_timeout_ms: u64, max_commit_attempts: u32) -> Result<Self> {
        if commission_rate < Decimal::ZERO || commission_rate >= Decimal::ONE {
            return Err(FreightmatchError::InvalidCommissionRate {
                rate: commission_rate,
            });
        }
        Ok(Self {
            commission_rate,
            lock_timeout_ms,
            max_commit_attempts: max_commit_attempts.max(1),
        })
    }

    #[must_use]
    pub fn lock_timeout(&self) -> Duration {
        Duration::from_millis(self.lock_timeout_ms)
    }
}

impl Default for SettlementConfig {
    fn default() -> Self {
        Self {
            commission_rate: Decimal::new(
                constants::DEFAULT_COMMISSION_RATE_MANTISSA,
                constants::DEFAULT_COMMISSION_RATE_SCALE,
            ),
            lock_timeout_ms: constants::DEFAULT_LOCK_TIMEOUT_MS,
            max_commit_attempts: constants::DEFAULT_MAX_COMMIT_ATTEMPTS,
        }
    }
}
