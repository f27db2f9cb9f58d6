//! System-wide constants for the FreightMatch settlement core.

/// Decimal places for monetary amounts (platform currency cents).
pub const MONEY_SCALE: u32 = 2;

/// Default commission rate numerator, at [`MONEY_SCALE`] scale (1%).
///
/// `Decimal::new` is not const; [`crate::SettlementConfig::default`] builds
/// the actual `Decimal` from these parts.
pub const DEFAULT_COMMISSION_RATE_MANTISSA: i64 = 1;
pub const DEFAULT_COMMISSION_RATE_SCALE: u32 = 2;

/// Default bound on waiting for a shipment's write lock, in milliseconds.
pub const DEFAULT_LOCK_TIMEOUT_MS: u64 = 2000;

/// Default commit attempts per settlement call: the initial attempt plus
/// one transparent retry on lock contention.
pub const DEFAULT_MAX_COMMIT_ATTEMPTS: u32 = 2;

/// Post-commit collaborator calls (audit, notify) are retried this many
/// times before the failure is logged and dropped.
pub const POST_COMMIT_RETRIES: u32 = 1;

/// Maximum offers a single shipment will hold before new bids are refused.
pub const MAX_OFFERS_PER_SHIPMENT: usize = 500;

/// Version string.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Engine name.
pub const ENGINE_NAME: &str = "FreightMatch";
