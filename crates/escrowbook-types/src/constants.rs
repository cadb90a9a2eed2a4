//! System-wide constants for EscrowBook.

/// Default upper bound on winners + losers in one `settle_deals` call.
pub const DEFAULT_MAX_BATCH_SIZE: usize = 500;

/// Default minimum investment accepted by `fund_deal`.
pub const DEFAULT_MIN_INVESTMENT: u128 = 1;

/// Seed for the default custody account when none is configured.
pub const DEFAULT_CUSTODY_SEED: &str = "escrowbook:custody";

/// Domain separator for the event log hash chain.
pub const EVENT_DIGEST_DOMAIN: &[u8] = b"escrowbook:event:v1:";
