//! Ledger invariant checks.
//!
//! Two invariants per registered token:
//! ```text
//! exposure:  open == Σ investment over non-terminal deals of the token
//! solvency:  live balance >= settlement + open
//! ```
//!
//! Exposure conservation must hold after every committed operation; a
//! violation means the registry and the ledger disagree. Solvency is a
//! target: contract rebinding breaks it until reconciliation runs.

use escrowbook_deals::DealRegistry;
use escrowbook_ledger::{AssetBank, TokenLedger};
use escrowbook_types::{EscrowError, Result, TokenBalance};
use serde::{Deserialize, Serialize};

/// Result of a full audit pass.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditReport {
    /// Balance rows checked, in registration order.
    pub balances: Vec<TokenBalance>,
    /// Number of event records whose chain verified.
    pub events_verified: usize,
}

/// Verify `open` against the registry for every token.
///
/// # Errors
/// `ExposureMismatch` for the first token that disagrees.
pub fn check_exposure(ledger: &TokenLedger, registry: &DealRegistry) -> Result<()> {
    for entry in ledger.entries() {
        let deals = registry.open_investment(&entry.symbol);
        if deals != entry.open {
            tracing::error!(token = %entry.symbol, ledger = entry.open, deals, "Open exposure mismatch");
            return Err(EscrowError::ExposureMismatch {
                token: entry.symbol.clone(),
                ledger: entry.open,
                deals,
            });
        }
    }
    Ok(())
}

/// Verify every token's live balance covers reserve plus exposure.
///
/// # Errors
/// `SolvencyViolation` describing the first undercollateralised token.
pub fn check_solvency<B: AssetBank + ?Sized>(
    ledger: &TokenLedger,
    bank: &B,
) -> Result<Vec<TokenBalance>> {
    let rows = ledger.balances(bank)?;
    for row in &rows {
        if !row.is_solvent() {
            tracing::error!(
                token = %row.token,
                balance = row.balance,
                settlement = row.settlement,
                open = row.open,
                "Custody balance below committed funds"
            );
            return Err(EscrowError::SolvencyViolation {
                reason: format!(
                    "{}: balance {} < settlement {} + open {}",
                    row.token, row.balance, row.settlement, row.open
                ),
            });
        }
    }
    Ok(rows)
}
