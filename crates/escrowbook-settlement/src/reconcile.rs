//! Settlement reserve reconciliation.
//!
//! Recomputes every token's reserve from the live custody balance:
//!
//! ```text
//! settlement ← max(0, live balance − open exposure)
//! ```
//!
//! This corrects drift from contract rebinding, forfeited loser
//! investments, retained rejections, and untracked inbound transfers.

use escrowbook_ledger::{AssetBank, PauseGate, TokenLedger};
use escrowbook_types::{Amount, Result, Symbol};
use serde::{Deserialize, Serialize};

/// Per-token outcome of one reconciliation pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenReconciliation {
    pub token: Symbol,
    /// Live custody balance read from the asset bank.
    pub balance: Amount,
    pub open: Amount,
    pub previous: Amount,
    pub settlement: Amount,
}

impl TokenReconciliation {
    #[must_use]
    pub fn changed(&self) -> bool {
        self.previous != self.settlement
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconciliationReport {
    /// Rows in token registration order.
    pub tokens: Vec<TokenReconciliation>,
}

impl ReconciliationReport {
    /// Rows whose reserve actually moved.
    pub fn changed(&self) -> impl Iterator<Item = &TokenReconciliation> {
        self.tokens.iter().filter(|t| t.changed())
    }
}

/// Rebuilds settlement reserves from live balances.
#[derive(Debug, Default)]
pub struct ReconciliationEngine;

impl ReconciliationEngine {
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Recalculate every reserve. All balances are read before any reserve
    /// is written, so a failed read leaves the ledger untouched.
    ///
    /// # Errors
    /// - `Paused` while the gate is closed
    /// - any balance read failure from the bank
    pub fn recalc<B: AssetBank + ?Sized>(
        &self,
        gate: &PauseGate,
        ledger: &mut TokenLedger,
        bank: &B,
    ) -> Result<ReconciliationReport> {
        gate.ensure_running()?;

        let reads = ledger
            .entries()
            .iter()
            .map(|entry| {
                let balance = bank.balance_of(entry.contract, ledger.custody())?;
                Ok((entry.symbol.clone(), balance, entry.open))
            })
            .collect::<Result<Vec<_>>>()?;

        let mut report = ReconciliationReport::default();
        for (token, balance, open) in reads {
            let settlement = balance.saturating_sub(open);
            let previous = ledger.set_settlement(&token, settlement)?;
            if previous == settlement {
                tracing::debug!(token = %token, settlement, "Reserve unchanged");
            } else {
                tracing::info!(token = %token, previous, settlement, balance, open, "Reserve recalculated");
            }
            report.tokens.push(TokenReconciliation {
                token,
                balance,
                open,
                previous,
                settlement,
            });
        }
        Ok(report)
    }
}
