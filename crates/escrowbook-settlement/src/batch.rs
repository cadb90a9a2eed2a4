//! Batch settlement of confirmed deals.
//!
//! A batch names winners and losers by [`DealKey`]. Winners are processed
//! first, then losers, each in caller order. Every entry commits or skips
//! on its own; a skip never aborts the batch and never leaves partial state.
//!
//! ```text
//! winner: reserve -= payout, open -= investment, pay owner   → SETTLED (won)
//! loser:                      open -= investment             → SETTLED (lost)
//! ```
//!
//! A loser's forfeited investment stays in custody as unallocated balance
//! until reconciliation folds it into the reserve.

use escrowbook_deals::{DealRegistry, advance, pay_owner};
use escrowbook_ledger::{AssetBank, TokenLedger};
use escrowbook_types::{
    Amount, Deal, DealKey, DealStatus, EscrowError, EscrowEvent, Result, SettlementRunId,
};
use serde::{Deserialize, Serialize};

/// Why a batch entry was left untouched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SkipReason {
    /// Already CLOSED, SETTLED or REJECTED. Silent; repeated settlement is a no-op.
    Terminal(DealStatus),
    /// No deal exists under the key.
    UnknownDeal,
    /// PENDING or CLOSE_REQUESTED; only CONFIRMED deals settle.
    NotConfirmed(DealStatus),
    /// Winner payout exceeds the token's settlement reserve. Retry after funding.
    InsufficientReserve { available: Amount, required: Amount },
    /// A ledger or transfer step failed and was rolled back.
    Failed(String),
}

impl std::fmt::Display for SkipReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Terminal(status) => write!(f, "terminal status {status}"),
            Self::UnknownDeal => write!(f, "unknown deal"),
            Self::NotConfirmed(status) => write!(f, "status {status} is not CONFIRMED"),
            Self::InsufficientReserve {
                available,
                required,
            } => write!(f, "reserve {available} below payout {required}"),
            Self::Failed(reason) => write!(f, "{reason}"),
        }
    }
}

/// A deal settled by this batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettledDeal {
    pub key: DealKey,
    pub payout: Amount,
    pub won: bool,
}

/// A batch entry that was skipped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkippedDeal {
    pub key: DealKey,
    pub won: bool,
    pub reason: SkipReason,
}

/// Outcome of one `settle` call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SettlementReport {
    pub run_id: SettlementRunId,
    /// Settled entries in processing order.
    pub settled: Vec<SettledDeal>,
    pub skipped: Vec<SkippedDeal>,
    /// One `SettledDeal` event per settled entry, same order.
    pub events: Vec<EscrowEvent>,
}

impl SettlementReport {
    fn new(run_id: SettlementRunId) -> Self {
        Self {
            run_id,
            settled: Vec::new(),
            skipped: Vec::new(),
            events: Vec::new(),
        }
    }

    fn skip(&mut self, key: DealKey, won: bool, reason: SkipReason) {
        match &reason {
            SkipReason::Terminal(status) => {
                tracing::debug!(run = %self.run_id, owner = %key.owner, deal_id = key.deal_id.0, %status, "Already resolved; skipping");
            }
            other => {
                tracing::warn!(run = %self.run_id, owner = %key.owner, deal_id = key.deal_id.0, won, reason = %other, "Settlement skipped");
            }
        }
        self.skipped.push(SkippedDeal { key, won, reason });
    }

    fn settle(&mut self, key: DealKey, payout: Amount, won: bool) {
        tracing::info!(run = %self.run_id, owner = %key.owner, deal_id = key.deal_id.0, payout, won, "Deal settled");
        self.settled.push(SettledDeal { key, payout, won });
        self.events.push(EscrowEvent::SettledDeal {
            owner: key.owner,
            deal_id: key.deal_id,
            payout,
            won,
        });
    }
}

/// Settles batches of confirmed deals against the token ledger.
pub struct SettlementEngine {
    max_batch_size: usize,
}

impl SettlementEngine {
    #[must_use]
    pub fn new(max_batch_size: usize) -> Self {
        Self { max_batch_size }
    }

    /// Settle `winners` then `losers`.
    ///
    /// # Errors
    /// Only `BatchTooLarge`, before anything is touched. Per-entry problems
    /// are reported as skips.
    pub fn settle<B: AssetBank + ?Sized>(
        &self,
        registry: &mut DealRegistry,
        ledger: &mut TokenLedger,
        bank: &mut B,
        winners: &[DealKey],
        losers: &[DealKey],
    ) -> Result<SettlementReport> {
        let size = winners.len() + losers.len();
        if size > self.max_batch_size {
            return Err(EscrowError::BatchTooLarge {
                size,
                limit: self.max_batch_size,
            });
        }

        let mut report = SettlementReport::new(SettlementRunId::new());
        tracing::info!(run = %report.run_id, winners = winners.len(), losers = losers.len(), "Settlement batch started");

        for key in winners {
            settle_winner(registry, ledger, bank, *key, &mut report);
        }
        for key in losers {
            settle_loser(registry, ledger, *key, &mut report);
        }

        tracing::info!(
            run = %report.run_id,
            settled = report.settled.len(),
            skipped = report.skipped.len(),
            "Settlement batch finished"
        );
        Ok(report)
    }
}

/// Status pre-check shared by both sides. Returns the confirmed deal, or
/// `None` after recording the skip.
fn precheck<'r>(
    registry: &'r DealRegistry,
    key: DealKey,
    won: bool,
    report: &mut SettlementReport,
) -> Option<&'r Deal> {
    let Some(deal) = registry.get(&key) else {
        report.skip(key, won, SkipReason::UnknownDeal);
        return None;
    };
    match deal.status {
        DealStatus::Confirmed => Some(deal),
        status if status.is_terminal() => {
            report.skip(key, won, SkipReason::Terminal(status));
            None
        }
        status => {
            report.skip(key, won, SkipReason::NotConfirmed(status));
            None
        }
    }
}

fn settle_winner<B: AssetBank + ?Sized>(
    registry: &mut DealRegistry,
    ledger: &mut TokenLedger,
    bank: &mut B,
    key: DealKey,
    report: &mut SettlementReport,
) {
    let Some(deal) = precheck(registry, key, true, report) else {
        return;
    };
    let payout = deal.payout;
    let available = ledger.entry(&deal.token).map_or(0, |e| e.settlement);
    if available < payout {
        report.skip(
            key,
            true,
            SkipReason::InsufficientReserve {
                available,
                required: payout,
            },
        );
        return;
    }

    let outcome = registry.apply(&key, &[DealStatus::Confirmed], ledger, |deal, ledger| {
        ledger.debit_settlement(&deal.token, payout)?;
        ledger.release_open(&deal.token, deal.investment)?;
        advance(deal, DealStatus::Settled);
        deal.paid = payout;
        pay_owner(ledger, bank, deal, payout)
    });
    match outcome {
        Ok(()) => report.settle(key, payout, true),
        Err(err) => report.skip(key, true, SkipReason::Failed(err.to_string())),
    }
}

fn settle_loser(
    registry: &mut DealRegistry,
    ledger: &mut TokenLedger,
    key: DealKey,
    report: &mut SettlementReport,
) {
    if precheck(registry, key, false, report).is_none() {
        return;
    }
    let outcome = registry.apply(&key, &[DealStatus::Confirmed], ledger, |deal, ledger| {
        ledger.release_open(&deal.token, deal.investment)?;
        advance(deal, DealStatus::Settled);
        Ok(())
    });
    match outcome {
        Ok(()) => report.settle(key, 0, false),
        Err(err) => report.skip(key, false, SkipReason::Failed(err.to_string())),
    }
}
