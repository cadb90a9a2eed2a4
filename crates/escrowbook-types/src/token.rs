//! Per-token bookkeeping types.
//!
//! The ledger stores only the settlement reserve and the open exposure for
//! each token. The real balance is read live from the asset contract, so
//! it appears only in the [`TokenBalance`] view.

use serde::{Deserialize, Serialize};

use crate::{Address, Amount, Symbol};

/// A registered payout token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenEntry {
    pub symbol: Symbol,
    /// Backing asset contract.
    pub contract: Address,
    /// Liquid funds earmarked to pay obligations.
    pub settlement: Amount,
    /// Sum of investments over this token's non-terminal deals.
    pub open: Amount,
}

impl TokenEntry {
    /// Zero-initialised entry.
    #[must_use]
    pub fn new(symbol: impl Into<Symbol>, contract: Address) -> Self {
        Self {
            symbol: symbol.into(),
            contract,
            settlement: 0,
            open: 0,
        }
    }

    /// Funds the ledger accounts for: reserve plus open exposure.
    #[must_use]
    pub fn committed(&self) -> Amount {
        self.settlement.saturating_add(self.open)
    }
}

/// Snapshot row returned by `get_balances`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenBalance {
    pub token: Symbol,
    pub token_contract: Address,
    /// Live balance held by the custody account.
    pub balance: Amount,
    pub settlement: Amount,
    pub open: Amount,
}

impl TokenBalance {
    /// Live balance not accounted for by reserve or exposure.
    #[must_use]
    pub fn unallocated(&self) -> Amount {
        self.balance
            .saturating_sub(self.settlement.saturating_add(self.open))
    }

    /// Whether the live balance covers reserve plus exposure.
    #[must_use]
    pub fn is_solvent(&self) -> bool {
        self.balance >= self.settlement.saturating_add(self.open)
    }
}
