//! Per-token bookkeeping: settlement reserve and open exposure.
//!
//! The ledger is the source of truth for both counters. Real balances are
//! never stored; they are read from the [`AssetBank`] on demand. Every
//! mutation is atomic: either it fully applies or the entry is unchanged.

use std::collections::HashMap;

use escrowbook_types::{
    Address, Amount, EscrowError, Result, Symbol, TokenBalance, TokenEntry,
};

use crate::asset_bank::AssetBank;

/// Registered payout tokens in registration order.
pub struct TokenLedger {
    /// Account that holds escrowed funds on every asset contract.
    custody: Address,
    /// Entries in registration order.
    entries: Vec<TokenEntry>,
    /// Symbol → position in `entries`.
    index: HashMap<Symbol, usize>,
}

impl TokenLedger {
    /// Create an empty ledger whose funds are held by `custody`.
    #[must_use]
    pub fn new(custody: Address) -> Self {
        Self {
            custody,
            entries: Vec::new(),
            index: HashMap::new(),
        }
    }

    /// The custody account.
    #[must_use]
    pub fn custody(&self) -> Address {
        self.custody
    }

    /// Register a new payout token with zeroed counters.
    ///
    /// # Errors
    /// - `DuplicateTokenContract` if `contract` already backs another symbol
    /// - `TokenAlreadyRegistered` if `symbol` exists
    pub fn register(&mut self, symbol: &str, contract: Address) -> Result<()> {
        self.ensure_contract_free(symbol, contract)?;
        if self.index.contains_key(symbol) {
            return Err(EscrowError::TokenAlreadyRegistered(symbol.to_string()));
        }
        self.index.insert(symbol.to_string(), self.entries.len());
        self.entries.push(TokenEntry::new(symbol, contract));
        tracing::info!(symbol, contract = %contract, "Token registered");
        Ok(())
    }

    /// Rebind an existing symbol to a new contract. Reserve and exposure are
    /// left untouched; reconciliation corrects the resulting drift.
    ///
    /// Returns the previous contract address.
    pub fn reregister(&mut self, symbol: &str, contract: Address) -> Result<Address> {
        self.ensure_contract_free(symbol, contract)?;
        let entry = self.entry_mut(symbol)?;
        let previous = entry.contract;
        entry.contract = contract;
        tracing::warn!(
            symbol,
            previous = %previous,
            contract = %contract,
            "Token contract rebound; settlement reserve may have drifted"
        );
        Ok(previous)
    }

    /// Look up an entry.
    pub fn entry(&self, symbol: &str) -> Result<&TokenEntry> {
        self.index
            .get(symbol)
            .map(|&i| &self.entries[i])
            .ok_or_else(|| EscrowError::UnknownToken(symbol.to_string()))
    }

    fn entry_mut(&mut self, symbol: &str) -> Result<&mut TokenEntry> {
        match self.index.get(symbol) {
            Some(&i) => Ok(&mut self.entries[i]),
            None => Err(EscrowError::UnknownToken(symbol.to_string())),
        }
    }

    /// Whether `symbol` is registered.
    #[must_use]
    pub fn contains(&self, symbol: &str) -> bool {
        self.index.contains_key(symbol)
    }

    /// All entries in registration order.
    #[must_use]
    pub fn entries(&self) -> &[TokenEntry] {
        &self.entries
    }

    /// Copy of an entry, for restoring after a failed interaction.
    pub fn snapshot(&self, symbol: &str) -> Result<TokenEntry> {
        self.entry(symbol).cloned()
    }

    /// Put back an entry captured by [`snapshot`](Self::snapshot).
    pub fn restore(&mut self, snapshot: TokenEntry) {
        if let Some(&i) = self.index.get(&snapshot.symbol) {
            self.entries[i] = snapshot;
        }
    }

    // ------------------------------------------------------------------
    // Counter mutations
    // ------------------------------------------------------------------

    /// Increase open exposure.
    pub fn add_open(&mut self, symbol: &str, amount: Amount) -> Result<()> {
        let entry = self.entry_mut(symbol)?;
        entry.open = entry
            .open
            .checked_add(amount)
            .ok_or_else(|| EscrowError::LedgerOverflow {
                token: symbol.to_string(),
                counter: "open",
            })?;
        Ok(())
    }

    /// Decrease open exposure.
    pub fn release_open(&mut self, symbol: &str, amount: Amount) -> Result<()> {
        let entry = self.entry_mut(symbol)?;
        entry.open = entry
            .open
            .checked_sub(amount)
            .ok_or_else(|| EscrowError::LedgerUnderflow {
                token: symbol.to_string(),
                counter: "open",
            })?;
        Ok(())
    }

    /// Increase the settlement reserve.
    pub fn credit_settlement(&mut self, symbol: &str, amount: Amount) -> Result<()> {
        let entry = self.entry_mut(symbol)?;
        entry.settlement = entry
            .settlement
            .checked_add(amount)
            .ok_or_else(|| EscrowError::LedgerOverflow {
                token: symbol.to_string(),
                counter: "settlement",
            })?;
        Ok(())
    }

    /// Decrease the settlement reserve.
    ///
    /// # Errors
    /// Returns `InsufficientFunds` if the reserve is below `amount`.
    pub fn debit_settlement(&mut self, symbol: &str, amount: Amount) -> Result<()> {
        let entry = self.entry_mut(symbol)?;
        if entry.settlement < amount {
            return Err(EscrowError::InsufficientFunds);
        }
        entry.settlement -= amount;
        Ok(())
    }

    /// Overwrite the settlement reserve. Returns the previous value.
    pub fn set_settlement(&mut self, symbol: &str, amount: Amount) -> Result<Amount> {
        let entry = self.entry_mut(symbol)?;
        Ok(std::mem::replace(&mut entry.settlement, amount))
    }

    // ------------------------------------------------------------------
    // Live balances
    // ------------------------------------------------------------------

    /// Live custody balance of `symbol` on its current contract.
    pub fn live_balance<B: AssetBank + ?Sized>(&self, bank: &B, symbol: &str) -> Result<Amount> {
        let entry = self.entry(symbol)?;
        bank.balance_of(entry.contract, self.custody)
    }

    /// Balance rows for every token, in registration order.
    pub fn balances<B: AssetBank + ?Sized>(&self, bank: &B) -> Result<Vec<TokenBalance>> {
        self.entries
            .iter()
            .map(|entry| {
                Ok(TokenBalance {
                    token: entry.symbol.clone(),
                    token_contract: entry.contract,
                    balance: bank.balance_of(entry.contract, self.custody)?,
                    settlement: entry.settlement,
                    open: entry.open,
                })
            })
            .collect()
    }

    // ------------------------------------------------------------------
    // Settlement funding
    // ------------------------------------------------------------------

    /// Pull `amount` from `from` into custody and add it to the reserve.
    ///
    /// The reserve is credited first and rolled back if the pull fails.
    pub fn deposit_settlement<B: AssetBank + ?Sized>(
        &mut self,
        bank: &mut B,
        from: Address,
        symbol: &str,
        amount: Amount,
    ) -> Result<()> {
        let snapshot = self.snapshot(symbol)?;
        self.credit_settlement(symbol, amount)?;
        if let Err(err) = bank.transfer_from(snapshot.contract, self.custody, from, self.custody, amount) {
            tracing::warn!(symbol, from = %from, amount, error = %err, "Settlement deposit rejected");
            self.restore(snapshot);
            return Err(err);
        }
        tracing::info!(symbol, from = %from, amount, "Settlement deposited");
        Ok(())
    }

    /// Pay `amount` out of the reserve to `to`.
    ///
    /// # Errors
    /// `InsufficientFunds` if the reserve cannot cover `amount`; the reserve
    /// is unchanged if the transfer itself fails.
    pub fn withdraw_settlement<B: AssetBank + ?Sized>(
        &mut self,
        bank: &mut B,
        to: Address,
        symbol: &str,
        amount: Amount,
    ) -> Result<()> {
        let snapshot = self.snapshot(symbol)?;
        self.debit_settlement(symbol, amount)?;
        if let Err(err) = bank.transfer(snapshot.contract, self.custody, to, amount) {
            tracing::warn!(symbol, to = %to, amount, error = %err, "Settlement withdrawal rejected");
            self.restore(snapshot);
            return Err(err);
        }
        tracing::info!(symbol, to = %to, amount, "Settlement withdrawn");
        Ok(())
    }

    fn ensure_contract_free(&self, symbol: &str, contract: Address) -> Result<()> {
        match self
            .entries
            .iter()
            .find(|e| e.contract == contract && e.symbol != symbol)
        {
            Some(existing) => Err(EscrowError::DuplicateTokenContract {
                contract,
                existing: existing.symbol.clone(),
            }),
            None => Ok(()),
        }
    }
}
