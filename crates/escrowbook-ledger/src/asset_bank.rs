//! Fungible-asset transfer collaborator.
//!
//! The ledger never moves tokens itself; it calls an [`AssetBank`], which
//! stands in for the standard `balanceOf` / `transfer` / `transferFrom`
//! surface of the backing asset contracts. [`InMemoryAssetBank`] is a
//! complete in-process implementation with allowances, used by tests and
//! embedders that keep custody off-chain.

use std::collections::{HashMap, HashSet};

use escrowbook_types::{Address, Amount, EscrowError, Result};

/// Standard fungible-token capability over many asset contracts.
pub trait AssetBank {
    /// Balance of `account` on `contract`.
    fn balance_of(&self, contract: Address, account: Address) -> Result<Amount>;

    /// Move `amount` from `from` to `to` on `contract`, authorised by `from`.
    fn transfer(
        &mut self,
        contract: Address,
        from: Address,
        to: Address,
        amount: Amount,
    ) -> Result<()>;

    /// Move `amount` from `from` to `to`, spending `spender`'s allowance.
    fn transfer_from(
        &mut self,
        contract: Address,
        spender: Address,
        from: Address,
        to: Address,
        amount: Amount,
    ) -> Result<()>;
}

/// In-process asset contracts with balances and allowances.
#[derive(Debug, Default)]
pub struct InMemoryAssetBank {
    /// Deployed contract addresses.
    contracts: HashSet<Address>,
    /// Per-(contract, account) balances.
    balances: HashMap<(Address, Address), Amount>,
    /// Per-(contract, owner, spender) allowances.
    allowances: HashMap<(Address, Address, Address), Amount>,
}

impl InMemoryAssetBank {
    /// Create an empty bank with no contracts.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Deploy a contract with `supply` minted to `holder`. Deploying an
    /// existing contract again mints more supply to `holder`.
    pub fn deploy(&mut self, contract: Address, holder: Address, supply: Amount) -> Result<()> {
        self.contracts.insert(contract);
        self.mint(contract, holder, supply)
    }

    /// Mint new units to `to`.
    pub fn mint(&mut self, contract: Address, to: Address, amount: Amount) -> Result<()> {
        self.ensure_contract(contract)?;
        let bal = self.balances.entry((contract, to)).or_insert(0);
        *bal = bal.checked_add(amount).ok_or_else(|| EscrowError::TransferFailed {
            reason: "balance overflow".into(),
        })?;
        Ok(())
    }

    /// Set `spender`'s allowance over `owner`'s balance.
    pub fn approve(
        &mut self,
        contract: Address,
        owner: Address,
        spender: Address,
        amount: Amount,
    ) -> Result<()> {
        self.ensure_contract(contract)?;
        self.allowances.insert((contract, owner, spender), amount);
        Ok(())
    }

    /// Remaining allowance of `spender` over `owner`'s balance.
    #[must_use]
    pub fn allowance(&self, contract: Address, owner: Address, spender: Address) -> Amount {
        self.allowances
            .get(&(contract, owner, spender))
            .copied()
            .unwrap_or(0)
    }

    fn ensure_contract(&self, contract: Address) -> Result<()> {
        if self.contracts.contains(&contract) {
            Ok(())
        } else {
            Err(EscrowError::UnknownAssetContract(contract))
        }
    }

    fn move_balance(
        &mut self,
        contract: Address,
        from: Address,
        to: Address,
        amount: Amount,
    ) -> Result<()> {
        let from_bal = self.balances.get(&(contract, from)).copied().unwrap_or(0);
        if from_bal < amount {
            return Err(EscrowError::TransferFailed {
                reason: format!("transfer amount {amount} exceeds balance {from_bal}"),
            });
        }
        if from == to || amount == 0 {
            return Ok(());
        }
        let to_bal = self.balances.get(&(contract, to)).copied().unwrap_or(0);
        let new_to = to_bal
            .checked_add(amount)
            .ok_or_else(|| EscrowError::TransferFailed {
                reason: "balance overflow".into(),
            })?;
        self.balances.insert((contract, from), from_bal - amount);
        self.balances.insert((contract, to), new_to);
        Ok(())
    }
}

impl AssetBank for InMemoryAssetBank {
    fn balance_of(&self, contract: Address, account: Address) -> Result<Amount> {
        self.ensure_contract(contract)?;
        Ok(self
            .balances
            .get(&(contract, account))
            .copied()
            .unwrap_or(0))
    }

    fn transfer(
        &mut self,
        contract: Address,
        from: Address,
        to: Address,
        amount: Amount,
    ) -> Result<()> {
        self.ensure_contract(contract)?;
        self.move_balance(contract, from, to, amount)
    }

    fn transfer_from(
        &mut self,
        contract: Address,
        spender: Address,
        from: Address,
        to: Address,
        amount: Amount,
    ) -> Result<()> {
        self.ensure_contract(contract)?;
        let allowed = self.allowance(contract, from, spender);
        if allowed < amount {
            return Err(EscrowError::TransferFailed {
                reason: format!("insufficient allowance: need {amount}, have {allowed}"),
            });
        }
        self.move_balance(contract, from, to, amount)?;
        self.allowances
            .insert((contract, from, spender), allowed - amount);
        Ok(())
    }
}
