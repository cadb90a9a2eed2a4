//! Escrow holder — the public entry surface.
//!
//! [`EscrowHolder`] owns every component and the asset bank. Each entry
//! point takes the caller first and runs:
//!
//! ```text
//! role check → pause check → component operation → event log
//! ```
//!
//! All entry points take `&mut self`, so operations are serialized by
//! construction and each one either fully commits or leaves no trace.

use escrowbook_deals::DealRegistry;
use escrowbook_ledger::{AccessControl, AssetBank, PauseGate, TokenLedger};
use escrowbook_types::{
    Address, Amount, Deal, DealId, DealKey, EscrowError, EscrowEvent, EventRecord, FundDeal,
    HolderConfig, Result, Role, TokenBalance,
};

use crate::audit::{self, AuditReport};
use crate::batch::{SettlementEngine, SettlementReport};
use crate::event_log::EventLog;
use crate::reconcile::{ReconciliationEngine, ReconciliationReport};

/// Multi-token escrow and settlement ledger.
pub struct EscrowHolder<B: AssetBank> {
    config: HolderConfig,
    ledger: TokenLedger,
    registry: DealRegistry,
    gate: PauseGate,
    access: AccessControl,
    settlement: SettlementEngine,
    reconciler: ReconciliationEngine,
    log: EventLog,
    bank: B,
}

impl<B: AssetBank> EscrowHolder<B> {
    /// Build a holder, registering the configured tokens and granting the
    /// configured roles.
    ///
    /// # Errors
    /// `Configuration` for an invalid config; token registration errors for
    /// duplicate symbols or contracts.
    pub fn new(config: HolderConfig, bank: B) -> Result<Self> {
        config.validate()?;
        let mut holder = Self {
            ledger: TokenLedger::new(config.custody),
            registry: DealRegistry::new(),
            gate: PauseGate::new(),
            access: AccessControl::new(),
            settlement: SettlementEngine::new(config.max_batch_size),
            reconciler: ReconciliationEngine::new(),
            log: EventLog::new(),
            bank,
            config,
        };

        for (role, account) in holder.config.roles.grants() {
            if holder.access.grant(role, account) {
                holder.log.append(EscrowEvent::RoleGranted {
                    role,
                    account,
                    sender: Address::ZERO,
                })?;
            }
        }
        for spec in holder.config.tokens.clone() {
            holder.ledger.register(&spec.symbol, spec.contract)?;
            holder.log.append(EscrowEvent::TokenRegistered {
                symbol: spec.symbol,
                contract: spec.contract,
            })?;
        }

        tracing::info!(
            custody = %holder.config.custody,
            tokens = holder.ledger.entries().len(),
            max_batch_size = holder.config.max_batch_size,
            "Escrow holder initialised"
        );
        Ok(holder)
    }

    // ------------------------------------------------------------------
    // Role management (Admin)
    // ------------------------------------------------------------------

    /// Grant `role` to `account`. Returns `false` if it was already held.
    pub fn grant_role(&mut self, caller: Address, role: Role, account: Address) -> Result<bool> {
        self.access.require(Role::Admin, caller)?;
        let granted = self.access.grant(role, account);
        if granted {
            tracing::info!(role = %role, account = %account, sender = %caller, "Role granted");
            self.log.append(EscrowEvent::RoleGranted {
                role,
                account,
                sender: caller,
            })?;
        }
        Ok(granted)
    }

    /// Revoke `role` from `account`. Returns `false` if it was not held.
    pub fn revoke_role(&mut self, caller: Address, role: Role, account: Address) -> Result<bool> {
        self.access.require(Role::Admin, caller)?;
        let revoked = self.access.revoke(role, account);
        if revoked {
            tracing::info!(role = %role, account = %account, sender = %caller, "Role revoked");
            self.log.append(EscrowEvent::RoleRevoked {
                role,
                account,
                sender: caller,
            })?;
        }
        Ok(revoked)
    }

    // ------------------------------------------------------------------
    // Token registry (Admin; allowed while paused)
    // ------------------------------------------------------------------

    pub fn register_token(&mut self, caller: Address, symbol: &str, contract: Address) -> Result<()> {
        self.access.require(Role::Admin, caller)?;
        self.ledger.register(symbol, contract)?;
        self.log.append(EscrowEvent::TokenRegistered {
            symbol: symbol.to_string(),
            contract,
        })?;
        Ok(())
    }

    /// Rebind `symbol` to `contract`, returning the previous contract.
    /// Counters are kept; run reconciliation afterwards.
    pub fn reregister_token(
        &mut self,
        caller: Address,
        symbol: &str,
        contract: Address,
    ) -> Result<Address> {
        self.access.require(Role::Admin, caller)?;
        let previous = self.ledger.reregister(symbol, contract)?;
        self.log.append(EscrowEvent::TokenReregistered {
            symbol: symbol.to_string(),
            previous,
            contract,
        })?;
        Ok(previous)
    }

    // ------------------------------------------------------------------
    // Deal lifecycle
    // ------------------------------------------------------------------

    /// Open a deal funded by `depositor`. Requires the depositor to have
    /// approved the custody account for at least the investment.
    ///
    /// # Errors
    /// - `Paused`
    /// - `InvalidAmount` below `min_investment`
    /// - `UnknownToken`, `TransferFailed`
    pub fn fund_deal(&mut self, depositor: Address, request: FundDeal) -> Result<DealKey> {
        self.gate.ensure_running()?;
        if request.investment < self.config.min_investment {
            return Err(EscrowError::InvalidAmount {
                amount: request.investment,
                minimum: self.config.min_investment,
            });
        }
        let event = self
            .registry
            .fund(&mut self.ledger, &mut self.bank, depositor, request)?;
        let key = DealKey {
            owner: depositor,
            deal_id: DealId(self.registry.deal_count(depositor)),
        };
        self.log.append(event)?;
        Ok(key)
    }

    /// PENDING → CONFIRMED with a fixed payout obligation.
    pub fn confirm_deal(
        &mut self,
        caller: Address,
        key: &DealKey,
        payout: Amount,
        aux_param: u64,
    ) -> Result<()> {
        self.access.require(Role::Dealer, caller)?;
        self.gate.ensure_running()?;
        let event = self.registry.confirm(key, payout, aux_param)?;
        self.log.append(event)?;
        Ok(())
    }

    /// Owner asks to close one of their own CONFIRMED deals.
    pub fn request_close(&mut self, caller: Address, deal_id: DealId, aux_param: u64) -> Result<()> {
        self.gate.ensure_running()?;
        let key = DealKey {
            owner: caller,
            deal_id,
        };
        let event = self.registry.request_close(&key, aux_param)?;
        self.log.append(event)?;
        Ok(())
    }

    pub fn reject_close(&mut self, caller: Address, key: &DealKey, reason: &str) -> Result<()> {
        self.access.require(Role::Dealer, caller)?;
        self.gate.ensure_running()?;
        let event = self.registry.reject_close(key, reason)?;
        self.log.append(event)?;
        Ok(())
    }

    /// CLOSE_REQUESTED → CLOSED, paying `payout` to the owner.
    pub fn close_deal(&mut self, caller: Address, key: &DealKey, payout: Amount) -> Result<()> {
        self.access.require(Role::Dealer, caller)?;
        self.gate.ensure_running()?;
        let event = self
            .registry
            .close(&mut self.ledger, &mut self.bank, key, payout)?;
        self.log.append(event)?;
        Ok(())
    }

    /// PENDING | CONFIRMED → REJECTED. The investment follows the configured
    /// [`RejectRefundPolicy`](escrowbook_types::RejectRefundPolicy).
    pub fn reject_deal(&mut self, caller: Address, key: &DealKey, reason: &str) -> Result<()> {
        self.access.require(Role::Dealer, caller)?;
        self.gate.ensure_running()?;
        let event = self.registry.reject(
            &mut self.ledger,
            &mut self.bank,
            key,
            reason,
            self.config.reject_refund,
        )?;
        self.log.append(event)?;
        Ok(())
    }

    /// Settle a batch of confirmed deals. Entries that cannot settle are
    /// skipped and listed in the report.
    pub fn settle_deals(
        &mut self,
        caller: Address,
        winners: &[DealKey],
        losers: &[DealKey],
    ) -> Result<SettlementReport> {
        self.access.require(Role::Dealer, caller)?;
        self.gate.ensure_running()?;
        let report = self.settlement.settle(
            &mut self.registry,
            &mut self.ledger,
            &mut self.bank,
            winners,
            losers,
        )?;
        self.log.extend(report.events.iter().cloned())?;
        Ok(report)
    }

    // ------------------------------------------------------------------
    // Settlement reserve (Treasury)
    // ------------------------------------------------------------------

    /// Pull `amount` from the caller into the reserve. The caller must have
    /// approved the custody account.
    pub fn deposit_settlement(&mut self, caller: Address, symbol: &str, amount: Amount) -> Result<()> {
        self.access.require(Role::Treasury, caller)?;
        self.gate.ensure_running()?;
        self.ledger
            .deposit_settlement(&mut self.bank, caller, symbol, amount)?;
        self.log.append(EscrowEvent::SettlementDeposited {
            from: caller,
            token: symbol.to_string(),
            amount,
        })?;
        Ok(())
    }

    /// Pay `amount` from the reserve to `to`.
    pub fn withdraw_settlement(
        &mut self,
        caller: Address,
        to: Address,
        symbol: &str,
        amount: Amount,
    ) -> Result<()> {
        self.access.require(Role::Treasury, caller)?;
        self.gate.ensure_running()?;
        self.ledger
            .withdraw_settlement(&mut self.bank, to, symbol, amount)?;
        self.log.append(EscrowEvent::SettlementWithdrawn {
            to,
            token: symbol.to_string(),
            amount,
        })?;
        Ok(())
    }

    /// One row per registered token, in registration order, with the live
    /// custody balance.
    pub fn get_balances(&self) -> Result<Vec<TokenBalance>> {
        self.ledger.balances(&self.bank)
    }

    // ------------------------------------------------------------------
    // Administration (Admin)
    // ------------------------------------------------------------------

    pub fn recalc_settlement_balances(&mut self, caller: Address) -> Result<ReconciliationReport> {
        self.access.require(Role::Admin, caller)?;
        let report = self
            .reconciler
            .recalc(&self.gate, &mut self.ledger, &self.bank)?;
        self.log.extend(report.tokens.iter().map(|row| {
            EscrowEvent::SettlementRecalculated {
                token: row.token.clone(),
                previous: row.previous,
                settlement: row.settlement,
            }
        }))?;
        Ok(report)
    }

    pub fn pause(&mut self, caller: Address) -> Result<()> {
        self.access.require(Role::Admin, caller)?;
        self.gate.pause()?;
        tracing::warn!(account = %caller, "Escrow holder paused");
        self.log.append(EscrowEvent::Paused { account: caller })?;
        Ok(())
    }

    pub fn unpause(&mut self, caller: Address) -> Result<()> {
        self.access.require(Role::Admin, caller)?;
        self.gate.unpause()?;
        tracing::info!(account = %caller, "Escrow holder unpaused");
        self.log.append(EscrowEvent::Unpaused { account: caller })?;
        Ok(())
    }

    /// Check exposure conservation, solvency and the event chain.
    pub fn audit(&self) -> Result<AuditReport> {
        audit::check_exposure(&self.ledger, &self.registry)?;
        let balances = audit::check_solvency(&self.ledger, &self.bank)?;
        self.log.verify_chain()?;
        Ok(AuditReport {
            balances,
            events_verified: self.log.len(),
        })
    }

    // ------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------

    #[must_use]
    pub fn deal(&self, key: &DealKey) -> Option<&Deal> {
        self.registry.get(key)
    }

    #[must_use]
    pub fn deals_of(&self, owner: Address) -> Vec<&Deal> {
        self.registry.deals_of(owner)
    }

    #[must_use]
    pub fn deal_count(&self, owner: Address) -> u64 {
        self.registry.deal_count(owner)
    }

    #[must_use]
    pub fn events(&self) -> &[EventRecord] {
        self.log.records()
    }

    #[must_use]
    pub fn event_log(&self) -> &EventLog {
        &self.log
    }

    #[must_use]
    pub fn is_paused(&self) -> bool {
        self.gate.is_paused()
    }

    #[must_use]
    pub fn has_role(&self, role: Role, account: Address) -> bool {
        self.access.has_role(role, account)
    }

    #[must_use]
    pub fn custody(&self) -> Address {
        self.ledger.custody()
    }

    #[must_use]
    pub fn config(&self) -> &HolderConfig {
        &self.config
    }

    #[must_use]
    pub fn ledger(&self) -> &TokenLedger {
        &self.ledger
    }

    #[must_use]
    pub fn bank(&self) -> &B {
        &self.bank
    }

    /// Direct access to the asset bank, for funding and approvals outside
    /// the holder.
    pub fn bank_mut(&mut self) -> &mut B {
        &mut self.bank
    }
}
