//! Deal registry — per-owner deal sequences and status transitions.
//!
//! Deals live in an arena keyed by `(owner, DealId)` next to a per-owner
//! counter of the last issued id, so ids for an owner always form the
//! contiguous range `1..=N`.
//!
//! Operations that move funds follow checks → effects → interactions: the
//! status guard runs first, then the deal and the token ledger are updated,
//! and only then is the asset bank called. If the bank call fails, both the
//! deal and the token entry are restored from snapshots.

use std::collections::HashMap;

use escrowbook_ledger::{AssetBank, TokenLedger};
use escrowbook_types::{
    Address, Amount, Deal, DealId, DealKey, DealStatus, EscrowEvent, FundDeal, RejectRefundPolicy,
    Result,
};

/// Arena of deal records plus per-owner id counters.
#[derive(Debug, Default)]
pub struct DealRegistry {
    /// Last issued id per owner.
    counters: HashMap<Address, u64>,
    /// All deals, including terminal ones.
    deals: HashMap<DealKey, Deal>,
}

impl DealRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    // ------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------

    /// Id the next deal funded by `owner` will receive.
    #[must_use]
    pub fn next_id(&self, owner: Address) -> DealId {
        DealId(self.deal_count(owner) + 1)
    }

    /// Number of deals ever funded by `owner`.
    #[must_use]
    pub fn deal_count(&self, owner: Address) -> u64 {
        self.counters.get(&owner).copied().unwrap_or(0)
    }

    #[must_use]
    pub fn get(&self, key: &DealKey) -> Option<&Deal> {
        self.deals.get(key)
    }

    /// Current status, `Absent` if no deal exists under `key`.
    #[must_use]
    pub fn status(&self, key: &DealKey) -> DealStatus {
        self.deals.get(key).map_or(DealStatus::Absent, |d| d.status)
    }

    /// All deals of `owner`, ordered by id.
    #[must_use]
    pub fn deals_of(&self, owner: Address) -> Vec<&Deal> {
        (1..=self.deal_count(owner))
            .filter_map(|id| self.deals.get(&DealKey::new(owner, id)))
            .collect()
    }

    /// Sum of investments over non-terminal deals of `symbol`.
    #[must_use]
    pub fn open_investment(&self, symbol: &str) -> Amount {
        self.deals
            .values()
            .filter(|d| d.token == symbol && d.is_open())
            .map(|d| d.investment)
            .sum()
    }

    /// Total number of deals across all owners.
    #[must_use]
    pub fn len(&self) -> usize {
        self.deals.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.deals.is_empty()
    }

    // ------------------------------------------------------------------
    // Lifecycle
    // ------------------------------------------------------------------

    /// Pull the investment from `depositor` and open a PENDING deal.
    ///
    /// # Errors
    /// - `UnknownToken` if the token is not registered
    /// - `TransferFailed` if the pull fails (no id is consumed)
    pub fn fund<B: AssetBank + ?Sized>(
        &mut self,
        ledger: &mut TokenLedger,
        bank: &mut B,
        depositor: Address,
        request: FundDeal,
    ) -> Result<EscrowEvent> {
        let token_before = ledger.snapshot(&request.token)?;
        let key = DealKey {
            owner: depositor,
            deal_id: self.next_id(depositor),
        };
        let investment = request.investment;
        let custody = ledger.custody();

        ledger.add_open(&request.token, investment)?;
        let deal = Deal::pending(key, request);
        let event = EscrowEvent::NewDeal {
            depositor,
            deal_id: key.deal_id,
            label: deal.label.clone(),
            investment,
            terms: deal.terms,
            created_at: deal.created_at,
            aux_param: deal.aux_param,
            token: deal.token.clone(),
        };
        self.counters.insert(depositor, key.deal_id.0);
        self.deals.insert(key, deal);

        if let Err(err) =
            bank.transfer_from(token_before.contract, custody, depositor, custody, investment)
        {
            tracing::warn!(owner = %depositor, deal_id = key.deal_id.0, error = %err, "Deal funding rejected");
            self.deals.remove(&key);
            if key.deal_id == DealId::FIRST {
                self.counters.remove(&depositor);
            } else {
                self.counters.insert(depositor, key.deal_id.0 - 1);
            }
            ledger.restore(token_before);
            return Err(err);
        }

        tracing::info!(owner = %depositor, deal_id = key.deal_id.0, investment, "Deal funded");
        Ok(event)
    }

    /// PENDING → CONFIRMED with a fixed payout.
    pub fn confirm(&mut self, key: &DealKey, payout: Amount, aux_param: u64) -> Result<EscrowEvent> {
        let deal = self.guarded(key, &[DealStatus::Pending])?;
        advance(deal, DealStatus::Confirmed);
        deal.payout = payout;
        deal.confirm_aux = Some(aux_param);
        tracing::info!(owner = %key.owner, deal_id = key.deal_id.0, payout, "Deal confirmed");
        Ok(EscrowEvent::ConfirmedDeal {
            owner: key.owner,
            deal_id: key.deal_id,
            payout,
        })
    }

    /// CONFIRMED → CLOSE_REQUESTED. `key.owner` must be the caller.
    pub fn request_close(&mut self, key: &DealKey, aux_param: u64) -> Result<EscrowEvent> {
        let deal = self.guarded(key, &[DealStatus::Confirmed])?;
        advance(deal, DealStatus::CloseRequested);
        deal.close_aux = Some(aux_param);
        tracing::info!(owner = %key.owner, deal_id = key.deal_id.0, "Close requested");
        Ok(EscrowEvent::CloseRequested {
            owner: key.owner,
            deal_id: key.deal_id,
            aux_param,
        })
    }

    /// CLOSE_REQUESTED → CONFIRMED. The deal can be closed again later.
    pub fn reject_close(&mut self, key: &DealKey, reason: &str) -> Result<EscrowEvent> {
        let deal = self.guarded(key, &[DealStatus::CloseRequested])?;
        advance(deal, DealStatus::Confirmed);
        deal.note = Some(reason.to_string());
        tracing::info!(owner = %key.owner, deal_id = key.deal_id.0, reason, "Close rejected");
        Ok(EscrowEvent::CloseRejected {
            owner: key.owner,
            deal_id: key.deal_id,
            reason: reason.to_string(),
        })
    }

    /// CLOSE_REQUESTED → CLOSED, paying `payout` to the owner.
    ///
    /// The investment is absorbed into the reserve and the payout is paid
    /// from it: `settlement += investment - payout`, `open -= investment`.
    ///
    /// # Errors
    /// `InsufficientFunds` if reserve plus investment cannot cover `payout`.
    pub fn close<B: AssetBank + ?Sized>(
        &mut self,
        ledger: &mut TokenLedger,
        bank: &mut B,
        key: &DealKey,
        payout: Amount,
    ) -> Result<EscrowEvent> {
        self.apply(key, &[DealStatus::CloseRequested], ledger, |deal, ledger| {
            ledger.release_open(&deal.token, deal.investment)?;
            ledger.credit_settlement(&deal.token, deal.investment)?;
            ledger.debit_settlement(&deal.token, payout)?;
            advance(deal, DealStatus::Closed);
            deal.paid = payout;
            pay_owner(ledger, bank, deal, payout)
        })?;
        tracing::info!(owner = %key.owner, deal_id = key.deal_id.0, payout, "Deal closed");
        Ok(EscrowEvent::ClosedDeal {
            owner: key.owner,
            deal_id: key.deal_id,
            payout,
        })
    }

    /// PENDING | CONFIRMED → REJECTED, releasing the open exposure.
    ///
    /// With [`RejectRefundPolicy::RefundDepositor`] the investment is sent
    /// back to the owner; with `Retain` it stays in custody as unallocated
    /// balance.
    pub fn reject<B: AssetBank + ?Sized>(
        &mut self,
        ledger: &mut TokenLedger,
        bank: &mut B,
        key: &DealKey,
        reason: &str,
        policy: RejectRefundPolicy,
    ) -> Result<EscrowEvent> {
        let expected = [DealStatus::Pending, DealStatus::Confirmed];
        self.apply(key, &expected, ledger, |deal, ledger| {
            ledger.release_open(&deal.token, deal.investment)?;
            advance(deal, DealStatus::Rejected);
            deal.note = Some(reason.to_string());
            if policy == RejectRefundPolicy::RefundDepositor {
                deal.paid = deal.investment;
                pay_owner(ledger, bank, deal, deal.investment)?;
            }
            Ok(())
        })?;
        tracing::info!(owner = %key.owner, deal_id = key.deal_id.0, reason, ?policy, "Deal rejected");
        Ok(EscrowEvent::RejectedDeal {
            owner: key.owner,
            deal_id: key.deal_id,
            reason: reason.to_string(),
        })
    }

    /// Run `op` against a deal in one of the `expected` statuses and its
    /// token entry. If `op` fails, both are restored to their prior state.
    pub fn apply<T>(
        &mut self,
        key: &DealKey,
        expected: &[DealStatus],
        ledger: &mut TokenLedger,
        op: impl FnOnce(&mut Deal, &mut TokenLedger) -> Result<T>,
    ) -> Result<T> {
        let deal = self.guarded(key, expected)?;
        let deal_before = deal.clone();
        let token_before = ledger.snapshot(&deal.token)?;
        let result = op(deal, ledger);
        if result.is_err() {
            *deal = deal_before;
            ledger.restore(token_before);
        }
        result
    }

    fn guarded(&mut self, key: &DealKey, expected: &[DealStatus]) -> Result<&mut Deal> {
        match self.deals.get_mut(key) {
            Some(deal) => {
                deal.status.require(key, expected)?;
                Ok(deal)
            }
            None => Err(DealStatus::Absent.mismatch(key, expected)),
        }
    }
}

/// Move a deal to `target`. Callers have already checked the source status.
pub fn advance(deal: &mut Deal, target: DealStatus) {
    debug_assert!(
        deal.status.can_transition_to(target),
        "illegal transition {} -> {target}",
        deal.status
    );
    deal.status = target;
}

/// Transfer `amount` of the deal's token from custody to its owner.
pub fn pay_owner<B: AssetBank + ?Sized>(
    ledger: &TokenLedger,
    bank: &mut B,
    deal: &Deal,
    amount: Amount,
) -> Result<()> {
    if amount == 0 {
        return Ok(());
    }
    let contract = ledger.entry(&deal.token)?.contract;
    bank.transfer(contract, ledger.custody(), deal.owner, amount)
        .inspect_err(|err| {
            tracing::warn!(
                owner = %deal.owner,
                deal_id = deal.deal_id.0,
                amount,
                error = %err,
                "Payout transfer rejected"
            );
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use escrowbook_ledger::InMemoryAssetBank;
    use escrowbook_types::{EscrowError, TokenEntry};

    struct Fixture {
        registry: DealRegistry,
        ledger: TokenLedger,
        bank: InMemoryAssetBank,
        weth: Address,
        alice: Address,
        treasury: Address,
    }

    impl Fixture {
        fn new() -> Self {
            let custody = Address::derive("custody");
            let weth = Address::derive("weth");
            let alice = Address::derive("alice");
            let treasury = Address::derive("treasury");
            let mut bank = InMemoryAssetBank::new();
            bank.deploy(weth, treasury, 1_000_000).unwrap();
            let mut ledger = TokenLedger::new(custody);
            ledger.register("WETH", weth).unwrap();
            Self {
                registry: DealRegistry::new(),
                ledger,
                bank,
                weth,
                alice,
                treasury,
            }
        }

        fn give(&mut self, who: Address, amount: Amount) {
            self.bank.transfer(self.weth, self.treasury, who, amount).unwrap();
            let custody = self.ledger.custody();
            let allowed = self.bank.allowance(self.weth, who, custody);
            self.bank
                .approve(self.weth, who, custody, allowed + amount)
                .unwrap();
        }

        fn fund(&mut self, investment: Amount) -> DealKey {
            self.give(self.alice, investment);
            let ev = self
                .registry
                .fund(
                    &mut self.ledger,
                    &mut self.bank,
                    self.alice,
                    FundDeal::dummy("WETH", investment),
                )
                .unwrap();
            match ev {
                EscrowEvent::NewDeal { depositor, deal_id, .. } => DealKey {
                    owner: depositor,
                    deal_id,
                },
                other => panic!("unexpected event {other:?}"),
            }
        }

        fn reserve(&mut self, amount: Amount) {
            let custody = self.ledger.custody();
            self.bank.approve(self.weth, self.treasury, custody, amount).unwrap();
            self.ledger
                .deposit_settlement(&mut self.bank, self.treasury, "WETH", amount)
                .unwrap();
        }

        fn entry(&self) -> TokenEntry {
            self.ledger.entry("WETH").unwrap().clone()
        }
    }

    #[test]
    fn fund_allocates_sequential_ids() {
        let mut f = Fixture::new();
        assert_eq!(f.fund(100).deal_id, DealId(1));
        assert_eq!(f.fund(100).deal_id, DealId(2));
        assert_eq!(f.fund(100).deal_id, DealId(3));
        assert_eq!(f.registry.deal_count(f.alice), 3);
        let ids: Vec<u64> = f.registry.deals_of(f.alice).iter().map(|d| d.deal_id.0).collect();
        assert_eq!(ids, [1, 2, 3]);
    }

    #[test]
    fn ids_are_per_owner() {
        let mut f = Fixture::new();
        f.fund(100);
        let bob = Address::derive("bob");
        f.give(bob, 50);
        let ev = f
            .registry
            .fund(&mut f.ledger, &mut f.bank, bob, FundDeal::dummy("WETH", 50))
            .unwrap();
        assert!(matches!(ev, EscrowEvent::NewDeal { deal_id: DealId(1), .. }));
    }

    #[test]
    fn fund_pulls_investment_and_opens_exposure() {
        let mut f = Fixture::new();
        let key = f.fund(1_000);
        assert_eq!(f.entry().open, 1_000);
        assert_eq!(f.ledger.live_balance(&f.bank, "WETH").unwrap(), 1_000);
        let deal = f.registry.get(&key).unwrap();
        assert_eq!(deal.status, DealStatus::Pending);
        assert_eq!(deal.investment, 1_000);
        assert_eq!(deal.label, "foo");
    }

    #[test]
    fn fund_new_deal_event_fields() {
        let mut f = Fixture::new();
        f.give(f.alice, 1_000);
        let request = FundDeal {
            label: "bar".into(),
            terms: 7,
            aux_param: 3,
            created_at: 42,
            token: "WETH".into(),
            investment: 1_000,
        };
        let ev = f
            .registry
            .fund(&mut f.ledger, &mut f.bank, f.alice, request)
            .unwrap();
        assert_eq!(
            ev,
            EscrowEvent::NewDeal {
                depositor: f.alice,
                deal_id: DealId(1),
                label: "bar".into(),
                investment: 1_000,
                terms: 7,
                created_at: 42,
                aux_param: 3,
                token: "WETH".into(),
            }
        );
    }

    #[test]
    fn fund_unknown_token_fails() {
        let mut f = Fixture::new();
        let err = f
            .registry
            .fund(&mut f.ledger, &mut f.bank, f.alice, FundDeal::dummy("DOGE", 10))
            .unwrap_err();
        assert!(matches!(err, EscrowError::UnknownToken(_)));
        assert!(f.registry.is_empty());
    }

    #[test]
    fn failed_funding_consumes_nothing() {
        let mut f = Fixture::new();
        f.fund(100);
        // No balance or allowance for the second deal.
        let err = f
            .registry
            .fund(&mut f.ledger, &mut f.bank, f.alice, FundDeal::dummy("WETH", 500))
            .unwrap_err();
        assert!(matches!(err, EscrowError::TransferFailed { .. }));
        assert_eq!(f.registry.deal_count(f.alice), 1);
        assert_eq!(f.registry.len(), 1);
        assert_eq!(f.entry().open, 100);
        // The next successful funding reuses id 2.
        assert_eq!(f.fund(100).deal_id, DealId(2));
    }

    #[test]
    fn confirm_twice_fails_with_exact_text() {
        let mut f = Fixture::new();
        let key = f.fund(1_000);
        f.registry.confirm(&key, 100, 0).unwrap();
        let err = f.registry.confirm(&key, 20_000, 0).unwrap_err();
        assert_eq!(
            err.to_string(),
            format!("{}:1 incorrect status: 2 Expected PENDING", f.alice)
        );
        assert_eq!(f.registry.get(&key).unwrap().payout, 100);
    }

    #[test]
    fn confirm_missing_deal_reports_none() {
        let mut f = Fixture::new();
        let key = DealKey::new(f.alice, 9);
        let err = f.registry.confirm(&key, 1, 0).unwrap_err();
        assert_eq!(
            err.to_string(),
            format!("{}:9 incorrect status: 0 Expected PENDING", f.alice)
        );
    }

    #[test]
    fn close_accounting() {
        let mut f = Fixture::new();
        f.reserve(5_000);
        let key = f.fund(1_000);
        f.registry.confirm(&key, 50, 0).unwrap();
        f.registry.request_close(&key, 1).unwrap();
        let before = f.bank.balance_of(f.weth, f.alice).unwrap();
        let ev = f
            .registry
            .close(&mut f.ledger, &mut f.bank, &key, 50)
            .unwrap();
        assert!(matches!(ev, EscrowEvent::ClosedDeal { payout: 50, .. }));
        assert_eq!(f.entry().settlement, 5_950);
        assert_eq!(f.entry().open, 0);
        assert_eq!(f.bank.balance_of(f.weth, f.alice).unwrap(), before + 50);
        let deal = f.registry.get(&key).unwrap();
        assert_eq!(deal.status, DealStatus::Closed);
        assert_eq!(deal.paid, 50);
    }

    #[test]
    fn close_requires_close_request() {
        let mut f = Fixture::new();
        let key = f.fund(1_000);
        f.registry.confirm(&key, 50, 0).unwrap();
        let err = f
            .registry
            .close(&mut f.ledger, &mut f.bank, &key, 50)
            .unwrap_err();
        assert!(err.to_string().ends_with("incorrect status: 2 Expected CLOSE_REQUESTED"));
    }

    #[test]
    fn close_beyond_funds_rolls_back() {
        let mut f = Fixture::new();
        let key = f.fund(999);
        f.registry.confirm(&key, 1_999, 0).unwrap();
        f.registry.request_close(&key, 1).unwrap();
        let err = f
            .registry
            .close(&mut f.ledger, &mut f.bank, &key, 1_999)
            .unwrap_err();
        assert!(matches!(err, EscrowError::InsufficientFunds));
        assert_eq!(f.entry().open, 999);
        assert_eq!(f.entry().settlement, 0);
        assert_eq!(f.registry.status(&key), DealStatus::CloseRequested);
    }

    #[test]
    fn reject_close_reopens() {
        let mut f = Fixture::new();
        let key = f.fund(999);
        f.registry.confirm(&key, 1_999, 0).unwrap();
        f.registry.request_close(&key, 1).unwrap();
        let ev = f.registry.reject_close(&key, "bad reject").unwrap();
        assert_eq!(
            ev,
            EscrowEvent::CloseRejected {
                owner: f.alice,
                deal_id: DealId(1),
                reason: "bad reject".into(),
            }
        );
        assert_eq!(f.registry.status(&key), DealStatus::Confirmed);
        f.registry.request_close(&key, 2).unwrap();
        f.registry
            .close(&mut f.ledger, &mut f.bank, &key, 50)
            .unwrap();
        assert_eq!(f.registry.get(&key).unwrap().close_aux, Some(2));
    }

    #[test]
    fn reject_pending_and_confirmed() {
        let mut f = Fixture::new();
        let first = f.fund(100);
        f.registry
            .reject(&mut f.ledger, &mut f.bank, &first, "reject pending", RejectRefundPolicy::Retain)
            .unwrap();
        let second = f.fund(100);
        f.registry.confirm(&second, 110, 0).unwrap();
        f.registry
            .reject(&mut f.ledger, &mut f.bank, &second, "reject confirmed", RejectRefundPolicy::Retain)
            .unwrap();
        assert_eq!(f.entry().open, 0);
        assert_eq!(f.registry.status(&first), DealStatus::Rejected);
        assert_eq!(f.registry.get(&second).unwrap().note.as_deref(), Some("reject confirmed"));
        // Retained investments stay in custody.
        assert_eq!(f.ledger.live_balance(&f.bank, "WETH").unwrap(), 200);
    }

    #[test]
    fn reject_terminal_fails() {
        let mut f = Fixture::new();
        let key = f.fund(100);
        f.registry
            .reject(&mut f.ledger, &mut f.bank, &key, "once", RejectRefundPolicy::Retain)
            .unwrap();
        let err = f
            .registry
            .reject(&mut f.ledger, &mut f.bank, &key, "twice", RejectRefundPolicy::Retain)
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            format!("{}:1 incorrect status: 6 Expected PENDING or CONFIRMED", f.alice)
        );
    }

    #[test]
    fn reject_with_refund_returns_investment() {
        let mut f = Fixture::new();
        let key = f.fund(300);
        let before = f.bank.balance_of(f.weth, f.alice).unwrap();
        f.registry
            .reject(&mut f.ledger, &mut f.bank, &key, "refund", RejectRefundPolicy::RefundDepositor)
            .unwrap();
        assert_eq!(f.bank.balance_of(f.weth, f.alice).unwrap(), before + 300);
        assert_eq!(f.ledger.live_balance(&f.bank, "WETH").unwrap(), 0);
        assert_eq!(f.registry.get(&key).unwrap().paid, 300);
    }

    #[test]
    fn open_investment_tracks_non_terminal() {
        let mut f = Fixture::new();
        let a = f.fund(100);
        f.fund(250);
        f.registry
            .reject(&mut f.ledger, &mut f.bank, &a, "x", RejectRefundPolicy::Retain)
            .unwrap();
        assert_eq!(f.registry.open_investment("WETH"), 250);
        assert_eq!(f.registry.open_investment("WETH"), f.entry().open);
    }
}
