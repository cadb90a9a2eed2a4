//! Events emitted by the escrow holder.
//!
//! Field order inside each variant mirrors the external event argument
//! order, which downstream consumers depend on.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{Address, Amount, DealId, Role, Symbol};

/// Every externally observable state change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum EscrowEvent {
    NewDeal {
        depositor: Address,
        deal_id: DealId,
        label: String,
        investment: Amount,
        terms: u64,
        created_at: u64,
        aux_param: u64,
        token: Symbol,
    },
    ConfirmedDeal {
        owner: Address,
        deal_id: DealId,
        payout: Amount,
    },
    CloseRequested {
        owner: Address,
        deal_id: DealId,
        aux_param: u64,
    },
    CloseRejected {
        owner: Address,
        deal_id: DealId,
        reason: String,
    },
    ClosedDeal {
        owner: Address,
        deal_id: DealId,
        payout: Amount,
    },
    RejectedDeal {
        owner: Address,
        deal_id: DealId,
        reason: String,
    },
    SettledDeal {
        owner: Address,
        deal_id: DealId,
        payout: Amount,
        won: bool,
    },
    TokenRegistered {
        symbol: Symbol,
        contract: Address,
    },
    TokenReregistered {
        symbol: Symbol,
        previous: Address,
        contract: Address,
    },
    SettlementDeposited {
        from: Address,
        token: Symbol,
        amount: Amount,
    },
    SettlementWithdrawn {
        to: Address,
        token: Symbol,
        amount: Amount,
    },
    SettlementRecalculated {
        token: Symbol,
        previous: Amount,
        settlement: Amount,
    },
    Paused {
        account: Address,
    },
    Unpaused {
        account: Address,
    },
    RoleGranted {
        role: Role,
        account: Address,
        sender: Address,
    },
    RoleRevoked {
        role: Role,
        account: Address,
        sender: Address,
    },
}

impl EscrowEvent {
    /// Event name as seen by external consumers.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::NewDeal { .. } => "NewDeal",
            Self::ConfirmedDeal { .. } => "ConfirmedDeal",
            Self::CloseRequested { .. } => "CloseRequested",
            Self::CloseRejected { .. } => "CloseRejected",
            Self::ClosedDeal { .. } => "ClosedDeal",
            Self::RejectedDeal { .. } => "RejectedDeal",
            Self::SettledDeal { .. } => "SettledDeal",
            Self::TokenRegistered { .. } => "TokenRegistered",
            Self::TokenReregistered { .. } => "TokenReregistered",
            Self::SettlementDeposited { .. } => "SettlementDeposited",
            Self::SettlementWithdrawn { .. } => "SettlementWithdrawn",
            Self::SettlementRecalculated { .. } => "SettlementRecalculated",
            Self::Paused { .. } => "Paused",
            Self::Unpaused { .. } => "Unpaused",
            Self::RoleGranted { .. } => "RoleGranted",
            Self::RoleRevoked { .. } => "RoleRevoked",
        }
    }
}

impl std::fmt::Display for EscrowEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// An event as stored in the append-only log.
///
/// `digest` chains every record to its predecessor so the history can be
/// re-verified after export.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventRecord {
    /// Position in the log, starting at 1.
    pub sequence: u64,
    pub recorded_at: DateTime<Utc>,
    pub event: EscrowEvent,
    /// SHA-256 over the previous digest and the JSON-encoded event.
    pub digest: [u8; 32],
}
