//! # Deal — the escrowed obligation
//!
//! A deal is funded by a depositor, confirmed by a dealer with a payout
//! obligation, and finally resolved by a close, a batch settlement, or a
//! rejection. Resolved deals stay in the registry as audit records.
//!
//! ## State Machine
//!
//! ```text
//!   ┌─────────┐ confirm ┌───────────┐ request-close ┌─────────────────┐ close ┌────────┐
//!   │ PENDING ├────────▶│ CONFIRMED ├──────────────▶│ CLOSE_REQUESTED ├──────▶│ CLOSED │
//!   └────┬────┘         └─┬───┬─────┘◀──────────────┴─────────────────┘       └────────┘
//!        │ reject         │   │ settle        reject-close
//!        │                │   ▼
//!        │        reject  │ ┌─────────┐
//!        ▼                ▼ │ SETTLED │
//!   ┌──────────┐◀─────────┘ └─────────┘
//!   │ REJECTED │
//!   └──────────┘
//! ```
//!
//! CLOSED, SETTLED and REJECTED are terminal.

use serde::{Deserialize, Serialize};

use crate::{Address, Amount, DealId, DealKey, EscrowError, Result, Symbol};

/// Lifecycle status of a deal. The numeric codes are part of the external
/// error text and must not be reordered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DealStatus {
    /// No deal exists under this key.
    Absent,
    /// Funded, awaiting dealer confirmation.
    Pending,
    /// Payout obligation fixed; eligible for settlement or close.
    Confirmed,
    /// Owner asked to close; awaiting dealer decision.
    CloseRequested,
    /// Resolved by batch settlement (won or lost).
    Settled,
    /// Resolved by an individual close.
    Closed,
    /// Rejected by the dealer before resolution.
    Rejected,
}

impl DealStatus {
    /// Numeric status code embedded in status errors.
    #[must_use]
    pub fn code(self) -> u8 {
        match self {
            Self::Absent => 0,
            Self::Pending => 1,
            Self::Confirmed => 2,
            Self::CloseRequested => 3,
            Self::Settled => 4,
            Self::Closed => 5,
            Self::Rejected => 6,
        }
    }

    /// Terminal statuses accept no further transitions.
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Settled | Self::Closed | Self::Rejected)
    }

    /// Can a deal in this status move to `target`?
    #[must_use]
    pub fn can_transition_to(self, target: Self) -> bool {
        matches!(
            (self, target),
            (Self::Absent, Self::Pending)
                | (Self::Pending, Self::Confirmed | Self::Rejected)
                | (
                    Self::Confirmed,
                    Self::CloseRequested | Self::Rejected | Self::Settled
                )
                | (Self::CloseRequested, Self::Closed | Self::Confirmed)
        )
    }

    /// Guard shared by every mutating deal operation.
    ///
    /// # Errors
    /// Returns [`EscrowError::Status`] carrying the owner, deal id, current
    /// code, and the expected status names joined with `" or "`.
    pub fn require(self, key: &DealKey, expected: &[DealStatus]) -> Result<()> {
        if expected.contains(&self) {
            Ok(())
        } else {
            Err(self.mismatch(key, expected))
        }
    }

    /// Build the status error for a deal found in `self` instead of one of
    /// `expected`.
    #[must_use]
    pub fn mismatch(self, key: &DealKey, expected: &[DealStatus]) -> EscrowError {
        EscrowError::Status {
            owner: key.owner,
            deal_id: key.deal_id,
            code: self.code(),
            expected: expected
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join(" or "),
        }
    }
}

impl std::fmt::Display for DealStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Absent => write!(f, "NONE"),
            Self::Pending => write!(f, "PENDING"),
            Self::Confirmed => write!(f, "CONFIRMED"),
            Self::CloseRequested => write!(f, "CLOSE_REQUESTED"),
            Self::Settled => write!(f, "SETTLED"),
            Self::Closed => write!(f, "CLOSED"),
            Self::Rejected => write!(f, "REJECTED"),
        }
    }
}

/// Depositor-supplied parameters for funding a new deal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FundDeal {
    pub label: String,
    /// Opaque numeric terms, stored as given.
    pub terms: u64,
    /// Opaque auxiliary parameter, stored as given.
    pub aux_param: u64,
    /// Caller-supplied creation timestamp.
    pub created_at: u64,
    pub token: Symbol,
    pub investment: Amount,
}

/// A deal record. Never deleted; terminal deals remain as audit records.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Deal {
    pub owner: Address,
    pub deal_id: DealId,
    pub label: String,
    pub terms: u64,
    pub aux_param: u64,
    pub created_at: u64,
    pub token: Symbol,
    pub investment: Amount,
    /// Payout obligation fixed at confirmation.
    pub payout: Amount,
    pub status: DealStatus,
    /// Aux parameter passed with the confirmation.
    pub confirm_aux: Option<u64>,
    /// Aux parameter passed with the latest close request.
    pub close_aux: Option<u64>,
    /// Amount actually paid to the owner on resolution.
    pub paid: Amount,
    /// Reason attached to the latest rejection (of the deal or of a close).
    pub note: Option<String>,
}

impl Deal {
    /// Build a fresh PENDING deal from a funding request.
    #[must_use]
    pub fn pending(key: DealKey, request: FundDeal) -> Self {
        Self {
            owner: key.owner,
            deal_id: key.deal_id,
            label: request.label,
            terms: request.terms,
            aux_param: request.aux_param,
            created_at: request.created_at,
            token: request.token,
            investment: request.investment,
            payout: 0,
            status: DealStatus::Pending,
            confirm_aux: None,
            close_aux: None,
            paid: 0,
            note: None,
        }
    }

    #[must_use]
    pub fn key(&self) -> DealKey {
        DealKey {
            owner: self.owner,
            deal_id: self.deal_id,
        }
    }

    /// Whether this deal still counts toward its token's open exposure.
    #[must_use]
    pub fn is_open(&self) -> bool {
        !self.status.is_terminal()
    }
}

/// Fixtures for unit tests. **Never use in production.**
#[cfg(any(test, feature = "test-helpers"))]
impl FundDeal {
    pub fn dummy(token: &str, investment: Amount) -> Self {
        Self {
            label: "foo".to_string(),
            terms: 1,
            aux_param: 0,
            created_at: 1_700_000_000_000,
            token: token.to_string(),
            investment,
        }
    }
}

#[cfg(any(test, feature = "test-helpers"))]
impl Deal {
    pub fn dummy(owner: Address, deal_id: u64, token: &str, investment: Amount) -> Self {
        Self::pending(
            DealKey::new(owner, deal_id),
            FundDeal::dummy(token, investment),
        )
    }
}
