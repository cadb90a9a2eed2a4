//! Error types for the EscrowBook ledger.
//!
//! The `Display` text of each variant is the externally visible failure
//! reason and is kept exact (status errors and pause errors are matched
//! verbatim by callers). Stable `EB_ERR_` codes are available through
//! [`EscrowError::code`] for log grepping. Codes are grouped by subsystem:
//! - 1xx: Deal errors
//! - 2xx: Ledger / funds errors
//! - 3xx: Token registry errors
//! - 4xx: Gate errors (pause, roles)
//! - 5xx: Settlement errors
//! - 6xx: Audit errors
//! - 9xx: General / internal errors

use thiserror::Error;

use crate::{Address, Amount, DealId, Role, Symbol};

/// Central error enum for all EscrowBook operations.
#[derive(Debug, Error)]
pub enum EscrowError {
    // =================================================================
    // Deal Errors (1xx)
    // =================================================================
    /// The deal is not in a status that permits the requested transition.
    #[error("{owner}:{deal_id} incorrect status: {code} Expected {expected}")]
    Status {
        owner: Address,
        deal_id: DealId,
        code: u8,
        expected: String,
    },

    /// The investment is below the configured minimum.
    #[error("invalid amount: {amount} below minimum {minimum}")]
    InvalidAmount { amount: Amount, minimum: Amount },

    // =================================================================
    // Ledger Errors (2xx)
    // =================================================================
    /// Settlement reserve (or a transfer source) cannot cover the amount.
    #[error("insufficient funds")]
    InsufficientFunds,

    /// A ledger counter would go negative.
    #[error("ledger underflow on {token}: {counter}")]
    LedgerUnderflow { token: Symbol, counter: &'static str },

    /// A ledger counter would exceed the amount range.
    #[error("ledger overflow on {token}: {counter}")]
    LedgerOverflow { token: Symbol, counter: &'static str },

    /// The backing asset rejected a transfer.
    #[error("transfer failed: {reason}")]
    TransferFailed { reason: String },

    /// The asset bank has no contract at this address.
    #[error("unknown asset contract: {0}")]
    UnknownAssetContract(Address),

    // =================================================================
    // Token Registry Errors (3xx)
    // =================================================================
    /// The contract already backs another symbol.
    #[error("token contract {contract} already registered as {existing}")]
    DuplicateTokenContract { contract: Address, existing: Symbol },

    /// The symbol is already registered.
    #[error("token already registered: {0}")]
    TokenAlreadyRegistered(Symbol),

    /// The symbol is not registered.
    #[error("unknown token: {0}")]
    UnknownToken(Symbol),

    // =================================================================
    // Gate Errors (4xx)
    // =================================================================
    /// The holder is paused.
    #[error("Pausable: paused")]
    Paused,

    /// Unpause requested while running.
    #[error("Pausable: not paused")]
    NotPaused,

    /// The caller lacks the role required by the entry point.
    #[error("account {account} is missing role {role}")]
    Unauthorized { account: Address, role: Role },

    // =================================================================
    // Settlement Errors (5xx)
    // =================================================================
    /// More batch entries than `max_batch_size`.
    #[error("settlement batch too large: {size} entries, limit {limit}")]
    BatchTooLarge { size: usize, limit: usize },

    // =================================================================
    // Audit Errors (6xx)
    // =================================================================
    /// Live balance no longer covers reserve plus exposure.
    #[error("solvency violation: {reason}")]
    SolvencyViolation { reason: String },

    /// Open exposure differs from the sum of open deal investments.
    #[error("exposure mismatch on {token}: ledger {ledger}, deals {deals}")]
    ExposureMismatch {
        token: Symbol,
        ledger: Amount,
        deals: Amount,
    },

    /// The event log hash chain does not verify.
    #[error("event log corrupted at sequence {sequence}")]
    EventLogCorrupted { sequence: u64 },

    // =================================================================
    // General / Internal (9xx)
    // =================================================================
    /// Malformed address text.
    #[error("invalid address: {0}")]
    InvalidAddress(String),

    /// Configuration error (invalid config file, missing fields, etc.).
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Serialization / deserialization error.
    #[error("serialization error: {0}")]
    Serialization(String),
}

impl EscrowError {
    /// Stable `EB_ERR_` code for this error kind.
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::Status { .. } => "EB_ERR_100",
            Self::InvalidAmount { .. } => "EB_ERR_101",
            Self::InsufficientFunds => "EB_ERR_200",
            Self::LedgerUnderflow { .. } => "EB_ERR_201",
            Self::LedgerOverflow { .. } => "EB_ERR_202",
            Self::TransferFailed { .. } => "EB_ERR_203",
            Self::UnknownAssetContract(_) => "EB_ERR_204",
            Self::DuplicateTokenContract { .. } => "EB_ERR_300",
            Self::TokenAlreadyRegistered(_) => "EB_ERR_301",
            Self::UnknownToken(_) => "EB_ERR_302",
            Self::Paused => "EB_ERR_400",
            Self::NotPaused => "EB_ERR_401",
            Self::Unauthorized { .. } => "EB_ERR_402",
            Self::BatchTooLarge { .. } => "EB_ERR_500",
            Self::SolvencyViolation { .. } => "EB_ERR_600",
            Self::ExposureMismatch { .. } => "EB_ERR_601",
            Self::EventLogCorrupted { .. } => "EB_ERR_602",
            Self::InvalidAddress(_) => "EB_ERR_900",
            Self::Configuration(_) => "EB_ERR_901",
            Self::Serialization(_) => "EB_ERR_902",
        }
    }
}

/// Crate-wide `Result` alias.
pub type Result<T> = std::result::Result<T, EscrowError>;

impl From<serde_json::Error> for EscrowError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}
