//! Privilege groups for the escrow holder's entry points.

use serde::{Deserialize, Serialize};

/// Capability required by a group of privileged entry points.
///
/// - `Admin`: token registration, pause/unpause, reconciliation, role grants
/// - `Treasury`: settlement deposits and withdrawals
/// - `Dealer`: confirm, reject, close and batch-settle deals
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Admin,
    Treasury,
    Dealer,
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Admin => write!(f, "ADMIN"),
            Self::Treasury => write!(f, "TREASURY"),
            Self::Dealer => write!(f, "DEALER"),
        }
    }
}
