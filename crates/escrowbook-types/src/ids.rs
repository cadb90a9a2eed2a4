//! Identifiers used throughout EscrowBook.
//!
//! Accounts and asset contracts share the [`Address`] type (20 raw bytes,
//! rendered as lowercase `0x` hex). Deals are keyed by `(owner, DealId)`
//! where the id is a per-owner sequence starting at 1.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::EscrowError;

// ---------------------------------------------------------------------------
// Address
// ---------------------------------------------------------------------------

/// A 20-byte account or asset-contract address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Address(pub [u8; 20]);

impl Address {
    /// The all-zero address.
    pub const ZERO: Self = Self([0u8; 20]);

    /// Deterministic address derived from a human-readable seed.
    ///
    /// `SHA-256("escrowbook:address:v1:" || seed)[..20]`. Used for fixtures,
    /// configuration examples, and the default custody account.
    #[must_use]
    pub fn derive(seed: &str) -> Self {
        use sha2::{Digest, Sha256};
        let mut hasher = Sha256::new();
        hasher.update(b"escrowbook:address:v1:");
        hasher.update(seed.as_bytes());
        let hash = hasher.finalize();
        let mut bytes = [0u8; 20];
        bytes.copy_from_slice(&hash[..20]);
        Self(bytes)
    }

    #[must_use]
    pub fn as_bytes(&self) -> &[u8; 20] {
        &self.0
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl FromStr for Address {
    type Err = EscrowError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let digits = s
            .strip_prefix("0x")
            .or_else(|| s.strip_prefix("0X"))
            .unwrap_or(s);
        if digits.len() != 40 {
            return Err(EscrowError::InvalidAddress(s.to_string()));
        }
        let raw = hex::decode(digits).map_err(|_| EscrowError::InvalidAddress(s.to_string()))?;
        let mut bytes = [0u8; 20];
        bytes.copy_from_slice(&raw);
        Ok(Self(bytes))
    }
}

impl TryFrom<String> for Address {
    type Error = EscrowError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Address> for String {
    fn from(value: Address) -> Self {
        value.to_string()
    }
}

// ---------------------------------------------------------------------------
// DealId / DealKey
// ---------------------------------------------------------------------------

/// Per-owner deal sequence number. The first deal of every owner is `1`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DealId(pub u64);

impl DealId {
    pub const FIRST: Self = Self(1);
}

impl fmt::Display for DealId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Full deal reference: the depositor plus their sequence id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
pub struct DealKey {
    pub owner: Address,
    pub deal_id: DealId,
}

impl DealKey {
    #[must_use]
    pub fn new(owner: Address, deal_id: u64) -> Self {
        Self {
            owner,
            deal_id: DealId(deal_id),
        }
    }
}

impl fmt::Display for DealKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.owner, self.deal_id)
    }
}

// ---------------------------------------------------------------------------
// SettlementRunId
// ---------------------------------------------------------------------------

/// Correlation id for one `settle_deals` invocation. UUIDv7, time-ordered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
pub struct SettlementRunId(pub Uuid);

impl SettlementRunId {
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }
}

impl Default for SettlementRunId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SettlementRunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "run:{}", self.0)
    }
}

/// Token symbol (e.g., "WETH", "WBTC").
pub type Symbol = String;

/// Token amount in the backing asset's smallest unit.
pub type Amount = u128;

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
