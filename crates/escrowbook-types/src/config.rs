//! Configuration for an escrow holder instance.

use serde::{Deserialize, Serialize};

use crate::{Address, Amount, EscrowError, Result, Role, Symbol, constants};

/// Top-level holder configuration, loadable from JSON.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HolderConfig {
    /// Account that holds escrowed funds on the asset contracts.
    #[serde(default = "default_custody")]
    pub custody: Address,
    /// Tokens registered at construction, in order.
    #[serde(default)]
    pub tokens: Vec<TokenSpec>,
    /// Initial role assignments.
    #[serde(default)]
    pub roles: RoleAssignments,
    /// Upper bound on winners + losers per settlement call.
    #[serde(default = "default_max_batch_size")]
    pub max_batch_size: usize,
    /// Smallest investment `fund_deal` accepts.
    #[serde(default = "default_min_investment")]
    pub min_investment: Amount,
    /// What happens to the investment when a deal is rejected.
    #[serde(default)]
    pub reject_refund: RejectRefundPolicy,
}

fn default_custody() -> Address {
    Address::derive(constants::DEFAULT_CUSTODY_SEED)
}

fn default_max_batch_size() -> usize {
    constants::DEFAULT_MAX_BATCH_SIZE
}

fn default_min_investment() -> Amount {
    constants::DEFAULT_MIN_INVESTMENT
}

impl HolderConfig {
    /// Configuration with a single account holding every role.
    #[must_use]
    pub fn single_authority(authority: Address) -> Self {
        Self {
            custody: default_custody(),
            tokens: Vec::new(),
            roles: RoleAssignments {
                admins: vec![authority],
                treasurers: vec![authority],
                dealers: vec![authority],
            },
            max_batch_size: default_max_batch_size(),
            min_investment: default_min_investment(),
            reject_refund: RejectRefundPolicy::default(),
        }
    }

    /// Append a token to register at construction.
    #[must_use]
    pub fn with_token(mut self, symbol: impl Into<Symbol>, contract: Address) -> Self {
        self.tokens.push(TokenSpec {
            symbol: symbol.into(),
            contract,
        });
        self
    }

    /// Parse and validate a JSON configuration.
    pub fn from_json(json: &str) -> Result<Self> {
        let cfg: Self = serde_json::from_str(json)
            .map_err(|e| EscrowError::Configuration(e.to_string()))?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Reject configurations that cannot produce a working holder.
    pub fn validate(&self) -> Result<()> {
        if self.max_batch_size == 0 {
            return Err(EscrowError::Configuration(
                "max_batch_size must be > 0".into(),
            ));
        }
        if self.roles.admins.is_empty() {
            return Err(EscrowError::Configuration(
                "at least one admin is required".into(),
            ));
        }
        for (i, spec) in self.tokens.iter().enumerate() {
            if spec.symbol.is_empty() {
                return Err(EscrowError::Configuration(format!(
                    "token #{i} has an empty symbol"
                )));
            }
        }
        Ok(())
    }
}

/// A token to register at construction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenSpec {
    pub symbol: Symbol,
    pub contract: Address,
}

/// Accounts granted each role at construction.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RoleAssignments {
    #[serde(default)]
    pub admins: Vec<Address>,
    #[serde(default)]
    pub treasurers: Vec<Address>,
    #[serde(default)]
    pub dealers: Vec<Address>,
}

impl RoleAssignments {
    /// Flatten into `(role, account)` grants.
    #[must_use]
    pub fn grants(&self) -> Vec<(Role, Address)> {
        let admins = self.admins.iter().map(|a| (Role::Admin, *a));
        let treasurers = self.treasurers.iter().map(|a| (Role::Treasury, *a));
        let dealers = self.dealers.iter().map(|a| (Role::Dealer, *a));
        admins.chain(treasurers).chain(dealers).collect()
    }
}

/// Handling of the escrowed investment when a deal is rejected.
///
/// `Retain` keeps the investment in custody; it becomes unallocated balance
/// that the next reconciliation folds into the settlement reserve.
/// `RefundDepositor` transfers the investment back to the deal owner.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RejectRefundPolicy {
    #[default]
    Retain,
    RefundDepositor,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_authority_holds_every_role() {
        let auth = Address::derive("owner");
        let cfg = HolderConfig::single_authority(auth).with_token("WETH", Address::derive("weth"));
        let grants = cfg.roles.grants();
        assert_eq!(grants.len(), 3);
        assert!(grants.iter().all(|(_, a)| *a == auth));
        assert_eq!(cfg.tokens[0].symbol, "WETH");
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn from_json_applies_defaults() {
        let admin = Address::derive("admin");
        let weth = Address::derive("weth");
        let json = format!(
            r#"{{
                "tokens": [{{ "symbol": "WETH", "contract": "{weth}" }}],
                "roles": {{ "admins": ["{admin}"] }}
            }}"#
        );
        let cfg = HolderConfig::from_json(&json).unwrap();
        assert_eq!(cfg.max_batch_size, constants::DEFAULT_MAX_BATCH_SIZE);
        assert_eq!(cfg.min_investment, constants::DEFAULT_MIN_INVESTMENT);
        assert_eq!(cfg.reject_refund, RejectRefundPolicy::Retain);
        assert_eq!(cfg.custody, Address::derive(constants::DEFAULT_CUSTODY_SEED));
        assert_eq!(cfg.tokens[0].contract, weth);
        assert_eq!(cfg.roles.admins, vec![admin]);
    }

    #[test]
    fn from_json_reads_refund_policy() {
        let admin = Address::derive("admin");
        let json = format!(
            r#"{{ "roles": {{ "admins": ["{admin}"] }}, "reject_refund": "refund_depositor" }}"#
        );
        let cfg = HolderConfig::from_json(&json).unwrap();
        assert_eq!(cfg.reject_refund, RejectRefundPolicy::RefundDepositor);
    }

    #[test]
    fn from_json_rejects_missing_admin() {
        let err = HolderConfig::from_json("{}").unwrap_err();
        assert!(matches!(err, EscrowError::Configuration(_)));
    }

    #[test]
    fn from_json_rejects_bad_address() {
        let json = r#"{ "roles": { "admins": ["0x12"] } }"#;
        let err = HolderConfig::from_json(json).unwrap_err();
        assert!(matches!(err, EscrowError::Configuration(_)));
    }

    #[test]
    fn zero_batch_size_invalid() {
        let mut cfg = HolderConfig::single_authority(Address::derive("owner"));
        cfg.max_batch_size = 0;
        assert!(cfg.validate().is_err());
    }
}
