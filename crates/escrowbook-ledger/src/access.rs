//! Role-based capability checks.
//!
//! Each privileged entry point names the single [`Role`] it requires.
//! Holding one role never implies another.

use std::collections::{BTreeSet, HashMap};

use escrowbook_types::{Address, EscrowError, Result, Role};

/// Role membership table.
#[derive(Debug, Default)]
pub struct AccessControl {
    members: HashMap<Role, BTreeSet<Address>>,
}

impl AccessControl {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Grant `role` to `account`. Returns `false` if it was already held.
    pub fn grant(&mut self, role: Role, account: Address) -> bool {
        self.members.entry(role).or_default().insert(account)
    }

    /// Revoke `role` from `account`. Returns `false` if it was not held.
    pub fn revoke(&mut self, role: Role, account: Address) -> bool {
        self.members
            .get_mut(&role)
            .is_some_and(|set| set.remove(&account))
    }

    #[must_use]
    pub fn has_role(&self, role: Role, account: Address) -> bool {
        self.members
            .get(&role)
            .is_some_and(|set| set.contains(&account))
    }

    /// Fail with `Unauthorized` unless `account` holds `role`.
    pub fn require(&self, role: Role, account: Address) -> Result<()> {
        if self.has_role(role, account) {
            Ok(())
        } else {
            tracing::warn!(account = %account, role = %role, "Unauthorized call");
            Err(EscrowError::Unauthorized { account, role })
        }
    }

    /// Members of `role`, sorted.
    #[must_use]
    pub fn members(&self, role: Role) -> Vec<Address> {
        self.members
            .get(&role)
            .map(|set| set.iter().copied().collect())
            .unwrap_or_default()
    }
}
