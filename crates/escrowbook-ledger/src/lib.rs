//! # escrowbook-ledger
//!
//! **Token ledger**: registered payout tokens, per-token settlement
//! reserve and open exposure, and the gates that guard mutations.
//!
//! ## Components
//!
//! 1. **AssetBank**: the fungible-asset transfer collaborator (trait + in-memory impl)
//! 2. **TokenLedger**: token registry and reserve/exposure counters
//! 3. **PauseGate**: process-wide halt switch
//! 4. **AccessControl**: per-role capability checks
//!
//! ## Balance Model
//!
//! ```text
//! real balance (live, from AssetBank)  >=  settlement reserve + open exposure
//! ```
//!
//! The inequality is a target, not a guarantee: rebinding a token contract
//! or untracked transfers make it drift until reconciliation.

pub mod access;
pub mod asset_bank;
pub mod pause_gate;
pub mod token_ledger;

pub use access::AccessControl;
pub use asset_bank::{AssetBank, InMemoryAssetBank};
pub use pause_gate::PauseGate;
pub use token_ledger::TokenLedger;
