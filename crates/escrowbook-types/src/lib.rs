//! # escrowbook-types
//!
//! Shared types, errors, and configuration for the **EscrowBook** deal ledger.
//!
//! This crate is the leaf dependency of the workspace — every other crate
//! depends on it. It defines:
//!
//! - **Identifiers**: [`Address`], [`DealId`], [`DealKey`], [`SettlementRunId`]
//! - **Deal model**: [`Deal`], [`DealStatus`], [`FundDeal`]
//! - **Token model**: [`TokenEntry`], [`TokenBalance`]
//! - **Events**: [`EscrowEvent`], [`EventRecord`]
//! - **Roles**: [`Role`]
//! - **Configuration**: [`HolderConfig`], [`TokenSpec`], [`RoleAssignments`], [`RejectRefundPolicy`]
//! - **Errors**: [`EscrowError`] with `EB_ERR_` codes
//! - **Constants**: defaults and limits

pub mod config;
pub mod constants;
pub mod deal;
pub mod error;
pub mod event;
pub mod ids;
pub mod role;
pub mod token;

pub use config::*;
pub use deal::*;
pub use error::*;
pub use event::*;
pub use ids::*;
pub use role::*;
pub use token::*;

// Constants are accessed via `escrowbook_types::constants::FOO`
// (not re-exported to avoid name collisions).
