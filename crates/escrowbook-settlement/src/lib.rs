//! # escrowbook-settlement
//!
//! **Resolution plane**: batch settlement of confirmed deals, settlement
//! reserve reconciliation, invariant audits, the hash-chained event log,
//! and the [`EscrowHolder`] entry surface that ties every component together.
//!
//! ## Architecture
//!
//! ```text
//!                 ┌──────────────────── EscrowHolder ────────────────────┐
//!   caller ──────▶│ AccessControl → PauseGate → component → EventLog     │
//!                 │                                                      │
//!                 │  DealRegistry   TokenLedger   SettlementEngine       │
//!                 │                               ReconciliationEngine   │
//!                 └───────────────────────┬──────────────────────────────┘
//!                                         ▼
//!                                     AssetBank
//! ```
//!
//! ## Settlement
//!
//! Winners are paid from the reserve, losers forfeit their investment to
//! custody. Entries that cannot settle are skipped, never failed; see
//! [`SkipReason`].

pub mod audit;
pub mod batch;
pub mod event_log;
pub mod holder;
pub mod reconcile;

pub use audit::AuditReport;
pub use batch::{SettledDeal, SettlementEngine, SettlementReport, SkipReason, SkippedDeal};
pub use event_log::EventLog;
pub use holder::EscrowHolder;
pub use reconcile::{ReconciliationEngine, ReconciliationReport, TokenReconciliation};
