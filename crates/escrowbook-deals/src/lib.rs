//! # escrowbook-deals
//!
//! **Deal registry**: per-owner deal sequences and the deal lifecycle.
//!
//! ## Lifecycle
//!
//! ```text
//! fund ─▶ PENDING ─confirm─▶ CONFIRMED ─request_close─▶ CLOSE_REQUESTED ─close─▶ CLOSED
//!            │                  │  ▲                          │
//!            │                  │  └──────reject_close────────┘
//!            └──reject──▶ REJECTED ◀──reject──┘
//! ```
//!
//! Batch settlement (CONFIRMED → SETTLED) lives in `escrowbook-settlement`
//! and drives the registry through [`DealRegistry::apply`].

pub mod registry;

pub use registry::{DealRegistry, advance, pay_owner};
