//! # grantflow-types
//!
//! Shared types, errors, and configuration for the **Grantflow** deferred-grant
//! redemption engine.
//!
//! This crate is the leaf dependency of the workspace; every other crate
//! depends on it. It defines:
//!
//! - **Identifiers**: [`RecordId`], [`AccountId`], [`EventId`]
//! - **Voucher model**: [`Voucher`], [`DistributionSelector`], [`RoyaltyDescriptor`]
//! - **Claim model**: [`Claim`]
//! - **Event model**: [`SettlementEvent`], [`EventRecord`], [`EventLog`]
//! - **Configuration**: [`EngineConfig`]
//! - **Errors**: [`GrantflowError`] with `GF_ERR_` prefix codes
//! - **Constants**: signing domain tags and system-wide limits

pub mod claim;
pub mod config;
pub mod constants;
pub mod error;
pub mod event;
pub mod ids;
pub mod voucher;

// Re-export all primary types at crate root for ergonomic imports:
//   use grantflow_types::{Voucher, Claim, RecordId, ...};

pub use claim::*;
pub use config::*;
pub use error::*;
pub use event::*;
pub use ids::*;
pub use voucher::*;

// Constants are accessed via `grantflow_types::constants::FOO`
// (not re-exported to avoid name collisions).
