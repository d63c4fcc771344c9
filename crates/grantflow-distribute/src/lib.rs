//! # grantflow-distribute
//!
//! **Finality Plane**: payment distribution under the two Grantflow models,
//! plus the value-transfer seam they settle through.
//!
//! ## Architecture
//!
//! - [`FixedSharesLedger`]: a small, statically configured stakeholder list;
//!   every deposit is owed proportionally, and each stakeholder pulls their
//!   own entitlement with [`FixedSharesLedger::release`]
//! - [`CommitmentTreeDistributor`]: an unbounded stakeholder set per record,
//!   committed to by a single Merkle root; each stakeholder proves their own
//!   entitlement with a membership proof per claim
//! - [`SettlementBank`]: the only path value leaves the system by; both
//!   distributors follow validate → mutate → transfer so a re-entrant
//!   observer of the bank always sees post-mutation state
//!
//! All payouts are pull-based. Nothing in this crate pushes funds to
//! stakeholders as a side effect of deposits.

pub mod bank;
pub mod commitment_tree;
pub mod fixed_shares;
pub mod proof;

pub use bank::{LedgerBank, SettlementBank};
pub use commitment_tree::CommitmentTreeDistributor;
pub use fixed_shares::FixedSharesLedger;
pub use proof::{combine, verify_proof, CommitmentTreeBuilder};
