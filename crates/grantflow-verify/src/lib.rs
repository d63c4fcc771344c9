//! # grantflow-verify
//!
//! **Security Envelope**: voucher verification and replay guarding.
//!
//! ## Architecture
//!
//! Redemption passes through this crate before any state mutation:
//! 1. [`VoucherVerifier`] checks structure, signature, and selector, with no
//!    side effects
//! 2. [`ReplayGuard`] enforces at-most-once consumption per signature and
//!    at-most-once creation per record identifier
//!
//! The guard is insert-only by construction: there is no removal or eviction
//! API, so the at-most-once invariant is structural rather than conventional.

pub mod replay_guard;
pub mod verifier;

pub use replay_guard::ReplayGuard;
pub use verifier::VoucherVerifier;
