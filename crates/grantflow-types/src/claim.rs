//! Claim model for commitment-tree distribution.
//!
//! A claim names a record, a stakeholder, an amount, and a membership proof.
//! The leaf is derived deterministically from the first three fields, so the
//! proof commits the stakeholder to exactly one entitlement per record.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::{constants, AccountId, RecordId};

/// A stakeholder's claim against a record's commitment-tree pool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claim {
    /// The record whose pool is being claimed against.
    pub record_id: RecordId,
    /// The claiming stakeholder (also the payout recipient).
    pub stakeholder: AccountId,
    /// Amount claimed. Must be positive and covered by the pool.
    pub amount: u128,
    /// Sibling hashes from the leaf up to the root.
    pub proof: Vec<[u8; 32]>,
}

impl Claim {
    /// Recompute the commitment-tree leaf for this claim.
    ///
    /// Format: `SHA256(0x00 || "grantflow:leaf:v1:" || record_id ||
    /// stakeholder || amount)`. The `0x00` prefix domain-separates leaves
    /// from interior nodes, so a proof can never pass an interior hash off
    /// as a leaf.
    #[must_use]
    pub fn leaf(&self) -> [u8; 32] {
        leaf_hash(self.record_id, self.stakeholder, self.amount)
    }
}

/// Leaf derivation shared by claim verification and off-system tree building.
#[must_use]
pub fn leaf_hash(record_id: RecordId, stakeholder: AccountId, amount: u128) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update([constants::LEAF_HASH_PREFIX]);
    hasher.update(constants::LEAF_DOMAIN_TAG);
    hasher.update(record_id.to_bytes());
    hasher.update(stakeholder.as_bytes());
    hasher.update(amount.to_le_bytes());
    let hash = hasher.finalize();
    let mut out = [0u8; 32];
    out.copy_from_slice(&hash);
    out
}
