//! Commitment-tree hashing and membership proofs.
//!
//! Interior nodes combine with a **sorted-pair** rule:
//! `SHA256(0x01 || min(a, b) || max(a, b))`. Sorting the pair makes the
//! combination order-independent, so proof generation and verification agree
//! without tracking left/right sides. The `0x01` prefix domain-separates
//! interior nodes from leaves (`0x00`, see `grantflow_types::claim`).

use sha2::{Digest, Sha256};

use grantflow_types::{constants, leaf_hash, AccountId, RecordId};

/// Combine two child hashes into their parent. Order-independent.
#[must_use]
pub fn combine(a: &[u8; 32], b: &[u8; 32]) -> [u8; 32] {
    let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
    let mut hasher = Sha256::new();
    hasher.update([constants::NODE_HASH_PREFIX]);
    hasher.update(lo);
    hasher.update(hi);
    let hash = hasher.finalize();
    let mut out = [0u8; 32];
    out.copy_from_slice(&hash);
    out
}

/// Verify that `proof` resolves `leaf` to `root`.
///
/// Returns `false` for over-deep proofs rather than erroring; a malformed
/// proof is simply not a membership proof.
#[must_use]
pub fn verify_proof(leaf: [u8; 32], proof: &[[u8; 32]], root: [u8; 32]) -> bool {
    if proof.len() > constants::MAX_PROOF_DEPTH {
        return false;
    }
    let mut cursor = leaf;
    for sibling in proof {
        cursor = combine(&cursor, sibling);
    }
    cursor == root
}

/// Builds a commitment tree over stakeholder entitlements and produces
/// membership proofs. This is the off-system half of the claim protocol:
/// the grantor builds the tree, embeds the root in a voucher, and hands
/// each stakeholder their proof.
///
/// Odd nodes at any level are promoted unchanged to the next level.
#[derive(Debug, Clone, Default)]
pub struct CommitmentTreeBuilder {
    leaves: Vec<[u8; 32]>,
}

impl CommitmentTreeBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an entitlement leaf for `(record, stakeholder, amount)`.
    /// Returns the leaf index, used later for [`Self::proof_for`].
    pub fn add_entitlement(
        &mut self,
        record_id: RecordId,
        stakeholder: AccountId,
        amount: u128,
    ) -> usize {
        self.leaves.push(leaf_hash(record_id, stakeholder, amount));
        self.leaves.len() - 1
    }

    /// Number of leaves added so far.
    #[must_use]
    pub fn len(&self) -> usize {
        self.leaves.len()
    }

    /// Whether the tree has no leaves.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.leaves.is_empty()
    }

    /// The root over all current leaves. `None` for an empty tree.
    #[must_use]
    pub fn root(&self) -> Option<[u8; 32]> {
        if self.leaves.is_empty() {
            return None;
        }
        let mut level = self.leaves.clone();
        while level.len() > 1 {
            level = next_level(&level);
        }
        Some(level[0])
    }

    /// Sibling path for the leaf at `index`. `None` if out of range.
    #[must_use]
    pub fn proof_for(&self, index: usize) -> Option<Vec<[u8; 32]>> {
        if index >= self.leaves.len() {
            return None;
        }
        let mut path = Vec::new();
        let mut level = self.leaves.clone();
        let mut pos = index;
        while level.len() > 1 {
            let sibling = pos ^ 1;
            if sibling < level.len() {
                path.push(level[sibling]);
            }
            level = next_level(&level);
            pos /= 2;
        }
        Some(path)
    }
}

/// Pair adjacent nodes; a trailing odd node is promoted unchanged.
fn next_level(level: &[[u8; 32]]) -> Vec<[u8; 32]> {
    let mut next = Vec::with_capacity(level.len().div_ceil(2));
    for pair in level.chunks(2) {
        match pair {
            [left, right] => next.push(combine(left, right)),
            [odd] => next.push(*odd),
            _ => unreachable!("chunks(2) yields 1 or 2 elements"),
        }
    }
    next
}
