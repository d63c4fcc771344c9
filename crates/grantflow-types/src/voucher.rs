//! # Voucher: the deferred-grant authorization primitive
//!
//! A `Voucher` is an **off-system signed authorization** to create one
//! specific record upon presentation and sufficient payment. The grantor
//! signs it away from shared state; a redeemer later presents it to the
//! redemption engine together with payment.
//!
//! ## Security Properties
//!
//! - **Signature-bound**: signed by the authorized grantor's ed25519 key
//!   over a canonical, domain-separated payload covering every field
//! - **Single-use**: the replay guard consumes the signature permanently
//!   on first acceptance
//! - **Id-bound**: the record identifier is covered by the signature, so a
//!   voucher cannot be redirected to a different record
//! - **Distribution-bound**: the selector (royalty descriptor or commitment
//!   root) is covered by the signature and cannot be swapped at redemption

use ed25519_dalek::{Signer, SigningKey};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::{constants, AccountId, GrantflowError, RecordId, Result};

// ---------------------------------------------------------------------------
// RoyaltyDescriptor
// ---------------------------------------------------------------------------

/// One stakeholder's share in a fixed-shares royalty split.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoyaltyShare {
    /// The stakeholder entitled to this share.
    pub account: AccountId,
    /// Proportional weight. Entitlement is `received * share / total_shares`.
    pub share: u64,
}

/// A static list of proportional royalty shares.
///
/// The ordered payee list is fixed once embedded in a voucher or used to
/// construct a ledger; there is no add/remove surface.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoyaltyDescriptor {
    pub payees: Vec<RoyaltyShare>,
}

impl RoyaltyDescriptor {
    #[must_use]
    pub fn new(payees: Vec<RoyaltyShare>) -> Self {
        Self { payees }
    }

    /// Sum of all shares. Widened to `u128` so no payee list can overflow.
    #[must_use]
    pub fn total_shares(&self) -> u128 {
        self.payees.iter().map(|p| u128::from(p.share)).sum()
    }

    /// Structural validation: non-empty, bounded, positive shares, no
    /// duplicate stakeholders.
    ///
    /// # Errors
    /// Returns [`GrantflowError::InvalidShares`] describing the defect.
    pub fn validate(&self) -> Result<()> {
        if self.payees.is_empty() {
            return Err(GrantflowError::InvalidShares {
                reason: "payee list is empty".to_string(),
            });
        }
        if self.payees.len() > constants::MAX_ROYALTY_PAYEES {
            return Err(GrantflowError::InvalidShares {
                reason: format!(
                    "{} payees exceeds maximum {}",
                    self.payees.len(),
                    constants::MAX_ROYALTY_PAYEES
                ),
            });
        }
        let mut seen = std::collections::HashSet::with_capacity(self.payees.len());
        for payee in &self.payees {
            if payee.share == 0 {
                return Err(GrantflowError::InvalidShares {
                    reason: format!("zero share for {}", payee.account),
                });
            }
            if !seen.insert(payee.account) {
                return Err(GrantflowError::InvalidShares {
                    reason: format!("duplicate stakeholder {}", payee.account),
                });
            }
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// DistributionSelector
// ---------------------------------------------------------------------------

/// Selects how redemption proceeds for a voucher are distributed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum DistributionSelector {
    /// Proceeds go to the engine's fixed-shares ledger. The embedded
    /// descriptor is covered by the signature and validated structurally.
    FixedShares(RoyaltyDescriptor),
    /// Proceeds fund the record's commitment-tree pool; the embedded root
    /// commits to the stakeholder set.
    CommitmentTree([u8; 32]),
}

impl DistributionSelector {
    /// Structural well-formedness: non-zero commitment root, or a valid
    /// royalty descriptor.
    ///
    /// # Errors
    /// Returns [`GrantflowError::MalformedSelector`].
    pub fn validate(&self) -> Result<()> {
        match self {
            Self::CommitmentTree(root) => {
                if root == &[0u8; 32] {
                    return Err(GrantflowError::MalformedSelector {
                        reason: "zero commitment root".to_string(),
                    });
                }
                Ok(())
            }
            Self::FixedShares(descriptor) => {
                descriptor
                    .validate()
                    .map_err(|e| GrantflowError::MalformedSelector {
                        reason: e.to_string(),
                    })
            }
        }
    }

    /// Canonical byte encoding folded into the voucher signing payload.
    #[must_use]
    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(64);
        match self {
            Self::FixedShares(descriptor) => {
                out.push(0x00);
                out.extend_from_slice(&(descriptor.payees.len() as u32).to_le_bytes());
                for payee in &descriptor.payees {
                    out.extend_from_slice(payee.account.as_bytes());
                    out.extend_from_slice(&payee.share.to_le_bytes());
                }
            }
            Self::CommitmentTree(root) => {
                out.push(0x01);
                out.extend_from_slice(root);
            }
        }
        out
    }
}

// ---------------------------------------------------------------------------
// Voucher
// ---------------------------------------------------------------------------

/// A deferred-grant voucher. Immutable once signed; consumed permanently
/// the instant its signature is accepted by the redemption engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Voucher {
    /// The record this voucher authorizes. Caller-chosen, globally unique.
    pub record_id: RecordId,
    /// Opaque locator for the record's content.
    pub content_locator: String,
    /// Minimum payment the redeemer must attach.
    pub price: u128,
    /// The identity the record is created for.
    pub holder: AccountId,
    /// How redemption proceeds are distributed.
    pub selector: DistributionSelector,
    /// Ed25519 signature over the canonical digest (64 bytes).
    pub signature: Vec<u8>,
}

impl Voucher {
    /// Canonical signing payload covering every field in fixed order.
    ///
    /// Format: `"grantflow:voucher:v1:" || record_id || len(locator) ||
    /// locator || price || holder || selector`
    #[must_use]
    pub fn signing_payload(&self) -> Vec<u8> {
        let mut payload = Vec::with_capacity(256);
        payload.extend_from_slice(constants::VOUCHER_DOMAIN_TAG);
        payload.extend_from_slice(&self.record_id.to_bytes());
        payload.extend_from_slice(&(self.content_locator.len() as u64).to_le_bytes());
        payload.extend_from_slice(self.content_locator.as_bytes());
        payload.extend_from_slice(&self.price.to_le_bytes());
        payload.extend_from_slice(self.holder.as_bytes());
        payload.extend_from_slice(&self.selector.encode());
        payload
    }

    /// SHA-256 digest of the signing payload. This is what the grantor
    /// signs and what the verifier checks the signature against.
    #[must_use]
    pub fn digest(&self) -> [u8; 32] {
        let hash = Sha256::digest(self.signing_payload());
        let mut out = [0u8; 32];
        out.copy_from_slice(&hash);
        out
    }

    /// Sign a new voucher with the grantor's key. This is the off-system
    /// half of the protocol: no shared state is touched until redemption.
    #[must_use]
    pub fn sign(
        record_id: RecordId,
        content_locator: impl Into<String>,
        price: u128,
        holder: AccountId,
        selector: DistributionSelector,
        grantor_key: &SigningKey,
    ) -> Self {
        let mut voucher = Self {
            record_id,
            content_locator: content_locator.into(),
            price,
            holder,
            selector,
            signature: Vec::new(),
        };
        let sig = grantor_key.sign(&voucher.digest());
        voucher.signature = sig.to_bytes().to_vec();
        voucher
    }

    /// The signature as a fixed 64-byte array, if well-formed.
    ///
    /// # Errors
    /// Returns [`GrantflowError::MalformedSignature`] on wrong length.
    pub fn signature_bytes(&self) -> Result<[u8; constants::SIGNATURE_LEN]> {
        self.signature
            .as_slice()
            .try_into()
            .map_err(|_| GrantflowError::MalformedSignature)
    }
}
