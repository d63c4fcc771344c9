//! Configuration for a Grantflow redemption engine instance.

use serde::{Deserialize, Serialize};

use crate::{constants, AccountId, RoyaltyDescriptor};

/// Construction-time configuration for the redemption engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Ed25519 public key of the authorized grantor. Only vouchers signed
    /// by this key are redeemable (rotatable via the admin surface).
    pub grantor_pubkey: [u8; 32],
    /// The administrative authority for rotation and emergency operations.
    pub authority: AccountId,
    /// Royalty descriptor backing the fixed-shares ledger, and the default
    /// advertised split for newly issued vouchers.
    pub default_royalty: RoyaltyDescriptor,
    /// Maximum vouchers accepted in one batch redemption.
    pub max_batch_size: usize,
}

impl EngineConfig {
    /// Create a config with the default batch limit.
    #[must_use]
    pub fn new(
        grantor_pubkey: [u8; 32],
        authority: AccountId,
        default_royalty: RoyaltyDescriptor,
    ) -> Self {
        Self {
            grantor_pubkey,
            authority,
            default_royalty,
            max_batch_size: constants::DEFAULT_MAX_BATCH_SIZE,
        }
    }
}
