//! System-wide constants for the Grantflow engine.

/// Domain tag prefixing every voucher signing payload.
pub const VOUCHER_DOMAIN_TAG: &[u8] = b"grantflow:voucher:v1:";

/// Domain tag mixed into commitment-tree leaf derivation.
pub const LEAF_DOMAIN_TAG: &[u8] = b"grantflow:leaf:v1:";

/// Single-byte prefix for commitment-tree leaf hashes.
pub const LEAF_HASH_PREFIX: u8 = 0x00;

/// Single-byte prefix for commitment-tree interior node hashes.
pub const NODE_HASH_PREFIX: u8 = 0x01;

/// Length of an Ed25519 signature in bytes.
pub const SIGNATURE_LEN: usize = 64;

/// Maximum vouchers accepted in a single batch redemption.
pub const DEFAULT_MAX_BATCH_SIZE: usize = 256;

/// Maximum sibling hashes accepted in a membership proof
/// (a 64-deep tree already exceeds any realistic stakeholder set).
pub const MAX_PROOF_DEPTH: usize = 64;

/// Maximum stakeholders in a fixed-shares royalty descriptor.
pub const MAX_ROYALTY_PAYEES: usize = 32;

/// Version string.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Engine name.
pub const ENGINE_NAME: &str = "Grantflow";
