//! Error types for the Grantflow redemption engine.
//!
//! All errors use the `GF_ERR_` prefix convention for easy grepping in logs.
//! Error codes are grouped by subsystem:
//! - 1xx: Voucher verification errors
//! - 2xx: Replay errors
//! - 3xx: Payment errors
//! - 4xx: Claim errors
//! - 5xx: Release errors
//! - 6xx: Ownership registry errors
//! - 7xx: Value transfer errors
//! - 8xx: Authority errors
//! - 9xx: General / internal errors

use thiserror::Error;

use crate::{AccountId, RecordId};

/// Central error enum for all Grantflow operations.
#[derive(Debug, Error)]
pub enum GrantflowError {
    // =================================================================
    // Voucher Verification Errors (1xx)
    // =================================================================
    /// The voucher signature is structurally invalid (wrong length,
    /// not a valid ed25519 signature encoding).
    #[error("GF_ERR_100: Malformed voucher signature")]
    MalformedSignature,

    /// The signature does not verify under the authorized grantor key.
    #[error("GF_ERR_101: Voucher not signed by the authorized grantor")]
    SignerMismatch,

    /// The distribution selector is structurally invalid.
    #[error("GF_ERR_102: Malformed distribution selector: {reason}")]
    MalformedSelector { reason: String },

    // =================================================================
    // Replay Errors (2xx)
    // =================================================================
    /// This voucher signature was already consumed by a prior redemption.
    #[error("GF_ERR_200: Voucher signature already used")]
    SignatureAlreadyUsed,

    /// A record with this identifier was already created.
    #[error("GF_ERR_201: Record already created: {0}")]
    RecordAlreadyCreated(RecordId),

    // =================================================================
    // Payment Errors (3xx)
    // =================================================================
    /// The attached payment does not cover the voucher price.
    #[error("GF_ERR_300: Insufficient payment: need {needed}, attached {attached}")]
    InsufficientPayment { needed: u128, attached: u128 },

    /// The aggregate batch payment does not cover the sum of prices.
    #[error("GF_ERR_301: Insufficient batch payment: need {needed}, attached {attached}")]
    InsufficientBatchPayment { needed: u128, attached: u128 },

    /// An element of a batch failed validation; the whole batch was rejected.
    #[error("GF_ERR_302: Batch element {index} rejected: {source}")]
    BatchElementFailed {
        index: usize,
        #[source]
        source: Box<GrantflowError>,
    },

    /// The batch exceeds the configured size limit.
    #[error("GF_ERR_303: Batch of {len} exceeds maximum {max}")]
    BatchTooLarge { len: usize, max: usize },

    // =================================================================
    // Claim Errors (4xx)
    // =================================================================
    /// This stakeholder already claimed against this record.
    #[error("GF_ERR_400: Already claimed: {stakeholder} on {record_id}")]
    AlreadyClaimed {
        record_id: RecordId,
        stakeholder: AccountId,
    },

    /// The membership proof does not resolve to the record's current root.
    #[error("GF_ERR_401: Invalid membership proof")]
    InvalidProof,

    /// The record pool does not hold enough to cover the claim.
    #[error("GF_ERR_402: Pool underfunded: need {needed}, available {available}")]
    PoolUnderfunded { needed: u128, available: u128 },

    /// No commitment-tree record exists under this identifier.
    #[error("GF_ERR_403: Unknown commitment-tree record: {0}")]
    UnknownRecord(RecordId),

    /// Claims for zero units are rejected outright.
    #[error("GF_ERR_404: Claim amount must be positive")]
    ZeroClaimAmount,

    // =================================================================
    // Release Errors (5xx)
    // =================================================================
    /// The stakeholder's releasable entitlement is currently zero.
    #[error("GF_ERR_500: Nothing to release for {0}")]
    NothingToRelease(AccountId),

    /// The account is not listed in the fixed-shares ledger.
    #[error("GF_ERR_501: Unknown stakeholder: {0}")]
    UnknownStakeholder(AccountId),

    /// The shares configuration is invalid (empty, zero share, duplicate).
    #[error("GF_ERR_502: Invalid shares: {reason}")]
    InvalidShares { reason: String },

    // =================================================================
    // Ownership Registry Errors (6xx)
    // =================================================================
    /// The registry already holds a record under this identifier.
    #[error("GF_ERR_600: Record exists in registry: {0}")]
    RecordExists(RecordId),

    /// No record exists under this identifier.
    #[error("GF_ERR_601: Record not found in registry: {0}")]
    RecordNotFound(RecordId),

    /// The caller is not the current holder of the record.
    #[error("GF_ERR_602: Caller is not the record holder")]
    NotRecordHolder,

    // =================================================================
    // Value Transfer Errors (7xx)
    // =================================================================
    /// The underlying value transfer to a recipient failed; the enclosing
    /// operation was rolled back.
    #[error("GF_ERR_700: Value transfer failed: {reason}")]
    TransferFailed { reason: String },

    // =================================================================
    // Authority Errors (8xx)
    // =================================================================
    /// The presented authority token does not match the configured authority.
    #[error("GF_ERR_800: Unauthorized administrative operation")]
    Unauthorized,

    // =================================================================
    // General / Internal (9xx)
    // =================================================================
    /// Unrecoverable internal error.
    #[error("GF_ERR_900: Internal error: {0}")]
    Internal(String),

    /// Configuration error (invalid grantor key, bad descriptor, etc.).
    #[error("GF_ERR_901: Configuration error: {0}")]
    Configuration(String),
}

/// Crate-wide `Result` alias.
pub type Result<T> = std::result::Result<T, GrantflowError>;
