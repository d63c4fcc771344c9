//! Replay guard: insert-only at-most-once tracking.
//!
//! Two consumed sets: accepted voucher signatures and created record
//! identifiers. Entries are created on redemption and never removed; there
//! is deliberately no removal or eviction API, so the at-most-once
//! settlement invariant is visible in the type rather than in call
//! discipline.

use std::collections::HashSet;

use grantflow_types::{constants, GrantflowError, RecordId, Result};

/// Signature bytes as consumed-set key.
pub type SignatureBytes = [u8; constants::SIGNATURE_LEN];

/// Prevents re-use of a voucher signature and re-creation of a record id.
#[derive(Debug, Default)]
pub struct ReplayGuard {
    /// Signatures accepted by a successful redemption.
    used_signatures: HashSet<SignatureBytes>,
    /// Record identifiers created by a successful redemption.
    created_records: HashSet<RecordId>,
}

impl ReplayGuard {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether this signature was already consumed.
    #[must_use]
    pub fn already_used(&self, signature: &SignatureBytes) -> bool {
        self.used_signatures.contains(signature)
    }

    /// Whether this record identifier was already created.
    #[must_use]
    pub fn already_created(&self, record_id: RecordId) -> bool {
        self.created_records.contains(&record_id)
    }

    /// Consume a signature permanently.
    ///
    /// # Errors
    /// Returns [`GrantflowError::SignatureAlreadyUsed`] on a repeat.
    pub fn mark_used(&mut self, signature: SignatureBytes) -> Result<()> {
        if !self.used_signatures.insert(signature) {
            return Err(GrantflowError::SignatureAlreadyUsed);
        }
        Ok(())
    }

    /// Record a created identifier permanently.
    ///
    /// # Errors
    /// Returns [`GrantflowError::RecordAlreadyCreated`] on a repeat.
    pub fn mark_created(&mut self, record_id: RecordId) -> Result<()> {
        if !self.created_records.insert(record_id) {
            return Err(GrantflowError::RecordAlreadyCreated(record_id));
        }
        Ok(())
    }

    /// Number of consumed signatures.
    #[must_use]
    pub fn signatures_consumed(&self) -> usize {
        self.used_signatures.len()
    }

    /// Number of created record identifiers.
    #[must_use]
    pub fn records_created(&self) -> usize {
        self.created_records.len()
    }
}
