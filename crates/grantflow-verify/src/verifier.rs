//! Voucher verifier: pure structural and cryptographic validation.
//!
//! The verifier holds the authorized grantor's ed25519 verifying key and
//! checks presented vouchers against it:
//! 1. Rebuild the domain-separated digest from every field in fixed order
//! 2. Check the signature over the digest against the grantor key
//! 3. Check the distribution selector is well-formed
//!
//! No side effects: replay accounting lives in [`crate::ReplayGuard`].

use ed25519_dalek::{Signature, VerifyingKey};
use grantflow_types::{GrantflowError, Result, Voucher};

/// Validates deferred-grant vouchers against the authorized grantor key.
#[derive(Debug)]
pub struct VoucherVerifier {
    /// The grantor key vouchers must verify under.
    grantor: VerifyingKey,
}

impl VoucherVerifier {
    /// Create a verifier for the given grantor public key.
    ///
    /// # Errors
    /// Returns [`GrantflowError::Configuration`] if the bytes are not a
    /// valid ed25519 public key.
    pub fn new(grantor_pubkey: &[u8; 32]) -> Result<Self> {
        let grantor = VerifyingKey::from_bytes(grantor_pubkey)
            .map_err(|e| GrantflowError::Configuration(format!("invalid grantor key: {e}")))?;
        Ok(Self { grantor })
    }

    /// The currently authorized grantor public key.
    #[must_use]
    pub fn grantor_pubkey(&self) -> [u8; 32] {
        self.grantor.to_bytes()
    }

    /// Replace the authorized grantor key. Vouchers signed by the previous
    /// key stop verifying; already-consumed signatures stay consumed in the
    /// replay guard regardless.
    ///
    /// # Errors
    /// Returns [`GrantflowError::Configuration`] on an invalid key.
    pub fn rotate_grantor(&mut self, new_pubkey: &[u8; 32]) -> Result<()> {
        self.grantor = VerifyingKey::from_bytes(new_pubkey)
            .map_err(|e| GrantflowError::Configuration(format!("invalid grantor key: {e}")))?;
        tracing::info!(grantor = %hex_prefix(new_pubkey), "grantor key rotated");
        Ok(())
    }

    /// Verify a voucher. Pure check, no side effects.
    ///
    /// # Errors
    /// - [`GrantflowError::MalformedSignature`] if the signature is not 64 bytes
    /// - [`GrantflowError::SignerMismatch`] if the signature does not verify
    ///   under the authorized grantor key
    /// - [`GrantflowError::MalformedSelector`] if the selector is ill-formed
    pub fn verify(&self, voucher: &Voucher) -> Result<()> {
        let sig = Signature::from_bytes(&voucher.signature_bytes()?);
        self.grantor
            .verify_strict(&voucher.digest(), &sig)
            .map_err(|_| GrantflowError::SignerMismatch)?;
        voucher.selector.validate()?;
        Ok(())
    }
}

fn hex_prefix(bytes: &[u8; 32]) -> String {
    bytes[..4].iter().map(|b| format!("{b:02x}")).collect()
}
