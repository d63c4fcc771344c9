//! Identifiers used throughout Grantflow.
//!
//! Record identifiers are caller-chosen integers (the grantor picks them when
//! signing a voucher); account identifiers are raw ed25519 public keys;
//! event identifiers use UUIDv7 for time-ordered lexicographic sorting.

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ---------------------------------------------------------------------------
// RecordId
// ---------------------------------------------------------------------------

/// Unique identifier for a granted record. Chosen by the grantor when the
/// voucher is signed; the replay guard enforces that each id is created
/// at most once regardless of how many vouchers reference it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
pub struct RecordId(pub u128);

impl RecordId {
    #[must_use]
    pub fn from_bytes(bytes: [u8; 16]) -> Self {
        Self(u128::from_be_bytes(bytes))
    }

    #[must_use]
    pub fn to_bytes(self) -> [u8; 16] {
        self.0.to_be_bytes()
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "record:{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// AccountId
// ---------------------------------------------------------------------------

/// Identity of a holder, stakeholder, or administrative authority.
/// This is a raw ed25519 public key (32 bytes).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
pub struct AccountId(pub [u8; 32]);

impl AccountId {
    #[must_use]
    pub fn from_pubkey(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    #[must_use]
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    #[must_use]
    pub fn short(&self) -> String {
        hex::encode(&self.0[..4])
    }
}

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "acct:{}", hex::encode(&self.0[..8]))
    }
}

// ---------------------------------------------------------------------------
// EventId
// ---------------------------------------------------------------------------

/// Unique identifier for an emitted settlement event. Uses UUIDv7 so the
/// audit trail sorts chronologically.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
pub struct EventId(pub Uuid);

impl EventId {
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }
}

impl Default for EventId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for EventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "evt:{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_id_byte_roundtrip() {
        let id = RecordId(0x00ff_1234_5678_9abc_def0_1111_2222_3333);
        assert_eq!(RecordId::from_bytes(id.to_bytes()), id);
    }

    #[test]
    fn record_id_display() {
        assert_eq!(format!("{}", RecordId(42)), "record:42");
    }

    #[test]
    fn account_id_display_uses_hex_prefix() {
        let acct = AccountId([0xab; 32]);
        assert_eq!(format!("{acct}"), "acct:abababababababab");
        assert_eq!(acct.short(), "abababab");
    }

    #[test]
    fn event_id_uniqueness() {
        let a = EventId::new();
        let b = EventId::new();
        assert_ne!(a, b);
    }

    #[test]
    fn event_id_ordering() {
        let a = EventId::new();
        let b = EventId::new();
        assert!(a < b);
    }

    #[test]
    fn serde_roundtrips() {
        let rid = RecordId(7);
        let json = serde_json::to_string(&rid).unwrap();
        let back: RecordId = serde_json::from_str(&json).unwrap();
        assert_eq!(rid, back);

        let acct = AccountId([3u8; 32]);
        let json = serde_json::to_string(&acct).unwrap();
        let back: AccountId = serde_json::from_str(&json).unwrap();
        assert_eq!(acct, back);
    }
}
