//! Settlement events for the Grantflow audit trail.
//!
//! Every externally significant mutation (grant redeemed, root set, claim
//! settled, distributor deposit) produces a timestamped [`EventRecord`] that
//! downstream indexers can consume. Components keep their records in an
//! append-only [`EventLog`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{AccountId, EventId, RecordId};

/// The settlement event payloads emitted by the engine and distributors.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SettlementEvent {
    /// A voucher was redeemed and its record created.
    GrantRedeemed {
        holder: AccountId,
        record_id: RecordId,
        content_locator: String,
        price: u128,
    },
    /// A commitment root was set or rotated for a record.
    DistributionRootSet {
        record_id: RecordId,
        root: [u8; 32],
        pool_amount: u128,
    },
    /// A commitment-tree claim was settled and paid.
    ClaimSettled {
        record_id: RecordId,
        stakeholder: AccountId,
        amount: u128,
    },
    /// The fixed-shares ledger received a deposit.
    DistributorDeposit { amount: u128 },
}

impl std::fmt::Display for SettlementEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::GrantRedeemed { .. } => write!(f, "GRANT_REDEEMED"),
            Self::DistributionRootSet { .. } => write!(f, "DISTRIBUTION_ROOT_SET"),
            Self::ClaimSettled { .. } => write!(f, "CLAIM_SETTLED"),
            Self::DistributorDeposit { .. } => write!(f, "DISTRIBUTOR_DEPOSIT"),
        }
    }
}

/// A settlement event with identity and timestamp.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventRecord {
    /// Time-ordered unique identifier.
    pub id: EventId,
    /// When the event was recorded.
    pub at: DateTime<Utc>,
    /// The event payload.
    pub event: SettlementEvent,
}

impl EventRecord {
    #[must_use]
    pub fn new(event: SettlementEvent) -> Self {
        Self {
            id: EventId::new(),
            at: Utc::now(),
            event,
        }
    }
}

/// Append-only audit trail of settlement events.
#[derive(Debug, Default)]
pub struct EventLog {
    records: Vec<EventRecord>,
}

impl EventLog {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an event and return a reference to its record.
    pub fn emit(&mut self, event: SettlementEvent) -> &EventRecord {
        self.records.push(EventRecord::new(event));
        self.records.last().expect("just pushed")
    }

    /// All records in emission order.
    #[must_use]
    pub fn records(&self) -> &[EventRecord] {
        &self.records
    }

    /// Number of recorded events.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether no events have been recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
