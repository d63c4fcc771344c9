//! Ownership registry: the external record-keeping collaborator.
//!
//! The engine only needs create / transfer / owner-lookup; everything else
//! about record custody lives outside this system. [`InMemoryRegistry`] is
//! the reference implementation used by tests and embedding callers.

use std::collections::HashMap;

use grantflow_types::{AccountId, GrantflowError, RecordId, Result};

/// The record-ownership operations the engine consumes.
pub trait OwnershipRegistry {
    /// Create a record for `holder` with the given content locator.
    ///
    /// # Errors
    /// Returns [`GrantflowError::RecordExists`] if the identifier is taken.
    fn create(&mut self, record_id: RecordId, holder: AccountId, content_locator: &str)
        -> Result<()>;

    /// Transfer a record from its current holder to another.
    ///
    /// # Errors
    /// - [`GrantflowError::RecordNotFound`] if no such record exists
    /// - [`GrantflowError::NotRecordHolder`] if `from` is not the holder
    fn transfer(&mut self, record_id: RecordId, from: AccountId, to: AccountId) -> Result<()>;

    /// Current holder of a record, if it exists.
    fn owner_of(&self, record_id: RecordId) -> Option<AccountId>;

    /// Content locator of a record, if it exists.
    fn locator_of(&self, record_id: RecordId) -> Option<String>;
}

#[derive(Debug, Clone)]
struct RecordEntry {
    holder: AccountId,
    locator: String,
}

/// HashMap-backed registry for tests and single-process embeddings.
#[derive(Debug, Default)]
pub struct InMemoryRegistry {
    records: HashMap<RecordId, RecordEntry>,
}

impl InMemoryRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of records held.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the registry is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl OwnershipRegistry for InMemoryRegistry {
    fn create(
        &mut self,
        record_id: RecordId,
        holder: AccountId,
        content_locator: &str,
    ) -> Result<()> {
        if self.records.contains_key(&record_id) {
            return Err(GrantflowError::RecordExists(record_id));
        }
        self.records.insert(
            record_id,
            RecordEntry {
                holder,
                locator: content_locator.to_string(),
            },
        );
        Ok(())
    }

    fn transfer(&mut self, record_id: RecordId, from: AccountId, to: AccountId) -> Result<()> {
        let entry = self
            .records
            .get_mut(&record_id)
            .ok_or(GrantflowError::RecordNotFound(record_id))?;
        if entry.holder != from {
            return Err(GrantflowError::NotRecordHolder);
        }
        entry.holder = to;
        Ok(())
    }

    fn owner_of(&self, record_id: RecordId) -> Option<AccountId> {
        self.records.get(&record_id).map(|e| e.holder)
    }

    fn locator_of(&self, record_id: RecordId) -> Option<String> {
        self.records.get(&record_id).map(|e| e.locator.clone())
    }
}
