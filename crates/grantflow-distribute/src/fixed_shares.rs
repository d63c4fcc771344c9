//! Fixed-shares distributor: proportional pull-based payouts.
//!
//! A static `(stakeholder, share)` list is fixed at construction. Every
//! deposit raises the running total; each stakeholder's entitlement is
//! `total_received * share / total_shares` (floor), minus what they already
//! released. Rounding dust stays in the ledger undistributed; the sum of
//! all entitlements may be below `total_received`, never above.

use grantflow_types::{
    AccountId, EventLog, EventRecord, GrantflowError, Result, RoyaltyDescriptor, SettlementEvent,
};

use crate::bank::SettlementBank;

/// Proportional royalty ledger for a small, statically known stakeholder set.
pub struct FixedSharesLedger {
    /// Fixed payee list, in descriptor order.
    payees: Vec<(AccountId, u64)>,
    /// Sum of all shares, widened once at construction.
    total_shares: u128,
    /// Total payment ever deposited.
    total_received: u128,
    /// Amount already released, parallel to `payees`.
    released: Vec<u128>,
    /// Audit trail of deposits and releases.
    events: EventLog,
}

impl FixedSharesLedger {
    /// Build a ledger from a royalty descriptor.
    ///
    /// # Errors
    /// Returns [`GrantflowError::InvalidShares`] for an empty list, a zero
    /// share, or a duplicate stakeholder.
    pub fn new(descriptor: &RoyaltyDescriptor) -> Result<Self> {
        descriptor.validate()?;
        let payees: Vec<(AccountId, u64)> = descriptor
            .payees
            .iter()
            .map(|p| (p.account, p.share))
            .collect();
        let released = vec![0u128; payees.len()];
        Ok(Self {
            total_shares: descriptor.total_shares(),
            payees,
            total_received: 0,
            released,
            events: EventLog::new(),
        })
    }

    /// Record an incoming payment. Called by the redemption engine and by
    /// direct external depositors alike.
    ///
    /// # Errors
    /// Returns [`GrantflowError::Internal`] if the running total would
    /// overflow `u128`.
    pub fn deposit(&mut self, amount: u128) -> Result<()> {
        self.total_received = self
            .total_received
            .checked_add(amount)
            .ok_or_else(|| GrantflowError::Internal("deposit total overflow".to_string()))?;
        tracing::debug!(amount, total = self.total_received, "fixed-shares deposit");
        self.events
            .emit(SettlementEvent::DistributorDeposit { amount });
        Ok(())
    }

    /// The stakeholder's currently releasable entitlement.
    ///
    /// # Errors
    /// Returns [`GrantflowError::UnknownStakeholder`] if not listed.
    pub fn releasable(&self, stakeholder: AccountId) -> Result<u128> {
        let idx = self.index_of(stakeholder)?;
        Ok(self.entitled(idx)? - self.released[idx])
    }

    /// Pay out the stakeholder's full releasable entitlement through the
    /// bank. Ordering: validate → mutate `released` → transfer; a failed
    /// transfer rolls the mutation back and nothing is released.
    ///
    /// # Errors
    /// - [`GrantflowError::UnknownStakeholder`] if not in the payee list
    /// - [`GrantflowError::NothingToRelease`] if the entitlement is zero
    /// - [`GrantflowError::TransferFailed`] if the bank rejected the payout
    pub fn release(&mut self, bank: &mut dyn SettlementBank, stakeholder: AccountId) -> Result<u128> {
        let idx = self.index_of(stakeholder)?;
        let amount = self.entitled(idx)? - self.released[idx];
        if amount == 0 {
            return Err(GrantflowError::NothingToRelease(stakeholder));
        }

        self.released[idx] += amount;
        if let Err(err) = bank.pay(stakeholder, amount) {
            self.released[idx] -= amount;
            return Err(err);
        }

        tracing::info!(%stakeholder, amount, "fixed-shares release");
        Ok(amount)
    }

    /// Total payment ever received.
    #[must_use]
    pub fn total_received(&self) -> u128 {
        self.total_received
    }

    /// Total already released across all stakeholders.
    #[must_use]
    pub fn total_released(&self) -> u128 {
        self.released.iter().sum()
    }

    /// The fixed payee list.
    #[must_use]
    pub fn payees(&self) -> &[(AccountId, u64)] {
        &self.payees
    }

    /// Audit trail of deposits.
    #[must_use]
    pub fn events(&self) -> &[EventRecord] {
        self.events.records()
    }

    fn index_of(&self, stakeholder: AccountId) -> Result<usize> {
        self.payees
            .iter()
            .position(|(account, _)| *account == stakeholder)
            .ok_or(GrantflowError::UnknownStakeholder(stakeholder))
    }

    /// Floor-division entitlement since genesis for payee `idx`.
    fn entitled(&self, idx: usize) -> Result<u128> {
        let share = u128::from(self.payees[idx].1);
        let scaled = self
            .total_received
            .checked_mul(share)
            .ok_or_else(|| GrantflowError::Internal("entitlement overflow".to_string()))?;
        Ok(scaled / self.total_shares)
    }
}
