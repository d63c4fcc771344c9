//! The value-transfer seam distributors settle through.
//!
//! Distributors never move value themselves; they instruct a
//! [`SettlementBank`]. Keeping the transfer behind a trait keeps the
//! mandatory ordering (validate → mutate internal state → transfer)
//! testable, including the rollback path when a transfer fails.

use std::collections::{HashMap, HashSet};

use grantflow_types::{AccountId, GrantflowError, Result};

/// Destination for released and claimed funds.
pub trait SettlementBank {
    /// Credit `amount` to `to`.
    ///
    /// # Errors
    /// Returns [`GrantflowError::TransferFailed`] if the transfer cannot be
    /// completed. The caller rolls back its own state in response.
    fn pay(&mut self, to: AccountId, amount: u128) -> Result<()>;

    /// Credit a set of payouts with all-or-nothing semantics: either every
    /// payout lands or none does. Implementations whose `pay` can fail MUST
    /// override this with a genuinely atomic version; the default is only
    /// correct for infallible banks.
    fn pay_all(&mut self, payouts: &[(AccountId, u128)]) -> Result<()> {
        for (to, amount) in payouts {
            self.pay(*to, *amount)?;
        }
        Ok(())
    }
}

/// In-memory settlement bank: per-account credit balances with a recipient
/// blocklist. The blocklist doubles as the failure-injection point for
/// transfer-rollback tests.
#[derive(Debug, Default)]
pub struct LedgerBank {
    balances: HashMap<AccountId, u128>,
    blocked: HashSet<AccountId>,
    total_paid: u128,
}

impl LedgerBank {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Credit balance of an account.
    #[must_use]
    pub fn balance(&self, account: AccountId) -> u128 {
        self.balances.get(&account).copied().unwrap_or(0)
    }

    /// Total value ever paid out through this bank.
    #[must_use]
    pub fn total_paid(&self) -> u128 {
        self.total_paid
    }

    /// Block payouts to an account. Transfers to it fail until unblocked.
    pub fn block(&mut self, account: AccountId) {
        self.blocked.insert(account);
    }

    /// Remove an account from the blocklist.
    pub fn unblock(&mut self, account: AccountId) {
        self.blocked.remove(&account);
    }

    fn check_payable(&self, to: AccountId, amount: u128) -> Result<()> {
        if self.blocked.contains(&to) {
            return Err(GrantflowError::TransferFailed {
                reason: format!("recipient {to} is blocked"),
            });
        }
        if self.balance(to).checked_add(amount).is_none() {
            return Err(GrantflowError::TransferFailed {
                reason: format!("balance overflow for {to}"),
            });
        }
        Ok(())
    }

    fn credit(&mut self, to: AccountId, amount: u128) {
        *self.balances.entry(to).or_insert(0) += amount;
        self.total_paid = self.total_paid.saturating_add(amount);
    }
}

impl SettlementBank for LedgerBank {
    fn pay(&mut self, to: AccountId, amount: u128) -> Result<()> {
        self.check_payable(to, amount)?;
        self.credit(to, amount);
        Ok(())
    }

    fn pay_all(&mut self, payouts: &[(AccountId, u128)]) -> Result<()> {
        // Check every payout before crediting any, so a late rejection
        // cannot leave a partial batch.
        let mut projected: HashMap<AccountId, u128> = HashMap::new();
        for (to, amount) in payouts {
            if self.blocked.contains(to) {
                return Err(GrantflowError::TransferFailed {
                    reason: format!("recipient {to} is blocked"),
                });
            }
            let entry = projected.entry(*to).or_insert_with(|| self.balance(*to));
            *entry = entry
                .checked_add(*amount)
                .ok_or_else(|| GrantflowError::TransferFailed {
                    reason: format!("balance overflow for {to}"),
                })?;
        }
        for (to, amount) in payouts {
            self.credit(*to, *amount);
        }
        Ok(())
    }
}
