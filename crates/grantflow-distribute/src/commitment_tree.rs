//! Commitment-tree distributor: pooled payouts for unbounded stakeholder
//! sets.
//!
//! Each record carries one short root commitment over its stakeholder set
//! and a pool balance. Stakeholders claim their entitlement independently
//! with a membership proof; a claimed flag per (record, stakeholder) makes
//! every claim at-most-once, and survives root rotation.

use std::collections::{HashMap, HashSet};

use grantflow_types::{
    AccountId, Claim, EventLog, EventRecord, GrantflowError, RecordId, Result, SettlementEvent,
};

use crate::bank::SettlementBank;
use crate::proof::verify_proof;

/// Per-record pool state.
#[derive(Debug, Clone)]
struct PoolRecord {
    /// Current root commitment over the stakeholder set.
    root: [u8; 32],
    /// Pool balance: deposits minus claims. Never negative.
    pool: u128,
    /// Stakeholders who have already claimed. Never unset.
    claimed: HashSet<AccountId>,
}

/// Distributor for the commitment-tree model.
#[derive(Debug, Default)]
pub struct CommitmentTreeDistributor {
    records: HashMap<RecordId, PoolRecord>,
    events: EventLog,
}

impl CommitmentTreeDistributor {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create the pool record for `record_id` with the given root if it does
    /// not exist yet. An existing record is left untouched; redemption
    /// never overwrites a root; rotation is a separate administrative path.
    pub fn ensure_record(&mut self, record_id: RecordId, root: [u8; 32]) {
        if self.records.contains_key(&record_id) {
            return;
        }
        self.records.insert(
            record_id,
            PoolRecord {
                root,
                pool: 0,
                claimed: HashSet::new(),
            },
        );
        tracing::info!(%record_id, root = %hex::encode(root), "commitment root set");
        self.events.emit(SettlementEvent::DistributionRootSet {
            record_id,
            root,
            pool_amount: 0,
        });
    }

    /// Replace the root for an existing record. All unclaimed pre-rotation
    /// proofs stop verifying; claimed flags are untouched and keep blocking
    /// re-claims by the same stakeholder.
    ///
    /// # Errors
    /// Returns [`GrantflowError::UnknownRecord`] if the record has no pool.
    pub fn rotate_root(&mut self, record_id: RecordId, new_root: [u8; 32]) -> Result<()> {
        let record = self
            .records
            .get_mut(&record_id)
            .ok_or(GrantflowError::UnknownRecord(record_id))?;
        record.root = new_root;
        let pool_amount = record.pool;
        tracing::info!(%record_id, root = %hex::encode(new_root), "commitment root rotated");
        self.events.emit(SettlementEvent::DistributionRootSet {
            record_id,
            root: new_root,
            pool_amount,
        });
        Ok(())
    }

    /// Fund a record's pool: redemption proceeds or a later top-up from
    /// secondary sales.
    ///
    /// # Errors
    /// - [`GrantflowError::UnknownRecord`] if no pool exists for the record
    /// - [`GrantflowError::Internal`] on pool balance overflow
    pub fn deposit_to_pool(&mut self, record_id: RecordId, amount: u128) -> Result<()> {
        let record = self
            .records
            .get_mut(&record_id)
            .ok_or(GrantflowError::UnknownRecord(record_id))?;
        record.pool = record
            .pool
            .checked_add(amount)
            .ok_or_else(|| GrantflowError::Internal("pool balance overflow".to_string()))?;
        tracing::debug!(%record_id, amount, pool = record.pool, "pool deposit");
        Ok(())
    }

    /// Settle a single claim: verify the membership proof against the
    /// record's current root, mark the stakeholder claimed, decrement the
    /// pool, and pay through the bank. Ordering: validate → mutate →
    /// transfer; a failed transfer rolls back flag and pool.
    pub fn claim(&mut self, bank: &mut dyn SettlementBank, claim: &Claim) -> Result<()> {
        self.check_claim(claim)?;

        let record = self
            .records
            .get_mut(&claim.record_id)
            .ok_or(GrantflowError::UnknownRecord(claim.record_id))?;
        record.claimed.insert(claim.stakeholder);
        record.pool -= claim.amount;

        if let Err(err) = bank.pay(claim.stakeholder, claim.amount) {
            let record = self
                .records
                .get_mut(&claim.record_id)
                .ok_or(GrantflowError::UnknownRecord(claim.record_id))?;
            record.claimed.remove(&claim.stakeholder);
            record.pool += claim.amount;
            return Err(err);
        }

        tracing::info!(
            record_id = %claim.record_id,
            stakeholder = %claim.stakeholder,
            amount = claim.amount,
            "claim settled"
        );
        self.events.emit(SettlementEvent::ClaimSettled {
            record_id: claim.record_id,
            stakeholder: claim.stakeholder,
            amount: claim.amount,
        });
        Ok(())
    }

    /// Settle a sequence of claims with strict all-or-nothing semantics:
    /// every claim is checked (including intra-batch duplicates and the
    /// cumulative draw on each pool) before any state changes, payouts go
    /// through [`SettlementBank::pay_all`], and any failure rolls back every
    /// flag and pool decrement. An empty batch is a no-op success.
    ///
    /// # Errors
    /// [`GrantflowError::BatchElementFailed`] naming the first offending
    /// index, or [`GrantflowError::TransferFailed`] if the aggregate payout
    /// is rejected.
    pub fn claim_batch(&mut self, bank: &mut dyn SettlementBank, claims: &[Claim]) -> Result<()> {
        if claims.is_empty() {
            return Ok(());
        }

        // Validation pass: no mutations.
        let mut in_batch: HashSet<(RecordId, AccountId)> = HashSet::new();
        let mut draw: HashMap<RecordId, u128> = HashMap::new();
        for (index, claim) in claims.iter().enumerate() {
            let fail = |source: GrantflowError| GrantflowError::BatchElementFailed {
                index,
                source: Box::new(source),
            };
            self.check_claim(claim).map_err(fail)?;
            if !in_batch.insert((claim.record_id, claim.stakeholder)) {
                return Err(fail(GrantflowError::AlreadyClaimed {
                    record_id: claim.record_id,
                    stakeholder: claim.stakeholder,
                }));
            }
            let available = self.records[&claim.record_id].pool;
            let drawn = draw.entry(claim.record_id).or_insert(0);
            *drawn = drawn.checked_add(claim.amount).unwrap_or(u128::MAX);
            if *drawn > available {
                return Err(fail(GrantflowError::PoolUnderfunded {
                    needed: *drawn,
                    available,
                }));
            }
        }

        // Apply pass: mutate everything, then pay atomically.
        for claim in claims {
            let record = self
                .records
                .get_mut(&claim.record_id)
                .ok_or(GrantflowError::UnknownRecord(claim.record_id))?;
            record.claimed.insert(claim.stakeholder);
            record.pool -= claim.amount;
        }

        let payouts: Vec<(AccountId, u128)> = claims
            .iter()
            .map(|c| (c.stakeholder, c.amount))
            .collect();
        if let Err(err) = bank.pay_all(&payouts) {
            for claim in claims {
                if let Some(record) = self.records.get_mut(&claim.record_id) {
                    record.claimed.remove(&claim.stakeholder);
                    record.pool += claim.amount;
                }
            }
            return Err(err);
        }

        for claim in claims {
            self.events.emit(SettlementEvent::ClaimSettled {
                record_id: claim.record_id,
                stakeholder: claim.stakeholder,
                amount: claim.amount,
            });
        }
        Ok(())
    }

    /// Drain a record's entire pool to `to` (administrative recovery path).
    /// Claimed flags are untouched. Returns the drained amount.
    ///
    /// # Errors
    /// [`GrantflowError::UnknownRecord`] or [`GrantflowError::TransferFailed`]
    /// (pool restored on transfer failure).
    pub fn drain_pool(
        &mut self,
        bank: &mut dyn SettlementBank,
        record_id: RecordId,
        to: AccountId,
    ) -> Result<u128> {
        let record = self
            .records
            .get_mut(&record_id)
            .ok_or(GrantflowError::UnknownRecord(record_id))?;
        let amount = record.pool;
        record.pool = 0;

        if amount > 0 {
            if let Err(err) = bank.pay(to, amount) {
                let record = self
                    .records
                    .get_mut(&record_id)
                    .ok_or(GrantflowError::UnknownRecord(record_id))?;
                record.pool = amount;
                return Err(err);
            }
        }
        tracing::warn!(%record_id, %to, amount, "pool drained");
        Ok(amount)
    }

    /// The current root for a record.
    #[must_use]
    pub fn root_of(&self, record_id: RecordId) -> Option<[u8; 32]> {
        self.records.get(&record_id).map(|r| r.root)
    }

    /// The current pool balance for a record.
    #[must_use]
    pub fn pool_of(&self, record_id: RecordId) -> Option<u128> {
        self.records.get(&record_id).map(|r| r.pool)
    }

    /// Whether the stakeholder has already claimed against the record.
    #[must_use]
    pub fn has_claimed(&self, record_id: RecordId, stakeholder: AccountId) -> bool {
        self.records
            .get(&record_id)
            .is_some_and(|r| r.claimed.contains(&stakeholder))
    }

    /// Audit trail of root changes and settled claims.
    #[must_use]
    pub fn events(&self) -> &[EventRecord] {
        self.events.records()
    }

    /// All per-claim checks, without the cumulative-batch view.
    fn check_claim(&self, claim: &Claim) -> Result<()> {
        let record = self
            .records
            .get(&claim.record_id)
            .ok_or(GrantflowError::UnknownRecord(claim.record_id))?;
        if record.claimed.contains(&claim.stakeholder) {
            return Err(GrantflowError::AlreadyClaimed {
                record_id: claim.record_id,
                stakeholder: claim.stakeholder,
            });
        }
        if claim.amount == 0 {
            return Err(GrantflowError::ZeroClaimAmount);
        }
        if record.pool < claim.amount {
            return Err(GrantflowError::PoolUnderfunded {
                needed: claim.amount,
                available: record.pool,
            });
        }
        if !verify_proof(claim.leaf(), &claim.proof, record.root) {
            return Err(GrantflowError::InvalidProof);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bank::LedgerBank;
    use crate::proof::CommitmentTreeBuilder;

    fn acct(byte: u8) -> AccountId {
        AccountId([byte; 32])
    }

    const RECORD: RecordId = RecordId(1);

    /// Build a three-stakeholder tree and a funded distributor.
    fn setup(pool: u128) -> (CommitmentTreeDistributor, CommitmentTreeBuilder) {
        let mut builder = CommitmentTreeBuilder::new();
        builder.add_entitlement(RECORD, acct(1), 100);
        builder.add_entitlement(RECORD, acct(2), 200);
        builder.add_entitlement(RECORD, acct(3), 300);

        let mut dist = CommitmentTreeDistributor::new();
        dist.ensure_record(RECORD, builder.root().unwrap());
        dist.deposit_to_pool(RECORD, pool).unwrap();
        (dist, builder)
    }

    fn claim_for(builder: &CommitmentTreeBuilder, index: usize, byte: u8, amount: u128) -> Claim {
        Claim {
            record_id: RECORD,
            stakeholder: acct(byte),
            amount,
            proof: builder.proof_for(index).unwrap(),
        }
    }

    #[test]
    fn valid_claim_settles_once() {
        let (mut dist, builder) = setup(600);
        let mut bank = LedgerBank::new();
        let claim = claim_for(&builder, 0, 1, 100);

        dist.claim(&mut bank, &claim).unwrap();
        assert_eq!(bank.balance(acct(1)), 100);
        assert_eq!(dist.pool_of(RECORD).unwrap(), 500);
        assert!(dist.has_claimed(RECORD, acct(1)));

        let err = dist.claim(&mut bank, &claim).unwrap_err();
        assert!(matches!(err, GrantflowError::AlreadyClaimed { .. }));
        assert_eq!(bank.balance(acct(1)), 100);
    }

    #[test]
    fn forged_amount_rejected() {
        let (mut dist, builder) = setup(600);
        let mut bank = LedgerBank::new();
        let mut claim = claim_for(&builder, 0, 1, 100);
        claim.amount = 500;

        let err = dist.claim(&mut bank, &claim).unwrap_err();
        assert!(matches!(err, GrantflowError::InvalidProof));
        assert_eq!(dist.pool_of(RECORD).unwrap(), 600);
    }

    #[test]
    fn unknown_record_rejected() {
        let (mut dist, builder) = setup(600);
        let mut bank = LedgerBank::new();
        let mut claim = claim_for(&builder, 0, 1, 100);
        claim.record_id = RecordId(99);

        let err = dist.claim(&mut bank, &claim).unwrap_err();
        assert!(matches!(err, GrantflowError::UnknownRecord(_)));
    }

    #[test]
    fn underfunded_pool_rejected_then_topped_up() {
        let (mut dist, builder) = setup(50);
        let mut bank = LedgerBank::new();
        let claim = claim_for(&builder, 0, 1, 100);

        let err = dist.claim(&mut bank, &claim).unwrap_err();
        assert!(matches!(err, GrantflowError::PoolUnderfunded { .. }));

        // Pool underfunding is resolvable by a top-up, unlike a bad proof.
        dist.deposit_to_pool(RECORD, 50).unwrap();
        dist.claim(&mut bank, &claim).unwrap();
        assert_eq!(bank.balance(acct(1)), 100);
    }

    #[test]
    fn zero_amount_rejected() {
        let (mut dist, builder) = setup(600);
        let mut bank = LedgerBank::new();
        let mut claim = claim_for(&builder, 0, 1, 100);
        claim.amount = 0;

        let err = dist.claim(&mut bank, &claim).unwrap_err();
        assert!(matches!(err, GrantflowError::ZeroClaimAmount));
    }

    #[test]
    fn rotation_invalidates_old_proofs_but_keeps_flags() {
        let (mut dist, builder) = setup(600);
        let mut bank = LedgerBank::new();

        dist.claim(&mut bank, &claim_for(&builder, 0, 1, 100)).unwrap();

        // Rotate to a tree with different entitlements.
        let mut rotated = CommitmentTreeBuilder::new();
        rotated.add_entitlement(RECORD, acct(1), 100);
        rotated.add_entitlement(RECORD, acct(2), 150);
        dist.rotate_root(RECORD, rotated.root().unwrap()).unwrap();

        // Pre-rotation proof no longer verifies.
        let err = dist
            .claim(&mut bank, &claim_for(&builder, 1, 2, 200))
            .unwrap_err();
        assert!(matches!(err, GrantflowError::InvalidProof));

        // Claimed flag survives rotation: acct(1) still blocked even with a
        // fresh valid proof.
        let fresh = Claim {
            record_id: RECORD,
            stakeholder: acct(1),
            amount: 100,
            proof: rotated.proof_for(0).unwrap(),
        };
        let err = dist.claim(&mut bank, &fresh).unwrap_err();
        assert!(matches!(err, GrantflowError::AlreadyClaimed { .. }));

        // acct(2) claims fine under the new root.
        let post = Claim {
            record_id: RECORD,
            stakeholder: acct(2),
            amount: 150,
            proof: rotated.proof_for(1).unwrap(),
        };
        dist.claim(&mut bank, &post).unwrap();
        assert_eq!(bank.balance(acct(2)), 150);
    }

    #[test]
    fn ensure_record_does_not_overwrite_root() {
        let (mut dist, builder) = setup(600);
        let original = dist.root_of(RECORD).unwrap();
        dist.ensure_record(RECORD, [9u8; 32]);
        assert_eq!(dist.root_of(RECORD).unwrap(), original);
        drop(builder);
    }

    #[test]
    fn failed_transfer_rolls_back_claim() {
        let (mut dist, builder) = setup(600);
        let mut bank = LedgerBank::new();
        bank.block(acct(1));

        let claim = claim_for(&builder, 0, 1, 100);
        let err = dist.claim(&mut bank, &claim).unwrap_err();
        assert!(matches!(err, GrantflowError::TransferFailed { .. }));

        assert!(!dist.has_claimed(RECORD, acct(1)));
        assert_eq!(dist.pool_of(RECORD).unwrap(), 600);

        bank.unblock(acct(1));
        dist.claim(&mut bank, &claim).unwrap();
    }

    #[test]
    fn batch_claim_settles_all() {
        let (mut dist, builder) = setup(600);
        let mut bank = LedgerBank::new();
        let claims = vec![
            claim_for(&builder, 0, 1, 100),
            claim_for(&builder, 1, 2, 200),
            claim_for(&builder, 2, 3, 300),
        ];

        dist.claim_batch(&mut bank, &claims).unwrap();
        assert_eq!(bank.balance(acct(1)), 100);
        assert_eq!(bank.balance(acct(2)), 200);
        assert_eq!(bank.balance(acct(3)), 300);
        assert_eq!(dist.pool_of(RECORD).unwrap(), 0);
    }

    #[test]
    fn batch_claim_is_strict() {
        let (mut dist, builder) = setup(600);
        let mut bank = LedgerBank::new();
        let mut bad = claim_for(&builder, 1, 2, 200);
        bad.amount = 999; // breaks the proof

        let claims = vec![claim_for(&builder, 0, 1, 100), bad];
        let err = dist.claim_batch(&mut bank, &claims).unwrap_err();
        assert!(
            matches!(
                &err,
                GrantflowError::BatchElementFailed { index: 1, source }
                    if matches!(**source, GrantflowError::InvalidProof)
            ),
            "got: {err:?}"
        );

        // Element 0 was valid but must not have settled.
        assert_eq!(bank.balance(acct(1)), 0);
        assert!(!dist.has_claimed(RECORD, acct(1)));
        assert_eq!(dist.pool_of(RECORD).unwrap(), 600);
    }

    #[test]
    fn batch_claim_rejects_intra_batch_duplicate() {
        let (mut dist, builder) = setup(600);
        let mut bank = LedgerBank::new();
        let claims = vec![
            claim_for(&builder, 0, 1, 100),
            claim_for(&builder, 0, 1, 100),
        ];

        let err = dist.claim_batch(&mut bank, &claims).unwrap_err();
        assert!(matches!(
            err,
            GrantflowError::BatchElementFailed { index: 1, .. }
        ));
        assert_eq!(dist.pool_of(RECORD).unwrap(), 600);
    }

    #[test]
    fn batch_claim_checks_cumulative_pool_draw() {
        // Each claim alone fits the pool; together they overdraw it.
        let (mut dist, builder) = setup(250);
        let mut bank = LedgerBank::new();
        let claims = vec![
            claim_for(&builder, 0, 1, 100),
            claim_for(&builder, 1, 2, 200),
        ];

        let err = dist.claim_batch(&mut bank, &claims).unwrap_err();
        assert!(matches!(
            &err,
            GrantflowError::BatchElementFailed { index: 1, source }
                if matches!(**source, GrantflowError::PoolUnderfunded { .. })
        ));
        assert_eq!(dist.pool_of(RECORD).unwrap(), 250);
        assert_eq!(bank.total_paid(), 0);
    }

    #[test]
    fn batch_claim_rolls_back_on_transfer_failure() {
        let (mut dist, builder) = setup(600);
        let mut bank = LedgerBank::new();
        bank.block(acct(3));

        let claims = vec![
            claim_for(&builder, 0, 1, 100),
            claim_for(&builder, 2, 3, 300),
        ];
        let err = dist.claim_batch(&mut bank, &claims).unwrap_err();
        assert!(matches!(err, GrantflowError::TransferFailed { .. }));

        assert_eq!(bank.total_paid(), 0);
        assert!(!dist.has_claimed(RECORD, acct(1)));
        assert!(!dist.has_claimed(RECORD, acct(3)));
        assert_eq!(dist.pool_of(RECORD).unwrap(), 600);
    }

    #[test]
    fn empty_batch_is_noop() {
        let (mut dist, _) = setup(600);
        let mut bank = LedgerBank::new();
        dist.claim_batch(&mut bank, &[]).unwrap();
        assert_eq!(dist.pool_of(RECORD).unwrap(), 600);
    }

    #[test]
    fn drain_pool_empties_but_keeps_flags() {
        let (mut dist, builder) = setup(600);
        let mut bank = LedgerBank::new();
        dist.claim(&mut bank, &claim_for(&builder, 0, 1, 100)).unwrap();

        let drained = dist.drain_pool(&mut bank, RECORD, acct(9)).unwrap();
        assert_eq!(drained, 500);
        assert_eq!(bank.balance(acct(9)), 500);
        assert_eq!(dist.pool_of(RECORD).unwrap(), 0);
        assert!(dist.has_claimed(RECORD, acct(1)));
    }

    #[test]
    fn events_record_roots_and_claims() {
        let (mut dist, builder) = setup(600);
        let mut bank = LedgerBank::new();
        dist.claim(&mut bank, &claim_for(&builder, 0, 1, 100)).unwrap();

        let kinds: Vec<String> = dist.events().iter().map(|r| r.event.to_string()).collect();
        assert_eq!(kinds, vec!["DISTRIBUTION_ROOT_SET", "CLAIM_SETTLED"]);
    }
}
