//! The redemption engine: single and batch voucher settlement.
//!
//! Redemption is checks-before-effects throughout: verification and guard
//! consultation are pure; the first mutation is the guard mark, after which
//! record creation and payment routing cannot fail for any reason the
//! validation phase already covered. Batch redemption validates the whole
//! input (aggregate payment first) before any element takes effect.

use grantflow_distribute::{
    CommitmentTreeDistributor, FixedSharesLedger, SettlementBank,
};
use grantflow_types::{
    AccountId, Claim, DistributionSelector, EngineConfig, EventLog, EventRecord, GrantflowError,
    RecordId, Result, RoyaltyDescriptor, SettlementEvent, Voucher,
};
use grantflow_verify::{replay_guard::SignatureBytes, ReplayGuard, VoucherVerifier};

use crate::registry::OwnershipRegistry;

/// Explicit administrative capability. Operations that rotate keys or roots,
/// drain pools, or change the advertised royalty split take a token instead
/// of reading ambient permission state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthorityToken {
    account: AccountId,
}

impl AuthorityToken {
    #[must_use]
    pub fn new(account: AccountId) -> Self {
        Self { account }
    }

    #[must_use]
    pub fn account(&self) -> AccountId {
        self.account
    }
}

/// Orchestrates voucher verification, replay guarding, record creation, and
/// payment routing. The guard, ledger, and pools are owned exclusively here;
/// external callers mutate them only through the engine's own operations.
pub struct RedemptionEngine<R: OwnershipRegistry> {
    verifier: VoucherVerifier,
    guard: ReplayGuard,
    fixed: FixedSharesLedger,
    tree: CommitmentTreeDistributor,
    registry: R,
    authority: AccountId,
    default_royalty: RoyaltyDescriptor,
    max_batch_size: usize,
    events: EventLog,
}

impl<R: OwnershipRegistry> RedemptionEngine<R> {
    /// Build an engine from configuration and a registry handle.
    ///
    /// # Errors
    /// - [`GrantflowError::Configuration`] on an invalid grantor key
    /// - [`GrantflowError::InvalidShares`] on an unusable royalty descriptor
    pub fn new(config: EngineConfig, registry: R) -> Result<Self> {
        let verifier = VoucherVerifier::new(&config.grantor_pubkey)?;
        let fixed = FixedSharesLedger::new(&config.default_royalty)?;
        Ok(Self {
            verifier,
            guard: ReplayGuard::new(),
            fixed,
            tree: CommitmentTreeDistributor::new(),
            registry,
            authority: config.authority,
            default_royalty: config.default_royalty,
            max_batch_size: config.max_batch_size,
            events: EventLog::new(),
        })
    }

    // =====================================================================
    // Redemption
    // =====================================================================

    /// Redeem a single voucher with `payment` attached.
    ///
    /// Requires `payment >= voucher.price`, an unused signature, and an
    /// unused record identifier. On success the record is created for the
    /// designated holder and the **full attached payment** is routed to the
    /// voucher's distributor; overpayment is retained as additional
    /// deposit, not refunded.
    pub fn redeem(&mut self, voucher: &Voucher, payment: u128) -> Result<()> {
        let signature = self.validate_voucher(voucher)?;
        if payment < voucher.price {
            return Err(GrantflowError::InsufficientPayment {
                needed: voucher.price,
                attached: payment,
            });
        }
        self.apply_redemption(voucher, signature, payment)
    }

    /// Redeem an ordered batch of vouchers against one aggregate payment.
    ///
    /// The aggregate check (`total_payment >= sum of prices`) runs before
    /// any voucher is processed; then every voucher is validated (including
    /// duplicates within the batch itself) before any element takes effect.
    /// Each voucher's own declared price becomes its distributor deposit;
    /// aggregate surplus is not distributed. An empty batch is a no-op
    /// success.
    ///
    /// # Errors
    /// [`GrantflowError::InsufficientBatchPayment`],
    /// [`GrantflowError::BatchTooLarge`], or
    /// [`GrantflowError::BatchElementFailed`] naming the offending index.
    /// On any error no voucher in the batch has taken effect.
    pub fn redeem_batch(&mut self, vouchers: &[Voucher], total_payment: u128) -> Result<()> {
        if vouchers.is_empty() {
            return Ok(());
        }
        if vouchers.len() > self.max_batch_size {
            return Err(GrantflowError::BatchTooLarge {
                len: vouchers.len(),
                max: self.max_batch_size,
            });
        }

        let mut needed: u128 = 0;
        for voucher in vouchers {
            needed = needed.checked_add(voucher.price).unwrap_or(u128::MAX);
        }
        if total_payment < needed {
            return Err(GrantflowError::InsufficientBatchPayment {
                needed,
                attached: total_payment,
            });
        }

        // Validation pass: no mutations, intra-batch duplicates included.
        let mut signatures = Vec::with_capacity(vouchers.len());
        let mut batch_sigs = std::collections::HashSet::new();
        let mut batch_ids = std::collections::HashSet::new();
        for (index, voucher) in vouchers.iter().enumerate() {
            let fail = |source: GrantflowError| GrantflowError::BatchElementFailed {
                index,
                source: Box::new(source),
            };
            let signature = self.validate_voucher(voucher).map_err(fail)?;
            if !batch_sigs.insert(signature) {
                return Err(fail(GrantflowError::SignatureAlreadyUsed));
            }
            if !batch_ids.insert(voucher.record_id) {
                return Err(fail(GrantflowError::RecordAlreadyCreated(voucher.record_id)));
            }
            signatures.push(signature);
        }

        // Apply pass: nothing here can fail for an already-checked reason.
        for (voucher, signature) in vouchers.iter().zip(signatures) {
            self.apply_redemption(voucher, signature, voucher.price)?;
        }
        tracing::info!(count = vouchers.len(), total_payment, "batch redeemed");
        Ok(())
    }

    /// Pure validation: signature, selector, replay guard, registry.
    fn validate_voucher(&self, voucher: &Voucher) -> Result<SignatureBytes> {
        self.verifier.verify(voucher)?;
        let signature = voucher.signature_bytes()?;
        if self.guard.already_used(&signature) {
            return Err(GrantflowError::SignatureAlreadyUsed);
        }
        if self.guard.already_created(voucher.record_id)
            || self.registry.owner_of(voucher.record_id).is_some()
        {
            return Err(GrantflowError::RecordAlreadyCreated(voucher.record_id));
        }
        Ok(signature)
    }

    /// Effects phase: guard marks, record creation, payment routing.
    fn apply_redemption(
        &mut self,
        voucher: &Voucher,
        signature: SignatureBytes,
        deposit: u128,
    ) -> Result<()> {
        self.guard.mark_used(signature)?;
        self.guard.mark_created(voucher.record_id)?;
        self.registry
            .create(voucher.record_id, voucher.holder, &voucher.content_locator)?;

        match &voucher.selector {
            DistributionSelector::FixedShares(_) => self.fixed.deposit(deposit)?,
            DistributionSelector::CommitmentTree(root) => {
                self.tree.ensure_record(voucher.record_id, *root);
                self.tree.deposit_to_pool(voucher.record_id, deposit)?;
            }
        }

        tracing::info!(
            record_id = %voucher.record_id,
            holder = %voucher.holder,
            price = voucher.price,
            deposit,
            "grant redeemed"
        );
        self.events.emit(SettlementEvent::GrantRedeemed {
            holder: voucher.holder,
            record_id: voucher.record_id,
            content_locator: voucher.content_locator.clone(),
            price: voucher.price,
        });
        Ok(())
    }

    // =====================================================================
    // Distribution (pull-based, delegated to the owned distributors)
    // =====================================================================

    /// A fixed-shares stakeholder's currently releasable entitlement.
    pub fn releasable(&self, stakeholder: AccountId) -> Result<u128> {
        self.fixed.releasable(stakeholder)
    }

    /// Release a fixed-shares stakeholder's entitlement through the bank.
    pub fn release(
        &mut self,
        bank: &mut dyn SettlementBank,
        stakeholder: AccountId,
    ) -> Result<u128> {
        self.fixed.release(bank, stakeholder)
    }

    /// Direct external deposit into the fixed-shares ledger (secondary
    /// proceeds outside any redemption).
    pub fn deposit_royalties(&mut self, amount: u128) -> Result<()> {
        self.fixed.deposit(amount)
    }

    /// Settle a commitment-tree claim.
    pub fn claim(&mut self, bank: &mut dyn SettlementBank, claim: &Claim) -> Result<()> {
        self.tree.claim(bank, claim)
    }

    /// Settle a batch of commitment-tree claims, all-or-nothing.
    pub fn claim_batch(&mut self, bank: &mut dyn SettlementBank, claims: &[Claim]) -> Result<()> {
        self.tree.claim_batch(bank, claims)
    }

    /// Top up a record's commitment-tree pool from secondary proceeds.
    pub fn deposit_to_pool(&mut self, record_id: RecordId, amount: u128) -> Result<()> {
        self.tree.deposit_to_pool(record_id, amount)
    }

    // =====================================================================
    // Administration (authority-token gated)
    // =====================================================================

    /// Rotate the authorized grantor key.
    pub fn rotate_grantor(&mut self, token: &AuthorityToken, new_pubkey: &[u8; 32]) -> Result<()> {
        self.require_authority(token)?;
        self.verifier.rotate_grantor(new_pubkey)
    }

    /// Rotate a record's commitment root. Unclaimed pre-rotation proofs stop
    /// verifying; claimed flags are untouched.
    pub fn rotate_distribution_root(
        &mut self,
        token: &AuthorityToken,
        record_id: RecordId,
        new_root: [u8; 32],
    ) -> Result<()> {
        self.require_authority(token)?;
        self.tree.rotate_root(record_id, new_root)
    }

    /// Drain a record's pool to a recovery account. Claimed flags survive,
    /// so drained stakeholders still cannot double-claim after a re-fund.
    pub fn emergency_withdraw(
        &mut self,
        token: &AuthorityToken,
        bank: &mut dyn SettlementBank,
        record_id: RecordId,
        to: AccountId,
    ) -> Result<u128> {
        self.require_authority(token)?;
        self.tree.drain_pool(bank, record_id, to)
    }

    /// Update the advertised default royalty descriptor for newly issued
    /// vouchers. The constructed fixed-shares ledger is immutable; this
    /// affects only what the engine reports to grantors.
    pub fn set_default_royalty(
        &mut self,
        token: &AuthorityToken,
        descriptor: RoyaltyDescriptor,
    ) -> Result<()> {
        self.require_authority(token)?;
        descriptor.validate()?;
        self.default_royalty = descriptor;
        Ok(())
    }

    fn require_authority(&self, token: &AuthorityToken) -> Result<()> {
        if token.account() != self.authority {
            return Err(GrantflowError::Unauthorized);
        }
        Ok(())
    }

    // =====================================================================
    // Views
    // =====================================================================

    /// The advertised default royalty split.
    #[must_use]
    pub fn default_royalty(&self) -> &RoyaltyDescriptor {
        &self.default_royalty
    }

    /// The currently authorized grantor public key.
    #[must_use]
    pub fn grantor_pubkey(&self) -> [u8; 32] {
        self.verifier.grantor_pubkey()
    }

    /// Current holder of a record, if created.
    #[must_use]
    pub fn owner_of(&self, record_id: RecordId) -> Option<AccountId> {
        self.registry.owner_of(record_id)
    }

    /// Pool balance of a commitment-tree record.
    #[must_use]
    pub fn pool_of(&self, record_id: RecordId) -> Option<u128> {
        self.tree.pool_of(record_id)
    }

    /// Commitment root of a record.
    #[must_use]
    pub fn root_of(&self, record_id: RecordId) -> Option<[u8; 32]> {
        self.tree.root_of(record_id)
    }

    /// Whether a stakeholder already claimed against a record.
    #[must_use]
    pub fn has_claimed(&self, record_id: RecordId, stakeholder: AccountId) -> bool {
        self.tree.has_claimed(record_id, stakeholder)
    }

    /// Total received by the fixed-shares ledger.
    #[must_use]
    pub fn royalties_received(&self) -> u128 {
        self.fixed.total_received()
    }

    /// Redemption events in emission order.
    #[must_use]
    pub fn events(&self) -> &[EventRecord] {
        self.events.records()
    }

    /// Distribution events (root sets, settled claims).
    #[must_use]
    pub fn distribution_events(&self) -> &[EventRecord] {
        self.tree.events()
    }

    /// Royalty ledger events (deposits).
    #[must_use]
    pub fn royalty_events(&self) -> &[EventRecord] {
        self.fixed.events()
    }

    /// Access the underlying registry (read paths of the embedding caller).
    #[must_use]
    pub fn registry(&self) -> &R {
        &self.registry
    }

    /// Mutable registry access for ownership transfers after creation.
    pub fn registry_mut(&mut self) -> &mut R {
        &mut self.registry
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::InMemoryRegistry;
    use ed25519_dalek::SigningKey;
    use grantflow_distribute::LedgerBank;
    use grantflow_types::RoyaltyShare;

    fn acct(byte: u8) -> AccountId {
        AccountId([byte; 32])
    }

    fn grantor() -> SigningKey {
        SigningKey::from_bytes(&[42u8; 32])
    }

    fn royalty() -> RoyaltyDescriptor {
        RoyaltyDescriptor::new(vec![
            RoyaltyShare {
                account: acct(1),
                share: 50,
            },
            RoyaltyShare {
                account: acct(2),
                share: 30,
            },
            RoyaltyShare {
                account: acct(3),
                share: 20,
            },
        ])
    }

    fn engine() -> RedemptionEngine<InMemoryRegistry> {
        let config = EngineConfig::new(
            grantor().verifying_key().to_bytes(),
            acct(100),
            royalty(),
        );
        RedemptionEngine::new(config, InMemoryRegistry::new()).unwrap()
    }

    fn fixed_voucher(record: u128, price: u128) -> Voucher {
        Voucher::sign(
            RecordId(record),
            format!("ipfs://grant-{record}"),
            price,
            acct(9),
            DistributionSelector::FixedShares(royalty()),
            &grantor(),
        )
    }

    #[test]
    fn redeem_creates_record_and_deposits() {
        let mut engine = engine();
        let voucher = fixed_voucher(1, 100);

        engine.redeem(&voucher, 100).unwrap();

        assert_eq!(engine.owner_of(RecordId(1)), Some(acct(9)));
        assert_eq!(engine.royalties_received(), 100);
        assert_eq!(engine.events().len(), 1);
        assert!(matches!(
            engine.events()[0].event,
            SettlementEvent::GrantRedeemed { price: 100, .. }
        ));
    }

    #[test]
    fn replayed_signature_rejected() {
        let mut engine = engine();
        let voucher = fixed_voucher(1, 100);
        engine.redeem(&voucher, 100).unwrap();

        // Same voucher again: the signature check fires first.
        let err = engine.redeem(&voucher, 100).unwrap_err();
        assert!(matches!(err, GrantflowError::SignatureAlreadyUsed));
        assert_eq!(engine.royalties_received(), 100);
    }

    #[test]
    fn reused_record_id_rejected() {
        let mut engine = engine();
        engine.redeem(&fixed_voucher(1, 100), 100).unwrap();

        // Distinct voucher (different price ⇒ different signature), same id.
        let other = fixed_voucher(1, 150);
        let err = engine.redeem(&other, 150).unwrap_err();
        assert!(matches!(err, GrantflowError::RecordAlreadyCreated(_)));
    }

    #[test]
    fn insufficient_payment_leaves_no_state() {
        let mut engine = engine();
        let voucher = fixed_voucher(1, 10);

        let err = engine.redeem(&voucher, 5).unwrap_err();
        assert!(matches!(
            err,
            GrantflowError::InsufficientPayment {
                needed: 10,
                attached: 5
            }
        ));

        // No record, no guard entry, no deposit: the voucher is still live.
        assert!(engine.owner_of(RecordId(1)).is_none());
        assert_eq!(engine.royalties_received(), 0);
        engine.redeem(&voucher, 10).unwrap();
    }

    #[test]
    fn overpayment_retained_as_deposit() {
        let mut engine = engine();
        engine.redeem(&fixed_voucher(1, 100), 175).unwrap();
        assert_eq!(engine.royalties_received(), 175);
    }

    #[test]
    fn commitment_voucher_funds_pool_with_embedded_root() {
        let mut engine = engine();
        let root = [7u8; 32];
        let voucher = Voucher::sign(
            RecordId(5),
            "ipfs://grant-5",
            60,
            acct(9),
            DistributionSelector::CommitmentTree(root),
            &grantor(),
        );

        engine.redeem(&voucher, 80).unwrap();

        assert_eq!(engine.root_of(RecordId(5)), Some(root));
        assert_eq!(engine.pool_of(RecordId(5)), Some(80));
        assert_eq!(engine.royalties_received(), 0);
    }

    #[test]
    fn batch_redeems_all_with_exact_payment() {
        let mut engine = engine();
        let vouchers = vec![
            fixed_voucher(1, 10),
            fixed_voucher(2, 20),
            fixed_voucher(3, 30),
        ];

        engine.redeem_batch(&vouchers, 60).unwrap();

        for record in [1u128, 2, 3] {
            assert_eq!(engine.owner_of(RecordId(record)), Some(acct(9)));
        }
        assert_eq!(engine.royalties_received(), 60);
        assert_eq!(engine.events().len(), 3);
    }

    #[test]
    fn underfunded_batch_has_no_effect() {
        let mut engine = engine();
        let vouchers = vec![
            fixed_voucher(1, 10),
            fixed_voucher(2, 20),
            fixed_voucher(3, 30),
        ];

        let err = engine.redeem_batch(&vouchers, 59).unwrap_err();
        assert!(matches!(
            err,
            GrantflowError::InsufficientBatchPayment {
                needed: 60,
                attached: 59
            }
        ));

        for record in [1u128, 2, 3] {
            assert!(engine.owner_of(RecordId(record)).is_none());
        }
        assert_eq!(engine.royalties_received(), 0);
        assert_eq!(engine.events().len(), 0);
    }

    #[test]
    fn batch_with_consumed_voucher_fails_entirely() {
        let mut engine = engine();
        let spent = fixed_voucher(1, 10);
        engine.redeem(&spent, 10).unwrap();

        let vouchers = vec![fixed_voucher(2, 20), spent.clone(), fixed_voucher(3, 30)];
        let err = engine.redeem_batch(&vouchers, 60).unwrap_err();
        assert!(
            matches!(
                &err,
                GrantflowError::BatchElementFailed { index: 1, source }
                    if matches!(**source, GrantflowError::SignatureAlreadyUsed)
            ),
            "got: {err:?}"
        );

        assert!(engine.owner_of(RecordId(2)).is_none());
        assert!(engine.owner_of(RecordId(3)).is_none());
    }

    #[test]
    fn batch_rejects_internal_duplicates() {
        let mut engine = engine();
        let voucher = fixed_voucher(1, 10);
        let vouchers = vec![voucher.clone(), voucher];

        let err = engine.redeem_batch(&vouchers, 20).unwrap_err();
        assert!(matches!(
            err,
            GrantflowError::BatchElementFailed { index: 1, .. }
        ));
        assert!(engine.owner_of(RecordId(1)).is_none());
    }

    #[test]
    fn batch_surplus_not_distributed() {
        let mut engine = engine();
        let vouchers = vec![fixed_voucher(1, 10), fixed_voucher(2, 20)];

        // 70 attached, 30 needed: each voucher deposits its own price.
        engine.redeem_batch(&vouchers, 70).unwrap();
        assert_eq!(engine.royalties_received(), 30);
    }

    #[test]
    fn empty_batch_is_noop() {
        let mut engine = engine();
        engine.redeem_batch(&[], 0).unwrap();
        assert_eq!(engine.events().len(), 0);
    }

    #[test]
    fn oversized_batch_rejected() {
        let config = EngineConfig {
            max_batch_size: 2,
            ..EngineConfig::new(grantor().verifying_key().to_bytes(), acct(100), royalty())
        };
        let mut engine = RedemptionEngine::new(config, InMemoryRegistry::new()).unwrap();

        let vouchers = vec![
            fixed_voucher(1, 10),
            fixed_voucher(2, 10),
            fixed_voucher(3, 10),
        ];
        let err = engine.redeem_batch(&vouchers, 30).unwrap_err();
        assert!(matches!(err, GrantflowError::BatchTooLarge { len: 3, max: 2 }));
    }

    #[test]
    fn redemption_then_release_pays_stakeholders() {
        let mut engine = engine();
        let mut bank = LedgerBank::new();
        engine.redeem(&fixed_voucher(1, 100), 100).unwrap();

        assert_eq!(engine.releasable(acct(1)).unwrap(), 50);
        assert_eq!(engine.release(&mut bank, acct(1)).unwrap(), 50);
        assert_eq!(bank.balance(acct(1)), 50);

        let err = engine.release(&mut bank, acct(1)).unwrap_err();
        assert!(matches!(err, GrantflowError::NothingToRelease(_)));
    }

    #[test]
    fn admin_requires_matching_authority() {
        let mut engine = engine();
        let intruder = AuthorityToken::new(acct(66));
        let admin = AuthorityToken::new(acct(100));

        let err = engine
            .rotate_grantor(&intruder, &grantor().verifying_key().to_bytes())
            .unwrap_err();
        assert!(matches!(err, GrantflowError::Unauthorized));

        let new_key = SigningKey::from_bytes(&[43u8; 32]);
        engine
            .rotate_grantor(&admin, &new_key.verifying_key().to_bytes())
            .unwrap();

        // Old-grantor vouchers stop verifying.
        let stale = fixed_voucher(1, 10);
        let err = engine.redeem(&stale, 10).unwrap_err();
        assert!(matches!(err, GrantflowError::SignerMismatch));

        // New-grantor vouchers redeem.
        let fresh = Voucher::sign(
            RecordId(1),
            "ipfs://grant-1",
            10,
            acct(9),
            DistributionSelector::FixedShares(royalty()),
            &new_key,
        );
        engine.redeem(&fresh, 10).unwrap();
    }

    #[test]
    fn set_default_royalty_validates_and_updates() {
        let mut engine = engine();
        let admin = AuthorityToken::new(acct(100));

        let bad = RoyaltyDescriptor::new(vec![]);
        assert!(engine.set_default_royalty(&admin, bad).is_err());

        let updated = RoyaltyDescriptor::new(vec![RoyaltyShare {
            account: acct(4),
            share: 100,
        }]);
        engine.set_default_royalty(&admin, updated.clone()).unwrap();
        assert_eq!(engine.default_royalty(), &updated);
    }

    #[test]
    fn emergency_withdraw_gated_and_drains() {
        let mut engine = engine();
        let mut bank = LedgerBank::new();
        let voucher = Voucher::sign(
            RecordId(5),
            "ipfs://grant-5",
            60,
            acct(9),
            DistributionSelector::CommitmentTree([7u8; 32]),
            &grantor(),
        );
        engine.redeem(&voucher, 60).unwrap();

        let err = engine
            .emergency_withdraw(&AuthorityToken::new(acct(66)), &mut bank, RecordId(5), acct(8))
            .unwrap_err();
        assert!(matches!(err, GrantflowError::Unauthorized));

        let drained = engine
            .emergency_withdraw(&AuthorityToken::new(acct(100)), &mut bank, RecordId(5), acct(8))
            .unwrap();
        assert_eq!(drained, 60);
        assert_eq!(engine.pool_of(RecordId(5)), Some(0));
    }
}
