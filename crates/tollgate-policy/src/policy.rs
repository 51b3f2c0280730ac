//! The composed admission policy for a chain.
//!
//! A [`ChainPolicy`] is built once when the chain is constructed and then
//! shared read-only (usually behind an `Arc`). Every dimension is a
//! [`PolicyTimeline`]; a dimension that is not configured resolves to
//! "no restriction" at every index.

use std::collections::BTreeSet;

use tollgate_core::activation::AuthorizedMinersState;
use tollgate_core::address::Address;
use tollgate_core::commit::ValidatorSet;

use crate::span::{IndexFilter, Span};
use crate::timeline::PolicyTimeline;

/// Set of accounts allowed to propose at an index.
pub type MinerSet = BTreeSet<Address>;

/// Immutable, composed admission policy.
#[derive(Clone, Debug)]
pub struct ChainPolicy {
    minimum_difficulty: u64,
    max_block_bytes: PolicyTimeline<u64>,
    min_tx_per_block: PolicyTimeline<usize>,
    max_tx_per_block: PolicyTimeline<usize>,
    max_tx_per_signer_per_block: PolicyTimeline<usize>,
    authorized_miners: PolicyTimeline<MinerSet>,
    permissioned_miners: PolicyTimeline<MinerSet>,
    validators: PolicyTimeline<ValidatorSet>,
}

impl ChainPolicy {
    /// Compose a policy from optional timelines.
    ///
    /// Omitted limits resolve to their type's maximum (`min_tx_per_block`
    /// to 0); omitted miner and validator timelines resolve to empty sets.
    #[allow(clippy::too_many_arguments)]
    pub fn compose(
        minimum_difficulty: u64,
        max_block_bytes: Option<PolicyTimeline<u64>>,
        min_tx_per_block: Option<PolicyTimeline<usize>>,
        max_tx_per_block: Option<PolicyTimeline<usize>>,
        max_tx_per_signer_per_block: Option<PolicyTimeline<usize>>,
        authorized_miners: Option<PolicyTimeline<MinerSet>>,
        permissioned_miners: Option<PolicyTimeline<MinerSet>>,
        validators: Option<PolicyTimeline<ValidatorSet>>,
    ) -> Self {
        Self {
            minimum_difficulty,
            max_block_bytes: max_block_bytes.unwrap_or_else(|| PolicyTimeline::new(u64::MAX)),
            min_tx_per_block: min_tx_per_block.unwrap_or_else(|| PolicyTimeline::new(0)),
            max_tx_per_block: max_tx_per_block.unwrap_or_else(|| PolicyTimeline::new(usize::MAX)),
            max_tx_per_signer_per_block: max_tx_per_signer_per_block
                .unwrap_or_else(|| PolicyTimeline::new(usize::MAX)),
            authorized_miners: authorized_miners.unwrap_or_default(),
            permissioned_miners: permissioned_miners.unwrap_or_default(),
            validators: validators.unwrap_or_default(),
        }
    }

    /// A policy that admits anything with at least `minimum_difficulty`.
    pub fn unrestricted(minimum_difficulty: u64) -> Self {
        Self::compose(minimum_difficulty, None, None, None, None, None, None, None)
    }

    pub fn builder(minimum_difficulty: u64) -> ChainPolicyBuilder {
        ChainPolicyBuilder::new(minimum_difficulty)
    }

    pub fn minimum_difficulty(&self) -> u64 {
        self.minimum_difficulty
    }

    pub fn resolve_max_block_bytes(&self, index: u64) -> u64 {
        self.max_block_bytes.resolve(index)
    }

    pub fn resolve_min_tx_per_block(&self, index: u64) -> usize {
        self.min_tx_per_block.resolve(index)
    }

    pub fn resolve_max_tx_per_block(&self, index: u64) -> usize {
        self.max_tx_per_block.resolve(index)
    }

    pub fn resolve_max_tx_per_signer_per_block(&self, index: u64) -> usize {
        self.max_tx_per_signer_per_block.resolve(index)
    }

    pub fn resolve_authorized_miners(&self, index: u64) -> &MinerSet {
        self.authorized_miners.resolve_ref(index)
    }

    pub fn resolve_permissioned_miners(&self, index: u64) -> &MinerSet {
        self.permissioned_miners.resolve_ref(index)
    }

    pub fn resolve_validator_set(&self, index: u64) -> &ValidatorSet {
        self.validators.resolve_ref(index)
    }

    /// Layer the legacy authorized-miner record on top of the configured
    /// authorized-miner timeline.
    #[must_use]
    pub fn with_legacy_authorized_miners(&self, state: &AuthorizedMinersState) -> Self {
        Self {
            authorized_miners: self.authorized_miners.add(state.to_span()),
            ..self.clone()
        }
    }

    pub fn max_block_bytes(&self) -> &PolicyTimeline<u64> {
        &self.max_block_bytes
    }

    pub fn min_tx_per_block(&self) -> &PolicyTimeline<usize> {
        &self.min_tx_per_block
    }

    pub fn max_tx_per_block(&self) -> &PolicyTimeline<usize> {
        &self.max_tx_per_block
    }

    pub fn max_tx_per_signer_per_block(&self) -> &PolicyTimeline<usize> {
        &self.max_tx_per_signer_per_block
    }

    pub fn authorized_miners(&self) -> &PolicyTimeline<MinerSet> {
        &self.authorized_miners
    }

    pub fn permissioned_miners(&self) -> &PolicyTimeline<MinerSet> {
        &self.permissioned_miners
    }

    pub fn validators(&self) -> &PolicyTimeline<ValidatorSet> {
        &self.validators
    }
}

/// Conversion of the stored legacy record into a timeline span.
pub trait LegacyMinersExt {
    /// `[0, valid_until]` filtered to multiples of `interval`.
    fn to_span(&self) -> Span<MinerSet>;
}

impl LegacyMinersExt for AuthorizedMinersState {
    fn to_span(&self) -> Span<MinerSet> {
        Span::up_to(self.valid_until, self.miners.clone()).with_filter(IndexFilter::every(self.interval))
    }
}

/// Fluent alternative to [`ChainPolicy::compose`].
#[derive(Clone, Debug, Default)]
pub struct ChainPolicyBuilder {
    minimum_difficulty: u64,
    max_block_bytes: Option<PolicyTimeline<u64>>,
    min_tx_per_block: Option<PolicyTimeline<usize>>,
    max_tx_per_block: Option<PolicyTimeline<usize>>,
    max_tx_per_signer_per_block: Option<PolicyTimeline<usize>>,
    authorized_miners: Option<PolicyTimeline<MinerSet>>,
    permissioned_miners: Option<PolicyTimeline<MinerSet>>,
    validators: Option<PolicyTimeline<ValidatorSet>>,
}

impl ChainPolicyBuilder {
    pub fn new(minimum_difficulty: u64) -> Self {
        Self {
            minimum_difficulty,
            ..Self::default()
        }
    }

    pub fn max_block_bytes(mut self, timeline: PolicyTimeline<u64>) -> Self {
        self.max_block_bytes = Some(timeline);
        self
    }

    pub fn min_tx_per_block(mut self, timeline: PolicyTimeline<usize>) -> Self {
        self.min_tx_per_block = Some(timeline);
        self
    }

    pub fn max_tx_per_block(mut self, timeline: PolicyTimeline<usize>) -> Self {
        self.max_tx_per_block = Some(timeline);
        self
    }

    pub fn max_tx_per_signer_per_block(mut self, timeline: PolicyTimeline<usize>) -> Self {
        self.max_tx_per_signer_per_block = Some(timeline);
        self
    }

    pub fn authorized_miners(mut self, timeline: PolicyTimeline<MinerSet>) -> Self {
        self.authorized_miners = Some(timeline);
        self
    }

    pub fn permissioned_miners(mut self, timeline: PolicyTimeline<MinerSet>) -> Self {
        self.permissioned_miners = Some(timeline);
        self
    }

    pub fn validators(mut self, timeline: PolicyTimeline<ValidatorSet>) -> Self {
        self.validators = Some(timeline);
        self
    }

    pub fn build(self) -> ChainPolicy {
        ChainPolicy::compose(
            self.minimum_difficulty,
            self.max_block_bytes,
            self.min_tx_per_block,
            self.max_tx_per_block,
            self.max_tx_per_signer_per_block,
            self.authorized_miners,
            self.permissioned_miners,
            self.validators,
        )
    }
}
