//! Block admission at the block's own index.
//!
//! Checks run in a fixed order and the first failure is returned:
//! transaction counts, per-signer counts, encoded size, difficulty, then
//! miner eligibility. Linkage (index, previous hash, transaction root,
//! signature) is the runtime's concern and is not repeated here.
//!
//! The genesis block (index 0) is **not** validated through this module.

use std::collections::HashMap;

use tollgate_core::address::Address;
use tollgate_core::error::BlockViolation;
use tollgate_core::types::Block;
use tracing::debug;

use crate::commit::verify_commit;
use crate::policy::ChainPolicy;

/// Whether `block` is admissible under `policy` at `block.header.index`.
pub fn validate_block(policy: &ChainPolicy, block: &Block) -> Result<(), BlockViolation> {
    let index = block.header.index;

    // --- Transaction count ---

    let count = block.transactions.len();
    let max = policy.resolve_max_tx_per_block(index);
    if count > max {
        return Err(BlockViolation::TooManyTransactions { count, max });
    }
    let min = policy.resolve_min_tx_per_block(index);
    if count < min {
        return Err(BlockViolation::TooFewTransactions { count, min });
    }

    // --- Per-signer count ---

    let max_per_signer = policy.resolve_max_tx_per_signer_per_block(index);
    if let Some((signer, count)) = largest_signer_group(block) {
        if count > max_per_signer {
            return Err(BlockViolation::TooManyTransactionsPerSigner {
                signer,
                count,
                max: max_per_signer,
            });
        }
    }

    // --- Encoded size ---

    let max_bytes = policy.resolve_max_block_bytes(index);
    if max_bytes < u64::MAX {
        let size = block.encoded_size().map_err(BlockViolation::Serialization)?;
        if size > max_bytes {
            return Err(BlockViolation::BlockTooLarge {
                size,
                max: max_bytes,
            });
        }
    }

    // --- Difficulty ---

    if block.header.difficulty < policy.minimum_difficulty() {
        return Err(BlockViolation::DifficultyTooLow {
            got: block.header.difficulty,
            min: policy.minimum_difficulty(),
        });
    }

    // --- Miner eligibility ---

    let miner = block.header.miner;
    let authorized = policy.resolve_authorized_miners(index);
    if !authorized.is_empty() {
        if !authorized.contains(&miner) {
            return Err(BlockViolation::MinerNotAuthorized { miner, index });
        }
        let prev_index = index.saturating_sub(1);
        let validators = policy.resolve_validator_set(prev_index);
        return verify_commit(
            block.header.last_commit.as_ref(),
            prev_index,
            &block.header.prev_hash,
            validators,
        )
        .map_err(|reason| {
            debug!(index, %miner, %reason, "authorized block without valid commit");
            BlockViolation::MissingCommitProof { index, reason }
        });
    }

    let permissioned = policy.resolve_permissioned_miners(index);
    if !permissioned.is_empty() && !permissioned.contains(&miner) {
        return Err(BlockViolation::MinerNotPermissioned { miner, index });
    }

    Ok(())
}

/// The signer with the most transactions in `block`, ties broken by address.
fn largest_signer_group(block: &Block) -> Option<(Address, usize)> {
    let mut counts: HashMap<Address, usize> = HashMap::new();
    for tx in &block.transactions {
        *counts.entry(tx.signer).or_insert(0) += 1;
    }
    counts
        .into_iter()
        .max_by(|(a_signer, a), (b_signer, b)| a.cmp(b).then(b_signer.cmp(a_signer)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;
    use tollgate_core::commit::{BlockCommit, ValidatorSet};
    use tollgate_core::crypto::KeyPair;
    use tollgate_core::error::CommitError;
    use tollgate_core::types::{Action, Hash256, Transaction};

    use crate::policy::MinerSet;
    use crate::span::{IndexFilter, Span};
    use crate::timeline::PolicyTimeline;

    // ------------------------------------------------------------------
    // Helpers
    // ------------------------------------------------------------------

    const PREV: Hash256 = Hash256([0x33; 32]);

    fn key(seed: u8) -> KeyPair {
        KeyPair::from_secret_bytes([seed; 32])
    }

    fn txs(signer: &KeyPair, n: u64) -> Vec<Transaction> {
        (0..n)
            .map(|nonce| {
                let action = Action::Custom { type_id: "noop".into(), payload: vec![] };
                Transaction::create(nonce, signer, Hash256::ZERO, vec![action], 0).unwrap()
            })
            .collect()
    }

    fn make_block(index: u64, miner: &KeyPair, transactions: Vec<Transaction>) -> Block {
        Block::create(index, 0, miner, PREV, 0, None, transactions).unwrap()
    }

    fn make_block_with_commit(index: u64, miner: &KeyPair, commit: Option<BlockCommit>) -> Block {
        Block::create(index, 0, miner, PREV, 0, commit, vec![]).unwrap()
    }

    fn only(miner: &KeyPair) -> MinerSet {
        BTreeSet::from([miner.address()])
    }

    // ------------------------------------------------------------------
    // Counts and size
    // ------------------------------------------------------------------

    #[test]
    fn unrestricted_policy_accepts_anything() {
        let policy = ChainPolicy::unrestricted(0);
        assert!(validate_block(&policy, &make_block(1, &key(1), txs(&key(2), 20))).is_ok());
    }

    #[test]
    fn max_tx_per_block_boundary() {
        let policy = ChainPolicy::builder(0).max_tx_per_block(PolicyTimeline::new(10)).build();
        let signers: Vec<KeyPair> = (10..21).map(key).collect();
        let mut all: Vec<Transaction> = signers.iter().flat_map(|k| txs(k, 1)).collect();

        let last = all.pop().unwrap();
        assert!(validate_block(&policy, &make_block(1, &key(1), all.clone())).is_ok());
        all.push(last);
        assert_eq!(
            validate_block(&policy, &make_block(1, &key(1), all)).unwrap_err(),
            BlockViolation::TooManyTransactions { count: 11, max: 10 }
        );
    }

    #[test]
    fn min_tx_per_block() {
        let policy = ChainPolicy::builder(0).min_tx_per_block(PolicyTimeline::new(1)).build();
        assert_eq!(
            validate_block(&policy, &make_block(1, &key(1), vec![])).unwrap_err(),
            BlockViolation::TooFewTransactions { count: 0, min: 1 }
        );
    }

    #[test]
    fn per_signer_limit_reports_offender() {
        let policy = ChainPolicy::builder(0)
            .max_tx_per_signer_per_block(PolicyTimeline::new(usize::MAX).add(Span::starting_at(2, 5)))
            .build();
        let block_at = |i| make_block(i, &key(1), txs(&key(2), 10));
        assert!(validate_block(&policy, &block_at(1)).is_ok());
        assert_eq!(
            validate_block(&policy, &block_at(2)).unwrap_err(),
            BlockViolation::TooManyTransactionsPerSigner {
                signer: key(2).address(),
                count: 10,
                max: 5,
            }
        );
        assert!(validate_block(&policy, &make_block(2, &key(1), txs(&key(2), 5))).is_ok());
    }

    #[test]
    fn oversized_block_rejected() {
        let block = make_block(1, &key(1), txs(&key(2), 3));
        let size = block.encoded_size().unwrap();
        let fits = ChainPolicy::builder(0).max_block_bytes(PolicyTimeline::new(size)).build();
        assert!(validate_block(&fits, &block).is_ok());
        let tight = ChainPolicy::builder(0).max_block_bytes(PolicyTimeline::new(size - 1)).build();
        assert_eq!(
            validate_block(&tight, &block).unwrap_err(),
            BlockViolation::BlockTooLarge { size, max: size - 1 }
        );
    }

    #[test]
    fn difficulty_below_minimum_rejected() {
        let policy = ChainPolicy::unrestricted(5);
        assert_eq!(
            validate_block(&policy, &make_block(1, &key(1), vec![])).unwrap_err(),
            BlockViolation::DifficultyTooLow { got: 0, min: 5 }
        );
    }

    // ------------------------------------------------------------------
    // Miner eligibility
    // ------------------------------------------------------------------

    #[test]
    fn permissioned_miner_required() {
        let permitted = key(1);
        let policy = ChainPolicy::builder(0)
            .permissioned_miners(PolicyTimeline::default().add(Span::starting_at(1, only(&permitted))))
            .build();
        assert!(validate_block(&policy, &make_block(1, &permitted, vec![])).is_ok());
        assert_eq!(
            validate_block(&policy, &make_block(1, &key(2), vec![])).unwrap_err(),
            BlockViolation::MinerNotPermissioned { miner: key(2).address(), index: 1 }
        );
    }

    fn authorized_policy(authorized: &KeyPair, validator: &KeyPair) -> ChainPolicy {
        ChainPolicy::builder(0)
            .authorized_miners(
                PolicyTimeline::default()
                    .add(Span::between(0, 4, only(authorized)).unwrap().with_filter(IndexFilter::every(2))),
            )
            .permissioned_miners(PolicyTimeline::default().add(Span::starting_at(0, only(&key(50)))))
            .validators(PolicyTimeline::new(ValidatorSet::new([validator.public_key()])))
            .build()
    }

    #[test]
    fn authorized_miner_with_commit_accepted() {
        let (miner, validator) = (key(1), key(2));
        let policy = authorized_policy(&miner, &validator);
        let commit = BlockCommit::sign_by(&[validator], 1, 0, PREV, 0);
        assert!(validate_block(&policy, &make_block_with_commit(2, &miner, Some(commit))).is_ok());
    }

    #[test]
    fn authorized_window_rejects_outsider() {
        let policy = authorized_policy(&key(1), &key(2));
        assert_eq!(
            validate_block(&policy, &make_block(2, &key(3), vec![])).unwrap_err(),
            BlockViolation::MinerNotAuthorized { miner: key(3).address(), index: 2 }
        );
    }

    #[test]
    fn authorized_miner_without_commit_rejected() {
        let policy = authorized_policy(&key(1), &key(2));
        assert_eq!(
            validate_block(&policy, &make_block(2, &key(1), vec![])).unwrap_err(),
            BlockViolation::MissingCommitProof { index: 2, reason: CommitError::Absent }
        );
    }

    #[test]
    fn commit_for_wrong_height_rejected() {
        let (miner, validator) = (key(1), key(2));
        let policy = authorized_policy(&miner, &validator);
        let commit = BlockCommit::sign_by(&[validator], 2, 0, PREV, 0);
        assert!(matches!(
            validate_block(&policy, &make_block_with_commit(2, &miner, Some(commit))),
            Err(BlockViolation::MissingCommitProof {
                reason: CommitError::HeightMismatch { expected: 1, got: 2 },
                ..
            })
        ));
    }

    #[test]
    fn authorized_precedence_ignores_permissioned_set() {
        // key(50) is permissioned everywhere, but index 2 is an authorized index.
        let policy = authorized_policy(&key(1), &key(2));
        assert!(matches!(
            validate_block(&policy, &make_block(2, &key(50), vec![])),
            Err(BlockViolation::MinerNotAuthorized { .. })
        ));
        // At odd indices the authorized rule is inactive and the permissioned one applies.
        assert!(validate_block(&policy, &make_block(3, &key(50), vec![])).is_ok());
    }

    #[test]
    fn largest_group_breaks_ties_deterministically() {
        let block = make_block(1, &key(1), [txs(&key(2), 2), txs(&key(3), 2)].concat());
        let (signer, count) = largest_signer_group(&block).unwrap();
        assert_eq!(count, 2);
        assert_eq!(signer, key(2).address().min(key(3).address()));
    }
}
