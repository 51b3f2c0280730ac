//! Verification of a finished block commit against a validator set.
//!
//! The vote protocol itself is external; here a commit is valid for
//! `(height, block_hash)` when more than two thirds of the validators in
//! the set signed a matching pre-commit.

use std::collections::HashSet;

use tollgate_core::commit::{BlockCommit, ValidatorSet, VoteFlag};
use tollgate_core::crypto;
use tollgate_core::error::CommitError;
use tollgate_core::types::BlockHash;

/// Check that `commit` proves `block_hash` at `height` under `validators`.
///
/// Every vote must be well-formed; a single bad vote rejects the commit even
/// when the remaining votes would reach quorum.
pub fn verify_commit(
    commit: Option<&BlockCommit>,
    height: u64,
    block_hash: &BlockHash,
    validators: &ValidatorSet,
) -> Result<(), CommitError> {
    let commit = commit.ok_or(CommitError::Absent)?;

    if validators.is_empty() {
        return Err(CommitError::EmptyValidatorSet);
    }
    if commit.height != height {
        return Err(CommitError::HeightMismatch {
            expected: height,
            got: commit.height,
        });
    }
    if commit.block_hash != *block_hash {
        return Err(CommitError::BlockHashMismatch);
    }

    let mut signers = HashSet::with_capacity(commit.votes.len());
    for (index, vote) in commit.votes.iter().enumerate() {
        if vote.flag != VoteFlag::PreCommit {
            return Err(CommitError::WrongVoteFlag { index });
        }
        if vote.height != commit.height
            || vote.round != commit.round
            || vote.block_hash != commit.block_hash
        {
            return Err(CommitError::VoteMismatch { index });
        }
        if !validators.contains(&vote.validator) {
            return Err(CommitError::UnknownValidator { index });
        }
        if !signers.insert(vote.validator) {
            return Err(CommitError::DuplicateVote { index });
        }
        crypto::verify_raw(&vote.validator, &vote.signing_bytes(), &vote.signature)
            .map_err(|_| CommitError::InvalidSignature { index })?;
    }

    let required = validators.quorum();
    if signers.len() < required {
        return Err(CommitError::InsufficientQuorum {
            signed: signers.len(),
            required,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tollgate_core::commit::Vote;
    use tollgate_core::crypto::KeyPair;
    use tollgate_core::types::Hash256;

    fn keys(n: u8) -> Vec<KeyPair> {
        (1..=n).map(|i| KeyPair::from_secret_bytes([i; 32])).collect()
    }

    fn set_of(keys: &[KeyPair]) -> ValidatorSet {
        ValidatorSet::new(keys.iter().map(KeyPair::public_key))
    }

    const HASH: Hash256 = Hash256([0x42; 32]);

    #[test]
    fn full_commit_verifies() {
        let ks = keys(4);
        let commit = BlockCommit::sign_by(&ks, 5, 0, HASH, 1);
        assert!(verify_commit(Some(&commit), 5, &HASH, &set_of(&ks)).is_ok());
    }

    #[test]
    fn quorum_exactly_met() {
        let ks = keys(4);
        let commit = BlockCommit::sign_by(&ks[..3], 5, 0, HASH, 1);
        assert!(verify_commit(Some(&commit), 5, &HASH, &set_of(&ks)).is_ok());
    }

    #[test]
    fn below_quorum_rejected() {
        let ks = keys(4);
        let commit = BlockCommit::sign_by(&ks[..2], 5, 0, HASH, 1);
        assert_eq!(
            verify_commit(Some(&commit), 5, &HASH, &set_of(&ks)).unwrap_err(),
            CommitError::InsufficientQuorum { signed: 2, required: 3 }
        );
    }

    #[test]
    fn one_of_three_rejected() {
        let ks = keys(3);
        let commit = BlockCommit::sign_by(&ks[..1], 5, 0, HASH, 1);
        assert_eq!(
            verify_commit(Some(&commit), 5, &HASH, &set_of(&ks)).unwrap_err(),
            CommitError::InsufficientQuorum { signed: 1, required: 3 }
        );
        let two = BlockCommit::sign_by(&ks[..2], 5, 0, HASH, 1);
        assert_eq!(
            verify_commit(Some(&two), 5, &HASH, &set_of(&ks)).unwrap_err(),
            CommitError::InsufficientQuorum { signed: 2, required: 3 }
        );
    }

    #[test]
    fn three_of_five_rejected() {
        let ks = keys(5);
        let commit = BlockCommit::sign_by(&ks[..3], 5, 0, HASH, 1);
        assert_eq!(
            verify_commit(Some(&commit), 5, &HASH, &set_of(&ks)).unwrap_err(),
            CommitError::InsufficientQuorum { signed: 3, required: 4 }
        );
        let four = BlockCommit::sign_by(&ks[..4], 5, 0, HASH, 1);
        assert!(verify_commit(Some(&four), 5, &HASH, &set_of(&ks)).is_ok());
    }

    #[test]
    fn absent_commit() {
        assert_eq!(
            verify_commit(None, 1, &HASH, &set_of(&keys(1))).unwrap_err(),
            CommitError::Absent
        );
    }

    #[test]
    fn empty_validator_set() {
        let commit = BlockCommit::sign_by(&keys(1), 1, 0, HASH, 1);
        assert_eq!(
            verify_commit(Some(&commit), 1, &HASH, &ValidatorSet::default()).unwrap_err(),
            CommitError::EmptyValidatorSet
        );
    }

    #[test]
    fn wrong_height_or_hash() {
        let ks = keys(1);
        let commit = BlockCommit::sign_by(&ks, 3, 0, HASH, 1);
        assert_eq!(
            verify_commit(Some(&commit), 4, &HASH, &set_of(&ks)).unwrap_err(),
            CommitError::HeightMismatch { expected: 4, got: 3 }
        );
        assert_eq!(
            verify_commit(Some(&commit), 3, &Hash256::ZERO, &set_of(&ks)).unwrap_err(),
            CommitError::BlockHashMismatch
        );
    }

    #[test]
    fn outsider_vote_rejected() {
        let ks = keys(2);
        let commit = BlockCommit::sign_by(&ks, 3, 0, HASH, 1);
        assert_eq!(
            verify_commit(Some(&commit), 3, &HASH, &set_of(&ks[..1])).unwrap_err(),
            CommitError::UnknownValidator { index: 1 }
        );
    }

    #[test]
    fn duplicate_vote_rejected() {
        let ks = keys(4);
        let mut commit = BlockCommit::sign_by(&ks[..2], 3, 0, HASH, 1);
        let dup = commit.votes[0].clone();
        commit.votes.push(dup);
        assert_eq!(
            verify_commit(Some(&commit), 3, &HASH, &set_of(&ks)).unwrap_err(),
            CommitError::DuplicateVote { index: 2 }
        );
    }

    #[test]
    fn prevote_rejected() {
        let ks = keys(1);
        let mut commit = BlockCommit::sign_by(&ks, 3, 0, HASH, 1);
        commit.votes[0] = Vote::sign(&ks[0], 3, 0, HASH, 1, VoteFlag::PreVote);
        assert_eq!(
            verify_commit(Some(&commit), 3, &HASH, &set_of(&ks)).unwrap_err(),
            CommitError::WrongVoteFlag { index: 0 }
        );
    }

    #[test]
    fn vote_for_other_block_rejected() {
        let ks = keys(1);
        let mut commit = BlockCommit::sign_by(&ks, 3, 0, HASH, 1);
        commit.votes[0] = Vote::sign(&ks[0], 3, 0, Hash256::ZERO, 1, VoteFlag::PreCommit);
        assert_eq!(
            verify_commit(Some(&commit), 3, &HASH, &set_of(&ks)).unwrap_err(),
            CommitError::VoteMismatch { index: 0 }
        );
    }

    #[test]
    fn forged_signature_rejected() {
        let ks = keys(1);
        let mut commit = BlockCommit::sign_by(&ks, 3, 0, HASH, 1);
        commit.votes[0].timestamp = 2;
        assert_eq!(
            verify_commit(Some(&commit), 3, &HASH, &set_of(&ks)).unwrap_err(),
            CommitError::InvalidSignature { index: 0 }
        );
    }
}
