//! Votes, block commits, and validator sets.
//!
//! A [`BlockCommit`] is the finished product of a vote round: the set of
//! pre-commit votes a proposer attaches to its header as `last_commit` to
//! prove the previous block. Verification against a [`ValidatorSet`] lives
//! in the policy crate; this module only defines the data and the
//! deterministic signing bytes.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::crypto::{KeyPair, PublicKey};
use crate::types::{BlockHash, Hash256};

/// Phase of the vote round a [`Vote`] belongs to.
#[derive(
    Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash,
    bincode::Encode, bincode::Decode,
)]
pub enum VoteFlag {
    PreVote,
    PreCommit,
}

impl VoteFlag {
    fn tag(self) -> u8 {
        match self {
            VoteFlag::PreVote => 1,
            VoteFlag::PreCommit => 2,
        }
    }
}

/// A single validator's signed vote on a block.
#[derive(
    Serialize, Deserialize, Clone, Debug, PartialEq, Eq,
    bincode::Encode, bincode::Decode,
)]
pub struct Vote {
    pub height: u64,
    pub round: u32,
    pub block_hash: BlockHash,
    pub timestamp: u64,
    /// Raw Ed25519 key of the voting validator.
    pub validator: [u8; 32],
    pub flag: VoteFlag,
    pub signature: Vec<u8>,
}

impl Vote {
    /// Create a vote signed by `key`.
    pub fn sign(
        key: &KeyPair,
        height: u64,
        round: u32,
        block_hash: BlockHash,
        timestamp: u64,
        flag: VoteFlag,
    ) -> Self {
        let mut vote = Vote {
            height,
            round,
            block_hash,
            timestamp,
            validator: key.public_key().to_bytes(),
            flag,
            signature: Vec::new(),
        };
        vote.signature = key.sign(&vote.signing_bytes()).to_vec();
        vote
    }

    /// Bytes the validator signs.
    ///
    /// Layout: height || round || block_hash || timestamp || validator || flag.
    pub fn signing_bytes(&self) -> Vec<u8> {
        let mut data = Vec::with_capacity(8 + 4 + 32 + 8 + 32 + 1);
        data.extend_from_slice(&self.height.to_le_bytes());
        data.extend_from_slice(&self.round.to_le_bytes());
        data.extend_from_slice(self.block_hash.as_bytes());
        data.extend_from_slice(&self.timestamp.to_le_bytes());
        data.extend_from_slice(&self.validator);
        data.push(self.flag.tag());
        data
    }
}

/// Pre-commit votes proving that `block_hash` was committed at `height`.
#[derive(
    Serialize, Deserialize, Clone, Debug, PartialEq, Eq,
    bincode::Encode, bincode::Decode,
)]
pub struct BlockCommit {
    pub height: u64,
    pub round: u32,
    pub block_hash: BlockHash,
    pub votes: Vec<Vote>,
}

impl BlockCommit {
    /// Collect a pre-commit from every key in `signers`.
    pub fn sign_by(
        signers: &[KeyPair],
        height: u64,
        round: u32,
        block_hash: BlockHash,
        timestamp: u64,
    ) -> Self {
        let votes = signers
            .iter()
            .map(|key| Vote::sign(key, height, round, block_hash, timestamp, VoteFlag::PreCommit))
            .collect();
        BlockCommit {
            height,
            round,
            block_hash,
            votes,
        }
    }

    /// BLAKE3 digest folded into the header hash of the block carrying this commit.
    pub fn digest(&self) -> Hash256 {
        let mut hasher = blake3::Hasher::new();
        hasher.update(&self.height.to_le_bytes());
        hasher.update(&self.round.to_le_bytes());
        hasher.update(self.block_hash.as_bytes());
        hasher.update(&(self.votes.len() as u64).to_le_bytes());
        for vote in &self.votes {
            hasher.update(&vote.signing_bytes());
            hasher.update(&vote.signature);
        }
        Hash256(hasher.finalize().into())
    }
}

/// Ordered, de-duplicated set of validator keys, each with one unit of power.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
#[serde(from = "Vec<PublicKey>", into = "Vec<PublicKey>")]
pub struct ValidatorSet {
    validators: BTreeSet<PublicKey>,
}

impl ValidatorSet {
    pub fn new(validators: impl IntoIterator<Item = PublicKey>) -> Self {
        Self {
            validators: validators.into_iter().collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.validators.len()
    }

    pub fn is_empty(&self) -> bool {
        self.validators.is_empty()
    }

    pub fn contains(&self, key: &[u8; 32]) -> bool {
        self.validators.iter().any(|v| &v.to_bytes() == key)
    }

    pub fn iter(&self) -> impl Iterator<Item = &PublicKey> {
        self.validators.iter()
    }

    /// Distinct pre-commits required: more than two thirds of the set,
    /// `n * 2 / 3 + 1`.
    pub fn quorum(&self) -> usize {
        self.len() * 2 / 3 + 1
    }
}

impl From<Vec<PublicKey>> for ValidatorSet {
    fn from(keys: Vec<PublicKey>) -> Self {
        Self::new(keys)
    }
}

impl From<ValidatorSet> for Vec<PublicKey> {
    fn from(set: ValidatorSet) -> Self {
        set.validators.into_iter().collect()
    }
}
