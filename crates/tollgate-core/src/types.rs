//! Core protocol types: transactions, actions, blocks.
//!
//! Transactions are account-based: each carries a signer address, the
//! signer's Ed25519 public key, a nonce, and an ordered list of actions.
//! All numeric fields use u64 per protocol convention.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

use crate::address::Address;
use crate::commit::BlockCommit;
use crate::crypto::{KeyPair, PublicKey};
use crate::error::TxViolation;
use crate::merkle;

/// A 32-byte hash value.
///
/// Used for transaction IDs (BLAKE3), block hashes (double SHA-256),
/// and transaction roots (BLAKE3).
#[derive(
    Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Default,
    bincode::Encode, bincode::Decode,
)]
pub struct Hash256(pub [u8; 32]);

impl Hash256 {
    /// The zero hash (32 zero bytes). Used as the genesis parent.
    pub const ZERO: Self = Self([0u8; 32]);

    /// Create a Hash256 from a byte array.
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Return the underlying bytes.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Check if this is the zero hash.
    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; 32]
    }
}

impl fmt::Display for Hash256 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for byte in &self.0 {
            write!(f, "{byte:02x}")?;
        }
        Ok(())
    }
}

impl From<[u8; 32]> for Hash256 {
    fn from(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }
}

impl AsRef<[u8]> for Hash256 {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

/// Transaction identifier: BLAKE3 of the canonical encoding.
pub type TxId = Hash256;

/// Block identifier: double SHA-256 of the header layout.
pub type BlockHash = Hash256;

/// Ticker identifying a fungible asset, e.g. `GOLD`.
#[derive(
    Serialize, Deserialize, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord,
    bincode::Encode, bincode::Decode,
)]
#[serde(transparent)]
pub struct Asset(pub String);

impl Asset {
    pub fn new(ticker: impl Into<String>) -> Self {
        Self(ticker.into())
    }
}

impl fmt::Display for Asset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A state-transition request carried by a transaction or injected by the
/// chain during block evaluation.
#[derive(
    Serialize, Deserialize, Clone, Debug, PartialEq, Eq,
    bincode::Encode, bincode::Decode,
)]
pub enum Action {
    /// Add `address` to the activated-account set. Only the admin may issue it.
    ActivateAccount { address: Address },
    /// Move `amount` of `asset` from the signer to `recipient`.
    Transfer { recipient: Address, asset: Asset, amount: u64 },
    /// Application action with no effect on the admission state.
    Custom { type_id: String, payload: Vec<u8> },
    /// Block reward credited by the chain itself. Never valid inside a transaction.
    MiningReward { recipient: Address, asset: Asset, amount: u64 },
}

impl Action {
    /// Whether this action may only be injected by the chain at block evaluation.
    pub fn is_block_action(&self) -> bool {
        matches!(self, Action::MiningReward { .. })
    }
}

/// A signed, account-based transaction.
#[derive(
    Serialize, Deserialize, Clone, Debug, PartialEq, Eq,
    bincode::Encode, bincode::Decode,
)]
pub struct Transaction {
    /// Per-signer sequence number.
    pub nonce: u64,
    /// Account that signed the transaction.
    pub signer: Address,
    /// Ed25519 public key of the signer (32 bytes).
    pub public_key: [u8; 32],
    /// Hash of the genesis block of the chain this transaction targets.
    pub genesis_hash: BlockHash,
    /// Unix timestamp in seconds chosen by the signer.
    pub timestamp: u64,
    /// Ordered actions to evaluate.
    pub actions: Vec<Action>,
    /// Ed25519 signature (64 bytes) over [`signing_hash`](Self::signing_hash).
    pub signature: Vec<u8>,
}

impl Transaction {
    /// Build and sign a transaction for `keypair`.
    pub fn create(
        nonce: u64,
        keypair: &KeyPair,
        genesis_hash: BlockHash,
        actions: Vec<Action>,
        timestamp: u64,
    ) -> Result<Self, TxViolation> {
        let public_key = keypair.public_key();
        let mut tx = Transaction {
            nonce,
            signer: Address::from_public_key(&public_key),
            public_key: public_key.to_bytes(),
            genesis_hash,
            timestamp,
            actions,
            signature: Vec::new(),
        };
        let sighash = tx.signing_hash()?;
        tx.signature = keypair.sign(sighash.as_bytes()).to_vec();
        Ok(tx)
    }

    /// Compute the transaction ID (BLAKE3 hash of the canonical encoding).
    ///
    /// Uses bincode with standard config for deterministic serialization.
    pub fn txid(&self) -> Result<TxId, TxViolation> {
        let encoded = bincode::encode_to_vec(self, bincode::config::standard())
            .map_err(|e| TxViolation::Serialization(e.to_string()))?;
        Ok(Hash256(blake3::hash(&encoded).into()))
    }

    /// Hash the signer commits to: the canonical encoding with an empty signature.
    pub fn signing_hash(&self) -> Result<Hash256, TxViolation> {
        let unsigned = Transaction {
            signature: Vec::new(),
            ..self.clone()
        };
        let encoded = bincode::encode_to_vec(&unsigned, bincode::config::standard())
            .map_err(|e| TxViolation::Serialization(e.to_string()))?;
        Ok(Hash256(blake3::hash(&encoded).into()))
    }

    /// Check that the public key belongs to `signer` and the signature verifies.
    pub fn verify_signature(&self) -> Result<(), TxViolation> {
        if Address::from_public_key_bytes(&self.public_key) != self.signer {
            return Err(TxViolation::SignerMismatch);
        }
        let pk = PublicKey::from_bytes(&self.public_key)
            .map_err(|_| TxViolation::InvalidSignature)?;
        let sig: [u8; 64] = self
            .signature
            .as_slice()
            .try_into()
            .map_err(|_| TxViolation::InvalidSignature)?;
        let sighash = self.signing_hash()?;
        pk.verify(sighash.as_bytes(), &sig)
            .map_err(|_| TxViolation::InvalidSignature)
    }
}

/// Block header.
///
/// Hash is computed as double SHA-256 over a fixed little-endian byte layout.
#[derive(
    Serialize, Deserialize, Clone, Debug, PartialEq, Eq,
    bincode::Encode, bincode::Decode,
)]
pub struct BlockHeader {
    /// Height of this block; genesis is 0.
    pub index: u64,
    /// Unix timestamp in seconds.
    pub timestamp: u64,
    /// Proposer of this block.
    pub miner: Address,
    /// Ed25519 public key of the proposer.
    pub public_key: [u8; 32],
    /// Hash of the previous block.
    pub prev_hash: BlockHash,
    /// Merkle root of the ordered transaction IDs.
    pub tx_hash: Hash256,
    /// Difficulty stamped by the proposer.
    pub difficulty: u64,
    /// Commit proving the previous block, when the proposer has one.
    pub last_commit: Option<BlockCommit>,
}

impl BlockHeader {
    /// Compute the block hash (double SHA-256).
    ///
    /// Layout: index || timestamp || miner || public_key || prev_hash ||
    /// tx_hash || difficulty || commit digest (zero hash when absent).
    pub fn hash(&self) -> BlockHash {
        let mut data = Vec::with_capacity(3 * 8 + 20 + 4 * 32);
        data.extend_from_slice(&self.index.to_le_bytes());
        data.extend_from_slice(&self.timestamp.to_le_bytes());
        data.extend_from_slice(self.miner.as_bytes());
        data.extend_from_slice(&self.public_key);
        data.extend_from_slice(self.prev_hash.as_bytes());
        data.extend_from_slice(self.tx_hash.as_bytes());
        data.extend_from_slice(&self.difficulty.to_le_bytes());
        let commit_digest = self
            .last_commit
            .as_ref()
            .map(BlockCommit::digest)
            .unwrap_or(Hash256::ZERO);
        data.extend_from_slice(commit_digest.as_bytes());
        let first = Sha256::digest(&data);
        Hash256(Sha256::digest(first).into())
    }
}

/// A complete block: header, transactions, and the proposer's signature.
#[derive(
    Serialize, Deserialize, Clone, Debug, PartialEq, Eq,
    bincode::Encode, bincode::Decode,
)]
pub struct Block {
    pub header: BlockHeader,
    /// Ordered list of transactions.
    pub transactions: Vec<Transaction>,
    /// Ed25519 signature of the proposer over the header hash.
    pub signature: Vec<u8>,
}

impl Block {
    /// Assemble and sign a block for `keypair`.
    ///
    /// Fills `miner`, `public_key`, and `tx_hash` from the inputs.
    #[allow(clippy::too_many_arguments)]
    pub fn create(
        index: u64,
        timestamp: u64,
        keypair: &KeyPair,
        prev_hash: BlockHash,
        difficulty: u64,
        last_commit: Option<BlockCommit>,
        transactions: Vec<Transaction>,
    ) -> Result<Self, TxViolation> {
        let txids = transactions
            .iter()
            .map(Transaction::txid)
            .collect::<Result<Vec<_>, _>>()?;
        let public_key = keypair.public_key();
        let header = BlockHeader {
            index,
            timestamp,
            miner: Address::from_public_key(&public_key),
            public_key: public_key.to_bytes(),
            prev_hash,
            tx_hash: merkle::merkle_root(&txids),
            difficulty,
            last_commit,
        };
        let signature = keypair.sign(header.hash().as_bytes()).to_vec();
        Ok(Block {
            header,
            transactions,
            signature,
        })
    }

    pub fn hash(&self) -> BlockHash {
        self.header.hash()
    }

    pub fn index(&self) -> u64 {
        self.header.index
    }

    pub fn miner(&self) -> &Address {
        &self.header.miner
    }

    /// Serialized size in bytes under the canonical encoding.
    pub fn encoded_size(&self) -> Result<u64, String> {
        bincode::encode_to_vec(self, bincode::config::standard())
            .map(|bytes| bytes.len() as u64)
            .map_err(|e| e.to_string())
    }

    /// Recompute the transaction root and compare it to the header.
    pub fn tx_hash_matches(&self) -> Result<bool, TxViolation> {
        let txids = self
            .transactions
            .iter()
            .map(Transaction::txid)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(merkle::merkle_root(&txids) == self.header.tx_hash)
    }

    /// Verify the proposer's signature and that the key belongs to `miner`.
    pub fn verify_signature(&self) -> bool {
        if Address::from_public_key_bytes(&self.header.public_key) != self.header.miner {
            return false;
        }
        let Ok(pk) = PublicKey::from_bytes(&self.header.public_key) else {
            return false;
        };
        let Ok(sig) = <[u8; 64]>::try_from(self.signature.as_slice()) else {
            return false;
        };
        pk.verify(self.hash().as_bytes(), &sig).is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn keypair(seed: u8) -> KeyPair {
        KeyPair::from_secret_bytes([seed; 32])
    }

    fn sample_tx(seed: u8, actions: Vec<Action>) -> Transaction {
        Transaction::create(0, &keypair(seed), Hash256([0x11; 32]), actions, 1_000).unwrap()
    }

    #[test]
    fn hash256_display_is_hex() {
        let h = Hash256([0xAB; 32]);
        assert_eq!(h.to_string(), "ab".repeat(32));
    }

    #[test]
    fn created_transaction_verifies() {
        let tx = sample_tx(1, vec![]);
        assert_eq!(tx.signer, Address::from_public_key(&keypair(1).public_key()));
        assert!(tx.verify_signature().is_ok());
    }

    #[test]
    fn tampered_transaction_fails_verification() {
        let mut tx = sample_tx(1, vec![]);
        tx.nonce = 9;
        assert_eq!(tx.verify_signature().unwrap_err(), TxViolation::InvalidSignature);
    }

    #[test]
    fn foreign_public_key_is_signer_mismatch() {
        let mut tx = sample_tx(1, vec![]);
        tx.public_key = keypair(2).public_key().to_bytes();
        assert_eq!(tx.verify_signature().unwrap_err(), TxViolation::SignerMismatch);
    }

    #[test]
    fn txid_deterministic_and_distinct() {
        let a = sample_tx(1, vec![]);
        let b = sample_tx(2, vec![]);
        assert_eq!(a.txid().unwrap(), a.clone().txid().unwrap());
        assert_ne!(a.txid().unwrap(), b.txid().unwrap());
    }

    #[test]
    fn mining_reward_is_block_action() {
        let reward = Action::MiningReward {
            recipient: Address([1; 20]),
            asset: Asset::new("GOLD"),
            amount: 10,
        };
        assert!(reward.is_block_action());
        assert!(!Action::ActivateAccount { address: Address([1; 20]) }.is_block_action());
    }

    #[test]
    fn block_create_signs_and_commits_to_transactions() {
        let kp = keypair(3);
        let txs = vec![sample_tx(1, vec![]), sample_tx(2, vec![])];
        let block = Block::create(1, 10, &kp, Hash256([0x22; 32]), 0, None, txs).unwrap();
        assert!(block.verify_signature());
        assert!(block.tx_hash_matches().unwrap());
        assert_eq!(block.miner(), &Address::from_public_key(&kp.public_key()));
    }

    #[test]
    fn block_hash_changes_with_header() {
        let kp = keypair(3);
        let block = Block::create(1, 10, &kp, Hash256::ZERO, 0, None, vec![]).unwrap();
        let mut other = block.clone();
        other.header.index = 2;
        assert_ne!(block.hash(), other.hash());
        assert!(!other.verify_signature());
    }

    #[test]
    fn encoded_size_grows_with_transactions() {
        let kp = keypair(3);
        let empty = Block::create(1, 10, &kp, Hash256::ZERO, 0, None, vec![]).unwrap();
        let full = Block::create(1, 10, &kp, Hash256::ZERO, 0, None, vec![sample_tx(1, vec![])])
            .unwrap();
        assert!(full.encoded_size().unwrap() > empty.encoded_size().unwrap());
    }
}
