//! Error types for the Tollgate admission-policy engine.
use thiserror::Error;

use crate::address::Address;
use crate::types::TxId;

/// Why a transaction may not enter the staging area or a block.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TxViolation {
    #[error("signer {signer} is not activated")] NotActivated { signer: Address },
    #[error("too many actions: {count} > {max}")] TooManyActions { count: usize, max: usize },
    #[error("block action at position {index} cannot be submitted in a transaction")] BlockActionInTransaction { index: usize },
    #[error("signer does not match the attached public key")] SignerMismatch,
    #[error("invalid transaction signature")] InvalidSignature,
    #[error("serialization: {0}")] Serialization(String),
}

/// Why a `lastCommit` does not prove the previous block.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CommitError {
    #[error("no commit supplied")] Absent,
    #[error("validator set is empty")] EmptyValidatorSet,
    #[error("commit height mismatch: expected {expected}, got {got}")] HeightMismatch { expected: u64, got: u64 },
    #[error("commit does not reference the previous block")] BlockHashMismatch,
    #[error("vote {index} is not a pre-commit")] WrongVoteFlag { index: usize },
    #[error("vote {index} does not match the commit")] VoteMismatch { index: usize },
    #[error("vote {index} is signed by a key outside the validator set")] UnknownValidator { index: usize },
    #[error("vote {index} has an invalid signature")] InvalidSignature { index: usize },
    #[error("vote {index} duplicates an earlier validator")] DuplicateVote { index: usize },
    #[error("insufficient quorum: {signed} of {required} required signatures")] InsufficientQuorum { signed: usize, required: usize },
}

/// Why a candidate block is not admissible at its index.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BlockViolation {
    #[error("too many transactions: {count} > {max}")] TooManyTransactions { count: usize, max: usize },
    #[error("too few transactions: {count} < {min}")] TooFewTransactions { count: usize, min: usize },
    #[error("signer {signer} has {count} transactions, limit {max}")] TooManyTransactionsPerSigner { signer: Address, count: usize, max: usize },
    #[error("block too large: {size} > {max} bytes")] BlockTooLarge { size: u64, max: u64 },
    #[error("difficulty {got} below minimum {min}")] DifficultyTooLow { got: u64, min: u64 },
    #[error("miner {miner} is not authorized at index {index}")] MinerNotAuthorized { miner: Address, index: u64 },
    #[error("miner {miner} is not permissioned at index {index}")] MinerNotPermissioned { miner: Address, index: u64 },
    #[error("missing commit proof at index {index}: {reason}")] MissingCommitProof { index: u64, #[source] reason: CommitError },
    #[error("serialization: {0}")] Serialization(String),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PolicyError {
    #[error("invalid span: end {end} is before start {start}")] InvalidSpan { start: u64, end: u64 },
    #[error("invalid address in policy: {0}")] InvalidAddress(String),
    #[error("invalid validator key in policy: {0}")] InvalidValidatorKey(String),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CryptoError {
    #[error("invalid public key bytes")] InvalidPublicKey,
    #[error("invalid signature bytes")] InvalidSignature,
    #[error("signature verification failed")] VerificationFailed,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AddressError {
    #[error("invalid hex: {0}")] InvalidHex(String),
    #[error("invalid length: expected 20 bytes, got {0}")] InvalidLength(usize),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StagingError {
    #[error("transaction already staged: {0}")] AlreadyStaged(TxId),
    #[error("transaction already committed: {0}")] AlreadyCommitted(TxId),
    #[error("staging area full")] PoolFull,
    #[error("rejected: {0}")] Rejected(#[from] TxViolation),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum NetworkError {
    #[error("network service is not running")] NotRunning,
    #[error("transport: {0}")] Transport(String),
}

/// Outcome of a failed local proposal.
///
/// `Cancelled` is an expected race (the tip moved while the block was being
/// assembled), not a failure.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProposeError {
    #[error("proposal cancelled: tip changed")] Cancelled,
    #[error("invalid transaction {tx_id}: {source}")] InvalidTx { tx_id: TxId, source: TxViolation },
    #[error("action execution failed: {reason}")] ActionFailed { tx_id: Option<TxId>, reason: String },
    #[error(transparent)] Block(#[from] BlockViolation),
    #[error("internal: {0}")] Internal(String),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AppendError {
    #[error("index mismatch: expected {expected}, got {got}")] IndexMismatch { expected: u64, got: u64 },
    #[error("previous hash does not match the tip")] InvalidPrevHash,
    #[error("transaction hash does not match the transactions")] InvalidTxHash,
    #[error("block signature does not verify against the miner key")] InvalidBlockSignature,
    #[error(transparent)] Policy(#[from] BlockViolation),
    #[error("tx error in {index}: {source}")] Transaction { index: usize, source: TxViolation },
    #[error("action execution failed in {tx_id}: {reason}")] ActionFailed { tx_id: TxId, reason: String },
    #[error("duplicate transaction in block: {0}")] DuplicateTx(TxId),
}

#[derive(Error, Debug)]
pub enum TollgateError {
    #[error(transparent)] Transaction(#[from] TxViolation),
    #[error(transparent)] Block(#[from] BlockViolation),
    #[error(transparent)] Commit(#[from] CommitError),
    #[error(transparent)] Policy(#[from] PolicyError),
    #[error(transparent)] Crypto(#[from] CryptoError),
    #[error(transparent)] Address(#[from] AddressError),
    #[error(transparent)] Staging(#[from] StagingError),
    #[error(transparent)] Propose(#[from] ProposeError),
    #[error(transparent)] Append(#[from] AppendError),
    #[error(transparent)] Network(#[from] NetworkError),
    #[error("config: {0}")] Config(String),
}
