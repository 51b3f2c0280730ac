//! Trait interfaces between crates.
//!
//! - [`ChainRuntime`]: staging, proposal, and append (tollgate-consensus implements)
//! - [`NetworkService`]: block broadcast (external transport implements)

use crate::address::Address;
use crate::commit::BlockCommit;
use crate::crypto::KeyPair;
use crate::error::{AppendError, NetworkError, ProposeError, StagingError};
use crate::types::{Asset, Block, BlockHash, Transaction, TxId};

/// The chain the proposer builds on.
///
/// Implementations own the staging area and must serialise its mutations
/// internally; every method takes `&self`.
pub trait ChainRuntime: Send + Sync {
    /// Ids of every staged transaction, in selection order.
    fn staged_transaction_ids(&self) -> Vec<TxId>;

    /// Look up a staged or committed transaction.
    fn get_transaction(&self, txid: &TxId) -> Option<Transaction>;

    /// Validate and stage a transaction for the next block.
    fn stage_transaction(&self, tx: Transaction) -> Result<TxId, StagingError>;

    /// Remove a transaction from the staging area. Returns whether it was staged.
    fn unstage_transaction(&self, txid: &TxId) -> bool;

    /// Build and locally evaluate the next block without appending it.
    ///
    /// Returns [`ProposeError::Cancelled`] if the tip moved while the block
    /// was being assembled.
    fn propose_block(
        &self,
        key: &KeyPair,
        timestamp: u64,
        last_commit: Option<BlockCommit>,
    ) -> Result<Block, ProposeError>;

    /// Validate and append a block. On error the tip is unchanged.
    fn append(&self, block: Block) -> Result<(), AppendError>;

    /// Committed balance of `account` in `asset`.
    fn balance(&self, account: &Address, asset: &Asset) -> u64;

    /// Current tip as `(index, hash)`.
    fn tip(&self) -> (u64, BlockHash);
}

/// Outbound block propagation.
pub trait NetworkService: Send + Sync {
    /// Whether the transport is up. The proposer skips broadcast otherwise.
    fn is_running(&self) -> bool;

    fn broadcast_block(&self, block: &Block) -> Result<(), NetworkError>;
}
