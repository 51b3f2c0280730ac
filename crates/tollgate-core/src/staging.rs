//! Staging area: transactions accepted for inclusion but not yet in a block.
//!
//! Entries are indexed by [`TxId`] and by `(signer, nonce, txid)` so block
//! assembly can walk them in a deterministic order. The staging area does no
//! policy checks of its own; callers validate before [`insert`](StagedTransactions::insert).

use std::collections::{BTreeSet, HashMap};

use crate::address::Address;
use crate::error::StagingError;
use crate::types::{Block, Transaction, TxId};

/// Default maximum number of staged transactions.
pub const DEFAULT_MAX_STAGED: usize = 10_000;

/// In-memory staging area.
///
/// Not thread-safe; the chain runtime wraps it in a `Mutex`.
#[derive(Debug)]
pub struct StagedTransactions {
    entries: HashMap<TxId, Transaction>,
    /// Selection order: `(signer, nonce, txid)`.
    ordered: BTreeSet<(Address, u64, TxId)>,
    max_count: usize,
}

impl StagedTransactions {
    pub fn new(max_count: usize) -> Self {
        Self {
            entries: HashMap::new(),
            ordered: BTreeSet::new(),
            max_count,
        }
    }

    pub fn with_defaults() -> Self {
        Self::new(DEFAULT_MAX_STAGED)
    }

    /// Stage an already-validated transaction, returning its id.
    pub fn insert(&mut self, tx: Transaction) -> Result<TxId, StagingError> {
        let txid = tx.txid()?;
        if self.entries.contains_key(&txid) {
            return Err(StagingError::AlreadyStaged(txid));
        }
        if self.entries.len() >= self.max_count {
            return Err(StagingError::PoolFull);
        }
        self.ordered.insert((tx.signer, tx.nonce, txid));
        self.entries.insert(txid, tx);
        Ok(txid)
    }

    /// Unstage by id. Returns `None` if the id was not staged.
    pub fn remove(&mut self, txid: &TxId) -> Option<Transaction> {
        let tx = self.entries.remove(txid)?;
        self.ordered.remove(&(tx.signer, tx.nonce, *txid));
        Some(tx)
    }

    /// Drop every staged transaction that `block` includes.
    pub fn remove_included(&mut self, block: &Block) -> usize {
        block
            .transactions
            .iter()
            .filter_map(|tx| tx.txid().ok())
            .filter(|txid| self.remove(txid).is_some())
            .count()
    }

    pub fn contains(&self, txid: &TxId) -> bool {
        self.entries.contains_key(txid)
    }

    pub fn get(&self, txid: &TxId) -> Option<&Transaction> {
        self.entries.get(txid)
    }

    /// Staged ids in selection order.
    pub fn ids(&self) -> Vec<TxId> {
        self.ordered.iter().map(|(_, _, txid)| *txid).collect()
    }

    /// Staged transactions in selection order.
    pub fn iter_ordered(&self) -> impl Iterator<Item = (&TxId, &Transaction)> {
        self.ordered
            .iter()
            .filter_map(|(_, _, txid)| self.entries.get_key_value(txid))
    }

    /// Ids of every staged transaction signed by `signer`.
    pub fn ids_by_signer(&self, signer: &Address) -> Vec<TxId> {
        self.ordered
            .iter()
            .filter(|(s, _, _)| s == signer)
            .map(|(_, _, txid)| *txid)
            .collect()
    }

    /// Highest staged nonce for `signer`, if any.
    pub fn max_nonce(&self, signer: &Address) -> Option<u64> {
        self.ordered
            .iter()
            .filter(|(s, _, _)| s == signer)
            .map(|(_, nonce, _)| *nonce)
            .max()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for StagedTransactions {
    fn default() -> Self {
        Self::with_defaults()
    }
}
