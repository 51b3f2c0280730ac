//! In-memory chain runtime.
//!
//! Keeps the block list, the committed [`Ledger`] and the staging area, and
//! implements [`ChainRuntime`] on top of the policy validators:
//!
//! - staging runs the structural check and [`validate_tx`] at `tip + 1`;
//! - proposal selects staged transactions in `(signer, nonce, id)` order,
//!   re-validates and evaluates them on a scratch ledger, then checks the
//!   assembled block with [`validate_block`];
//! - append re-checks everything and commits atomically.
//!
//! Lock order is `state` before `staged`.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use tracing::{debug, info};

use tollgate_core::activation::ActivationState;
use tollgate_core::address::Address;
use tollgate_core::commit::BlockCommit;
use tollgate_core::crypto::KeyPair;
use tollgate_core::error::{AppendError, ProposeError, StagingError, TxViolation};
use tollgate_core::genesis::GenesisState;
use tollgate_core::staging::StagedTransactions;
use tollgate_core::traits::ChainRuntime;
use tollgate_core::types::{Action, Asset, Block, BlockHash, Transaction, TxId};
use tollgate_policy::{validate_block, validate_tx, validate_tx_structure, ChainPolicy, TxFacts};

use crate::ledger::Ledger;

/// Committed chain state. Replaced wholesale on append.
#[derive(Debug, Clone)]
struct ChainState {
    blocks: Vec<Block>,
    tip_hash: BlockHash,
    ledger: Ledger,
    /// Committed transaction id to block index.
    committed: HashMap<TxId, u64>,
    /// Next nonce per signer, derived from committed transactions.
    next_nonce: HashMap<Address, u64>,
}

impl ChainState {
    fn tip_index(&self) -> u64 {
        // The genesis block is always present.
        self.blocks.len().saturating_sub(1) as u64
    }
}

/// The reference [`ChainRuntime`].
pub struct Chain {
    policy: Arc<ChainPolicy>,
    genesis_hash: BlockHash,
    state: RwLock<ChainState>,
    staged: Mutex<StagedTransactions>,
}

impl fmt::Debug for Chain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (index, hash) = self.tip();
        f.debug_struct("Chain")
            .field("tip_index", &index)
            .field("tip_hash", &hash)
            .finish_non_exhaustive()
    }
}

impl Chain {
    /// Start a chain at `genesis`, seeded with `genesis_state`.
    ///
    /// A legacy authorized-miner record in the genesis state is folded into
    /// the policy as one more authorized-miner span.
    pub fn new(policy: Arc<ChainPolicy>, genesis: Block, genesis_state: GenesisState) -> Self {
        let policy = match &genesis_state.authorized_miners {
            Some(record) => Arc::new(policy.with_legacy_authorized_miners(record)),
            None => policy,
        };
        let genesis_hash = genesis.hash();
        let committed = genesis
            .transactions
            .iter()
            .filter_map(|tx| tx.txid().ok())
            .map(|txid| (txid, 0))
            .collect();
        let state = ChainState {
            blocks: vec![genesis],
            tip_hash: genesis_hash,
            ledger: Ledger::from_genesis(&genesis_state),
            committed,
            next_nonce: HashMap::new(),
        };
        info!(%genesis_hash, "chain initialised");
        Self {
            policy,
            genesis_hash,
            state: RwLock::new(state),
            staged: Mutex::new(StagedTransactions::with_defaults()),
        }
    }

    /// Use a staging area with a different capacity.
    pub fn with_staging_capacity(self, max_count: usize) -> Self {
        *self.staged.lock() = StagedTransactions::new(max_count);
        self
    }

    pub fn policy(&self) -> &ChainPolicy {
        &self.policy
    }

    pub fn genesis_hash(&self) -> BlockHash {
        self.genesis_hash
    }

    /// Snapshot of the committed activation records.
    pub fn activation(&self) -> ActivationState {
        self.state.read().ledger.activation().clone()
    }

    pub fn block_at(&self, index: u64) -> Option<Block> {
        let state = self.state.read();
        usize::try_from(index)
            .ok()
            .and_then(|i| state.blocks.get(i).cloned())
    }

    pub fn staged_len(&self) -> usize {
        self.staged.lock().len()
    }

    /// Sign `actions` with the next free nonce for `key` and stage the result.
    pub fn make_transaction(
        &self,
        key: &KeyPair,
        actions: Vec<Action>,
        timestamp: u64,
    ) -> Result<TxId, StagingError> {
        let signer = key.address();
        let nonce = {
            let state = self.state.read();
            let committed = state.next_nonce.get(&signer).copied().unwrap_or(0);
            let staged = self.staged.lock().max_nonce(&signer).map_or(0, |n| n + 1);
            committed.max(staged)
        };
        let tx = Transaction::create(nonce, key, self.genesis_hash, actions, timestamp)?;
        self.stage_transaction(tx)
    }

    fn check_tx(activation: &ActivationState, height: u64, tx: &Transaction) -> Result<(), TxViolation> {
        validate_tx_structure(tx)?;
        validate_tx(&TxFacts::new(height, activation), tx)
    }
}

impl ChainRuntime for Chain {
    fn staged_transaction_ids(&self) -> Vec<TxId> {
        self.staged.lock().ids()
    }

    fn get_transaction(&self, txid: &TxId) -> Option<Transaction> {
        let state = self.state.read();
        if let Some(tx) = self.staged.lock().get(txid) {
            return Some(tx.clone());
        }
        let index = usize::try_from(*state.committed.get(txid)?).ok()?;
        state.blocks.get(index)?.transactions.iter().find(|tx| tx.txid().ok() == Some(*txid)).cloned()
    }

    fn stage_transaction(&self, tx: Transaction) -> Result<TxId, StagingError> {
        let state = self.state.read();
        let txid = tx.txid()?;
        if state.committed.contains_key(&txid) {
            return Err(StagingError::AlreadyCommitted(txid));
        }
        Self::check_tx(state.ledger.activation(), state.tip_index() + 1, &tx)?;
        let txid = self.staged.lock().insert(tx)?;
        debug!(%txid, "staged transaction");
        Ok(txid)
    }

    fn unstage_transaction(&self, txid: &TxId) -> bool {
        self.staged.lock().remove(txid).is_some()
    }

    fn propose_block(
        &self,
        key: &KeyPair,
        timestamp: u64,
        last_commit: Option<BlockCommit>,
    ) -> Result<Block, ProposeError> {
        let (tip_index, tip_hash, mut ledger) = {
            let state = self.state.read();
            (state.tip_index(), state.tip_hash, state.ledger.clone())
        };
        let index = tip_index + 1;
        let candidates: Vec<(TxId, Transaction)> = self
            .staged
            .lock()
            .iter_ordered()
            .map(|(txid, tx)| (*txid, tx.clone()))
            .collect();

        // --- Selection ---

        let max_txs = self.policy.resolve_max_tx_per_block(index);
        let max_per_signer = self.policy.resolve_max_tx_per_signer_per_block(index);
        let mut per_signer: HashMap<Address, usize> = HashMap::new();
        let mut selected = Vec::new();

        for (txid, tx) in candidates {
            if selected.len() >= max_txs {
                break;
            }
            let count = per_signer.entry(tx.signer).or_insert(0);
            if *count >= max_per_signer {
                continue;
            }
            Self::check_tx(ledger.activation(), index, &tx)
                .map_err(|source| ProposeError::InvalidTx { tx_id: txid, source })?;
            ledger
                .apply_transaction(&tx, index)
                .map_err(|e| ProposeError::ActionFailed {
                    tx_id: Some(txid),
                    reason: e.to_string(),
                })?;
            *count += 1;
            selected.push(tx);
        }

        // --- Block actions ---

        // Same rule as append: an overflowing reward is skipped.
        if let Err(e) = ledger.apply_block_reward(&key.address(), index) {
            debug!(index, error = %e, "block reward not credited");
        }

        // --- Assembly ---

        let block = Block::create(
            index,
            timestamp,
            key,
            tip_hash,
            self.policy.minimum_difficulty(),
            last_commit,
            selected,
        )
        .map_err(|e| ProposeError::Internal(e.to_string()))?;
        validate_block(&self.policy, &block)?;

        if self.state.read().tip_hash != tip_hash {
            debug!(index, "tip moved during proposal");
            return Err(ProposeError::Cancelled);
        }
        debug!(index, txs = block.transactions.len(), "proposed block");
        Ok(block)
    }

    fn append(&self, block: Block) -> Result<(), AppendError> {
        let mut state = self.state.write();
        let index = block.header.index;

        // --- Linkage ---

        let expected = state.tip_index() + 1;
        if index != expected {
            return Err(AppendError::IndexMismatch {
                expected,
                got: index,
            });
        }
        if block.header.prev_hash != state.tip_hash {
            return Err(AppendError::InvalidPrevHash);
        }
        if !block.tx_hash_matches().unwrap_or(false) {
            return Err(AppendError::InvalidTxHash);
        }
        if !block.verify_signature() {
            return Err(AppendError::InvalidBlockSignature);
        }

        // --- Policy ---

        validate_block(&self.policy, &block)?;

        // --- Evaluation ---

        let mut ledger = state.ledger.clone();
        let mut seen = HashSet::with_capacity(block.transactions.len());
        let mut next_nonce = state.next_nonce.clone();
        for (i, tx) in block.transactions.iter().enumerate() {
            let txid = tx
                .txid()
                .map_err(|source| AppendError::Transaction { index: i, source })?;
            if !seen.insert(txid) || state.committed.contains_key(&txid) {
                return Err(AppendError::DuplicateTx(txid));
            }
            Self::check_tx(ledger.activation(), index, tx)
                .map_err(|source| AppendError::Transaction { index: i, source })?;
            ledger
                .apply_transaction(tx, index)
                .map_err(|e| AppendError::ActionFailed {
                    tx_id: txid,
                    reason: e.to_string(),
                })?;
            let nonce = next_nonce.entry(tx.signer).or_insert(0);
            *nonce = (*nonce).max(tx.nonce.saturating_add(1));
        }
        // An overflowing reward is not credited; the block stays valid.
        if let Err(e) = ledger.apply_block_reward(block.miner(), index) {
            debug!(index, error = %e, "block reward not credited");
        }

        // --- Commit ---

        let hash = block.hash();
        state.committed.extend(seen.into_iter().map(|txid| (txid, index)));
        state.ledger = ledger;
        state.next_nonce = next_nonce;
        state.tip_hash = hash;
        let txs = block.transactions.len();
        let miner = *block.miner();
        let removed = self.staged.lock().remove_included(&block);
        state.blocks.push(block);
        info!(index, %hash, %miner, txs, unstaged = removed, "appended block");
        Ok(())
    }

    fn balance(&self, account: &Address, asset: &Asset) -> u64 {
        self.state.read().ledger.balance(account, asset)
    }

    fn tip(&self) -> (u64, BlockHash) {
        let state = self.state.read();
        (state.tip_index(), state.tip_hash)
    }
}
