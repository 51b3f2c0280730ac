//! Block proposer.
//!
//! One [`Proposer::propose`] call is one attempt: evict banned signers,
//! ask the runtime for a block, append it, broadcast it. Transactions the
//! runtime blames for a failure are unstaged before the call returns, on
//! every exit path. Retrying is the caller's job.
//!
//! The block is appended to the local chain before it is broadcast, so a
//! block this node would reject never reaches peers. A plain
//! propose-and-broadcast miner leaves the local append to the network
//! round trip instead; this ordering is a deliberate difference.

use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use tracing::{debug, error, info, warn};

use tollgate_core::address::Address;
use tollgate_core::commit::BlockCommit;
use tollgate_core::crypto::KeyPair;
use tollgate_core::error::{AppendError, ProposeError};
use tollgate_core::traits::{ChainRuntime, NetworkService};
use tollgate_core::types::{Block, TxId};

/// Accounts whose transactions are never proposed.
pub type BannedAccounts = BTreeSet<Address>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ProposerState {
    #[default]
    Idle,
    Proposing,
    Done,
}

/// Result of one proposal attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProposalOutcome {
    /// The block was appended to the local chain.
    Proposed(Block),
    /// The tip moved underneath the attempt. Not an error.
    Cancelled,
    /// The runtime rejected these staged transactions; they were unstaged.
    Evicted(Vec<TxId>),
    Failed(String),
}

type Clock = Box<dyn Fn() -> DateTime<Utc> + Send + Sync>;

pub struct Proposer {
    runtime: Arc<dyn ChainRuntime>,
    key: KeyPair,
    banned: BannedAccounts,
    network: Option<Arc<dyn NetworkService>>,
    clock: Clock,
    state: Mutex<ProposerState>,
}

impl fmt::Debug for Proposer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Proposer")
            .field("miner", &self.key.address())
            .field("banned", &self.banned.len())
            .field("state", &*self.state.lock())
            .finish_non_exhaustive()
    }
}

/// Unstages every marked transaction when dropped.
struct EvictionGuard<'a> {
    runtime: &'a dyn ChainRuntime,
    marked: Vec<TxId>,
}

impl EvictionGuard<'_> {
    fn mark(&mut self, txid: TxId) -> Vec<TxId> {
        self.marked.push(txid);
        self.marked.clone()
    }
}

impl Drop for EvictionGuard<'_> {
    fn drop(&mut self) {
        for txid in self.marked.drain(..) {
            if self.runtime.unstage_transaction(&txid) {
                info!(%txid, "evicted staged transaction");
            }
        }
    }
}

impl Proposer {
    /// A proposer using the system clock.
    pub fn new(
        runtime: Arc<dyn ChainRuntime>,
        key: KeyPair,
        banned: BannedAccounts,
        network: Option<Arc<dyn NetworkService>>,
    ) -> Self {
        Self::with_clock(runtime, key, banned, network, Utc::now)
    }

    pub fn with_clock(
        runtime: Arc<dyn ChainRuntime>,
        key: KeyPair,
        banned: BannedAccounts,
        network: Option<Arc<dyn NetworkService>>,
        clock: impl Fn() -> DateTime<Utc> + Send + Sync + 'static,
    ) -> Self {
        Self {
            runtime,
            key,
            banned,
            network,
            clock: Box::new(clock),
            state: Mutex::new(ProposerState::Idle),
        }
    }

    pub fn state(&self) -> ProposerState {
        *self.state.lock()
    }

    pub fn address(&self) -> Address {
        self.key.address()
    }

    /// Make one proposal attempt on top of the current tip.
    pub fn propose(&self, last_commit: Option<BlockCommit>) -> ProposalOutcome {
        *self.state.lock() = ProposerState::Proposing;
        let outcome = self.attempt(last_commit);
        *self.state.lock() = ProposerState::Done;
        outcome
    }

    fn attempt(&self, last_commit: Option<BlockCommit>) -> ProposalOutcome {
        let runtime = self.runtime.as_ref();
        self.evict_banned();

        let mut guard = EvictionGuard {
            runtime,
            marked: Vec::new(),
        };
        let timestamp = u64::try_from((self.clock)().timestamp()).unwrap_or(0);

        let block = match runtime.propose_block(&self.key, timestamp, last_commit) {
            Ok(block) => block,
            Err(ProposeError::Cancelled) => {
                debug!("proposal cancelled");
                return ProposalOutcome::Cancelled;
            }
            Err(ProposeError::InvalidTx { tx_id, source }) => {
                warn!(%tx_id, reason = %source, "staged transaction no longer valid");
                return ProposalOutcome::Evicted(guard.mark(tx_id));
            }
            Err(ProposeError::ActionFailed {
                tx_id: Some(tx_id),
                reason,
            }) => {
                warn!(%tx_id, %reason, "staged transaction failed to execute");
                return ProposalOutcome::Evicted(guard.mark(tx_id));
            }
            Err(e) => {
                error!(error = %e, "block proposal failed");
                return ProposalOutcome::Failed(e.to_string());
            }
        };

        let index = block.index();
        match runtime.append(block.clone()) {
            Ok(()) => {}
            Err(AppendError::IndexMismatch { .. } | AppendError::InvalidPrevHash) => {
                debug!(index, "tip moved before append");
                return ProposalOutcome::Cancelled;
            }
            Err(AppendError::Transaction { index: position, source }) => {
                let Some(tx_id) = block.transactions.get(position).and_then(|tx| tx.txid().ok()) else {
                    return ProposalOutcome::Failed(source.to_string());
                };
                warn!(%tx_id, reason = %source, "appended block carried an invalid transaction");
                return ProposalOutcome::Evicted(guard.mark(tx_id));
            }
            Err(AppendError::ActionFailed { tx_id, reason }) => {
                warn!(%tx_id, %reason, "appended block carried a failing transaction");
                return ProposalOutcome::Evicted(guard.mark(tx_id));
            }
            Err(e) => {
                error!(index, error = %e, "own block rejected");
                return ProposalOutcome::Failed(e.to_string());
            }
        }

        info!(index, hash = %block.hash(), txs = block.transactions.len(), "proposed block");
        self.broadcast(&block);
        ProposalOutcome::Proposed(block)
    }

    fn evict_banned(&self) {
        if self.banned.is_empty() {
            return;
        }
        for txid in self.runtime.staged_transaction_ids() {
            let banned = self
                .runtime
                .get_transaction(&txid)
                .is_some_and(|tx| self.banned.contains(&tx.signer));
            if banned && self.runtime.unstage_transaction(&txid) {
                info!(%txid, "unstaged transaction from banned signer");
            }
        }
    }

    fn broadcast(&self, block: &Block) {
        let Some(network) = &self.network else {
            return;
        };
        if !network.is_running() {
            debug!("network not running, skipping broadcast");
            return;
        }
        if let Err(e) = network.broadcast_block(block) {
            debug!(error = %e, "block broadcast failed");
        }
    }
}
