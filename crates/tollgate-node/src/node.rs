//! Node composition and proposal loop.
//!
//! The [`Node`] owns the in-memory [`Chain`], a [`Proposer`] bound to the
//! node's key, and the validator keys it uses to sign the commit for the
//! current tip. The proposal loop ticks on a `tokio` interval until the
//! shutdown future resolves.

use std::future::Future;
use std::sync::Arc;

use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use tollgate_consensus::{Chain, ProposalOutcome, Proposer};
use tollgate_core::address::Address;
use tollgate_core::commit::BlockCommit;
use tollgate_core::crypto::KeyPair;
use tollgate_core::error::TollgateError;
use tollgate_core::genesis::{genesis_block, GENESIS_TIMESTAMP};
use tollgate_core::traits::{ChainRuntime, NetworkService};
use tollgate_core::types::{Asset, BlockHash, Transaction, TxId};

use crate::config::NodeConfig;

pub struct Node {
    config: NodeConfig,
    chain: Arc<Chain>,
    proposer: Proposer,
    validators: Vec<KeyPair>,
}

impl std::fmt::Debug for Node {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Node")
            .field("chain", &self.chain)
            .field("proposer", &self.proposer)
            .field("validators", &self.validators.len())
            .finish_non_exhaustive()
    }
}

impl Node {
    /// Build a node without a network transport.
    pub fn new(config: NodeConfig) -> Result<Self, TollgateError> {
        Self::build(config, None)
    }

    /// Build a node that broadcasts its blocks through `network`.
    pub fn with_network(config: NodeConfig, network: Arc<dyn NetworkService>) -> Result<Self, TollgateError> {
        Self::build(config, Some(network))
    }

    fn build(config: NodeConfig, network: Option<Arc<dyn NetworkService>>) -> Result<Self, TollgateError> {
        let policy = Arc::new(config.chain_policy()?);
        let key = config.proposer_keypair()?;
        let validators = config.validator_keypairs()?;
        let banned = config.banned()?;

        let genesis_state = config.genesis_state()?;
        let genesis_key = config.genesis_keypair(&key)?;
        let genesis = genesis_block(&genesis_state, &genesis_key, GENESIS_TIMESTAMP)?;
        let chain = Arc::new(Chain::new(policy, genesis, genesis_state));

        info!(
            network = ?config.network_type,
            proposer = %key.address(),
            validators = validators.len(),
            banned = banned.len(),
            "node initialised"
        );

        let runtime: Arc<dyn ChainRuntime> = chain.clone();
        let proposer = Proposer::new(runtime, key, banned, network);
        Ok(Self {
            config,
            chain,
            proposer,
            validators,
        })
    }

    pub fn config(&self) -> &NodeConfig {
        &self.config
    }

    pub fn chain(&self) -> &Arc<Chain> {
        &self.chain
    }

    pub fn proposer_address(&self) -> Address {
        self.proposer.address()
    }

    pub fn tip(&self) -> (u64, BlockHash) {
        self.chain.tip()
    }

    pub fn balance(&self, account: &Address, asset: &Asset) -> u64 {
        self.chain.balance(account, asset)
    }

    /// Validate and stage a transaction for a future block.
    pub fn submit_transaction(&self, tx: Transaction) -> Result<TxId, TollgateError> {
        let txid = self.chain.stage_transaction(tx)?;
        debug!(%txid, "transaction submitted");
        Ok(txid)
    }

    /// Commit for the current tip, signed by every configured validator key.
    ///
    /// `None` when the node holds no validator keys.
    pub fn last_commit(&self) -> Option<BlockCommit> {
        if self.validators.is_empty() {
            return None;
        }
        let (index, hash) = self.chain.tip();
        let timestamp = u64::try_from(chrono::Utc::now().timestamp()).unwrap_or(0);
        Some(BlockCommit::sign_by(&self.validators, index, 0, hash, timestamp))
    }

    /// One proposal attempt on top of the current tip.
    pub fn propose_once(&self) -> ProposalOutcome {
        self.proposer.propose(self.last_commit())
    }

    /// Propose on every interval tick until `shutdown` resolves.
    pub async fn run(self: Arc<Self>, shutdown: impl Future<Output = ()>) {
        if self.config.no_propose {
            info!("proposer disabled");
            shutdown.await;
            return;
        }

        let mut ticker = tokio::time::interval(self.config.proposal_interval());
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    info!("shutting down proposer");
                    break;
                }
                _ = ticker.tick() => {
                    let node = Arc::clone(&self);
                    let outcome = tokio::task::spawn_blocking(move || node.propose_once()).await;
                    match outcome {
                        Ok(ProposalOutcome::Proposed(block)) => debug!(index = block.index(), "tick proposed"),
                        Ok(ProposalOutcome::Cancelled) => debug!("tick cancelled"),
                        Ok(ProposalOutcome::Evicted(ids)) => debug!(evicted = ids.len(), "tick evicted"),
                        Ok(ProposalOutcome::Failed(reason)) => warn!(%reason, "tick failed"),
                        Err(e) => warn!(error = %e, "proposal task panicked"),
                    }
                }
            }
        }
    }
}
