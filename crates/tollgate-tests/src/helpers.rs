//! Shared helpers for scenario and property tests.

use std::collections::BTreeSet;
use std::sync::Arc;

use tollgate_consensus::Chain;
use tollgate_core::address::Address;
use tollgate_core::commit::BlockCommit;
use tollgate_core::crypto::KeyPair;
use tollgate_core::error::AppendError;
use tollgate_core::genesis::{genesis_block, GenesisState, GENESIS_TIMESTAMP};
use tollgate_core::traits::ChainRuntime;
use tollgate_core::types::{Action, Block, Transaction};
use tollgate_policy::ChainPolicy;

/// Deterministic key from a seed byte.
pub fn key(seed: u8) -> KeyPair {
    KeyPair::from_secret_bytes([seed; 32])
}

pub fn only(keys: &[&KeyPair]) -> BTreeSet<Address> {
    keys.iter().map(|k| k.address()).collect()
}

/// An action with no state effect.
pub fn noop() -> Action {
    Action::Custom {
        type_id: "noop".into(),
        payload: vec![],
    }
}

/// Key that signs every test genesis block.
pub fn genesis_key() -> KeyPair {
    key(0xAD)
}

/// A chain whose genesis embeds `state`.
pub fn new_chain(policy: ChainPolicy, state: GenesisState) -> Chain {
    let genesis = genesis_block(&state, &genesis_key(), GENESIS_TIMESTAMP)
        .unwrap_or_else(|e| panic!("genesis: {e}"));
    Chain::new(Arc::new(policy), genesis, state)
}

/// `n` single-action transactions from `signer`, nonces `first..first + n`.
pub fn make_txs(chain: &Chain, signer: &KeyPair, first: u64, n: u64) -> Vec<Transaction> {
    (first..first + n)
        .map(|nonce| {
            Transaction::create(nonce, signer, chain.genesis_hash(), vec![noop()], nonce)
                .unwrap_or_else(|e| panic!("tx: {e}"))
        })
        .collect()
}

/// A commit for the current tip signed by `validators`.
pub fn commit_for_tip(chain: &Chain, validators: &[KeyPair]) -> BlockCommit {
    let (index, hash) = chain.tip();
    BlockCommit::sign_by(validators, index, 0, hash, GENESIS_TIMESTAMP)
}

/// A signed block on top of the current tip, bypassing proposal.
pub fn build_block(
    chain: &Chain,
    miner: &KeyPair,
    last_commit: Option<BlockCommit>,
    transactions: Vec<Transaction>,
) -> Block {
    let (index, hash) = chain.tip();
    let next = index + 1;
    Block::create(
        next,
        GENESIS_TIMESTAMP + next * 8,
        miner,
        hash,
        chain.policy().minimum_difficulty(),
        last_commit,
        transactions,
    )
    .unwrap_or_else(|e| panic!("block: {e}"))
}

/// Build an empty block for `miner` and try to append it.
pub fn try_mine(chain: &Chain, miner: &KeyPair, last_commit: Option<BlockCommit>) -> Result<(), AppendError> {
    chain.append(build_block(chain, miner, last_commit, vec![]))
}
