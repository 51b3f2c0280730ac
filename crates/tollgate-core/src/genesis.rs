//! Genesis state and block.
//!
//! The genesis block (index 0) carries a single transaction whose only
//! action is a `genesis` custom action holding the encoded [`GenesisState`],
//! so the genesis hash commits to the initial admin, activated accounts,
//! balances, and legacy authorized-miner record. Genesis is never run
//! through the block validator.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use crate::activation::{AdminState, AuthorizedMinersState};
use crate::address::Address;
use crate::crypto::KeyPair;
use crate::error::TxViolation;
use crate::types::{Action, Asset, Block, Hash256, Transaction};

/// Default genesis timestamp: January 1, 2026 00:00:00 UTC.
pub const GENESIS_TIMESTAMP: u64 = 1_767_225_600;

/// `type_id` of the custom action carrying the genesis state.
pub const GENESIS_ACTION: &str = "genesis";

/// Initial balance credited at genesis.
#[derive(
    Serialize, Deserialize, Clone, Debug, PartialEq, Eq,
    bincode::Encode, bincode::Decode,
)]
pub struct GenesisAllocation {
    pub address: Address,
    pub asset: Asset,
    pub amount: u64,
}

/// Chain state at index 0.
#[derive(
    Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq,
    bincode::Encode, bincode::Decode,
)]
pub struct GenesisState {
    pub admin: Option<AdminState>,
    pub activated: BTreeSet<Address>,
    pub balances: Vec<GenesisAllocation>,
    pub authorized_miners: Option<AuthorizedMinersState>,
}

impl GenesisState {
    pub fn with_admin(admin: AdminState) -> Self {
        Self {
            admin: Some(admin),
            ..Self::default()
        }
    }

    /// Sum allocations per `(address, asset)`.
    pub fn balance_map(&self) -> BTreeMap<(Address, Asset), u64> {
        let mut map = BTreeMap::new();
        for alloc in &self.balances {
            let entry = map.entry((alloc.address, alloc.asset.clone())).or_insert(0u64);
            *entry = entry.saturating_add(alloc.amount);
        }
        map
    }

    fn encode(&self) -> Result<Vec<u8>, TxViolation> {
        bincode::encode_to_vec(self, bincode::config::standard())
            .map_err(|e| TxViolation::Serialization(e.to_string()))
    }
}

/// Build the genesis block for `state`, signed by `key`.
pub fn genesis_block(state: &GenesisState, key: &KeyPair, timestamp: u64) -> Result<Block, TxViolation> {
    let action = Action::Custom {
        type_id: GENESIS_ACTION.to_string(),
        payload: state.encode()?,
    };
    let tx = Transaction::create(0, key, Hash256::ZERO, vec![action], timestamp)?;
    Block::create(0, timestamp, key, Hash256::ZERO, 0, None, vec![tx])
}

/// Decode the genesis state embedded in a genesis block, if present.
pub fn embedded_state(block: &Block) -> Option<GenesisState> {
    let tx = block.transactions.first()?;
    match tx.actions.first()? {
        Action::Custom { type_id, payload } if type_id == GENESIS_ACTION => {
            bincode::decode_from_slice(payload, bincode::config::standard())
                .ok()
                .map(|(state, _)| state)
        }
        _ => None,
    }
}
