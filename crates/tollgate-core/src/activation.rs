//! Activation records kept in chain state and read by the transaction validator.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::address::Address;

/// Account allowed to bypass activation and action limits until `valid_until`.
#[derive(
    Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq,
    bincode::Encode, bincode::Decode,
)]
pub struct AdminState {
    pub address: Address,
    /// Last height (inclusive) at which the admin privilege is honoured.
    pub valid_until: u64,
}

impl AdminState {
    pub fn new(address: Address, valid_until: u64) -> Self {
        Self {
            address,
            valid_until,
        }
    }

    /// Whether `signer` holds admin privileges at `height`.
    pub fn grants(&self, signer: &Address, height: u64) -> bool {
        self.address == *signer && height <= self.valid_until
    }
}

/// Accounts permitted to submit transactions, plus the optional admin.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
pub struct ActivationState {
    pub activated: BTreeSet<Address>,
    pub admin: Option<AdminState>,
}

impl ActivationState {
    pub fn new(admin: Option<AdminState>) -> Self {
        Self {
            activated: BTreeSet::new(),
            admin,
        }
    }

    /// Activation is only enforced once at least one account is activated.
    pub fn is_enforced(&self) -> bool {
        !self.activated.is_empty()
    }

    pub fn is_activated(&self, address: &Address) -> bool {
        self.activated.contains(address)
    }

    pub fn is_admin_at(&self, signer: &Address, height: u64) -> bool {
        self.admin.is_some_and(|admin| admin.grants(signer, height))
    }

    /// Returns `false` when the address was already activated.
    pub fn activate(&mut self, address: Address) -> bool {
        self.activated.insert(address)
    }
}

/// Authorized-miner record stored in state by older chains.
///
/// Miners in `miners` may propose at every height that is a multiple of
/// `interval`, up to and including `valid_until`.
#[derive(
    Serialize, Deserialize, Clone, Debug, PartialEq, Eq,
    bincode::Encode, bincode::Decode,
)]
pub struct AuthorizedMinersState {
    pub miners: BTreeSet<Address>,
    pub interval: u64,
    pub valid_until: u64,
}

impl AuthorizedMinersState {
    pub fn new(miners: impl IntoIterator<Item = Address>, interval: u64, valid_until: u64) -> Self {
        Self {
            miners: miners.into_iter().collect(),
            interval,
            valid_until,
        }
    }

    /// Whether the record's rule covers `height`.
    pub fn covers(&self, height: u64) -> bool {
        self.interval != 0 && height <= self.valid_until && height % self.interval == 0
    }
}
