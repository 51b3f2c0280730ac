//! Action evaluation over activation records and balances.
//!
//! Each transaction stages its writes in a small overlay over the committed
//! balances; the overlay lands only once every action succeeded, so a
//! failed transaction costs nothing beyond the entries it touched.

use std::collections::BTreeMap;

use thiserror::Error;
use tollgate_core::activation::ActivationState;
use tollgate_core::address::Address;
use tollgate_core::constants::{MINING_REWARD, REWARD_ASSET};
use tollgate_core::genesis::GenesisState;
use tollgate_core::types::{Action, Asset, Transaction};

/// Why an action could not be applied.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LedgerError {
    #[error("{signer} may not activate accounts at height {height}")]
    NotAdmin { signer: Address, height: u64 },
    #[error("{account} holds {balance} {asset}, needs {amount}")]
    InsufficientBalance {
        account: Address,
        asset: Asset,
        balance: u64,
        amount: u64,
    },
    #[error("balance overflow for {account} in {asset}")]
    Overflow { account: Address, asset: Asset },
    #[error("block action {0} cannot be signed by an account")]
    BlockActionBySigner(usize),
}

/// Activation state plus balances per `(account, asset)`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Ledger {
    activation: ActivationState,
    balances: BTreeMap<(Address, Asset), u64>,
}

impl Ledger {
    pub fn from_genesis(state: &GenesisState) -> Self {
        let mut activation = ActivationState::new(state.admin);
        for address in &state.activated {
            activation.activate(*address);
        }
        Self {
            activation,
            balances: state.balance_map(),
        }
    }

    pub fn activation(&self) -> &ActivationState {
        &self.activation
    }

    pub fn balance(&self, account: &Address, asset: &Asset) -> u64 {
        // BTreeMap lookup needs an owned key tuple.
        self.balances
            .get(&(*account, asset.clone()))
            .copied()
            .unwrap_or(0)
    }

    /// Apply every action of `tx` at `height`, all or nothing.
    pub fn apply_transaction(&mut self, tx: &Transaction, height: u64) -> Result<(), LedgerError> {
        let mut delta = Delta::over(self);
        for (i, action) in tx.actions.iter().enumerate() {
            if action.is_block_action() {
                return Err(LedgerError::BlockActionBySigner(i));
            }
            delta.apply(&tx.signer, action, height)?;
        }
        let Delta {
            balances, activated, ..
        } = delta;
        self.commit(balances, activated);
        Ok(())
    }

    /// Credit the block reward to `miner`.
    pub fn apply_block_reward(&mut self, miner: &Address, height: u64) -> Result<(), LedgerError> {
        let reward = Self::block_reward(*miner);
        let mut delta = Delta::over(self);
        delta.apply(miner, &reward, height)?;
        let Delta {
            balances, activated, ..
        } = delta;
        self.commit(balances, activated);
        Ok(())
    }

    /// The block action injected for `miner`.
    pub fn block_reward(miner: Address) -> Action {
        Action::MiningReward {
            recipient: miner,
            asset: Asset::new(REWARD_ASSET),
            amount: MINING_REWARD,
        }
    }

    fn commit(&mut self, balances: BTreeMap<(Address, Asset), u64>, activated: Vec<Address>) {
        self.balances.extend(balances);
        for address in activated {
            self.activation.activate(address);
        }
    }
}

/// Pending writes of one transaction, read through to the committed ledger.
///
/// Only the touched entries are held; dropping a delta discards them.
struct Delta<'a> {
    base: &'a Ledger,
    balances: BTreeMap<(Address, Asset), u64>,
    activated: Vec<Address>,
}

impl<'a> Delta<'a> {
    fn over(base: &'a Ledger) -> Self {
        Self {
            base,
            balances: BTreeMap::new(),
            activated: Vec::new(),
        }
    }

    fn balance(&self, account: &Address, asset: &Asset) -> u64 {
        let key = (*account, asset.clone());
        match self.balances.get(&key) {
            Some(pending) => *pending,
            None => self.base.balances.get(&key).copied().unwrap_or(0),
        }
    }

    fn apply(&mut self, signer: &Address, action: &Action, height: u64) -> Result<(), LedgerError> {
        match action {
            // Activations never change who the admin is, so the committed
            // state answers the admin check.
            Action::ActivateAccount { address } => {
                if !self.base.activation.is_admin_at(signer, height) {
                    return Err(LedgerError::NotAdmin {
                        signer: *signer,
                        height,
                    });
                }
                self.activated.push(*address);
                Ok(())
            }
            Action::Transfer {
                recipient,
                asset,
                amount,
            } => {
                self.debit(signer, asset, *amount)?;
                self.credit(recipient, asset, *amount)
            }
            Action::MiningReward {
                recipient,
                asset,
                amount,
            } => self.credit(recipient, asset, *amount),
            // Custom payloads belong to the application layer.
            Action::Custom { .. } => Ok(()),
        }
    }

    fn debit(&mut self, account: &Address, asset: &Asset, amount: u64) -> Result<(), LedgerError> {
        let balance = self.balance(account, asset);
        let remaining = balance
            .checked_sub(amount)
            .ok_or_else(|| LedgerError::InsufficientBalance {
                account: *account,
                asset: asset.clone(),
                balance,
                amount,
            })?;
        self.balances.insert((*account, asset.clone()), remaining);
        Ok(())
    }

    fn credit(&mut self, account: &Address, asset: &Asset, amount: u64) -> Result<(), LedgerError> {
        let updated = self
            .balance(account, asset)
            .checked_add(amount)
            .ok_or_else(|| LedgerError::Overflow {
                account: *account,
                asset: asset.clone(),
            })?;
        self.balances.insert((*account, asset.clone()), updated);
        Ok(())
    }
}
