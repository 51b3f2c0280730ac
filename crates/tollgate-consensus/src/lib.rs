//! # tollgate-consensus: block assembly and the proposer loop.
//!
//! [`Chain`] is an in-memory [`ChainRuntime`](tollgate_core::traits::ChainRuntime):
//! it stages transactions, assembles and appends blocks, and runs every
//! candidate through the transaction and block validators of
//! `tollgate-policy`. [`Proposer`] drives one proposal attempt against any
//! runtime and evicts transactions the runtime rejects.

pub mod chain;
pub mod ledger;
pub mod proposer;

pub use chain::Chain;
pub use ledger::Ledger;
pub use proposer::{BannedAccounts, ProposalOutcome, Proposer, ProposerState};
