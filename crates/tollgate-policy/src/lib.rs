//! # tollgate-policy
//! Time-sliced admission rules: which accounts may propose a block at a
//! given index, what proof they must present, and how much a block or
//! transaction may carry.
//!
//! Everything here is a pure function of its inputs. Validators never read
//! the clock or perform I/O, so every node reaches the same decision for the
//! same block.

pub mod block_validation;
pub mod commit;
pub mod config;
pub mod policy;
pub mod presets;
pub mod span;
pub mod timeline;
pub mod validation;

pub use block_validation::validate_block;
pub use policy::{ChainPolicy, ChainPolicyBuilder};
pub use span::{IndexFilter, Span};
pub use timeline::PolicyTimeline;
pub use validation::{validate_tx, validate_tx_structure, TxFacts};
