//! # tollgate-node: configuration and composition.
//!
//! - [`config::NodeConfig`]: layered node configuration (defaults, TOML, environment)
//! - [`node::Node`]: chain runtime, proposer, and commit signing wired together

pub mod config;
pub mod node;

pub use config::NodeConfig;
pub use node::Node;
