//! Default policy per network type.
//!
//! Presets only set block limits and the minimum difficulty. Miner and
//! validator timelines come from node configuration.

use tollgate_core::constants::NetworkType;

use crate::policy::ChainPolicy;
use crate::timeline::PolicyTimeline;

/// Mainnet block size limit: 100 KiB.
pub const MAINNET_MAX_BLOCK_BYTES: u64 = 100 * 1024;
pub const MAINNET_MAX_TX_PER_BLOCK: usize = 100;
pub const MAINNET_MAX_TX_PER_SIGNER: usize = 4;

/// Testnet block size limit: 1 MiB.
pub const TESTNET_MAX_BLOCK_BYTES: u64 = 1024 * 1024;
pub const TESTNET_MAX_TX_PER_BLOCK: usize = 500;
pub const TESTNET_MAX_TX_PER_SIGNER: usize = 16;

/// The starting policy for `network`.
///
/// # Examples
///
/// ```
/// use tollgate_core::constants::NetworkType;
/// use tollgate_policy::presets::policy_for;
///
/// let regtest = policy_for(NetworkType::Regtest);
/// assert_eq!(regtest.resolve_max_tx_per_block(1), usize::MAX);
/// ```
pub fn policy_for(network: NetworkType) -> ChainPolicy {
    let difficulty = network.min_difficulty();
    match network {
        NetworkType::Mainnet => ChainPolicy::builder(difficulty)
            .max_block_bytes(PolicyTimeline::new(MAINNET_MAX_BLOCK_BYTES))
            .max_tx_per_block(PolicyTimeline::new(MAINNET_MAX_TX_PER_BLOCK))
            .max_tx_per_signer_per_block(PolicyTimeline::new(MAINNET_MAX_TX_PER_SIGNER))
            .build(),
        NetworkType::Testnet => ChainPolicy::builder(difficulty)
            .max_block_bytes(PolicyTimeline::new(TESTNET_MAX_BLOCK_BYTES))
            .max_tx_per_block(PolicyTimeline::new(TESTNET_MAX_TX_PER_BLOCK))
            .max_tx_per_signer_per_block(PolicyTimeline::new(TESTNET_MAX_TX_PER_SIGNER))
            .build(),
        NetworkType::Regtest => ChainPolicy::unrestricted(difficulty),
    }
}
