//! Protocol constants. Amounts are in the smallest unit of an [`Asset`](crate::types::Asset).

use serde::{Deserialize, Serialize};

/// Network type: Mainnet, Testnet, or Regtest.
///
/// Controls the data directory suffix, the minimum block difficulty, and
/// which admission-policy preset a node starts with.
///
/// # Examples
///
/// ```
/// use tollgate_core::constants::NetworkType;
/// let net = NetworkType::default();
/// assert_eq!(net, NetworkType::Mainnet);
/// assert_eq!(net.data_dir_suffix(), "mainnet");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NetworkType {
    /// Production network.
    #[default]
    Mainnet,
    /// Public test network with looser limits.
    Testnet,
    /// Local regression-test network: no admission restrictions at all.
    Regtest,
}

impl NetworkType {
    /// Subdirectory name appended to the base data directory path.
    ///
    /// # Examples
    ///
    /// ```
    /// use tollgate_core::constants::NetworkType;
    /// assert_eq!(NetworkType::Testnet.data_dir_suffix(), "testnet");
    /// ```
    pub fn data_dir_suffix(&self) -> &'static str {
        match self {
            Self::Mainnet => "mainnet",
            Self::Testnet => "testnet",
            Self::Regtest => "regtest",
        }
    }

    /// Minimum block difficulty a proposer must stamp into its header.
    ///
    /// # Examples
    ///
    /// ```
    /// use tollgate_core::constants::NetworkType;
    /// assert_eq!(NetworkType::Regtest.min_difficulty(), 0);
    /// assert_eq!(NetworkType::Mainnet.min_difficulty(), 5_000_000);
    /// ```
    pub fn min_difficulty(&self) -> u64 {
        match self {
            Self::Mainnet => 5_000_000,
            Self::Testnet => 10_000,
            Self::Regtest => 0,
        }
    }
}

/// Maximum number of actions a non-admin transaction may carry.
pub const MAX_ACTIONS_PER_TX: usize = 1;

/// Ticker of the asset paid out by the mining-reward block action.
pub const REWARD_ASSET: &str = "GOLD";

/// Amount credited to the miner of every appended block.
pub const MINING_REWARD: u64 = 10;

/// Target interval between local proposal attempts.
pub const BLOCK_TIME_SECS: u64 = 8;

/// Admin validity bound used by presets when none is configured.
pub const DEFAULT_ADMIN_VALID_UNTIL: u64 = 1_500_000;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn network_type_default_is_mainnet() {
        assert_eq!(NetworkType::default(), NetworkType::Mainnet);
    }

    #[test]
    fn network_type_deserializes_lowercase() {
        let net: NetworkType = serde_json::from_str("\"testnet\"").unwrap();
        assert_eq!(net, NetworkType::Testnet);
    }

    #[test]
    fn difficulty_loosens_towards_regtest() {
        assert!(NetworkType::Mainnet.min_difficulty() > NetworkType::Testnet.min_difficulty());
        assert!(NetworkType::Testnet.min_difficulty() > NetworkType::Regtest.min_difficulty());
    }
}
