//! Node configuration.
//!
//! [`NodeConfig`] has usable defaults for a single regtest-style node and is
//! layered in this order, later sources winning:
//!
//! 1. built-in defaults,
//! 2. an optional TOML file,
//! 3. `TOLLGATE_`-prefixed environment variables (`TOLLGATE_LOG_LEVEL`,
//!    `TOLLGATE_PROPOSAL_INTERVAL_SECS`, `TOLLGATE_BANNED_ACCOUNTS=a,b`),
//! 4. command-line overrides applied by the binary.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use tollgate_core::activation::AdminState;
use tollgate_core::address::Address;
use tollgate_core::constants::{NetworkType, DEFAULT_ADMIN_VALID_UNTIL};
use tollgate_core::crypto::KeyPair;
use tollgate_core::error::TollgateError;
use tollgate_core::genesis::{GenesisAllocation, GenesisState};
use tollgate_core::types::Asset;
use tollgate_policy::config::PolicyConfig;
use tollgate_policy::presets::policy_for;
use tollgate_policy::ChainPolicy;

/// Environment variable prefix.
pub const ENV_PREFIX: &str = "TOLLGATE";

/// Initial balance in the genesis state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AllocationConfig {
    pub address: String,
    pub asset: String,
    pub amount: u64,
}

/// Genesis description. Addresses are hex.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GenesisConfig {
    /// Hex secret of the key that signs the genesis block.
    /// Falls back to the proposer key.
    pub signing_key: Option<String>,
    pub admin: Option<String>,
    pub admin_valid_until: u64,
    pub activated_accounts: Vec<String>,
    pub allocations: Vec<AllocationConfig>,
}

impl Default for GenesisConfig {
    fn default() -> Self {
        Self {
            signing_key: None,
            admin: None,
            admin_valid_until: DEFAULT_ADMIN_VALID_UNTIL,
            activated_accounts: Vec::new(),
            allocations: Vec::new(),
        }
    }
}

/// Configuration for a node instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NodeConfig {
    pub network_type: NetworkType,
    /// Root directory for node files.
    pub data_dir: PathBuf,
    /// Log filter string (e.g. "info", "tollgate_consensus=debug").
    pub log_level: String,
    /// Hex secret of the proposer key. A fresh key is generated when absent.
    pub proposer_key: Option<String>,
    /// Hex secrets of validator keys whose signatures this node collects
    /// into each block's last commit.
    pub validator_keys: Vec<String>,
    /// Hex addresses whose transactions are never proposed.
    pub banned_accounts: Vec<String>,
    pub proposal_interval_secs: u64,
    /// Disable the periodic proposer.
    pub no_propose: bool,
    pub genesis: GenesisConfig,
    /// Overrides on top of the network preset.
    pub policy: Option<PolicyConfig>,
}

impl Default for NodeConfig {
    fn default() -> Self {
        let network_type = NetworkType::default();
        Self {
            network_type,
            data_dir: default_data_dir(network_type),
            log_level: "info".to_string(),
            proposer_key: None,
            validator_keys: Vec::new(),
            banned_accounts: Vec::new(),
            proposal_interval_secs: tollgate_core::constants::BLOCK_TIME_SECS,
            no_propose: false,
            genesis: GenesisConfig::default(),
            policy: None,
        }
    }
}

/// `<platform data dir>/tollgate/<network>`.
pub fn default_data_dir(network_type: NetworkType) -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("tollgate")
        .join(network_type.data_dir_suffix())
}

impl NodeConfig {
    /// Load defaults, then `path` (if any), then the environment.
    pub fn load(path: Option<&Path>) -> Result<Self, TollgateError> {
        let mut builder = config::Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(config::File::from(path.to_path_buf()).required(true));
        }
        builder
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .separator("__")
                    .try_parsing(true)
                    .list_separator(",")
                    .with_list_parse_key("banned_accounts")
                    .with_list_parse_key("validator_keys"),
            )
            .build()
            .and_then(|c| c.try_deserialize::<NodeConfig>())
            .map_err(|e| TollgateError::Config(e.to_string()))
    }

    /// Path of the default config file inside the data directory.
    pub fn config_file(&self) -> PathBuf {
        self.data_dir.join("tollgate.toml")
    }

    pub fn proposal_interval(&self) -> Duration {
        Duration::from_secs(self.proposal_interval_secs.max(1))
    }

    /// The network preset with configured overrides applied.
    pub fn chain_policy(&self) -> Result<ChainPolicy, TollgateError> {
        let preset = policy_for(self.network_type);
        match &self.policy {
            Some(overrides) => Ok(overrides.apply_to(&preset)?),
            None => Ok(preset),
        }
    }

    pub fn proposer_keypair(&self) -> Result<KeyPair, TollgateError> {
        match &self.proposer_key {
            Some(hex) => Ok(KeyPair::from_secret_hex(hex)?),
            None => Ok(KeyPair::generate()),
        }
    }

    pub fn validator_keypairs(&self) -> Result<Vec<KeyPair>, TollgateError> {
        self.validator_keys
            .iter()
            .map(|hex| KeyPair::from_secret_hex(hex).map_err(TollgateError::from))
            .collect()
    }

    pub fn banned(&self) -> Result<BTreeSet<Address>, TollgateError> {
        parse_addresses(&self.banned_accounts)
    }

    pub fn genesis_state(&self) -> Result<GenesisState, TollgateError> {
        let genesis = &self.genesis;
        let admin = genesis
            .admin
            .as_deref()
            .map(Address::decode)
            .transpose()?
            .map(|address| AdminState::new(address, genesis.admin_valid_until));
        let balances = genesis
            .allocations
            .iter()
            .map(|a| {
                Ok(GenesisAllocation {
                    address: Address::decode(&a.address)?,
                    asset: Asset::new(a.asset.clone()),
                    amount: a.amount,
                })
            })
            .collect::<Result<Vec<_>, TollgateError>>()?;
        Ok(GenesisState {
            admin,
            activated: parse_addresses(&genesis.activated_accounts)?,
            balances,
            authorized_miners: None,
        })
    }

    /// Key that signs the genesis block.
    pub fn genesis_keypair(&self, proposer: &KeyPair) -> Result<KeyPair, TollgateError> {
        match &self.genesis.signing_key {
            Some(hex) => Ok(KeyPair::from_secret_hex(hex)?),
            None => Ok(proposer.clone()),
        }
    }
}

fn parse_addresses(values: &[String]) -> Result<BTreeSet<Address>, TollgateError> {
    values
        .iter()
        .map(|s| Address::decode(s).map_err(TollgateError::from))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_config(body: &str) -> (tempfile::TempDir, PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tollgate.toml");
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(body.as_bytes()).unwrap();
        (dir, path)
    }

    #[test]
    fn defaults() {
        let cfg = NodeConfig::default();
        assert_eq!(cfg.network_type, NetworkType::Mainnet);
        assert_eq!(cfg.log_level, "info");
        assert!(cfg.data_dir.ends_with("tollgate/mainnet"));
        assert_eq!(cfg.proposal_interval(), Duration::from_secs(8));
        assert_eq!(cfg.genesis.admin_valid_until, DEFAULT_ADMIN_VALID_UNTIL);
    }

    #[test]
    fn zero_interval_clamped() {
        let cfg = NodeConfig {
            proposal_interval_secs: 0,
            ..NodeConfig::default()
        };
        assert_eq!(cfg.proposal_interval(), Duration::from_secs(1));
    }

    #[test]
    fn loads_toml_file() {
        let banned = Address([3; 20]).encode();
        let (_dir, path) = write_config(&format!(
            r#"
network_type = "regtest"
log_level = "debug"
banned_accounts = ["{banned}"]
proposal_interval_secs = 2

[genesis]
admin = "{banned}"
admin_valid_until = 10

[policy.max_tx_per_block]
default = 7
"#
        ));
        let cfg = NodeConfig::load(Some(&path)).unwrap();
        assert_eq!(cfg.network_type, NetworkType::Regtest);
        assert_eq!(cfg.log_level, "debug");
        assert_eq!(cfg.proposal_interval_secs, 2);
        assert!(cfg.banned().unwrap().contains(&Address([3; 20])));

        let state = cfg.genesis_state().unwrap();
        assert_eq!(state.admin, Some(AdminState::new(Address([3; 20]), 10)));

        let policy = cfg.chain_policy().unwrap();
        assert_eq!(policy.resolve_max_tx_per_block(1), 7);
        assert_eq!(policy.minimum_difficulty(), 0);
    }

    #[test]
    fn missing_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let result = NodeConfig::load(Some(&dir.path().join("absent.toml")));
        assert!(matches!(result, Err(TollgateError::Config(_))));
    }

    #[test]
    fn policy_overrides_keep_preset_dimensions() {
        let cfg = NodeConfig {
            network_type: NetworkType::Testnet,
            policy: Some(PolicyConfig {
                minimum_difficulty: Some(1),
                ..PolicyConfig::default()
            }),
            ..NodeConfig::default()
        };
        let policy = cfg.chain_policy().unwrap();
        assert_eq!(policy.minimum_difficulty(), 1);
        assert_eq!(
            policy.resolve_max_tx_per_block(1),
            tollgate_policy::presets::TESTNET_MAX_TX_PER_BLOCK
        );
    }

    #[test]
    fn keys_parse_from_hex() {
        let secret = hex::encode([9u8; 32]);
        let cfg = NodeConfig {
            proposer_key: Some(secret.clone()),
            validator_keys: vec![secret],
            ..NodeConfig::default()
        };
        let proposer = cfg.proposer_keypair().unwrap();
        assert_eq!(proposer.address(), KeyPair::from_secret_bytes([9; 32]).address());
        assert_eq!(cfg.validator_keypairs().unwrap().len(), 1);
        assert_eq!(
            cfg.genesis_keypair(&proposer).unwrap().address(),
            proposer.address()
        );
    }

    #[test]
    fn bad_values_rejected() {
        let cfg = NodeConfig {
            banned_accounts: vec!["zz".into()],
            proposer_key: Some("00".into()),
            ..NodeConfig::default()
        };
        assert!(matches!(cfg.banned(), Err(TollgateError::Address(_))));
        assert!(matches!(cfg.proposer_keypair(), Err(TollgateError::Crypto(_))));
    }

    #[test]
    fn genesis_allocations_parsed() {
        let cfg = NodeConfig {
            genesis: GenesisConfig {
                allocations: vec![AllocationConfig {
                    address: Address([5; 20]).encode(),
                    asset: "GOLD".into(),
                    amount: 100,
                }],
                activated_accounts: vec![Address([6; 20]).encode()],
                ..GenesisConfig::default()
            },
            ..NodeConfig::default()
        };
        let state = cfg.genesis_state().unwrap();
        assert_eq!(state.balances[0].amount, 100);
        assert!(state.activated.contains(&Address([6; 20])));
        assert!(state.admin.is_none());
    }
}
