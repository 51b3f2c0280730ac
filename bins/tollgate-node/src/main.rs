//! Tollgate node binary.
//!
//! Loads configuration, builds the chain with its admission policy, and
//! proposes blocks on a fixed interval until Ctrl+C.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tollgate_core::constants::NetworkType;
use tollgate_node_lib::{Node, NodeConfig};
use tracing::info;

#[derive(Parser, Debug)]
#[command(
    name = "tollgate-node",
    version,
    about = "Tollgate node: block proposal under a time-sliced admission policy"
)]
struct Args {
    /// Config file (TOML). Defaults to <data-dir>/tollgate.toml when present.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Data directory
    #[arg(long)]
    data_dir: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long)]
    log_level: Option<String>,

    /// Log output format ("text" or "json")
    #[arg(long, default_value = "text")]
    log_format: String,

    /// Hex secret of the proposer key
    #[arg(long)]
    proposer_key: Option<String>,

    /// Banned signer addresses (comma-separated hex)
    #[arg(long, value_delimiter = ',')]
    banned: Vec<String>,

    /// Seconds between proposal attempts
    #[arg(long)]
    interval: Option<u64>,

    /// Run without proposing blocks
    #[arg(long)]
    no_propose: bool,

    /// Use the testnet preset
    #[arg(long, conflicts_with = "regtest")]
    testnet: bool,

    /// Use the regtest preset (no admission restrictions)
    #[arg(long, conflicts_with = "testnet")]
    regtest: bool,
}

impl Args {
    fn network_type(&self) -> Option<NetworkType> {
        if self.regtest {
            Some(NetworkType::Regtest)
        } else if self.testnet {
            Some(NetworkType::Testnet)
        } else {
            None
        }
    }

    /// Load the layered config, then apply command-line overrides.
    fn into_config(self) -> Result<(NodeConfig, String)> {
        let config_path = self.config.clone().or_else(|| {
            let default = NodeConfig {
                data_dir: self.data_dir.clone().unwrap_or_else(|| {
                    tollgate_node_lib::config::default_data_dir(self.network_type().unwrap_or_default())
                }),
                ..NodeConfig::default()
            }
            .config_file();
            default.exists().then_some(default)
        });
        let mut config = NodeConfig::load(config_path.as_deref()).context("failed to load configuration")?;

        if let Some(network_type) = self.network_type() {
            config.network_type = network_type;
            if self.data_dir.is_none() {
                config.data_dir = tollgate_node_lib::config::default_data_dir(network_type);
            }
        }
        if let Some(data_dir) = self.data_dir {
            config.data_dir = data_dir;
        }
        if let Some(level) = self.log_level {
            config.log_level = level;
        }
        if self.proposer_key.is_some() {
            config.proposer_key = self.proposer_key;
        }
        if !self.banned.is_empty() {
            config.banned_accounts = self.banned;
        }
        if let Some(interval) = self.interval {
            config.proposal_interval_secs = interval;
        }
        config.no_propose |= self.no_propose;

        Ok((config, self.log_format))
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let (config, log_format) = Args::parse().into_config()?;
    init_logging(&config.log_level, &log_format);

    info!(version = env!("CARGO_PKG_VERSION"), "Tollgate node");
    info!(network = ?config.network_type, data_dir = ?config.data_dir, "configuration loaded");

    std::fs::create_dir_all(&config.data_dir)
        .with_context(|| format!("failed to create data dir {}", config.data_dir.display()))?;

    let node = Arc::new(Node::new(config).context("failed to start node")?);
    let (index, hash) = node.tip();
    info!(index, %hash, proposer = %node.proposer_address(), "node running (Ctrl+C to stop)");

    let shutdown = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for Ctrl+C");
        }
        info!("received Ctrl+C, shutting down");
    };
    node.clone().run(shutdown).await;

    let (index, hash) = node.tip();
    info!(index, %hash, "shutdown complete");
    Ok(())
}

/// Initialize tracing with the given level and output format.
///
/// `format = "json"` gives structured JSON output; anything else is text.
fn init_logging(level_str: &str, format: &str) {
    use tracing_subscriber::filter::EnvFilter;
    use tracing_subscriber::fmt;
    use tracing_subscriber::prelude::*;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level_str));

    if format == "json" {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_target(true).with_level(true))
            .init();
    }
}
