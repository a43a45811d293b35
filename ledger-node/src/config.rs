//! Node configuration

use crate::{NodeError, NodeResult};
use ledger_core::Address;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Deserialize)]
pub struct NodeConfig {
    /// TCP listen address for the front end
    #[serde(default = "default_listen_addr")]
    pub listen_addr: String,
    /// sled database directory; in-memory when unset
    #[serde(default)]
    pub db_path: Option<PathBuf>,
    /// Block reward beneficiary (hex address)
    #[serde(default = "default_coinbase")]
    pub coinbase: String,
    /// Seconds between block production attempts
    #[serde(default = "default_block_interval_secs")]
    pub block_interval_secs: u64,
    /// Packing budget per block, in milliseconds
    #[serde(default = "default_pack_budget_ms")]
    pub pack_budget_ms: u64,
    /// Leading zero hex characters a mined header hash must show
    #[serde(default = "default_difficulty")]
    pub difficulty: usize,
    /// Transaction cap per block body, reward excluded
    #[serde(default = "default_max_block_txs")]
    pub max_block_txs: usize,
    /// Accounts funded at first boot
    #[serde(default)]
    pub genesis: Vec<GenesisAccount>,
}

/// One pre-funded account
#[derive(Debug, Clone, Deserialize)]
pub struct GenesisAccount {
    pub address: String,
    pub balance: u64,
    #[serde(default)]
    pub nonce: u64,
}

impl NodeConfig {
    /// Load from a TOML file
    pub fn load(path: &Path) -> NodeResult<Self> {
        let raw = fs::read_to_string(path)?;
        toml::from_str(&raw).map_err(|e| NodeError::Config(e.to_string()))
    }

    /// Parsed coinbase address
    pub fn coinbase_address(&self) -> NodeResult<Address> {
        Address::from_hex(&self.coinbase)
            .map_err(|e| NodeError::Config(format!("bad coinbase address: {e}")))
    }
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            listen_addr: default_listen_addr(),
            db_path: None,
            coinbase: default_coinbase(),
            block_interval_secs: default_block_interval_secs(),
            pack_budget_ms: default_pack_budget_ms(),
            difficulty: default_difficulty(),
            max_block_txs: default_max_block_txs(),
            genesis: Vec::new(),
        }
    }
}

fn default_listen_addr() -> String {
    "127.0.0.1:8080".to_string()
}

fn default_coinbase() -> String {
    "0xbe4bf446e2bdd6ebad529a4df21911c87e48e535".to_string()
}

fn default_block_interval_secs() -> u64 {
    10
}

fn default_pack_budget_ms() -> u64 {
    1_000
}

fn default_difficulty() -> usize {
    2
}

fn default_max_block_txs() -> usize {
    10
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = NodeConfig::default();
        assert_eq!(config.block_interval_secs, 10);
        assert_eq!(config.difficulty, 2);
        assert_eq!(config.max_block_txs, 10);
        assert!(config.db_path.is_none());
        assert!(config.coinbase_address().is_ok());
    }

    #[test]
    fn test_parse_with_genesis() {
        let raw = r#"
            listen_addr = "0.0.0.0:9000"
            difficulty = 1

            [[genesis]]
            address = "0x9b682e9770c315f43954e37d8880a6be815a3e53"
            balance = 300
        "#;
        let config: NodeConfig = toml::from_str(raw).unwrap();
        assert_eq!(config.listen_addr, "0.0.0.0:9000");
        assert_eq!(config.difficulty, 1);
        assert_eq!(config.genesis.len(), 1);
        assert_eq!(config.genesis[0].balance, 300);
        assert_eq!(config.genesis[0].nonce, 0);
        // Untouched fields keep their defaults
        assert_eq!(config.pack_budget_ms, 1_000);
    }

    #[test]
    fn test_bad_coinbase_is_a_config_error() {
        let config = NodeConfig {
            coinbase: "not hex".to_string(),
            ..NodeConfig::default()
        };
        assert!(matches!(
            config.coinbase_address(),
            Err(NodeError::Config(_))
        ));
    }
}
