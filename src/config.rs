//! Configuration management for gossipcoin

use crate::error::ChainError;
use crate::puzzle::{ThresholdOracle, DEFAULT_DOMAIN, DEFAULT_THRESHOLD};
use crate::transaction::Amount;
use serde::Deserialize;
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub network: NetworkConfig,
    #[serde(default)]
    pub miner: MinerConfig,
    #[serde(default)]
    pub puzzle: PuzzleConfig,
    #[serde(default)]
    pub genesis: GenesisConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NetworkConfig {
    #[serde(default = "default_network_id")]
    pub network_id: String,
    /// Peer labels; each label is hashed into the peer's address
    #[serde(default = "default_peers")]
    pub peers: Vec<String>,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            network_id: default_network_id(),
            peers: default_peers(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct MinerConfig {
    #[serde(default = "default_reward")]
    pub reward: Amount,
    #[serde(default)]
    pub max_attempts: Option<u64>,
}

impl Default for MinerConfig {
    fn default() -> Self {
        Self {
            reward: default_reward(),
            max_attempts: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct PuzzleConfig {
    #[serde(default = "default_domain")]
    pub domain: u64,
    #[serde(default = "default_threshold")]
    pub threshold: u64,
}

impl Default for PuzzleConfig {
    fn default() -> Self {
        Self {
            domain: default_domain(),
            threshold: default_threshold(),
        }
    }
}

impl PuzzleConfig {
    pub fn oracle(&self) -> Result<ThresholdOracle, ChainError> {
        ThresholdOracle::new(self.domain, self.threshold)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct GenesisConfig {
    #[serde(default = "default_beneficiary")]
    pub beneficiary: String,
    #[serde(default = "default_genesis_amount")]
    pub amount: Amount,
}

impl Default for GenesisConfig {
    fn default() -> Self {
        Self {
            beneficiary: default_beneficiary(),
            amount: default_genesis_amount(),
        }
    }
}

impl Config {
    pub fn from_toml_str(s: &str) -> Result<Self, ChainError> {
        let config: Config = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ChainError> {
        if self.network.network_id.is_empty() {
            return Err(ChainError::ConfigError("network.network_id must be set".into()));
        }
        if self.network.peers.is_empty() {
            return Err(ChainError::ConfigError("network.peers must list at least one peer".into()));
        }
        let mut labels = self.network.peers.clone();
        labels.sort();
        labels.dedup();
        if labels.len() != self.network.peers.len() {
            return Err(ChainError::ConfigError("network.peers contains duplicates".into()));
        }
        if self.miner.reward < 0 {
            return Err(ChainError::ConfigError("miner.reward cannot be negative".into()));
        }
        if self.genesis.amount < 0 {
            return Err(ChainError::ConfigError("genesis.amount cannot be negative".into()));
        }
        self.puzzle.oracle()?;
        Ok(())
    }
}

/// Load configuration from `path`, falling back to defaults when the file is absent.
pub fn load_config(path: &Path) -> Result<Config, ChainError> {
    if !path.exists() {
        let config = Config::default();
        config.validate()?;
        return Ok(config);
    }
    let config_str = fs::read_to_string(path)?;
    Config::from_toml_str(&config_str)
}

fn default_network_id() -> String {
    "devnet".to_string()
}

fn default_peers() -> Vec<String> {
    vec!["alice".to_string(), "bob".to_string(), "carl".to_string()]
}

fn default_reward() -> Amount {
    10
}

fn default_domain() -> u64 {
    DEFAULT_DOMAIN
}

fn default_threshold() -> u64 {
    DEFAULT_THRESHOLD
}

fn default_beneficiary() -> String {
    "alice".to_string()
}

fn default_genesis_amount() -> Amount {
    10
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_missing_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = load_config(&dir.path().join("absent.toml")).unwrap();

        assert_eq!(config.network.network_id, "devnet");
        assert_eq!(config.network.peers, vec!["alice", "bob", "carl"]);
        assert_eq!(config.miner.reward, 10);
        assert_eq!(config.genesis.amount, 10);
        assert_eq!(config.puzzle.threshold, DEFAULT_THRESHOLD);
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(file, "[network]\npeers = [\"x\", \"y\"]\n\n[miner]\nreward = 25").unwrap();

        let config = load_config(&path).unwrap();
        assert_eq!(config.network.peers, vec!["x", "y"]);
        assert_eq!(config.network.network_id, "devnet");
        assert_eq!(config.miner.reward, 25);
        assert_eq!(config.miner.max_attempts, None);
    }

    #[test]
    fn test_invalid_values_rejected() {
        assert!(Config::from_toml_str("[puzzle]\ndomain = 10\nthreshold = 20").is_err());
        assert!(Config::from_toml_str("[network]\npeers = []").is_err());
        assert!(Config::from_toml_str("[network]\npeers = [\"a\", \"a\"]").is_err());
        assert!(Config::from_toml_str("[miner]\nreward = -1").is_err());
        assert!(matches!(
            Config::from_toml_str("not toml ["),
            Err(ChainError::ConfigError(_))
        ));
    }
}
