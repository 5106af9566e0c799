//! Node configuration.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use spos_consensus::ConsensusConfig;
use spos_types::{PublicKey, ShardId, Timestamp};

use crate::error::NodeError;
use crate::logging::LogFormat;

/// Configuration for a validator node.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct NodeConfig {
    /// Shard this validator belongs to.
    #[serde(default)]
    pub shard_id: ShardId,

    /// Number of regular shards in the network.
    #[serde(default = "default_num_shards")]
    pub num_shards: u32,

    /// Hex-encoded public key of this validator.
    #[serde(default)]
    pub public_key: String,

    /// Unix time in milliseconds at which round 0 starts.
    #[serde(default)]
    pub genesis_time_ms: u64,

    #[serde(default = "default_round_duration_ms")]
    pub round_duration_ms: u64,

    /// Log output format: "human" or "json".
    #[serde(default = "default_log_format")]
    pub log_format: String,

    /// Log level filter (e.g. "info", "debug,spos_consensus=trace").
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Feed consensus status into the Prometheus registry.
    #[serde(default)]
    pub enable_metrics: bool,

    #[serde(default)]
    pub consensus: ConsensusConfig,
}

// ── Serde default helpers ──────────────────────────────────────────────

fn default_num_shards() -> u32 {
    1
}

fn default_round_duration_ms() -> u64 {
    5_000
}

fn default_log_format() -> String {
    "human".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

// ── Impl ───────────────────────────────────────────────────────────────

impl NodeConfig {
    /// Load configuration from a TOML file.
    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self, NodeError> {
        let content =
            std::fs::read_to_string(path).map_err(|e| NodeError::Config(e.to_string()))?;
        Self::from_toml_str(&content)
    }

    /// Parse configuration from a TOML string.
    pub fn from_toml_str(s: &str) -> Result<Self, NodeError> {
        toml::from_str(s).map_err(|e| NodeError::Config(e.to_string()))
    }

    /// Serialize the configuration to a TOML string.
    pub fn to_toml_string(&self) -> Result<String, NodeError> {
        toml::to_string_pretty(self).map_err(|e| NodeError::Config(e.to_string()))
    }

    pub fn validate(&self) -> Result<(), NodeError> {
        if self.round_duration_ms == 0 {
            return Err(NodeError::Config(
                "round_duration_ms must be positive".to_string(),
            ));
        }
        self.self_public_key()?;
        self.log_format()?;
        self.consensus.validate()?;
        Ok(())
    }

    pub fn self_public_key(&self) -> Result<PublicKey, NodeError> {
        let public_key = PublicKey::from_hex(&self.public_key)?;
        if public_key.is_empty() {
            return Err(NodeError::Config("public_key is required".to_string()));
        }
        Ok(public_key)
    }

    pub fn log_format(&self) -> Result<LogFormat, NodeError> {
        self.log_format.parse()
    }

    pub fn round_duration(&self) -> Duration {
        Duration::from_millis(self.round_duration_ms)
    }

    pub fn genesis_time(&self) -> Timestamp {
        Timestamp::from_millis(self.genesis_time_ms)
    }
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            shard_id: 0,
            num_shards: default_num_shards(),
            public_key: String::new(),
            genesis_time_ms: 0,
            round_duration_ms: default_round_duration_ms(),
            log_format: default_log_format(),
            log_level: default_log_level(),
            enable_metrics: false,
            consensus: ConsensusConfig::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn default_config_round_trips_through_toml() {
        let config = NodeConfig {
            public_key: "aabbcc".to_string(),
            ..NodeConfig::default()
        };
        let toml_str = config.to_toml_string().unwrap();
        let parsed = NodeConfig::from_toml_str(&toml_str).expect("should parse");
        assert_eq!(parsed.public_key, config.public_key);
        assert_eq!(parsed.consensus, config.consensus);
    }

    #[test]
    fn minimal_toml_uses_defaults() {
        let config = NodeConfig::from_toml_str("").expect("empty toml should use defaults");
        assert_eq!(config.round_duration_ms, 5_000);
        assert_eq!(config.num_shards, 1);
        assert_eq!(config.log_format, "human");
        assert_eq!(config.consensus.processing_threshold_percentage, 25);
    }

    #[test]
    fn consensus_table_overrides() {
        let toml = r#"
            public_key = "0102"
            shard_id = 1
            num_shards = 2

            [consensus]
            processing_threshold_percentage = 20
            [consensus.extension]
            enabled = true
        "#;
        let config = NodeConfig::from_toml_str(toml).expect("should parse");
        assert_eq!(config.shard_id, 1);
        assert_eq!(config.consensus.processing_threshold_percentage, 20);
        assert!(config.consensus.extension.enabled);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn missing_public_key_is_invalid() {
        let config = NodeConfig::default();
        assert!(matches!(config.validate(), Err(NodeError::Config(_))));
        let config = NodeConfig {
            public_key: "zz".to_string(),
            ..NodeConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(NodeError::InvalidPublicKey(_))
        ));
    }

    #[test]
    fn loads_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "public_key = \"ff00\"\nround_duration_ms = 6000").unwrap();
        let config = NodeConfig::from_toml_file(file.path()).unwrap();
        assert_eq!(config.round_duration(), Duration::from_secs(6));
        assert_eq!(config.self_public_key().unwrap().to_hex(), "ff00");
    }

    #[test]
    fn missing_file_returns_config_error() {
        let result = NodeConfig::from_toml_file("/nonexistent/spos.toml");
        assert!(matches!(result, Err(NodeError::Config(_))));
    }
}
