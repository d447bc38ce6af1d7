//! Node configuration with TOML file support.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use tcr_types::RegistryParams;

use crate::logging::LogFormat;
use crate::NodeError;

/// Configuration for a registry node.
///
/// Loaded from a TOML file via [`NodeConfig::from_toml_file`] or built
/// programmatically (e.g. for tests). Registry parameters live in the
/// `[params]` table and are fixed once the chain is initialized.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct NodeConfig {
    /// Data directory for the LMDB environment.
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// LMDB map size in bytes.
    #[serde(default = "default_map_size")]
    pub map_size: usize,

    /// Maximum number of named LMDB databases.
    #[serde(default = "default_max_dbs")]
    pub max_dbs: u32,

    /// Log format: "human" or "json".
    #[serde(default = "default_log_format")]
    pub log_format: String,

    /// Log level filter: "trace", "debug", "info", "warn", "error".
    #[serde(default = "default_log_level")]
    pub log_level: String,

    #[serde(default)]
    pub params: RegistryParams,
}

// ── Serde default helpers ──────────────────────────────────────────────

fn default_data_dir() -> PathBuf {
    PathBuf::from("./tcr_data")
}

fn default_map_size() -> usize {
    256 * 1024 * 1024
}

fn default_max_dbs() -> u32 {
    16
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
    pub fn from_toml_file(path: &str) -> Result<Self, NodeError> {
        let content =
            std::fs::read_to_string(path).map_err(|e| NodeError::Config(e.to_string()))?;
        Self::from_toml_str(&content)
    }

    /// Parse configuration from a TOML string.
    pub fn from_toml_str(s: &str) -> Result<Self, NodeError> {
        toml::from_str(s).map_err(|e| NodeError::Config(e.to_string()))
    }

    pub fn to_toml_string(&self) -> Result<String, NodeError> {
        toml::to_string_pretty(self).map_err(|e| NodeError::Config(e.to_string()))
    }

    /// Check the parameters and the log settings.
    pub fn validate(&self) -> Result<(), NodeError> {
        self.params.validate()?;
        self.log_format()?;
        Ok(())
    }

    pub fn log_format(&self) -> Result<LogFormat, NodeError> {
        self.log_format.parse()
    }
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            map_size: default_map_size(),
            max_dbs: default_max_dbs(),
            log_format: default_log_format(),
            log_level: default_log_level(),
            params: RegistryParams::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tcr_types::Amount;

    #[test]
    fn default_config_round_trips_through_toml() {
        let config = NodeConfig::default();
        let toml_str = config.to_toml_string().unwrap();
        let parsed = NodeConfig::from_toml_str(&toml_str).expect("should parse");
        assert_eq!(parsed.map_size, config.map_size);
        assert_eq!(parsed.params, config.params);
    }

    #[test]
    fn minimal_toml_uses_defaults() {
        let config = NodeConfig::from_toml_str("").expect("empty toml should use defaults");
        assert_eq!(config.data_dir, PathBuf::from("./tcr_data"));
        assert_eq!(config.log_format, "human");
        assert_eq!(config.params, RegistryParams::default());
        config.validate().unwrap();
    }

    #[test]
    fn partial_params_override() {
        let toml = r#"
            log_level = "debug"

            [params]
            min_deposit = 500
            quorum_bps = 6600
        "#;
        let config = NodeConfig::from_toml_str(toml).expect("should parse");
        assert_eq!(config.log_level, "debug");
        assert_eq!(config.params.min_deposit, Amount::new(500));
        assert_eq!(config.params.quorum_bps, 6600);
        assert_eq!(config.params.commit_stage, RegistryParams::default().commit_stage);
    }

    #[test]
    fn invalid_params_rejected() {
        let toml = r#"
            [params]
            quorum_bps = 10001
        "#;
        let config = NodeConfig::from_toml_str(toml).unwrap();
        assert!(matches!(config.validate(), Err(NodeError::Params(_))));
    }

    #[test]
    fn unknown_log_format_rejected() {
        let config = NodeConfig::from_toml_str(r#"log_format = "xml""#).unwrap();
        assert!(matches!(config.validate(), Err(NodeError::Config(_))));
    }

    #[test]
    fn missing_file_returns_config_error() {
        let result = NodeConfig::from_toml_file("/nonexistent/tcr.toml");
        assert!(matches!(result, Err(NodeError::Config(_))));
    }
}
