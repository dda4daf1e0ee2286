//! Configuration loading and typed config structures for the indexer.
//!
//! The canonical configuration lives in `anchor-config.yaml` at the
//! project root. This module defines strongly-typed structs that mirror
//! the YAML structure, provides a loader that reads the file, and applies
//! environment overrides for deployment-specific values. Validation is
//! fatal: the indexer refuses to start with an incomplete ledger or
//! database configuration.

use std::path::Path;

use serde::Deserialize;

use anchor_codec::Sources;
use anchor_types::Address;

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read the configuration file from disk.
    #[error("failed to read config file: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// Failed to parse YAML content.
    #[error("failed to parse config YAML: {source}")]
    Yaml {
        /// The underlying YAML parse error.
        source: serde_yml::Error,
    },

    /// A required value is absent from both the file and the environment.
    #[error("missing required config value: {0}")]
    Missing(&'static str),

    /// A value is present but unusable.
    #[error("invalid config value for {field}: {reason}")]
    Invalid {
        /// The offending field.
        field: &'static str,
        /// Why it was rejected.
        reason: String,
    },
}

impl From<serde_yml::Error> for ConfigError {
    fn from(source: serde_yml::Error) -> Self {
        Self::Yaml { source }
    }
}

/// Top-level indexer configuration.
///
/// Mirrors the structure of `anchor-config.yaml`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct IndexerConfig {
    /// Ledger node connection and contract addresses.
    #[serde(default)]
    pub ledger: LedgerConfig,

    /// Database connection settings.
    #[serde(default)]
    pub database: DatabaseConfig,

    /// Reputation sweep settings.
    #[serde(default)]
    pub reputation: ReputationConfig,
}

impl IndexerConfig {
    /// Load configuration from a YAML file at the given path.
    ///
    /// Environment variables override YAML values for deployment URLs and
    /// addresses:
    /// - `RPC_URL` overrides `ledger.rpc_url`
    /// - `DATABASE_URL` overrides `database.url`
    /// - `IDENTITY_CONTRACT_ADDRESS` overrides `ledger.identity_contract`
    /// - `AGREEMENTS_CONTRACT_ADDRESS` overrides `ledger.agreements_contract`
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be read,
    /// [`ConfigError::Yaml`] if the content is not valid YAML, or a
    /// validation error if a required value is missing or malformed.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::parse(&contents)
    }

    /// Parse configuration from a YAML string and validate it.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Yaml`] if the string is not valid YAML, or
    /// a validation error if a required value is missing or malformed.
    pub fn parse(yaml: &str) -> Result<Self, ConfigError> {
        let mut config: Self = serde_yml::from_str(yaml)?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(url) = std::env::var("RPC_URL") {
            self.ledger.rpc_url = url;
        }
        if let Ok(url) = std::env::var("DATABASE_URL") {
            self.database.url = url;
        }
        if let Ok(addr) = std::env::var("IDENTITY_CONTRACT_ADDRESS") {
            self.ledger.identity_contract = addr;
        }
        if let Ok(addr) = std::env::var("AGREEMENTS_CONTRACT_ADDRESS") {
            self.ledger.agreements_contract = addr;
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.ledger.rpc_url.is_empty() {
            return Err(ConfigError::Missing("ledger.rpc_url (or RPC_URL)"));
        }
        if self.database.url.is_empty() {
            return Err(ConfigError::Missing("database.url (or DATABASE_URL)"));
        }
        if self.ledger.identity_contract.is_empty() {
            return Err(ConfigError::Missing(
                "ledger.identity_contract (or IDENTITY_CONTRACT_ADDRESS)",
            ));
        }
        if self.ledger.agreements_contract.is_empty() {
            return Err(ConfigError::Missing(
                "ledger.agreements_contract (or AGREEMENTS_CONTRACT_ADDRESS)",
            ));
        }
        self.sources().map(|_| ())
    }

    /// Parse the configured contract addresses into decoder sources.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] if either address is not a
    /// 20-byte hex string.
    pub fn sources(&self) -> Result<Sources, ConfigError> {
        let identity = Address::from_hex(&self.ledger.identity_contract).map_err(|e| {
            ConfigError::Invalid {
                field: "ledger.identity_contract",
                reason: e.to_string(),
            }
        })?;
        let agreements = Address::from_hex(&self.ledger.agreements_contract).map_err(|e| {
            ConfigError::Invalid {
                field: "ledger.agreements_contract",
                reason: e.to_string(),
            }
        })?;
        Ok(Sources {
            identity,
            agreements,
        })
    }
}

/// Ledger node configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LedgerConfig {
    /// JSON-RPC endpoint of the ledger node.
    #[serde(default)]
    pub rpc_url: String,

    /// Address of the identity contract, `0x`-prefixed hex.
    #[serde(default)]
    pub identity_contract: String,

    /// Address of the agreements contract, `0x`-prefixed hex.
    #[serde(default)]
    pub agreements_contract: String,

    /// Milliseconds between head polls while tailing.
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            rpc_url: String::new(),
            identity_contract: String::new(),
            agreements_contract: String::new(),
            poll_interval_ms: default_poll_interval_ms(),
        }
    }
}

/// Database configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct DatabaseConfig {
    /// `PostgreSQL` connection URL.
    #[serde(default)]
    pub url: String,

    /// Maximum number of pooled connections.
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            max_connections: default_max_connections(),
        }
    }
}

/// Reputation sweep configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ReputationConfig {
    /// Whether to run a full scoring sweep after the initial backfill.
    #[serde(default = "default_true")]
    pub sweep_after_backfill: bool,
}

impl Default for ReputationConfig {
    fn default() -> Self {
        Self {
            sweep_after_backfill: true,
        }
    }
}

fn default_poll_interval_ms() -> u64 {
    2_000
}

fn default_max_connections() -> u32 {
    10
}

const fn default_true() -> bool {
    true
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    const IDENTITY: &str = "0x1111111111111111111111111111111111111111";
    const AGREEMENTS: &str = "0x2222222222222222222222222222222222222222";

    fn full_yaml() -> String {
        format!(
            "ledger:\n  rpc_url: http://localhost:8545\n  identity_contract: \"{IDENTITY}\"\n  agreements_contract: \"{AGREEMENTS}\"\ndatabase:\n  url: postgresql://anchor@localhost/anchor\n"
        )
    }

    #[test]
    fn full_config_parses_and_yields_sources() {
        let config = IndexerConfig::parse(&full_yaml()).unwrap();
        assert_eq!(config.ledger.rpc_url, "http://localhost:8545");
        assert_eq!(config.ledger.poll_interval_ms, 2_000);
        assert_eq!(config.database.max_connections, 10);
        assert!(config.reputation.sweep_after_backfill);

        let sources = config.sources().unwrap();
        assert_eq!(sources.identity.to_hex(), IDENTITY);
        assert_eq!(sources.agreements.to_hex(), AGREEMENTS);
    }

    #[test]
    fn missing_rpc_url_is_fatal() {
        let yaml = format!(
            "ledger:\n  identity_contract: \"{IDENTITY}\"\n  agreements_contract: \"{AGREEMENTS}\"\ndatabase:\n  url: postgresql://anchor@localhost/anchor\n"
        );
        let result = IndexerConfig::parse(&yaml);
        assert!(matches!(result, Err(ConfigError::Missing(field)) if field.contains("rpc_url")));
    }

    #[test]
    fn malformed_contract_address_is_fatal() {
        let yaml = "ledger:\n  rpc_url: http://localhost:8545\n  identity_contract: \"0x1234\"\n  agreements_contract: \"0x2222222222222222222222222222222222222222\"\ndatabase:\n  url: postgresql://anchor@localhost/anchor\n";
        let result = IndexerConfig::parse(yaml);
        assert!(matches!(
            result,
            Err(ConfigError::Invalid {
                field: "ledger.identity_contract",
                ..
            })
        ));
    }
}
