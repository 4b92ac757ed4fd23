//! Configuration module for the token deployer system.
//!
//! This module provides structures and utilities for managing deployer
//! configuration. It supports loading configuration from TOML files and
//! provides validation to ensure all required configuration values are
//! properly set.

use deployer_types::{deserialize_networks, NetworksConfig, SecretString};
use serde::Deserialize;
use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur during configuration operations.
#[derive(Debug, Error)]
pub enum ConfigError {
	/// Error that occurs during file I/O operations.
	#[error("IO error: {0}")]
	Io(#[from] std::io::Error),
	/// Error that occurs when parsing TOML configuration.
	#[error("Configuration error: {0}")]
	Parse(String),
	/// Error that occurs when configuration validation fails.
	#[error("Validation error: {0}")]
	Validation(String),
}

impl From<toml::de::Error> for ConfigError {
	fn from(err: toml::de::Error) -> Self {
		// Extract just the message without the huge input dump
		ConfigError::Parse(err.message().to_string())
	}
}

/// Main configuration structure for the token deployer.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
	/// Configuration specific to the deployer instance.
	pub deployer: DeployerSettings,
	/// Per-chain network configurations, keyed by chain id.
	#[serde(deserialize_with = "deserialize_networks")]
	pub networks: NetworksConfig,
	/// Configuration for the storage backend.
	pub storage: StorageConfig,
	/// Configuration for the deploying account.
	pub account: AccountConfig,
}

/// Configuration specific to the deployer instance.
#[derive(Debug, Clone, Deserialize)]
pub struct DeployerSettings {
	/// Unique identifier for this deployer instance.
	pub id: String,
	/// Confirmations required before a deployment is considered final.
	#[serde(default = "default_min_confirmations")]
	pub min_confirmations: u64,
	/// Timeout in seconds for monitoring a deployment transaction.
	#[serde(default = "default_monitoring_timeout_seconds")]
	pub monitoring_timeout_seconds: u64,
	/// Interval in seconds between receipt polls.
	#[serde(default = "default_receipt_poll_interval_seconds")]
	pub receipt_poll_interval_seconds: u64,
	/// Whether to attempt explorer verification after deployment.
	#[serde(default = "default_verify_contracts")]
	pub verify_contracts: bool,
}

impl Default for DeployerSettings {
	fn default() -> Self {
		Self {
			id: "token-deployer".to_string(),
			min_confirmations: default_min_confirmations(),
			monitoring_timeout_seconds: default_monitoring_timeout_seconds(),
			receipt_poll_interval_seconds: default_receipt_poll_interval_seconds(),
			verify_contracts: default_verify_contracts(),
		}
	}
}

/// Which storage backend to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
	Memory,
	File,
}

/// Configuration for the storage backend.
#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
	/// Which backend implementation to use.
	pub backend: StorageBackend,
	/// Base directory for the file backend.
	#[serde(default)]
	pub path: Option<PathBuf>,
}

/// Configuration for the deploying account.
#[derive(Debug, Clone, Deserialize)]
pub struct AccountConfig {
	/// Hex-encoded private key of the deploying wallet.
	pub private_key: SecretString,
}

fn default_min_confirmations() -> u64 {
	1
}

fn default_monitoring_timeout_seconds() -> u64 {
	300
}

fn default_receipt_poll_interval_seconds() -> u64 {
	3
}

fn default_verify_contracts() -> bool {
	true
}

impl Config {
	/// Loads and validates configuration from a TOML file.
	pub fn from_file(path: &str) -> Result<Self, ConfigError> {
		let contents = std::fs::read_to_string(path)?;
		Self::from_toml(&contents)
	}

	/// Parses and validates configuration from a TOML string.
	pub fn from_toml(contents: &str) -> Result<Self, ConfigError> {
		let config: Config = toml::from_str(contents)?;
		config.validate()?;
		Ok(config)
	}

	/// Validates the configuration to ensure all required fields are properly set.
	fn validate(&self) -> Result<(), ConfigError> {
		if self.deployer.id.is_empty() {
			return Err(ConfigError::Validation(
				"Deployer ID cannot be empty".into(),
			));
		}
		if self.deployer.receipt_poll_interval_seconds == 0 {
			return Err(ConfigError::Validation(
				"receipt_poll_interval_seconds must be greater than 0".into(),
			));
		}
		if self.deployer.monitoring_timeout_seconds == 0 {
			return Err(ConfigError::Validation(
				"monitoring_timeout_seconds must be greater than 0".into(),
			));
		}

		if self.networks.is_empty() {
			return Err(ConfigError::Validation(
				"Networks configuration cannot be empty".into(),
			));
		}
		for (chain_id, network) in &self.networks {
			if network.rpc_urls.is_empty() {
				return Err(ConfigError::Validation(format!(
					"Network {chain_id} must have at least one RPC endpoint"
				)));
			}
			if network.get_http_url().is_none() {
				return Err(ConfigError::Validation(format!(
					"Network {chain_id} must have at least one HTTP RPC URL"
				)));
			}
		}

		if self.storage.backend == StorageBackend::File && self.storage.path.is_none() {
			return Err(ConfigError::Validation(
				"File storage backend requires a path".into(),
			));
		}

		let key_ok = self
			.account
			.private_key
			.with_exposed(|key| !key.trim_start_matches("0x").is_empty());
		if !key_ok {
			return Err(ConfigError::Validation(
				"Account private key cannot be empty".into(),
			));
		}

		Ok(())
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn valid_toml() -> String {
		r#"
			[deployer]
			id = "token-deployer"

			[networks.11155111]
			rpc_urls = [{ http = "https://rpc.sepolia.org" }]
			explorer_url = "https://sepolia.etherscan.io"
			explorer_api_url = "https://api-sepolia.etherscan.io/api"
			native_symbol = "ETH"

			[storage]
			backend = "memory"

			[account]
			private_key = "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80"
		"#
		.to_string()
	}

	#[test]
	fn test_parse_valid_config() {
		let config = Config::from_toml(&valid_toml()).unwrap();
		assert_eq!(config.deployer.id, "token-deployer");
		assert_eq!(config.deployer.min_confirmations, 1);
		assert!(config.deployer.verify_contracts);
		assert_eq!(config.storage.backend, StorageBackend::Memory);
		assert!(config.networks.contains_key(&11155111));
	}

	#[test]
	fn test_rejects_empty_networks() {
		let toml = r#"
			[deployer]
			id = "token-deployer"

			[networks]

			[storage]
			backend = "memory"

			[account]
			private_key = "0xabc"
		"#;
		assert!(matches!(
			Config::from_toml(toml),
			Err(ConfigError::Validation(_))
		));
	}

	#[test]
	fn test_file_backend_requires_path() {
		let toml = valid_toml().replace("backend = \"memory\"", "backend = \"file\"");
		assert!(matches!(
			Config::from_toml(&toml),
			Err(ConfigError::Validation(_))
		));
	}

	#[test]
	fn test_from_file() {
		let dir = tempfile::TempDir::new().unwrap();
		let path = dir.path().join("config.toml");
		std::fs::write(&path, valid_toml()).unwrap();

		let config = Config::from_file(path.to_str().unwrap()).unwrap();
		assert_eq!(config.deployer.id, "token-deployer");
	}
}
