//! Network configuration types for multi-chain deployments.
//!
//! This module defines the configuration structures for network-specific
//! settings: RPC URLs, explorer endpoints for source verification, and the
//! native currency symbol used when reporting deployment costs. Network
//! descriptors are always supplied by the caller; the core never infers them.

use serde::{Deserialize, Deserializer, Serialize};
use std::collections::HashMap;

/// Configuration for RPC endpoints supporting both HTTP and WebSocket protocols.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RpcEndpoint {
	#[serde(skip_serializing_if = "Option::is_none")]
	pub http: Option<String>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub ws: Option<String>,
}

impl RpcEndpoint {
	/// Creates a new RPC endpoint with HTTP URL only.
	pub fn http_only(url: String) -> Self {
		Self {
			http: Some(url),
			ws: None,
		}
	}
}

/// Configuration for a single blockchain network.
///
/// # Fields
///
/// * `rpc_urls` - RPC endpoints in fallback order
/// * `explorer_url` - Base explorer URL for linking to deployed contracts
/// * `explorer_api_url` - Explorer API endpoint used for source verification
/// * `explorer_api_key` - Optional API key for the explorer API
/// * `native_symbol` - Native currency symbol (e.g. "ETH", "BNB")
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct NetworkConfig {
	pub rpc_urls: Vec<RpcEndpoint>,
	pub explorer_url: Option<String>,
	pub explorer_api_url: Option<String>,
	#[serde(default)]
	pub explorer_api_key: Option<String>,
	pub native_symbol: String,
}

impl NetworkConfig {
	/// Get the first available HTTP URL from the RPC endpoints.
	pub fn get_http_url(&self) -> Option<&str> {
		self.rpc_urls
			.iter()
			.find_map(|endpoint| endpoint.http.as_deref())
	}

	/// Get all HTTP URLs for fallback purposes.
	pub fn get_all_http_urls(&self) -> Vec<&str> {
		self.rpc_urls
			.iter()
			.filter_map(|endpoint| endpoint.http.as_deref())
			.collect()
	}
}

/// Networks configuration mapping chain IDs to their configurations.
pub type NetworksConfig = HashMap<u64, NetworkConfig>;

/// Helper function to deserialize network configurations from TOML.
///
/// Chain IDs arrive as string keys (TOML tables cannot have numeric keys)
/// and are converted to u64 for internal use.
pub fn deserialize_networks<'de, D>(deserializer: D) -> Result<NetworksConfig, D::Error>
where
	D: Deserializer<'de>,
{
	let string_map: HashMap<String, NetworkConfig> = HashMap::deserialize(deserializer)?;
	let mut result = HashMap::new();

	for (key, value) in string_map {
		let chain_id = key
			.parse::<u64>()
			.map_err(|e| serde::de::Error::custom(format!("Invalid chain_id '{}': {}", key, e)))?;
		result.insert(chain_id, value);
	}

	Ok(result)
}
