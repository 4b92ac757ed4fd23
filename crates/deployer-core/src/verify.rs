//! Explorer source verification.
//!
//! Submits bundled template source to an Etherscan-compatible explorer API
//! after a confirmed deployment. Verification is strictly best-effort: the
//! engine records the outcome on the deployment record but never fails a
//! deployment over it.

use async_trait::async_trait;
use deployer_types::NetworkConfig;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};

/// How many times to poll the explorer for the verification outcome.
const STATUS_POLL_ATTEMPTS: u32 = 10;
/// Delay between status polls.
const STATUS_POLL_DELAY: Duration = Duration::from_secs(3);

/// Errors that can occur during source verification.
#[derive(Debug, Error)]
pub enum VerifyError {
	/// The network has no explorer API configured.
	#[error("No explorer API configured for chain {0}")]
	NotConfigured(u64),
	/// HTTP-level failure talking to the explorer.
	#[error("Explorer request failed: {0}")]
	Http(String),
	/// The explorer rejected the submission or the verification failed.
	#[error("Verification rejected: {0}")]
	Rejected(String),
	/// The explorer never reported a final outcome within the poll budget.
	#[error("Verification still pending after {0} polls")]
	Pending(u32),
}

/// Everything the explorer needs to reproduce the deployed bytecode.
#[derive(Debug, Clone)]
pub struct VerificationRequest {
	/// Chain the contract lives on; used for error reporting only.
	pub chain_id: u64,
	/// Deployed contract address, 0x-prefixed.
	pub contract_address: String,
	/// Solidity contract name inside the source file.
	pub contract_name: String,
	/// Flattened single-file source.
	pub source: String,
	/// Full solc version string, e.g. "v0.8.24+commit.e11b9ed9".
	pub compiler_version: String,
	/// Whether the optimizer was enabled.
	pub optimizer_enabled: bool,
	/// Optimizer runs setting.
	pub optimizer_runs: u32,
	/// ABI-encoded constructor arguments as hex, without the 0x prefix.
	pub constructor_args: String,
}

/// Interface for explorer source verification.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait VerifierInterface: Send + Sync {
	/// Submits the source and waits for the explorer's verdict.
	async fn verify(
		&self,
		network: &NetworkConfig,
		request: &VerificationRequest,
	) -> Result<(), VerifyError>;
}

/// Etherscan-compatible verifier.
///
/// Speaks the two-step `verifysourcecode` / `checkverifystatus` protocol
/// shared by Etherscan, Blockscout, and most chain explorers.
pub struct EtherscanVerifier {
	client: Client,
}

/// Envelope shared by both explorer endpoints.
#[derive(Debug, Deserialize)]
struct ExplorerResponse {
	status: String,
	result: String,
}

impl EtherscanVerifier {
	pub fn new() -> Self {
		Self {
			client: Client::builder()
				.timeout(Duration::from_secs(30))
				.build()
				.unwrap_or_default(),
		}
	}

	async fn submit(
		&self,
		api_url: &str,
		api_key: &str,
		request: &VerificationRequest,
	) -> Result<String, VerifyError> {
		// "constructorArguements" is the API's own spelling.
		let form = [
			("module", "contract"),
			("action", "verifysourcecode"),
			("codeformat", "solidity-single-file"),
			("sourceCode", &request.source),
			("contractaddress", &request.contract_address),
			("contractname", &request.contract_name),
			("compilerversion", &request.compiler_version),
			(
				"optimizationUsed",
				if request.optimizer_enabled { "1" } else { "0" },
			),
			("runs", &request.optimizer_runs.to_string()),
			("constructorArguements", &request.constructor_args),
			("apikey", api_key),
		];

		let response: ExplorerResponse = self
			.client
			.post(api_url)
			.form(&form)
			.send()
			.await
			.map_err(|e| VerifyError::Http(e.to_string()))?
			.json()
			.await
			.map_err(|e| VerifyError::Http(e.to_string()))?;

		if response.status != "1" {
			return Err(VerifyError::Rejected(response.result));
		}
		// On success the result field carries the submission GUID.
		Ok(response.result)
	}

	async fn poll_status(
		&self,
		api_url: &str,
		api_key: &str,
		guid: &str,
	) -> Result<(), VerifyError> {
		for attempt in 1..=STATUS_POLL_ATTEMPTS {
			tokio::time::sleep(STATUS_POLL_DELAY).await;

			let response: ExplorerResponse = self
				.client
				.get(api_url)
				.query(&[
					("module", "contract"),
					("action", "checkverifystatus"),
					("guid", guid),
					("apikey", api_key),
				])
				.send()
				.await
				.map_err(|e| VerifyError::Http(e.to_string()))?
				.json()
				.await
				.map_err(|e| VerifyError::Http(e.to_string()))?;

			if response.status == "1" {
				return Ok(());
			}
			if response.result.contains("Pending") {
				debug!(attempt, guid, "Verification still pending");
				continue;
			}
			return Err(VerifyError::Rejected(response.result));
		}
		Err(VerifyError::Pending(STATUS_POLL_ATTEMPTS))
	}
}

impl Default for EtherscanVerifier {
	fn default() -> Self {
		Self::new()
	}
}

#[async_trait]
impl VerifierInterface for EtherscanVerifier {
	async fn verify(
		&self,
		network: &NetworkConfig,
		request: &VerificationRequest,
	) -> Result<(), VerifyError> {
		let api_url = network
			.explorer_api_url
			.as_deref()
			.ok_or(VerifyError::NotConfigured(request.chain_id))?;
		let api_key = network.explorer_api_key.as_deref().unwrap_or("");

		debug!(
			contract = %request.contract_address,
			api_url,
			"Submitting source for verification"
		);
		let guid = self.submit(api_url, api_key, request).await?;

		match self.poll_status(api_url, api_key, &guid).await {
			Ok(()) => Ok(()),
			Err(e) => {
				warn!(contract = %request.contract_address, error = %e, "Verification did not succeed");
				Err(e)
			},
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn network(api_url: Option<&str>) -> NetworkConfig {
		NetworkConfig {
			rpc_urls: vec![],
			explorer_url: None,
			explorer_api_url: api_url.map(|s| s.to_string()),
			explorer_api_key: None,
			native_symbol: "ETH".to_string(),
		}
	}

	fn request() -> VerificationRequest {
		VerificationRequest {
			chain_id: 11155111,
			contract_address: "0x5fbdb2315678afecb367f032d93f642f64180aa3".to_string(),
			contract_name: "BasicToken".to_string(),
			source: "pragma solidity 0.8.24;".to_string(),
			compiler_version: "v0.8.24+commit.e11b9ed9".to_string(),
			optimizer_enabled: true,
			optimizer_runs: 200,
			constructor_args: "".to_string(),
		}
	}

	#[tokio::test]
	async fn test_missing_explorer_api_is_not_configured() {
		let verifier = EtherscanVerifier::new();
		let result = verifier.verify(&network(None), &request()).await;
		assert!(matches!(result, Err(VerifyError::NotConfigured(11155111))));
	}

	#[test]
	fn test_explorer_response_parsing() {
		let ok: ExplorerResponse =
			serde_json::from_str(r#"{"status":"1","message":"OK","result":"guid-123"}"#).unwrap();
		assert_eq!(ok.status, "1");
		assert_eq!(ok.result, "guid-123");

		let err: ExplorerResponse = serde_json::from_str(
			r#"{"status":"0","message":"NOTOK","result":"Unable to locate ContractCode"}"#,
		)
		.unwrap();
		assert_eq!(err.status, "0");
	}
}
