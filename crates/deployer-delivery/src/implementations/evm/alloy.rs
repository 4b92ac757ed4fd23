//! Transaction delivery implementations for the deployer service.
//!
//! This module provides concrete implementations of the DeliveryInterface
//! trait, supporting blockchain transaction submission and monitoring using
//! the Alloy library.

use crate::{DeliveryError, DeliveryInterface};
use alloy_network::EthereumWallet;
use alloy_primitives::{Bytes, FixedBytes, U256};
use alloy_provider::{
	fillers::{ChainIdFiller, GasFiller, NonceFiller, SimpleNonceManager},
	DynProvider, PendingTransactionConfig, PendingTransactionError, Provider, ProviderBuilder,
};
use alloy_rpc_client::RpcClient;
use alloy_rpc_types::TransactionRequest;
use alloy_signer::Signer;
use alloy_signer_local::PrivateKeySigner;
use alloy_transport::layers::RetryBackoffLayer;
use async_trait::async_trait;
use deployer_types::{
	with_0x_prefix, Address, NetworksConfig, Transaction, TransactionHash, TransactionReceipt,
};
use std::collections::HashMap;
use std::time::Duration;

/// Alloy-based EVM delivery implementation.
///
/// This implementation uses the Alloy library to submit and monitor
/// transactions on EVM-compatible blockchains. It handles transaction
/// signing, submission, and confirmation tracking. Supports multiple
/// networks with a single instance.
pub struct AlloyDelivery {
	/// Alloy providers for each supported network.
	providers: HashMap<u64, DynProvider>,
	/// Poll interval used when waiting for confirmations.
	poll_interval: Duration,
}

impl AlloyDelivery {
	/// Creates a new AlloyDelivery instance.
	///
	/// Configures an Alloy provider per network with the configured RPC URL
	/// and a wallet derived from the deployer's signer.
	pub async fn new(
		networks: &NetworksConfig,
		signer: PrivateKeySigner,
		poll_interval: Duration,
	) -> Result<Self, DeliveryError> {
		if networks.is_empty() {
			return Err(DeliveryError::Network(
				"At least one network must be configured".to_string(),
			));
		}

		let mut providers = HashMap::new();

		for (network_id, network) in networks {
			let http_url = network.get_http_url().ok_or_else(|| {
				DeliveryError::Network(format!(
					"No HTTP RPC URL configured for network {}",
					network_id
				))
			})?;

			let url = http_url.parse().map_err(|e| {
				DeliveryError::Network(format!("Invalid RPC URL for network {}: {}", network_id, e))
			})?;

			let chain_signer = signer.clone().with_chain_id(Some(*network_id));
			let wallet = EthereumWallet::from(chain_signer);

			// Retry on transient network errors and rate limits.
			let retry_layer = RetryBackoffLayer::new(5, 1000, 10);
			let client = RpcClient::builder().layer(retry_layer).http(url);

			let provider = ProviderBuilder::new()
				.filler(NonceFiller::new(SimpleNonceManager::default()))
				.filler(GasFiller)
				.filler(ChainIdFiller::default())
				.wallet(wallet)
				.on_client(client);

			provider.client().set_poll_interval(poll_interval);

			providers.insert(*network_id, provider.erased());
		}

		Ok(Self {
			providers,
			poll_interval,
		})
	}

	/// Gets the provider for a specific chain ID.
	fn get_provider(&self, chain_id: u64) -> Result<&DynProvider, DeliveryError> {
		self.providers.get(&chain_id).ok_or_else(|| {
			DeliveryError::Network(format!("No provider configured for chain ID {}", chain_id))
		})
	}

	fn convert_receipt(
		receipt: alloy_rpc_types::TransactionReceipt,
	) -> TransactionReceipt {
		let logs = receipt
			.inner
			.logs()
			.iter()
			.map(|log| deployer_types::Log {
				address: Address(log.address().0.to_vec()),
				topics: log
					.topics()
					.iter()
					.map(|topic| deployer_types::H256(topic.0))
					.collect(),
				data: log.inner.data.data.to_vec(),
			})
			.collect();

		TransactionReceipt {
			hash: TransactionHash(receipt.transaction_hash.0.to_vec()),
			block_number: receipt.block_number.unwrap_or(0),
			success: receipt.status(),
			contract_address: receipt
				.contract_address
				.map(|addr| Address(addr.0.to_vec())),
			gas_used: receipt.gas_used,
			effective_gas_price: receipt.effective_gas_price,
			logs,
		}
	}
}

#[async_trait]
impl DeliveryInterface for AlloyDelivery {
	async fn submit(&self, tx: Transaction) -> Result<TransactionHash, DeliveryError> {
		let chain_id = tx.chain_id;
		let provider = self.get_provider(chain_id)?;

		let request: TransactionRequest = tx.into();

		tracing::debug!(
			chain_id,
			to = ?request.to,
			data_len = request.input.input().map(|d| d.len()).unwrap_or(0),
			gas_limit = ?request.gas,
			"Sending transaction"
		);

		// The provider's wallet handles signing.
		let pending_tx = provider.send_transaction(request).await.map_err(|e| {
			tracing::error!(chain_id, error = %e, "Transaction submission failed");
			classify_send_error(&e.to_string())
		})?;

		let tx_hash = *pending_tx.tx_hash();
		tracing::info!(
			tx_hash = %with_0x_prefix(&hex::encode(tx_hash.0)),
			chain_id,
			"Transaction submitted"
		);

		Ok(TransactionHash(tx_hash.0.to_vec()))
	}

	async fn wait_for_confirmation(
		&self,
		hash: &TransactionHash,
		chain_id: u64,
		confirmations: u64,
	) -> Result<TransactionReceipt, DeliveryError> {
		let tx_hash = FixedBytes::<32>::from_slice(&hash.0);
		let provider = self.get_provider(chain_id)?;

		// Block times vary per chain; size the timeout generously off the
		// poll interval rather than a fixed per-chain table.
		let timeout = self.poll_interval * 100 * (confirmations.max(1) as u32);

		let config = PendingTransactionConfig::new(tx_hash)
			.with_required_confirmations(confirmations)
			.with_timeout(Some(timeout));

		let pending_tx = provider
			.watch_pending_transaction(config)
			.await
			.map_err(|e| match e {
				PendingTransactionError::FailedToRegister => {
					DeliveryError::Network("Failed to register transaction watcher".to_string())
				},
				other => DeliveryError::Network(format!("Transaction watch failed: {}", other)),
			})?;

		let confirmed_hash = pending_tx
			.await
			.map_err(|e| DeliveryError::Network(format!("Failed to confirm transaction: {}", e)))?;

		let receipt = self
			.get_receipt(&TransactionHash(confirmed_hash.0.to_vec()), chain_id)
			.await?;

		if !receipt.success {
			return Err(DeliveryError::TransactionFailed(format!(
				"Transaction {} reverted",
				receipt.hash
			)));
		}

		Ok(receipt)
	}

	async fn get_receipt(
		&self,
		hash: &TransactionHash,
		chain_id: u64,
	) -> Result<TransactionReceipt, DeliveryError> {
		let tx_hash = FixedBytes::<32>::from_slice(&hash.0);
		let provider = self.get_provider(chain_id)?;

		match provider.get_transaction_receipt(tx_hash).await {
			Ok(Some(receipt)) => Ok(Self::convert_receipt(receipt)),
			Ok(None) => Err(DeliveryError::Network(format!(
				"Transaction not found on chain {}",
				chain_id
			))),
			Err(e) => Err(DeliveryError::Network(format!(
				"Failed to get receipt on chain {}: {}",
				chain_id, e
			))),
		}
	}

	async fn get_gas_price(&self, chain_id: u64) -> Result<u128, DeliveryError> {
		let provider = self.get_provider(chain_id)?;
		provider
			.get_gas_price()
			.await
			.map_err(|e| DeliveryError::Network(format!("Failed to get gas price: {}", e)))
	}

	async fn get_balance(&self, address: &Address, chain_id: u64) -> Result<U256, DeliveryError> {
		let provider = self.get_provider(chain_id)?;
		if address.0.len() != 20 {
			return Err(DeliveryError::Network(
				"Invalid address length".to_string(),
			));
		}

		provider
			.get_balance(address.to_alloy())
			.await
			.map_err(|e| DeliveryError::Network(format!("Failed to get balance: {}", e)))
	}

	async fn estimate_gas(&self, tx: Transaction) -> Result<u64, DeliveryError> {
		let chain_id = tx.chain_id;
		let provider = self.get_provider(chain_id)?;
		let request: TransactionRequest = tx.into();

		provider
			.estimate_gas(request)
			.await
			.map_err(|e| classify_send_error(&e.to_string()))
	}

	async fn eth_call(&self, tx: Transaction) -> Result<Bytes, DeliveryError> {
		let chain_id = tx.chain_id;
		let provider = self.get_provider(chain_id)?;
		let request: TransactionRequest = tx.into();

		provider
			.call(request)
			.await
			.map_err(|e| classify_send_error(&e.to_string()))
	}
}

/// Maps RPC error strings onto the delivery error taxonomy.
///
/// Node implementations disagree on error formats, so this is a best-effort
/// substring match; anything unrecognized is reported as a network error.
fn classify_send_error(message: &str) -> DeliveryError {
	let lower = message.to_lowercase();
	if lower.contains("insufficient funds") {
		DeliveryError::InsufficientFunds {
			required: U256::ZERO,
			available: U256::ZERO,
		}
	} else if lower.contains("revert") || lower.contains("execution reverted") {
		DeliveryError::TransactionFailed(message.to_string())
	} else {
		DeliveryError::Network(message.to_string())
	}
}
