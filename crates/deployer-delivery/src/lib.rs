//! Transaction delivery module for the token deployer system.
//!
//! This module handles the submission and monitoring of blockchain
//! transactions. It provides abstractions for delivering deployment and
//! configuration transactions across multiple EVM networks, managing
//! signing, submission, and confirmation.

use alloy_primitives::{Bytes, U256};
use async_trait::async_trait;
use deployer_types::{Address, Transaction, TransactionHash, TransactionReceipt};
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;

/// Re-export implementations
pub mod implementations {
	pub mod evm {
		pub mod alloy;
	}
}

pub use implementations::evm::alloy::AlloyDelivery;

/// Errors that can occur during transaction delivery operations.
#[derive(Debug, Error)]
pub enum DeliveryError {
	/// Error that occurs during network communication.
	#[error("Network error: {0}")]
	Network(String),
	/// Error that occurs when a transaction execution fails or reverts.
	#[error("Transaction failed: {0}")]
	TransactionFailed(String),
	/// Error that occurs when the deploying wallet cannot cover the
	/// estimated transaction cost.
	#[error("Insufficient funds: need {required} wei, have {available} wei")]
	InsufficientFunds { required: U256, available: U256 },
	/// Error that occurs when no implementation is configured for a chain.
	#[error("No implementation available for chain {0}")]
	NoImplementationAvailable(u64),
}

/// Trait defining the interface for transaction delivery implementations.
///
/// Implementations sign transactions with the wallet configured for the
/// target chain, submit them, and expose the read-side RPC operations the
/// orchestrator needs.
#[cfg_attr(feature = "testing", mockall::automock)]
#[async_trait]
pub trait DeliveryInterface: Send + Sync {
	/// Signs and submits a transaction, returning its hash.
	async fn submit(&self, tx: Transaction) -> Result<TransactionHash, DeliveryError>;

	/// Waits until the transaction has the required number of confirmations
	/// and returns its receipt.
	async fn wait_for_confirmation(
		&self,
		hash: &TransactionHash,
		chain_id: u64,
		confirmations: u64,
	) -> Result<TransactionReceipt, DeliveryError>;

	/// Retrieves the receipt for a mined transaction.
	async fn get_receipt(
		&self,
		hash: &TransactionHash,
		chain_id: u64,
	) -> Result<TransactionReceipt, DeliveryError>;

	/// Gets the current gas price in wei.
	async fn get_gas_price(&self, chain_id: u64) -> Result<u128, DeliveryError>;

	/// Gets the native-currency balance of an address in wei.
	async fn get_balance(&self, address: &Address, chain_id: u64) -> Result<U256, DeliveryError>;

	/// Estimates gas for a transaction.
	async fn estimate_gas(&self, tx: Transaction) -> Result<u64, DeliveryError>;

	/// Executes a read-only contract call.
	async fn eth_call(&self, tx: Transaction) -> Result<Bytes, DeliveryError>;
}

/// Service that manages transaction delivery across multiple networks.
///
/// The DeliveryService routes each operation to the implementation
/// configured for the transaction's chain ID.
pub struct DeliveryService {
	/// Map of chain IDs to their corresponding delivery implementations.
	implementations: HashMap<u64, Arc<dyn DeliveryInterface>>,
	/// Confirmations required before a transaction is considered final.
	min_confirmations: u64,
}

impl DeliveryService {
	/// Creates a new DeliveryService with the specified implementations.
	pub fn new(
		implementations: HashMap<u64, Arc<dyn DeliveryInterface>>,
		min_confirmations: u64,
	) -> Self {
		Self {
			implementations,
			min_confirmations,
		}
	}

	fn implementation(&self, chain_id: u64) -> Result<&Arc<dyn DeliveryInterface>, DeliveryError> {
		self.implementations
			.get(&chain_id)
			.ok_or(DeliveryError::NoImplementationAvailable(chain_id))
	}

	/// Signs and submits a transaction on its chain.
	pub async fn deliver(&self, tx: Transaction) -> Result<TransactionHash, DeliveryError> {
		self.implementation(tx.chain_id)?.submit(tx).await
	}

	/// Waits for the configured number of confirmations.
	pub async fn confirm(
		&self,
		hash: &TransactionHash,
		chain_id: u64,
	) -> Result<TransactionReceipt, DeliveryError> {
		self.implementation(chain_id)?
			.wait_for_confirmation(hash, chain_id, self.min_confirmations)
			.await
	}

	/// Retrieves a transaction receipt.
	pub async fn get_receipt(
		&self,
		hash: &TransactionHash,
		chain_id: u64,
	) -> Result<TransactionReceipt, DeliveryError> {
		self.implementation(chain_id)?.get_receipt(hash, chain_id).await
	}

	/// Gets the current gas price in wei.
	pub async fn get_gas_price(&self, chain_id: u64) -> Result<u128, DeliveryError> {
		self.implementation(chain_id)?.get_gas_price(chain_id).await
	}

	/// Gets the native-currency balance of an address.
	pub async fn get_balance(
		&self,
		address: &Address,
		chain_id: u64,
	) -> Result<U256, DeliveryError> {
		self.implementation(chain_id)?
			.get_balance(address, chain_id)
			.await
	}

	/// Estimates gas for a transaction.
	pub async fn estimate_gas(&self, tx: Transaction) -> Result<u64, DeliveryError> {
		self.implementation(tx.chain_id)?.estimate_gas(tx).await
	}

	/// Executes a read-only contract call.
	pub async fn eth_call(&self, tx: Transaction) -> Result<Bytes, DeliveryError> {
		self.implementation(tx.chain_id)?.eth_call(tx).await
	}

	/// Verifies the wallet can cover the estimated cost of a transaction.
	///
	/// Estimates gas, multiplies by the current gas price, and compares
	/// against the wallet balance. Returns the gas estimate on success so
	/// callers can reuse it for the actual submission.
	pub async fn preflight_funds_check(
		&self,
		sender: &Address,
		tx: &Transaction,
	) -> Result<u64, DeliveryError> {
		let chain_id = tx.chain_id;
		let gas_estimate = self.estimate_gas(tx.clone()).await?;
		let gas_price = self.get_gas_price(chain_id).await?;
		let balance = self.get_balance(sender, chain_id).await?;

		let required = U256::from(gas_estimate)
			.checked_mul(U256::from(gas_price))
			.and_then(|cost| cost.checked_add(tx.value))
			.ok_or_else(|| {
				DeliveryError::TransactionFailed("Transaction cost overflow".to_string())
			})?;

		if balance < required {
			return Err(DeliveryError::InsufficientFunds {
				required,
				available: balance,
			});
		}

		Ok(gas_estimate)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use mockall::mock;

	mock! {
		Delivery {}

		#[async_trait]
		impl DeliveryInterface for Delivery {
			async fn submit(&self, tx: Transaction) -> Result<TransactionHash, DeliveryError>;
			async fn wait_for_confirmation(
				&self,
				hash: &TransactionHash,
				chain_id: u64,
				confirmations: u64,
			) -> Result<TransactionReceipt, DeliveryError>;
			async fn get_receipt(
				&self,
				hash: &TransactionHash,
				chain_id: u64,
			) -> Result<TransactionReceipt, DeliveryError>;
			async fn get_gas_price(&self, chain_id: u64) -> Result<u128, DeliveryError>;
			async fn get_balance(
				&self,
				address: &Address,
				chain_id: u64,
			) -> Result<U256, DeliveryError>;
			async fn estimate_gas(&self, tx: Transaction) -> Result<u64, DeliveryError>;
			async fn eth_call(&self, tx: Transaction) -> Result<Bytes, DeliveryError>;
		}
	}

	fn creation_tx(chain_id: u64) -> Transaction {
		Transaction::contract_creation(vec![0x60, 0x80], chain_id)
	}

	fn service_with(chain_id: u64, mock: MockDelivery) -> DeliveryService {
		let mut implementations: HashMap<u64, Arc<dyn DeliveryInterface>> = HashMap::new();
		implementations.insert(chain_id, Arc::new(mock));
		DeliveryService::new(implementations, 1)
	}

	#[tokio::test]
	async fn test_deliver_routes_by_chain_id() {
		let mut mock = MockDelivery::new();
		mock.expect_submit()
			.times(1)
			.returning(|_| Ok(TransactionHash(vec![0xaa; 32])));

		let service = service_with(1, mock);
		let hash = service.deliver(creation_tx(1)).await.unwrap();
		assert_eq!(hash.0, vec![0xaa; 32]);
	}

	#[tokio::test]
	async fn test_deliver_unknown_chain_fails() {
		let service = service_with(1, MockDelivery::new());
		assert!(matches!(
			service.deliver(creation_tx(137)).await,
			Err(DeliveryError::NoImplementationAvailable(137))
		));
	}

	#[tokio::test]
	async fn test_preflight_rejects_insufficient_balance() {
		let mut mock = MockDelivery::new();
		mock.expect_estimate_gas().returning(|_| Ok(1_000_000));
		mock.expect_get_gas_price().returning(|_| Ok(2_000_000_000));
		// Balance one wei short of the 2e15 wei cost.
		mock.expect_get_balance()
			.returning(|_, _| Ok(U256::from(1_999_999_999_999_999u64)));

		let service = service_with(1, mock);
		let sender = Address(vec![0x11; 20]);
		let result = service.preflight_funds_check(&sender, &creation_tx(1)).await;
		assert!(matches!(
			result,
			Err(DeliveryError::InsufficientFunds { .. })
		));
	}

	#[tokio::test]
	async fn test_preflight_passes_with_funds() {
		let mut mock = MockDelivery::new();
		mock.expect_estimate_gas().returning(|_| Ok(1_000_000));
		mock.expect_get_gas_price().returning(|_| Ok(2_000_000_000));
		mock.expect_get_balance()
			.returning(|_, _| Ok(U256::from(10_000_000_000_000_000u64)));

		let service = service_with(1, mock);
		let sender = Address(vec![0x11; 20]);
		let gas = service
			.preflight_funds_check(&sender, &creation_tx(1))
			.await
			.unwrap();
		assert_eq!(gas, 1_000_000);
	}
}
