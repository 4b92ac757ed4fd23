//! Account provider implementations for the deployer service.
//!
//! This module provides concrete implementations of the AccountInterface
//! trait, currently supporting local private key wallets using the Alloy
//! library.

use crate::{AccountError, AccountInterface};
use alloy_consensus::TxLegacy;
use alloy_network::TxSigner;
use alloy_primitives::{Address as AlloyAddress, Bytes, TxKind};
use alloy_signer::Signer;
use alloy_signer_local::PrivateKeySigner;
use async_trait::async_trait;
use deployer_types::{with_0x_prefix, Address, SecretString, Signature, Transaction};

/// Local wallet implementation using Alloy's signer.
///
/// This implementation manages a private key locally and uses it to sign
/// transactions and messages. It's suitable for the browser-wizard backend
/// where the deploying key is held by the service itself.
#[derive(Debug)]
pub struct LocalWallet {
	/// The underlying Alloy signer that handles cryptographic operations.
	signer: PrivateKeySigner,
}

impl LocalWallet {
	/// Creates a new LocalWallet from a hex-encoded private key.
	///
	/// The private key should be provided as a hex string (with or without
	/// 0x prefix).
	pub fn new(private_key_hex: &str) -> Result<Self, AccountError> {
		let signer = private_key_hex
			.parse::<PrivateKeySigner>()
			.map_err(|e| AccountError::InvalidKey(format!("Invalid private key: {}", e)))?;

		Ok(Self { signer })
	}

	/// Creates a new LocalWallet from a SecretString-wrapped key.
	pub fn from_secret(private_key: &SecretString) -> Result<Self, AccountError> {
		private_key.with_exposed(Self::new)
	}
}

#[async_trait]
impl AccountInterface for LocalWallet {
	async fn address(&self) -> Result<Address, AccountError> {
		Ok(self.signer.address().into())
	}

	async fn sign_transaction(&self, tx: &Transaction) -> Result<Signature, AccountError> {
		let to = if let Some(to_addr) = &tx.to {
			if to_addr.0.len() != 20 {
				return Err(AccountError::SigningFailed(
					"Invalid address length".to_string(),
				));
			}
			let mut addr_bytes = [0u8; 20];
			addr_bytes.copy_from_slice(&to_addr.0);
			TxKind::Call(AlloyAddress::from(addr_bytes))
		} else {
			TxKind::Create
		};

		let mut legacy_tx = TxLegacy {
			chain_id: Some(tx.chain_id),
			nonce: tx.nonce.unwrap_or(0),
			gas_price: tx.gas_price.unwrap_or(0),
			gas_limit: tx.gas_limit.unwrap_or(0),
			to,
			value: tx.value,
			input: Bytes::from(tx.data.clone()),
		};

		let signature = self
			.signer
			.sign_transaction(&mut legacy_tx)
			.await
			.map_err(|e| {
				AccountError::SigningFailed(format!("Failed to sign transaction: {}", e))
			})?;

		Ok(signature.into())
	}

	async fn sign_message(&self, message: &[u8]) -> Result<Signature, AccountError> {
		let signature =
			self.signer.sign_message(message).await.map_err(|e| {
				AccountError::SigningFailed(format!("Failed to sign message: {}", e))
			})?;

		Ok(signature.into())
	}

	fn private_key(&self) -> SecretString {
		SecretString::new(with_0x_prefix(&hex::encode(self.signer.to_bytes())))
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use alloy_primitives::U256;

	// Well-known anvil development key.
	const TEST_KEY: &str = "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";

	#[tokio::test]
	async fn test_address_derivation() {
		let wallet = LocalWallet::new(TEST_KEY).unwrap();
		let address = wallet.address().await.unwrap();
		assert_eq!(
			format!("{}", address),
			"0xf39fd6e51aad88f6f4ce6ab8827279cfffb92266"
		);
	}

	#[tokio::test]
	async fn test_sign_contract_creation() {
		let wallet = LocalWallet::new(TEST_KEY).unwrap();
		let tx = Transaction {
			to: None,
			data: vec![0x60, 0x80, 0x60, 0x40],
			value: U256::ZERO,
			chain_id: 1,
			nonce: Some(0),
			gas_limit: Some(2_000_000),
			gas_price: Some(1_000_000_000),
			max_fee_per_gas: None,
			max_priority_fee_per_gas: None,
		};
		let signature = wallet.sign_transaction(&tx).await.unwrap();
		assert_eq!(signature.0.len(), 65);
	}

	#[test]
	fn test_invalid_key_rejected() {
		assert!(matches!(
			LocalWallet::new("not-a-key"),
			Err(AccountError::InvalidKey(_))
		));
	}
}
