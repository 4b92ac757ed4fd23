//! Account management module for the token deployer system.
//!
//! This module provides abstractions for managing the deploying wallet and
//! its signing operations. It defines interfaces and services for account
//! operations such as address retrieval and transaction signing.

use async_trait::async_trait;
use deployer_types::{Address, SecretString, Signature, Transaction};
use thiserror::Error;

/// Re-export implementations
pub mod implementations {
	pub mod local;
}

pub use implementations::local::LocalWallet;

/// Errors that can occur during account operations.
#[derive(Debug, Error)]
pub enum AccountError {
	/// Error that occurs when signing operations fail.
	#[error("Signing failed: {0}")]
	SigningFailed(String),
	/// Error that occurs when a cryptographic key is invalid or malformed.
	#[error("Invalid key: {0}")]
	InvalidKey(String),
	/// Error that occurs when interacting with the account implementation.
	#[error("Implementation error: {0}")]
	Implementation(String),
}

/// Trait defining the interface for account implementations.
///
/// Implementations provide the deploying wallet's address and sign
/// transactions and messages on its behalf.
#[cfg_attr(feature = "testing", mockall::automock)]
#[async_trait]
pub trait AccountInterface: Send + Sync {
	/// Retrieves the address associated with this account.
	async fn address(&self) -> Result<Address, AccountError>;

	/// Signs a transaction using the account's private key.
	async fn sign_transaction(&self, tx: &Transaction) -> Result<Signature, AccountError>;

	/// Signs an arbitrary message using the account's private key.
	///
	/// Handles EIP-191 prefixing internally.
	async fn sign_message(&self, message: &[u8]) -> Result<Signature, AccountError>;

	/// Returns the private key for wiring into the delivery layer's wallet.
	fn private_key(&self) -> SecretString;
}

/// Service that manages the deploying account.
pub struct AccountService {
	/// The underlying account implementation.
	implementation: Box<dyn AccountInterface>,
}

impl AccountService {
	/// Creates a new AccountService with the specified implementation.
	pub fn new(implementation: Box<dyn AccountInterface>) -> Self {
		Self { implementation }
	}

	/// Retrieves the account's address.
	pub async fn address(&self) -> Result<Address, AccountError> {
		self.implementation.address().await
	}

	/// Signs a transaction.
	pub async fn sign_transaction(&self, tx: &Transaction) -> Result<Signature, AccountError> {
		self.implementation.sign_transaction(tx).await
	}

	/// Signs a message.
	pub async fn sign_message(&self, message: &[u8]) -> Result<Signature, AccountError> {
		self.implementation.sign_message(message).await
	}

	/// Returns the private key for wiring into the delivery layer's wallet.
	pub fn private_key(&self) -> SecretString {
		self.implementation.private_key()
	}
}
