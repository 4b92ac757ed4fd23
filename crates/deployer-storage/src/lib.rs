//! Storage module for the token deployer system.
//!
//! This module provides abstractions for persistent storage of deployer
//! data, supporting different backend implementations such as in-memory or
//! file-based storage.
//!
//! # Deployment history
//!
//! The [`records`] module layers append-only deployment history on top of
//! the generic key-value interface: records are keyed by contract address
//! and can be appended and queried but never overwritten.

use async_trait::async_trait;
use serde::{de::DeserializeOwned, Serialize};
use thiserror::Error;

pub mod records;

pub use records::DeploymentStore;

/// Re-export implementations
pub mod implementations {
	pub mod file;
	pub mod memory;
}

/// Errors that can occur during storage operations.
#[derive(Debug, Error)]
pub enum StorageError {
	/// Error that occurs when a requested item is not found.
	#[error("Not found: {0}")]
	NotFound(String),
	/// Error that occurs when appending over an existing key.
	#[error("Already exists: {0}")]
	AlreadyExists(String),
	/// Error that occurs during serialization/deserialization.
	#[error("Serialization error: {0}")]
	Serialization(String),
	/// Error that occurs in the storage backend.
	#[error("Backend error: {0}")]
	Backend(String),
}

/// Trait defining the low-level interface for storage backends.
///
/// Backends provide byte-level key-value operations; typed access and
/// append-only semantics are layered on top by [`StorageService`] and
/// [`DeploymentStore`].
#[cfg_attr(feature = "testing", mockall::automock)]
#[async_trait]
pub trait StorageInterface: Send + Sync {
	/// Retrieves raw bytes for the given key.
	async fn get_bytes(&self, key: &str) -> Result<Vec<u8>, StorageError>;

	/// Stores raw bytes, overwriting any existing value.
	async fn set_bytes(&self, key: &str, value: Vec<u8>) -> Result<(), StorageError>;

	/// Stores raw bytes only if the key does not exist.
	///
	/// Returns `Ok(true)` if set, `Ok(false)` if the key already existed.
	async fn set_nx(&self, key: &str, value: Vec<u8>) -> Result<bool, StorageError>;

	/// Deletes the value associated with the given key.
	async fn delete(&self, key: &str) -> Result<(), StorageError>;

	/// Checks if a key exists in storage.
	async fn exists(&self, key: &str) -> Result<bool, StorageError>;

	/// Lists all keys beginning with the given prefix.
	async fn keys_with_prefix(&self, prefix: &str) -> Result<Vec<String>, StorageError>;
}

/// High-level storage service that provides typed operations.
///
/// Wraps a low-level backend with JSON serialization. Namespace and id are
/// combined into a `namespace:id` key.
pub struct StorageService {
	/// The underlying storage backend implementation.
	backend: Box<dyn StorageInterface>,
}

impl StorageService {
	/// Creates a new StorageService with the specified backend.
	pub fn new(backend: Box<dyn StorageInterface>) -> Self {
		Self { backend }
	}

	fn key(namespace: &str, id: &str) -> String {
		format!("{}:{}", namespace, id)
	}

	/// Stores a serializable value, overwriting any existing entry.
	pub async fn store<T: Serialize>(
		&self,
		namespace: &str,
		id: &str,
		data: &T,
	) -> Result<(), StorageError> {
		let bytes =
			serde_json::to_vec(data).map_err(|e| StorageError::Serialization(e.to_string()))?;
		self.backend.set_bytes(&Self::key(namespace, id), bytes).await
	}

	/// Stores a serializable value only if no entry exists for the key.
	///
	/// Returns `AlreadyExists` when the key is taken.
	pub async fn store_new<T: Serialize>(
		&self,
		namespace: &str,
		id: &str,
		data: &T,
	) -> Result<(), StorageError> {
		let key = Self::key(namespace, id);
		let bytes =
			serde_json::to_vec(data).map_err(|e| StorageError::Serialization(e.to_string()))?;
		if self.backend.set_nx(&key, bytes).await? {
			Ok(())
		} else {
			Err(StorageError::AlreadyExists(key))
		}
	}

	/// Retrieves and deserializes a value from storage.
	pub async fn retrieve<T: DeserializeOwned>(
		&self,
		namespace: &str,
		id: &str,
	) -> Result<T, StorageError> {
		let bytes = self.backend.get_bytes(&Self::key(namespace, id)).await?;
		serde_json::from_slice(&bytes).map_err(|e| StorageError::Serialization(e.to_string()))
	}

	/// Updates an existing value in storage.
	///
	/// Returns `NotFound` if the key doesn't exist, making it semantically
	/// different from `store` which creates or overwrites.
	pub async fn update<T: Serialize>(
		&self,
		namespace: &str,
		id: &str,
		data: &T,
	) -> Result<(), StorageError> {
		let key = Self::key(namespace, id);
		if !self.backend.exists(&key).await? {
			return Err(StorageError::NotFound(key));
		}
		let bytes =
			serde_json::to_vec(data).map_err(|e| StorageError::Serialization(e.to_string()))?;
		self.backend.set_bytes(&key, bytes).await
	}

	/// Removes a value from storage.
	pub async fn remove(&self, namespace: &str, id: &str) -> Result<(), StorageError> {
		self.backend.delete(&Self::key(namespace, id)).await
	}

	/// Checks if a value exists in storage.
	pub async fn exists(&self, namespace: &str, id: &str) -> Result<bool, StorageError> {
		self.backend.exists(&Self::key(namespace, id)).await
	}

	/// Retrieve all items in a namespace.
	///
	/// Items that fail to deserialize are skipped with a warning rather than
	/// failing the whole query.
	pub async fn retrieve_all<T: DeserializeOwned>(
		&self,
		namespace: &str,
	) -> Result<Vec<(String, T)>, StorageError> {
		let prefix = format!("{}:", namespace);
		let keys = self.backend.keys_with_prefix(&prefix).await?;

		let mut items = Vec::new();
		for key in keys {
			let bytes = match self.backend.get_bytes(&key).await {
				Ok(bytes) => bytes,
				Err(StorageError::NotFound(_)) => continue,
				Err(e) => return Err(e),
			};
			let id = key[prefix.len()..].to_string();
			match serde_json::from_slice::<T>(&bytes) {
				Ok(item) => items.push((id, item)),
				Err(e) => {
					tracing::warn!(key = %key, error = %e, "Failed to deserialize stored item");
				},
			}
		}

		Ok(items)
	}
}

#[cfg(test)]
mod tests {
	use super::implementations::memory::MemoryStorage;
	use super::*;
	use serde::Deserialize;

	#[derive(Debug, PartialEq, Serialize, Deserialize)]
	struct Item {
		value: u32,
	}

	fn service() -> StorageService {
		StorageService::new(Box::new(MemoryStorage::new()))
	}

	#[tokio::test]
	async fn test_store_and_retrieve() {
		let storage = service();
		storage
			.store("items", "a", &Item { value: 1 })
			.await
			.unwrap();
		let item: Item = storage.retrieve("items", "a").await.unwrap();
		assert_eq!(item, Item { value: 1 });
	}

	#[tokio::test]
	async fn test_store_new_rejects_duplicates() {
		let storage = service();
		storage
			.store_new("items", "a", &Item { value: 1 })
			.await
			.unwrap();
		let err = storage
			.store_new("items", "a", &Item { value: 2 })
			.await
			.unwrap_err();
		assert!(matches!(err, StorageError::AlreadyExists(_)));

		// First value untouched
		let item: Item = storage.retrieve("items", "a").await.unwrap();
		assert_eq!(item.value, 1);
	}

	#[tokio::test]
	async fn test_update_requires_existing() {
		let storage = service();
		let err = storage
			.update("items", "missing", &Item { value: 1 })
			.await
			.unwrap_err();
		assert!(matches!(err, StorageError::NotFound(_)));
	}

	#[tokio::test]
	async fn test_retrieve_all_scoped_to_namespace() {
		let storage = service();
		storage
			.store("items", "a", &Item { value: 1 })
			.await
			.unwrap();
		storage
			.store("items", "b", &Item { value: 2 })
			.await
			.unwrap();
		storage
			.store("other", "c", &Item { value: 3 })
			.await
			.unwrap();

		let mut all: Vec<(String, Item)> = storage.retrieve_all("items").await.unwrap();
		all.sort_by(|a, b| a.0.cmp(&b.0));
		assert_eq!(all.len(), 2);
		assert_eq!(all[0].0, "a");
		assert_eq!(all[1].1.value, 2);
	}
}
