//! In-memory storage backend implementation.
//!
//! Stores data in a HashMap behind an async RwLock. Atomicity holds within
//! a single process only and data is lost on restart; intended for tests
//! and development.

use crate::{StorageError, StorageInterface};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// In-memory storage implementation.
pub struct MemoryStorage {
	/// The in-memory store protected by a read-write lock.
	store: Arc<RwLock<HashMap<String, Vec<u8>>>>,
}

impl MemoryStorage {
	/// Creates a new MemoryStorage instance.
	pub fn new() -> Self {
		Self {
			store: Arc::new(RwLock::new(HashMap::new())),
		}
	}
}

impl Default for MemoryStorage {
	fn default() -> Self {
		Self::new()
	}
}

#[async_trait]
impl StorageInterface for MemoryStorage {
	async fn get_bytes(&self, key: &str) -> Result<Vec<u8>, StorageError> {
		let store = self.store.read().await;
		store
			.get(key)
			.cloned()
			.ok_or_else(|| StorageError::NotFound(key.to_string()))
	}

	async fn set_bytes(&self, key: &str, value: Vec<u8>) -> Result<(), StorageError> {
		let mut store = self.store.write().await;
		store.insert(key.to_string(), value);
		Ok(())
	}

	async fn set_nx(&self, key: &str, value: Vec<u8>) -> Result<bool, StorageError> {
		let mut store = self.store.write().await;
		if store.contains_key(key) {
			return Ok(false);
		}
		store.insert(key.to_string(), value);
		Ok(true)
	}

	async fn delete(&self, key: &str) -> Result<(), StorageError> {
		let mut store = self.store.write().await;
		store.remove(key);
		Ok(())
	}

	async fn exists(&self, key: &str) -> Result<bool, StorageError> {
		let store = self.store.read().await;
		Ok(store.contains_key(key))
	}

	async fn keys_with_prefix(&self, prefix: &str) -> Result<Vec<String>, StorageError> {
		let store = self.store.read().await;
		Ok(store
			.keys()
			.filter(|k| k.starts_with(prefix))
			.cloned()
			.collect())
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[tokio::test]
	async fn test_get_missing_key() {
		let storage = MemoryStorage::new();
		let result = storage.get_bytes("missing").await;
		assert!(matches!(result, Err(StorageError::NotFound(_))));
	}

	#[tokio::test]
	async fn test_set_and_get() {
		let storage = MemoryStorage::new();
		storage.set_bytes("key", vec![1, 2, 3]).await.unwrap();
		assert_eq!(storage.get_bytes("key").await.unwrap(), vec![1, 2, 3]);
		assert!(storage.exists("key").await.unwrap());
	}

	#[tokio::test]
	async fn test_set_nx() {
		let storage = MemoryStorage::new();
		assert!(storage.set_nx("key", vec![1]).await.unwrap());
		assert!(!storage.set_nx("key", vec![2]).await.unwrap());
		assert_eq!(storage.get_bytes("key").await.unwrap(), vec![1]);
	}

	#[tokio::test]
	async fn test_delete_and_prefix_listing() {
		let storage = MemoryStorage::new();
		storage.set_bytes("ns:a", vec![1]).await.unwrap();
		storage.set_bytes("ns:b", vec![2]).await.unwrap();
		storage.set_bytes("other:c", vec![3]).await.unwrap();

		let mut keys = storage.keys_with_prefix("ns:").await.unwrap();
		keys.sort();
		assert_eq!(keys, vec!["ns:a", "ns:b"]);

		storage.delete("ns:a").await.unwrap();
		assert!(!storage.exists("ns:a").await.unwrap());
	}
}
