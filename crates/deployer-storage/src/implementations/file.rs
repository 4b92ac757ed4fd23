//! File-based storage backend implementation.
//!
//! Persists each entry as a file under a base directory, mapping the
//! `namespace:id` key structure onto `namespace/id` paths. Suitable for
//! single-instance deployments where client-side persistence is enough.

use crate::{StorageError, StorageInterface};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::fs;

/// File-backed storage implementation.
pub struct FileStorage {
	/// Base directory for all stored entries.
	base_path: PathBuf,
}

impl FileStorage {
	/// Creates a new FileStorage rooted at the given directory.
	///
	/// The directory is created lazily on first write.
	pub fn new(base_path: PathBuf) -> Self {
		Self { base_path }
	}

	fn sanitize_component(component: &str) -> Result<(), StorageError> {
		let valid = !component.is_empty()
			&& component
				.chars()
				.all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'));
		if valid {
			Ok(())
		} else {
			Err(StorageError::Backend(format!(
				"Invalid storage key component '{}'",
				component
			)))
		}
	}

	/// Maps a `namespace:id` key to a path under the base directory.
	fn path_for(&self, key: &str) -> Result<PathBuf, StorageError> {
		let mut path = self.base_path.clone();
		for component in key.split(':') {
			Self::sanitize_component(component)?;
			path.push(component);
		}
		Ok(path)
	}

	fn key_for(&self, path: &Path) -> Option<String> {
		let relative = path.strip_prefix(&self.base_path).ok()?;
		let components: Vec<_> = relative
			.components()
			.map(|c| c.as_os_str().to_string_lossy().into_owned())
			.collect();
		Some(components.join(":"))
	}
}

#[async_trait]
impl StorageInterface for FileStorage {
	async fn get_bytes(&self, key: &str) -> Result<Vec<u8>, StorageError> {
		let path = self.path_for(key)?;
		match fs::read(&path).await {
			Ok(bytes) => Ok(bytes),
			Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
				Err(StorageError::NotFound(key.to_string()))
			},
			Err(e) => Err(StorageError::Backend(e.to_string())),
		}
	}

	async fn set_bytes(&self, key: &str, value: Vec<u8>) -> Result<(), StorageError> {
		let path = self.path_for(key)?;
		if let Some(parent) = path.parent() {
			fs::create_dir_all(parent)
				.await
				.map_err(|e| StorageError::Backend(e.to_string()))?;
		}
		fs::write(&path, value)
			.await
			.map_err(|e| StorageError::Backend(e.to_string()))
	}

	async fn set_nx(&self, key: &str, value: Vec<u8>) -> Result<bool, StorageError> {
		if self.exists(key).await? {
			return Ok(false);
		}
		self.set_bytes(key, value).await?;
		Ok(true)
	}

	async fn delete(&self, key: &str) -> Result<(), StorageError> {
		let path = self.path_for(key)?;
		match fs::remove_file(&path).await {
			Ok(()) => Ok(()),
			Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
			Err(e) => Err(StorageError::Backend(e.to_string())),
		}
	}

	async fn exists(&self, key: &str) -> Result<bool, StorageError> {
		let path = self.path_for(key)?;
		Ok(fs::try_exists(&path)
			.await
			.map_err(|e| StorageError::Backend(e.to_string()))?)
	}

	async fn keys_with_prefix(&self, prefix: &str) -> Result<Vec<String>, StorageError> {
		// Prefixes always end at a namespace boundary ("namespace:"), so the
		// scan is rooted at the namespace directory.
		let namespace = prefix.trim_end_matches(':');
		let dir = self.path_for(namespace)?;

		let mut entries = match fs::read_dir(&dir).await {
			Ok(entries) => entries,
			Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
			Err(e) => return Err(StorageError::Backend(e.to_string())),
		};

		let mut keys = Vec::new();
		while let Some(entry) = entries
			.next_entry()
			.await
			.map_err(|e| StorageError::Backend(e.to_string()))?
		{
			if entry
				.file_type()
				.await
				.map_err(|e| StorageError::Backend(e.to_string()))?
				.is_file()
			{
				if let Some(key) = self.key_for(&entry.path()) {
					if key.starts_with(prefix) {
						keys.push(key);
					}
				}
			}
		}

		Ok(keys)
	}
}
