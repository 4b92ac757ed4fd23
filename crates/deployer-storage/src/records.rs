//! Append-only deployment history.
//!
//! Deployment records are keyed by the deployed contract address and can
//! never be overwritten: a contract is deployed exactly once, so a second
//! append for the same address is always a caller bug and surfaces as
//! [`StorageError::AlreadyExists`].

use crate::{StorageError, StorageService};
use deployer_types::{Address, DeploymentRecord, DeploymentSession};
use std::sync::Arc;
use tracing::debug;

const RECORDS_NAMESPACE: &str = "deployments";
const SESSIONS_NAMESPACE: &str = "sessions";

/// Typed view over deployment history and session state.
pub struct DeploymentStore {
	storage: Arc<StorageService>,
}

impl DeploymentStore {
	pub fn new(storage: Arc<StorageService>) -> Self {
		Self { storage }
	}

	fn record_id(address: &Address) -> String {
		format!("{}", address).to_lowercase()
	}

	/// Appends a completed deployment record.
	///
	/// Returns `AlreadyExists` if a record for the contract address is
	/// already present.
	pub async fn append(&self, record: &DeploymentRecord) -> Result<(), StorageError> {
		let id = Self::record_id(&record.contract_address);
		self.storage.store_new(RECORDS_NAMESPACE, &id, record).await?;
		debug!(contract = %id, variant = %record.variant, "Recorded deployment");
		Ok(())
	}

	/// Retrieves the deployment record for a contract address.
	pub async fn get(&self, address: &Address) -> Result<DeploymentRecord, StorageError> {
		self.storage
			.retrieve(RECORDS_NAMESPACE, &Self::record_id(address))
			.await
	}

	/// Returns all recorded deployments.
	pub async fn all(&self) -> Result<Vec<DeploymentRecord>, StorageError> {
		let items = self
			.storage
			.retrieve_all::<DeploymentRecord>(RECORDS_NAMESPACE)
			.await?;
		Ok(items.into_iter().map(|(_, record)| record).collect())
	}

	/// Returns all recorded deployments on the given chain.
	pub async fn by_chain(&self, chain_id: u64) -> Result<Vec<DeploymentRecord>, StorageError> {
		let mut records = self.all().await?;
		records.retain(|r| r.chain_id == chain_id);
		Ok(records)
	}

	/// Persists the current state of an in-flight deployment session.
	///
	/// Sessions are mutable, unlike records: the same session is written
	/// repeatedly as the deployment advances through its states.
	pub async fn save_session(&self, session: &DeploymentSession) -> Result<(), StorageError> {
		self.storage
			.store(SESSIONS_NAMESPACE, &session.id, session)
			.await
	}

	/// Retrieves a deployment session by id.
	pub async fn get_session(&self, id: &str) -> Result<DeploymentSession, StorageError> {
		self.storage.retrieve(SESSIONS_NAMESPACE, id).await
	}
}
