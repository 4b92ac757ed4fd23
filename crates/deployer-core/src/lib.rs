//! Core orchestration logic for the token deployer system.
//!
//! This crate ties the other deployer crates together: it selects a
//! contract variant for a feature set, builds and ABI-encodes constructor
//! arguments, drives the deployment state machine end to end, verifies
//! sources against the chain explorer, and attaches auxiliary vesting and
//! presale contracts to deployed tokens.

use deployer_delivery::DeliveryError;
use deployer_storage::StorageError;
use deployer_templates::TemplateError;
use deployer_types::FailureKind;
use thiserror::Error;

pub mod args;
pub mod auxiliary;
pub mod engine;
pub mod probe;
pub mod state;
pub mod verify;

pub use args::{ConstructorArgBuilder, ConstructorArgs};
pub use auxiliary::AuxiliaryContractBinder;
pub use engine::{event_bus::EventBus, CancelHandle, DeployerEngine, DeploymentRequest};
pub use probe::FeatureProbe;
pub use state::SessionStateMachine;
pub use verify::{EtherscanVerifier, VerifierInterface};

// Variant selection lives in deployer-types next to the FeatureSet it
// consumes; re-exported here as the caller-facing entry point.
pub use deployer_types::{select_variant, ContractVariant, FeatureSet};

/// Errors that can terminate a deployment attempt.
///
/// Each variant corresponds to one failure kind of the taxonomy; the kind
/// decides whether a manual-deployment fallback is offered after failure.
#[derive(Debug, Error)]
pub enum DeployError {
	/// Bad user input, caught before any network call.
	#[error("Validation error: {0}")]
	Validation(#[from] args::BuildError),
	/// Wallet-side failure: rejection, insufficient funds, provider down.
	#[error("Wallet error: {0}")]
	Wallet(String),
	/// RPC-level failure: timeouts, dropped connections, failed submissions.
	#[error("Network error: {0}")]
	Network(String),
	/// Template lookup or decode failure. Indicates a packaging bug, so it
	/// is fatal with no fallback.
	#[error("Template error: {0}")]
	Template(#[from] TemplateError),
	/// Persistence failure while recording deployment state.
	#[error("Storage error: {0}")]
	Storage(#[from] StorageError),
	/// Session state machine failure: a lost session or a transition the
	/// table forbids.
	#[error("Session state error: {0}")]
	State(String),
	/// The deployment was cancelled before transaction submission.
	#[error("Deployment cancelled")]
	Cancelled,
	/// Another deployment is already in flight on this engine.
	#[error("A deployment is already in progress")]
	Busy,
}

impl DeployError {
	/// The failure kind used to gate the manual-deployment fallback.
	pub fn failure_kind(&self) -> FailureKind {
		match self {
			DeployError::Validation(_) => FailureKind::Validation,
			DeployError::Wallet(_) => FailureKind::Wallet,
			DeployError::Network(_) => FailureKind::Network,
			DeployError::Template(_) => FailureKind::Template,
			DeployError::Storage(_) | DeployError::State(_) => FailureKind::Storage,
			DeployError::Cancelled | DeployError::Busy => FailureKind::Cancelled,
		}
	}
}

impl From<state::SessionStateError> for DeployError {
	fn from(err: state::SessionStateError) -> Self {
		DeployError::State(err.to_string())
	}
}

impl From<DeliveryError> for DeployError {
	fn from(err: DeliveryError) -> Self {
		match err {
			DeliveryError::InsufficientFunds { .. } => DeployError::Wallet(err.to_string()),
			DeliveryError::TransactionFailed(_)
			| DeliveryError::Network(_)
			| DeliveryError::NoImplementationAvailable(_) => DeployError::Network(err.to_string()),
		}
	}
}
