//! Event types for orchestration progress reporting.
//!
//! Deployment progress flows through a broadcast event bus so the calling
//! layer (typically a UI) can render state transitions as they happen
//! without polling.

use crate::{
	DeploymentRecord, DeploymentState, ManualDeployment, TransactionHash,
};
use serde::{Deserialize, Serialize};

/// Main event type encompassing all deployer events.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum DeployerEvent {
	/// Events from the deployment orchestrator.
	Deployment(DeploymentEvent),
	/// Events from the auxiliary-contract binder.
	Auxiliary(AuxiliaryEvent),
}

/// Classification of a failure, used to gate the manual-deployment fallback.
///
/// Only deployment- and verification-related failures offer a fallback;
/// validation failures never reach the network and template failures
/// indicate an environment bug that manual deployment would share.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FailureKind {
	/// Bad user input, caught before any network call.
	Validation,
	/// Wallet-level failure: rejection, insufficient funds, provider down.
	Wallet,
	/// RPC-level failure.
	Network,
	/// Bundled template missing or malformed.
	Template,
	/// Internal storage failure.
	Storage,
	/// The caller cancelled before submission.
	Cancelled,
}

impl FailureKind {
	/// Whether this failure should offer manual-deployment instructions.
	pub fn offers_fallback(&self) -> bool {
		matches!(self, FailureKind::Wallet | FailureKind::Network)
	}
}

/// Events related to a deployment run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum DeploymentEvent {
	/// The state machine advanced.
	StateChanged {
		session_id: String,
		state: DeploymentState,
	},
	/// The deployment transaction was submitted and is pending.
	TransactionPending {
		session_id: String,
		tx_hash: TransactionHash,
		chain_id: u64,
	},
	/// Source verification did not succeed; the deployment itself is fine.
	VerificationSkipped { session_id: String, reason: String },
	/// The run finished and the record was persisted.
	Completed {
		session_id: String,
		record: DeploymentRecord,
	},
	/// The run failed.
	Failed {
		session_id: String,
		kind: FailureKind,
		reason: String,
	},
	/// Manual-deployment instructions are available after a failure.
	FallbackOffered {
		session_id: String,
		instructions: ManualDeployment,
	},
}

/// Events related to auxiliary-contract binding.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum AuxiliaryEvent {
	/// A vesting schedule was registered on-chain.
	VestingRegistered {
		session_id: String,
		beneficiary: String,
		category: String,
	},
	/// A vesting schedule was skipped (e.g. beneficiary already registered).
	VestingSkipped {
		session_id: String,
		beneficiary: String,
		reason: String,
	},
	/// The presale contract was deployed.
	PresaleDeployed {
		session_id: String,
		address: String,
	},
	/// Auxiliary binding failed after the token was already deployed.
	/// The token deployment stands; this is a partial success.
	AttachFailed {
		session_id: String,
		reason: String,
	},
}
