//! Deployment record and session types.
//!
//! A [`DeploymentRecord`] is the append-only result of a successful
//! deployment, keyed by contract address. A [`DeploymentSession`] tracks a
//! single orchestration run through its state machine and is updated as the
//! run progresses.

use crate::{Address, ContractVariant, FeatureSet, TransactionHash};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Kind of auxiliary contract deployed alongside a token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AuxiliaryKind {
	/// Linear-release vesting contract.
	Vesting,
	/// Presale allocation contract.
	Presale,
}

impl AuxiliaryKind {
	/// Stable template identifier used by the template store.
	pub fn template_name(&self) -> &'static str {
		match self {
			AuxiliaryKind::Vesting => "vesting_linear",
			AuxiliaryKind::Presale => "presale",
		}
	}
}

/// Reference to an auxiliary contract attached to a deployment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuxiliaryContract {
	pub kind: AuxiliaryKind,
	pub address: Address,
}

/// Result of a successful on-chain deployment.
///
/// Records are append-only: created once after confirmation, never mutated,
/// keyed by the deployed contract address.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeploymentRecord {
	/// Address of the deployed token contract.
	pub contract_address: Address,
	/// Hash of the deployment transaction.
	pub transaction_hash: TransactionHash,
	/// Template variant that was deployed.
	pub variant: ContractVariant,
	/// Declared feature set, persisted as the authoritative capability
	/// metadata for this contract.
	pub features: FeatureSet,
	/// Chain ID the contract was deployed to.
	pub chain_id: u64,
	/// Gas consumed by the deployment transaction.
	pub gas_used: u64,
	/// Total deployment cost in wei, as a decimal string.
	pub deployment_cost: String,
	/// Whether explorer source verification succeeded. Verification failure
	/// never fails a deployment; it is recorded here as a warning.
	pub verified: bool,
	/// Auxiliary contracts attached to this deployment.
	pub auxiliary_contracts: Vec<AuxiliaryContract>,
	/// Unix timestamp of record creation.
	pub deployed_at: u64,
}

/// States of the deployment orchestration state machine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum DeploymentState {
	/// No work started yet.
	Idle,
	/// Resolving the variant's bundled template artifact.
	Compiling,
	/// Submitting the deployment transaction through the signer.
	Deploying,
	/// Waiting for the transaction receipt. Non-cancellable: an in-flight
	/// on-chain transaction cannot be recalled.
	AwaitingConfirmation,
	/// Best-effort explorer source verification.
	Verifying,
	/// Deploying and wiring vesting/presale contracts.
	AttachingAuxiliary,
	/// Deployment finished and the record was persisted.
	Complete,
	/// Terminal failure.
	Failed { reason: String },
	/// Manual-deployment instructions were offered after a failure.
	FallbackOffered,
}

impl fmt::Display for DeploymentState {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			DeploymentState::Idle => write!(f, "idle"),
			DeploymentState::Compiling => write!(f, "compiling"),
			DeploymentState::Deploying => write!(f, "deploying"),
			DeploymentState::AwaitingConfirmation => write!(f, "awaiting_confirmation"),
			DeploymentState::Verifying => write!(f, "verifying"),
			DeploymentState::AttachingAuxiliary => write!(f, "attaching_auxiliary"),
			DeploymentState::Complete => write!(f, "complete"),
			DeploymentState::Failed { .. } => write!(f, "failed"),
			DeploymentState::FallbackOffered => write!(f, "fallback_offered"),
		}
	}
}

/// A single orchestration run, persisted across state transitions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeploymentSession {
	/// Unique session identifier.
	pub id: String,
	/// Current state machine position.
	pub state: DeploymentState,
	/// Template variant being deployed.
	pub variant: ContractVariant,
	/// Target chain.
	pub chain_id: u64,
	/// Deployment transaction hash, once submitted.
	pub tx_hash: Option<TransactionHash>,
	/// Unix timestamp of session creation.
	pub created_at: u64,
	/// Unix timestamp of the last state change.
	pub updated_at: u64,
}

impl DeploymentSession {
	/// Creates a fresh session in the `Idle` state.
	pub fn new(id: String, chain_id: u64) -> Self {
		let now = crate::current_timestamp();
		Self {
			id,
			state: DeploymentState::Idle,
			variant: ContractVariant::Basic,
			chain_id,
			tx_hash: None,
			created_at: now,
			updated_at: now,
		}
	}

	/// Moves the session to a new state, refreshing `updated_at`.
	pub fn set_state(&mut self, state: DeploymentState) {
		self.state = state;
		self.updated_at = crate::current_timestamp();
	}
}

/// Payload for manual-deployment fallback instructions.
///
/// Offered when an automated deployment fails for deployment- or
/// verification-related reasons; the caller can surface these artifacts so
/// the user can deploy by hand.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManualDeployment {
	/// Template identifier of the variant.
	pub template_name: String,
	/// Creation bytecode as a 0x-prefixed hex string.
	pub bytecode: String,
	/// ABI-encoded constructor arguments as a 0x-prefixed hex string.
	pub encoded_args: String,
}
