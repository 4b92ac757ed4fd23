//! Deployment session state machine.
//!
//! Drives a session through its lifecycle:
//! Idle -> Compiling -> Deploying -> AwaitingConfirmation -> Verifying ->
//! AttachingAuxiliary -> Complete, with Failed reachable from the active
//! states and FallbackOffered reachable only from Failed. Every transition
//! is validated against a static table and persisted before the new state
//! is announced on the event bus.

use crate::engine::event_bus::EventBus;
use deployer_storage::DeploymentStore;
use deployer_types::{
	truncate_id, DeployerEvent, DeploymentEvent, DeploymentSession, DeploymentState,
};
use once_cell::sync::Lazy;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;

/// Errors that can occur during session state management.
#[derive(Debug, Error)]
pub enum SessionStateError {
	#[error("Storage error: {0}")]
	Storage(String),
	#[error("Invalid state transition from {from} to {to}")]
	InvalidTransition {
		from: DeploymentState,
		to: DeploymentState,
	},
	#[error("Session not found: {0}")]
	SessionNotFound(String),
}

/// Manages deployment session state transitions and persistence.
pub struct SessionStateMachine {
	store: Arc<DeploymentStore>,
	event_bus: EventBus,
}

impl SessionStateMachine {
	pub fn new(store: Arc<DeploymentStore>, event_bus: EventBus) -> Self {
		Self { store, event_bus }
	}

	/// Creates and persists a fresh session in the `Idle` state.
	pub async fn create_session(&self, chain_id: u64) -> Result<DeploymentSession, SessionStateError> {
		let session = DeploymentSession::new(uuid::Uuid::new_v4().to_string(), chain_id);
		self.store
			.save_session(&session)
			.await
			.map_err(|e| SessionStateError::Storage(e.to_string()))?;
		Ok(session)
	}

	/// Loads a session by id.
	pub async fn get_session(&self, session_id: &str) -> Result<DeploymentSession, SessionStateError> {
		self.store.get_session(session_id).await.map_err(|e| match e {
			deployer_storage::StorageError::NotFound(_) => {
				SessionStateError::SessionNotFound(session_id.to_string())
			},
			other => SessionStateError::Storage(other.to_string()),
		})
	}

	/// Updates a session with a closure and persists it.
	pub async fn update_session_with<F>(
		&self,
		session_id: &str,
		updater: F,
	) -> Result<DeploymentSession, SessionStateError>
	where
		F: FnOnce(&mut DeploymentSession),
	{
		let mut session = self.get_session(session_id).await?;
		updater(&mut session);
		session.updated_at = deployer_types::current_timestamp();
		self.store
			.save_session(&session)
			.await
			.map_err(|e| SessionStateError::Storage(e.to_string()))?;
		Ok(session)
	}

	/// Transitions a session to a new state with validation.
	///
	/// The new state is persisted before the `StateChanged` event goes out,
	/// so a subscriber reading session storage always observes a state at
	/// least as new as the one announced.
	pub async fn transition(
		&self,
		session_id: &str,
		new_state: DeploymentState,
	) -> Result<DeploymentSession, SessionStateError> {
		let session = self.get_session(session_id).await?;

		if !Self::is_valid_transition(&session.state, &new_state) {
			return Err(SessionStateError::InvalidTransition {
				from: session.state,
				to: new_state,
			});
		}

		let announced = new_state.clone();
		let session = self
			.update_session_with(session_id, |s| s.set_state(new_state))
			.await?;
		debug!(
			session = %truncate_id(session_id),
			state = %announced,
			"Session state changed"
		);

		// No subscriber is fine; progress events are advisory.
		let _ = self
			.event_bus
			.publish(DeployerEvent::Deployment(DeploymentEvent::StateChanged {
				session_id: session_id.to_string(),
				state: announced,
			}));

		Ok(session)
	}

	/// Whether a cancel request can still take effect in this state.
	///
	/// Once the transaction is submitted the deployment cannot be recalled,
	/// so everything from confirmation onward runs to completion.
	pub fn is_cancellable(state: &DeploymentState) -> bool {
		matches!(
			state,
			DeploymentState::Idle | DeploymentState::Compiling | DeploymentState::Deploying
		)
	}

	/// Checks if a state transition is valid.
	pub fn is_valid_transition(from: &DeploymentState, to: &DeploymentState) -> bool {
		#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
		enum StateKind {
			Idle,
			Compiling,
			Deploying,
			AwaitingConfirmation,
			Verifying,
			AttachingAuxiliary,
			Complete,
			Failed,
			FallbackOffered,
		}

		fn kind(state: &DeploymentState) -> StateKind {
			match state {
				DeploymentState::Idle => StateKind::Idle,
				DeploymentState::Compiling => StateKind::Compiling,
				DeploymentState::Deploying => StateKind::Deploying,
				DeploymentState::AwaitingConfirmation => StateKind::AwaitingConfirmation,
				DeploymentState::Verifying => StateKind::Verifying,
				DeploymentState::AttachingAuxiliary => StateKind::AttachingAuxiliary,
				DeploymentState::Complete => StateKind::Complete,
				DeploymentState::Failed { .. } => StateKind::Failed,
				DeploymentState::FallbackOffered => StateKind::FallbackOffered,
			}
		}

		// Static transition table - each state maps to allowed next states.
		static TRANSITIONS: Lazy<HashMap<StateKind, HashSet<StateKind>>> = Lazy::new(|| {
			let mut m = HashMap::new();
			m.insert(
				StateKind::Idle,
				HashSet::from([StateKind::Compiling, StateKind::Failed]),
			);
			m.insert(
				StateKind::Compiling,
				HashSet::from([StateKind::Deploying, StateKind::Failed]),
			);
			m.insert(
				StateKind::Deploying,
				HashSet::from([StateKind::AwaitingConfirmation, StateKind::Failed]),
			);
			m.insert(
				StateKind::AwaitingConfirmation,
				HashSet::from([
					StateKind::Verifying,
					StateKind::AttachingAuxiliary,
					StateKind::Complete,
					StateKind::Failed,
				]),
			);
			m.insert(
				StateKind::Verifying,
				HashSet::from([
					StateKind::AttachingAuxiliary,
					StateKind::Complete,
					StateKind::Failed,
				]),
			);
			m.insert(
				StateKind::AttachingAuxiliary,
				HashSet::from([StateKind::Complete, StateKind::Failed]),
			);
			// Terminal states
			m.insert(StateKind::Complete, HashSet::new());
			m.insert(StateKind::Failed, HashSet::from([StateKind::FallbackOffered]));
			m.insert(StateKind::FallbackOffered, HashSet::new());
			m
		});

		TRANSITIONS
			.get(&kind(from))
			.map(|allowed| allowed.contains(&kind(to)))
			.unwrap_or(false)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use deployer_storage::implementations::memory::MemoryStorage;
	use deployer_storage::StorageService;

	fn machine() -> SessionStateMachine {
		let storage = Arc::new(StorageService::new(Box::new(MemoryStorage::new())));
		SessionStateMachine::new(Arc::new(DeploymentStore::new(storage)), EventBus::new(16))
	}

	fn failed() -> DeploymentState {
		DeploymentState::Failed {
			reason: "boom".to_string(),
		}
	}

	#[test]
	fn test_happy_path_transitions() {
		let path = [
			DeploymentState::Idle,
			DeploymentState::Compiling,
			DeploymentState::Deploying,
			DeploymentState::AwaitingConfirmation,
			DeploymentState::Verifying,
			DeploymentState::AttachingAuxiliary,
			DeploymentState::Complete,
		];
		for pair in path.windows(2) {
			assert!(
				SessionStateMachine::is_valid_transition(&pair[0], &pair[1]),
				"{} -> {} should be valid",
				pair[0],
				pair[1]
			);
		}
	}

	#[test]
	fn test_skipping_optional_stages() {
		// Verification disabled: straight to auxiliary or completion.
		assert!(SessionStateMachine::is_valid_transition(
			&DeploymentState::AwaitingConfirmation,
			&DeploymentState::AttachingAuxiliary
		));
		assert!(SessionStateMachine::is_valid_transition(
			&DeploymentState::AwaitingConfirmation,
			&DeploymentState::Complete
		));
		// No auxiliary contracts requested.
		assert!(SessionStateMachine::is_valid_transition(
			&DeploymentState::Verifying,
			&DeploymentState::Complete
		));
	}

	#[test]
	fn test_no_backward_or_skip_ahead_transitions() {
		assert!(!SessionStateMachine::is_valid_transition(
			&DeploymentState::Deploying,
			&DeploymentState::Compiling
		));
		assert!(!SessionStateMachine::is_valid_transition(
			&DeploymentState::Idle,
			&DeploymentState::Deploying
		));
		assert!(!SessionStateMachine::is_valid_transition(
			&DeploymentState::Complete,
			&DeploymentState::Idle
		));
	}

	#[test]
	fn test_failed_reachable_from_every_active_state() {
		let active = [
			DeploymentState::Idle,
			DeploymentState::Compiling,
			DeploymentState::Deploying,
			DeploymentState::AwaitingConfirmation,
			DeploymentState::Verifying,
			DeploymentState::AttachingAuxiliary,
		];
		for state in &active {
			assert!(
				SessionStateMachine::is_valid_transition(state, &failed()),
				"{state} -> Failed should be valid"
			);
		}
		assert!(!SessionStateMachine::is_valid_transition(
			&DeploymentState::Complete,
			&failed()
		));
	}

	#[test]
	fn test_fallback_only_reachable_from_failed() {
		assert!(SessionStateMachine::is_valid_transition(
			&failed(),
			&DeploymentState::FallbackOffered
		));
		assert!(!SessionStateMachine::is_valid_transition(
			&DeploymentState::Deploying,
			&DeploymentState::FallbackOffered
		));
		assert!(!SessionStateMachine::is_valid_transition(
			&DeploymentState::FallbackOffered,
			&DeploymentState::Idle
		));
	}

	#[test]
	fn test_cancellable_only_before_submission() {
		assert!(SessionStateMachine::is_cancellable(&DeploymentState::Idle));
		assert!(SessionStateMachine::is_cancellable(&DeploymentState::Compiling));
		assert!(SessionStateMachine::is_cancellable(&DeploymentState::Deploying));
		assert!(!SessionStateMachine::is_cancellable(
			&DeploymentState::AwaitingConfirmation
		));
		assert!(!SessionStateMachine::is_cancellable(&DeploymentState::Verifying));
		assert!(!SessionStateMachine::is_cancellable(&DeploymentState::Complete));
	}

	#[tokio::test]
	async fn test_transition_persists_and_publishes() {
		let machine = machine();
		let mut receiver = {
			// Subscribe through the same bus the machine publishes to.
			let session = machine.create_session(31337).await.unwrap();
			let receiver = machine.event_bus.subscribe();
			machine
				.transition(&session.id, DeploymentState::Compiling)
				.await
				.unwrap();

			let stored = machine.get_session(&session.id).await.unwrap();
			assert_eq!(stored.state, DeploymentState::Compiling);
			receiver
		};

		match receiver.recv().await.unwrap() {
			DeployerEvent::Deployment(DeploymentEvent::StateChanged { state, .. }) => {
				assert_eq!(state, DeploymentState::Compiling);
			},
			other => panic!("unexpected event: {:?}", other),
		}
	}

	#[tokio::test]
	async fn test_invalid_transition_rejected_and_not_persisted() {
		let machine = machine();
		let session = machine.create_session(1).await.unwrap();

		let result = machine
			.transition(&session.id, DeploymentState::Deploying)
			.await;
		assert!(matches!(
			result,
			Err(SessionStateError::InvalidTransition { .. })
		));

		let stored = machine.get_session(&session.id).await.unwrap();
		assert_eq!(stored.state, DeploymentState::Idle);
	}

	#[tokio::test]
	async fn test_unknown_session() {
		let machine = machine();
		let result = machine.get_session("missing").await;
		assert!(matches!(result, Err(SessionStateError::SessionNotFound(_))));
	}
}
