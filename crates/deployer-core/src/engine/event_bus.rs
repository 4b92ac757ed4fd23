//! Event bus for deployment progress reporting.
//!
//! Deployment and auxiliary-binding progress is broadcast so the calling
//! layer (typically a UI rendering the wizard) can react to state changes
//! without polling session storage.

use deployer_types::DeployerEvent;
use tokio::sync::broadcast;

/// Broadcast-based event bus for deployer events.
///
/// Wraps a tokio broadcast channel; every subscriber receives its own copy
/// of each event published after subscription.
pub struct EventBus {
	sender: broadcast::Sender<DeployerEvent>,
}

impl EventBus {
	/// Creates a new EventBus with the specified channel capacity.
	///
	/// The capacity determines how many events can be buffered before old
	/// events are dropped for lagging subscribers.
	pub fn new(capacity: usize) -> Self {
		let (sender, _) = broadcast::channel(capacity);
		Self { sender }
	}

	/// Creates a new subscriber to receive events from this bus.
	pub fn subscribe(&self) -> broadcast::Receiver<DeployerEvent> {
		self.sender.subscribe()
	}

	/// Publishes an event to all current subscribers.
	///
	/// Returns an error when no subscriber is listening; callers treat this
	/// as non-fatal since progress reporting is advisory.
	pub fn publish(
		&self,
		event: DeployerEvent,
	) -> Result<(), broadcast::error::SendError<DeployerEvent>> {
		self.sender.send(event)?;
		Ok(())
	}
}

/// Cloning creates a new handle to the same underlying channel so multiple
/// components can publish to the same subscribers.
impl Clone for EventBus {
	fn clone(&self) -> Self {
		Self {
			sender: self.sender.clone(),
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use deployer_types::{DeploymentEvent, DeploymentState};

	fn state_changed(session_id: &str) -> DeployerEvent {
		DeployerEvent::Deployment(DeploymentEvent::StateChanged {
			session_id: session_id.to_string(),
			state: DeploymentState::Compiling,
		})
	}

	#[test]
	fn test_publish_with_no_subscribers_errors() {
		let bus = EventBus::new(10);
		assert!(bus.publish(state_changed("s-1")).is_err());
	}

	#[tokio::test]
	async fn test_publish_and_receive() {
		let bus = EventBus::new(10);
		let mut receiver = bus.subscribe();

		bus.publish(state_changed("s-1")).unwrap();

		match receiver.recv().await.unwrap() {
			DeployerEvent::Deployment(DeploymentEvent::StateChanged { session_id, state }) => {
				assert_eq!(session_id, "s-1");
				assert_eq!(state, DeploymentState::Compiling);
			},
			other => panic!("unexpected event: {:?}", other),
		}
	}

	#[tokio::test]
	async fn test_all_subscribers_receive_event() {
		let bus = EventBus::new(10);
		let mut receiver1 = bus.subscribe();
		let mut receiver2 = bus.subscribe();

		bus.publish(state_changed("s-2")).unwrap();

		for receiver in [&mut receiver1, &mut receiver2] {
			match receiver.recv().await.unwrap() {
				DeployerEvent::Deployment(DeploymentEvent::StateChanged { session_id, .. }) => {
					assert_eq!(session_id, "s-2");
				},
				other => panic!("unexpected event: {:?}", other),
			}
		}
	}

	#[tokio::test]
	async fn test_cloned_bus_shares_channel() {
		let bus = EventBus::new(10);
		let clone = bus.clone();
		let mut receiver = bus.subscribe();

		clone.publish(state_changed("s-3")).unwrap();
		assert!(receiver.recv().await.is_ok());
	}
}
