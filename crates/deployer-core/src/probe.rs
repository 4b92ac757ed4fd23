//! Best-effort feature reconstruction for live contracts.
//!
//! Deployment records carry the declared [`FeatureSet`] as the source of
//! truth for a token's capabilities. For contracts that predate declared
//! metadata, this module reconstructs what it can through `eth_call`
//! probing. Every probed field is optional: absence of evidence is
//! reported as `None`, never guessed.

use alloy_sol_types::{sol, SolCall};
use deployer_delivery::{DeliveryError, DeliveryService};
use deployer_types::{Address, Transaction};
use std::sync::Arc;
use tracing::debug;

sol! {
	function transferFeeBps() external view returns (uint16);
	function feeRecipient() external view returns (address);
	function redistributionBps() external view returns (uint16);
	function burn(uint256 amount) external;
	function mint(address to, uint256 amount) external;
}

/// Capabilities reconstructed from a live contract.
///
/// `None` means the probe was inconclusive, not that the capability is
/// absent.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProbedFeatures {
	pub burnable: Option<bool>,
	pub mintable: Option<bool>,
	/// Transfer fee in basis points, if a fee getter exists.
	pub fee_bps: Option<u16>,
	/// Fee recipient, if a fee getter exists.
	pub fee_recipient: Option<Address>,
	/// Redistribution share in basis points, if a getter exists.
	pub redistribution_bps: Option<u16>,
}

/// Probes a deployed token contract for its capabilities.
pub struct FeatureProbe {
	delivery: Arc<DeliveryService>,
}

impl FeatureProbe {
	pub fn new(delivery: Arc<DeliveryService>) -> Self {
		Self { delivery }
	}

	/// Reconstructs what can be observed of a token's feature set.
	///
	/// Missing functions revert under `eth_call` and are reported as the
	/// capability being absent; transport errors leave the field `None`.
	pub async fn probe(&self, chain_id: u64, token: &Address) -> ProbedFeatures {
		let mut features = ProbedFeatures::default();

		if let Some(bps) = self
			.call_u16(chain_id, token, transferFeeBpsCall {}.abi_encode())
			.await
		{
			features.fee_bps = Some(bps);
			features.fee_recipient = self.call_address(chain_id, token).await;
		}

		features.redistribution_bps = self
			.call_u16(chain_id, token, redistributionBpsCall {}.abi_encode())
			.await;

		features.burnable = self.probe_burn(chain_id, token).await;
		features.mintable = self.probe_mint(chain_id, token).await;

		debug!(token = %token, ?features, "Probed contract features");
		features
	}

	async fn call(
		&self,
		chain_id: u64,
		token: &Address,
		data: Vec<u8>,
	) -> Result<Vec<u8>, DeliveryError> {
		let tx = Transaction::call(token.clone(), data, chain_id);
		self.delivery.eth_call(tx).await.map(|bytes| bytes.to_vec())
	}

	async fn call_u16(&self, chain_id: u64, token: &Address, data: Vec<u8>) -> Option<u16> {
		let bytes = self.call(chain_id, token, data).await.ok()?;
		// uint16 comes back as a full 32-byte word.
		if bytes.len() != 32 {
			return None;
		}
		Some(u16::from_be_bytes([bytes[30], bytes[31]]))
	}

	async fn call_address(&self, chain_id: u64, token: &Address) -> Option<Address> {
		let bytes = self
			.call(chain_id, token, feeRecipientCall {}.abi_encode())
			.await
			.ok()?;
		if bytes.len() != 32 {
			return None;
		}
		Some(Address(bytes[12..32].to_vec()))
	}

	/// Burning zero tokens is a no-op on burnable contracts and a revert
	/// (missing selector) everywhere else, which makes it a clean probe.
	async fn probe_burn(&self, chain_id: u64, token: &Address) -> Option<bool> {
		let data = burnCall {
			amount: alloy_primitives::U256::ZERO,
		}
		.abi_encode();
		match self.call(chain_id, token, data).await {
			Ok(_) => Some(true),
			Err(DeliveryError::Network(_)) => None,
			Err(_) => Some(false),
		}
	}

	/// Minting is owner-gated, so the call reverts either way; an
	/// ownership revert still proves the selector exists. Reverts that
	/// carry no ownership complaint are indistinguishable from a missing
	/// function, so those stay inconclusive.
	async fn probe_mint(&self, chain_id: u64, token: &Address) -> Option<bool> {
		let data = mintCall {
			to: alloy_primitives::Address::ZERO,
			amount: alloy_primitives::U256::ZERO,
		}
		.abi_encode();
		match self.call(chain_id, token, data).await {
			Ok(_) => Some(true),
			Err(e) => {
				let message = e.to_string();
				if message.contains("not the owner") || message.contains("OwnableUnauthorized") {
					Some(true)
				} else {
					None
				}
			},
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use alloy_primitives::{Bytes, U256};
	use deployer_delivery::MockDeliveryInterface;
	use deployer_types::parse_address;
	use std::collections::HashMap;

	const TOKEN: &str = "0x5fbdb2315678afecb367f032d93f642f64180aa3";

	fn probe_with(mock: MockDeliveryInterface) -> FeatureProbe {
		let mut implementations: HashMap<u64, Arc<dyn deployer_delivery::DeliveryInterface>> =
			HashMap::new();
		implementations.insert(31337, Arc::new(mock));
		FeatureProbe::new(Arc::new(DeliveryService::new(implementations, 1)))
	}

	#[tokio::test]
	async fn test_burn_success_means_burnable() {
		let mut mock = MockDeliveryInterface::new();
		mock.expect_eth_call().returning(|_| Ok(Bytes::new()));
		let probe = probe_with(mock);

		let burnable = probe.probe_burn(31337, &parse_address(TOKEN).unwrap()).await;
		assert_eq!(burnable, Some(true));
	}

	#[tokio::test]
	async fn test_burn_revert_means_not_burnable() {
		let mut mock = MockDeliveryInterface::new();
		mock.expect_eth_call().returning(|_| {
			Err(DeliveryError::TransactionFailed(
				"execution reverted".to_string(),
			))
		});
		let probe = probe_with(mock);

		let burnable = probe.probe_burn(31337, &parse_address(TOKEN).unwrap()).await;
		assert_eq!(burnable, Some(false));
	}

	#[tokio::test]
	async fn test_burn_transport_error_is_inconclusive() {
		let mut mock = MockDeliveryInterface::new();
		mock.expect_eth_call()
			.returning(|_| Err(DeliveryError::Network("connection refused".to_string())));
		let probe = probe_with(mock);

		let burnable = probe.probe_burn(31337, &parse_address(TOKEN).unwrap()).await;
		assert_eq!(burnable, None);
	}

	#[tokio::test]
	async fn test_mint_ownership_revert_proves_minting() {
		let mut mock = MockDeliveryInterface::new();
		mock.expect_eth_call().returning(|_| {
			Err(DeliveryError::TransactionFailed(
				"execution reverted: OwnableUnauthorizedAccount(0x0000000000000000000000000000000000000000)"
					.to_string(),
			))
		});
		let probe = probe_with(mock);

		let mintable = probe.probe_mint(31337, &parse_address(TOKEN).unwrap()).await;
		assert_eq!(mintable, Some(true));
	}

	#[tokio::test]
	async fn test_mint_plain_revert_is_inconclusive() {
		let mut mock = MockDeliveryInterface::new();
		mock.expect_eth_call().returning(|_| {
			Err(DeliveryError::TransactionFailed(
				"execution reverted".to_string(),
			))
		});
		let probe = probe_with(mock);

		let mintable = probe.probe_mint(31337, &parse_address(TOKEN).unwrap()).await;
		assert_eq!(mintable, None);
	}

	#[test]
	fn test_probe_selectors_are_standard() {
		// Selectors must match the bundled template ABIs.
		assert_eq!(
			hex::encode(&transferFeeBpsCall {}.abi_encode()[..4]),
			"5de78d7a"
		);
		assert_eq!(
			hex::encode(
				&burnCall {
					amount: U256::ZERO
				}
				.abi_encode()[..4]
			),
			"42966c68"
		);
		assert_eq!(
			hex::encode(
				&mintCall {
					to: alloy_primitives::Address::ZERO,
					amount: U256::ZERO,
				}
				.abi_encode()[..4]
			),
			"40c10f19"
		);
	}

	#[test]
	fn test_word_decoding() {
		// 250 bps as a 32-byte big-endian word.
		let mut word = [0u8; 32];
		word[30] = 0;
		word[31] = 250;
		assert_eq!(u16::from_be_bytes([word[30], word[31]]), 250);
	}
}
