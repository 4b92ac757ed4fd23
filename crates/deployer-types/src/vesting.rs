//! Vesting and presale auxiliary-contract types.

use crate::Address;
use alloy_primitives::U256;
use serde::{Deserialize, Serialize};

/// User-supplied vesting schedule request.
///
/// The percentage is of the vested token's initial supply; absolute amounts
/// are derived with integer arithmetic by the auxiliary binder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VestingInput {
	/// Allocation category label, e.g. "team" or "advisors".
	pub category: String,
	/// Beneficiary address as supplied by the user.
	pub beneficiary: String,
	/// Share of the initial supply, in whole percent (0-100).
	pub percentage: u8,
	/// Unix timestamp at which vesting starts.
	pub start_time: u64,
	/// Vesting duration in seconds.
	pub duration_seconds: u64,
}

/// An on-chain registered vesting schedule.
///
/// `released_amount` only ever increases and `revoked` is a one-way
/// transition; both are owned by the vesting contract after registration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VestingSchedule {
	pub category: String,
	pub beneficiary: Address,
	/// Absolute amount in scaled base units.
	pub total_amount: U256,
	pub start_time: u64,
	pub duration_seconds: u64,
	/// Amount already released, in scaled base units.
	pub released_amount: U256,
	pub revoked: bool,
}

/// Presale configuration.
///
/// All monetary values are in wei of the payment currency; the allocation
/// percentage is of the token's initial supply.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PresaleConfig {
	/// Minimum raise for the sale to settle.
	pub soft_cap: U256,
	/// Maximum raise; the sale closes when reached.
	pub hard_cap: U256,
	/// Minimum purchase per participant.
	pub min_purchase: U256,
	/// Maximum purchase per participant.
	pub max_purchase: U256,
	/// Tokens granted per unit of payment currency, in scaled base units.
	pub rate: U256,
	/// Share of the initial supply allocated to the sale, in whole percent.
	pub allocation_percentage: u8,
	/// Sale start, Unix seconds.
	pub start_time: u64,
	/// Sale end, Unix seconds. Vesting durations are measured from this
	/// point (the token generation event).
	pub end_time: u64,
	/// Wallet receiving raised funds.
	pub fund_wallet: String,
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_vesting_input_serde() {
		let input = VestingInput {
			category: "team".to_string(),
			beneficiary: "0xaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa".to_string(),
			percentage: 10,
			start_time: 1_700_000_000,
			duration_seconds: 86_400 * 365,
		};
		let json = serde_json::to_string(&input).unwrap();
		let back: VestingInput = serde_json::from_str(&json).unwrap();
		assert_eq!(back, input);
	}
}
