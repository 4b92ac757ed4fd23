//! Contract variant selection.
//!
//! Maps a [`FeatureSet`] to one of the seven fixed token contract templates.
//! The selection is a pure, total function: every feature combination maps to
//! exactly one variant, and the priority ordering below is the single source
//! of truth for both the bytecode used and the constructor signature expected
//! downstream.

use crate::FeatureSet;
use serde::{Deserialize, Serialize};
use std::fmt;

/// The seven fixed token contract templates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ContractVariant {
	/// Plain ERC-20 with a supply cap.
	Basic,
	/// Holders may burn their balance.
	Burnable,
	/// Owner may mint up to the supply cap.
	Mintable,
	/// Burnable and mintable combined.
	BurnableMintable,
	/// Per-transfer fee routed to a recipient.
	Fee,
	/// Per-transfer share redistributed to holders.
	Redistribution,
	/// Burnable, mintable, and transfer hooks combined.
	Advanced,
}

impl ContractVariant {
	/// All variants, in selection priority order.
	pub const ALL: [ContractVariant; 7] = [
		ContractVariant::Advanced,
		ContractVariant::BurnableMintable,
		ContractVariant::Burnable,
		ContractVariant::Mintable,
		ContractVariant::Fee,
		ContractVariant::Redistribution,
		ContractVariant::Basic,
	];

	/// Stable template identifier used by the template store.
	pub fn template_name(&self) -> &'static str {
		match self {
			ContractVariant::Basic => "token_basic",
			ContractVariant::Burnable => "token_burnable",
			ContractVariant::Mintable => "token_mintable",
			ContractVariant::BurnableMintable => "token_burnable_mintable",
			ContractVariant::Fee => "token_fee",
			ContractVariant::Redistribution => "token_redistribution",
			ContractVariant::Advanced => "token_advanced",
		}
	}
}

impl fmt::Display for ContractVariant {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.template_name())
	}
}

/// Selects the contract variant for a feature set.
///
/// The decision is priority-based, not independent per flag: the advanced
/// combination (burn AND mint AND a transfer hook) wins over every simpler
/// combination even when the simpler combination's flags are also set.
/// Total and deterministic; the final arm resolves to `Basic`.
pub fn select_variant(features: &FeatureSet) -> ContractVariant {
	let fee = features.transfer_fee.is_some();
	let redistribution = features.redistribution.is_some();

	if features.burnable && features.mintable && (fee || redistribution) {
		ContractVariant::Advanced
	} else if features.burnable && features.mintable {
		ContractVariant::BurnableMintable
	} else if features.burnable {
		ContractVariant::Burnable
	} else if features.mintable {
		ContractVariant::Mintable
	} else if fee {
		ContractVariant::Fee
	} else if redistribution {
		ContractVariant::Redistribution
	} else {
		ContractVariant::Basic
	}
}
