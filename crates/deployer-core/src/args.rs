//! Constructor argument building and ABI encoding.
//!
//! Every token template shares a five-element constructor prefix
//! `(name, symbol, decimals, initialSupplyScaled, maxSupplyScaled)`; the
//! variant determines the suffix appended after it. Suffix ordering is part
//! of the on-chain ABI contract, so it is fixed here and mirrored by the
//! bundled template sources.
//!
//! All amount math is `U256` integer arithmetic on scaled values; floats
//! never touch token amounts.

use alloy_dyn_abi::DynSolValue;
use alloy_primitives::U256;
use deployer_types::{
	parse_address, scale_amount, AmountError, ContractVariant, FeatureSet, TokenParameters,
	MAX_FEE_BPS, MAX_REDISTRIBUTION_BPS,
};
use thiserror::Error;

/// Errors produced while validating and building constructor arguments.
///
/// All of these are caught before any network interaction.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum BuildError {
	/// A supply string failed to parse or scale.
	#[error("Invalid amount in field '{field}': {source}")]
	InvalidAmount {
		field: &'static str,
		source: AmountError,
	},
	/// A fee or redistribution percentage exceeds the variant's limit.
	#[error("Field '{field}' is {bps} bps, above the maximum of {max} bps")]
	PercentageOutOfRange {
		field: &'static str,
		bps: u16,
		max: u16,
	},
	/// An address-typed field is not a canonical 20-byte hex address.
	#[error("Field '{field}' is not a valid address: {value}")]
	InvalidAddress { field: &'static str, value: String },
	/// Initial supply exceeds a nonzero max supply.
	#[error("Initial supply exceeds max supply")]
	SupplyExceedsMax,
	/// Decimals outside the supported 0..=18 range.
	#[error("Decimals must be between 0 and 18, got {0}")]
	InvalidDecimals(u8),
	/// The variant needs a feature the feature set does not carry.
	#[error("Variant requires feature configuration: {0}")]
	MissingFeature(&'static str),
}

/// Built, validated constructor arguments for one deployment.
#[derive(Debug, Clone)]
pub struct ConstructorArgs {
	/// Variant whose constructor these arguments target.
	pub variant: ContractVariant,
	/// Initial supply scaled by `10^decimals`.
	pub initial_supply_scaled: U256,
	/// Max supply scaled by `10^decimals`; zero means uncapped.
	pub max_supply_scaled: U256,
	values: Vec<DynSolValue>,
}

impl ConstructorArgs {
	/// The argument values in constructor order.
	pub fn values(&self) -> &[DynSolValue] {
		&self.values
	}

	/// ABI-encodes the arguments for appending to creation bytecode.
	pub fn encode(&self) -> Vec<u8> {
		DynSolValue::Tuple(self.values.clone()).abi_encode_params()
	}

	/// Encoded arguments as a 0x-prefixed hex string.
	pub fn encoded_hex(&self) -> String {
		format!("0x{}", hex::encode(self.encode()))
	}
}

/// Builds and validates constructor arguments for a variant.
pub struct ConstructorArgBuilder;

impl ConstructorArgBuilder {
	/// Validates token parameters and features against the variant and
	/// produces the ordered argument list.
	pub fn build(
		variant: ContractVariant,
		params: &TokenParameters,
		features: &FeatureSet,
	) -> Result<ConstructorArgs, BuildError> {
		if params.decimals > 18 {
			return Err(BuildError::InvalidDecimals(params.decimals));
		}

		let initial_supply_scaled =
			scale_amount(&params.initial_supply, params.decimals).map_err(|source| {
				BuildError::InvalidAmount {
					field: "initial_supply",
					source,
				}
			})?;
		let max_supply_scaled =
			scale_amount(&params.max_supply, params.decimals).map_err(|source| {
				BuildError::InvalidAmount {
					field: "max_supply",
					source,
				}
			})?;
		if max_supply_scaled != U256::ZERO && initial_supply_scaled > max_supply_scaled {
			return Err(BuildError::SupplyExceedsMax);
		}

		let owner = address_value(&params.owner, "owner")?;

		let mut values = vec![
			DynSolValue::String(params.name.clone()),
			DynSolValue::String(params.symbol.clone()),
			DynSolValue::Uint(U256::from(params.decimals), 8),
			DynSolValue::Uint(initial_supply_scaled, 256),
			DynSolValue::Uint(max_supply_scaled, 256),
		];

		match variant {
			ContractVariant::Fee => {
				let fee = features
					.transfer_fee
					.as_ref()
					.ok_or(BuildError::MissingFeature("transfer_fee"))?;
				values.push(bps_value(fee.bps, "transfer_fee", MAX_FEE_BPS)?);
				values.push(address_value(&fee.recipient, "fee_recipient")?);
				values.push(owner);
			},
			ContractVariant::Redistribution => {
				let redistribution = features
					.redistribution
					.as_ref()
					.ok_or(BuildError::MissingFeature("redistribution"))?;
				values.push(bps_value(
					redistribution.bps,
					"redistribution",
					MAX_REDISTRIBUTION_BPS,
				)?);
				values.push(owner);
			},
			ContractVariant::Advanced => {
				// Advanced requires at least one transfer hook; a missing
				// one deploys with 0 bps for that hook.
				if !features.has_transfer_hooks() {
					return Err(BuildError::MissingFeature("transfer_fee or redistribution"));
				}
				let (fee_bps, fee_recipient) = match &features.transfer_fee {
					Some(fee) => (fee.bps, address_value(&fee.recipient, "fee_recipient")?),
					None => (0, DynSolValue::Address(alloy_primitives::Address::ZERO)),
				};
				let redistribution_bps =
					features.redistribution.as_ref().map(|r| r.bps).unwrap_or(0);
				values.push(bps_value(fee_bps, "transfer_fee", MAX_FEE_BPS)?);
				values.push(fee_recipient);
				values.push(bps_value(
					redistribution_bps,
					"redistribution",
					MAX_REDISTRIBUTION_BPS,
				)?);
				values.push(owner);
			},
			ContractVariant::Basic
			| ContractVariant::Burnable
			| ContractVariant::Mintable
			| ContractVariant::BurnableMintable => {
				values.push(owner);
			},
		}

		Ok(ConstructorArgs {
			variant,
			initial_supply_scaled,
			max_supply_scaled,
			values,
		})
	}
}

fn address_value(raw: &str, field: &'static str) -> Result<DynSolValue, BuildError> {
	let address = parse_address(raw).map_err(|_| BuildError::InvalidAddress {
		field,
		value: raw.to_string(),
	})?;
	Ok(DynSolValue::Address(address.to_alloy()))
}

fn bps_value(bps: u16, field: &'static str, max: u16) -> Result<DynSolValue, BuildError> {
	if bps > max {
		return Err(BuildError::PercentageOutOfRange { field, bps, max });
	}
	Ok(DynSolValue::Uint(U256::from(bps), 16))
}
