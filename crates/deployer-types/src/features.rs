//! Declarative token feature configuration.
//!
//! A [`FeatureSet`] describes the capabilities requested for a token before
//! any contract is selected or deployed. It is the authoritative record of
//! what was asked for: variant selection derives from it, and it is attached
//! to the deployment record at deployment time so capabilities never have to
//! be inferred from a live contract.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Maximum transfer fee, in basis points (10%).
pub const MAX_FEE_BPS: u16 = 1000;
/// Maximum holder redistribution share, in basis points (5%).
pub const MAX_REDISTRIBUTION_BPS: u16 = 500;

/// Errors produced when normalizing user-facing percentages.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum FeatureError {
	/// The percentage does not land on a whole basis point.
	#[error("Percentage {0} is not representable in whole basis points")]
	FractionalBasisPoints(Decimal),
	/// The percentage is negative or too large to fit in u16 basis points.
	#[error("Percentage {0} is outside the representable range")]
	Unrepresentable(Decimal),
}

/// Converts a human percentage (e.g. `2.5`) to basis points (`250`).
///
/// Range enforcement against per-feature limits happens later, in the
/// constructor argument builder; this only rejects values that cannot be
/// expressed as whole basis points at all.
pub fn percentage_to_bps(percentage: Decimal) -> Result<u16, FeatureError> {
	let bps = percentage * Decimal::from(100);
	if bps.fract() != Decimal::ZERO {
		return Err(FeatureError::FractionalBasisPoints(percentage));
	}
	bps.to_u16()
		.ok_or(FeatureError::Unrepresentable(percentage))
}

/// Transfer fee configuration.
///
/// The recipient is kept as the raw user-supplied string; the constructor
/// argument builder validates its shape and reports the offending field by
/// name on failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferFee {
	/// Fee taken on each transfer, in basis points.
	pub bps: u16,
	/// Address receiving the collected fees.
	pub recipient: String,
}

impl TransferFee {
	/// Builds a transfer fee from a human percentage.
	pub fn from_percentage(
		percentage: Decimal,
		recipient: impl Into<String>,
	) -> Result<Self, FeatureError> {
		Ok(Self {
			bps: percentage_to_bps(percentage)?,
			recipient: recipient.into(),
		})
	}
}

/// Holder redistribution configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Redistribution {
	/// Share of each transfer redistributed to holders, in basis points.
	pub bps: u16,
}

impl Redistribution {
	/// Builds a redistribution share from a human percentage.
	pub fn from_percentage(percentage: Decimal) -> Result<Self, FeatureError> {
		Ok(Self {
			bps: percentage_to_bps(percentage)?,
		})
	}
}

/// Normalized token capability flags.
///
/// Immutable once handed to variant selection; the same value is persisted
/// on the deployment record as declared metadata.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct FeatureSet {
	/// Token holders may burn their balance.
	pub burnable: bool,
	/// The owner may mint additional supply (up to max supply).
	pub mintable: bool,
	/// Per-transfer fee routed to a recipient.
	pub transfer_fee: Option<TransferFee>,
	/// Per-transfer share redistributed across holders.
	pub redistribution: Option<Redistribution>,
}

impl FeatureSet {
	/// True if any transfer-tax style feature is requested.
	pub fn has_transfer_hooks(&self) -> bool {
		self.transfer_fee.is_some() || self.redistribution.is_some()
	}
}
