//! Decimal-aware token amount scaling.
//!
//! Token supplies arrive as decimal strings in whole-token units and are
//! carried on-chain as integers scaled by `10^decimals`. All arithmetic here
//! is arbitrary-precision `U256`; floating point would lose precision for
//! supplies anywhere near the 18-decimal range.

use alloy_primitives::U256;
use thiserror::Error;

/// Errors produced while scaling token amounts.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum AmountError {
	/// The amount string is empty or contains non-numeric characters.
	#[error("Invalid amount '{0}'")]
	Invalid(String),
	/// The fractional part has more digits than the token's decimals.
	#[error("Amount '{amount}' has more than {decimals} fractional digits")]
	TooManyFractionalDigits { amount: String, decimals: u8 },
	/// The scaled value does not fit in 256 bits.
	#[error("Amount '{0}' overflows 256 bits when scaled")]
	Overflow(String),
}

fn parse_digits(digits: &str, original: &str) -> Result<U256, AmountError> {
	if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
		return Err(AmountError::Invalid(original.to_string()));
	}
	U256::from_str_radix(digits, 10).map_err(|_| AmountError::Overflow(original.to_string()))
}

/// Scales a decimal string by `10^decimals` into integer base units.
///
/// Accepts plain integers ("1000000") and fractional values ("1.5") whose
/// fractional part fits within `decimals` digits.
pub fn scale_amount(amount: &str, decimals: u8) -> Result<U256, AmountError> {
	let (int_part, frac_part) = match amount.split_once('.') {
		Some((i, f)) => (i, f),
		None => (amount, ""),
	};

	if frac_part.len() > decimals as usize {
		// Allow trailing zeros beyond the precision limit ("1.50" at 1 decimal)
		let (keep, rest) = frac_part.split_at(decimals as usize);
		if rest.bytes().all(|b| b == b'0') {
			return scale_parts(int_part, keep, decimals, amount);
		}
		return Err(AmountError::TooManyFractionalDigits {
			amount: amount.to_string(),
			decimals,
		});
	}

	scale_parts(int_part, frac_part, decimals, amount)
}

fn scale_parts(
	int_part: &str,
	frac_part: &str,
	decimals: u8,
	original: &str,
) -> Result<U256, AmountError> {
	let int_value = parse_digits(int_part, original)?;
	let frac_value = if frac_part.is_empty() {
		U256::ZERO
	} else {
		// Right-pad the fractional digits out to the full precision
		let padded = format!("{:0<width$}", frac_part, width = decimals as usize);
		parse_digits(&padded, original)?
	};

	let factor = U256::from(10).pow(U256::from(decimals));
	int_value
		.checked_mul(factor)
		.and_then(|v| v.checked_add(frac_value))
		.ok_or(AmountError::Overflow(original.to_string()))
}

/// Converts integer base units back to a decimal string.
///
/// The inverse of [`scale_amount`]: whole-token values come back without a
/// fractional part, and trailing fractional zeros are trimmed.
pub fn unscale_amount(amount: U256, decimals: u8) -> String {
	let divisor = U256::from(10).pow(U256::from(decimals));
	let whole = amount / divisor;
	let fractional = amount % divisor;

	if fractional.is_zero() {
		return whole.to_string();
	}

	let frac_str = format!("{:0>width$}", fractional, width = decimals as usize);
	format!("{}.{}", whole, frac_str.trim_end_matches('0'))
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_scale_whole_tokens() {
		let scaled = scale_amount("1000000", 18).unwrap();
		let expected = U256::from(1_000_000u64) * U256::from(10).pow(U256::from(18));
		assert_eq!(scaled, expected);
	}

	#[test]
	fn test_scale_round_trip_exact() {
		for (amount, decimals) in [
			("1000000", 18u8),
			("1", 0),
			("123456789", 6),
			("1.5", 18),
			("0.000000000000000001", 18),
		] {
			let scaled = scale_amount(amount, decimals).unwrap();
			assert_eq!(unscale_amount(scaled, decimals), amount);
		}
	}

	#[test]
	fn test_scale_large_supply_no_drift() {
		// 10^30 whole tokens at 18 decimals is 10^48 base units
		let amount = "1000000000000000000000000000000";
		let scaled = scale_amount(amount, 18).unwrap();
		assert_eq!(
			scaled,
			U256::from(10).pow(U256::from(48))
		);
		assert_eq!(unscale_amount(scaled, 18), amount);
	}

	#[test]
	fn test_scale_fractional() {
		assert_eq!(scale_amount("1.5", 1).unwrap(), U256::from(15));
		assert_eq!(scale_amount("1.50", 1).unwrap(), U256::from(15));
		assert_eq!(scale_amount("0.25", 6).unwrap(), U256::from(250_000));
	}

	#[test]
	fn test_scale_rejects_excess_precision() {
		let err = scale_amount("1.55", 1).unwrap_err();
		assert!(matches!(err, AmountError::TooManyFractionalDigits { .. }));
	}

	#[test]
	fn test_scale_rejects_garbage() {
		assert!(scale_amount("", 18).is_err());
		assert!(scale_amount("abc", 18).is_err());
		assert!(scale_amount("1.2.3", 18).is_err());
		assert!(scale_amount("-5", 18).is_err());
	}

	#[test]
	fn test_scale_rejects_overflow() {
		// 10^78 exceeds U256
		let huge = format!("1{}", "0".repeat(78));
		assert!(matches!(
			scale_amount(&huge, 18),
			Err(AmountError::Overflow(_))
		));
	}

	#[test]
	fn test_unscale_trims_trailing_zeros() {
		let value = scale_amount("2.500000", 6).unwrap();
		assert_eq!(unscale_amount(value, 6), "2.5");
	}
}
