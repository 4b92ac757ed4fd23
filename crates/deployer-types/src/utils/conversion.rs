//! Conversion utilities for common data transformations.

use super::formatting::without_0x_prefix;
use crate::Address;

/// Parse a hex string address into the deployer's `Address` type.
///
/// Accepts strings with or without a "0x" prefix; the decoded value must be
/// exactly 20 bytes.
pub fn parse_address(hex_str: &str) -> Result<Address, String> {
	let hex = without_0x_prefix(hex_str);
	hex::decode(hex)
		.map_err(|e| format!("Invalid hex: {}", e))
		.and_then(|bytes| {
			if bytes.len() != 20 {
				Err(format!(
					"Invalid address length: expected 20 bytes, got {}",
					bytes.len()
				))
			} else {
				Ok(Address(bytes))
			}
		})
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_parse_address_valid() {
		let addr = parse_address("0x5fbdb2315678afecb367f032d93f642f64180aa3").unwrap();
		assert_eq!(addr.0.len(), 20);
		assert_eq!(
			addr.to_string(),
			"0x5fbdb2315678afecb367f032d93f642f64180aa3"
		);

		// Without prefix
		let addr = parse_address("5fbdb2315678afecb367f032d93f642f64180aa3").unwrap();
		assert_eq!(addr.0.len(), 20);
	}

	#[test]
	fn test_parse_address_invalid_hex() {
		assert!(parse_address("0xzz").is_err());
	}

	#[test]
	fn test_parse_address_wrong_length() {
		let err = parse_address("0x1234").unwrap_err();
		assert!(err.contains("Invalid address length"));
	}
}
