//! String formatting helpers for hex values and identifiers.

/// Truncates an identifier for log output, keeping a recognizable prefix.
pub fn truncate_id(id: &str) -> String {
	const VISIBLE: usize = 10;
	if id.len() <= VISIBLE {
		id.to_string()
	} else {
		format!("{}..", &id[..VISIBLE])
	}
}

/// Returns the string with a "0x" prefix, adding one if missing.
pub fn with_0x_prefix(hex_str: &str) -> String {
	if hex_str.starts_with("0x") {
		hex_str.to_string()
	} else {
		format!("0x{}", hex_str)
	}
}

/// Returns the string without a leading "0x" prefix.
pub fn without_0x_prefix(hex_str: &str) -> &str {
	hex_str.strip_prefix("0x").unwrap_or(hex_str)
}
