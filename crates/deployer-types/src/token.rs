//! Token constructor parameter types.

use serde::{Deserialize, Serialize};

/// User-supplied token parameters.
///
/// Supplies are decimal strings in whole-token units; they are scaled by
/// `10^decimals` into integer base units by the constructor argument builder
/// before going anywhere near a transaction. Addresses are kept as raw
/// strings here so validation failures can name the offending field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenParameters {
	/// Token name, e.g. "Wrapped Example".
	pub name: String,
	/// Ticker symbol, e.g. "WEX".
	pub symbol: String,
	/// Decimal places, 0 through 18.
	pub decimals: u8,
	/// Initial supply in whole tokens, as a decimal string.
	pub initial_supply: String,
	/// Maximum supply in whole tokens, as a decimal string; "0" means
	/// uncapped.
	pub max_supply: String,
	/// Address that receives the initial supply and contract ownership.
	pub owner: String,
}
