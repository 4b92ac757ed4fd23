//! Utility functions shared across the deployer.

pub mod amount;
pub mod conversion;
pub mod formatting;

pub use amount::{scale_amount, unscale_amount, AmountError};
pub use conversion::parse_address;
pub use formatting::{truncate_id, with_0x_prefix, without_0x_prefix};

use std::time::{SystemTime, UNIX_EPOCH};

/// Current Unix timestamp in seconds.
pub fn current_timestamp() -> u64 {
	SystemTime::now()
		.duration_since(UNIX_EPOCH)
		.unwrap_or_default()
		.as_secs()
}
