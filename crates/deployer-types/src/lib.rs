//! Common types module for the token deployer system.
//!
//! This module defines the core data types and structures used throughout
//! the deployer. It provides a centralized location for shared types to
//! ensure consistency across all deployer components.

/// Account-related types for addresses, signatures, and transactions.
pub mod account;
/// Transaction delivery types for blockchain interactions.
pub mod delivery;
/// Deployment record and session types.
pub mod deployment;
/// Event types for orchestration progress reporting.
pub mod events;
/// Declarative token feature configuration.
pub mod features;
/// Network and explorer configuration types.
pub mod networks;
/// Secure string type for handling sensitive data.
pub mod secret_string;
/// Token constructor parameter types.
pub mod token;
/// Utility functions for common type conversions.
pub mod utils;
/// Contract variant selection.
pub mod variant;
/// Vesting and presale auxiliary-contract types.
pub mod vesting;

// Re-export all types for convenient access
pub use account::*;
pub use delivery::*;
pub use deployment::*;
pub use events::*;
pub use features::*;
pub use networks::{deserialize_networks, NetworkConfig, NetworksConfig, RpcEndpoint};
pub use secret_string::SecretString;
pub use token::*;
pub use utils::{
	current_timestamp, parse_address, scale_amount, truncate_id, unscale_amount, with_0x_prefix,
	without_0x_prefix, AmountError,
};
pub use variant::*;
pub use vesting::*;
