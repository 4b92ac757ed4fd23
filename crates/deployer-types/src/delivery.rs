//! Transaction delivery types for the deployer system.
//!
//! This module defines types related to blockchain transaction submission
//! and monitoring, including transaction hashes and receipts.

use crate::Address;

/// Blockchain transaction hash representation.
///
/// Stores transaction hashes as raw bytes.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct TransactionHash(pub Vec<u8>);

impl std::fmt::Display for TransactionHash {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		write!(f, "0x{}", hex::encode(&self.0))
	}
}

/// Fixed-size hash type for log topics.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct H256(pub [u8; 32]);

/// Event log emitted by smart contracts.
///
/// Contains event data and indexed parameters (topics).
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Log {
	/// Contract address that emitted the log.
	pub address: Address,
	/// Indexed event parameters. Topic[0] is typically the event signature hash.
	pub topics: Vec<H256>,
	/// Non-indexed event data.
	pub data: Vec<u8>,
}

/// Transaction receipt containing execution details.
///
/// Provides information about a transaction after it has been included in a
/// block. For deployment transactions the created contract address is
/// reported by the node in `contract_address`.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct TransactionReceipt {
	/// The hash of the transaction.
	pub hash: TransactionHash,
	/// The block number where the transaction was included.
	pub block_number: u64,
	/// Whether the transaction executed successfully.
	pub success: bool,
	/// Address of the contract created by this transaction, if any.
	pub contract_address: Option<Address>,
	/// Gas consumed by the transaction.
	pub gas_used: u64,
	/// Effective gas price paid, in wei.
	pub effective_gas_price: u128,
	/// Event logs emitted during transaction execution.
	pub logs: Vec<Log>,
}

impl TransactionReceipt {
	/// Total cost of the transaction in wei.
	pub fn cost_wei(&self) -> alloy_primitives::U256 {
		alloy_primitives::U256::from(self.gas_used) * alloy_primitives::U256::from(self.effective_gas_price)
	}
}
