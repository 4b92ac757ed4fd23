//! Account-related types for the deployer system.
//!
//! This module defines types for blockchain addresses, signatures, and
//! transactions that are used throughout the deployer for account management
//! and transaction construction.

use crate::with_0x_prefix;
use alloy_primitives::{Address as AlloyAddress, Bytes, PrimitiveSignature, U256};
use alloy_rpc_types::TransactionRequest;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// Blockchain address representation.
///
/// Stores addresses as raw bytes to keep serialization independent of any
/// particular provider library.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Address(pub Vec<u8>);

/// Custom serialization for Address - serializes as hex string
impl Serialize for Address {
	fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
	where
		S: Serializer,
	{
		serializer.serialize_str(&with_0x_prefix(&hex::encode(&self.0)))
	}
}

/// Custom deserialization for Address - accepts hex strings
impl<'de> Deserialize<'de> for Address {
	fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
	where
		D: Deserializer<'de>,
	{
		let s = String::deserialize(deserializer)?;
		let hex_str = s.trim_start_matches("0x");
		let bytes = hex::decode(hex_str)
			.map_err(|e| serde::de::Error::custom(format!("Invalid hex address: {}", e)))?;

		if bytes.len() != 20 {
			return Err(serde::de::Error::custom(format!(
				"Invalid address length: expected 20 bytes, got {}",
				bytes.len()
			)));
		}

		Ok(Address(bytes))
	}
}

impl fmt::Display for Address {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "0x{}", hex::encode(&self.0))
	}
}

impl Address {
	/// Converts to an Alloy address. The inner buffer is always 20 bytes
	/// for addresses constructed through `parse_address` or deserialization.
	pub fn to_alloy(&self) -> AlloyAddress {
		let mut arr = [0u8; 20];
		arr.copy_from_slice(&self.0[..20]);
		AlloyAddress::from(arr)
	}
}

impl From<AlloyAddress> for Address {
	fn from(addr: AlloyAddress) -> Self {
		Address(addr.as_slice().to_vec())
	}
}

/// Cryptographic signature representation.
///
/// Stores signatures as raw bytes in the standard Ethereum format (r, s, v).
#[derive(Debug, Clone)]
pub struct Signature(pub Vec<u8>);

impl From<PrimitiveSignature> for Signature {
	fn from(sig: PrimitiveSignature) -> Self {
		let mut bytes = Vec::with_capacity(65);
		bytes.extend_from_slice(&sig.r().to_be_bytes::<32>());
		bytes.extend_from_slice(&sig.s().to_be_bytes::<32>());
		// For non-EIP-155, v = 27 + y_parity
		let v = if sig.v() { 28 } else { 27 };
		bytes.push(v);
		Signature(bytes)
	}
}

/// Blockchain transaction representation.
///
/// Contains all fields necessary for constructing and submitting
/// transactions, including contract-creation transactions (no recipient).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transaction {
	/// Recipient address (None for contract creation).
	pub to: Option<Address>,
	/// Transaction data; for contract creation this is bytecode plus
	/// ABI-encoded constructor arguments.
	pub data: Vec<u8>,
	/// Value to transfer in native currency.
	pub value: U256,
	/// Chain ID for replay protection.
	pub chain_id: u64,
	/// Transaction nonce (optional, can be filled by provider).
	pub nonce: Option<u64>,
	/// Gas limit for transaction execution.
	pub gas_limit: Option<u64>,
	/// Legacy gas price (for non-EIP-1559 transactions).
	pub gas_price: Option<u128>,
	/// Maximum fee per gas (EIP-1559).
	pub max_fee_per_gas: Option<u128>,
	/// Maximum priority fee per gas (EIP-1559).
	pub max_priority_fee_per_gas: Option<u128>,
}

impl Transaction {
	/// Creates a contract-creation transaction with the given init code.
	pub fn contract_creation(data: Vec<u8>, chain_id: u64) -> Self {
		Transaction {
			to: None,
			data,
			value: U256::ZERO,
			chain_id,
			nonce: None,
			gas_limit: None,
			gas_price: None,
			max_fee_per_gas: None,
			max_priority_fee_per_gas: None,
		}
	}

	/// Creates a zero-value contract call transaction.
	pub fn call(to: Address, data: Vec<u8>, chain_id: u64) -> Self {
		Transaction {
			to: Some(to),
			data,
			value: U256::ZERO,
			chain_id,
			nonce: None,
			gas_limit: None,
			gas_price: None,
			max_fee_per_gas: None,
			max_priority_fee_per_gas: None,
		}
	}
}

/// Conversion from Alloy's TransactionRequest to our Transaction type.
impl From<TransactionRequest> for Transaction {
	fn from(req: TransactionRequest) -> Self {
		Transaction {
			to: req.to.and_then(|addr| match addr {
				alloy_primitives::TxKind::Call(a) => Some(Address(a.as_slice().to_vec())),
				alloy_primitives::TxKind::Create => None,
			}),
			data: req.input.input.clone().unwrap_or_default().to_vec(),
			value: req.value.unwrap_or(U256::ZERO),
			chain_id: req.chain_id.unwrap_or(1),
			nonce: req.nonce,
			gas_limit: req.gas,
			gas_price: req.gas_price,
			max_fee_per_gas: req.max_fee_per_gas,
			max_priority_fee_per_gas: req.max_priority_fee_per_gas,
		}
	}
}

/// Conversion from our Transaction type to Alloy's TransactionRequest.
///
/// A missing recipient maps to `TxKind::Create`, which is how deployment
/// transactions are expressed.
impl From<Transaction> for TransactionRequest {
	fn from(tx: Transaction) -> Self {
		let to = match tx.to {
			Some(to) => alloy_primitives::TxKind::Call(to.to_alloy()),
			None => alloy_primitives::TxKind::Create,
		};

		TransactionRequest {
			chain_id: Some(tx.chain_id),
			value: Some(tx.value),
			to: Some(to),
			nonce: tx.nonce,
			gas: tx.gas_limit,
			gas_price: tx.gas_price,
			max_fee_per_gas: tx.max_fee_per_gas,
			max_priority_fee_per_gas: tx.max_priority_fee_per_gas,
			input: alloy_rpc_types::TransactionInput {
				input: Some(Bytes::from(tx.data)),
				data: None,
			},
			..Default::default()
		}
	}
}
