//! Bundled contract templates for the token deployer system.
//!
//! Each contract variant (and each auxiliary contract kind) maps to a
//! static artifact holding the flattened Solidity source, the compiled
//! creation bytecode, and the ABI. Sources are bundled so explorer
//! verification can submit the exact text the bytecode was built from;
//! the store is versioned as a whole and artifacts are never fetched at
//! runtime.

use deployer_types::{AuxiliaryKind, ContractVariant};
use once_cell::sync::Lazy;
use serde::Deserialize;
use std::collections::HashMap;
use thiserror::Error;

/// Compiler version all bundled artifacts were built with. Submitted to
/// explorers during source verification.
pub const COMPILER_VERSION: &str = "v0.8.24+commit.e11b9ed9";

/// Whether the optimizer was enabled for the bundled artifacts.
pub const OPTIMIZER_ENABLED: bool = true;

/// Optimizer runs setting for the bundled artifacts.
pub const OPTIMIZER_RUNS: u32 = 200;

/// Errors that can occur when resolving templates.
#[derive(Debug, Error)]
pub enum TemplateError {
	/// No artifact is bundled under the requested name.
	#[error("Template not found: {0}")]
	NotFound(String),
	/// A bundled artifact failed to parse.
	#[error("Malformed template artifact '{name}': {reason}")]
	Malformed { name: String, reason: String },
}

/// A compiled contract template.
#[derive(Debug, Clone)]
pub struct TemplateArtifact {
	/// Template identifier, e.g. "token_basic".
	pub name: String,
	/// Solidity contract name, e.g. "BasicToken".
	pub contract_name: String,
	/// Flattened Solidity source text.
	pub source: String,
	/// Creation bytecode (without constructor arguments appended).
	pub bytecode: Vec<u8>,
	/// Contract ABI as a JSON array.
	pub abi: serde_json::Value,
}

impl TemplateArtifact {
	/// Creation bytecode as a 0x-prefixed hex string.
	pub fn bytecode_hex(&self) -> String {
		format!("0x{}", hex::encode(&self.bytecode))
	}
}

#[derive(Deserialize)]
struct RawArtifact {
	#[serde(rename = "contractName")]
	contract_name: String,
	abi: serde_json::Value,
	bytecode: String,
}

fn parse_artifact(
	name: &str,
	source: &'static str,
	artifact_json: &'static str,
) -> Result<TemplateArtifact, TemplateError> {
	let raw: RawArtifact =
		serde_json::from_str(artifact_json).map_err(|e| TemplateError::Malformed {
			name: name.to_string(),
			reason: e.to_string(),
		})?;

	let bytecode =
		hex::decode(raw.bytecode.trim_start_matches("0x")).map_err(|e| {
			TemplateError::Malformed {
				name: name.to_string(),
				reason: format!("bytecode is not valid hex: {}", e),
			}
		})?;
	if bytecode.is_empty() {
		return Err(TemplateError::Malformed {
			name: name.to_string(),
			reason: "bytecode is empty".to_string(),
		});
	}

	Ok(TemplateArtifact {
		name: name.to_string(),
		contract_name: raw.contract_name,
		source: source.to_string(),
		bytecode,
		abi: raw.abi,
	})
}

macro_rules! bundled {
	($( $name:literal ),* $(,)?) => {
		[
			$((
				$name,
				include_str!(concat!("../templates/", $name, ".sol")),
				include_str!(concat!("../templates/", $name, ".json")),
			)),*
		]
	};
}

static BUNDLED: Lazy<HashMap<String, TemplateArtifact>> = Lazy::new(|| {
	let entries = bundled![
		"token_basic",
		"token_burnable",
		"token_mintable",
		"token_burnable_mintable",
		"token_fee",
		"token_redistribution",
		"token_advanced",
		"vesting_linear",
		"presale",
	];

	entries
		.into_iter()
		.map(|(name, source, artifact)| {
			// Bundled artifacts are validated at build time by the tests
			// below; a malformed one is unrecoverable at runtime.
			let parsed = parse_artifact(name, source, artifact)
				.unwrap_or_else(|e| panic!("invalid bundled artifact: {}", e));
			(name.to_string(), parsed)
		})
		.collect()
});

/// Read-only store of the bundled templates.
pub struct TemplateStore;

impl TemplateStore {
	/// Looks up a template by identifier.
	pub fn get(name: &str) -> Result<&'static TemplateArtifact, TemplateError> {
		BUNDLED
			.get(name)
			.ok_or_else(|| TemplateError::NotFound(name.to_string()))
	}

	/// Resolves the template for a token contract variant.
	pub fn for_variant(
		variant: ContractVariant,
	) -> Result<&'static TemplateArtifact, TemplateError> {
		Self::get(variant.template_name())
	}

	/// Resolves the template for an auxiliary contract kind.
	pub fn for_auxiliary(
		kind: AuxiliaryKind,
	) -> Result<&'static TemplateArtifact, TemplateError> {
		Self::get(kind.template_name())
	}

	/// All bundled template identifiers.
	pub fn names() -> Vec<&'static str> {
		BUNDLED.keys().map(String::as_str).collect()
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_every_variant_has_a_template() {
		for variant in ContractVariant::ALL {
			let artifact = TemplateStore::for_variant(variant).unwrap();
			assert!(!artifact.bytecode.is_empty());
			assert!(artifact.abi.is_array());
			assert!(artifact.source.contains("pragma solidity"));
		}
	}

	#[test]
	fn test_auxiliary_templates_exist() {
		assert!(TemplateStore::for_auxiliary(AuxiliaryKind::Vesting).is_ok());
		assert!(TemplateStore::for_auxiliary(AuxiliaryKind::Presale).is_ok());
	}

	#[test]
	fn test_unknown_template_is_not_found() {
		assert!(matches!(
			TemplateStore::get("token_unknown"),
			Err(TemplateError::NotFound(_))
		));
	}

	#[test]
	fn test_constructor_abi_matches_variant_suffix() {
		// The fee variant's constructor takes the shared prefix plus
		// (feeBps, feeRecipient, owner).
		let artifact = TemplateStore::for_variant(ContractVariant::Fee).unwrap();
		let constructor = artifact
			.abi
			.as_array()
			.unwrap()
			.iter()
			.find(|entry| entry["type"] == "constructor")
			.unwrap();
		let inputs = constructor["inputs"].as_array().unwrap();
		assert_eq!(inputs.len(), 8);
		assert_eq!(inputs[5]["name"], "feeBps");
		assert_eq!(inputs[6]["name"], "feeRecipient");
		assert_eq!(inputs[7]["name"], "owner_");
	}

	#[test]
	fn test_bytecode_hex_round_trip() {
		let artifact = TemplateStore::get("token_basic").unwrap();
		let hex = artifact.bytecode_hex();
		assert!(hex.starts_with("0x60"));
	}
}
