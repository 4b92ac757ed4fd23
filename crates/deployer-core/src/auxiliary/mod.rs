//! Auxiliary contract binding: vesting schedules and presale allocations.
//!
//! Auxiliary work happens strictly after the token itself is confirmed
//! on-chain, so nothing here can fail the token deployment. Vesting
//! registration is deliberately non-atomic: each schedule is a separate
//! transaction, a failure partway leaves earlier registrations standing,
//! and re-running skips already-registered beneficiaries instead of
//! double-funding them.

use crate::engine::event_bus::EventBus;
use alloy_dyn_abi::DynSolValue;
use alloy_primitives::U256;
use alloy_sol_types::{sol, SolCall};
use deployer_delivery::{DeliveryError, DeliveryService};
use deployer_storage::{StorageError, StorageService};
use deployer_templates::{TemplateError, TemplateStore};
use deployer_types::{
	current_timestamp, parse_address, Address, AuxiliaryContract, AuxiliaryEvent, AuxiliaryKind,
	DeployerEvent, PresaleConfig, Transaction, VestingInput, VestingSchedule,
};
use std::collections::HashSet;
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, warn};

/// Storage namespace mapping a token address to its vesting contract.
const VESTING_CONTRACTS_NAMESPACE: &str = "vesting_contracts";
/// Storage namespace for registered schedules, keyed `token-beneficiary`.
const VESTING_SCHEDULES_NAMESPACE: &str = "vesting_schedules";

sol! {
	function approve(address spender, uint256 amount) external returns (bool);
	function createSchedule(address beneficiary, uint256 amount, uint64 start, uint64 duration) external;
}

/// Errors raised before or during auxiliary contract work.
#[derive(Debug, Error)]
pub enum AuxiliaryError {
	/// Vesting percentages add up to more than the whole supply. Caught
	/// before any transaction is sent.
	#[error("Vesting percentages sum to {0}%, exceeding 100%")]
	VestingSumExceeded(u32),
	/// A single schedule is malformed.
	#[error("Invalid vesting schedule for '{beneficiary}': {reason}")]
	InvalidSchedule {
		beneficiary: String,
		reason: String,
	},
	/// The presale configuration is inconsistent.
	#[error("Invalid presale configuration: {0}")]
	InvalidPresale(String),
	/// An address field failed to parse.
	#[error("Invalid address in field '{field}': {value}")]
	InvalidAddress { field: &'static str, value: String },
	#[error("Template error: {0}")]
	Template(#[from] TemplateError),
	#[error("Storage error: {0}")]
	Storage(#[from] StorageError),
	#[error("Delivery error: {0}")]
	Delivery(#[from] DeliveryError),
	/// The creation receipt carried no contract address.
	#[error("Deployment transaction produced no contract address")]
	NoContractAddress,
}

/// Outcome of one schedule in a vesting batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VestingRegistration {
	/// Registered on-chain in this run.
	Registered(VestingSchedule),
	/// Beneficiary already had a schedule; left untouched.
	AlreadyExists { beneficiary: String },
	/// Registration failed; earlier registrations stand and a re-run will
	/// retry only this beneficiary.
	Failed { beneficiary: String, reason: String },
}

/// Result of a vesting batch: the shared contract plus per-schedule fates.
#[derive(Debug, Clone)]
pub struct VestingOutcome {
	pub contract: AuxiliaryContract,
	pub registrations: Vec<VestingRegistration>,
}

impl VestingOutcome {
	/// True when at least one schedule did not end up registered.
	pub fn is_partial(&self) -> bool {
		self.registrations
			.iter()
			.any(|r| matches!(r, VestingRegistration::Failed { .. }))
	}
}

/// Deploys and wires vesting and presale contracts to a deployed token.
pub struct AuxiliaryContractBinder {
	delivery: Arc<DeliveryService>,
	storage: Arc<StorageService>,
	event_bus: EventBus,
}

impl AuxiliaryContractBinder {
	pub fn new(
		delivery: Arc<DeliveryService>,
		storage: Arc<StorageService>,
		event_bus: EventBus,
	) -> Self {
		Self {
			delivery,
			storage,
			event_bus,
		}
	}

	/// Registers vesting schedules against a deployed token.
	///
	/// Validates the whole batch before any network call, deploys (or
	/// reuses) one shared vesting contract per token, approves the total
	/// pending amount, then registers schedules one transaction at a time.
	/// A beneficiary repeated within the batch keeps its first entry;
	/// later copies are reported as `AlreadyExists` without a transaction.
	/// Per-beneficiary amounts are `initial_supply * percentage / 100` in
	/// integer arithmetic; the division remainder stays with the owner so
	/// no schedule is over-funded.
	pub async fn attach_vesting(
		&self,
		session_id: &str,
		chain_id: u64,
		token: &Address,
		owner: &Address,
		initial_supply_scaled: U256,
		inputs: &[VestingInput],
	) -> Result<VestingOutcome, AuxiliaryError> {
		let beneficiaries = Self::validate_vesting(inputs)?;

		let vesting = self.vesting_contract_for(chain_id, token, owner).await?;

		// Work out which schedules are new before approving, so the
		// allowance covers exactly what this run will pull.
		let mut pending = Vec::new();
		let mut registrations = Vec::new();
		let mut seen = HashSet::new();
		for (input, beneficiary) in inputs.iter().zip(beneficiaries) {
			let key = schedule_key(token, &beneficiary);
			if !seen.insert(key.clone()) {
				self.publish_skipped(session_id, input, "beneficiary repeated in batch");
				registrations.push(VestingRegistration::AlreadyExists {
					beneficiary: input.beneficiary.clone(),
				});
				continue;
			}
			if self
				.storage
				.exists(VESTING_SCHEDULES_NAMESPACE, &key)
				.await?
			{
				self.publish_skipped(session_id, input, "schedule already registered");
				registrations.push(VestingRegistration::AlreadyExists {
					beneficiary: input.beneficiary.clone(),
				});
				continue;
			}
			let amount = initial_supply_scaled
				.checked_mul(U256::from(input.percentage))
				.map(|scaled| scaled / U256::from(100u8))
				.ok_or_else(|| AuxiliaryError::InvalidSchedule {
					beneficiary: input.beneficiary.clone(),
					reason: "vested amount overflows".to_string(),
				})?;
			pending.push((input, beneficiary, amount));
		}

		if !pending.is_empty() {
			let total: U256 = pending.iter().fold(U256::ZERO, |acc, (_, _, a)| acc + *a);
			self.send_and_confirm(
				Transaction::call(
					token.clone(),
					approveCall {
						spender: vesting.to_alloy(),
						amount: total,
					}
					.abi_encode(),
					chain_id,
				),
			)
			.await?;
		}

		for (input, beneficiary, amount) in pending {
			let result = self
				.register_schedule(chain_id, &vesting, &beneficiary, amount, input)
				.await;
			match result {
				Ok(schedule) => {
					let key = schedule_key(token, &beneficiary);
					match self
						.storage
						.store_new(VESTING_SCHEDULES_NAMESPACE, &key, &schedule)
						.await
					{
						Ok(()) => {
							info!(
								session_id,
								beneficiary = %input.beneficiary,
								category = %input.category,
								"Vesting schedule registered"
							);
							let _ = self.event_bus.publish(DeployerEvent::Auxiliary(
								AuxiliaryEvent::VestingRegistered {
									session_id: session_id.to_string(),
									beneficiary: input.beneficiary.clone(),
									category: input.category.clone(),
								},
							));
							registrations.push(VestingRegistration::Registered(schedule));
						},
						Err(StorageError::AlreadyExists(_)) => {
							self.publish_skipped(session_id, input, "schedule already registered");
							registrations.push(VestingRegistration::AlreadyExists {
								beneficiary: input.beneficiary.clone(),
							});
						},
						Err(e) => return Err(e.into()),
					}
				},
				Err(e) => {
					warn!(
						session_id,
						beneficiary = %input.beneficiary,
						error = %e,
						"Vesting schedule registration failed"
					);
					self.publish_skipped(session_id, input, &e.to_string());
					registrations.push(VestingRegistration::Failed {
						beneficiary: input.beneficiary.clone(),
						reason: e.to_string(),
					});
				},
			}
		}

		Ok(VestingOutcome {
			contract: AuxiliaryContract {
				kind: AuxiliaryKind::Vesting,
				address: vesting,
			},
			registrations,
		})
	}

	/// Deploys a presale contract bound to the token's sale parameters and
	/// approves the allocated share of the supply for it.
	pub async fn attach_presale(
		&self,
		session_id: &str,
		chain_id: u64,
		token: &Address,
		owner: &Address,
		initial_supply_scaled: U256,
		config: &PresaleConfig,
	) -> Result<AuxiliaryContract, AuxiliaryError> {
		Self::validate_presale(config)?;
		let fund_wallet =
			parse_address(&config.fund_wallet).map_err(|_| AuxiliaryError::InvalidAddress {
				field: "fund_wallet",
				value: config.fund_wallet.clone(),
			})?;

		let args = DynSolValue::Tuple(vec![
			DynSolValue::Address(token.to_alloy()),
			DynSolValue::Uint(config.soft_cap, 256),
			DynSolValue::Uint(config.hard_cap, 256),
			DynSolValue::Uint(config.min_purchase, 256),
			DynSolValue::Uint(config.max_purchase, 256),
			DynSolValue::Uint(config.rate, 256),
			DynSolValue::Uint(U256::from(config.start_time), 64),
			DynSolValue::Uint(U256::from(config.end_time), 64),
			DynSolValue::Address(fund_wallet.to_alloy()),
			DynSolValue::Address(owner.to_alloy()),
		]);
		let presale = self
			.deploy_contract(chain_id, AuxiliaryKind::Presale, &args.abi_encode_params())
			.await?;

		let allocation = initial_supply_scaled
			.checked_mul(U256::from(config.allocation_percentage))
			.map(|scaled| scaled / U256::from(100u8))
			.ok_or_else(|| {
				AuxiliaryError::InvalidPresale("allocated amount overflows".to_string())
			})?;
		self.send_and_confirm(Transaction::call(
			token.clone(),
			approveCall {
				spender: presale.to_alloy(),
				amount: allocation,
			}
			.abi_encode(),
			chain_id,
		))
		.await?;

		info!(session_id, presale = %presale, "Presale contract deployed");
		let _ = self
			.event_bus
			.publish(DeployerEvent::Auxiliary(AuxiliaryEvent::PresaleDeployed {
				session_id: session_id.to_string(),
				address: presale.to_string(),
			}));

		Ok(AuxiliaryContract {
			kind: AuxiliaryKind::Presale,
			address: presale,
		})
	}

	/// Batch validation, all before the first network call.
	fn validate_vesting(inputs: &[VestingInput]) -> Result<Vec<Address>, AuxiliaryError> {
		let total: u32 = inputs.iter().map(|i| u32::from(i.percentage)).sum();
		if total > 100 {
			return Err(AuxiliaryError::VestingSumExceeded(total));
		}

		let mut beneficiaries = Vec::with_capacity(inputs.len());
		for input in inputs {
			if input.percentage == 0 {
				return Err(AuxiliaryError::InvalidSchedule {
					beneficiary: input.beneficiary.clone(),
					reason: "percentage must be greater than zero".to_string(),
				});
			}
			if input.duration_seconds == 0 {
				return Err(AuxiliaryError::InvalidSchedule {
					beneficiary: input.beneficiary.clone(),
					reason: "duration must be greater than zero".to_string(),
				});
			}
			let address =
				parse_address(&input.beneficiary).map_err(|_| AuxiliaryError::InvalidSchedule {
					beneficiary: input.beneficiary.clone(),
					reason: "not a valid address".to_string(),
				})?;
			beneficiaries.push(address);
		}
		Ok(beneficiaries)
	}

	fn validate_presale(config: &PresaleConfig) -> Result<(), AuxiliaryError> {
		if config.soft_cap.is_zero() || config.soft_cap >= config.hard_cap {
			return Err(AuxiliaryError::InvalidPresale(
				"soft cap must be nonzero and below the hard cap".to_string(),
			));
		}
		if config.min_purchase.is_zero() || config.min_purchase >= config.max_purchase {
			return Err(AuxiliaryError::InvalidPresale(
				"min purchase must be nonzero and below max purchase".to_string(),
			));
		}
		if config.start_time >= config.end_time {
			return Err(AuxiliaryError::InvalidPresale(
				"sale must end after it starts".to_string(),
			));
		}
		if config.start_time <= current_timestamp() {
			return Err(AuxiliaryError::InvalidPresale(
				"sale must start in the future".to_string(),
			));
		}
		if config.allocation_percentage == 0 || config.allocation_percentage > 100 {
			return Err(AuxiliaryError::InvalidPresale(
				"allocation percentage must be between 1 and 100".to_string(),
			));
		}
		if config.rate.is_zero() {
			return Err(AuxiliaryError::InvalidPresale(
				"rate must be greater than zero".to_string(),
			));
		}
		Ok(())
	}

	/// Returns the shared vesting contract for a token, deploying it on
	/// first use.
	async fn vesting_contract_for(
		&self,
		chain_id: u64,
		token: &Address,
		owner: &Address,
	) -> Result<Address, AuxiliaryError> {
		let key = token.to_string();
		match self
			.storage
			.retrieve::<Address>(VESTING_CONTRACTS_NAMESPACE, &key)
			.await
		{
			Ok(address) => return Ok(address),
			Err(StorageError::NotFound(_)) => {},
			Err(e) => return Err(e.into()),
		}

		let args = DynSolValue::Tuple(vec![
			DynSolValue::Address(token.to_alloy()),
			DynSolValue::Address(owner.to_alloy()),
		]);
		let vesting = self
			.deploy_contract(chain_id, AuxiliaryKind::Vesting, &args.abi_encode_params())
			.await?;
		self.storage
			.store(VESTING_CONTRACTS_NAMESPACE, &key, &vesting)
			.await?;
		Ok(vesting)
	}

	async fn deploy_contract(
		&self,
		chain_id: u64,
		kind: AuxiliaryKind,
		encoded_args: &[u8],
	) -> Result<Address, AuxiliaryError> {
		let artifact = TemplateStore::for_auxiliary(kind)?;
		let mut data = artifact.bytecode.clone();
		data.extend_from_slice(encoded_args);

		let receipt = self
			.send_and_confirm(Transaction::contract_creation(data, chain_id))
			.await?;
		receipt
			.contract_address
			.ok_or(AuxiliaryError::NoContractAddress)
	}

	async fn register_schedule(
		&self,
		chain_id: u64,
		vesting: &Address,
		beneficiary: &Address,
		amount: U256,
		input: &VestingInput,
	) -> Result<VestingSchedule, AuxiliaryError> {
		let data = createScheduleCall {
			beneficiary: beneficiary.to_alloy(),
			amount,
			start: input.start_time,
			duration: input.duration_seconds,
		}
		.abi_encode();
		self.send_and_confirm(Transaction::call(vesting.clone(), data, chain_id))
			.await?;

		Ok(VestingSchedule {
			category: input.category.clone(),
			beneficiary: beneficiary.clone(),
			total_amount: amount,
			start_time: input.start_time,
			duration_seconds: input.duration_seconds,
			released_amount: U256::ZERO,
			revoked: false,
		})
	}

	async fn send_and_confirm(
		&self,
		tx: Transaction,
	) -> Result<deployer_types::TransactionReceipt, AuxiliaryError> {
		let chain_id = tx.chain_id;
		let hash = self.delivery.deliver(tx).await?;
		Ok(self.delivery.confirm(&hash, chain_id).await?)
	}

	fn publish_skipped(&self, session_id: &str, input: &VestingInput, reason: &str) {
		let _ = self
			.event_bus
			.publish(DeployerEvent::Auxiliary(AuxiliaryEvent::VestingSkipped {
				session_id: session_id.to_string(),
				beneficiary: input.beneficiary.clone(),
				reason: reason.to_string(),
			}));
	}
}

fn schedule_key(token: &Address, beneficiary: &Address) -> String {
	format!("{}-{}", hex::encode(&token.0), hex::encode(&beneficiary.0))
}
