//! Deployment orchestration engine.
//!
//! Drives one deployment end to end: validate and build constructor
//! arguments, resolve the bundled template, submit the creation
//! transaction, wait for confirmations, verify sources best-effort, attach
//! auxiliary contracts, and persist the append-only deployment record.
//! Exactly one deployment runs at a time per engine; a second call while
//! one is in flight fails fast with `Busy`.

pub mod event_bus;

use crate::args::{ConstructorArgBuilder, ConstructorArgs};
use crate::auxiliary::AuxiliaryContractBinder;
use crate::state::SessionStateMachine;
use crate::verify::{VerificationRequest, VerifierInterface};
use crate::DeployError;
use deployer_account::AccountService;
use deployer_config::DeployerSettings;
use deployer_delivery::DeliveryService;
use deployer_storage::{DeploymentStore, StorageService};
use deployer_templates::{
	TemplateArtifact, TemplateStore, COMPILER_VERSION, OPTIMIZER_ENABLED, OPTIMIZER_RUNS,
};
use deployer_types::{
	current_timestamp, select_variant, Address, AuxiliaryContract, DeployerEvent, DeploymentEvent,
	DeploymentRecord, DeploymentState, FeatureSet, ManualDeployment, NetworksConfig,
	PresaleConfig, TokenParameters, Transaction, TransactionReceipt, VestingInput,
};
use event_bus::EventBus;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tracing::{info, instrument, warn};

/// Everything the engine needs to deploy one token.
#[derive(Debug, Clone)]
pub struct DeploymentRequest {
	pub chain_id: u64,
	pub params: TokenParameters,
	pub features: FeatureSet,
	/// Vesting schedules to register after deployment.
	pub vesting: Vec<VestingInput>,
	/// Presale to deploy after deployment.
	pub presale: Option<PresaleConfig>,
}

/// Cooperative cancellation for an in-flight deployment.
///
/// Cancellation is only honored before the creation transaction is
/// submitted; once on-chain, the deployment runs to completion.
#[derive(Debug, Clone, Default)]
pub struct CancelHandle(Arc<AtomicBool>);

impl CancelHandle {
	pub fn new() -> Self {
		Self::default()
	}

	/// Requests cancellation. Idempotent.
	pub fn cancel(&self) {
		self.0.store(true, Ordering::SeqCst);
	}

	pub fn is_cancelled(&self) -> bool {
		self.0.load(Ordering::SeqCst)
	}
}

/// The deployment orchestrator.
pub struct DeployerEngine {
	settings: DeployerSettings,
	networks: NetworksConfig,
	account: Arc<AccountService>,
	delivery: Arc<DeliveryService>,
	store: Arc<DeploymentStore>,
	sessions: SessionStateMachine,
	binder: AuxiliaryContractBinder,
	verifier: Arc<dyn VerifierInterface>,
	event_bus: EventBus,
	/// One permit: a single in-flight deployment per engine.
	deploy_permit: Semaphore,
}

impl DeployerEngine {
	pub fn new(
		settings: DeployerSettings,
		networks: NetworksConfig,
		account: Arc<AccountService>,
		delivery: Arc<DeliveryService>,
		storage: Arc<StorageService>,
		verifier: Arc<dyn VerifierInterface>,
		event_bus: EventBus,
	) -> Self {
		let store = Arc::new(DeploymentStore::new(storage.clone()));
		Self {
			settings,
			networks,
			account: account.clone(),
			delivery: delivery.clone(),
			store: store.clone(),
			sessions: SessionStateMachine::new(store, event_bus.clone()),
			binder: AuxiliaryContractBinder::new(delivery, storage, event_bus.clone()),
			verifier,
			event_bus,
			deploy_permit: Semaphore::new(1),
		}
	}

	/// Subscribes to deployment progress events.
	pub fn subscribe(&self) -> tokio::sync::broadcast::Receiver<DeployerEvent> {
		self.event_bus.subscribe()
	}

	/// Read access to the append-only deployment history.
	pub fn deployments(&self) -> &DeploymentStore {
		&self.store
	}

	/// Runs one deployment end to end.
	///
	/// Fails fast with [`DeployError::Busy`] if another deployment is in
	/// flight. On failure the session lands in `Failed`, and when the
	/// failure kind warrants it, manual-deployment instructions are
	/// published and the session moves on to `FallbackOffered`.
	#[instrument(skip_all, fields(chain_id = request.chain_id, symbol = %request.params.symbol))]
	pub async fn deploy(
		&self,
		request: DeploymentRequest,
		cancel: CancelHandle,
	) -> Result<DeploymentRecord, DeployError> {
		let _permit = self
			.deploy_permit
			.try_acquire()
			.map_err(|_| DeployError::Busy)?;

		let session = self.sessions.create_session(request.chain_id).await?;
		info!(session_id = %session.id, chain_id = request.chain_id, "Deployment started");

		let mut manual = None;
		match self.run(&session.id, &request, &cancel, &mut manual).await {
			Ok(record) => {
				self.sessions
					.transition(&session.id, DeploymentState::Complete)
					.await?;
				let _ = self
					.event_bus
					.publish(DeployerEvent::Deployment(DeploymentEvent::Completed {
						session_id: session.id.clone(),
						record: record.clone(),
					}));
				info!(session_id = %session.id, contract = %record.contract_address, "Deployment complete");
				Ok(record)
			},
			Err(e) => {
				let kind = e.failure_kind();
				warn!(session_id = %session.id, error = %e, ?kind, "Deployment failed");
				let _ = self
					.sessions
					.transition(
						&session.id,
						DeploymentState::Failed {
							reason: e.to_string(),
						},
					)
					.await;
				let _ = self
					.event_bus
					.publish(DeployerEvent::Deployment(DeploymentEvent::Failed {
						session_id: session.id.clone(),
						kind,
						reason: e.to_string(),
					}));

				if kind.offers_fallback() {
					if let Some(instructions) = manual {
						let _ = self
							.sessions
							.transition(&session.id, DeploymentState::FallbackOffered)
							.await;
						let _ = self.event_bus.publish(DeployerEvent::Deployment(
							DeploymentEvent::FallbackOffered {
								session_id: session.id.clone(),
								instructions,
							},
						));
					}
				}
				Err(e)
			},
		}
	}

	async fn run(
		&self,
		session_id: &str,
		request: &DeploymentRequest,
		cancel: &CancelHandle,
		manual: &mut Option<ManualDeployment>,
	) -> Result<DeploymentRecord, DeployError> {
		if cancel.is_cancelled() {
			return Err(DeployError::Cancelled);
		}

		// Validation, all before any network traffic.
		let variant = select_variant(&request.features);
		let args = ConstructorArgBuilder::build(variant, &request.params, &request.features)?;
		self.sessions
			.update_session_with(session_id, |s| s.variant = variant)
			.await?;

		self.sessions
			.transition(session_id, DeploymentState::Compiling)
			.await?;
		let artifact = TemplateStore::for_variant(variant)?;

		// From here on a failure can be retried by hand, so keep the
		// artifacts a manual deployment would need.
		*manual = Some(ManualDeployment {
			template_name: artifact.name.clone(),
			bytecode: artifact.bytecode_hex(),
			encoded_args: args.encoded_hex(),
		});

		if cancel.is_cancelled() {
			return Err(DeployError::Cancelled);
		}

		let sender = self
			.account
			.address()
			.await
			.map_err(|e| DeployError::Wallet(e.to_string()))?;

		self.sessions
			.transition(session_id, DeploymentState::Deploying)
			.await?;
		let mut init_code = artifact.bytecode.clone();
		init_code.extend_from_slice(&args.encode());
		let tx = Transaction::contract_creation(init_code, request.chain_id);

		// Catch unaffordable deployments locally instead of submitting a
		// doomed transaction.
		self.delivery.preflight_funds_check(&sender, &tx).await?;

		if cancel.is_cancelled() {
			return Err(DeployError::Cancelled);
		}

		let tx_hash = self.delivery.deliver(tx).await?;
		self.sessions
			.update_session_with(session_id, |s| s.tx_hash = Some(tx_hash.clone()))
			.await?;
		let _ = self.event_bus.publish(DeployerEvent::Deployment(
			DeploymentEvent::TransactionPending {
				session_id: session_id.to_string(),
				tx_hash: tx_hash.clone(),
				chain_id: request.chain_id,
			},
		));

		// Submitted: no longer cancellable.
		self.sessions
			.transition(session_id, DeploymentState::AwaitingConfirmation)
			.await?;
		let receipt = self.delivery.confirm(&tx_hash, request.chain_id).await?;
		let contract_address = receipt.contract_address.clone().ok_or_else(|| {
			DeployError::Network("creation receipt carried no contract address".to_string())
		})?;

		let verified = self
			.verify_sources(session_id, request, artifact, &args, &contract_address)
			.await?;

		let auxiliary_contracts = self
			.attach_auxiliary(session_id, request, &contract_address, &sender, &args)
			.await?;

		let record = Self::build_record(
			request,
			variant,
			&receipt,
			contract_address,
			verified,
			auxiliary_contracts,
		);
		self.store.append(&record).await?;
		Ok(record)
	}

	/// Best-effort source verification. Any failure downgrades the record
	/// to `verified: false`; it never fails the deployment.
	async fn verify_sources(
		&self,
		session_id: &str,
		request: &DeploymentRequest,
		artifact: &TemplateArtifact,
		args: &ConstructorArgs,
		contract_address: &Address,
	) -> Result<bool, DeployError> {
		let network = self.networks.get(&request.chain_id);
		let verifiable = self.settings.verify_contracts
			&& network.is_some_and(|n| n.explorer_api_url.is_some());
		if !verifiable {
			return Ok(false);
		}
		// Safe: verifiable implies the network exists.
		let network = network.ok_or_else(|| {
			DeployError::Network(format!("no network configured for chain {}", request.chain_id))
		})?;

		self.sessions
			.transition(session_id, DeploymentState::Verifying)
			.await?;

		let verification = VerificationRequest {
			chain_id: request.chain_id,
			contract_address: contract_address.to_string(),
			contract_name: artifact.contract_name.clone(),
			source: artifact.source.clone(),
			compiler_version: COMPILER_VERSION.to_string(),
			optimizer_enabled: OPTIMIZER_ENABLED,
			optimizer_runs: OPTIMIZER_RUNS,
			constructor_args: hex::encode(args.encode()),
		};
		match self.verifier.verify(network, &verification).await {
			Ok(()) => Ok(true),
			Err(e) => {
				warn!(session_id, error = %e, "Source verification skipped");
				let _ = self.event_bus.publish(DeployerEvent::Deployment(
					DeploymentEvent::VerificationSkipped {
						session_id: session_id.to_string(),
						reason: e.to_string(),
					},
				));
				Ok(false)
			},
		}
	}

	/// Attaches requested auxiliary contracts. The token is already
	/// on-chain, so failures here degrade to a partial success reported
	/// through `AttachFailed` rather than failing the deployment.
	async fn attach_auxiliary(
		&self,
		session_id: &str,
		request: &DeploymentRequest,
		token: &Address,
		sender: &Address,
		args: &ConstructorArgs,
	) -> Result<Vec<AuxiliaryContract>, DeployError> {
		if request.vesting.is_empty() && request.presale.is_none() {
			return Ok(Vec::new());
		}

		self.sessions
			.transition(session_id, DeploymentState::AttachingAuxiliary)
			.await?;

		let mut contracts = Vec::new();
		if !request.vesting.is_empty() {
			match self
				.binder
				.attach_vesting(
					session_id,
					request.chain_id,
					token,
					sender,
					args.initial_supply_scaled,
					&request.vesting,
				)
				.await
			{
				Ok(outcome) => {
					if outcome.is_partial() {
						self.publish_attach_failed(
							session_id,
							"some vesting schedules were not registered; re-run to retry",
						);
					}
					contracts.push(outcome.contract);
				},
				Err(e) => self.publish_attach_failed(session_id, &e.to_string()),
			}
		}

		if let Some(presale) = &request.presale {
			match self
				.binder
				.attach_presale(
					session_id,
					request.chain_id,
					token,
					sender,
					args.initial_supply_scaled,
					presale,
				)
				.await
			{
				Ok(contract) => contracts.push(contract),
				Err(e) => self.publish_attach_failed(session_id, &e.to_string()),
			}
		}

		Ok(contracts)
	}

	fn publish_attach_failed(&self, session_id: &str, reason: &str) {
		warn!(session_id, reason, "Auxiliary attachment incomplete");
		let _ = self.event_bus.publish(DeployerEvent::Auxiliary(
			deployer_types::AuxiliaryEvent::AttachFailed {
				session_id: session_id.to_string(),
				reason: reason.to_string(),
			},
		));
	}

	fn build_record(
		request: &DeploymentRequest,
		variant: deployer_types::ContractVariant,
		receipt: &TransactionReceipt,
		contract_address: Address,
		verified: bool,
		auxiliary_contracts: Vec<AuxiliaryContract>,
	) -> DeploymentRecord {
		DeploymentRecord {
			contract_address,
			transaction_hash: receipt.hash.clone(),
			variant,
			features: request.features.clone(),
			chain_id: request.chain_id,
			gas_used: receipt.gas_used,
			deployment_cost: receipt.cost_wei().to_string(),
			verified,
			auxiliary_contracts,
			deployed_at: current_timestamp(),
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::verify::{MockVerifierInterface, VerifyError};
	use deployer_account::LocalWallet;
	use deployer_delivery::MockDeliveryInterface;
	use deployer_storage::implementations::memory::MemoryStorage;
	use deployer_types::{
		parse_address, FailureKind, NetworkConfig, RpcEndpoint, TransactionHash,
	};
	use std::collections::HashMap;

	const CHAIN_ID: u64 = 31337;
	const DEPLOYED: &str = "0x5fbdb2315678afecb367f032d93f642f64180aa3";
	const ANVIL_KEY: &str = "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";

	fn networks(with_explorer: bool) -> NetworksConfig {
		let mut networks = HashMap::new();
		networks.insert(
			CHAIN_ID,
			NetworkConfig {
				rpc_urls: vec![RpcEndpoint::http_only("http://localhost:8545".to_string())],
				explorer_url: None,
				explorer_api_url: with_explorer
					.then(|| "http://localhost:4000/api".to_string()),
				explorer_api_key: None,
				native_symbol: "ETH".to_string(),
			},
		);
		networks
	}

	fn receipt(contract: Option<&str>) -> TransactionReceipt {
		TransactionReceipt {
			hash: TransactionHash(vec![0x11; 32]),
			block_number: 10,
			success: true,
			contract_address: contract.map(|c| parse_address(c).unwrap()),
			gas_used: 1_200_000,
			effective_gas_price: 2_000_000_000,
			logs: vec![],
		}
	}

	fn happy_delivery() -> Arc<DeliveryService> {
		let mut mock = MockDeliveryInterface::new();
		mock.expect_submit()
			.returning(|_| Ok(TransactionHash(vec![0x11; 32])));
		mock.expect_wait_for_confirmation()
			.returning(|_, _, _| Ok(receipt(Some(DEPLOYED))));
		mock.expect_estimate_gas().returning(|_| Ok(1_500_000));
		mock.expect_get_gas_price().returning(|_| Ok(2_000_000_000));
		mock.expect_get_balance()
			.returning(|_, _| Ok(alloy_primitives::U256::from(10u64).pow(alloy_primitives::U256::from(19u64))));
		let mut implementations: HashMap<u64, Arc<dyn deployer_delivery::DeliveryInterface>> =
			HashMap::new();
		implementations.insert(CHAIN_ID, Arc::new(mock));
		Arc::new(DeliveryService::new(implementations, 1))
	}

	fn engine(
		delivery: Arc<DeliveryService>,
		verifier: MockVerifierInterface,
		with_explorer: bool,
	) -> DeployerEngine {
		let storage = Arc::new(StorageService::new(Box::new(MemoryStorage::new())));
		let account = Arc::new(AccountService::new(Box::new(
			LocalWallet::new(ANVIL_KEY).unwrap(),
		)));
		DeployerEngine::new(
			DeployerSettings::default(),
			networks(with_explorer),
			account,
			delivery,
			storage,
			Arc::new(verifier),
			EventBus::new(64),
		)
	}

	fn request() -> DeploymentRequest {
		DeploymentRequest {
			chain_id: CHAIN_ID,
			params: TokenParameters {
				name: "Test Token".to_string(),
				symbol: "TST".to_string(),
				decimals: 18,
				initial_supply: "1000000".to_string(),
				max_supply: "0".to_string(),
				owner: "0xf39fd6e51aad88f6f4ce6ab8827279cfffb92266".to_string(),
			},
			features: FeatureSet::default(),
			vesting: vec![],
			presale: None,
		}
	}

	#[tokio::test]
	async fn test_successful_deployment_persists_record() {
		let mut verifier = MockVerifierInterface::new();
		verifier.expect_verify().returning(|_, _| Ok(()));
		let engine = engine(happy_delivery(), verifier, true);

		let record = engine.deploy(request(), CancelHandle::new()).await.unwrap();
		assert_eq!(record.contract_address, parse_address(DEPLOYED).unwrap());
		assert!(record.verified);
		assert_eq!(record.gas_used, 1_200_000);
		assert_eq!(record.deployment_cost, "2400000000000000");

		let stored = engine.deployments().get(&record.contract_address).await.unwrap();
		assert_eq!(stored, record);
	}

	#[tokio::test]
	async fn test_verification_failure_is_not_fatal() {
		let mut verifier = MockVerifierInterface::new();
		verifier
			.expect_verify()
			.returning(|_, _| Err(VerifyError::Rejected("bytecode mismatch".to_string())));
		let engine = engine(happy_delivery(), verifier, true);
		let mut events = engine.subscribe();

		let record = engine.deploy(request(), CancelHandle::new()).await.unwrap();
		assert!(!record.verified);

		// A VerificationSkipped event must have been published.
		let mut saw_skip = false;
		while let Ok(event) = events.try_recv() {
			if matches!(
				event,
				DeployerEvent::Deployment(DeploymentEvent::VerificationSkipped { .. })
			) {
				saw_skip = true;
			}
		}
		assert!(saw_skip);
	}

	#[tokio::test]
	async fn test_no_explorer_means_unverified() {
		let mut verifier = MockVerifierInterface::new();
		verifier.expect_verify().never();
		let engine = engine(happy_delivery(), verifier, false);

		let record = engine.deploy(request(), CancelHandle::new()).await.unwrap();
		assert!(!record.verified);
	}

	#[tokio::test]
	async fn test_validation_failure_offers_no_fallback() {
		let verifier = MockVerifierInterface::new();
		let engine = engine(happy_delivery(), verifier, false);
		let mut events = engine.subscribe();

		let mut request = request();
		request.params.decimals = 19;
		let err = engine
			.deploy(request, CancelHandle::new())
			.await
			.unwrap_err();
		assert_eq!(err.failure_kind(), FailureKind::Validation);

		let mut saw_fallback = false;
		while let Ok(event) = events.try_recv() {
			if matches!(
				event,
				DeployerEvent::Deployment(DeploymentEvent::FallbackOffered { .. })
			) {
				saw_fallback = true;
			}
		}
		assert!(!saw_fallback);
	}

	#[tokio::test]
	async fn test_network_failure_offers_fallback_with_artifacts() {
		let mut mock = MockDeliveryInterface::new();
		mock.expect_estimate_gas().returning(|_| Ok(1_500_000));
		mock.expect_get_gas_price().returning(|_| Ok(2_000_000_000));
		mock.expect_get_balance().returning(|_, _| {
			Ok(alloy_primitives::U256::from(10u64).pow(alloy_primitives::U256::from(19u64)))
		});
		mock.expect_submit().returning(|_| {
			Err(deployer_delivery::DeliveryError::Network(
				"connection refused".to_string(),
			))
		});
		let mut implementations: HashMap<u64, Arc<dyn deployer_delivery::DeliveryInterface>> =
			HashMap::new();
		implementations.insert(CHAIN_ID, Arc::new(mock));
		let delivery = Arc::new(DeliveryService::new(implementations, 1));

		let verifier = MockVerifierInterface::new();
		let engine = engine(delivery, verifier, false);
		let mut events = engine.subscribe();

		let err = engine
			.deploy(request(), CancelHandle::new())
			.await
			.unwrap_err();
		assert_eq!(err.failure_kind(), FailureKind::Network);

		let mut instructions = None;
		while let Ok(event) = events.try_recv() {
			if let DeployerEvent::Deployment(DeploymentEvent::FallbackOffered {
				instructions: i,
				..
			}) = event
			{
				instructions = Some(i);
			}
		}
		let instructions = instructions.expect("fallback should be offered");
		assert_eq!(instructions.template_name, "token_basic");
		assert!(instructions.bytecode.starts_with("0x"));
		assert!(instructions.encoded_args.starts_with("0x"));
	}

	#[tokio::test]
	async fn test_cancel_before_submission() {
		let verifier = MockVerifierInterface::new();
		let engine = engine(happy_delivery(), verifier, false);

		let cancel = CancelHandle::new();
		cancel.cancel();
		let err = engine.deploy(request(), cancel).await.unwrap_err();
		assert!(matches!(err, DeployError::Cancelled));
	}

	#[tokio::test]
	async fn test_auxiliary_failure_is_partial_success() {
		// Creation succeeds; every follow-up call (approve) fails.
		let mut mock = MockDeliveryInterface::new();
		mock.expect_estimate_gas().returning(|_| Ok(1_500_000));
		mock.expect_get_gas_price().returning(|_| Ok(2_000_000_000));
		mock.expect_get_balance().returning(|_, _| {
			Ok(alloy_primitives::U256::from(10u64).pow(alloy_primitives::U256::from(19u64)))
		});
		mock.expect_submit().returning(|tx| {
			if tx.to.is_none() {
				Ok(TransactionHash(vec![0x11; 32]))
			} else {
				Err(deployer_delivery::DeliveryError::Network(
					"connection refused".to_string(),
				))
			}
		});
		mock.expect_wait_for_confirmation()
			.returning(|_, _, _| Ok(receipt(Some(DEPLOYED))));
		let mut implementations: HashMap<u64, Arc<dyn deployer_delivery::DeliveryInterface>> =
			HashMap::new();
		implementations.insert(CHAIN_ID, Arc::new(mock));
		let delivery = Arc::new(DeliveryService::new(implementations, 1));

		let verifier = MockVerifierInterface::new();
		let engine = engine(delivery, verifier, false);

		let mut request = request();
		request.vesting = vec![VestingInput {
			category: "team".to_string(),
			beneficiary: "0xaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa".to_string(),
			percentage: 10,
			start_time: 2_000_000_000,
			duration_seconds: 86_400,
		}];

		// The token deployment still succeeds as a partial success.
		let record = engine.deploy(request, CancelHandle::new()).await.unwrap();
		assert_eq!(record.contract_address, parse_address(DEPLOYED).unwrap());
		assert!(record.auxiliary_contracts.is_empty());
	}

	#[tokio::test]
	async fn test_fee_variant_deploys_with_suffix_args() {
		let mut verifier = MockVerifierInterface::new();
		verifier.expect_verify().returning(|_, _| Ok(()));
		let engine = engine(happy_delivery(), verifier, true);

		let mut request = request();
		request.features.transfer_fee = Some(deployer_types::TransferFee {
			bps: 250,
			recipient: "0xaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa".to_string(),
		});
		let record = engine.deploy(request, CancelHandle::new()).await.unwrap();
		assert_eq!(record.variant, deployer_types::ContractVariant::Fee);
		assert_eq!(
			record.features.transfer_fee.as_ref().map(|f| f.bps),
			Some(250)
		);
	}
}
