//! In-memory collaborators shared by the integration tests.
//!
//! The factory keeps every unit it creates, keyed by address, so a second
//! run that attaches to a recorded address sees the same on-chain state as
//! the first run left behind.

#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use keystone_core::chain::{
    ChainClient, CollateralParameters, Constructed, Factory, OracleRecord, OracleRegistration,
    Registry, UnitHandle, VerificationRequest,
};
use keystone_core::config::{
    FinalizeConfig, OracleSettings, ResourceItem, RiskParameters, TargetConfig,
};
use keystone_core::error::{RemoteError, RemoteResult};
use keystone_core::orchestration::{Orchestrator, RunState};
use keystone_core::target::DeploymentTarget;
use keystone_core::types::{
    Address, Amount, B256, BlockInfo, BlockTag, Bytes, FeeEstimate, FeeOverrides, Receipt, TxHash,
    TxRequest,
};
use keystone_core::units::{DebtTokenMinters, UnitSpec};

pub const DEPLOYER: &str = "0x70997970c51812dc3a010c7d01b50e0d17dc79c8";
pub const ADMIN: &str = "0x3c44cdddb6a900fa2b585dd299e03d12fa4293bc";
pub const TREASURY: &str = "0x90f79bf6eb2c4f870365e785982e1f101e93b906";
pub const WBTC: &str = "0x321f90864fb21cdcddd0d67fe5e4cbc812ec9e64";
pub const WBTC_ORACLE: &str = "0x717431e3e7951196bce7b5b0d0593dad1b6d5e2d";
pub const BLOCK_TIMESTAMP: u64 = 1_700_000_000;
pub const GAS_PRICE: u128 = 10_000_000_000;
pub const COST_PER_TX: u128 = 1_000_000_000_000_000;

pub fn addr(hex: &str) -> Address {
    hex.parse().unwrap()
}

static TX_COUNTER: AtomicU64 = AtomicU64::new(1);

/// A transaction hash no other mock call has handed out.
pub fn next_tx() -> TxHash {
    let n = TX_COUNTER.fetch_add(1, Ordering::SeqCst);
    TxHash::left_padding_from(&n.to_be_bytes())
}

pub fn ether(n: u128) -> Amount {
    Amount::from_wei(n * 1_000_000_000_000_000_000)
}

pub fn fees() -> FeeOverrides {
    FeeOverrides {
        max_fee_per_gas: Amount::from_wei(20_000_000_000),
        max_priority_fee_per_gas: Amount::from_wei(1_000_000_000),
        gas_limit: None,
    }
}

/// Ordered record of every remote call, e.g. `construct:ActivePool` or
/// `PriceFeed.setOracle`.
#[derive(Debug, Default)]
pub struct CallLog {
    calls: Mutex<Vec<String>>,
}

impl CallLog {
    pub fn push(&self, call: impl Into<String>) {
        self.calls.lock().unwrap().push(call.into());
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn count(&self, call: &str) -> usize {
        self.calls.lock().unwrap().iter().filter(|c| *c == call).count()
    }

    pub fn count_prefix(&self, prefix: &str) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|c| c.starts_with(prefix))
            .count()
    }

    pub fn clear(&self) {
        self.calls.lock().unwrap().clear();
    }
}

// =============================================================================
// Chain
// =============================================================================

pub struct MockChain {
    log: Arc<CallLog>,
    balance: Mutex<u128>,
    pub fail_balance: Mutex<bool>,
    pub fail_storage: Mutex<bool>,
    /// Upcoming `wait` calls that time out
    pub failing_waits: Mutex<u32>,
}

impl MockChain {
    pub fn new(log: Arc<CallLog>) -> Self {
        Self {
            log,
            balance: Mutex::new(100 * 1_000_000_000_000_000_000),
            fail_balance: Mutex::new(false),
            fail_storage: Mutex::new(false),
            failing_waits: Mutex::new(0),
        }
    }
}

/// The implementation slot of a mock proxy points at a derived address.
pub fn implementation_of(proxy: &Address) -> Address {
    let mut bytes = proxy.0.0;
    bytes[0] = 0x10;
    Address::from(bytes)
}

#[async_trait]
impl ChainClient for MockChain {
    async fn balance(&self, _address: &Address) -> RemoteResult<Amount> {
        if *self.fail_balance.lock().unwrap() {
            return Err(RemoteError::Rpc("balance unavailable".to_string()));
        }
        Ok(Amount::from_wei(*self.balance.lock().unwrap()))
    }

    async fn fee_estimate(&self) -> RemoteResult<FeeEstimate> {
        self.log.push("chain.feeEstimate");
        Ok(FeeEstimate {
            base_fee: Amount::from_wei(GAS_PRICE),
            priority_fee: Amount::from_wei(1_000_000_000),
        })
    }

    async fn submit(&self, _tx: &TxRequest) -> RemoteResult<TxHash> {
        Ok(next_tx())
    }

    async fn wait(&self, tx: &TxHash, _confirmations: u64) -> RemoteResult<Receipt> {
        {
            let mut failing = self.failing_waits.lock().unwrap();
            if *failing > 0 {
                *failing -= 1;
                return Err(RemoteError::Timeout(format!("{tx} not confirmed")));
            }
        }
        let mut balance = self.balance.lock().unwrap();
        *balance = balance.saturating_sub(COST_PER_TX);
        Ok(Receipt {
            tx_hash: *tx,
            block_number: 100,
            effective_gas_price: Some(Amount::from_wei(GAS_PRICE)),
            contract_address: None,
        })
    }

    async fn block(&self, _tag: BlockTag) -> RemoteResult<BlockInfo> {
        Ok(BlockInfo {
            number: 100,
            timestamp: BLOCK_TIMESTAMP,
        })
    }

    async fn storage_at(&self, address: &Address, _slot: B256) -> RemoteResult<B256> {
        if *self.fail_storage.lock().unwrap() {
            return Err(RemoteError::Rpc("storage unavailable".to_string()));
        }
        Ok(implementation_of(address).into_word())
    }
}

// =============================================================================
// Units
// =============================================================================

#[derive(Debug, Default)]
pub struct UnitData {
    pub address_setup: bool,
    pub addresses: Vec<Address>,
    pub owner: Option<Address>,
    pub setup_initialized: bool,
    pub minters: Option<DebtTokenMinters>,
    pub whitelist: Vec<Address>,
    pub softening: Option<(Address, Bytes, FeeOverrides)>,
    pub oracles: HashMap<Address, OracleRecord>,
    pub collaterals: HashMap<Address, (Amount, u8)>,
    pub active: HashSet<Address>,
    pub parameters: Vec<CollateralParameters>,
    pub redemption_timestamps: HashMap<Address, u64>,
    /// Operations that revert
    pub failing: HashSet<&'static str>,
}

pub struct MockUnit {
    name: String,
    address: Address,
    log: Arc<CallLog>,
    pub data: Mutex<UnitData>,
}

impl MockUnit {
    pub fn new(name: &str, address: Address, log: Arc<CallLog>) -> Self {
        Self {
            name: name.to_string(),
            address,
            log,
            data: Mutex::new(UnitData {
                owner: Some(addr(DEPLOYER)),
                ..Default::default()
            }),
        }
    }

    pub fn fail_on(&self, operation: &'static str) {
        self.data.lock().unwrap().failing.insert(operation);
    }

    pub fn heal(&self, operation: &'static str) {
        self.data.lock().unwrap().failing.remove(operation);
    }

    fn call(&self, operation: &'static str) -> RemoteResult<()> {
        self.log.push(format!("{}.{}", self.name, operation));
        if self.data.lock().unwrap().failing.contains(operation) {
            return Err(RemoteError::Reverted(format!("{}.{operation}", self.name)));
        }
        Ok(())
    }

    fn tx(&self) -> TxHash {
        next_tx()
    }
}

#[async_trait]
impl UnitHandle for MockUnit {
    fn name(&self) -> &str {
        &self.name
    }

    fn address(&self) -> &Address {
        &self.address
    }

    async fn is_address_setup_initialized(&self) -> RemoteResult<bool> {
        self.call("isAddressSetupInitialized")?;
        Ok(self.data.lock().unwrap().address_setup)
    }

    async fn set_addresses(&self, addresses: &[Address], _fees: &FeeOverrides) -> RemoteResult<TxHash> {
        self.call("setAddresses")?;
        let mut data = self.data.lock().unwrap();
        data.address_setup = true;
        data.addresses = addresses.to_vec();
        Ok(self.tx())
    }

    async fn owner(&self) -> RemoteResult<Address> {
        self.call("owner")?;
        Ok(self.data.lock().unwrap().owner.unwrap_or(Address::ZERO))
    }

    async fn transfer_ownership(&self, to: &Address, _fees: &FeeOverrides) -> RemoteResult<TxHash> {
        self.call("transferOwnership")?;
        self.data.lock().unwrap().owner = Some(*to);
        Ok(self.tx())
    }

    async fn is_setup_initialized(&self) -> RemoteResult<bool> {
        self.call("isSetupInitialized")?;
        Ok(self.data.lock().unwrap().setup_initialized)
    }

    async fn set_setup_is_initialized(&self, _fees: &FeeOverrides) -> RemoteResult<TxHash> {
        self.call("setSetupIsInitialized")?;
        self.data.lock().unwrap().setup_initialized = true;
        Ok(self.tx())
    }

    async fn set_minters(&self, minters: &DebtTokenMinters, _fees: &FeeOverrides) -> RemoteResult<TxHash> {
        self.call("setMinters")?;
        self.data.lock().unwrap().minters = Some(minters.clone());
        Ok(self.tx())
    }

    async fn add_whitelist(&self, account: &Address, _fees: &FeeOverrides) -> RemoteResult<TxHash> {
        self.call("addWhitelist")?;
        let mut data = self.data.lock().unwrap();
        if !data.whitelist.contains(account) {
            data.whitelist.push(*account);
        }
        Ok(self.tx())
    }

    async fn set_softening(
        &self,
        target: &Address,
        _signature: &str,
        data: &Bytes,
        fees: &FeeOverrides,
    ) -> RemoteResult<TxHash> {
        self.call("setSoftening")?;
        self.data.lock().unwrap().softening = Some((*target, data.clone(), fees.clone()));
        Ok(self.tx())
    }

    async fn encode_redemption_softening(&self, param: u64) -> RemoteResult<Bytes> {
        self.call("encodeRedemptionSoftening")?;
        Ok(Bytes::copy_from_slice(&param.to_be_bytes()))
    }

    async fn oracle_record(&self, asset: &Address) -> RemoteResult<OracleRecord> {
        self.call("oracles")?;
        Ok(self
            .data
            .lock()
            .unwrap()
            .oracles
            .get(asset)
            .cloned()
            .unwrap_or(OracleRecord {
                oracle_address: Address::ZERO,
                decimals: 0,
            }))
    }

    async fn set_oracle(&self, registration: &OracleRegistration, _fees: &FeeOverrides) -> RemoteResult<TxHash> {
        self.call("setOracle")?;
        self.data.lock().unwrap().oracles.insert(
            registration.asset,
            OracleRecord {
                oracle_address: registration.oracle,
                decimals: 8,
            },
        );
        Ok(self.tx())
    }

    async fn mcr(&self, asset: &Address) -> RemoteResult<Amount> {
        self.call("getMcr")?;
        let data = self.data.lock().unwrap();
        let added = data.collaterals.contains_key(asset);
        let parameterized = data.parameters.iter().find(|p| &p.asset == asset);
        Ok(match (added, parameterized) {
            (_, Some(params)) => params.mcr,
            // A freshly added collateral carries the contract's default MCR
            (true, None) => Amount::from_wei(1_100_000_000_000_000_000),
            (false, None) => Amount::ZERO,
        })
    }

    async fn add_new_collateral(
        &self,
        asset: &Address,
        gas_compensation: Amount,
        decimals: u8,
        _fees: &FeeOverrides,
    ) -> RemoteResult<TxHash> {
        self.call("addNewCollateral")?;
        self.data
            .lock()
            .unwrap()
            .collaterals
            .insert(*asset, (gas_compensation, decimals));
        Ok(self.tx())
    }

    async fn is_active(&self, asset: &Address) -> RemoteResult<bool> {
        self.call("getIsActive")?;
        Ok(self.data.lock().unwrap().active.contains(asset))
    }

    async fn percent_divisor_default(&self) -> RemoteResult<Amount> {
        self.call("PERCENT_DIVISOR_DEFAULT")?;
        Ok(Amount::from_wei(200))
    }

    async fn redemption_fee_floor_default(&self) -> RemoteResult<Amount> {
        self.call("REDEMPTION_FEE_FLOOR_DEFAULT")?;
        Ok(Amount::from_wei(5_000_000_000_000_000))
    }

    async fn borrowing_fee_default(&self) -> RemoteResult<Amount> {
        self.call("BORROWING_FEE_DEFAULT")?;
        Ok(Amount::from_wei(5_000_000_000_000_000))
    }

    async fn set_collateral_parameters(
        &self,
        params: &CollateralParameters,
        _fees: &FeeOverrides,
    ) -> RemoteResult<TxHash> {
        self.call("setCollateralParameters")?;
        let mut data = self.data.lock().unwrap();
        data.active.insert(params.asset);
        data.parameters.push(params.clone());
        Ok(self.tx())
    }

    async fn set_redemption_block_timestamp(
        &self,
        asset: &Address,
        timestamp: u64,
        _fees: &FeeOverrides,
    ) -> RemoteResult<TxHash> {
        self.call("setRedemptionBlockTimestamp")?;
        self.data
            .lock()
            .unwrap()
            .redemption_timestamps
            .insert(*asset, timestamp);
        Ok(self.tx())
    }
}

// =============================================================================
// Factory
// =============================================================================

pub struct MockFactory {
    log: Arc<CallLog>,
    /// Remaining construction failures per artifact; `u32::MAX` never heals
    failures: Mutex<HashMap<String, u32>>,
    units: Mutex<HashMap<Address, Arc<MockUnit>>>,
    next_address: AtomicU64,
}

impl MockFactory {
    pub fn new(log: Arc<CallLog>) -> Self {
        Self {
            log,
            failures: Mutex::new(HashMap::new()),
            units: Mutex::new(HashMap::new()),
            next_address: AtomicU64::new(0x1000),
        }
    }

    pub fn fail_times(&self, artifact: &str, times: u32) {
        self.failures
            .lock()
            .unwrap()
            .insert(artifact.to_string(), times);
    }

    pub fn fail_always(&self, artifact: &str) {
        self.fail_times(artifact, u32::MAX);
    }

    pub fn heal(&self, artifact: &str) {
        self.failures.lock().unwrap().remove(artifact);
    }

    /// The live unit created or attached under `name`.
    pub fn unit(&self, name: &str) -> Arc<MockUnit> {
        self.units
            .lock()
            .unwrap()
            .values()
            .find(|u| u.name() == name)
            .cloned()
            .unwrap_or_else(|| panic!("no unit named {name}"))
    }

    /// Register a unit that already lives at `address`.
    pub fn deploy_existing(&self, name: &str, address: Address) -> Arc<MockUnit> {
        let unit = Arc::new(MockUnit::new(name, address, self.log.clone()));
        self.units.lock().unwrap().insert(address, unit.clone());
        unit
    }
}

#[async_trait]
impl Factory for MockFactory {
    async fn construct(&self, spec: &UnitSpec, _fees: &FeeOverrides) -> RemoteResult<Constructed> {
        self.log.push(format!("construct:{}", spec.artifact));
        {
            let mut failures = self.failures.lock().unwrap();
            if let Some(remaining) = failures.get_mut(spec.artifact) {
                if *remaining > 0 {
                    if *remaining != u32::MAX {
                        *remaining -= 1;
                    }
                    return Err(RemoteError::Underpriced(format!(
                        "{} creation underpriced",
                        spec.artifact
                    )));
                }
            }
        }

        let n = self.next_address.fetch_add(1, Ordering::SeqCst);
        let address = Address::left_padding_from(&n.to_be_bytes());
        let unit = self.deploy_existing(spec.artifact, address);
        Ok(Constructed {
            handle: unit,
            tx: next_tx(),
        })
    }

    async fn attach(&self, spec: &UnitSpec, address: &Address) -> RemoteResult<Arc<dyn UnitHandle>> {
        self.log.push(format!("attach:{}", spec.artifact));
        let existing = self.units.lock().unwrap().get(address).cloned();
        let unit = match existing {
            Some(unit) => unit,
            None => self.deploy_existing(spec.artifact, *address),
        };
        Ok(unit)
    }
}

// =============================================================================
// Registry
// =============================================================================

pub struct MockRegistry {
    log: Arc<CallLog>,
    pub already_verified: Mutex<HashSet<Address>>,
    pub failing: Mutex<bool>,
}

impl MockRegistry {
    pub fn new(log: Arc<CallLog>) -> Self {
        Self {
            log,
            already_verified: Mutex::new(HashSet::new()),
            failing: Mutex::new(false),
        }
    }
}

#[async_trait]
impl Registry for MockRegistry {
    async fn publish(&self, request: &VerificationRequest) -> RemoteResult<()> {
        self.log.push(format!("verify:{}", request.unit));
        if *self.failing.lock().unwrap() {
            return Err(RemoteError::Rpc("explorer unavailable".to_string()));
        }
        if !self.already_verified.lock().unwrap().insert(request.address) {
            return Err(RemoteError::AlreadyVerified);
        }
        Ok(())
    }
}

// =============================================================================
// Fixtures
// =============================================================================

pub struct World {
    pub log: Arc<CallLog>,
    pub chain: Arc<MockChain>,
    pub factory: Arc<MockFactory>,
    pub registry: Arc<MockRegistry>,
}

impl World {
    pub fn new() -> Self {
        let log = Arc::new(CallLog::default());
        Self {
            chain: Arc::new(MockChain::new(log.clone())),
            factory: Arc::new(MockFactory::new(log.clone())),
            registry: Arc::new(MockRegistry::new(log.clone())),
            log,
        }
    }

    pub fn orchestrator(&self, config: TargetConfig) -> Orchestrator {
        Orchestrator::new(config, self.chain.clone(), self.factory.clone())
            .with_registry(self.registry.clone())
    }

    pub fn run_state(&self, config: TargetConfig) -> RunState {
        RunState::load(config, fees()).unwrap()
    }
}

pub fn wbtc() -> ResourceItem {
    ResourceItem {
        name: "WBTC".to_string(),
        address: Some(addr(WBTC)),
        oracle_address: Some(addr(WBTC_ORACLE)),
        oracle: OracleSettings {
            provider_type: 0,
            timeout_seconds: 900_000,
            is_eth_indexed: false,
        },
        native_oracle: false,
        decimals: 8,
        risk: RiskParameters {
            borrowing_fee: Some(Amount::from_wei(25_000_000_000_000_000)),
            mcr: Amount::from_wei(1_100_000_000_000_000_000),
            ccr: Amount::from_wei(1_300_000_000_000_000_000),
            min_net_debt: ether(100),
            gas_compensation: ether(10),
            mint_cap: ether(5_000_000),
        },
    }
}

pub fn test_config(dir: &Path, target: DeploymentTarget) -> TargetConfig {
    TargetConfig {
        target,
        output_file: dir.join("output").join(format!("{target}.json")),
        tx_confirmations: 1,
        max_attempts: 2,
        rpc_url: None,
        explorer_base_url: None,
        deployer: addr(DEPLOYER),
        system_params_admin: addr(DEPLOYER),
        treasury_wallet: addr(TREASURY),
        contract_upgrades_admin: None,
        debt_token_address: None,
        fees: Some(fees()),
        finalize: FinalizeConfig::default(),
        resources: vec![Ok(wbtc())],
    }
}
