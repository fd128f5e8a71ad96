//! Configuration schema for `<target>.toml`
//!
//! The file form keeps addresses as plain strings so that an empty value can
//! mean "not configured". [`TargetConfigFile::validate`] turns it into the
//! typed [`TargetConfig`] used by a run.
//!
//! Each `[[collateral]]` table is validated on its own: a malformed item
//! becomes an [`InvalidResource`] that the run skips with a warning, while
//! the rest of the file still loads.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::DeployError;
use crate::target::DeploymentTarget;
use crate::types::{Address, Amount, FeeOverrides};

/// Confirmations awaited for every transaction unless configured.
pub const DEFAULT_TX_CONFIRMATIONS: u64 = 1;

/// Construction attempts per unit: the first try plus one retry.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 2;

/// Decimal precision registered for a collateral unless configured.
pub const DEFAULT_COLLATERAL_DECIMALS: u8 = 18;

/// Oracle staleness timeout unless configured.
pub const DEFAULT_ORACLE_TIMEOUT_SECONDS: u64 = 3_600;

/// Root of a target configuration file.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TargetConfigFile {
    /// Deployment state file, relative to the config directory
    pub output_file: PathBuf,

    #[serde(default = "default_tx_confirmations")]
    pub tx_confirmations: u64,

    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// JSON-RPC endpoint (used by status queries)
    #[serde(default)]
    pub rpc_url: Option<Url>,

    /// Block explorer address page, e.g. `https://explorer/address`
    #[serde(default)]
    pub explorer_base_url: Option<Url>,

    #[serde(default)]
    pub deployer: String,

    #[serde(default)]
    pub system_params_admin: String,

    #[serde(default)]
    pub treasury_wallet: String,

    /// Receives unit ownership during finalization
    #[serde(default)]
    pub contract_upgrades_admin: String,

    /// Reuse an already deployed debt token instead of creating one
    #[serde(default)]
    pub debt_token_address: String,

    #[serde(default)]
    pub fees: Option<FeeConfig>,

    #[serde(default)]
    pub finalize: FinalizeConfig,

    /// Raw `[[collateral]]` tables, see [`CollateralEntry::from_table`]
    #[serde(default)]
    pub collateral: Vec<toml::Table>,
}

fn default_tx_confirmations() -> u64 {
    DEFAULT_TX_CONFIRMATIONS
}

fn default_max_attempts() -> u32 {
    DEFAULT_MAX_ATTEMPTS
}

/// Fixed fee parameters; when absent fees come from the chain's estimate.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FeeConfig {
    pub max_fee_per_gas: Amount,
    pub max_priority_fee_per_gas: Amount,
}

impl From<FeeConfig> for FeeOverrides {
    fn from(config: FeeConfig) -> Self {
        FeeOverrides {
            max_fee_per_gas: config.max_fee_per_gas,
            max_priority_fee_per_gas: config.max_priority_fee_per_gas,
            gas_limit: None,
        }
    }
}

/// Optional late-stage steps.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FinalizeConfig {
    #[serde(default)]
    pub verify: bool,

    #[serde(default)]
    pub transfer_ownership: bool,

    /// Flip `isSetupInitialized` on units that carry the flag
    #[serde(default)]
    pub initialize_setup: bool,
}

impl FinalizeConfig {
    pub fn any(&self) -> bool {
        self.verify || self.transfer_ownership || self.initialize_setup
    }
}

/// A `[[collateral]]` entry as written in the file.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CollateralEntry {
    pub name: String,

    #[serde(default)]
    pub address: String,

    #[serde(default)]
    pub oracle_address: String,

    #[serde(default)]
    pub oracle_provider_type: u8,

    #[serde(default = "default_oracle_timeout")]
    pub oracle_timeout_seconds: u64,

    #[serde(default)]
    pub oracle_is_eth_indexed: bool,

    /// Also register this oracle for the native asset
    #[serde(default)]
    pub native_oracle: bool,

    #[serde(default = "default_decimals")]
    pub decimals: u8,

    #[serde(default)]
    pub borrowing_fee: Option<Amount>,

    pub mcr: Amount,
    pub ccr: Amount,
    pub min_net_debt: Amount,
    pub gas_compensation: Amount,
    pub mint_cap: Amount,
}

fn default_oracle_timeout() -> u64 {
    DEFAULT_ORACLE_TIMEOUT_SECONDS
}

fn default_decimals() -> u8 {
    DEFAULT_COLLATERAL_DECIMALS
}

/// Validated configuration bundle for one target.
#[derive(Debug, Clone)]
pub struct TargetConfig {
    pub target: DeploymentTarget,
    pub output_file: PathBuf,
    pub tx_confirmations: u64,
    pub max_attempts: u32,
    pub rpc_url: Option<Url>,
    pub explorer_base_url: Option<Url>,
    pub deployer: Address,
    pub system_params_admin: Address,
    pub treasury_wallet: Address,
    pub contract_upgrades_admin: Option<Address>,
    pub debt_token_address: Option<Address>,
    pub fees: Option<FeeOverrides>,
    pub finalize: FinalizeConfig,
    pub resources: Vec<ResourceEntry>,
}

/// Oracle settings of a resource item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OracleSettings {
    pub provider_type: u8,
    pub timeout_seconds: u64,
    pub is_eth_indexed: bool,
}

/// Risk parameters of a resource item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RiskParameters {
    /// Falls back to the risk unit's default when absent
    pub borrowing_fee: Option<Amount>,
    pub mcr: Amount,
    pub ccr: Amount,
    pub min_net_debt: Amount,
    pub gas_compensation: Amount,
    pub mint_cap: Amount,
}

/// A supported collateral, validated.
///
/// Missing addresses are kept as `None`; the configurator skips such items
/// with a warning instead of failing the run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceItem {
    pub name: String,
    pub address: Option<Address>,
    pub oracle_address: Option<Address>,
    pub oracle: OracleSettings,
    pub native_oracle: bool,
    pub decimals: u8,
    pub risk: RiskParameters,
}

/// A `[[collateral]]` table that failed validation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InvalidResource {
    /// The table's `name`, or its position when the name is unusable
    pub name: String,
    pub reason: String,
}

/// One configured collateral: usable, or rejected with the reason.
pub type ResourceEntry = Result<ResourceItem, InvalidResource>;

impl ResourceItem {
    /// Reason the item cannot be configured, if any.
    pub fn missing_field(&self) -> Option<&'static str> {
        if self.address.is_none() {
            Some("No address setup for collateral")
        } else if self.oracle_address.is_none() {
            Some("No price feed oracle address setup for collateral")
        } else {
            None
        }
    }
}

impl TargetConfigFile {
    /// Validate addresses and limits.
    ///
    /// `base_dir` anchors a relative `output_file`; `deployer_override`
    /// replaces the `deployer` field when set.
    pub fn validate(
        self,
        target: DeploymentTarget,
        base_dir: &Path,
        deployer_override: Option<&str>,
    ) -> Result<TargetConfig, DeployError> {
        let deployer_raw = deployer_override.unwrap_or(&self.deployer);
        let deployer = required_address("deployer", deployer_raw)?;
        let system_params_admin = required_address("system_params_admin", &self.system_params_admin)?;
        let treasury_wallet = required_address("treasury_wallet", &self.treasury_wallet)?;
        let contract_upgrades_admin =
            optional_address("contract_upgrades_admin", &self.contract_upgrades_admin)?
                .filter(|address| !address.is_zero());
        let debt_token_address = optional_address("debt_token_address", &self.debt_token_address)?;

        if self.max_attempts == 0 {
            return Err(DeployError::Config(
                "max_attempts must be at least 1".to_string(),
            ));
        }
        if self.tx_confirmations == 0 {
            return Err(DeployError::Config(
                "tx_confirmations must be at least 1".to_string(),
            ));
        }
        if self.finalize.transfer_ownership && contract_upgrades_admin.is_none() {
            return Err(DeployError::Config(
                "Provide an address for contract_upgrades_admin before transferring the ownerships"
                    .to_string(),
            ));
        }
        if self.output_file.as_os_str().is_empty() {
            return Err(DeployError::Config("output_file must not be empty".to_string()));
        }

        let resources: Vec<ResourceEntry> = self
            .collateral
            .into_iter()
            .enumerate()
            .map(|(index, table)| CollateralEntry::from_table(index, table))
            .collect();
        for invalid in resources.iter().filter_map(|entry| entry.as_ref().err()) {
            tracing::warn!(collateral = %invalid.name, reason = %invalid.reason, "Invalid collateral entry");
        }

        let output_file = if self.output_file.is_absolute() {
            self.output_file
        } else {
            base_dir.join(self.output_file)
        };

        Ok(TargetConfig {
            target,
            output_file,
            tx_confirmations: self.tx_confirmations,
            max_attempts: self.max_attempts,
            rpc_url: self.rpc_url,
            explorer_base_url: self.explorer_base_url,
            deployer,
            system_params_admin,
            treasury_wallet,
            contract_upgrades_admin,
            debt_token_address,
            fees: self.fees.map(FeeOverrides::from),
            finalize: self.finalize,
            resources,
        })
    }
}

impl CollateralEntry {
    /// Validate the `index`-th `[[collateral]]` table in isolation.
    pub fn from_table(index: usize, table: toml::Table) -> ResourceEntry {
        let name = table
            .get("name")
            .and_then(toml::Value::as_str)
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| format!("collateral #{}", index + 1));

        let entry: CollateralEntry = toml::Value::Table(table)
            .try_into()
            .map_err(|e: toml::de::Error| InvalidResource {
                name: name.clone(),
                reason: e.message().trim().to_string(),
            })?;
        entry.validate().map_err(|reason| InvalidResource { name, reason })
    }

    fn validate(self) -> Result<ResourceItem, String> {
        if self.name.trim().is_empty() {
            return Err("collateral name must not be empty".to_string());
        }
        let address = parse_address(&self.address).map_err(|e| format!("address: {e}"))?;
        let oracle_address =
            parse_address(&self.oracle_address).map_err(|e| format!("oracle_address: {e}"))?;

        Ok(ResourceItem {
            name: self.name,
            address,
            oracle_address,
            oracle: OracleSettings {
                provider_type: self.oracle_provider_type,
                timeout_seconds: self.oracle_timeout_seconds,
                is_eth_indexed: self.oracle_is_eth_indexed,
            },
            native_oracle: self.native_oracle,
            decimals: self.decimals,
            risk: RiskParameters {
                borrowing_fee: self.borrowing_fee,
                mcr: self.mcr,
                ccr: self.ccr,
                min_net_debt: self.min_net_debt,
                gas_compensation: self.gas_compensation,
                mint_cap: self.mint_cap,
            },
        })
    }
}

fn required_address(field: &str, value: &str) -> Result<Address, DeployError> {
    match optional_address(field, value)? {
        Some(address) if !address.is_zero() => Ok(address),
        Some(_) => Err(DeployError::Config(format!(
            "{field} must not be the zero address"
        ))),
        None => Err(DeployError::Config(format!(
            "Provide a value for {field} in the target configuration"
        ))),
    }
}

fn optional_address(field: &str, value: &str) -> Result<Option<Address>, DeployError> {
    parse_address(value).map_err(|e| DeployError::Config(format!("{field}: {e}")))
}

/// Empty means "not configured".
fn parse_address(value: &str) -> Result<Option<Address>, String> {
    let value = value.trim();
    if value.is_empty() {
        return Ok(None);
    }
    value
        .parse::<Address>()
        .map(Some)
        .map_err(|e| format!("invalid address '{value}': {e}"))
}
