//! Per-target configuration
//!
//! Each deployment target has its own `<target>.toml` in the config
//! directory, holding admin addresses, the state file location, fee
//! settings, finalization switches and the collateral list.

pub mod parser;
pub mod schema;
pub mod store;

pub use parser::{parse_target_toml, parse_target_toml_str};
pub use schema::{
    CollateralEntry, DEFAULT_COLLATERAL_DECIMALS, DEFAULT_MAX_ATTEMPTS, DEFAULT_TX_CONFIRMATIONS,
    FeeConfig, FinalizeConfig, InvalidResource, OracleSettings, ResourceEntry, ResourceItem,
    RiskParameters, TargetConfig, TargetConfigFile,
};
pub use store::{ConfigStore, DEPLOYER_ENV};
