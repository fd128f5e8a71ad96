//! Per-collateral oracle and risk parameter registration.

use std::sync::Arc;

use serde::Serialize;

use crate::chain::{ChainClient, CollateralParameters, OracleRegistration};
use crate::config::{OracleSettings, ResourceEntry, ResourceItem};
use crate::error::{DeployError, RemoteError, Warning, WarningKind};
use crate::types::{Address, BlockTag};
use crate::units::UnitId;

use super::{RunState, confirm};

/// Name used when an item's oracle is also registered for the native asset.
pub const NATIVE_ASSET_NAME: &str = "ETH";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum OracleOutcome {
    Registered,
    AlreadySet,
    /// A different oracle is registered; left for a manual Timelock update
    Conflicting,
    /// The deployer does not own the price feed
    NotOwner,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CollateralOutcome {
    pub added: bool,
    pub parameters_set: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "kebab-case")]
pub enum ResourceOutcome {
    Skipped {
        name: String,
        reason: String,
    },
    Configured {
        name: String,
        oracle: OracleOutcome,
        #[serde(skip_serializing_if = "Option::is_none")]
        native_oracle: Option<OracleOutcome>,
        collateral: CollateralOutcome,
    },
}

pub struct ResourceConfigurator {
    chain: Arc<dyn ChainClient>,
}

impl ResourceConfigurator {
    pub fn new(chain: Arc<dyn ChainClient>) -> Self {
        Self { chain }
    }

    /// Configure every collateral item of the target.
    ///
    /// Invalid items, items with missing addresses and oracle registrations
    /// the deployer may not perform are skipped with a warning. Every step checks the current
    /// on-chain value first, so re-running never registers twice.
    pub async fn configure_all(
        &self,
        state: &mut RunState,
    ) -> Result<Vec<ResourceOutcome>, DeployError> {
        let entries = state.config().resources.clone();
        tracing::info!(items = entries.len(), "Adding collateral");

        let mut outcomes = Vec::with_capacity(entries.len());
        for entry in &entries {
            outcomes.push(self.configure(state, entry).await?);
        }
        Ok(outcomes)
    }

    pub async fn configure(
        &self,
        state: &mut RunState,
        entry: &ResourceEntry,
    ) -> Result<ResourceOutcome, DeployError> {
        let item = match entry {
            Ok(item) => item,
            Err(invalid) => {
                let reason = format!("Invalid collateral entry: {}", invalid.reason);
                return Ok(skip(state, &invalid.name, reason));
            }
        };
        let (asset, oracle) = match (item.address, item.oracle_address, item.missing_field()) {
            (Some(asset), Some(oracle), None) => (asset, oracle),
            (_, _, reason) => {
                let reason = reason.unwrap_or("Incomplete collateral entry").to_string();
                return Ok(skip(state, &item.name, reason));
            }
        };

        let oracle_outcome = self
            .register_oracle(state, &item.name, &asset, &oracle, &item.oracle)
            .await?;
        let collateral = self.register_collateral(state, item, &asset).await?;

        let native_oracle = if item.native_oracle {
            Some(
                self.register_oracle(
                    state,
                    NATIVE_ASSET_NAME,
                    &Address::ZERO,
                    &oracle,
                    &item.oracle,
                )
                .await?,
            )
        } else {
            None
        };

        Ok(ResourceOutcome::Configured {
            name: item.name.clone(),
            oracle: oracle_outcome,
            native_oracle,
            collateral,
        })
    }

    async fn register_oracle(
        &self,
        state: &mut RunState,
        name: &str,
        asset: &Address,
        oracle: &Address,
        settings: &OracleSettings,
    ) -> Result<OracleOutcome, DeployError> {
        let price_feed = state.handle(UnitId::PriceFeed)?;
        let step = |what: &str| format!("[{name}] PriceFeed.{what}");

        let record = price_feed
            .oracle_record(asset)
            .await
            .map_err(|e| DeployError::remote(step("oracles()"), e))?;

        if record.is_set() {
            if record.oracle_address == *oracle {
                tracing::info!(collateral = name, %oracle, "Oracle price feed had already been set");
                return Ok(OracleOutcome::AlreadySet);
            }
            state.warn(Warning::new(
                WarningKind::ResourceConfig,
                name,
                format!(
                    "Another oracle ({}) had already been set, update it via Timelock.setOracle()",
                    record.oracle_address
                ),
            ));
            return Ok(OracleOutcome::Conflicting);
        }

        let owner = price_feed
            .owner()
            .await
            .map_err(|e| DeployError::remote(step("owner()"), e))?;
        let deployer = state.config().deployer;
        if owner != deployer {
            state.warn(Warning::new(
                WarningKind::ResourceConfig,
                name,
                format!("Cannot call PriceFeed.setOracle(): deployer = {deployer}, owner = {owner}"),
            ));
            return Ok(OracleOutcome::NotOwner);
        }

        let registration = OracleRegistration {
            asset: *asset,
            oracle: *oracle,
            provider_type: settings.provider_type,
            timeout_seconds: settings.timeout_seconds,
            is_eth_indexed: settings.is_eth_indexed,
            is_fallback: false,
        };
        confirm(
            self.chain.as_ref(),
            price_feed.set_oracle(&registration, state.fees()).await,
            state.confirmations(),
        )
        .await
        .map_err(|e| DeployError::remote(step("setOracle()"), e))?;

        tracing::info!(
            collateral = name,
            %oracle,
            provider_type = settings.provider_type,
            timeout_seconds = settings.timeout_seconds,
            is_eth_indexed = settings.is_eth_indexed,
            "Oracle price feed has been set"
        );
        Ok(OracleOutcome::Registered)
    }

    async fn register_collateral(
        &self,
        state: &RunState,
        item: &ResourceItem,
        asset: &Address,
    ) -> Result<CollateralOutcome, DeployError> {
        let admin = state.handle(UnitId::AdminContract)?;
        let name = item.name.as_str();
        let step = |what: &str| format!("[{name}] AdminContract.{what}");
        let fees = state.fees();
        let confirmations = state.confirmations();

        let mcr = admin
            .mcr(asset)
            .await
            .map_err(|e| DeployError::remote(step("getMcr()"), e))?;
        let added = if mcr.is_zero() {
            confirm(
                self.chain.as_ref(),
                admin
                    .add_new_collateral(asset, item.risk.gas_compensation, item.decimals, fees)
                    .await,
                confirmations,
            )
            .await
            .map_err(|e| DeployError::remote(step("addNewCollateral()"), e))?;
            tracing::info!(collateral = name, %asset, decimals = item.decimals, "Collateral added");
            true
        } else {
            tracing::info!(collateral = name, "Collateral has already been added before");
            false
        };

        let active = admin
            .is_active(asset)
            .await
            .map_err(|e| DeployError::remote(step("getIsActive()"), e))?;
        if active {
            tracing::info!(collateral = name, "Collateral params have already been set");
            return Ok(CollateralOutcome {
                added,
                parameters_set: false,
            });
        }

        let (percent_divisor, redemption_fee_floor, borrowing_fee_default) = tokio::try_join!(
            admin.percent_divisor_default(),
            admin.redemption_fee_floor_default(),
            admin.borrowing_fee_default(),
        )
        .map_err(|e: RemoteError| DeployError::remote(step("defaults"), e))?;

        let params = CollateralParameters {
            asset: *asset,
            borrowing_fee: item.risk.borrowing_fee.unwrap_or(borrowing_fee_default),
            ccr: item.risk.ccr,
            mcr: item.risk.mcr,
            min_net_debt: item.risk.min_net_debt,
            mint_cap: item.risk.mint_cap,
            percent_divisor,
            redemption_fee_floor,
        };
        tracing::debug!(collateral = name, borrowing_fee = %params.borrowing_fee, "Setting collateral params");
        confirm(
            self.chain.as_ref(),
            admin.set_collateral_parameters(&params, fees).await,
            confirmations,
        )
        .await
        .map_err(|e| DeployError::remote(step("setCollateralParameters()"), e))?;

        let block = self
            .chain
            .block(BlockTag::Latest)
            .await
            .map_err(|e| DeployError::remote(format!("[{name}] latest block"), e))?;
        confirm(
            self.chain.as_ref(),
            admin
                .set_redemption_block_timestamp(asset, block.timestamp, fees)
                .await,
            confirmations,
        )
        .await
        .map_err(|e| DeployError::remote(step("setRedemptionBlockTimestamp()"), e))?;

        tracing::info!(collateral = name, "AdminContract.setCollateralParameters() -> ok");
        Ok(CollateralOutcome {
            added,
            parameters_set: true,
        })
    }
}

fn skip(state: &mut RunState, name: &str, reason: String) -> ResourceOutcome {
    tracing::warn!(collateral = name, %reason, "Skipping collateral");
    state.warn(Warning::new(WarningKind::ResourceConfig, name, reason.clone()));
    ResourceOutcome::Skipped {
        name: name.to_string(),
        reason,
    }
}
