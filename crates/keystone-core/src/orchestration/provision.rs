//! Construct-or-attach for every unit in the catalog.

use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;

use crate::chain::{ChainClient, Constructed, Factory, IMPLEMENTATION_SLOT, UnitHandle};
use crate::config::DEFAULT_MAX_ATTEMPTS;
use crate::error::{DeployError, RemoteError, RemoteResult, Warning, WarningKind};
use crate::state::DeploymentRecord;
use crate::types::{Address, FeeOverrides};
use crate::units::{UnitKind, UnitSpec};

use super::RunState;

/// Bounded construction attempts per unit.
///
/// `max_attempts` counts every try including the first; the default of 2
/// means one retry after a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_ATTEMPTS)
    }
}

/// How a unit handle was obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "action", rename_all = "kebab-case")]
pub enum ProvisionAction {
    /// Address came from the state file
    AttachedRecorded,
    /// Address came from the target configuration; not recorded
    AttachedConfigured,
    Constructed { attempts: u32 },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UnitOutcome {
    pub unit: String,
    pub address: Address,
    #[serde(flatten)]
    pub action: ProvisionAction,
}

pub struct Provisioner {
    chain: Arc<dyn ChainClient>,
    factory: Arc<dyn Factory>,
    policy: RetryPolicy,
}

impl Provisioner {
    pub fn new(
        chain: Arc<dyn ChainClient>,
        factory: Arc<dyn Factory>,
        policy: RetryPolicy,
    ) -> Self {
        Self {
            chain,
            factory,
            policy,
        }
    }

    /// Provision every unit in catalog order, then check that no unit
    /// resolved to the zero address.
    pub async fn provision_all(
        &self,
        state: &mut RunState,
    ) -> Result<Vec<UnitOutcome>, DeployError> {
        tracing::info!(units = state.specs().len(), "Deploying core contracts");

        let specs = state.specs().to_vec();
        let mut outcomes = Vec::with_capacity(specs.len());
        for spec in &specs {
            outcomes.push(self.provision(state, spec).await?);
        }

        for outcome in &outcomes {
            if outcome.address.is_zero() {
                return Err(DeployError::InvalidAddress {
                    unit: outcome.unit.clone(),
                    address: outcome.address,
                });
            }
            tracing::debug!(unit = %outcome.unit, address = %outcome.address, "Contract address");
        }

        Ok(outcomes)
    }

    /// Obtain a handle for one unit.
    ///
    /// A recorded address is attached without any write or retry, and wins
    /// over an address from the configuration. Otherwise the unit is
    /// constructed within the retry budget and its record is persisted
    /// before returning.
    pub async fn provision(
        &self,
        state: &mut RunState,
        spec: &UnitSpec,
    ) -> Result<UnitOutcome, DeployError> {
        let unit = spec.record_key();

        if let Some(address) = state.records().address(unit).copied() {
            tracing::info!(unit, %address, "Using previous deployment");
            match &spec.kind {
                UnitKind::Attachable(configured) if *configured != address => {
                    tracing::warn!(
                        unit,
                        recorded = %address,
                        %configured,
                        "Configured address differs from the recorded one"
                    );
                    state.warn(Warning::new(
                        WarningKind::AddressMismatch,
                        unit,
                        format!(
                            "Using recorded address {address}; configured address {configured} is ignored"
                        ),
                    ));
                }
                _ => {}
            }
            let handle = self.attach(spec, &address).await?;
            state.insert_handle(spec.id, handle);
            return Ok(UnitOutcome {
                unit: unit.to_string(),
                address,
                action: ProvisionAction::AttachedRecorded,
            });
        }

        if let UnitKind::Attachable(address) = &spec.kind {
            tracing::info!(unit, %address, "Using existing deployment from configuration");
            let handle = self.attach(spec, address).await?;
            state.insert_handle(spec.id, handle);
            return Ok(UnitOutcome {
                unit: unit.to_string(),
                address: *address,
                action: ProvisionAction::AttachedConfigured,
            });
        }

        tracing::info!(unit, upgradeable = spec.upgradeable, "Deploying");
        let (constructed, attempts) = self
            .construct_with_retry(spec, state.fees(), state.confirmations())
            .await?;
        let address = *constructed.handle.address();

        let impl_address = if spec.upgradeable {
            match self.implementation_address(&address).await {
                Ok(impl_address) => {
                    tracing::info!(unit, %impl_address, "Resolved implementation");
                    Some(impl_address)
                }
                Err(e) => {
                    state.warn(Warning::new(
                        WarningKind::SecondaryAddress,
                        unit,
                        format!("Unable to find implementation address: {e}"),
                    ));
                    None
                }
            }
        } else {
            None
        };

        state.record(
            unit,
            DeploymentRecord {
                address: Some(address),
                impl_address,
                tx_hash: Some(constructed.tx),
                verification: None,
                deployed_at: Some(Utc::now()),
            },
        )?;
        state.insert_handle(spec.id, constructed.handle);

        tracing::info!(unit, %address, attempts, "Deployed");
        Ok(UnitOutcome {
            unit: unit.to_string(),
            address,
            action: ProvisionAction::Constructed { attempts },
        })
    }

    async fn attach(
        &self,
        spec: &UnitSpec,
        address: &Address,
    ) -> Result<Arc<dyn UnitHandle>, DeployError> {
        self.factory.attach(spec, address).await.map_err(|e| {
            DeployError::remote(format!("attaching {} at {}", spec.artifact, address), e)
        })
    }

    async fn construct_with_retry(
        &self,
        spec: &UnitSpec,
        fees: &FeeOverrides,
        confirmations: u64,
    ) -> Result<(Constructed, u32), DeployError> {
        let max_attempts = self.policy.max_attempts;
        let mut last_error = None;

        for attempt in 1..=max_attempts {
            match self.try_construct(spec, fees, confirmations).await {
                Ok(constructed) => return Ok((constructed, attempt)),
                Err(e) => {
                    tracing::warn!(
                        unit = spec.artifact,
                        attempt,
                        max_attempts,
                        transient = e.is_transient(),
                        error = %e,
                        "Deployment attempt failed"
                    );
                    last_error = Some(e);
                }
            }
        }

        Err(DeployError::Fatal {
            unit: spec.artifact.to_string(),
            attempts: max_attempts,
            source: last_error
                .unwrap_or_else(|| RemoteError::Rpc("no deployment attempt was made".to_string())),
        })
    }

    async fn try_construct(
        &self,
        spec: &UnitSpec,
        fees: &FeeOverrides,
        confirmations: u64,
    ) -> RemoteResult<Constructed> {
        let constructed = self.factory.construct(spec, fees).await?;
        let receipt = self.chain.wait(&constructed.tx, confirmations).await?;

        if let Some(price) = receipt.effective_gas_price {
            tracing::info!(
                unit = spec.artifact,
                tx = %receipt.tx_hash,
                gas_price_wei = %price,
                gas_price_gwei = %price.format_gwei(),
                "Deployment confirmed"
            );
        }
        Ok(constructed)
    }

    async fn implementation_address(&self, proxy: &Address) -> RemoteResult<Address> {
        let word = self.chain.storage_at(proxy, IMPLEMENTATION_SLOT).await?;
        let address = Address::from_word(word);
        if address.is_zero() {
            return Err(RemoteError::Rpc(format!(
                "implementation slot of {proxy} is empty"
            )));
        }
        Ok(address)
    }
}
