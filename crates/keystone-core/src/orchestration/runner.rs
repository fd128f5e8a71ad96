//! Top-level run lifecycle.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;

use crate::chain::{ChainClient, Factory, Registry};
use crate::config::{ConfigStore, TargetConfig};
use crate::error::{DeployError, Warning, WarningKind};
use crate::target::DeploymentTarget;
use crate::types::{Amount, FeeOverrides};

use super::{
    Finalizer, Provisioner, ResourceConfigurator, ResourceOutcome, RetryPolicy, RunState,
    UnitOutcome, WiringCoordinator,
};

/// Lifecycle of one run. Transitions only move forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Phase {
    Init,
    Provisioning,
    Wiring,
    ResourceConfig,
    Finalize,
    Done,
    /// Terminal; durable state is left as of the last completed step
    Failed,
}

impl Phase {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Phase::Done | Phase::Failed)
    }
}

/// Summary of a completed run.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub target: DeploymentTarget,
    pub phase: Phase,
    pub units: Vec<UnitOutcome>,
    pub resources: Vec<ResourceOutcome>,
    pub warnings: Vec<Warning>,
    /// Deployer balance spent, when both balance reads succeeded
    pub cost: Option<Amount>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

/// A run that ended in [`Phase::Failed`].
///
/// Durable state is left as of the last completed step of `failed_in`.
#[derive(Debug, Error)]
#[error("deployment failed during {failed_in:?}: {source}")]
pub struct RunError {
    /// Phase that was executing when the run stopped
    pub failed_in: Phase,
    #[source]
    pub source: DeployError,
}

impl RunError {
    /// Terminal phase of the run.
    pub fn phase(&self) -> Phase {
        Phase::Failed
    }
}

/// Drives provisioning, wiring, resource configuration and finalization for
/// one target.
pub struct Orchestrator {
    config: TargetConfig,
    chain: Arc<dyn ChainClient>,
    factory: Arc<dyn Factory>,
    registry: Option<Arc<dyn Registry>>,
}

impl Orchestrator {
    pub fn new(
        config: TargetConfig,
        chain: Arc<dyn ChainClient>,
        factory: Arc<dyn Factory>,
    ) -> Self {
        Self {
            config,
            chain,
            factory,
            registry: None,
        }
    }

    /// Load the target's configuration; fails before any remote call.
    pub fn from_store(
        store: &ConfigStore,
        target: DeploymentTarget,
        chain: Arc<dyn ChainClient>,
        factory: Arc<dyn Factory>,
    ) -> Result<Self, DeployError> {
        let config = store.load(target)?;
        Ok(Self::new(config, chain, factory))
    }

    pub fn with_registry(mut self, registry: Arc<dyn Registry>) -> Self {
        self.registry = Some(registry);
        self
    }

    pub fn config(&self) -> &TargetConfig {
        &self.config
    }

    /// Run every phase in order.
    ///
    /// A fatal error aborts immediately and leaves the state file as of the
    /// last completed step; running again resumes from there.
    pub async fn run(&self) -> Result<RunReport, RunError> {
        let started_at = Utc::now();
        let target = self.config.target;
        tracing::info!(%target, "Deploying core");

        let mut phase = Phase::Init;
        match self.run_phases(&mut phase, started_at).await {
            Ok(report) => {
                tracing::info!(
                    %target,
                    units = report.units.len(),
                    warnings = report.warnings.len(),
                    "Deployment finished"
                );
                Ok(report)
            }
            Err(source) => {
                tracing::error!(%target, failed_in = ?phase, error = %source, "Deployment failed");
                let failed_in = phase;
                advance(&mut phase, Phase::Failed);
                Err(RunError { failed_in, source })
            }
        }
    }

    async fn run_phases(
        &self,
        phase: &mut Phase,
        started_at: DateTime<Utc>,
    ) -> Result<RunReport, DeployError> {
        let fees = self.resolve_fees().await?;
        let mut state = RunState::load(self.config.clone(), fees)?;
        let balance_before = self.log_balance(&mut state, None).await;

        advance(phase, Phase::Provisioning);
        let provisioner = Provisioner::new(
            self.chain.clone(),
            self.factory.clone(),
            RetryPolicy::new(self.config.max_attempts),
        );
        let units = provisioner.provision_all(&mut state).await?;

        advance(phase, Phase::Wiring);
        WiringCoordinator::new(self.chain.clone())
            .wire(&mut state)
            .await?;

        advance(phase, Phase::ResourceConfig);
        let resources = ResourceConfigurator::new(self.chain.clone())
            .configure_all(&mut state)
            .await?;

        let finalize = self.config.finalize;
        if finalize.any() {
            advance(phase, Phase::Finalize);
            let finalizer = Finalizer::new(self.chain.clone(), self.registry.clone());
            if finalize.initialize_setup {
                finalizer.initialize_setup(&mut state).await?;
            }
            if finalize.verify {
                finalizer.verify_all(&mut state).await?;
            }
            if finalize.transfer_ownership {
                let admin = self.config.contract_upgrades_admin.ok_or_else(|| {
                    DeployError::Config("contract_upgrades_admin is required".to_string())
                })?;
                finalizer.transfer_ownerships(&mut state, &admin).await?;
            }
        }

        let cost = match balance_before {
            Some(before) => self
                .log_balance(&mut state, Some(before))
                .await
                .map(|after| before.saturating_sub(after)),
            None => None,
        };

        advance(phase, Phase::Done);
        Ok(RunReport {
            target: self.config.target,
            phase: *phase,
            units,
            resources,
            warnings: state.take_warnings(),
            cost,
            started_at,
            finished_at: Utc::now(),
        })
    }

    /// Configured fees, else the chain's current estimate.
    async fn resolve_fees(&self) -> Result<FeeOverrides, DeployError> {
        if let Some(fees) = &self.config.fees {
            tracing::info!(
                max_fee_gwei = %fees.max_fee_per_gas.format_gwei(),
                priority_fee_gwei = %fees.max_priority_fee_per_gas.format_gwei(),
                "Using configured fees"
            );
            return Ok(fees.clone());
        }

        let estimate = self
            .chain
            .fee_estimate()
            .await
            .map_err(|e| DeployError::remote("fee estimate", e))?;
        let fees = estimate.to_overrides();
        tracing::info!(
            base_fee_gwei = %estimate.base_fee.format_gwei(),
            max_fee_gwei = %fees.max_fee_per_gas.format_gwei(),
            priority_fee_gwei = %fees.max_priority_fee_per_gas.format_gwei(),
            "Using estimated fees"
        );
        Ok(fees)
    }

    async fn log_balance(&self, state: &mut RunState, previous: Option<Amount>) -> Option<Amount> {
        let deployer = &self.config.deployer;
        match self.chain.balance(deployer).await {
            Ok(balance) => {
                match previous {
                    Some(before) => tracing::info!(
                        %deployer,
                        balance = %balance.format_ether(),
                        cost = %before.saturating_sub(balance).format_ether(),
                        "Deployer balance"
                    ),
                    None => {
                        tracing::info!(%deployer, balance = %balance.format_ether(), "Deployer balance")
                    }
                }
                Some(balance)
            }
            Err(e) => {
                state.warn(Warning::new(
                    WarningKind::Balance,
                    deployer.to_string(),
                    format!("Unable to read deployer balance: {e}"),
                ));
                None
            }
        }
    }
}

fn advance(phase: &mut Phase, next: Phase) {
    debug_assert!(
        next > *phase && !phase.is_terminal(),
        "phase transition {:?} -> {:?}",
        phase,
        next
    );
    tracing::debug!(from = ?phase, to = ?next, "Phase transition");
    *phase = next;
}
