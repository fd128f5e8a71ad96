//! Status of a target's recorded deployment.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::Serialize;
use url::Url;

use crate::chain::ChainClient;
use crate::config::TargetConfig;
use crate::error::RemoteResult;
use crate::state::DeploymentState;
use crate::target::DeploymentTarget;
use crate::types::{Address, Amount, TxHash};
use crate::units::{UnitKind, catalog};

// =============================================================================
// Data Structures
// =============================================================================

/// Recorded state of every catalog unit of a target
#[derive(Debug, Clone, Serialize)]
pub struct StatusReport {
    pub target: DeploymentTarget,
    pub state_file: PathBuf,
    pub deployer: Address,
    /// Filled by [`StatusReport::fetch_balance`]
    pub deployer_balance: Option<Amount>,
    pub units: Vec<UnitStatus>,
    /// Records whose key is not part of the target's catalog
    pub orphaned: Vec<String>,
    pub summary: StatusSummary,
}

#[derive(Debug, Clone, Serialize)]
pub struct StatusSummary {
    pub total: usize,
    pub deployed: usize,
    pub verified: usize,
    pub missing: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct UnitStatus {
    pub unit: String,
    pub state: UnitState,
    pub address: Option<Address>,
    pub impl_address: Option<Address>,
    pub tx_hash: Option<TxHash>,
    pub verification: Option<Url>,
    pub deployed_at: Option<DateTime<Utc>>,
}

// =============================================================================
// State Enums
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum UnitState {
    /// Address recorded in the state file
    Deployed,
    /// Reused from the configuration, never recorded
    External,
    /// Not deployed yet
    Missing,
}

// =============================================================================
// Collection
// =============================================================================

pub fn collect_status(config: &TargetConfig, state: &DeploymentState) -> StatusReport {
    let specs = catalog(config);

    let units: Vec<UnitStatus> = specs
        .iter()
        .map(|spec| {
            let record = state.get(spec.record_key()).cloned().unwrap_or_default();
            let (unit_state, address) = match (record.address, &spec.kind) {
                (Some(address), _) => (UnitState::Deployed, Some(address)),
                (None, UnitKind::Attachable(address)) => {
                    (UnitState::External, Some(*address))
                }
                (None, UnitKind::Fresh) => (UnitState::Missing, None),
            };
            UnitStatus {
                unit: spec.artifact.to_string(),
                state: unit_state,
                address,
                impl_address: record.impl_address,
                tx_hash: record.tx_hash,
                verification: record.verification,
                deployed_at: record.deployed_at,
            }
        })
        .collect();

    let orphaned = state
        .iter()
        .map(|(key, _)| key)
        .filter(|key| !specs.iter().any(|spec| spec.record_key() == key.as_str()))
        .cloned()
        .collect();

    let summary = StatusSummary {
        total: units.len(),
        deployed: units.iter().filter(|u| u.state == UnitState::Deployed).count(),
        verified: units.iter().filter(|u| u.verification.is_some()).count(),
        missing: units.iter().filter(|u| u.state == UnitState::Missing).count(),
    };

    StatusReport {
        target: config.target,
        state_file: config.output_file.clone(),
        deployer: config.deployer,
        deployer_balance: None,
        units,
        orphaned,
        summary,
    }
}

impl StatusReport {
    pub async fn fetch_balance(&mut self, chain: &dyn ChainClient) -> RemoteResult<Amount> {
        let balance = chain.balance(&self.deployer).await?;
        self.deployer_balance = Some(balance);
        Ok(balance)
    }
}
