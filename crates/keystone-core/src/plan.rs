//! Offline preview of what a run would do.
//!
//! Built from the target configuration and the state file only; no network
//! access.

use std::path::PathBuf;

use serde::Serialize;
use url::Url;

use crate::config::{FinalizeConfig, TargetConfig};
use crate::state::DeploymentState;
use crate::target::DeploymentTarget;
use crate::types::Address;
use crate::units::{UnitKind, catalog};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "action", rename_all = "kebab-case")]
pub enum UnitPlanAction {
    AttachRecorded { address: Address },
    AttachConfigured { address: Address },
    Construct,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UnitPlan {
    pub unit: String,
    pub upgradeable: bool,
    #[serde(flatten)]
    pub action: UnitPlanAction,
    pub verification: Option<Url>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "action", rename_all = "kebab-case")]
pub enum ResourcePlanAction {
    Configure { native_oracle: bool },
    Skip { reason: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResourcePlan {
    pub name: String,
    #[serde(flatten)]
    pub action: ResourcePlanAction,
}

#[derive(Debug, Clone, Serialize)]
pub struct DeploymentPlan {
    pub target: DeploymentTarget,
    pub state_file: PathBuf,
    pub units: Vec<UnitPlan>,
    pub resources: Vec<ResourcePlan>,
    pub finalize: FinalizeConfig,
}

impl DeploymentPlan {
    /// Units that would be newly constructed.
    pub fn pending_constructions(&self) -> usize {
        self.units
            .iter()
            .filter(|u| u.action == UnitPlanAction::Construct)
            .count()
    }
}

/// Decide per unit and per collateral item what the next run does.
pub fn plan(config: &TargetConfig, state: &DeploymentState) -> DeploymentPlan {
    let units = catalog(config)
        .into_iter()
        .map(|spec| {
            let record = state.get(spec.record_key());
            let action = match (record.and_then(|r| r.address), &spec.kind) {
                (Some(address), _) => UnitPlanAction::AttachRecorded { address },
                (None, UnitKind::Attachable(address)) => UnitPlanAction::AttachConfigured {
                    address: *address,
                },
                (None, UnitKind::Fresh) => UnitPlanAction::Construct,
            };
            UnitPlan {
                unit: spec.artifact.to_string(),
                upgradeable: spec.upgradeable,
                action,
                verification: record.and_then(|r| r.verification.clone()),
            }
        })
        .collect();

    let resources = config
        .resources
        .iter()
        .map(|entry| match entry {
            Ok(item) => ResourcePlan {
                name: item.name.clone(),
                action: match item.missing_field() {
                    Some(reason) => ResourcePlanAction::Skip {
                        reason: reason.to_string(),
                    },
                    None => ResourcePlanAction::Configure {
                        native_oracle: item.native_oracle,
                    },
                },
            },
            Err(invalid) => ResourcePlan {
                name: invalid.name.clone(),
                action: ResourcePlanAction::Skip {
                    reason: format!("Invalid collateral entry: {}", invalid.reason),
                },
            },
        })
        .collect();

    DeploymentPlan {
        target: config.target,
        state_file: config.output_file.clone(),
        units,
        resources,
        finalize: config.finalize,
    }
}
