//! Keystone Core Library
//!
//! Idempotent, resumable deployment of a CDP protocol's core contracts:
//! provisioning, address wiring, collateral registration and optional
//! finalization, with durable per-target state so an interrupted run can be
//! resumed.

pub mod chain;
pub mod config;
pub mod error;
pub mod orchestration;
pub mod plan;
pub mod state;
pub mod status;
pub mod target;
pub mod types;
pub mod units;

/// Re-exports of commonly used types
pub mod prelude {
    // Configuration
    pub use crate::config::{ConfigStore, ResourceEntry, ResourceItem, TargetConfig};
    pub use crate::target::DeploymentTarget;

    // Collaborators
    pub use crate::chain::{
        ChainClient, Constructed, Factory, JsonRpcClient, Registry, UnitHandle,
        VerificationRequest,
    };

    // Errors
    pub use crate::error::{DeployError, RemoteError, RemoteResult, Warning, WarningKind};

    // State
    pub use crate::state::{DeploymentRecord, DeploymentState, StateStore};

    // Orchestration
    pub use crate::orchestration::{Orchestrator, Phase, RunError, RunReport, RunState};

    // Reports
    pub use crate::plan::{DeploymentPlan, plan};
    pub use crate::status::{StatusReport, collect_status};

    // Domain types
    pub use crate::types::{Address, Amount, FeeOverrides, TxHash};
    pub use crate::units::{Capability, UnitId, UnitKind, UnitSpec};
}
