//! Deployment phases and the run that composes them
//!
//! A run walks `Init -> Provisioning -> Wiring -> ResourceConfig ->
//! Finalize -> Done` over one exclusively owned [`RunState`]. Every phase is
//! safe to repeat: completed steps are detected and skipped, so a failed run
//! is recovered by running again.

pub mod finalize;
pub mod provision;
pub mod resources;
pub mod run_state;
pub mod runner;
pub mod wiring;

pub use finalize::Finalizer;
pub use provision::{ProvisionAction, Provisioner, RetryPolicy, UnitOutcome};
pub use resources::{CollateralOutcome, OracleOutcome, ResourceConfigurator, ResourceOutcome};
pub use run_state::RunState;
pub use runner::{Orchestrator, Phase, RunError, RunReport};
pub use wiring::{REDEMPTION_SOFTENING_PARAM, SOFTENING_GAS_LIMIT, WiringCoordinator};

use crate::chain::ChainClient;
use crate::error::RemoteResult;
use crate::types::{Receipt, TxHash};

/// Wait for a submitted transaction, logging the failure at its origin.
pub(crate) async fn confirm(
    chain: &dyn ChainClient,
    submitted: RemoteResult<TxHash>,
    confirmations: u64,
) -> RemoteResult<Receipt> {
    let result = match submitted {
        Ok(tx) => chain.wait(&tx, confirmations).await,
        Err(e) => Err(e),
    };
    if let Err(e) = &result {
        tracing::debug!(error = %e, transient = e.is_transient(), "Transaction failed");
    }
    result
}
