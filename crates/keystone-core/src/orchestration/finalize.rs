//! Optional late-stage steps: ownership hand-off, source verification and
//! setup initialization.

use std::sync::Arc;

use url::Url;

use crate::chain::{ChainClient, Registry, VerificationRequest};
use crate::error::{DeployError, RemoteError, Warning, WarningKind};
use crate::types::Address;
use crate::units::{Capability, UnitSpec};

use super::{RunState, confirm};

/// Marker stored for a verified unit: `<base>/<address>#code`.
pub fn verification_marker(base: &Url, address: &Address) -> Result<Url, url::ParseError> {
    Url::parse(&format!(
        "{}/{}#code",
        base.as_str().trim_end_matches('/'),
        address
    ))
}

pub struct Finalizer {
    chain: Arc<dyn ChainClient>,
    registry: Option<Arc<dyn Registry>>,
}

impl Finalizer {
    pub fn new(chain: Arc<dyn ChainClient>, registry: Option<Arc<dyn Registry>>) -> Self {
        Self { chain, registry }
    }

    /// Transfer every ownable unit to `target`.
    ///
    /// Units already owned by `target` are left alone; a failed transfer is a
    /// warning and the remaining units are still processed.
    pub async fn transfer_ownerships(
        &self,
        state: &mut RunState,
        target: &Address,
    ) -> Result<(), DeployError> {
        tracing::info!(%target, "Transferring contract ownerships");

        let specs = state.specs().to_vec();
        for spec in &specs {
            let unit = spec.artifact;
            if !spec.has(Capability::Ownable) {
                tracing::debug!(unit, "Not ownable");
                continue;
            }
            let handle = state.handle(spec.id)?;

            let current = match handle.owner().await {
                Ok(owner) => owner,
                Err(e) => {
                    state.warn(Warning::new(
                        WarningKind::Ownership,
                        unit,
                        format!("Unable to read owner: {e}"),
                    ));
                    continue;
                }
            };
            if current == *target {
                tracing::info!(unit, owner = %target, "Owner had already been set");
                continue;
            }

            let result = confirm(
                self.chain.as_ref(),
                handle.transfer_ownership(target, state.fees()).await,
                state.confirmations(),
            )
            .await;
            match result {
                Ok(_) => tracing::info!(unit, owner = %target, "Ownership transferred"),
                Err(e) => state.warn(Warning::new(
                    WarningKind::Ownership,
                    unit,
                    format!("transferOwnership failed (owner = {current}): {e}"),
                )),
            }
        }
        Ok(())
    }

    /// Publish the source of every recorded, not yet verified unit.
    ///
    /// Skipped entirely without a registry or an explorer URL. A failure
    /// leaves the marker unset so a later run retries.
    pub async fn verify_all(&self, state: &mut RunState) -> Result<(), DeployError> {
        let Some(registry) = &self.registry else {
            tracing::info!("No verification registry configured, skipping verification");
            return Ok(());
        };
        let Some(base) = state.config().explorer_base_url.clone() else {
            tracing::info!("No explorer_base_url configured, skipping verification");
            return Ok(());
        };

        let specs = state.specs().to_vec();
        for spec in &specs {
            self.verify(state, registry.as_ref(), &base, spec).await?;
        }
        Ok(())
    }

    async fn verify(
        &self,
        state: &mut RunState,
        registry: &dyn Registry,
        base: &Url,
        spec: &UnitSpec,
    ) -> Result<(), DeployError> {
        let unit = spec.record_key();
        let Some(record) = state.records().get(unit) else {
            tracing::warn!(unit, "No deployment state for contract, not verifying");
            return Ok(());
        };
        let Some(address) = record.address else {
            tracing::warn!(unit, "No recorded address, not verifying");
            return Ok(());
        };
        if record.is_verified() {
            tracing::debug!(unit, "Already verified");
            return Ok(());
        }

        let request = VerificationRequest {
            unit: unit.to_string(),
            address,
            constructor_args: spec.params.clone(),
        };
        match registry.publish(&request).await {
            Ok(()) => {}
            Err(RemoteError::AlreadyVerified) => {
                tracing::info!(unit, %address, "Registry reports contract already verified");
            }
            Err(e) => {
                state.warn(Warning::new(
                    WarningKind::Verification,
                    unit,
                    format!("Error verifying: {e}"),
                ));
                return Ok(());
            }
        }

        match verification_marker(base, &address) {
            Ok(marker) => {
                tracing::info!(unit, %marker, "Verified");
                state.mark_verified(unit, marker)?;
            }
            Err(e) => state.warn(Warning::new(
                WarningKind::Verification,
                unit,
                format!("Invalid verification URL: {e}"),
            )),
        }
        Ok(())
    }

    /// Set `isSetupInitialized` on every unit that carries the flag.
    pub async fn initialize_setup(&self, state: &mut RunState) -> Result<(), DeployError> {
        let specs = state.specs().to_vec();
        for spec in specs.iter().filter(|s| s.has(Capability::SetupInitialization)) {
            let unit = spec.artifact;
            let handle = state.handle(spec.id)?;
            let step = format!("{unit}.setSetupIsInitialized()");

            let initialized = handle
                .is_setup_initialized()
                .await
                .map_err(|e| DeployError::remote(step.clone(), e))?;
            if initialized {
                tracing::info!(unit, "Already initialized");
                continue;
            }

            confirm(
                self.chain.as_ref(),
                handle.set_setup_is_initialized(state.fees()).await,
                state.confirmations(),
            )
            .await
            .map_err(|e| DeployError::remote(step, e))?;
            tracing::info!(unit, "Setup has been initialized");
        }
        Ok(())
    }
}
