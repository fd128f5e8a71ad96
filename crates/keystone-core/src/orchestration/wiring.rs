//! Cross-registration of unit addresses.

use std::sync::Arc;

use crate::chain::{ChainClient, UnitHandle};
use crate::error::{DeployError, RemoteResult, Warning, WarningKind};
use crate::types::{Address, FeeOverrides};
use crate::units::{AddressBook, Capability, UnitId};

use super::{RunState, confirm};

/// `setRedemptionSofteningParam` value applied on test networks.
pub const REDEMPTION_SOFTENING_PARAM: u64 = 9_950;

/// Explicit gas limit of the softening call.
pub const SOFTENING_GAS_LIMIT: u64 = 500_000;

pub struct WiringCoordinator {
    chain: Arc<dyn ChainClient>,
}

impl WiringCoordinator {
    pub fn new(chain: Arc<dyn ChainClient>) -> Self {
        Self { chain }
    }

    /// Hand every unit the ordered address list, then apply the debt token
    /// and test-network specific wiring.
    ///
    /// A failed `setAddresses()` or softening call is a warning; a failed
    /// debt token minter or whitelist call aborts the run.
    pub async fn wire(&self, state: &mut RunState) -> Result<(), DeployError> {
        let book = state.address_book()?;
        let addresses = book.ordered();
        let fees = state.fees().clone();
        let confirmations = state.confirmations();

        let specs = state.specs().to_vec();
        for spec in &specs {
            let unit = spec.artifact;
            if !spec.has(Capability::AddressSetup) {
                tracing::debug!(unit, "No setAddresses() on this unit");
                continue;
            }

            let handle = state.handle(spec.id)?;
            match self
                .set_addresses(handle.as_ref(), &addresses, &fees, confirmations)
                .await
            {
                Ok(true) => tracing::info!(unit, "setAddresses() applied"),
                Ok(false) => tracing::info!(unit, "setAddresses() already set"),
                Err(e) => state.warn(Warning::new(
                    WarningKind::Wiring,
                    unit,
                    format!("setAddresses() failed: {e}"),
                )),
            }
        }

        self.wire_debt_token(state, &book, &fees, confirmations).await?;

        if state.config().target.is_testnet() {
            if let Err(e) = self.apply_softening(state, &book, &fees, confirmations).await {
                state.warn(Warning::new(
                    WarningKind::Softening,
                    UnitId::Timelock.as_str(),
                    format!("setSoftening failed, continuing deployment: {e}"),
                ));
            }
        }

        Ok(())
    }

    /// Returns `false` when the unit already knows its addresses.
    async fn set_addresses(
        &self,
        handle: &dyn UnitHandle,
        addresses: &[Address],
        fees: &FeeOverrides,
        confirmations: u64,
    ) -> RemoteResult<bool> {
        if handle.is_address_setup_initialized().await? {
            return Ok(false);
        }
        confirm(
            self.chain.as_ref(),
            handle.set_addresses(addresses, fees).await,
            confirmations,
        )
        .await?;
        Ok(true)
    }

    async fn wire_debt_token(
        &self,
        state: &RunState,
        book: &AddressBook,
        fees: &FeeOverrides,
        confirmations: u64,
    ) -> Result<(), DeployError> {
        let debt_token = state.handle(UnitId::DebtToken)?;
        let unit = UnitId::DebtToken.as_str();
        let minters = book.minters();

        tracing::info!(
            unit,
            borrower_operations = %minters.borrower_operations,
            stability_pool = %minters.stability_pool,
            trove_manager = %minters.trove_manager,
            "Setting DebtToken minters"
        );
        confirm(
            self.chain.as_ref(),
            debt_token.set_minters(&minters, fees).await,
            confirmations,
        )
        .await
        .map_err(|source| DeployError::Wiring {
            unit: unit.to_string(),
            source,
        })?;

        confirm(
            self.chain.as_ref(),
            debt_token.add_whitelist(&book.fee_collector, fees).await,
            confirmations,
        )
        .await
        .map_err(|source| DeployError::Wiring {
            unit: unit.to_string(),
            source,
        })?;
        tracing::info!(unit, account = %book.fee_collector, "Whitelisted FeeCollector");

        Ok(())
    }

    async fn apply_softening(
        &self,
        state: &RunState,
        book: &AddressBook,
        fees: &FeeOverrides,
        confirmations: u64,
    ) -> Result<(), DeployError> {
        let operations = state.handle(UnitId::TroveManagerOperations)?;
        let timelock = state.handle(UnitId::Timelock)?;

        let result = async {
            let data = operations
                .encode_redemption_softening(REDEMPTION_SOFTENING_PARAM)
                .await?;
            let fees = fees.with_gas_limit(SOFTENING_GAS_LIMIT);
            confirm(
                self.chain.as_ref(),
                timelock
                    .set_softening(&book.trove_manager_operations, "", &data, &fees)
                    .await,
                confirmations,
            )
            .await
        }
        .await;

        match result {
            Ok(_) => {
                tracing::info!(
                    timelock = %book.timelock,
                    param = REDEMPTION_SOFTENING_PARAM,
                    "Redemption softening applied"
                );
                Ok(())
            }
            Err(e) => Err(DeployError::remote("Timelock.setSoftening()", e)),
        }
    }
}
