//! The operation surface of a provisioned unit.

use async_trait::async_trait;

use crate::error::{RemoteError, RemoteResult};
use crate::types::{Address, Amount, Bytes, FeeOverrides, TxHash};
use crate::units::DebtTokenMinters;

/// Oracle registered for an asset on the price feed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OracleRecord {
    pub oracle_address: Address,
    /// Zero when nothing is registered
    pub decimals: u8,
}

impl OracleRecord {
    pub fn is_set(&self) -> bool {
        self.decimals != 0
    }
}

/// Arguments of `PriceFeed.setOracle`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OracleRegistration {
    pub asset: Address,
    pub oracle: Address,
    pub provider_type: u8,
    pub timeout_seconds: u64,
    pub is_eth_indexed: bool,
    pub is_fallback: bool,
}

/// Arguments of `AdminContract.setCollateralParameters`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollateralParameters {
    pub asset: Address,
    pub borrowing_fee: Amount,
    pub ccr: Amount,
    pub mcr: Amount,
    pub min_net_debt: Amount,
    pub mint_cap: Amount,
    pub percent_divisor: Amount,
    pub redemption_fee_floor: Amount,
}

/// Handle to one live unit.
///
/// Only `name` and `address` are universal. Every other operation belongs to
/// a [`Capability`](crate::units::Capability) or a specific unit, and the
/// default body reports it as unsupported. Write operations return the
/// submitted transaction; the caller waits for confirmation.
#[async_trait]
pub trait UnitHandle: Send + Sync {
    fn name(&self) -> &str;

    fn address(&self) -> &Address;

    fn unsupported(&self, operation: &'static str) -> RemoteError {
        RemoteError::Unsupported {
            unit: self.name().to_string(),
            operation,
        }
    }

    async fn is_address_setup_initialized(&self) -> RemoteResult<bool> {
        Err(self.unsupported("isAddressSetupInitialized"))
    }

    async fn set_addresses(
        &self,
        _addresses: &[Address],
        _fees: &FeeOverrides,
    ) -> RemoteResult<TxHash> {
        Err(self.unsupported("setAddresses"))
    }

    async fn owner(&self) -> RemoteResult<Address> {
        Err(self.unsupported("owner"))
    }

    async fn transfer_ownership(
        &self,
        _to: &Address,
        _fees: &FeeOverrides,
    ) -> RemoteResult<TxHash> {
        Err(self.unsupported("transferOwnership"))
    }

    async fn is_setup_initialized(&self) -> RemoteResult<bool> {
        Err(self.unsupported("isSetupInitialized"))
    }

    async fn set_setup_is_initialized(&self, _fees: &FeeOverrides) -> RemoteResult<TxHash> {
        Err(self.unsupported("setSetupIsInitialized"))
    }

    // DebtToken

    async fn set_minters(
        &self,
        _minters: &DebtTokenMinters,
        _fees: &FeeOverrides,
    ) -> RemoteResult<TxHash> {
        Err(self.unsupported("setAddresses(minters)"))
    }

    async fn add_whitelist(
        &self,
        _account: &Address,
        _fees: &FeeOverrides,
    ) -> RemoteResult<TxHash> {
        Err(self.unsupported("addWhitelist"))
    }

    // Timelock

    async fn set_softening(
        &self,
        _target: &Address,
        _signature: &str,
        _data: &Bytes,
        _fees: &FeeOverrides,
    ) -> RemoteResult<TxHash> {
        Err(self.unsupported("setSoftening"))
    }

    // TroveManagerOperations

    /// Calldata of `setRedemptionSofteningParam(param)`.
    async fn encode_redemption_softening(&self, _param: u64) -> RemoteResult<Bytes> {
        Err(self.unsupported("setRedemptionSofteningParam"))
    }

    // PriceFeed

    async fn oracle_record(&self, _asset: &Address) -> RemoteResult<OracleRecord> {
        Err(self.unsupported("oracles"))
    }

    async fn set_oracle(
        &self,
        _registration: &OracleRegistration,
        _fees: &FeeOverrides,
    ) -> RemoteResult<TxHash> {
        Err(self.unsupported("setOracle"))
    }

    // AdminContract

    async fn mcr(&self, _asset: &Address) -> RemoteResult<Amount> {
        Err(self.unsupported("getMcr"))
    }

    async fn add_new_collateral(
        &self,
        _asset: &Address,
        _gas_compensation: Amount,
        _decimals: u8,
        _fees: &FeeOverrides,
    ) -> RemoteResult<TxHash> {
        Err(self.unsupported("addNewCollateral"))
    }

    async fn is_active(&self, _asset: &Address) -> RemoteResult<bool> {
        Err(self.unsupported("getIsActive"))
    }

    async fn percent_divisor_default(&self) -> RemoteResult<Amount> {
        Err(self.unsupported("PERCENT_DIVISOR_DEFAULT"))
    }

    async fn redemption_fee_floor_default(&self) -> RemoteResult<Amount> {
        Err(self.unsupported("REDEMPTION_FEE_FLOOR_DEFAULT"))
    }

    async fn borrowing_fee_default(&self) -> RemoteResult<Amount> {
        Err(self.unsupported("BORROWING_FEE_DEFAULT"))
    }

    async fn set_collateral_parameters(
        &self,
        _params: &CollateralParameters,
        _fees: &FeeOverrides,
    ) -> RemoteResult<TxHash> {
        Err(self.unsupported("setCollateralParameters"))
    }

    async fn set_redemption_block_timestamp(
        &self,
        _asset: &Address,
        _timestamp: u64,
        _fees: &FeeOverrides,
    ) -> RemoteResult<TxHash> {
        Err(self.unsupported("setRedemptionBlockTimestamp"))
    }
}
