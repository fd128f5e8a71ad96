//! Remote collaborators consumed by a deployment run
//!
//! The chain client, the unit factory and the verification registry are
//! traits so that a run can be driven against a live node or in-memory fakes.

pub mod rpc;
pub mod unit;

use std::sync::Arc;

use alloy::primitives::b256;
use async_trait::async_trait;

use crate::error::RemoteResult;
use crate::types::{
    Address, Amount, B256, BlockInfo, BlockTag, FeeEstimate, FeeOverrides, Receipt, TxHash,
    TxRequest,
};
use crate::units::{ConstructorArg, UnitSpec};

pub use rpc::JsonRpcClient;
pub use unit::{CollateralParameters, OracleRecord, OracleRegistration, UnitHandle};

/// EIP-1967 storage slot holding a proxy's implementation address.
pub const IMPLEMENTATION_SLOT: B256 =
    b256!("0x360894a13ba1a3210667c828492db98dca3e2076cc3735a920a3ca505d382bbc");

/// Network access: balances, fees, transactions and reads.
#[async_trait]
pub trait ChainClient: Send + Sync {
    async fn balance(&self, address: &Address) -> RemoteResult<Amount>;

    async fn fee_estimate(&self) -> RemoteResult<FeeEstimate>;

    async fn submit(&self, tx: &TxRequest) -> RemoteResult<TxHash>;

    /// Wait until `tx` is mined with `confirmations` blocks on top.
    ///
    /// A wait that exceeds the client's limit fails with
    /// [`RemoteError::Timeout`](crate::error::RemoteError::Timeout).
    async fn wait(&self, tx: &TxHash, confirmations: u64) -> RemoteResult<Receipt>;

    async fn block(&self, tag: BlockTag) -> RemoteResult<BlockInfo>;

    /// Raw 32-byte storage word at `slot`.
    async fn storage_at(&self, address: &Address, slot: B256) -> RemoteResult<B256>;
}

/// A freshly submitted unit and its creation transaction.
pub struct Constructed {
    pub handle: Arc<dyn UnitHandle>,
    pub tx: TxHash,
}

/// Builds unit handles, either by creating a new instance or by binding to
/// an existing address.
#[async_trait]
pub trait Factory: Send + Sync {
    /// Submit the creation of `spec` (and its proxy and initializer call when
    /// upgradeable). Confirmation is awaited by the caller.
    async fn construct(&self, spec: &UnitSpec, fees: &FeeOverrides) -> RemoteResult<Constructed>;

    /// Bind to a live instance. No transaction is sent.
    async fn attach(&self, spec: &UnitSpec, address: &Address) -> RemoteResult<Arc<dyn UnitHandle>>;
}

/// Source verification request for one unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerificationRequest {
    pub unit: String,
    pub address: Address,
    pub constructor_args: Vec<ConstructorArg>,
}

/// Block explorer that publishes unit sources.
#[async_trait]
pub trait Registry: Send + Sync {
    /// Publish the source of `request.address`.
    ///
    /// Fails with [`RemoteError::AlreadyVerified`](crate::error::RemoteError::AlreadyVerified)
    /// when the explorer already knows it.
    async fn publish(&self, request: &VerificationRequest) -> RemoteResult<()>;
}
