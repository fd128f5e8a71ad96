//! Static descriptors of the units a deployment provisions.
//!
//! The set of units, their order and their capabilities are fixed per target
//! before a run starts; nothing is discovered at runtime.

pub mod address_book;
pub mod catalog;

use std::fmt;

use serde::Serialize;

use crate::types::Address;

pub use address_book::{AddressBook, DebtTokenMinters};
pub use catalog::{TESTNET_TIMELOCK_DELAY_SECS, TIMELOCK_DELAY_SECS, catalog};

/// Identity of a unit in the dependency graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum UnitId {
    ActivePool,
    AdminContract,
    BorrowerOperations,
    CollSurplusPool,
    DebtToken,
    DefaultPool,
    FeeCollector,
    GasPool,
    PriceFeed,
    SortedTroves,
    StabilityPool,
    Timelock,
    TroveManager,
    TroveManagerOperations,
}

impl UnitId {
    pub fn as_str(&self) -> &'static str {
        match self {
            UnitId::ActivePool => "ActivePool",
            UnitId::AdminContract => "AdminContract",
            UnitId::BorrowerOperations => "BorrowerOperations",
            UnitId::CollSurplusPool => "CollSurplusPool",
            UnitId::DebtToken => "DebtToken",
            UnitId::DefaultPool => "DefaultPool",
            UnitId::FeeCollector => "FeeCollector",
            UnitId::GasPool => "GasPool",
            UnitId::PriceFeed => "PriceFeed",
            UnitId::SortedTroves => "SortedTroves",
            UnitId::StabilityPool => "StabilityPool",
            UnitId::Timelock => "Timelock",
            UnitId::TroveManager => "TroveManager",
            UnitId::TroveManagerOperations => "TroveManagerOperations",
        }
    }
}

impl fmt::Display for UnitId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Whether a unit must be created or may reuse an existing instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UnitKind {
    Fresh,
    /// Reuse the instance already live at this address.
    Attachable(Address),
}

/// Operations a unit exposes beyond its address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Capability {
    /// `isAddressSetupInitialized` / `setAddresses(address[])`
    AddressSetup,
    /// `owner` / `transferOwnership`
    Ownable,
    /// `isSetupInitialized` / `setSetupIsInitialized`
    SetupInitialization,
}

/// A constructor argument passed to the factory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum ConstructorArg {
    Uint(u64),
    Address(Address),
}

/// Static descriptor of one unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnitSpec {
    pub id: UnitId,
    /// Artifact (contract) name; also the key of the unit's deployment record
    pub artifact: &'static str,
    pub kind: UnitKind,
    /// Deployed behind an upgradeable proxy with a resolvable implementation
    pub upgradeable: bool,
    /// Initializer invoked right after construction
    pub initializer: Option<&'static str>,
    pub params: Vec<ConstructorArg>,
    pub capabilities: &'static [Capability],
}

impl UnitSpec {
    pub fn has(&self, capability: Capability) -> bool {
        self.capabilities.contains(&capability)
    }

    /// Record key in the deployment state file.
    pub fn record_key(&self) -> &'static str {
        self.artifact
    }
}
