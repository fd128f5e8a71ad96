//! Address lists handed to units during wiring.

use crate::error::DeployError;
use crate::types::Address;

use super::UnitId;

/// Every core address a unit learns during generic wiring.
///
/// The fields are named locally; [`AddressBook::ordered`] produces the
/// positional list the units expect on the wire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddressBook {
    pub active_pool: Address,
    pub admin_contract: Address,
    pub borrower_operations: Address,
    pub coll_surplus_pool: Address,
    pub debt_token: Address,
    pub default_pool: Address,
    pub fee_collector: Address,
    pub gas_pool: Address,
    pub price_feed: Address,
    pub sorted_troves: Address,
    pub stability_pool: Address,
    pub timelock: Address,
    pub treasury: Address,
    pub trove_manager: Address,
    pub trove_manager_operations: Address,
}

/// The three units allowed to mint and burn the debt token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DebtTokenMinters {
    pub borrower_operations: Address,
    pub stability_pool: Address,
    pub trove_manager: Address,
}

impl AddressBook {
    /// Collect unit addresses through `lookup` and validate them.
    pub fn resolve<F>(lookup: F, treasury: &Address) -> Result<Self, DeployError>
    where
        F: Fn(UnitId) -> Result<Address, DeployError>,
    {
        let book = Self {
            active_pool: lookup(UnitId::ActivePool)?,
            admin_contract: lookup(UnitId::AdminContract)?,
            borrower_operations: lookup(UnitId::BorrowerOperations)?,
            coll_surplus_pool: lookup(UnitId::CollSurplusPool)?,
            debt_token: lookup(UnitId::DebtToken)?,
            default_pool: lookup(UnitId::DefaultPool)?,
            fee_collector: lookup(UnitId::FeeCollector)?,
            gas_pool: lookup(UnitId::GasPool)?,
            price_feed: lookup(UnitId::PriceFeed)?,
            sorted_troves: lookup(UnitId::SortedTroves)?,
            stability_pool: lookup(UnitId::StabilityPool)?,
            timelock: lookup(UnitId::Timelock)?,
            treasury: *treasury,
            trove_manager: lookup(UnitId::TroveManager)?,
            trove_manager_operations: lookup(UnitId::TroveManagerOperations)?,
        };
        book.validate()?;
        Ok(book)
    }

    fn entries(&self) -> [(&'static str, &Address); 15] {
        [
            ("ActivePool", &self.active_pool),
            ("AdminContract", &self.admin_contract),
            ("BorrowerOperations", &self.borrower_operations),
            ("CollSurplusPool", &self.coll_surplus_pool),
            ("DebtToken", &self.debt_token),
            ("DefaultPool", &self.default_pool),
            ("FeeCollector", &self.fee_collector),
            ("GasPool", &self.gas_pool),
            ("PriceFeed", &self.price_feed),
            ("SortedTroves", &self.sorted_troves),
            ("StabilityPool", &self.stability_pool),
            ("Timelock", &self.timelock),
            ("treasury", &self.treasury),
            ("TroveManager", &self.trove_manager),
            ("TroveManagerOperations", &self.trove_manager_operations),
        ]
    }

    fn validate(&self) -> Result<(), DeployError> {
        for (unit, address) in self.entries() {
            if address.is_zero() {
                return Err(DeployError::InvalidAddress {
                    unit: unit.to_string(),
                    address: *address,
                });
            }
        }
        Ok(())
    }

    /// Positional list in the order `setAddresses(address[])` expects.
    pub fn ordered(&self) -> Vec<Address> {
        self.entries()
            .into_iter()
            .map(|(_, address)| *address)
            .collect()
    }

    pub fn minters(&self) -> DebtTokenMinters {
        DebtTokenMinters {
            borrower_operations: self.borrower_operations,
            stability_pool: self.stability_pool,
            trove_manager: self.trove_manager,
        }
    }
}
