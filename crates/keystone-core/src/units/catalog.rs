//! The fixed unit catalog for a target.

use crate::config::TargetConfig;

use super::{Capability, ConstructorArg, UnitId, UnitKind, UnitSpec};

/// Timelock delay on production networks (2 days).
pub const TIMELOCK_DELAY_SECS: u64 = 2 * 86_400;

/// Timelock delay on test networks (5 minutes).
pub const TESTNET_TIMELOCK_DELAY_SECS: u64 = 5 * 60;

const PROXY: &[Capability] = &[Capability::AddressSetup, Capability::Ownable];
const ADMIN: &[Capability] = &[
    Capability::AddressSetup,
    Capability::Ownable,
    Capability::SetupInitialization,
];
const DEBT_TOKEN: &[Capability] = &[Capability::Ownable];
const PLAIN: &[Capability] = &[];

const PROXY_INITIALIZER: &str = "initialize()";

/// Units in provisioning order.
///
/// Every unit that others are wired to is listed before the wiring phase
/// needs it; the order is stable so a resumed run walks the same sequence.
pub fn catalog(config: &TargetConfig) -> Vec<UnitSpec> {
    let target = config.target;
    let mut units = vec![
        proxy(UnitId::ActivePool, "ActivePool", PROXY),
        proxy(UnitId::AdminContract, "AdminContract", ADMIN),
        proxy(UnitId::BorrowerOperations, "BorrowerOperations", PROXY),
        proxy(UnitId::CollSurplusPool, "CollSurplusPool", PROXY),
        proxy(UnitId::DefaultPool, "DefaultPool", PROXY),
        proxy(UnitId::FeeCollector, "FeeCollector", PROXY),
        proxy(UnitId::SortedTroves, "SortedTroves", PROXY),
        proxy(UnitId::StabilityPool, "StabilityPool", PROXY),
        proxy(UnitId::TroveManager, "TroveManager", PROXY),
        proxy(UnitId::TroveManagerOperations, "TroveManagerOperations", PROXY),
        plain(UnitId::GasPool, "GasPool", Vec::new(), PLAIN),
    ];

    if target.is_localhost() {
        units.push(plain(UnitId::PriceFeed, "PriceFeedTestnet", Vec::new(), PLAIN));
    } else {
        units.push(proxy(UnitId::PriceFeed, "PriceFeed", PROXY));
    }

    let (timelock_artifact, delay) = if target.is_testnet() {
        ("TimelockTester", TESTNET_TIMELOCK_DELAY_SECS)
    } else {
        ("Timelock", TIMELOCK_DELAY_SECS)
    };
    units.push(plain(
        UnitId::Timelock,
        timelock_artifact,
        vec![
            ConstructorArg::Uint(delay),
            ConstructorArg::Address(config.system_params_admin),
        ],
        PLAIN,
    ));

    let mut debt_token = plain(UnitId::DebtToken, "DebtToken", Vec::new(), DEBT_TOKEN);
    if let Some(address) = &config.debt_token_address {
        debt_token.kind = UnitKind::Attachable(*address);
    }
    units.push(debt_token);

    units
}

fn proxy(id: UnitId, artifact: &'static str, capabilities: &'static [Capability]) -> UnitSpec {
    UnitSpec {
        id,
        artifact,
        kind: UnitKind::Fresh,
        upgradeable: true,
        initializer: Some(PROXY_INITIALIZER),
        params: Vec::new(),
        capabilities,
    }
}

fn plain(
    id: UnitId,
    artifact: &'static str,
    params: Vec<ConstructorArg>,
    capabilities: &'static [Capability],
) -> UnitSpec {
    UnitSpec {
        id,
        artifact,
        kind: UnitKind::Fresh,
        upgradeable: false,
        initializer: None,
        params,
        capabilities,
    }
}
