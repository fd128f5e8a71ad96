//! Tests for address wiring

mod support;

use keystone_core::config::TargetConfig;
use keystone_core::error::{DeployError, WarningKind};
use keystone_core::orchestration::{
    Provisioner, REDEMPTION_SOFTENING_PARAM, RetryPolicy, RunState, SOFTENING_GAS_LIMIT,
    WiringCoordinator,
};
use keystone_core::target::DeploymentTarget;
use keystone_core::units::UnitId;
use tempfile::TempDir;

use support::*;

async fn provisioned(world: &World, config: TargetConfig) -> RunState {
    let mut state = world.run_state(config);
    Provisioner::new(world.chain.clone(), world.factory.clone(), RetryPolicy::default())
        .provision_all(&mut state)
        .await
        .unwrap();
    world.log.clear();
    state
}

#[tokio::test]
async fn units_receive_ordered_address_list() {
    let tmp = TempDir::new().unwrap();
    let world = World::new();
    let mut state =
        provisioned(&world, test_config(tmp.path(), DeploymentTarget::BotanixTestnet)).await;

    WiringCoordinator::new(world.chain.clone())
        .wire(&mut state)
        .await
        .unwrap();

    let book = state.address_book().unwrap();
    let trove_manager = world.factory.unit("TroveManager");
    let received = trove_manager.data.lock().unwrap().addresses.clone();
    assert_eq!(received, book.ordered());
    assert_eq!(received.len(), 15);
    assert_eq!(received[12], addr(TREASURY));
    assert_eq!(received[4], book.debt_token);

    // Plain units have no setAddresses()
    assert_eq!(world.log.count_prefix("ActivePool.setAddresses"), 1);
    assert_eq!(world.log.count_prefix("GasPool."), 0);
    assert!(state.warnings().is_empty());
}

#[tokio::test]
async fn already_wired_unit_is_skipped() {
    let tmp = TempDir::new().unwrap();
    let world = World::new();
    let mut state =
        provisioned(&world, test_config(tmp.path(), DeploymentTarget::BotanixTestnet)).await;
    world.factory.unit("ActivePool").data.lock().unwrap().address_setup = true;

    WiringCoordinator::new(world.chain.clone())
        .wire(&mut state)
        .await
        .unwrap();

    assert_eq!(world.log.count("ActivePool.isAddressSetupInitialized"), 1);
    assert_eq!(world.log.count("ActivePool.setAddresses"), 0);
    assert_eq!(world.log.count("StabilityPool.setAddresses"), 1);
}

#[tokio::test]
async fn rewiring_sends_nothing_new() {
    let tmp = TempDir::new().unwrap();
    let world = World::new();
    let mut state =
        provisioned(&world, test_config(tmp.path(), DeploymentTarget::Mainnet)).await;
    let wiring = WiringCoordinator::new(world.chain.clone());

    wiring.wire(&mut state).await.unwrap();
    world.log.clear();
    wiring.wire(&mut state).await.unwrap();

    assert_eq!(world.log.count_prefix("ActivePool.setAddresses"), 0);
    assert_eq!(world.log.count_prefix("TroveManager.setAddresses"), 0);
}

#[tokio::test]
async fn non_critical_failure_is_a_warning() {
    let tmp = TempDir::new().unwrap();
    let world = World::new();
    let mut state =
        provisioned(&world, test_config(tmp.path(), DeploymentTarget::BotanixTestnet)).await;
    world.factory.unit("StabilityPool").fail_on("setAddresses");

    WiringCoordinator::new(world.chain.clone())
        .wire(&mut state)
        .await
        .unwrap();

    let warning = state
        .warnings()
        .iter()
        .find(|w| w.kind == WarningKind::Wiring)
        .unwrap();
    assert_eq!(warning.subject, "StabilityPool");
    // Later units are still wired
    assert_eq!(world.log.count("TroveManager.setAddresses"), 1);
    assert_eq!(world.log.count("DebtToken.setMinters"), 1);
}

#[tokio::test]
async fn debt_token_minters_and_whitelist() {
    let tmp = TempDir::new().unwrap();
    let world = World::new();
    let mut state =
        provisioned(&world, test_config(tmp.path(), DeploymentTarget::Mainnet)).await;

    WiringCoordinator::new(world.chain.clone())
        .wire(&mut state)
        .await
        .unwrap();

    let book = state.address_book().unwrap();
    let debt_token = world.factory.unit("DebtToken");
    let data = debt_token.data.lock().unwrap();
    assert_eq!(data.minters, Some(book.minters()));
    assert_eq!(data.whitelist, vec![book.fee_collector]);
}

#[tokio::test]
async fn debt_token_failure_is_fatal() {
    let tmp = TempDir::new().unwrap();
    let world = World::new();
    let mut state =
        provisioned(&world, test_config(tmp.path(), DeploymentTarget::BotanixTestnet)).await;
    world.factory.unit("DebtToken").fail_on("setMinters");

    let err = WiringCoordinator::new(world.chain.clone())
        .wire(&mut state)
        .await
        .unwrap_err();

    assert!(matches!(err, DeployError::Wiring { ref unit, .. } if unit == "DebtToken"));
    assert_eq!(world.log.count("DebtToken.addWhitelist"), 0);
}

#[tokio::test]
async fn softening_applied_on_testnet() {
    let tmp = TempDir::new().unwrap();
    let world = World::new();
    let mut state =
        provisioned(&world, test_config(tmp.path(), DeploymentTarget::BotanixTestnet)).await;

    WiringCoordinator::new(world.chain.clone())
        .wire(&mut state)
        .await
        .unwrap();

    let operations = state.handle(UnitId::TroveManagerOperations).unwrap();
    let timelock = world.factory.unit("TimelockTester");
    let (target, data, fees) = timelock.data.lock().unwrap().softening.clone().unwrap();
    assert_eq!(&target, operations.address());
    assert_eq!(data.as_ref(), REDEMPTION_SOFTENING_PARAM.to_be_bytes().as_slice());
    assert_eq!(fees.gas_limit, Some(SOFTENING_GAS_LIMIT));
}

#[tokio::test]
async fn softening_failure_is_a_warning() {
    let tmp = TempDir::new().unwrap();
    let world = World::new();
    let mut state =
        provisioned(&world, test_config(tmp.path(), DeploymentTarget::BotanixTestnet)).await;
    world.factory.unit("TimelockTester").fail_on("setSoftening");

    WiringCoordinator::new(world.chain.clone())
        .wire(&mut state)
        .await
        .unwrap();

    assert!(
        state
            .warnings()
            .iter()
            .any(|w| w.kind == WarningKind::Softening && w.subject == "Timelock")
    );
}

#[tokio::test]
async fn no_softening_on_mainnet() {
    let tmp = TempDir::new().unwrap();
    let world = World::new();
    let mut state =
        provisioned(&world, test_config(tmp.path(), DeploymentTarget::Mainnet)).await;

    WiringCoordinator::new(world.chain.clone())
        .wire(&mut state)
        .await
        .unwrap();

    assert_eq!(world.log.count_prefix("Timelock."), 0);
    assert_eq!(world.log.count_prefix("TroveManagerOperations.encode"), 0);
}
