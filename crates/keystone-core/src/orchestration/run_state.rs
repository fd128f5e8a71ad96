//! In-memory state of one run.

use std::collections::BTreeMap;
use std::sync::Arc;

use url::Url;

use crate::chain::UnitHandle;
use crate::config::TargetConfig;
use crate::error::{DeployError, Warning};
use crate::state::{DeploymentRecord, DeploymentState, StateStore};
use crate::types::FeeOverrides;
use crate::units::{AddressBook, UnitId, UnitSpec, catalog};

/// Records, handles and resolved configuration of a run.
///
/// Owned by the orchestrator and lent to one phase at a time. Every record
/// mutation rewrites the whole state file before returning, so an
/// interrupted run loses at most the step in flight.
pub struct RunState {
    config: TargetConfig,
    specs: Vec<UnitSpec>,
    store: StateStore,
    records: DeploymentState,
    handles: BTreeMap<UnitId, Arc<dyn UnitHandle>>,
    fees: FeeOverrides,
    warnings: Vec<Warning>,
}

impl RunState {
    /// Load the target's state file (empty when missing) and its catalog.
    pub fn load(config: TargetConfig, fees: FeeOverrides) -> Result<Self, DeployError> {
        let store = StateStore::new(&config.output_file);
        let records = store.load()?;
        if !records.is_empty() {
            tracing::info!(
                path = %store.path().display(),
                records = records.len(),
                "Loaded previous deployment"
            );
        }
        Ok(Self::from_parts(config, store, records, fees))
    }

    pub fn from_parts(
        config: TargetConfig,
        store: StateStore,
        records: DeploymentState,
        fees: FeeOverrides,
    ) -> Self {
        let specs = catalog(&config);
        Self {
            config,
            specs,
            store,
            records,
            handles: BTreeMap::new(),
            fees,
            warnings: Vec::new(),
        }
    }

    pub fn config(&self) -> &TargetConfig {
        &self.config
    }

    pub fn specs(&self) -> &[UnitSpec] {
        &self.specs
    }

    pub fn records(&self) -> &DeploymentState {
        &self.records
    }

    pub fn fees(&self) -> &FeeOverrides {
        &self.fees
    }

    pub fn confirmations(&self) -> u64 {
        self.config.tx_confirmations
    }

    pub fn warnings(&self) -> &[Warning] {
        &self.warnings
    }

    pub fn take_warnings(&mut self) -> Vec<Warning> {
        std::mem::take(&mut self.warnings)
    }

    /// Log a non-fatal problem and keep it for the run report.
    pub fn warn(&mut self, warning: Warning) {
        tracing::warn!(
            subject = %warning.subject,
            kind = ?warning.kind,
            "{}",
            warning.message
        );
        self.warnings.push(warning);
    }

    pub fn handle(&self, id: UnitId) -> Result<Arc<dyn UnitHandle>, DeployError> {
        self.handles
            .get(&id)
            .cloned()
            .ok_or_else(|| DeployError::MissingUnit(id.to_string()))
    }

    pub fn handles(&self) -> impl Iterator<Item = (&UnitId, &Arc<dyn UnitHandle>)> {
        self.handles.iter()
    }

    pub fn insert_handle(&mut self, id: UnitId, handle: Arc<dyn UnitHandle>) {
        self.handles.insert(id, handle);
    }

    /// Store a record and persist the whole state.
    pub fn record(&mut self, key: &str, record: DeploymentRecord) -> Result<(), DeployError> {
        self.records.upsert(key, record);
        self.persist()
    }

    /// Store a verification marker and persist the whole state.
    pub fn mark_verified(&mut self, key: &str, marker: Url) -> Result<bool, DeployError> {
        if !self.records.mark_verified(key, marker) {
            return Ok(false);
        }
        self.persist()?;
        Ok(true)
    }

    fn persist(&self) -> Result<(), DeployError> {
        self.store.save(&self.records)?;
        tracing::debug!(path = %self.store.path().display(), "Saved deployment state");
        Ok(())
    }

    /// Addresses of every provisioned unit plus the treasury.
    pub fn address_book(&self) -> Result<AddressBook, DeployError> {
        AddressBook::resolve(
            |id| self.handle(id).map(|handle| *handle.address()),
            &self.config.treasury_wallet,
        )
    }
}
