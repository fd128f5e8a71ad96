//! Config store for locating and loading `<target>.toml`.

use std::path::{Path, PathBuf};

use crate::error::DeployError;
use crate::target::DeploymentTarget;

use super::{TargetConfig, parser};

/// Environment variable that overrides the configured deployer address.
pub const DEPLOYER_ENV: &str = "KEYSTONE_DEPLOYER";

/// Directory holding one configuration file per deployment target.
#[derive(Debug, Clone)]
pub struct ConfigStore {
    config_dir: PathBuf,
}

impl ConfigStore {
    pub fn new(config_dir: impl Into<PathBuf>) -> Self {
        Self {
            config_dir: config_dir.into(),
        }
    }

    pub fn config_dir(&self) -> &Path {
        &self.config_dir
    }

    pub fn config_path(&self, target: DeploymentTarget) -> PathBuf {
        self.config_dir.join(target.config_file_name())
    }

    /// Load and validate the target's configuration.
    ///
    /// Honors [`DEPLOYER_ENV`]. Every failure is a [`DeployError::Config`] so
    /// that a run aborts before any remote call.
    pub fn load(&self, target: DeploymentTarget) -> Result<TargetConfig, DeployError> {
        let deployer = std::env::var(DEPLOYER_ENV)
            .ok()
            .filter(|value| !value.trim().is_empty());
        self.load_with_deployer(target, deployer.as_deref())
    }

    pub fn load_with_deployer(
        &self,
        target: DeploymentTarget,
        deployer_override: Option<&str>,
    ) -> Result<TargetConfig, DeployError> {
        let path = self.config_path(target);
        if !path.exists() {
            return Err(DeployError::Config(format!(
                "No configuration for target {} (expected {})",
                target,
                path.display()
            )));
        }

        let file = parser::parse_target_toml(&path)
            .map_err(|e| DeployError::Config(format!("{e:#}")))?;
        file.validate(target, &self.config_dir, deployer_override)
    }
}
