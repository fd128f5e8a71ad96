//! State file persistence

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Context;

use super::DeploymentState;

/// Reads and writes the deployment state file of one target.
#[derive(Debug, Clone)]
pub struct StateStore {
    path: PathBuf,
}

impl StateStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the state file.
    ///
    /// Returns an empty state if the file doesn't exist.
    pub fn load(&self) -> anyhow::Result<DeploymentState> {
        if !self.path.exists() {
            return Ok(DeploymentState::new());
        }

        let bytes = fs::read(&self.path)
            .with_context(|| format!("Failed to read state file: {}", self.path.display()))?;
        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(DeploymentState::new());
        }
        serde_json::from_slice(&bytes)
            .with_context(|| format!("Failed to parse state file: {}", self.path.display()))
    }

    /// Save the whole state atomically (tmp + rename), pretty-printed.
    pub fn save(&self, state: &DeploymentState) -> anyhow::Result<()> {
        if let Some(dir) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create state directory: {}", dir.display()))?;
        }

        let bytes = serde_json::to_vec_pretty(state).context("Failed to serialize state")?;

        let mut tmp_path = self.path.clone().into_os_string();
        tmp_path.push(format!(".{}.tmp", std::process::id()));
        let tmp_path = PathBuf::from(tmp_path);

        fs::write(&tmp_path, bytes)
            .with_context(|| format!("Failed to write tmp state file: {}", tmp_path.display()))?;

        // Remove first for replace semantics on Windows
        if cfg!(windows) && self.path.exists() {
            fs::remove_file(&self.path).with_context(|| {
                format!("Failed to remove existing state file: {}", self.path.display())
            })?;
        }
        fs::rename(&tmp_path, &self.path)
            .with_context(|| format!("Failed to rename tmp state file: {}", tmp_path.display()))?;

        Ok(())
    }
}
