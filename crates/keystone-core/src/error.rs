//! Error and warning types for deployment runs.

use serde::Serialize;
use thiserror::Error;

use crate::types::Address;

/// Failure reported by a remote collaborator (chain client, factory, unit, registry).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RemoteError {
    #[error("request timed out: {0}")]
    Timeout(String),

    #[error("transaction underpriced: {0}")]
    Underpriced(String),

    #[error("nonce conflict: {0}")]
    Nonce(String),

    #[error("transaction reverted: {0}")]
    Reverted(String),

    #[error("rpc error: {0}")]
    Rpc(String),

    #[error("already verified")]
    AlreadyVerified,

    #[error("{unit} does not support {operation}")]
    Unsupported {
        unit: String,
        operation: &'static str,
    },
}

impl RemoteError {
    /// Whether the failure may go away on its own (timeouts, fee and nonce races).
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            RemoteError::Timeout(_)
                | RemoteError::Underpriced(_)
                | RemoteError::Nonce(_)
                | RemoteError::Rpc(_)
        )
    }
}

pub type RemoteResult<T> = Result<T, RemoteError>;

/// Error that aborts a deployment run.
///
/// Durable state is left as of the last successful step, so the same target
/// can be run again to resume.
#[derive(Debug, Error)]
pub enum DeployError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("unable to deploy {unit} after {attempts} attempts: {source}")]
    Fatal {
        unit: String,
        attempts: u32,
        #[source]
        source: RemoteError,
    },

    #[error("wiring {unit} failed: {source}")]
    Wiring {
        unit: String,
        #[source]
        source: RemoteError,
    },

    #[error("{step} failed: {source}")]
    Remote {
        step: String,
        #[source]
        source: RemoteError,
    },

    #[error("invalid address for {unit}: {address}")]
    InvalidAddress { unit: String, address: Address },

    #[error("{0} has not been provisioned")]
    MissingUnit(String),

    #[error(transparent)]
    Storage(#[from] anyhow::Error),
}

impl DeployError {
    pub fn remote(step: impl Into<String>, source: RemoteError) -> Self {
        DeployError::Remote {
            step: step.into(),
            source,
        }
    }
}

/// Category of a non-fatal problem recorded during a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum WarningKind {
    ResourceConfig,
    Wiring,
    Softening,
    Ownership,
    Verification,
    Balance,
    SecondaryAddress,
    /// Recorded and configured addresses of a unit disagree
    AddressMismatch,
}

/// A problem that was logged and skipped rather than aborting the run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Warning {
    /// Unit or resource item the warning is about.
    pub subject: String,
    pub kind: WarningKind,
    pub message: String,
}

impl Warning {
    pub fn new(kind: WarningKind, subject: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            subject: subject.into(),
            kind,
            message: message.into(),
        }
    }
}
