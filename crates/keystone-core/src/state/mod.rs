//! Durable deployment state
//!
//! One JSON file per target maps each unit's record key to what is known
//! about it on chain. The file is read whole at run start and rewritten whole
//! after every successful state-changing step.

pub mod store;
pub mod types;

pub use store::StateStore;
pub use types::{DeploymentRecord, DeploymentState};
