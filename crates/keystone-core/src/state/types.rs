//! Deployment record types

use std::collections::BTreeMap;
use std::fmt::Display;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, de};
use url::Url;

use crate::types::{Address, TxHash};

/// What is known about one provisioned unit.
///
/// A present `address` is trusted as live without re-validation. Blank
/// strings in the file read as absent, so `"address": ""` means the unit
/// still has to be constructed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeploymentRecord {
    #[serde(
        default,
        deserialize_with = "blank_as_none",
        skip_serializing_if = "Option::is_none"
    )]
    pub address: Option<Address>,

    /// Implementation behind a proxy; best effort
    #[serde(
        default,
        deserialize_with = "blank_as_none",
        skip_serializing_if = "Option::is_none"
    )]
    pub impl_address: Option<Address>,

    #[serde(
        default,
        deserialize_with = "blank_as_none",
        skip_serializing_if = "Option::is_none"
    )]
    pub tx_hash: Option<TxHash>,

    /// Registry page of the verified source
    #[serde(
        default,
        deserialize_with = "blank_as_none",
        skip_serializing_if = "Option::is_none"
    )]
    pub verification: Option<Url>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deployed_at: Option<DateTime<Utc>>,
}

impl DeploymentRecord {
    pub fn is_verified(&self) -> bool {
        self.verification.is_some()
    }
}

fn blank_as_none<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: FromStr,
    T::Err: Display,
{
    match Option::<String>::deserialize(deserializer)? {
        Some(raw) if !raw.trim().is_empty() => {
            raw.trim().parse().map(Some).map_err(de::Error::custom)
        }
        _ => Ok(None),
    }
}

/// All records of a target, keyed by artifact name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DeploymentState {
    records: BTreeMap<String, DeploymentRecord>,
}

impl DeploymentState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<&DeploymentRecord> {
        self.records.get(key)
    }

    /// Recorded address of `key`, if any.
    pub fn address(&self, key: &str) -> Option<&Address> {
        self.records.get(key).and_then(|r| r.address.as_ref())
    }

    /// Insert or replace a record.
    ///
    /// A replacement keeps an existing verification marker when the new
    /// record has none and points at the same address.
    pub fn upsert(&mut self, key: impl Into<String>, mut record: DeploymentRecord) {
        let key = key.into();
        if record.verification.is_none() {
            if let Some(existing) = self.records.get(&key) {
                if existing.address == record.address {
                    record.verification = existing.verification.clone();
                }
            }
        }
        self.records.insert(key, record);
    }

    /// Store a verification marker on an existing record.
    ///
    /// Returns `false` when nothing is recorded under `key`.
    pub fn mark_verified(&mut self, key: &str, marker: Url) -> bool {
        match self.records.get_mut(key) {
            Some(record) => {
                record.verification = Some(marker);
                true
            }
            None => false,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &DeploymentRecord)> {
        self.records.iter()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
