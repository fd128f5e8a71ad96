//! Supported deployment targets.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Closed set of networks a run can be pointed at.
///
/// Each target resolves to `<config-dir>/<name>.toml`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DeploymentTarget {
    Localhost,
    Arbitrum,
    Holesky,
    Linea,
    Mainnet,
    Mantle,
    Optimism,
    PolygonZkEvm,
    ArbitrumFork,
    CoreTestnet,
    BitFinity,
    BotanixTestnet,
}

impl DeploymentTarget {
    pub const ALL: [DeploymentTarget; 12] = [
        DeploymentTarget::Localhost,
        DeploymentTarget::Arbitrum,
        DeploymentTarget::Holesky,
        DeploymentTarget::Linea,
        DeploymentTarget::Mainnet,
        DeploymentTarget::Mantle,
        DeploymentTarget::Optimism,
        DeploymentTarget::PolygonZkEvm,
        DeploymentTarget::ArbitrumFork,
        DeploymentTarget::CoreTestnet,
        DeploymentTarget::BitFinity,
        DeploymentTarget::BotanixTestnet,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            DeploymentTarget::Localhost => "localhost",
            DeploymentTarget::Arbitrum => "arbitrum",
            DeploymentTarget::Holesky => "holesky",
            DeploymentTarget::Linea => "linea",
            DeploymentTarget::Mainnet => "mainnet",
            DeploymentTarget::Mantle => "mantle",
            DeploymentTarget::Optimism => "optimism",
            DeploymentTarget::PolygonZkEvm => "polygon-zkevm",
            DeploymentTarget::ArbitrumFork => "arbitrum-fork",
            DeploymentTarget::CoreTestnet => "core-testnet",
            DeploymentTarget::BitFinity => "bitfinity",
            DeploymentTarget::BotanixTestnet => "botanix-testnet",
        }
    }

    pub fn is_localhost(&self) -> bool {
        matches!(self, DeploymentTarget::Localhost)
    }

    /// Test networks get short timelock delays and the softening call.
    pub fn is_testnet(&self) -> bool {
        matches!(
            self,
            DeploymentTarget::Localhost
                | DeploymentTarget::Holesky
                | DeploymentTarget::CoreTestnet
                | DeploymentTarget::BitFinity
                | DeploymentTarget::BotanixTestnet
        )
    }

    /// File name of the target's configuration.
    pub fn config_file_name(&self) -> String {
        format!("{}.toml", self.as_str())
    }
}

impl fmt::Display for DeploymentTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DeploymentTarget {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        Self::ALL
            .iter()
            .copied()
            .find(|target| target.as_str() == wanted)
            .ok_or_else(|| {
                let known: Vec<&str> = Self::ALL.iter().map(|t| t.as_str()).collect();
                anyhow::anyhow!(
                    "Unknown deployment target: {}. Expected one of: {}",
                    s,
                    known.join(", ")
                )
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_every_target_name() {
        for target in DeploymentTarget::ALL {
            assert_eq!(target.as_str().parse::<DeploymentTarget>().unwrap(), target);
        }
    }

    #[test]
    fn rejects_unknown_target() {
        let err = "goerli".parse::<DeploymentTarget>().unwrap_err();
        assert!(err.to_string().contains("botanix-testnet"));
    }

    #[test]
    fn classifies_testnets() {
        assert!(DeploymentTarget::BotanixTestnet.is_testnet());
        assert!(DeploymentTarget::Localhost.is_testnet());
        assert!(!DeploymentTarget::Mainnet.is_testnet());
        assert!(!DeploymentTarget::Arbitrum.is_testnet());
    }
}
