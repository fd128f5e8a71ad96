//! Shared primitive types used across configuration, state and the phases.
//!
//! Addresses and hashes are the `alloy` primitives; [`Amount`] wraps a
//! `U256` so configuration files can spell quantities with units.

use std::fmt;
use std::str::FromStr;

use alloy::primitives::U256;
use alloy::primitives::utils::{format_units, parse_units};
use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

pub use alloy::primitives::{Address, B256, Bytes, TxHash};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AmountError {
    #[error("empty amount")]
    Empty,
    #[error("unknown unit '{0}' (expected wei, gwei or ether)")]
    UnknownUnit(String),
    #[error("invalid number: {0}")]
    InvalidNumber(String),
}

/// An on-chain quantity in the smallest denomination (wei).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Amount(U256);

impl Amount {
    pub const ZERO: Amount = Amount(U256::ZERO);

    pub fn from_wei(wei: u128) -> Self {
        Self(U256::from(wei))
    }

    pub const fn wei(&self) -> U256 {
        self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    /// Parse `"1000"`, `"7 gwei"`, `"0.025 ether"` and the like.
    pub fn parse(input: &str) -> Result<Self, AmountError> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Err(AmountError::Empty);
        }
        let cleaned: String = trimmed.chars().filter(|c| *c != '_').collect();

        let Some((number, unit)) = cleaned.rsplit_once(char::is_whitespace) else {
            return U256::from_str_radix(&cleaned, 10)
                .map(Self)
                .map_err(|e| AmountError::InvalidNumber(format!("{cleaned}: {e}")));
        };

        let number = number.trim();
        let unit = match unit.to_ascii_lowercase().as_str() {
            "wei" => "wei",
            "gwei" => "gwei",
            "ether" | "eth" => "ether",
            other => return Err(AmountError::UnknownUnit(other.to_string())),
        };
        if number.starts_with('-') {
            return Err(AmountError::InvalidNumber(number.to_string()));
        }
        parse_units(number, unit)
            .map(|parsed| Self(parsed.into()))
            .map_err(|e| AmountError::InvalidNumber(format!("{number}: {e}")))
    }

    pub fn saturating_sub(self, other: Amount) -> Amount {
        Amount(self.0.saturating_sub(other.0))
    }

    pub fn saturating_add(self, other: Amount) -> Amount {
        Amount(self.0.saturating_add(other.0))
    }

    pub fn saturating_mul(self, factor: u128) -> Amount {
        Amount(self.0.saturating_mul(U256::from(factor)))
    }

    pub fn format_ether(&self) -> String {
        self.format_in("ether")
    }

    pub fn format_gwei(&self) -> String {
        self.format_in("gwei")
    }

    /// Render in `unit` with trailing fractional zeros trimmed.
    fn format_in(&self, unit: &str) -> String {
        match format_units(self.0, unit) {
            Ok(formatted) if formatted.contains('.') => formatted
                .trim_end_matches('0')
                .trim_end_matches('.')
                .to_string(),
            Ok(formatted) => formatted,
            Err(_) => self.0.to_string(),
        }
    }
}

impl From<U256> for Amount {
    fn from(value: U256) -> Self {
        Self(value)
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for Amount {
    type Err = AmountError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl Serialize for Amount {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0.to_string())
    }
}

impl<'de> Deserialize<'de> for Amount {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct AmountVisitor;

        impl Visitor<'_> for AmountVisitor {
            type Value = Amount;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a non-negative integer or a string such as \"1.5 ether\"")
            }

            fn visit_u64<E: de::Error>(self, v: u64) -> Result<Amount, E> {
                Ok(Amount(U256::from(v)))
            }

            fn visit_u128<E: de::Error>(self, v: u128) -> Result<Amount, E> {
                Ok(Amount::from_wei(v))
            }

            fn visit_i64<E: de::Error>(self, v: i64) -> Result<Amount, E> {
                u64::try_from(v)
                    .map(|v| Amount(U256::from(v)))
                    .map_err(|_| E::custom(format!("amount cannot be negative: {v}")))
            }

            fn visit_str<E: de::Error>(self, v: &str) -> Result<Amount, E> {
                Amount::parse(v).map_err(E::custom)
            }
        }

        deserializer.deserialize_any(AmountVisitor)
    }
}

/// Explicit fee parameters attached to every state-changing call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeeOverrides {
    pub max_fee_per_gas: Amount,
    pub max_priority_fee_per_gas: Amount,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gas_limit: Option<u64>,
}

impl FeeOverrides {
    pub fn with_gas_limit(&self, gas_limit: u64) -> Self {
        Self {
            gas_limit: Some(gas_limit),
            ..self.clone()
        }
    }
}

/// Current network fee levels as reported by the chain client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeeEstimate {
    pub base_fee: Amount,
    pub priority_fee: Amount,
}

impl FeeEstimate {
    /// Overrides that stay valid while the base fee doubles.
    pub fn to_overrides(&self) -> FeeOverrides {
        FeeOverrides {
            max_fee_per_gas: self.base_fee.saturating_mul(2).saturating_add(self.priority_fee),
            max_priority_fee_per_gas: self.priority_fee,
            gas_limit: None,
        }
    }
}

/// Confirmation of a mined transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Receipt {
    pub tx_hash: TxHash,
    pub block_number: u64,
    pub effective_gas_price: Option<Amount>,
    pub contract_address: Option<Address>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockTag {
    Latest,
    Number(u64),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockInfo {
    pub number: u64,
    pub timestamp: u64,
}

/// A raw transaction handed to the chain client for submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TxRequest {
    pub from: Address,
    /// `None` creates a new unit.
    pub to: Option<Address>,
    pub data: Bytes,
    pub value: Amount,
    pub fees: FeeOverrides,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn address_parse_ignores_checksum_case() {
        let a: Address = "0xfB0140ea62F41f643959B2A4153bf908f80EA4aD".parse().unwrap();
        let b: Address = "0xfb0140ea62f41f643959b2a4153bf908f80ea4ad".parse().unwrap();
        assert_eq!(a, b);
        assert!("0x1234".parse::<Address>().is_err());
    }

    #[test]
    fn address_from_storage_word_takes_low_bytes() {
        let word: B256 = "0x000000000000000000000000321f90864fb21cdcddd0d67fe5e4cbc812ec9e64"
            .parse()
            .unwrap();
        let expected: Address = "0x321f90864fb21cdcddd0d67fe5e4cbc812ec9e64".parse().unwrap();
        assert_eq!(Address::from_word(word), expected);
        assert!(Address::from_word(B256::ZERO).is_zero());
    }

    #[test]
    fn amount_parses_units() {
        assert_eq!(Amount::parse("1000").unwrap(), Amount::from_wei(1000));
        assert_eq!(Amount::parse("7 gwei").unwrap(), Amount::from_wei(7_000_000_000));
        assert_eq!(
            Amount::parse("0.025 ether").unwrap(),
            Amount::from_wei(25_000_000_000_000_000)
        );
        assert_eq!(
            Amount::parse("5_000_000 ether").unwrap(),
            Amount::from_wei(5_000_000 * 10u128.pow(18))
        );
    }

    #[test]
    fn amount_rejects_invalid() {
        assert_eq!(Amount::parse(""), Err(AmountError::Empty));
        assert!(matches!(
            Amount::parse("1.5"),
            Err(AmountError::InvalidNumber(_))
        ));
        assert!(matches!(
            Amount::parse("3 dogecoin"),
            Err(AmountError::UnknownUnit(_))
        ));
        assert!(matches!(
            Amount::parse("-1"),
            Err(AmountError::InvalidNumber(_))
        ));
        assert!(matches!(
            Amount::parse("-1 ether"),
            Err(AmountError::InvalidNumber(_))
        ));
    }

    #[test]
    fn amount_formats_ether() {
        assert_eq!(Amount::parse("1.5 ether").unwrap().format_ether(), "1.5");
        assert_eq!(Amount::parse("2 ether").unwrap().format_ether(), "2");
        assert_eq!(Amount::from_wei(10).format_gwei(), "0.00000001");
    }

    #[test]
    fn fee_estimate_doubles_base_fee() {
        let estimate = FeeEstimate {
            base_fee: Amount::from_wei(100),
            priority_fee: Amount::from_wei(3),
        };
        let fees = estimate.to_overrides();
        assert_eq!(fees.max_fee_per_gas, Amount::from_wei(203));
        assert_eq!(fees.max_priority_fee_per_gas, Amount::from_wei(3));
        assert_eq!(fees.gas_limit, None);
    }
}
