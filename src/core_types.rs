//! Core types used throughout the system
//!
//! Identities, asset references and amounts. Every account and every asset
//! ledger is named by a 20-byte [`Address`]; the all-zero address is the null
//! identity and is rejected wherever a real identity is required.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

/// Amount of an asset in base units.
///
/// The migration rate is fixed 1:1, so no precision conversion ever happens
/// between source and target amounts.
pub type Amount = u64;

/// Asset reference - the address of the ledger holding that asset.
///
/// # Constraints:
/// - **Immutable**: the core's source/target references never change
/// - **Non-null**: `Address::ZERO` is never a valid asset
pub type AssetId = Address;

/// 20-byte account identity.
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Address([u8; 20]);

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AddressParseError {
    #[error("address must be 20 bytes (40 hex chars), got {0} chars")]
    InvalidLength(usize),

    #[error("invalid hex in address: {0}")]
    InvalidHex(String),
}

impl Address {
    /// The null identity
    pub const ZERO: Address = Address([0u8; 20]);

    /// Address whose last 8 bytes hold `id` big-endian.
    ///
    /// Handy for fixtures and for deriving stable addresses from numeric ids.
    pub const fn from_low_u64(id: u64) -> Self {
        let mut bytes = [0u8; 20];
        let be = id.to_be_bytes();
        let mut i = 0;
        while i < 8 {
            bytes[12 + i] = be[i];
            i += 1;
        }
        Self(bytes)
    }

    #[inline(always)]
    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; 20]
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address({})", self)
    }
}

impl FromStr for Address {
    type Err = AddressParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let digits = s
            .strip_prefix("0x")
            .or_else(|| s.strip_prefix("0X"))
            .unwrap_or(s);
        if digits.len() != 40 {
            return Err(AddressParseError::InvalidLength(digits.len()));
        }
        let mut bytes = [0u8; 20];
        hex::decode_to_slice(digits, &mut bytes)
            .map_err(|e| AddressParseError::InvalidHex(e.to_string()))?;
        Ok(Self(bytes))
    }
}

impl Serialize for Address {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Address {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_address() {
        assert!(Address::ZERO.is_zero());
        assert!(Address::default().is_zero());
        assert!(!Address::from_low_u64(1).is_zero());
    }

    #[test]
    fn test_display_and_parse() {
        let addr = Address::from_low_u64(0xabcd);
        let text = addr.to_string();
        assert_eq!(text, "0x000000000000000000000000000000000000abcd");
        assert_eq!(text.parse::<Address>().unwrap(), addr);

        // Prefix is optional and case-insensitive hex is accepted
        let upper = "000000000000000000000000000000000000ABCD";
        assert_eq!(upper.parse::<Address>().unwrap(), addr);
    }

    #[test]
    fn test_parse_rejects_bad_input() {
        assert_eq!(
            "0x1234".parse::<Address>(),
            Err(AddressParseError::InvalidLength(4))
        );
        assert!(matches!(
            "0xzz00000000000000000000000000000000000000".parse::<Address>(),
            Err(AddressParseError::InvalidHex(_))
        ));
    }

    #[test]
    fn test_serde_as_hex_string() {
        let addr = Address::from_low_u64(7);
        let json = serde_json::to_string(&addr).unwrap();
        assert_eq!(json, "\"0x0000000000000000000000000000000000000007\"");
        let back: Address = serde_json::from_str(&json).unwrap();
        assert_eq!(back, addr);
    }
}
