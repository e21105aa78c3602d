//! DomainEthAddress - validated Ethereum address
//!
//! Accepts `0x`-prefixed 40-hex-digit strings. All-lowercase and all-uppercase
//! inputs are accepted as-is; mixed-case inputs must carry a valid EIP-55 checksum.

use ethers::types::Address;
use ethers::utils::to_checksum;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash)]
pub struct DomainEthAddress(pub Address);

/// Why an address string was rejected
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AddressError {
    #[error("address must start with 0x")]
    MissingPrefix,
    #[error("address must be 40 hex characters, got {0}")]
    WrongLength(usize),
    #[error("address contains non-hex characters")]
    NotHex,
    #[error("address checksum does not match")]
    BadChecksum,
}

impl DomainEthAddress {
    /// Parse and validate an address string
    pub fn parse(input: &str) -> Result<Self, AddressError> {
        let trimmed = input.trim();
        let hex_part = trimmed
            .strip_prefix("0x")
            .or_else(|| trimmed.strip_prefix("0X"))
            .ok_or(AddressError::MissingPrefix)?;

        if hex_part.len() != 40 {
            return Err(AddressError::WrongLength(hex_part.len()));
        }
        if !hex_part.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(AddressError::NotHex);
        }

        let address = Address::from_str(hex_part).map_err(|_| AddressError::NotHex)?;

        let has_lower = hex_part.chars().any(|c| c.is_ascii_lowercase());
        let has_upper = hex_part.chars().any(|c| c.is_ascii_uppercase());
        if has_lower && has_upper {
            let expected = to_checksum(&address, None);
            if &expected[2..] != hex_part {
                return Err(AddressError::BadChecksum);
            }
        }

        Ok(Self(address))
    }

    /// EIP-55 checksummed form
    pub fn to_checksum(&self) -> String {
        to_checksum(&self.0, None)
    }

    /// Lowercase hex form, used as the canonical comparison key
    pub fn to_lowercase_hex(&self) -> String {
        format!("{:?}", self.0)
    }
}

/// Case-insensitive comparison of two address strings, without validation
pub fn same_address(a: &str, b: &str) -> bool {
    a.trim().eq_ignore_ascii_case(b.trim())
}

impl From<Address> for DomainEthAddress {
    fn from(input: Address) -> Self {
        Self(input)
    }
}

impl From<DomainEthAddress> for Address {
    fn from(input: DomainEthAddress) -> Self {
        input.0
    }
}

impl FromStr for DomainEthAddress {
    type Err = AddressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for DomainEthAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_checksum())
    }
}

impl Serialize for DomainEthAddress {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.to_checksum())
    }
}

impl<'de> Deserialize<'de> for DomainEthAddress {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Self::parse(&s).map_err(serde::de::Error::custom)
    }
}
