// KYC Crowdfund Client
// Copyright (C) 2019 Monadic GmbH <radicle@monadic.xyz>
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License version 3 as
// published by the Free Software Foundation.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License
// along with this program.  If not, see <https://www.gnu.org/licenses/>.

//! [Address] identifies a chain account, and its validation tests.
//!
//! Wallet providers and nodes do not agree on the casing of hex addresses. An [Address] holds the
//! raw bytes, so two spellings of the same account always compare equal and are always displayed
//! in lowercase.

use std::convert::TryFrom;
use std::fmt;

use serde::{Deserialize, Serialize};

/// A 20 byte chain account identifier.
///
/// ```rust
/// # use kyc_crowdfund_core::Address;
/// let mixed: Address = "0xAbCdEf0123456789aBcDeF0123456789AbCdEf01".parse().unwrap();
/// let lower: Address = "0xabcdef0123456789abcdef0123456789abcdef01".parse().unwrap();
/// assert_eq!(mixed, lower);
/// assert_eq!(mixed.to_string(), "0xabcdef0123456789abcdef0123456789abcdef01");
/// ```
#[derive(Clone, Copy, Eq, PartialEq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Address([u8; 20]);

impl Address {
    pub const fn from_bytes(bytes: [u8; 20]) -> Self {
        Address(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 20] {
        &self.0
    }

    /// Abbreviated form for messages, e.g. `0xabcd…ef01`.
    pub fn short(&self) -> String {
        let full = self.to_string();
        format!("{}…{}", &full[..6], &full[full.len() - 4..])
    }

    fn parse(input: &str) -> Result<Self, InvalidAddressError> {
        let digits = input
            .strip_prefix("0x")
            .or_else(|| input.strip_prefix("0X"))
            .ok_or(InvalidAddressError("must start with 0x"))?;
        if digits.len() != 40 {
            return Err(InvalidAddressError("must have exactly 40 hex digits"));
        }
        let mut bytes = [0u8; 20];
        hex::decode_to_slice(digits, &mut bytes)
            .map_err(|_| InvalidAddressError("must only contain hex digits"))?;
        Ok(Address(bytes))
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.as_bytes()))
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Address({})", self)
    }
}

impl std::str::FromStr for Address {
    type Err = InvalidAddressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Address::parse(s)
    }
}

impl TryFrom<&str> for Address {
    type Error = InvalidAddressError;

    fn try_from(input: &str) -> Result<Self, Self::Error> {
        Address::parse(input)
    }
}

impl TryFrom<String> for Address {
    type Error = InvalidAddressError;

    fn try_from(input: String) -> Result<Self, Self::Error> {
        Address::parse(&input)
    }
}

impl From<Address> for String {
    fn from(address: Address) -> String {
        address.to_string()
    }
}

/// Error returned when a string is not a valid [Address].
#[derive(thiserror::Error, Clone, Debug, Eq, PartialEq)]
#[error("invalid address: {0}")]
pub struct InvalidAddressError(&'static str);

impl InvalidAddressError {
    pub fn what(&self) -> &'static str {
        self.0
    }
}

#[cfg(test)]
mod test {
    use super::*;

    const LOWER: &str = "0x8ba1f109551bd432803012645ac136ddd64dba72";
    const MIXED: &str = "0x8ba1f109551bD432803012645Ac136ddd64DBA72";

    #[test]
    fn casing_is_irrelevant() {
        let lower = Address::try_from(LOWER).unwrap();
        let mixed = Address::try_from(MIXED).unwrap();
        let upper_prefix = Address::try_from("0X8BA1F109551BD432803012645AC136DDD64DBA72").unwrap();

        assert_eq!(lower, mixed);
        assert_eq!(lower, upper_prefix);
        assert_eq!(mixed.to_string(), LOWER);
    }

    #[test]
    fn invalid_addresses() {
        assert_eq!(
            Address::try_from("8ba1f109551bd432803012645ac136ddd64dba72"),
            Err(InvalidAddressError("must start with 0x"))
        );
        assert_eq!(
            Address::try_from("0x8ba1"),
            Err(InvalidAddressError("must have exactly 40 hex digits"))
        );
        let error = Address::try_from("0xzza1f109551bd432803012645ac136ddd64dba72").unwrap_err();
        assert_eq!(error.what(), "must only contain hex digits");
        assert_eq!(error.to_string(), "invalid address: must only contain hex digits");
    }

    #[test]
    fn bytes_round_trip() {
        let address = Address::try_from(LOWER).unwrap();
        assert_eq!(Address::from_bytes(*address.as_bytes()), address);
        assert_eq!(address.as_bytes()[0], 0x8b);
    }

    #[test]
    fn short_form() {
        let address = Address::try_from(MIXED).unwrap();
        assert_eq!(address.short(), "0x8ba1…ba72");
    }

    #[test]
    fn serde_uses_canonical_string() {
        let address = Address::try_from(MIXED).unwrap();
        let json = serde_json::to_string(&address).unwrap();
        assert_eq!(json, format!("\"{}\"", LOWER));

        let parsed: Address = serde_json::from_str(&format!("\"{}\"", MIXED)).unwrap();
        assert_eq!(parsed, address);
        assert!(serde_json::from_str::<Address>("\"0x1234\"").is_err());
    }
}
