//! 20-byte account addresses.
//!
//! Addresses render as EIP-55 mixed-case hex, which is also the form owners
//! are persisted in, so string comparison of rendered addresses is exact.

use std::fmt;
use std::str::FromStr;

use k256::ecdsa::VerifyingKey;
use k256::elliptic_curve::sec1::ToEncodedPoint;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::CryptoError;
use crate::hash::keccak256;

/// Length of an address in bytes.
pub const ADDRESS_LEN: usize = 20;

/// An Ethereum-style account address.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default, PartialOrd, Ord)]
pub struct Address([u8; ADDRESS_LEN]);

impl Address {
    pub const ZERO: Self = Self([0u8; ADDRESS_LEN]);

    pub const fn new(bytes: [u8; ADDRESS_LEN]) -> Self {
        Self(bytes)
    }

    pub const fn as_bytes(&self) -> &[u8; ADDRESS_LEN] {
        &self.0
    }

    /// Build an address from arbitrary bytes: keeps the last 20 bytes when
    /// longer, left-pads with zeros when shorter.
    pub fn from_slice_lenient(bytes: &[u8]) -> Self {
        let mut out = [0u8; ADDRESS_LEN];
        if bytes.len() >= ADDRESS_LEN {
            out.copy_from_slice(&bytes[bytes.len() - ADDRESS_LEN..]);
        } else {
            out[ADDRESS_LEN - bytes.len()..].copy_from_slice(bytes);
        }
        Self(out)
    }

    /// Parse hex with the tolerance chain tooling applies to user input:
    /// optional `0x`, odd length gets a leading zero nibble, and the result
    /// is fitted to 20 bytes with [`Address::from_slice_lenient`].
    ///
    /// Non-hex characters are still an error.
    pub fn from_hex_lenient(input: &str) -> Result<Self, CryptoError> {
        let digits = strip_hex_prefix(input);
        let bytes = if digits.len() % 2 == 1 {
            hex::decode(format!("0{digits}"))
        } else {
            hex::decode(digits)
        }
        .map_err(|e| CryptoError::InvalidAddress(format!("{input}: {e}")))?;
        Ok(Self::from_slice_lenient(&bytes))
    }

    /// Derive the address of a secp256k1 public key: the last 20 bytes of
    /// the Keccak-256 of the uncompressed point without its `0x04` tag.
    pub fn from_public_key(key: &VerifyingKey) -> Self {
        let point = key.to_encoded_point(false);
        let hash = keccak256(&point.as_bytes()[1..]);
        Self::from_slice_lenient(&hash[12..])
    }

    /// EIP-55 checksummed representation, `0x`-prefixed.
    pub fn to_checksum(&self) -> String {
        let lower = hex::encode(self.0);
        let hash = keccak256(lower.as_bytes());

        let mut out = String::with_capacity(2 + lower.len());
        out.push_str("0x");
        for (i, c) in lower.chars().enumerate() {
            let nibble = if i % 2 == 0 {
                hash[i / 2] >> 4
            } else {
                hash[i / 2] & 0x0f
            };
            if c.is_ascii_alphabetic() && nibble >= 8 {
                out.push(c.to_ascii_uppercase());
            } else {
                out.push(c);
            }
        }
        out
    }
}

fn strip_hex_prefix(input: &str) -> &str {
    input
        .strip_prefix("0x")
        .or_else(|| input.strip_prefix("0X"))
        .unwrap_or(input)
}

impl FromStr for Address {
    type Err = CryptoError;

    /// Strict parse: optional `0x` followed by exactly 40 hex digits.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let digits = strip_hex_prefix(s);
        if digits.len() != ADDRESS_LEN * 2 {
            return Err(CryptoError::InvalidAddress(format!(
                "{s}: expected {} hex digits, got {}",
                ADDRESS_LEN * 2,
                digits.len()
            )));
        }
        let mut out = [0u8; ADDRESS_LEN];
        hex::decode_to_slice(digits, &mut out)
            .map_err(|e| CryptoError::InvalidAddress(format!("{s}: {e}")))?;
        Ok(Self(out))
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_checksum())
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address({})", self.to_checksum())
    }
}

impl fmt::LowerHex for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if f.alternate() {
            f.write_str("0x")?;
        }
        f.write_str(&hex::encode(self.0))
    }
}

impl Serialize for Address {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_checksum())
    }
}

impl<'de> Deserialize<'de> for Address {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}
