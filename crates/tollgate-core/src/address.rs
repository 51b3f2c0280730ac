//! Account addresses.
//!
//! An [`Address`] is the first 20 bytes of the BLAKE3 hash of an account's
//! Ed25519 public key. The human-readable form is 40 lowercase hex digits;
//! parsing also accepts a `0x` prefix and mixed case.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

use crate::crypto::PublicKey;
use crate::error::AddressError;

/// Address length in bytes.
pub const ADDRESS_LEN: usize = 20;

/// A 20-byte account identifier.
#[derive(
    Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default,
    bincode::Encode, bincode::Decode,
)]
pub struct Address(pub [u8; ADDRESS_LEN]);

impl Address {
    /// Derive the address owned by `public_key`.
    pub fn from_public_key(public_key: &PublicKey) -> Self {
        Self::from_public_key_bytes(&public_key.to_bytes())
    }

    /// Derive an address from raw 32-byte public key material.
    pub fn from_public_key_bytes(bytes: &[u8; 32]) -> Self {
        let digest = blake3::hash(bytes);
        let mut out = [0u8; ADDRESS_LEN];
        out.copy_from_slice(&digest.as_bytes()[..ADDRESS_LEN]);
        Self(out)
    }

    pub fn as_bytes(&self) -> &[u8; ADDRESS_LEN] {
        &self.0
    }

    /// Lowercase hex without prefix.
    pub fn encode(&self) -> String {
        hex::encode(self.0)
    }

    /// Parse 40 hex digits, with or without a `0x` prefix.
    pub fn decode(s: &str) -> Result<Self, AddressError> {
        let trimmed = s
            .strip_prefix("0x")
            .or_else(|| s.strip_prefix("0X"))
            .unwrap_or(s);
        let bytes = hex::decode(trimmed).map_err(|e| AddressError::InvalidHex(e.to_string()))?;
        let array: [u8; ADDRESS_LEN] = bytes
            .as_slice()
            .try_into()
            .map_err(|_| AddressError::InvalidLength(bytes.len()))?;
        Ok(Self(array))
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.encode())
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address({})", self.encode())
    }
}

impl FromStr for Address {
    type Err = AddressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::decode(s)
    }
}

impl Serialize for Address {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.encode())
    }
}

impl<'de> Deserialize<'de> for Address {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::decode(&s).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::KeyPair;

    #[test]
    fn derived_from_public_key_is_deterministic() {
        let kp = KeyPair::from_secret_bytes([7u8; 32]);
        let a = Address::from_public_key(&kp.public_key());
        let b = Address::from_public_key(&kp.public_key());
        assert_eq!(a, b);
    }

    #[test]
    fn different_keys_different_addresses() {
        let a = Address::from_public_key(&KeyPair::from_secret_bytes([1u8; 32]).public_key());
        let b = Address::from_public_key(&KeyPair::from_secret_bytes([2u8; 32]).public_key());
        assert_ne!(a, b);
    }

    #[test]
    fn display_then_parse() {
        let addr = Address([0xAB; 20]);
        let s = addr.to_string();
        assert_eq!(s.len(), 40);
        assert_eq!(s.parse::<Address>().unwrap(), addr);
    }

    #[test]
    fn parse_accepts_prefix_and_mixed_case() {
        let addr: Address = "0xDE96aa7702a7a1fd18ee0f84a5a0c7a2c28ec840".parse().unwrap();
        assert_eq!(addr.encode(), "de96aa7702a7a1fd18ee0f84a5a0c7a2c28ec840");
    }

    #[test]
    fn parse_rejects_wrong_length() {
        assert_eq!(
            "abcd".parse::<Address>().unwrap_err(),
            AddressError::InvalidLength(2)
        );
    }

    #[test]
    fn parse_rejects_non_hex() {
        assert!(matches!(
            "zz96aa7702a7a1fd18ee0f84a5a0c7a2c28ec840".parse::<Address>(),
            Err(AddressError::InvalidHex(_))
        ));
    }

    #[test]
    fn serde_uses_hex_string() {
        let addr = Address([0x01; 20]);
        let json = serde_json::to_string(&addr).unwrap();
        assert_eq!(json, format!("\"{}\"", "01".repeat(20)));
        let back: Address = serde_json::from_str(&json).unwrap();
        assert_eq!(back, addr);
    }
}
