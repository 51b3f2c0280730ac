//! Ed25519 keys for transaction, block, and vote signatures.
//!
//! Accounts are identified by the [`Address`] derived from their public
//! key, so every signed structure carries the raw 32-byte key alongside the
//! signature and verifiers re-derive the address before checking it.

use ed25519_dalek::{Signer, Verifier};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

use crate::address::Address;
use crate::error::CryptoError;

/// Ed25519 signing key.
///
/// Use [`KeyPair::generate`] for a random key or
/// [`KeyPair::from_secret_bytes`] for a deterministic one (tests, configured
/// proposer seeds).
pub struct KeyPair {
    signing_key: ed25519_dalek::SigningKey,
}

impl KeyPair {
    /// Generate a random keypair using the OS cryptographic RNG.
    pub fn generate() -> Self {
        let mut csprng = rand::rngs::OsRng;
        Self {
            signing_key: ed25519_dalek::SigningKey::generate(&mut csprng),
        }
    }

    pub fn from_secret_bytes(bytes: [u8; 32]) -> Self {
        Self {
            signing_key: ed25519_dalek::SigningKey::from_bytes(&bytes),
        }
    }

    /// Parse a 64-digit hex secret, as written in node configuration.
    pub fn from_secret_hex(s: &str) -> Result<Self, CryptoError> {
        let bytes = hex::decode(s.trim()).map_err(|_| CryptoError::InvalidPublicKey)?;
        let secret: [u8; 32] = bytes
            .as_slice()
            .try_into()
            .map_err(|_| CryptoError::InvalidPublicKey)?;
        Ok(Self::from_secret_bytes(secret))
    }

    pub fn public_key(&self) -> PublicKey {
        PublicKey {
            verifying_key: self.signing_key.verifying_key(),
        }
    }

    /// Account address owned by this key.
    pub fn address(&self) -> Address {
        Address::from_public_key(&self.public_key())
    }

    /// Raw secret key bytes. Handle with care.
    pub fn secret_bytes(&self) -> [u8; 32] {
        self.signing_key.to_bytes()
    }

    /// Sign a message, returning the raw 64-byte Ed25519 signature.
    pub fn sign(&self, message: &[u8]) -> [u8; 64] {
        self.signing_key.sign(message).to_bytes()
    }
}

impl Clone for KeyPair {
    fn clone(&self) -> Self {
        Self::from_secret_bytes(self.secret_bytes())
    }
}

impl fmt::Debug for KeyPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyPair")
            .field("address", &self.address())
            .finish_non_exhaustive()
    }
}

/// Ed25519 verifying key.
#[derive(Clone, Copy)]
pub struct PublicKey {
    verifying_key: ed25519_dalek::VerifyingKey,
}

impl PublicKey {
    /// Fails when the bytes are not a valid curve point.
    pub fn from_bytes(bytes: &[u8; 32]) -> Result<Self, CryptoError> {
        let vk = ed25519_dalek::VerifyingKey::from_bytes(bytes)
            .map_err(|_| CryptoError::InvalidPublicKey)?;
        Ok(Self { verifying_key: vk })
    }

    /// Parse 64 hex digits.
    pub fn from_hex(s: &str) -> Result<Self, CryptoError> {
        let bytes = hex::decode(s.trim()).map_err(|_| CryptoError::InvalidPublicKey)?;
        let array: [u8; 32] = bytes
            .as_slice()
            .try_into()
            .map_err(|_| CryptoError::InvalidPublicKey)?;
        Self::from_bytes(&array)
    }

    pub fn to_bytes(&self) -> [u8; 32] {
        self.verifying_key.to_bytes()
    }

    pub fn address(&self) -> Address {
        Address::from_public_key(self)
    }

    /// Verify an Ed25519 signature on a message.
    pub fn verify(&self, message: &[u8], signature: &[u8; 64]) -> Result<(), CryptoError> {
        let sig = ed25519_dalek::Signature::from_bytes(signature);
        self.verifying_key
            .verify(message, &sig)
            .map_err(|_| CryptoError::VerificationFailed)
    }
}

impl fmt::Debug for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PublicKey({})", hex::encode(self.to_bytes()))
    }
}

impl fmt::Display for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(self.to_bytes()))
    }
}

impl PartialEq for PublicKey {
    fn eq(&self, other: &Self) -> bool {
        self.to_bytes() == other.to_bytes()
    }
}

impl Eq for PublicKey {}

impl std::hash::Hash for PublicKey {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.to_bytes().hash(state);
    }
}

impl PartialOrd for PublicKey {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for PublicKey {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.to_bytes().cmp(&other.to_bytes())
    }
}

/// Hex string in human-readable formats (policy files, JSON).
impl Serialize for PublicKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for PublicKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::from_hex(&s).map_err(serde::de::Error::custom)
    }
}

/// Verify `signature` over `message` with raw key bytes.
pub fn verify_raw(public_key: &[u8; 32], message: &[u8], signature: &[u8]) -> Result<(), CryptoError> {
    let pk = PublicKey::from_bytes(public_key)?;
    let sig: [u8; 64] = signature
        .try_into()
        .map_err(|_| CryptoError::InvalidSignature)?;
    pk.verify(message, &sig)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keypair_generate_unique() {
        assert_ne!(KeyPair::generate().public_key(), KeyPair::generate().public_key());
    }

    #[test]
    fn keypair_from_secret_deterministic() {
        let kp1 = KeyPair::from_secret_bytes([42u8; 32]);
        let kp2 = KeyPair::from_secret_bytes([42u8; 32]);
        assert_eq!(kp1.public_key(), kp2.public_key());
        assert_eq!(kp1.address(), kp2.address());
    }

    #[test]
    fn keypair_from_secret_hex() {
        let kp = KeyPair::from_secret_hex(&"07".repeat(32)).unwrap();
        assert_eq!(kp.secret_bytes(), [7u8; 32]);
        assert!(KeyPair::from_secret_hex("07").is_err());
        assert!(KeyPair::from_secret_hex("not hex").is_err());
    }

    #[test]
    fn keypair_debug_hides_secret() {
        let kp = KeyPair::generate();
        let debug = format!("{kp:?}");
        assert!(debug.contains("KeyPair"));
        assert!(!debug.contains(&hex::encode(kp.secret_bytes())));
    }

    #[test]
    fn address_matches_public_key_derivation() {
        let kp = KeyPair::from_secret_bytes([9u8; 32]);
        assert_eq!(kp.address(), kp.public_key().address());
        assert_eq!(kp.address(), Address::from_public_key_bytes(&kp.public_key().to_bytes()));
    }

    #[test]
    fn public_key_hex_serde() {
        let pk = KeyPair::from_secret_bytes([3u8; 32]).public_key();
        let json = serde_json::to_string(&pk).unwrap();
        assert_eq!(json.len(), 64 + 2);
        let back: PublicKey = serde_json::from_str(&json).unwrap();
        assert_eq!(back, pk);
    }

    #[test]
    fn sign_verify_message() {
        let kp = KeyPair::generate();
        let sig = kp.sign(b"hello tollgate");
        assert!(kp.public_key().verify(b"hello tollgate", &sig).is_ok());
        assert_eq!(
            kp.public_key().verify(b"tampered", &sig).unwrap_err(),
            CryptoError::VerificationFailed
        );
    }

    #[test]
    fn verify_raw_checks_lengths() {
        let kp = KeyPair::generate();
        let sig = kp.sign(b"msg");
        let pk = kp.public_key().to_bytes();
        assert!(verify_raw(&pk, b"msg", &sig).is_ok());
        assert_eq!(
            verify_raw(&pk, b"msg", &sig[..63]).unwrap_err(),
            CryptoError::InvalidSignature
        );
    }
}
