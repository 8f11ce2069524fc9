//! 32-byte hash primitive.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use thiserror::Error;

/// Errors from parsing a hash out of a hex string.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum HexError {
    #[error("invalid hex encoding: {0}")]
    InvalidHex(String),
    #[error("expected {expected} bytes, got {got}")]
    InvalidLength { expected: usize, got: usize },
}

/// A SHA-256 digest.
///
/// Used for state roots, transaction hashes, tree nodes and certified
/// unicity roots. The all-zero hash marks "nothing certified yet".
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Hash([u8; Hash::LENGTH]);

impl Hash {
    /// Hash length in bytes.
    pub const LENGTH: usize = 32;

    /// The all-zero hash.
    pub const ZERO: Hash = Hash([0u8; Hash::LENGTH]);

    /// Wrap raw bytes as a hash.
    pub const fn from_bytes(bytes: [u8; Hash::LENGTH]) -> Self {
        Hash(bytes)
    }

    /// Borrow the raw bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// SHA-256 over the concatenation of `parts`, in order.
    ///
    /// Every call allocates its own hashing context; no accumulator is
    /// shared between invocations, so concurrent callers never observe
    /// each other's partial input.
    pub fn digest(parts: &[&[u8]]) -> Self {
        let mut hasher = Sha256::new();
        for part in parts {
            hasher.update(part);
        }
        Hash(hasher.finalize().into())
    }

    /// Parse a hash from a hex string.
    pub fn from_hex(s: &str) -> Result<Self, HexError> {
        let bytes = hex::decode(s).map_err(|e| HexError::InvalidHex(e.to_string()))?;
        let len = bytes.len();
        let arr: [u8; Hash::LENGTH] = bytes.try_into().map_err(|_| HexError::InvalidLength {
            expected: Hash::LENGTH,
            got: len,
        })?;
        Ok(Hash(arr))
    }

    /// Hex encoding of the hash.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Check whether this is the all-zero hash.
    pub fn is_zero(&self) -> bool {
        *self == Hash::ZERO
    }
}

impl fmt::Display for Hash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl fmt::Debug for Hash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Short form keeps log lines readable.
        write!(f, "Hash({}..)", &self.to_hex()[..8])
    }
}

impl AsRef<[u8]> for Hash {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn digest_is_deterministic() {
        let a = Hash::digest(&[b"hello", b"world"]);
        let b = Hash::digest(&[b"hello", b"world"]);
        assert_eq!(a, b);
    }

    #[test]
    fn digest_concatenation_order_matters() {
        let a = Hash::digest(&[b"hello", b"world"]);
        let b = Hash::digest(&[b"world", b"hello"]);
        assert_ne!(a, b);
    }

    #[test]
    fn digest_matches_flat_input() {
        // Split points must not affect the digest.
        let a = Hash::digest(&[b"helloworld"]);
        let b = Hash::digest(&[b"hello", b"world"]);
        assert_eq!(a, b);
    }

    #[test]
    fn hex_round_trip() {
        let h = Hash::digest(&[b"abc"]);
        let parsed = Hash::from_hex(&h.to_hex()).unwrap();
        assert_eq!(h, parsed);
    }

    #[test]
    fn from_hex_rejects_bad_input() {
        assert!(matches!(
            Hash::from_hex("zz"),
            Err(HexError::InvalidHex(_))
        ));
        assert_eq!(
            Hash::from_hex("abcd"),
            Err(HexError::InvalidLength {
                expected: 32,
                got: 2
            })
        );
    }

    #[test]
    fn zero_hash() {
        assert!(Hash::ZERO.is_zero());
        assert!(!Hash::digest(&[b"x"]).is_zero());
    }
}
