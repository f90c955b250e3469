//! SHA-256 digests used for file hashes and rule keys.

use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use sha2::{Digest, Sha256};
use std::fmt;
use std::str::FromStr;

/// Length in bytes of a [`HashCode`].
pub const HASH_CODE_LEN: usize = 32;

/// A 256-bit SHA-256 digest.
///
/// This is the identity type of the cache: file content hashes and rule keys
/// are both `HashCode`s, so they must be stable across processes, machines and
/// time. Serialized as a lowercase hex string.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct HashCode([u8; HASH_CODE_LEN]);

impl HashCode {
    /// Hashes a byte slice in one shot.
    pub fn from_bytes(data: &[u8]) -> Self {
        let mut hasher = HashCodeHasher::new();
        hasher.update(data);
        hasher.finish()
    }

    /// Wraps an already-computed digest.
    pub const fn from_raw(raw: [u8; HASH_CODE_LEN]) -> Self {
        Self(raw)
    }

    /// Returns the raw digest bytes.
    pub fn as_bytes(&self) -> &[u8; HASH_CODE_LEN] {
        &self.0
    }
}

impl fmt::Display for HashCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(self.0))
    }
}

impl fmt::Debug for HashCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "HashCode({:02x}{:02x}{:02x}{:02x}..)",
            self.0[0], self.0[1], self.0[2], self.0[3]
        )
    }
}

/// Error returned when a string is not a 64-character hex digest.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid hash code '{input}': expected {expected} hex characters")]
pub struct ParseHashCodeError {
    /// The rejected input.
    pub input: String,
    /// Number of hex characters a valid digest has.
    pub expected: usize,
}

impl FromStr for HashCode {
    type Err = ParseHashCodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut raw = [0u8; HASH_CODE_LEN];
        hex::decode_to_slice(s, &mut raw).map_err(|_| ParseHashCodeError {
            input: s.to_string(),
            expected: HASH_CODE_LEN * 2,
        })?;
        Ok(Self(raw))
    }
}

impl Serialize for HashCode {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for HashCode {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(de::Error::custom)
    }
}

/// Incremental SHA-256 accumulator producing a [`HashCode`].
#[derive(Clone, Default)]
pub struct HashCodeHasher {
    inner: Sha256,
}

impl HashCodeHasher {
    /// Creates an empty accumulator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Feeds bytes into the accumulator.
    pub fn update(&mut self, data: &[u8]) {
        self.inner.update(data);
    }

    /// Feeds a length prefix followed by the bytes, so that adjacent fields
    /// cannot shift into each other.
    pub fn update_framed(&mut self, data: &[u8]) {
        self.inner.update((data.len() as u64).to_le_bytes());
        self.inner.update(data);
    }

    /// Consumes the accumulator and returns the digest.
    pub fn finish(self) -> HashCode {
        HashCode(self.inner.finalize().into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn one_shot_matches_incremental() {
        let mut hasher = HashCodeHasher::new();
        hasher.update(b"hello ");
        hasher.update(b"world");
        assert_eq!(hasher.finish(), HashCode::from_bytes(b"hello world"));
    }

    #[test]
    fn known_sha256_vector() {
        let h = HashCode::from_bytes(b"abc");
        assert_eq!(
            h.to_string(),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn framing_separates_fields() {
        let mut a = HashCodeHasher::new();
        a.update_framed(b"ab");
        a.update_framed(b"c");
        let mut b = HashCodeHasher::new();
        b.update_framed(b"a");
        b.update_framed(b"bc");
        assert_ne!(a.finish(), b.finish());
    }

    #[test]
    fn parse_display_roundtrip() {
        let h = HashCode::from_bytes(b"roundtrip");
        let parsed: HashCode = h.to_string().parse().unwrap();
        assert_eq!(parsed, h);
    }

    #[test]
    fn parse_rejects_bad_input() {
        let err = "xyz".parse::<HashCode>().unwrap_err();
        assert_eq!(err.expected, 64);
        assert!(err.to_string().contains("xyz"));
        assert!("ab".repeat(31).parse::<HashCode>().is_err());
    }

    #[test]
    fn serializes_as_hex_string() {
        let h = HashCode::from_bytes(b"serde");
        let json = serde_json::to_string(&h).unwrap();
        assert_eq!(json, format!("\"{h}\""));
        let back: HashCode = serde_json::from_str(&json).unwrap();
        assert_eq!(back, h);
    }

    #[test]
    fn debug_abbreviated() {
        let s = format!("{:?}", HashCode::from_bytes(b"x"));
        assert!(s.starts_with("HashCode("));
        assert!(s.ends_with("..)"));
    }
}
