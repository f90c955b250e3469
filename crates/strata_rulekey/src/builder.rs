//! The append-only rule key builder.
//!
//! Every input is written to the digest as a one-byte kind tag, the
//! length-prefixed input name, and the length-prefixed value. Tagging keeps a
//! literal `"3"` from colliding with the digest bytes of a file, and framing
//! keeps adjacent inputs from shifting into each other.

use std::path::Path;

use strata_cache::FileHashCache;
use strata_common::HashCodeHasher;

use crate::error::RuleKeyError;
use crate::key::RuleKey;

const TAG_BYTES: u8 = b'B';
const TAG_STR: u8 = b'S';
const TAG_U64: u8 = b'U';
const TAG_I64: u8 = b'I';
const TAG_BOOL: u8 = b'Z';
const TAG_FILE: u8 = b'F';
const TAG_NESTED: u8 = b'K';

/// Accumulates named inputs into a [`RuleKey`].
///
/// The builder is single-use: after [`build`](Self::build) every further call
/// fails with [`RuleKeyError::AlreadyBuilt`].
///
/// ```ignore
/// let mut builder = RuleKeyBuilder::new(&file_hashes);
/// builder.add_str("flags", "-O2")?.add_file("src", Path::new("src/main.c"))?;
/// let key = builder.build()?;
/// ```
pub struct RuleKeyBuilder<'a> {
    file_hashes: &'a dyn FileHashCache,
    hasher: Option<HashCodeHasher>,
    inputs: usize,
}

impl<'a> RuleKeyBuilder<'a> {
    /// Creates a builder that resolves file inputs through `file_hashes`.
    pub fn new(file_hashes: &'a dyn FileHashCache) -> Self {
        Self {
            file_hashes,
            hasher: Some(HashCodeHasher::new()),
            inputs: 0,
        }
    }

    /// Adds a raw byte literal.
    pub fn add_literal(&mut self, name: &str, value: &[u8]) -> Result<&mut Self, RuleKeyError> {
        self.feed(TAG_BYTES, name, value)
    }

    /// Adds a string literal.
    pub fn add_str(&mut self, name: &str, value: &str) -> Result<&mut Self, RuleKeyError> {
        self.feed(TAG_STR, name, value.as_bytes())
    }

    /// Adds an unsigned integer literal.
    pub fn add_u64(&mut self, name: &str, value: u64) -> Result<&mut Self, RuleKeyError> {
        self.feed(TAG_U64, name, &value.to_le_bytes())
    }

    /// Adds a signed integer literal.
    pub fn add_i64(&mut self, name: &str, value: i64) -> Result<&mut Self, RuleKeyError> {
        self.feed(TAG_I64, name, &value.to_le_bytes())
    }

    /// Adds a boolean literal.
    pub fn add_bool(&mut self, name: &str, value: bool) -> Result<&mut Self, RuleKeyError> {
        self.feed(TAG_BOOL, name, &[u8::from(value)])
    }

    /// Adds a file input, identified by the hash of its current content.
    ///
    /// Hash cache failures (including a missing file) are returned unchanged
    /// and leave the builder untouched.
    pub fn add_file(&mut self, name: &str, path: &Path) -> Result<&mut Self, RuleKeyError> {
        self.check_open()?;
        let record = self.file_hashes.get(path)?;
        let mut value = Vec::with_capacity(1 + record.hash().as_bytes().len());
        value.push(record.kind().tag());
        value.extend_from_slice(record.hash().as_bytes());
        self.feed(TAG_FILE, name, &value)
    }

    /// Adds another rule key, e.g. a dependency's.
    pub fn add_nested(&mut self, name: &str, key: &RuleKey) -> Result<&mut Self, RuleKeyError> {
        self.feed(TAG_NESTED, name, key.as_bytes())
    }

    /// Finalizes the key. The builder cannot be used afterwards.
    pub fn build(&mut self) -> Result<RuleKey, RuleKeyError> {
        let hasher = self.hasher.take().ok_or(RuleKeyError::AlreadyBuilt)?;
        let key = RuleKey::from_hash_code(hasher.finish());
        tracing::trace!(rule_key = %key, inputs = self.inputs, "built rule key");
        Ok(key)
    }

    fn check_open(&self) -> Result<(), RuleKeyError> {
        match self.hasher {
            Some(_) => Ok(()),
            None => Err(RuleKeyError::AlreadyBuilt),
        }
    }

    fn feed(&mut self, tag: u8, name: &str, value: &[u8]) -> Result<&mut Self, RuleKeyError> {
        let hasher = self.hasher.as_mut().ok_or(RuleKeyError::AlreadyBuilt)?;
        hasher.update(&[tag]);
        hasher.update_framed(name.as_bytes());
        hasher.update_framed(value);
        self.inputs += 1;
        Ok(self)
    }
}
