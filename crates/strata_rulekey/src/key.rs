//! The rule key value type.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use strata_common::{HashCode, ParseHashCodeError};

/// A fingerprint identifying a build rule's cacheable output.
///
/// Serialized and displayed as 64 lowercase hex characters.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RuleKey(HashCode);

impl RuleKey {
    /// Wraps an existing digest.
    pub fn from_hash_code(hash: HashCode) -> Self {
        Self(hash)
    }

    /// The underlying digest.
    pub fn hash_code(&self) -> HashCode {
        self.0
    }

    /// The raw digest bytes.
    pub fn as_bytes(&self) -> &[u8] {
        self.0.as_bytes()
    }
}

impl fmt::Display for RuleKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

impl fmt::Debug for RuleKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RuleKey({self})")
    }
}

impl FromStr for RuleKey {
    type Err = ParseHashCodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(s.parse()?))
    }
}
