//! The cached value: a digest plus the kind of entry it was computed from.

use std::fmt;

use serde::{Deserialize, Serialize};
use strata_common::HashCode;
use strata_fs::PathKind;

/// An immutable pairing of a content digest and the kind of entry hashed.
///
/// Two records are equal only if both the digest and the kind match, so a
/// file and a directory can never be confused even on a digest collision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct HashRecord {
    hash: HashCode,
    kind: PathKind,
}

impl HashRecord {
    /// Creates a record.
    pub fn new(hash: HashCode, kind: PathKind) -> Self {
        Self { hash, kind }
    }

    /// The content digest.
    pub fn hash(&self) -> HashCode {
        self.hash
    }

    /// The kind of entry the digest was computed from.
    pub fn kind(&self) -> PathKind {
        self.kind
    }
}

impl fmt::Display for HashRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match self.kind {
            PathKind::File => "file",
            PathKind::Directory => "dir",
            PathKind::Symlink => "symlink",
        };
        write!(f, "{} {kind}", self.hash)
    }
}
