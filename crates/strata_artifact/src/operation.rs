//! The kinds of artifact cache operation.

use std::fmt;

use serde::{Deserialize, Serialize};

/// An operation against the artifact cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Operation {
    /// Look up an artifact by rule key.
    Fetch,
    /// Upload an artifact under one or more rule keys.
    Store,
    /// Compress a payload before storing it.
    Compress,
    /// Decompress a fetched payload.
    Decompress,
}

impl Operation {
    /// Lowercase name, e.g. `fetch`.
    pub fn as_str(self) -> &'static str {
        match self {
            Operation::Fetch => "fetch",
            Operation::Store => "store",
            Operation::Compress => "compress",
            Operation::Decompress => "decompress",
        }
    }

    /// Upper camel case name, e.g. `Fetch`, used in event names.
    pub fn camel_name(self) -> &'static str {
        match self {
            Operation::Fetch => "Fetch",
            Operation::Store => "Store",
            Operation::Compress => "Compress",
            Operation::Decompress => "Decompress",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
