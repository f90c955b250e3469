//! Outcome classification for FETCH operations.

use std::fmt;

use serde::{Deserialize, Serialize};

/// The outcome of a FETCH.
///
/// A [`Miss`](Self::Miss) is a normal outcome that falls through to a local
/// build. Only [`Error`](Self::Error) and [`Cancelled`](Self::Cancelled)
/// count as failures.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CacheResult {
    /// The artifact was found.
    Hit {
        /// Name of the cache that served it.
        source: String,
    },
    /// The artifact is not in the cache.
    Miss,
    /// The lookup failed.
    Error {
        /// Name of the cache or step that failed.
        source: String,
        /// Human-readable failure description.
        message: String,
    },
    /// Caching is disabled; no lookup was attempted.
    Ignored,
    /// The lookup was abandoned before it completed.
    Cancelled,
}

impl CacheResult {
    /// A hit served by `source`.
    pub fn hit(source: impl Into<String>) -> Self {
        CacheResult::Hit {
            source: source.into(),
        }
    }

    /// A failure reported by `source`.
    pub fn error(source: impl Into<String>, message: impl Into<String>) -> Self {
        CacheResult::Error {
            source: source.into(),
            message: message.into(),
        }
    }

    /// Returns `false` only for [`Error`](Self::Error) and
    /// [`Cancelled`](Self::Cancelled).
    pub fn is_success(&self) -> bool {
        !matches!(self, CacheResult::Error { .. } | CacheResult::Cancelled)
    }

    /// Returns `true` for [`Hit`](Self::Hit).
    pub fn is_hit(&self) -> bool {
        matches!(self, CacheResult::Hit { .. })
    }
}

impl fmt::Display for CacheResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CacheResult::Hit { source } => write!(f, "hit ({source})"),
            CacheResult::Miss => f.write_str("miss"),
            CacheResult::Error { source, message } => write!(f, "error ({source}): {message}"),
            CacheResult::Ignored => f.write_str("ignored"),
            CacheResult::Cancelled => f.write_str("cancelled"),
        }
    }
}
