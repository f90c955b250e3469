//! Error types for the artifact cache.

use std::path::PathBuf;

use strata_rulekey::RuleKey;

use crate::event::EventKey;
use crate::operation::Operation;

/// A misuse of the Started/Finished protocol.
///
/// These indicate a bug in the caller (for example a retry path that reports
/// the same operation twice). They are never converted into cache results.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProtocolViolation {
    /// A FETCH was finished without a cache result.
    #[error("{event_key}: FETCH operations must finish with a cache result")]
    MissingCacheResult {
        /// The offending event.
        event_key: EventKey,
    },

    /// A non-FETCH operation was finished with a cache result.
    #[error("{event_key}: only FETCH operations carry a cache result, not {operation}")]
    UnexpectedCacheResult {
        /// The offending event.
        event_key: EventKey,
        /// Its actual operation.
        operation: Operation,
    },

    /// A second Finished was requested for the same Started.
    #[error("{event_key}: multiple conflicting Finished events for {operation}")]
    AlreadyFinished {
        /// The offending event.
        event_key: EventKey,
        /// Its operation.
        operation: Operation,
    },

    /// The Started event was never registered with this tracker.
    #[error("{event_key}: no Started event recorded by this tracker")]
    UnknownEvent {
        /// The offending event.
        event_key: EventKey,
    },
}

/// A failure of the bytes-on-the-wire exchange with an artifact store.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// Reading or writing the backing store failed.
    #[error("artifact I/O error at {path}: {source}")]
    Io {
        /// The path that caused the error.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// A stored entry failed validation.
    #[error("corrupt artifact for {key}: {reason}")]
    Corrupt {
        /// The rule key whose entry is corrupt.
        key: RuleKey,
        /// What failed to validate.
        reason: String,
    },

    /// The store could not be reached.
    #[error("artifact cache unavailable: {0}")]
    Unavailable(String),

    /// A header could not be encoded.
    #[error("serialization error: {reason}")]
    Serialization {
        /// Description of the failure.
        reason: String,
    },
}

/// A failure while compressing or decompressing a payload.
#[derive(Debug, thiserror::Error)]
pub enum CompressionError {
    /// The compressor failed.
    #[error("failed to compress artifact: {0}")]
    Compress(#[source] std::io::Error),

    /// The payload is not a valid compressed stream.
    #[error("failed to decompress artifact: {0}")]
    Decompress(#[source] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;
    use strata_common::HashCode;

    #[test]
    fn already_finished_display() {
        let err = ProtocolViolation::AlreadyFinished {
            event_key: EventKey::unique(),
            operation: Operation::Store,
        };
        assert!(err.to_string().contains("multiple conflicting Finished events"));
    }

    #[test]
    fn corrupt_display_names_key() {
        let key = RuleKey::from_hash_code(HashCode::from_bytes(b"k"));
        let err = TransportError::Corrupt {
            key,
            reason: "checksum mismatch".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains(&key.to_string()));
        assert!(msg.contains("checksum mismatch"));
    }

    #[test]
    fn io_display() {
        let err = TransportError::Io {
            path: PathBuf::from("/cache/ab/abcd.artifact"),
            source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        };
        assert!(err.to_string().contains("abcd.artifact"));
    }

    #[test]
    fn decompress_display() {
        let err = CompressionError::Decompress(std::io::Error::new(
            std::io::ErrorKind::InvalidData,
            "corrupt deflate stream",
        ));
        assert!(err.to_string().starts_with("failed to decompress artifact"));
    }
}
