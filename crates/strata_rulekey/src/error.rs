//! Error types for rule key construction.

use strata_cache::HashCacheError;

/// Errors returned while building a rule key.
#[derive(Debug, thiserror::Error)]
pub enum RuleKeyError {
    /// The builder was used after [`build`](crate::RuleKeyBuilder::build).
    #[error("rule key builder used after build()")]
    AlreadyBuilt,

    /// A file input could not be hashed. The cache error is passed through
    /// untouched so a missing input stays distinguishable.
    #[error(transparent)]
    FileHash(#[from] HashCacheError),
}

impl RuleKeyError {
    /// Returns `true` if a file input does not exist.
    pub fn is_not_found(&self) -> bool {
        matches!(self, RuleKeyError::FileHash(e) if e.is_not_found())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn file_hash_error_is_transparent() {
        let err: RuleKeyError = HashCacheError::NotFound {
            path: PathBuf::from("a.txt"),
        }
        .into();
        assert!(err.is_not_found());
        assert_eq!(err.to_string(), "no such file or directory: a.txt");
    }

    #[test]
    fn already_built_is_not_not_found() {
        assert!(!RuleKeyError::AlreadyBuilt.is_not_found());
    }
}
