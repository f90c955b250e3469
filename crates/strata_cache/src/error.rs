//! Error types for hash cache lookups.

use std::io;
use std::path::PathBuf;

use strata_fs::PathError;

/// Errors returned by [`FileHashCache::get`](crate::FileHashCache::get).
///
/// [`NotFound`](Self::NotFound) is kept separate from every other I/O failure
/// so callers can treat "never existed" differently from "could not read".
#[derive(Debug, thiserror::Error)]
pub enum HashCacheError {
    /// The path does not exist on the backing filesystem.
    #[error("no such file or directory: {path}")]
    NotFound {
        /// The missing path, relative to the project root.
        path: PathBuf,
    },

    /// Reading or statting the path failed for a reason other than absence.
    #[error("I/O error while hashing {path}: {source}")]
    Io {
        /// The path that failed, relative to the project root.
        path: PathBuf,
        /// The underlying I/O error.
        source: io::Error,
    },

    /// The requested path is not inside the project root.
    #[error(transparent)]
    OutsideRoot(#[from] PathError),

    /// A symlink resolves to a location outside the project root.
    #[error("symlink {link} points outside the project root: {target}")]
    SymlinkEscapesRoot {
        /// The symlink, relative to the project root.
        link: PathBuf,
        /// Its raw target.
        target: PathBuf,
    },

    /// Symlink resolution did not terminate.
    #[error("too many levels of symbolic links at {path}")]
    SymlinkLoop {
        /// The symlink where resolution started.
        path: PathBuf,
    },
}

impl HashCacheError {
    /// Classifies an I/O error, splitting out [`io::ErrorKind::NotFound`].
    pub fn from_io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        let path = path.into();
        if source.kind() == io::ErrorKind::NotFound {
            HashCacheError::NotFound { path }
        } else {
            HashCacheError::Io { path, source }
        }
    }

    /// Returns `true` for [`NotFound`](Self::NotFound).
    pub fn is_not_found(&self) -> bool {
        matches!(self, HashCacheError::NotFound { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_split_from_other_io() {
        let err = HashCacheError::from_io(
            "a.txt",
            io::Error::new(io::ErrorKind::NotFound, "gone"),
        );
        assert!(err.is_not_found());

        let err = HashCacheError::from_io(
            "a.txt",
            io::Error::new(io::ErrorKind::PermissionDenied, "denied"),
        );
        assert!(!err.is_not_found());
        assert!(matches!(err, HashCacheError::Io { .. }));
    }

    #[test]
    fn display_includes_path() {
        let err = HashCacheError::NotFound {
            path: PathBuf::from("hello.java"),
        };
        assert_eq!(err.to_string(), "no such file or directory: hello.java");

        let err = HashCacheError::SymlinkLoop {
            path: PathBuf::from("loop"),
        };
        assert!(err.to_string().contains("loop"));
    }
}
