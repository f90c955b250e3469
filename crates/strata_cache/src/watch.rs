//! Filesystem change notifications that drive invalidation.

use std::path::{Path, PathBuf};

/// A change reported by an external file watcher.
///
/// Paths may be absolute (under the project root) or root-relative.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WatchEvent {
    /// A new entry appeared.
    Created(PathBuf),
    /// An existing entry's content or metadata changed.
    Modified(PathBuf),
    /// An entry was removed.
    Deleted(PathBuf),
    /// The watcher dropped events; any resident record may be stale.
    Overflow,
}

impl WatchEvent {
    /// The path the event concerns, if any.
    pub fn path(&self) -> Option<&Path> {
        match self {
            WatchEvent::Created(p) | WatchEvent::Modified(p) | WatchEvent::Deleted(p) => Some(p),
            WatchEvent::Overflow => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn path_accessor() {
        assert_eq!(
            WatchEvent::Modified(PathBuf::from("a.txt")).path(),
            Some(Path::new("a.txt"))
        );
        assert_eq!(WatchEvent::Overflow.path(), None);
    }
}
