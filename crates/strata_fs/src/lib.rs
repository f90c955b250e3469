//! Filesystem access for the Strata build cache.
//!
//! The hash cache never touches `std::fs` directly. It reads through the
//! [`ProjectFilesystem`] trait, which exposes a project tree addressed by
//! root-relative paths. [`DiskFilesystem`] serves a real directory and
//! [`InMemoryFilesystem`] serves a fake tree for tests.

#![warn(missing_docs)]

pub mod disk;
pub mod memory;
pub mod path;

use std::ffi::OsString;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

pub use disk::DiskFilesystem;
pub use memory::InMemoryFilesystem;
pub use path::{normalize, resolve_link_target, PathError};

/// The kind of a filesystem entry, as reported without following symlinks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PathKind {
    /// A regular file.
    File,
    /// A directory.
    Directory,
    /// A symbolic link.
    Symlink,
}

impl PathKind {
    /// A one-byte tag used when a kind is fed into a digest.
    pub fn tag(self) -> u8 {
        match self {
            PathKind::File => b'f',
            PathKind::Directory => b'd',
            PathKind::Symlink => b'l',
        }
    }
}

/// A project tree rooted at a single directory.
///
/// Every path argument is relative to [`root`](Self::root) and already
/// normalized (see [`normalize`]). The empty path names the root itself.
/// Missing entries are reported as [`io::ErrorKind::NotFound`].
pub trait ProjectFilesystem: Send + Sync {
    /// Absolute path of the project root.
    fn root(&self) -> &Path;

    /// Returns `true` if an entry (of any kind) exists at `path`.
    fn exists(&self, path: &Path) -> bool;

    /// Returns the kind of the entry at `path` without following symlinks.
    fn kind(&self, path: &Path) -> io::Result<PathKind>;

    /// Reads the full contents of the regular file at `path`.
    fn read(&self, path: &Path) -> io::Result<Vec<u8>>;

    /// Returns the raw target of the symlink at `path`.
    fn read_link(&self, path: &Path) -> io::Result<PathBuf>;

    /// Lists the names of the immediate children of the directory at `path`.
    ///
    /// The order is unspecified.
    fn list_dir(&self, path: &Path) -> io::Result<Vec<OsString>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_tags_are_distinct() {
        let tags = [
            PathKind::File.tag(),
            PathKind::Directory.tag(),
            PathKind::Symlink.tag(),
        ];
        assert_ne!(tags[0], tags[1]);
        assert_ne!(tags[1], tags[2]);
        assert_ne!(tags[0], tags[2]);
    }
}
