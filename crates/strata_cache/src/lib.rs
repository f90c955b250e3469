//! Memoized content hashing of project files.
//!
//! The [`FileHashCache`] maps root-relative paths to [`HashRecord`]s. Records
//! are computed lazily on first request, shared by every concurrent caller
//! for the same path, and dropped on invalidation so that a later request
//! always observes the current on-disk content.

#![warn(missing_docs)]

pub mod cache;
pub mod error;
mod hasher;
pub mod record;
pub mod watch;

pub use cache::{DefaultFileHashCache, DirectoryHashing, FileHashCache};
pub use error::HashCacheError;
pub use record::HashRecord;
pub use strata_fs::PathKind;
pub use watch::WatchEvent;
