//! Resolution of cache settings against a project root.

use crate::types::{CacheMode, ProjectConfig};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Cache settings with the directory made absolute and the timeout typed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedCache {
    /// The selected backend.
    pub mode: CacheMode,
    /// Absolute cache directory (meaningful for [`CacheMode::Dir`]).
    pub dir: PathBuf,
    /// Per-operation timeout.
    pub timeout: Duration,
    /// zlib level for stores.
    pub compression_level: u32,
    /// Skip stores.
    pub read_only: bool,
}

/// Resolves the `[cache]` section of `config` for a project rooted at `project_dir`.
///
/// A relative `cache.dir` is joined onto `project_dir`; an absolute one is kept.
pub fn resolve_cache(config: &ProjectConfig, project_dir: &Path) -> ResolvedCache {
    let cache = &config.cache;
    let dir = Path::new(&cache.dir);
    ResolvedCache {
        mode: cache.mode,
        dir: if dir.is_absolute() {
            dir.to_path_buf()
        } else {
            project_dir.join(dir)
        },
        timeout: Duration::from_millis(cache.timeout_ms),
        compression_level: cache.compression_level,
        read_only: cache.read_only,
    }
}
