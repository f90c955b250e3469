//! The memoizing hash cache.
//!
//! [`DefaultFileHashCache`] keeps one slot per resident path. A slot is
//! created by the first `get`, filled exactly once by whichever caller wins
//! its load lock, and shared with every other caller that arrives while the
//! load is in flight. Invalidation removes slots from the map instead of
//! mutating them, so a reader either sees a complete record or no record.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, OnceLock};

use rayon::prelude::*;
use strata_fs::{normalize, ProjectFilesystem};

use crate::error::HashCacheError;
use crate::hasher;
use crate::record::HashRecord;
use crate::watch::WatchEvent;

/// How child directories contribute to a directory's hash.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DirectoryHashing {
    /// Child directories contribute their own full hash.
    #[default]
    Recursive,
    /// Child directories contribute only their name and kind.
    Shallow,
}

/// A per-session store of path hashes.
///
/// Implementations must be safe to share between worker threads without
/// external locking.
pub trait FileHashCache: Send + Sync {
    /// Returns `true` if `path` is inside the tree this cache serves.
    fn will_get(&self, path: &Path) -> bool;

    /// Returns the record for `path`, computing and caching it if needed.
    fn get(&self, path: &Path) -> Result<HashRecord, HashCacheError>;

    /// Returns `true` if a record for `path` is resident. Never loads.
    fn contains(&self, path: &Path) -> bool;

    /// Drops the record for exactly `path`. A no-op if none is resident.
    fn invalidate(&self, path: &Path);

    /// Drops every resident record.
    fn invalidate_all(&self);
}

#[derive(Default)]
struct Slot {
    value: OnceLock<HashRecord>,
    load: Mutex<()>,
}

/// The standard [`FileHashCache`], backed by a [`ProjectFilesystem`].
pub struct DefaultFileHashCache {
    fs: Arc<dyn ProjectFilesystem>,
    directory_hashing: DirectoryHashing,
    slots: Mutex<HashMap<PathBuf, Arc<Slot>>>,
    /// Symlink targets mapped to the links resolved through them.
    link_dependents: Mutex<HashMap<PathBuf, HashSet<PathBuf>>>,
    loads: AtomicUsize,
}

impl DefaultFileHashCache {
    /// Creates an empty cache over `fs` with recursive directory hashing.
    pub fn new(fs: Arc<dyn ProjectFilesystem>) -> Self {
        Self::with_directory_hashing(fs, DirectoryHashing::default())
    }

    /// Creates an empty cache with the given directory hashing mode.
    pub fn with_directory_hashing(
        fs: Arc<dyn ProjectFilesystem>,
        directory_hashing: DirectoryHashing,
    ) -> Self {
        Self {
            fs,
            directory_hashing,
            slots: Mutex::new(HashMap::new()),
            link_dependents: Mutex::new(HashMap::new()),
            loads: AtomicUsize::new(0),
        }
    }

    /// The filesystem this cache reads from.
    pub fn filesystem(&self) -> &dyn ProjectFilesystem {
        self.fs.as_ref()
    }

    /// The configured directory hashing mode.
    pub fn directory_hashing(&self) -> DirectoryHashing {
        self.directory_hashing
    }

    /// Seeds the cache with a precomputed record, replacing any resident one.
    pub fn put(&self, path: &Path, record: HashRecord) -> Result<(), HashCacheError> {
        let key = self.normalize(path)?;
        let slot = Slot::default();
        let _ = slot.value.set(record);
        self.slots.lock().unwrap().insert(key, Arc::new(slot));
        Ok(())
    }

    /// Hashes many paths in parallel, returning results in input order.
    pub fn get_many(&self, paths: &[PathBuf]) -> Vec<Result<HashRecord, HashCacheError>> {
        paths.par_iter().map(|p| self.get(p)).collect()
    }

    /// Number of resident records.
    pub fn len(&self) -> usize {
        self.slots
            .lock()
            .unwrap()
            .values()
            .filter(|s| s.value.get().is_some())
            .count()
    }

    /// Returns `true` if no record is resident.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of loads performed so far (cache misses that computed a record).
    pub fn load_count(&self) -> usize {
        self.loads.load(Ordering::Relaxed)
    }

    /// Applies a watcher notification.
    ///
    /// A changed path invalidates itself, everything resident beneath it,
    /// every ancestor directory, and every symlink that resolved through it.
    /// [`WatchEvent::Overflow`] invalidates everything.
    pub fn on_watch_event(&self, event: &WatchEvent) {
        let Some(path) = event.path() else {
            tracing::debug!("watch overflow, invalidating all file hashes");
            self.invalidate_all();
            return;
        };
        let key = match self.normalize(path) {
            Ok(key) => key,
            Err(_) => {
                tracing::debug!(path = %path.display(), "ignoring watch event outside project root");
                return;
            }
        };

        let mut pending = vec![key];
        let mut seen = HashSet::new();
        while let Some(changed) = pending.pop() {
            if !seen.insert(changed.clone()) {
                continue;
            }
            self.invalidate_subtree(&changed);
            for ancestor in changed.ancestors().skip(1) {
                self.invalidate_exact(ancestor);
            }
            let dependents = self.link_dependents.lock().unwrap().remove(&changed);
            pending.extend(dependents.into_iter().flatten());
        }
    }

    /// Returns the record for an already-normalized path.
    pub(crate) fn get_normalized(&self, key: &Path) -> Result<HashRecord, HashCacheError> {
        let slot = {
            let mut slots = self.slots.lock().unwrap();
            Arc::clone(slots.entry(key.to_path_buf()).or_default())
        };
        if let Some(record) = slot.value.get() {
            return Ok(*record);
        }

        let _guard = slot.load.lock().unwrap();
        if let Some(record) = slot.value.get() {
            return Ok(*record);
        }

        self.loads.fetch_add(1, Ordering::Relaxed);
        match hasher::load(self, key) {
            Ok(record) => {
                let _ = slot.value.set(record);
                tracing::debug!(path = %key.display(), record = %record, "hashed path");
                Ok(record)
            }
            Err(err) => {
                self.discard(key, &slot);
                tracing::debug!(path = %key.display(), error = %err, "failed to hash path");
                Err(err)
            }
        }
    }

    pub(crate) fn record_link_target(&self, target: &Path, link: &Path) {
        self.link_dependents
            .lock()
            .unwrap()
            .entry(target.to_path_buf())
            .or_default()
            .insert(link.to_path_buf());
    }

    fn normalize(&self, path: &Path) -> Result<PathBuf, HashCacheError> {
        Ok(normalize(self.fs.root(), path)?)
    }

    /// Removes the slot for `key` only if it is still the one that failed.
    fn discard(&self, key: &Path, slot: &Arc<Slot>) {
        let mut slots = self.slots.lock().unwrap();
        if slots.get(key).is_some_and(|s| Arc::ptr_eq(s, slot)) {
            slots.remove(key);
        }
    }

    fn invalidate_exact(&self, key: &Path) {
        self.slots.lock().unwrap().remove(key);
        self.forget_links(|link| link == key);
    }

    fn invalidate_subtree(&self, key: &Path) {
        self.slots
            .lock()
            .unwrap()
            .retain(|path, _| !path.starts_with(key));
        self.forget_links(|link| link.starts_with(key));
    }

    /// Drops link registrations whose slot is gone. A link is registered
    /// again when it is next hashed.
    fn forget_links(&self, evicted: impl Fn(&Path) -> bool) {
        self.link_dependents.lock().unwrap().retain(|_, links| {
            links.retain(|link| !evicted(link));
            !links.is_empty()
        });
    }
}

impl FileHashCache for DefaultFileHashCache {
    fn will_get(&self, path: &Path) -> bool {
        self.normalize(path).is_ok()
    }

    fn get(&self, path: &Path) -> Result<HashRecord, HashCacheError> {
        let key = self.normalize(path)?;
        self.get_normalized(&key)
    }

    fn contains(&self, path: &Path) -> bool {
        let Ok(key) = self.normalize(path) else {
            return false;
        };
        self.slots
            .lock()
            .unwrap()
            .get(&key)
            .is_some_and(|s| s.value.get().is_some())
    }

    fn invalidate(&self, path: &Path) {
        if let Ok(key) = self.normalize(path) {
            self.invalidate_exact(&key);
        }
    }

    fn invalidate_all(&self) {
        self.slots.lock().unwrap().clear();
        self.link_dependents.lock().unwrap().clear();
    }
}
