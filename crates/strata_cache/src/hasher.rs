//! The loading function: computes a [`HashRecord`] for one path.
//!
//! Files hash their raw bytes. Directories hash their children in byte order
//! of file name, so enumeration order never leaks into the digest. Symlinks
//! are followed hop by hop and must stay inside the project root.

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use strata_common::{HashCode, HashCodeHasher};
use strata_fs::{resolve_link_target, PathKind};

use crate::cache::{DefaultFileHashCache, DirectoryHashing};
use crate::error::HashCacheError;
use crate::record::HashRecord;

/// Maximum number of symlink hops before resolution is treated as a loop.
const MAX_SYMLINK_HOPS: usize = 40;

/// Computes the record for `path`, a normalized root-relative path.
pub(crate) fn load(cache: &DefaultFileHashCache, path: &Path) -> Result<HashRecord, HashCacheError> {
    let fs = cache.filesystem();
    let kind = fs
        .kind(path)
        .map_err(|e| HashCacheError::from_io(path, e))?;
    match kind {
        PathKind::File => hash_file(cache, path),
        PathKind::Directory => hash_directory(cache, path),
        PathKind::Symlink => hash_symlink(cache, path),
    }
}

fn hash_file(cache: &DefaultFileHashCache, path: &Path) -> Result<HashRecord, HashCacheError> {
    let contents = cache
        .filesystem()
        .read(path)
        .map_err(|e| HashCacheError::from_io(path, e))?;
    Ok(HashRecord::new(HashCode::from_bytes(&contents), PathKind::File))
}

fn hash_directory(cache: &DefaultFileHashCache, path: &Path) -> Result<HashRecord, HashCacheError> {
    let mut names: Vec<OsString> = cache
        .filesystem()
        .list_dir(path)
        .map_err(|e| HashCacheError::from_io(path, e))?;
    names.sort();

    let mut hasher = HashCodeHasher::new();
    hasher.update(b"dir\0");
    for name in &names {
        let child = path.join(name);
        hasher.update_framed(name.as_encoded_bytes());

        let child_kind = cache
            .filesystem()
            .kind(&child)
            .map_err(|e| HashCacheError::from_io(&child, e))?;
        if child_kind == PathKind::Directory && cache.directory_hashing() == DirectoryHashing::Shallow {
            hasher.update(&[child_kind.tag()]);
            continue;
        }

        let record = cache.get_normalized(&child)?;
        hasher.update(&[record.kind().tag()]);
        hasher.update(record.hash().as_bytes());
    }
    Ok(HashRecord::new(hasher.finish(), PathKind::Directory))
}

fn hash_symlink(cache: &DefaultFileHashCache, link: &Path) -> Result<HashRecord, HashCacheError> {
    let fs = cache.filesystem();
    let mut current: PathBuf = link.to_path_buf();

    for _ in 0..MAX_SYMLINK_HOPS {
        let raw = fs
            .read_link(&current)
            .map_err(|e| HashCacheError::from_io(&current, e))?;
        let target = resolve_link_target(fs.root(), &current, &raw).map_err(|_| {
            HashCacheError::SymlinkEscapesRoot {
                link: link.to_path_buf(),
                target: raw.clone(),
            }
        })?;
        cache.record_link_target(&target, link);

        let target_kind = fs
            .kind(&target)
            .map_err(|e| HashCacheError::from_io(&target, e))?;

        let mut hasher = HashCodeHasher::new();
        hasher.update(b"symlink\0");
        hasher.update(&[target_kind.tag()]);
        match target_kind {
            PathKind::Symlink => {
                current = target;
                continue;
            }
            PathKind::File => {
                let record = cache.get_normalized(&target)?;
                hasher.update(record.hash().as_bytes());
            }
            PathKind::Directory => {
                hasher.update_framed(target.as_os_str().as_encoded_bytes());
            }
        }
        return Ok(HashRecord::new(hasher.finish(), PathKind::Symlink));
    }

    Err(HashCacheError::SymlinkLoop {
        path: link.to_path_buf(),
    })
}
