//! A [`ProjectFilesystem`] backed by a real directory.

use std::ffi::OsString;
use std::io;
use std::path::{Path, PathBuf};

use crate::{PathKind, ProjectFilesystem};

/// Serves a project tree from disk.
///
/// The root is canonicalized at construction so that absolute symlink targets
/// can be compared against it.
#[derive(Debug, Clone)]
pub struct DiskFilesystem {
    root: PathBuf,
}

impl DiskFilesystem {
    /// Creates a filesystem rooted at `root`, which must exist.
    pub fn new(root: &Path) -> io::Result<Self> {
        Ok(Self {
            root: root.canonicalize()?,
        })
    }

    fn resolve(&self, path: &Path) -> PathBuf {
        self.root.join(path)
    }
}

impl ProjectFilesystem for DiskFilesystem {
    fn root(&self) -> &Path {
        &self.root
    }

    fn exists(&self, path: &Path) -> bool {
        std::fs::symlink_metadata(self.resolve(path)).is_ok()
    }

    fn kind(&self, path: &Path) -> io::Result<PathKind> {
        let file_type = std::fs::symlink_metadata(self.resolve(path))?.file_type();
        Ok(if file_type.is_symlink() {
            PathKind::Symlink
        } else if file_type.is_dir() {
            PathKind::Directory
        } else {
            PathKind::File
        })
    }

    fn read(&self, path: &Path) -> io::Result<Vec<u8>> {
        std::fs::read(self.resolve(path))
    }

    fn read_link(&self, path: &Path) -> io::Result<PathBuf> {
        std::fs::read_link(self.resolve(path))
    }

    fn list_dir(&self, path: &Path) -> io::Result<Vec<OsString>> {
        std::fs::read_dir(self.resolve(path))?
            .map(|entry| entry.map(|e| e.file_name()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_fs() -> (tempfile::TempDir, DiskFilesystem) {
        let dir = tempfile::tempdir().unwrap();
        let fs = DiskFilesystem::new(dir.path()).unwrap();
        (dir, fs)
    }

    #[test]
    fn reads_file_relative_to_root() {
        let (dir, fs) = make_fs();
        std::fs::write(dir.path().join("a.txt"), "v1").unwrap();
        assert!(fs.exists(Path::new("a.txt")));
        assert_eq!(fs.kind(Path::new("a.txt")).unwrap(), PathKind::File);
        assert_eq!(fs.read(Path::new("a.txt")).unwrap(), b"v1");
    }

    #[test]
    fn missing_file_is_not_found() {
        let (_dir, fs) = make_fs();
        assert!(!fs.exists(Path::new("missing.txt")));
        let err = fs.read(Path::new("missing.txt")).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::NotFound);
        let err = fs.kind(Path::new("missing.txt")).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::NotFound);
    }

    #[test]
    fn lists_directory_children() {
        let (dir, fs) = make_fs();
        std::fs::create_dir(dir.path().join("src")).unwrap();
        std::fs::write(dir.path().join("src/a.txt"), "a").unwrap();
        std::fs::write(dir.path().join("src/b.txt"), "b").unwrap();

        assert_eq!(fs.kind(Path::new("src")).unwrap(), PathKind::Directory);
        let mut names = fs.list_dir(Path::new("src")).unwrap();
        names.sort();
        assert_eq!(names, vec![OsString::from("a.txt"), OsString::from("b.txt")]);
    }

    #[cfg(unix)]
    #[test]
    fn reports_symlinks_without_following() {
        let (dir, fs) = make_fs();
        std::fs::write(dir.path().join("target.txt"), "t").unwrap();
        std::os::unix::fs::symlink("target.txt", dir.path().join("link")).unwrap();

        assert_eq!(fs.kind(Path::new("link")).unwrap(), PathKind::Symlink);
        assert_eq!(fs.read_link(Path::new("link")).unwrap(), PathBuf::from("target.txt"));
    }
}
