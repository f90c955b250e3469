//! An in-memory [`ProjectFilesystem`] for tests and tooling.
//!
//! Directory listings come back in insertion order, which lets tests
//! permute enumeration order deliberately. Reads are counted so callers can
//! assert how often content was actually loaded.

use std::collections::HashMap;
use std::ffi::OsString;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use crate::{PathKind, ProjectFilesystem};

#[derive(Debug, Clone)]
enum Node {
    File(Vec<u8>),
    Directory,
    Symlink(PathBuf),
}

static ROOT: Node = Node::Directory;

#[derive(Debug, Clone)]
struct Entry {
    node: Node,
    seq: u64,
}

#[derive(Debug, Default)]
struct Tree {
    entries: HashMap<PathBuf, Entry>,
    next_seq: u64,
}

impl Tree {
    fn insert(&mut self, path: PathBuf, node: Node) {
        self.ensure_parents(&path);
        let seq = self.next_seq;
        self.next_seq += 1;
        // Overwriting keeps the original position in listings.
        let seq = self.entries.get(&path).map_or(seq, |e| e.seq);
        self.entries.insert(path, Entry { node, seq });
    }

    fn ensure_parents(&mut self, path: &Path) {
        let mut ancestors: Vec<PathBuf> = path
            .ancestors()
            .skip(1)
            .filter(|p| !p.as_os_str().is_empty())
            .map(Path::to_path_buf)
            .collect();
        ancestors.reverse();
        for dir in ancestors {
            if !self.entries.contains_key(&dir) {
                let seq = self.next_seq;
                self.next_seq += 1;
                self.entries.insert(
                    dir,
                    Entry {
                        node: Node::Directory,
                        seq,
                    },
                );
            }
        }
    }

    fn get(&self, path: &Path) -> io::Result<&Node> {
        if path.as_os_str().is_empty() {
            return Ok(&ROOT);
        }
        self.entries
            .get(path)
            .map(|e| &e.node)
            .ok_or_else(|| not_found(path))
    }
}

fn not_found(path: &Path) -> io::Error {
    io::Error::new(
        io::ErrorKind::NotFound,
        format!("no such file or directory: {}", path.display()),
    )
}

/// A fake project tree held entirely in memory.
///
/// Writing a file implicitly creates its parent directories.
#[derive(Debug)]
pub struct InMemoryFilesystem {
    root: PathBuf,
    tree: Mutex<Tree>,
    reads: AtomicUsize,
    read_delay: Mutex<Option<Duration>>,
}

impl InMemoryFilesystem {
    /// Creates an empty tree rooted at the virtual path `/project`.
    pub fn new() -> Self {
        Self::with_root("/project")
    }

    /// Creates an empty tree rooted at the given virtual absolute path.
    pub fn with_root(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            tree: Mutex::new(Tree::default()),
            reads: AtomicUsize::new(0),
            read_delay: Mutex::new(None),
        }
    }

    /// Writes (or overwrites) a regular file.
    pub fn write(&self, path: impl AsRef<Path>, contents: impl AsRef<[u8]>) {
        let mut tree = self.tree.lock().unwrap();
        tree.insert(
            path.as_ref().to_path_buf(),
            Node::File(contents.as_ref().to_vec()),
        );
    }

    /// Creates a directory and any missing parents.
    pub fn mkdir(&self, path: impl AsRef<Path>) {
        let mut tree = self.tree.lock().unwrap();
        tree.insert(path.as_ref().to_path_buf(), Node::Directory);
    }

    /// Creates a symlink at `path` pointing at `target`.
    pub fn symlink(&self, path: impl AsRef<Path>, target: impl Into<PathBuf>) {
        let mut tree = self.tree.lock().unwrap();
        tree.insert(path.as_ref().to_path_buf(), Node::Symlink(target.into()));
    }

    /// Removes the entry at `path` and everything beneath it.
    pub fn remove(&self, path: impl AsRef<Path>) {
        let path = path.as_ref();
        let mut tree = self.tree.lock().unwrap();
        tree.entries.retain(|p, _| !p.starts_with(path));
    }

    /// Number of file reads served so far.
    pub fn read_count(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }

    /// Makes every subsequent file read sleep for `delay` first.
    pub fn set_read_delay(&self, delay: Option<Duration>) {
        *self.read_delay.lock().unwrap() = delay;
    }
}

impl Default for InMemoryFilesystem {
    fn default() -> Self {
        Self::new()
    }
}

impl ProjectFilesystem for InMemoryFilesystem {
    fn root(&self) -> &Path {
        &self.root
    }

    fn exists(&self, path: &Path) -> bool {
        self.tree.lock().unwrap().get(path).is_ok()
    }

    fn kind(&self, path: &Path) -> io::Result<PathKind> {
        let tree = self.tree.lock().unwrap();
        Ok(match tree.get(path)? {
            Node::File(_) => PathKind::File,
            Node::Directory => PathKind::Directory,
            Node::Symlink(_) => PathKind::Symlink,
        })
    }

    fn read(&self, path: &Path) -> io::Result<Vec<u8>> {
        let delay = *self.read_delay.lock().unwrap();
        if let Some(delay) = delay {
            std::thread::sleep(delay);
        }
        let tree = self.tree.lock().unwrap();
        match tree.get(path)? {
            Node::File(contents) => {
                self.reads.fetch_add(1, Ordering::SeqCst);
                Ok(contents.clone())
            }
            _ => Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("not a regular file: {}", path.display()),
            )),
        }
    }

    fn read_link(&self, path: &Path) -> io::Result<PathBuf> {
        let tree = self.tree.lock().unwrap();
        match tree.get(path)? {
            Node::Symlink(target) => Ok(target.clone()),
            _ => Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("not a symlink: {}", path.display()),
            )),
        }
    }

    fn list_dir(&self, path: &Path) -> io::Result<Vec<OsString>> {
        let tree = self.tree.lock().unwrap();
        if !matches!(tree.get(path)?, Node::Directory) {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("not a directory: {}", path.display()),
            ));
        }
        let mut children: Vec<(u64, OsString)> = tree
            .entries
            .iter()
            .filter(|(p, _)| p.parent() == Some(path))
            .filter_map(|(p, e)| p.file_name().map(|name| (e.seq, name.to_os_string())))
            .collect();
        children.sort_by_key(|(seq, _)| *seq);
        Ok(children.into_iter().map(|(_, name)| name).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn write_then_read() {
        let fs = InMemoryFilesystem::new();
        fs.write("a.txt", "v1");
        assert!(fs.exists(Path::new("a.txt")));
        assert_eq!(fs.read(Path::new("a.txt")).unwrap(), b"v1");
        assert_eq!(fs.read_count(), 1);
    }

    #[test]
    fn write_creates_parents() {
        let fs = InMemoryFilesystem::new();
        fs.write("src/lib/a.txt", "x");
        assert_eq!(fs.kind(Path::new("src")).unwrap(), PathKind::Directory);
        assert_eq!(fs.kind(Path::new("src/lib")).unwrap(), PathKind::Directory);
        assert_eq!(
            fs.list_dir(Path::new("")).unwrap(),
            vec![OsString::from("src")]
        );
    }

    #[test]
    fn listing_follows_insertion_order() {
        let fs = InMemoryFilesystem::new();
        fs.write("d/b.txt", "b");
        fs.write("d/a.txt", "a");
        fs.write("d/b.txt", "b2");
        assert_eq!(
            fs.list_dir(Path::new("d")).unwrap(),
            vec![OsString::from("b.txt"), OsString::from("a.txt")]
        );
    }

    #[test]
    fn missing_entries_are_not_found() {
        let fs = InMemoryFilesystem::new();
        assert!(!fs.exists(Path::new("nope")));
        assert_eq!(
            fs.read(Path::new("nope")).unwrap_err().kind(),
            io::ErrorKind::NotFound
        );
        assert_eq!(
            fs.kind(Path::new("nope")).unwrap_err().kind(),
            io::ErrorKind::NotFound
        );
    }

    #[test]
    fn remove_drops_subtree() {
        let fs = InMemoryFilesystem::new();
        fs.write("d/a.txt", "a");
        fs.write("d/e/b.txt", "b");
        fs.remove("d");
        assert!(!fs.exists(Path::new("d")));
        assert!(!fs.exists(Path::new("d/e/b.txt")));
    }

    #[test]
    fn symlink_reports_raw_target() {
        let fs = InMemoryFilesystem::new();
        fs.write("a.txt", "a");
        fs.symlink("link", "a.txt");
        assert_eq!(fs.kind(Path::new("link")).unwrap(), PathKind::Symlink);
        assert_eq!(
            fs.read_link(Path::new("link")).unwrap(),
            PathBuf::from("a.txt")
        );
        assert!(fs.read(Path::new("link")).is_err());
    }

    #[test]
    fn reading_directory_is_an_error() {
        let fs = InMemoryFilesystem::new();
        fs.mkdir("d");
        let err = fs.read(Path::new("d")).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidInput);
    }
}
