//! Root-relative path normalization.
//!
//! All cache keys are lexically normalized paths relative to the project
//! root: no `.` components, no `..` components, no leading separator. The
//! root itself is the empty path.

use std::path::{Component, Path, PathBuf};

/// Errors produced while normalizing a path against the project root.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PathError {
    /// The path does not lie inside the project root.
    #[error("path {path} is outside the project root {root}")]
    OutsideRoot {
        /// The offending path, as given.
        path: PathBuf,
        /// The project root it was checked against.
        root: PathBuf,
    },
}

/// Normalizes `path` into a root-relative path.
///
/// Absolute paths must start with `root`. `..` components are resolved
/// lexically and may not climb above the root.
pub fn normalize(root: &Path, path: &Path) -> Result<PathBuf, PathError> {
    let outside = || PathError::OutsideRoot {
        path: path.to_path_buf(),
        root: root.to_path_buf(),
    };

    let relative = if path.is_absolute() {
        path.strip_prefix(root).map_err(|_| outside())?
    } else {
        path
    };

    let mut normalized = PathBuf::new();
    for component in relative.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !normalized.pop() {
                    return Err(outside());
                }
            }
            Component::Normal(part) => normalized.push(part),
            Component::RootDir | Component::Prefix(_) => return Err(outside()),
        }
    }
    Ok(normalized)
}

/// Resolves the raw target of the symlink at `link` into a root-relative path.
///
/// Relative targets are interpreted against the link's parent directory, as
/// the operating system does.
pub fn resolve_link_target(root: &Path, link: &Path, target: &Path) -> Result<PathBuf, PathError> {
    if target.is_absolute() {
        return normalize(root, target);
    }
    let parent = link.parent().unwrap_or_else(|| Path::new(""));
    normalize(root, &parent.join(target)).map_err(|_| PathError::OutsideRoot {
        path: target.to_path_buf(),
        root: root.to_path_buf(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn root() -> PathBuf {
        PathBuf::from("/project")
    }

    #[test]
    fn relative_path_unchanged() {
        let p = normalize(&root(), Path::new("src/a.txt")).unwrap();
        assert_eq!(p, PathBuf::from("src/a.txt"));
    }

    #[test]
    fn absolute_path_relativized() {
        let p = normalize(&root(), Path::new("/project/src/a.txt")).unwrap();
        assert_eq!(p, PathBuf::from("src/a.txt"));
    }

    #[test]
    fn dot_components_removed() {
        let p = normalize(&root(), Path::new("./src/./lib/../a.txt")).unwrap();
        assert_eq!(p, PathBuf::from("src/a.txt"));
    }

    #[test]
    fn root_is_empty_path() {
        assert_eq!(normalize(&root(), Path::new("/project")).unwrap(), PathBuf::new());
        assert_eq!(normalize(&root(), Path::new(".")).unwrap(), PathBuf::new());
    }

    #[test]
    fn absolute_outside_root_rejected() {
        let err = normalize(&root(), Path::new("/etc/passwd")).unwrap_err();
        assert!(matches!(err, PathError::OutsideRoot { .. }));
        assert!(err.to_string().contains("/etc/passwd"));
    }

    #[test]
    fn parent_escape_rejected() {
        assert!(normalize(&root(), Path::new("../other/a.txt")).is_err());
        assert!(normalize(&root(), Path::new("src/../../a.txt")).is_err());
    }

    #[test]
    fn link_target_relative_to_parent() {
        let p = resolve_link_target(&root(), Path::new("src/link"), Path::new("../lib/a.txt"))
            .unwrap();
        assert_eq!(p, PathBuf::from("lib/a.txt"));
    }

    #[test]
    fn link_target_absolute_inside_root() {
        let p = resolve_link_target(&root(), Path::new("link"), Path::new("/project/b.txt"))
            .unwrap();
        assert_eq!(p, PathBuf::from("b.txt"));
    }

    #[test]
    fn link_target_escaping_root_rejected() {
        assert!(resolve_link_target(&root(), Path::new("link"), Path::new("../../x")).is_err());
        assert!(resolve_link_target(&root(), Path::new("link"), Path::new("/tmp/x")).is_err());
    }
}
