//! Path validation
//!
//! Confines every client-supplied path to the server root. Paths are first
//! normalized lexically; [`Sandbox::resolve_real`] then repeats the check on
//! the symlink-resolved location before any filesystem operation.

use std::fs;
use std::path::{Component, Path, PathBuf};

use crate::error::StorageError;
use crate::storage::filesystem::{LastComponent, real_location};

/// The server root all client paths are resolved against
#[derive(Debug, Clone)]
pub struct Sandbox {
    root: PathBuf,
}

impl Sandbox {
    /// Wraps an absolute root directory. The directory need not exist.
    pub fn new(root: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let root = root.into();
        if !root.is_absolute() {
            return Err(StorageError::InvalidPath(format!(
                "server root must be absolute: {}",
                root.display()
            )));
        }

        Ok(Self {
            root: normalize(&root),
        })
    }

    /// Creates the root directory if missing and pins it to its canonical form.
    pub fn open(root: &Path) -> Result<Self, StorageError> {
        fs::create_dir_all(root)?;
        Self::new(root.canonicalize()?)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolves a client path against the root.
    ///
    /// An empty path is the root itself. Existence is not checked.
    pub fn resolve(&self, relative: &str) -> Result<PathBuf, StorageError> {
        // Path::join replaces the root when `relative` is absolute;
        // containment below rejects it unless it still lands inside.
        self.contain(&self.root.join(relative), relative)
    }

    /// Normalizes `candidate` and checks it is the root or lies beneath it.
    ///
    /// `requested` is the client-facing form of the path, used in the error.
    pub fn contain(&self, candidate: &Path, requested: &str) -> Result<PathBuf, StorageError> {
        let normalized = normalize(candidate);

        // Component-wise: /data/app does not contain /data/app-evil
        if normalized.starts_with(&self.root) {
            Ok(normalized)
        } else {
            Err(StorageError::SandboxViolation(requested.to_string()))
        }
    }

    /// [`resolve`](Self::resolve), then containment of the real location.
    ///
    /// The root must be canonical, as [`Sandbox::open`] makes it.
    pub async fn resolve_real(
        &self,
        relative: &str,
        last: LastComponent,
    ) -> Result<PathBuf, StorageError> {
        let lexical = self.resolve(relative)?;
        self.contain_real(&lexical, relative, last).await
    }

    /// [`contain`](Self::contain) applied to both the path and its real location
    pub async fn contain_real(
        &self,
        candidate: &Path,
        requested: &str,
        last: LastComponent,
    ) -> Result<PathBuf, StorageError> {
        let lexical = self.contain(candidate, requested)?;
        let real = real_location(&lexical, last, requested).await?;
        self.contain(&real, requested)
    }

    pub fn is_root(&self, path: &Path) -> bool {
        path == self.root
    }
}

/// Validates a bare file name: exactly one normal path component.
pub fn validate_filename(filename: &str) -> Result<&str, StorageError> {
    let unsafe_name = || StorageError::SandboxViolation(filename.to_string());

    if filename.is_empty()
        || filename.contains('\0')
        || filename.contains('/')
        || filename.contains('\\')
    {
        return Err(unsafe_name());
    }

    let mut components = Path::new(filename).components();
    match (components.next(), components.next()) {
        (Some(Component::Normal(_)), None) => Ok(filename),
        _ => Err(unsafe_name()),
    }
}

/// Lexically folds `.` and `..` segments. `..` never climbs above the
/// filesystem root.
fn normalize(path: &Path) -> PathBuf {
    let mut normalized = PathBuf::new();

    for component in path.components() {
        match component {
            Component::Prefix(_) | Component::RootDir => normalized.push(component.as_os_str()),
            Component::CurDir => {}
            Component::ParentDir => {
                normalized.pop();
            }
            Component::Normal(part) => normalized.push(part),
        }
    }

    normalized
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    fn sandbox(root: &str) -> Sandbox {
        Sandbox::new(root).unwrap()
    }

    #[test]
    fn test_empty_path_is_root() {
        let sb = sandbox("/srv/files");
        assert_eq!(sb.resolve("").unwrap(), PathBuf::from("/srv/files"));
        assert_eq!(sb.resolve(".").unwrap(), PathBuf::from("/srv/files"));
    }

    #[test]
    fn test_paths_inside_root_resolve_under_root() {
        let sb = sandbox("/srv/files");
        for rel in ["docs", "docs/a.txt", "a/b/../c", "./x/./y", "docs/", "a/../a/b"] {
            let resolved = sb.resolve(rel).unwrap();
            assert!(resolved.starts_with("/srv/files"), "{rel} -> {resolved:?}");
        }
        assert_eq!(
            sb.resolve("a/b/../c").unwrap(),
            PathBuf::from("/srv/files/a/c")
        );
    }

    #[test]
    fn test_parent_traversal_rejected() {
        let sb = sandbox("/srv/files");
        for rel in ["..", "../etc/passwd", "docs/../../x", "a/b/../../../..", "./../files-x"] {
            assert!(
                matches!(sb.resolve(rel), Err(StorageError::SandboxViolation(_))),
                "{rel} should be rejected"
            );
        }
    }

    #[test]
    fn test_traversal_that_returns_inside_root_is_allowed() {
        let sb = sandbox("/srv/files");
        assert_eq!(
            sb.resolve("../files/docs").unwrap(),
            PathBuf::from("/srv/files/docs")
        );
    }

    #[test]
    fn test_absolute_input_outside_root_rejected() {
        let sb = sandbox("/srv/files");
        assert!(matches!(
            sb.resolve("/etc/passwd"),
            Err(StorageError::SandboxViolation(_))
        ));
        assert!(matches!(
            sb.resolve("//etc"),
            Err(StorageError::SandboxViolation(_))
        ));
    }

    #[test]
    fn test_prefix_check_is_segment_aware() {
        let sb = sandbox("/data/app");
        assert!(matches!(
            sb.resolve("../app-evil/x"),
            Err(StorageError::SandboxViolation(_))
        ));
        assert!(matches!(
            sb.resolve("/data/app-evil/x"),
            Err(StorageError::SandboxViolation(_))
        ));
        assert!(
            sb.contain(Path::new("/data/app-evil/x"), "x").is_err(),
            "sibling sharing a name prefix must not pass"
        );
    }

    #[test]
    fn test_root_is_normalized_on_construction() {
        let sb = sandbox("/srv/./files/sub/..");
        assert_eq!(sb.root(), Path::new("/srv/files"));
        assert!(sb.is_root(&sb.resolve("").unwrap()));
    }

    #[test]
    fn test_relative_root_rejected() {
        assert!(matches!(
            Sandbox::new("relative/root"),
            Err(StorageError::InvalidPath(_))
        ));
    }

    #[test]
    fn test_contain_checks_composed_paths() {
        let sb = sandbox("/srv/files");
        let parent = sb.resolve("docs").unwrap();
        assert!(sb.contain(&parent.join("b.txt"), "b.txt").is_ok());
        assert!(sb.contain(&parent.join("../../evil"), "../../evil").is_err());
    }

    #[test]
    fn test_validate_filename() {
        for ok in ["a.txt", "report 2024.pdf", "...", ".hidden"] {
            assert_eq!(validate_filename(ok).unwrap(), ok);
        }
        for bad in ["", ".", "..", "../../evil", "a/b", "a\\b", "/abs", "nul\0byte"] {
            assert!(
                matches!(validate_filename(bad), Err(StorageError::SandboxViolation(_))),
                "{bad:?} should be rejected"
            );
        }
    }
}
