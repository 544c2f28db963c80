//! Path helpers shared by the interpreter and the commands

use std::path::{Component, Path, PathBuf};

/// Resolve a path relative to the current working directory.
///
/// If the path is absolute, returns it normalized.
/// If relative, joins it with the cwd first.
///
/// # Example
///
/// ```ignore
/// let abs = resolve_path(Path::new("/home"), "/etc/passwd");
/// assert_eq!(abs, PathBuf::from("/etc/passwd"));
///
/// let rel = resolve_path(Path::new("/home"), "file.txt");
/// assert_eq!(rel, PathBuf::from("/home/file.txt"));
/// ```
pub fn resolve_path(cwd: &Path, path_str: &str) -> PathBuf {
    let path = Path::new(path_str);
    let joined = if path.is_absolute() {
        path.to_path_buf()
    } else {
        cwd.join(path)
    };
    normalize_path(&joined)
}

/// Normalize a path by resolving `.` and `..` components.
///
/// `/tmp/../home` becomes `/home`, and `..` above the root stays at `/`.
pub fn normalize_path(path: &Path) -> PathBuf {
    let mut result = PathBuf::new();

    for component in path.components() {
        match component {
            Component::RootDir => result.push("/"),
            Component::Normal(name) => result.push(name),
            Component::ParentDir => {
                result.pop();
            }
            Component::CurDir | Component::Prefix(_) => {}
        }
    }

    if result.as_os_str().is_empty() {
        result.push("/");
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_path_absolute() {
        let cwd = PathBuf::from("/root");
        assert_eq!(resolve_path(&cwd, "/tmp/file.txt"), PathBuf::from("/tmp/file.txt"));
    }

    #[test]
    fn test_resolve_path_relative() {
        let cwd = PathBuf::from("/root");
        assert_eq!(
            resolve_path(&cwd, "downloads/file.txt"),
            PathBuf::from("/root/downloads/file.txt")
        );
    }

    #[test]
    fn test_resolve_path_dotdot_from_root() {
        let cwd = PathBuf::from("/");
        assert_eq!(resolve_path(&cwd, "../.."), PathBuf::from("/"));
    }

    #[test]
    fn test_resolve_path_complex() {
        let cwd = PathBuf::from("/home/user");
        assert_eq!(
            resolve_path(&cwd, "./downloads/../documents/./file.txt"),
            PathBuf::from("/home/user/documents/file.txt")
        );
    }
}
