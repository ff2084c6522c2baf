//! Relative path handling shared by the filesystem-like adapters.
//!
//! Paths handed to `open` are `/`-separated and relative to the source root:
//!
//! ```
//! use geoshow_fs::clean_relative;
//!
//! assert_eq!(clean_relative("./2024//trip/IMG_01.jpg").unwrap(), "2024/trip/IMG_01.jpg");
//! assert!(clean_relative("../etc/passwd").is_err());
//! ```

use crate::error::{FsError, Result};

/// Normalise a relative path: drop `.` and empty segments, reject `..`.
///
/// A single leading `/` is tolerated since served paths are often written
/// that way; the result never starts with one.
pub fn clean_relative(path: &str) -> Result<String> {
    let mut parts = Vec::new();
    for segment in path.trim_start_matches('/').split('/') {
        match segment {
            "" | "." => continue,
            ".." => return Err(FsError::InvalidPath(path.to_string())),
            s if s.contains('\\') || s.contains('\0') => {
                return Err(FsError::InvalidPath(path.to_string()))
            }
            s => parts.push(s),
        }
    }
    Ok(parts.join("/"))
}

/// Join a root and a relative path, where `.` or empty means "no prefix".
pub fn join(root: &str, path: &str) -> String {
    let root = root.trim_matches('/');
    if root.is_empty() || root == "." {
        path.to_string()
    } else if path.is_empty() {
        root.to_string()
    } else {
        format!("{}/{}", root, path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clean_relative() {
        assert_eq!(clean_relative("a/b.jpg").unwrap(), "a/b.jpg");
        assert_eq!(clean_relative("/a/./b.jpg").unwrap(), "a/b.jpg");
        assert_eq!(clean_relative(".").unwrap(), "");
        assert!(clean_relative("a/../../b").is_err());
        assert!(clean_relative("a\\b").is_err());
    }

    #[test]
    fn test_join() {
        assert_eq!(join(".", "a.jpg"), "a.jpg");
        assert_eq!(join("", "a.jpg"), "a.jpg");
        assert_eq!(join("photos/", "a.jpg"), "photos/a.jpg");
        assert_eq!(join("photos", ""), "photos");
    }
}
