//! Slash-separated tree paths.
//!
//! Every path handed to a [`FilesystemView`](crate::FilesystemView) is
//! absolute inside the view: it starts with `/`, has no trailing slash
//! (except the root itself) and no empty or `.` segments.

use crate::SyncError;

/// The root of a tree.
pub const ROOT: &str = "/";

/// Join `rel` onto `base`, collapsing duplicate slashes and `.` segments.
///
/// `rel` is treated as relative even when it starts with `/`, so
/// `join("/data", "/a.txt")` is `/data/a.txt`.
pub fn join(base: &str, rel: &str) -> String {
    collapse(base.split('/').chain(rel.split('/')))
}

/// Path of the entry `name` inside the directory `parent`.
pub fn child(parent: &str, name: &str) -> String {
    if parent == ROOT {
        format!("/{name}")
    } else {
        format!("{parent}/{name}")
    }
}

/// Parent directory of `path`, or `None` for the root.
pub fn parent(path: &str) -> Option<&str> {
    if path == ROOT {
        return None;
    }
    match path.rfind('/') {
        Some(0) => Some(ROOT),
        Some(idx) => Some(&path[..idx]),
        None => Some(ROOT),
    }
}

/// Final segment of `path` (empty for the root).
pub fn file_name(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or_default()
}

/// Bring `path` into canonical form, rejecting `..` segments.
pub fn normalize(path: &str) -> Result<String, SyncError> {
    if path.split('/').any(|segment| segment == "..") {
        return Err(SyncError::InvalidPath {
            path: path.to_string(),
            reason: "parent segments are not allowed".to_string(),
        });
    }
    Ok(collapse(path.split('/')))
}

/// Iterate over the non-root segments of a canonical path.
pub fn segments(path: &str) -> impl Iterator<Item = &str> {
    path.split('/').filter(|s| !s.is_empty())
}

fn collapse<'a>(parts: impl Iterator<Item = &'a str>) -> String {
    let mut out = String::new();
    for part in parts.filter(|p| !p.is_empty() && *p != ".") {
        out.push('/');
        out.push_str(part);
    }
    if out.is_empty() {
        out.push('/');
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_join() {
        assert_eq!(join("/", "/a.txt"), "/a.txt");
        assert_eq!(join("/data", "/a.txt"), "/data/a.txt");
        assert_eq!(join("/data/", "sub//x"), "/data/sub/x");
        assert_eq!(join("/", "/"), "/");
        assert_eq!(join("/data", "/"), "/data");
    }

    #[test]
    fn test_child_and_parent() {
        assert_eq!(child("/", "a"), "/a");
        assert_eq!(child("/a", "b"), "/a/b");
        assert_eq!(parent("/a/b"), Some("/a"));
        assert_eq!(parent("/a"), Some("/"));
        assert_eq!(parent("/"), None);
    }

    #[test]
    fn test_file_name() {
        assert_eq!(file_name("/a/b.txt"), "b.txt");
        assert_eq!(file_name("/"), "");
    }

    #[test]
    fn test_normalize() {
        assert_eq!(normalize("a/./b/").unwrap(), "/a/b");
        assert_eq!(normalize("").unwrap(), "/");
        assert!(normalize("/a/../b").is_err());
    }

    #[test]
    fn test_segments() {
        assert_eq!(segments("/a/b").collect::<Vec<_>>(), vec!["a", "b"]);
        assert_eq!(segments("/").count(), 0);
    }
}
