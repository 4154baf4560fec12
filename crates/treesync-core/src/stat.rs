//! Entry metadata reported by filesystem views.

use std::time::SystemTime;

use serde::{Deserialize, Serialize};

/// Type of a tree entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntryKind {
    /// Regular file.
    File,
    /// Directory.
    Directory,
    /// Anything else (sockets, devices, unresolved links).
    Other,
}

impl EntryKind {
    /// Check if this is a regular file.
    pub fn is_file(&self) -> bool {
        matches!(self, EntryKind::File)
    }

    /// Check if this is a directory.
    pub fn is_dir(&self) -> bool {
        matches!(self, EntryKind::Directory)
    }
}

/// Metadata for a single entry, produced fresh on every query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntryStat {
    /// Entry type.
    pub kind: EntryKind,

    /// Size in bytes (0 for directories on most backends).
    pub size: u64,

    /// Last modification time, when the backend reports one reliably.
    pub modified: Option<SystemTime>,

    /// Permission bits, when the backend has them.
    pub mode: Option<u32>,
}

impl EntryStat {
    /// Metadata for a file.
    pub fn file(size: u64, modified: Option<SystemTime>) -> Self {
        Self {
            kind: EntryKind::File,
            size,
            modified,
            mode: None,
        }
    }

    /// Metadata for a directory.
    pub fn directory(modified: Option<SystemTime>) -> Self {
        Self {
            kind: EntryKind::Directory,
            size: 0,
            modified,
            mode: None,
        }
    }

    /// Attach permission bits.
    pub fn with_mode(mut self, mode: u32) -> Self {
        self.mode = Some(mode);
        self
    }

    /// Check if this entry is a regular file.
    pub fn is_file(&self) -> bool {
        self.kind.is_file()
    }

    /// Check if this entry is a directory.
    pub fn is_dir(&self) -> bool {
        self.kind.is_dir()
    }
}

/// One item of a directory listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirEntry {
    /// Entry name (not full path).
    pub name: String,
    /// Entry type.
    pub kind: EntryKind,
}

impl DirEntry {
    /// Create a listing entry.
    pub fn new(name: impl Into<String>, kind: EntryKind) -> Self {
        Self {
            name: name.into(),
            kind,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_stat() {
        let stat = EntryStat::file(12, None).with_mode(0o644);
        assert!(stat.is_file());
        assert!(!stat.is_dir());
        assert_eq!(stat.size, 12);
        assert_eq!(stat.mode, Some(0o644));
    }

    #[test]
    fn test_directory_stat() {
        let stat = EntryStat::directory(Some(SystemTime::UNIX_EPOCH));
        assert!(stat.is_dir());
        assert_eq!(stat.size, 0);
    }

    #[test]
    fn test_other_kind() {
        assert!(!EntryKind::Other.is_file());
        assert!(!EntryKind::Other.is_dir());
    }
}
