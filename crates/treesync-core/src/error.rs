//! Error types for filesystem views and sync operations.

use thiserror::Error;

/// Errors reported by a filesystem view.
#[derive(Debug, Error)]
pub enum FsError {
    /// No entry exists at the path.
    #[error("Path not found: {path}")]
    NotFound { path: String },

    /// Generic I/O error.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// The backend cannot perform this operation.
    #[error("{operation} is not supported at {path}")]
    Unsupported {
        operation: &'static str,
        path: String,
    },

    /// The path cannot be resolved inside the view.
    #[error("Invalid path {path}: {reason}")]
    InvalidPath { path: String, reason: String },
}

impl FsError {
    /// Create an I/O error with path context.
    pub fn io(path: impl Into<String>, source: std::io::Error) -> Self {
        let path = path.into();
        match source.kind() {
            std::io::ErrorKind::NotFound => Self::NotFound { path },
            _ => Self::Io { path, source },
        }
    }

    /// Create an unsupported-operation error.
    pub fn unsupported(operation: &'static str, path: impl Into<String>) -> Self {
        Self::Unsupported {
            operation,
            path: path.into(),
        }
    }

    /// Whether this error means the entry is absent.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

/// Errors that end a diff or sync stream.
#[derive(Debug, Error)]
pub enum SyncError {
    /// An entry is neither a file nor a directory.
    #[error("Can only diff files and directories, found another entry type at {path}")]
    TypeMismatch { path: String },

    /// A change record carries an operation outside add/remove/change.
    #[error("Unknown operation {op:?}")]
    UnknownOperation { op: String },

    /// A tree path failed validation.
    #[error("Invalid path {path}: {reason}")]
    InvalidPath { path: String, reason: String },

    /// Copying content or removing an entry on the destination failed.
    #[error("Failed to apply change at {path}: {source}")]
    Transfer {
        path: String,
        #[source]
        source: FsError,
    },

    /// A filesystem view failed outside of applying a change.
    #[error(transparent)]
    Fs(#[from] FsError),

    /// Invalid sync options.
    #[error("Invalid sync options: {message}")]
    InvalidOptions { message: String },
}

impl SyncError {
    /// Wrap a view error raised while applying the change at `path`.
    pub fn transfer(path: impl Into<String>, source: FsError) -> Self {
        Self::Transfer {
            path: path.into(),
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fs_error_io_maps_not_found() {
        let err = FsError::io(
            "/missing",
            std::io::Error::new(std::io::ErrorKind::NotFound, "gone"),
        );
        assert!(err.is_not_found());

        let err = FsError::io(
            "/denied",
            std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        );
        assert!(matches!(err, FsError::Io { .. }));
    }

    #[test]
    fn test_transfer_error_message() {
        let err = SyncError::transfer("/a.txt", FsError::unsupported("write", "/a.txt"));
        let msg = err.to_string();
        assert!(msg.contains("/a.txt"));
        assert!(msg.contains("not supported"));
    }
}
