//! Filesystem capability traits.
//!
//! A [`FilesystemView`] is the only way the comparator and the executor
//! touch a tree. Adapters for local directories, in-memory trees or
//! content-addressed stores all implement it, and the engine depends on
//! nothing else.

use std::pin::Pin;
use std::time::SystemTime;

use async_trait::async_trait;
use tokio::io::{AsyncRead, AsyncWrite};

use crate::{DirEntry, EntryStat, FsError};

/// Byte stream read from a file handle.
pub type BoxedReader = Pin<Box<dyn AsyncRead + Send>>;

/// Byte sink writing into a file handle. Content is committed on shutdown.
pub type BoxedWriter = Pin<Box<dyn AsyncWrite + Send>>;

/// How a file is opened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpenMode {
    /// Read existing content.
    Read,
    /// Create or truncate, then write.
    Write,
}

/// A tree reachable through a minimal set of async filesystem calls.
///
/// Paths are canonical tree paths (see [`crate::path`]) relative to the
/// view's own root.
#[async_trait]
pub trait FilesystemView: Send + Sync {
    /// Short label used in logs.
    fn name(&self) -> &str;

    /// Metadata of the entry at `path`. Absent entries fail with
    /// [`FsError::NotFound`].
    async fn stat(&self, path: &str) -> Result<EntryStat, FsError>;

    /// Entries directly inside the directory at `path`.
    async fn read_dir(&self, path: &str) -> Result<Vec<DirEntry>, FsError>;

    /// Create a directory and any missing parents. Existing directories are fine.
    async fn mkdir(&self, path: &str) -> Result<(), FsError>;

    /// Open the file at `path`.
    async fn open(&self, path: &str, mode: OpenMode) -> Result<Box<dyn FileHandle>, FsError>;

    /// Remove the entry at `path` and everything below it. Absent entries are fine.
    async fn remove(&self, path: &str) -> Result<(), FsError>;

    /// Make previous mutations durable or visible. Backends without such a
    /// barrier keep the default no-op.
    async fn flush(&self) -> Result<(), FsError> {
        Ok(())
    }
}

/// An open file.
#[async_trait]
pub trait FileHandle: Send {
    /// Stream the file's content.
    async fn reader(&mut self) -> Result<BoxedReader, FsError>;

    /// Sink that replaces the file's content.
    async fn writer(&mut self) -> Result<BoxedWriter, FsError>;

    /// Set access and modification times. Backends that cannot do this
    /// return [`FsError::Unsupported`].
    async fn set_times(
        &mut self,
        accessed: Option<SystemTime>,
        modified: SystemTime,
    ) -> Result<(), FsError>;
}
