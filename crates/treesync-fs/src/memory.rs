//! In-memory filesystem view.

use std::io;
use std::pin::Pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::task::{Context, Poll};
use std::time::SystemTime;

use async_trait::async_trait;
use dashmap::{DashMap, DashSet};
use tokio::io::AsyncWrite;

use treesync_core::{
    BoxedReader, BoxedWriter, DirEntry, EntryKind, EntryStat, FileHandle, FilesystemView,
    FsError, OpenMode, path,
};

#[derive(Debug, Clone)]
enum Node {
    File {
        data: Arc<[u8]>,
        modified: Option<SystemTime>,
    },
    Directory {
        modified: Option<SystemTime>,
    },
    Other,
}

/// A tree held in memory, keyed by canonical path.
///
/// Clones share the same tree. Listings are sorted by name.
#[derive(Debug, Clone)]
pub struct MemoryFs {
    label: String,
    nodes: Arc<DashMap<String, Node>>,
    failing_writes: Arc<DashSet<String>>,
    flushes: Arc<AtomicUsize>,
    report_mtimes: bool,
    set_times_supported: bool,
}

impl MemoryFs {
    /// Create an empty tree containing only the root directory.
    pub fn new() -> Self {
        Self::named("memory")
    }

    /// Create an empty tree with a log label.
    pub fn named(label: impl Into<String>) -> Self {
        let nodes = DashMap::new();
        nodes.insert(path::ROOT.to_string(), Node::Directory { modified: None });
        Self {
            label: label.into(),
            nodes: Arc::new(nodes),
            failing_writes: Arc::new(DashSet::new()),
            flushes: Arc::new(AtomicUsize::new(0)),
            report_mtimes: true,
            set_times_supported: true,
        }
    }

    /// Never report modification times from `stat`.
    pub fn without_mtimes(mut self) -> Self {
        self.report_mtimes = false;
        self
    }

    /// Reject `set_times` with [`FsError::Unsupported`].
    pub fn without_set_times(mut self) -> Self {
        self.set_times_supported = false;
        self
    }

    /// Make every write to `path` fail.
    pub fn fail_writes_to(&self, path: &str) {
        self.failing_writes.insert(path.to_string());
    }

    /// Add a file, creating its parent directories.
    pub fn insert_file(&self, path: &str, data: impl AsRef<[u8]>, modified: Option<SystemTime>) {
        self.ensure_parents(path);
        self.nodes.insert(
            path.to_string(),
            Node::File {
                data: Arc::from(data.as_ref()),
                modified,
            },
        );
    }

    /// Add a directory, creating its parents.
    pub fn insert_dir(&self, path: &str, modified: Option<SystemTime>) {
        self.ensure_parents(path);
        self.nodes
            .insert(path.to_string(), Node::Directory { modified });
    }

    /// Add an entry that is neither a file nor a directory.
    pub fn insert_other(&self, path: &str) {
        self.ensure_parents(path);
        self.nodes.insert(path.to_string(), Node::Other);
    }

    /// Content of the file at `path`, if there is one.
    pub fn read_file(&self, path: &str) -> Option<Vec<u8>> {
        match self.nodes.get(path).as_deref() {
            Some(Node::File { data, .. }) => Some(data.to_vec()),
            _ => None,
        }
    }

    /// Stored modification time of the entry at `path`.
    pub fn modified(&self, path: &str) -> Option<SystemTime> {
        match self.nodes.get(path).as_deref() {
            Some(Node::File { modified, .. }) | Some(Node::Directory { modified }) => *modified,
            _ => None,
        }
    }

    /// Whether any entry exists at `path`.
    pub fn contains(&self, path: &str) -> bool {
        self.nodes.contains_key(path)
    }

    /// All paths in the tree except the root, sorted.
    pub fn paths(&self) -> Vec<String> {
        let mut paths: Vec<String> = self
            .nodes
            .iter()
            .map(|entry| entry.key().clone())
            .filter(|p| p != path::ROOT)
            .collect();
        paths.sort();
        paths
    }

    /// Number of times `flush` has been called.
    pub fn flush_count(&self) -> usize {
        self.flushes.load(Ordering::SeqCst)
    }

    fn ensure_parents(&self, target: &str) {
        let mut current = path::parent(target);
        while let Some(dir) = current {
            self.nodes
                .entry(dir.to_string())
                .or_insert(Node::Directory { modified: None });
            current = path::parent(dir);
        }
    }

    fn write_error(&self, path: &str) -> Option<FsError> {
        self.failing_writes.contains(path).then(|| {
            FsError::io(
                path,
                io::Error::new(io::ErrorKind::PermissionDenied, "writes are disabled"),
            )
        })
    }
}

impl Default for MemoryFs {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl FilesystemView for MemoryFs {
    fn name(&self) -> &str {
        &self.label
    }

    async fn stat(&self, path: &str) -> Result<EntryStat, FsError> {
        let node = self
            .nodes
            .get(path)
            .map(|n| n.value().clone())
            .ok_or_else(|| FsError::NotFound {
                path: path.to_string(),
            })?;

        let visible = |m: Option<SystemTime>| if self.report_mtimes { m } else { None };
        Ok(match node {
            Node::File { data, modified } => EntryStat::file(data.len() as u64, visible(modified)),
            Node::Directory { modified } => EntryStat::directory(visible(modified)),
            Node::Other => EntryStat {
                kind: EntryKind::Other,
                size: 0,
                modified: None,
                mode: None,
            },
        })
    }

    async fn read_dir(&self, dir: &str) -> Result<Vec<DirEntry>, FsError> {
        match self.nodes.get(dir).as_deref() {
            Some(Node::Directory { .. }) => {}
            Some(_) => {
                return Err(FsError::io(
                    dir,
                    io::Error::new(io::ErrorKind::NotADirectory, "not a directory"),
                ));
            }
            None => {
                return Err(FsError::NotFound {
                    path: dir.to_string(),
                });
            }
        }

        let mut entries: Vec<DirEntry> = self
            .nodes
            .iter()
            .filter(|entry| entry.key() != path::ROOT && path::parent(entry.key()) == Some(dir))
            .map(|entry| {
                let kind = match entry.value() {
                    Node::File { .. } => EntryKind::File,
                    Node::Directory { .. } => EntryKind::Directory,
                    Node::Other => EntryKind::Other,
                };
                DirEntry::new(path::file_name(entry.key()), kind)
            })
            .collect();
        entries.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(entries)
    }

    async fn mkdir(&self, dir: &str) -> Result<(), FsError> {
        if let Some(err) = self.write_error(dir) {
            return Err(err);
        }
        let mut missing = Vec::new();
        let mut current = Some(dir);
        while let Some(p) = current {
            match self.nodes.get(p).as_deref() {
                Some(Node::Directory { .. }) => break,
                Some(_) => {
                    return Err(FsError::io(
                        p,
                        io::Error::new(io::ErrorKind::AlreadyExists, "not a directory"),
                    ));
                }
                None => missing.push(p.to_string()),
            }
            current = path::parent(p);
        }
        let now = Some(SystemTime::now());
        for p in missing.into_iter().rev() {
            self.nodes.insert(p, Node::Directory { modified: now });
        }
        Ok(())
    }

    async fn open(&self, file: &str, mode: OpenMode) -> Result<Box<dyn FileHandle>, FsError> {
        match mode {
            OpenMode::Read => match self.nodes.get(file).as_deref() {
                Some(Node::File { .. }) => {}
                Some(_) => {
                    return Err(FsError::io(
                        file,
                        io::Error::new(io::ErrorKind::IsADirectory, "not a file"),
                    ));
                }
                None => {
                    return Err(FsError::NotFound {
                        path: file.to_string(),
                    });
                }
            },
            OpenMode::Write => {
                if let Some(err) = self.write_error(file) {
                    return Err(err);
                }
                let parent = path::parent(file).unwrap_or(path::ROOT);
                if !matches!(self.nodes.get(parent).as_deref(), Some(Node::Directory { .. })) {
                    return Err(FsError::NotFound {
                        path: parent.to_string(),
                    });
                }
                if matches!(self.nodes.get(file).as_deref(), Some(Node::Directory { .. })) {
                    return Err(FsError::io(
                        file,
                        io::Error::new(io::ErrorKind::IsADirectory, "is a directory"),
                    ));
                }
            }
        }

        Ok(Box::new(MemoryHandle {
            fs: self.clone(),
            path: file.to_string(),
        }))
    }

    async fn remove(&self, target: &str) -> Result<(), FsError> {
        if let Some(err) = self.write_error(target) {
            return Err(err);
        }
        let prefix = if target == path::ROOT {
            path::ROOT.to_string()
        } else {
            format!("{target}/")
        };
        let doomed: Vec<String> = self
            .nodes
            .iter()
            .map(|entry| entry.key().clone())
            .filter(|key| key != path::ROOT && (key == target || key.starts_with(&prefix)))
            .collect();
        for key in doomed {
            self.nodes.remove(&key);
        }
        Ok(())
    }

    async fn flush(&self) -> Result<(), FsError> {
        self.flushes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

struct MemoryHandle {
    fs: MemoryFs,
    path: String,
}

#[async_trait]
impl FileHandle for MemoryHandle {
    async fn reader(&mut self) -> Result<BoxedReader, FsError> {
        match self.fs.nodes.get(&self.path).as_deref() {
            Some(Node::File { data, .. }) => Ok(Box::pin(io::Cursor::new(data.clone()))),
            _ => Err(FsError::NotFound {
                path: self.path.clone(),
            }),
        }
    }

    async fn writer(&mut self) -> Result<BoxedWriter, FsError> {
        Ok(Box::pin(MemoryWriter {
            nodes: self.fs.nodes.clone(),
            path: self.path.clone(),
            buf: Vec::new(),
        }))
    }

    async fn set_times(
        &mut self,
        _accessed: Option<SystemTime>,
        modified: SystemTime,
    ) -> Result<(), FsError> {
        if !self.fs.set_times_supported {
            return Err(FsError::unsupported("set_times", self.path.clone()));
        }
        match self.fs.nodes.get_mut(&self.path).as_deref_mut() {
            Some(Node::File { modified: m, .. }) | Some(Node::Directory { modified: m }) => {
                *m = Some(modified);
                Ok(())
            }
            _ => Err(FsError::NotFound {
                path: self.path.clone(),
            }),
        }
    }
}

/// Buffers written bytes and publishes them as the file's content on shutdown.
struct MemoryWriter {
    nodes: Arc<DashMap<String, Node>>,
    path: String,
    buf: Vec<u8>,
}

impl AsyncWrite for MemoryWriter {
    fn poll_write(
        self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
        data: &[u8],
    ) -> Poll<io::Result<usize>> {
        self.get_mut().buf.extend_from_slice(data);
        Poll::Ready(Ok(data.len()))
    }

    fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Ok(()))
    }

    fn poll_shutdown(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        let this = self.get_mut();
        let data: Arc<[u8]> = Arc::from(std::mem::take(&mut this.buf));
        this.nodes.insert(
            this.path.clone(),
            Node::File {
                data,
                modified: Some(SystemTime::now()),
            },
        );
        Poll::Ready(Ok(()))
    }
}
