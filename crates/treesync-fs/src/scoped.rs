//! Local directory view.

use std::fs::FileTimes;
use std::io;
use std::path::PathBuf;
use std::time::SystemTime;

use async_trait::async_trait;
use tokio::fs;
use tracing::debug;

use treesync_core::{
    BoxedReader, BoxedWriter, DirEntry, EntryKind, EntryStat, FileHandle, FilesystemView,
    FsError, OpenMode, path,
};

/// A local directory exposed as a tree rooted at `/`.
///
/// View paths never escape the root: `..` segments are rejected.
/// Symbolic links are followed; dangling links are treated as absent.
/// Entries whose names are not valid UTF-8 cannot be addressed by a view
/// path and are left out of listings.
#[derive(Debug, Clone)]
pub struct ScopedFs {
    root: PathBuf,
    label: String,
}

impl ScopedFs {
    /// Expose the directory at `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        let label = root.display().to_string();
        Self { root, label }
    }

    /// Map a view path onto the local filesystem.
    pub fn resolve(&self, view_path: &str) -> Result<PathBuf, FsError> {
        let mut resolved = self.root.clone();
        for segment in path::segments(view_path) {
            if segment == ".." {
                return Err(FsError::InvalidPath {
                    path: view_path.to_string(),
                    reason: "parent segments are not allowed".to_string(),
                });
            }
            if segment != "." {
                resolved.push(segment);
            }
        }
        Ok(resolved)
    }
}

fn kind_of(metadata: &std::fs::Metadata) -> EntryKind {
    if metadata.is_file() {
        EntryKind::File
    } else if metadata.is_dir() {
        EntryKind::Directory
    } else {
        EntryKind::Other
    }
}

#[cfg(unix)]
fn mode_of(metadata: &std::fs::Metadata) -> Option<u32> {
    use std::os::unix::fs::PermissionsExt;
    Some(metadata.permissions().mode())
}

#[cfg(not(unix))]
fn mode_of(_metadata: &std::fs::Metadata) -> Option<u32> {
    None
}

#[async_trait]
impl FilesystemView for ScopedFs {
    fn name(&self) -> &str {
        &self.label
    }

    async fn stat(&self, view_path: &str) -> Result<EntryStat, FsError> {
        let local = self.resolve(view_path)?;
        let metadata = fs::metadata(&local)
            .await
            .map_err(|e| FsError::io(view_path, e))?;

        Ok(EntryStat {
            kind: kind_of(&metadata),
            size: metadata.len(),
            modified: metadata.modified().ok(),
            mode: mode_of(&metadata),
        })
    }

    async fn read_dir(&self, view_path: &str) -> Result<Vec<DirEntry>, FsError> {
        let local = self.resolve(view_path)?;
        let mut reader = fs::read_dir(&local)
            .await
            .map_err(|e| FsError::io(view_path, e))?;

        let mut entries = Vec::new();
        while let Some(entry) = reader
            .next_entry()
            .await
            .map_err(|e| FsError::io(view_path, e))?
        {
            let name = match entry.file_name().into_string() {
                Ok(name) => name,
                Err(raw) => {
                    debug!(path = %path::child(view_path, &raw.to_string_lossy()), "skipping non-UTF-8 name");
                    continue;
                }
            };

            let file_type = entry
                .file_type()
                .await
                .map_err(|e| FsError::io(path::child(view_path, &name), e))?;

            let kind = if file_type.is_symlink() {
                match fs::metadata(entry.path()).await {
                    Ok(metadata) => kind_of(&metadata),
                    Err(e) if e.kind() == io::ErrorKind::NotFound => {
                        debug!(path = %path::child(view_path, &name), "skipping dangling link");
                        continue;
                    }
                    Err(e) => return Err(FsError::io(path::child(view_path, &name), e)),
                }
            } else if file_type.is_file() {
                EntryKind::File
            } else if file_type.is_dir() {
                EntryKind::Directory
            } else {
                EntryKind::Other
            };

            entries.push(DirEntry::new(name, kind));
        }

        entries.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(entries)
    }

    async fn mkdir(&self, view_path: &str) -> Result<(), FsError> {
        let local = self.resolve(view_path)?;
        fs::create_dir_all(&local)
            .await
            .map_err(|e| FsError::io(view_path, e))
    }

    async fn open(&self, view_path: &str, mode: OpenMode) -> Result<Box<dyn FileHandle>, FsError> {
        let local = self.resolve(view_path)?;
        let file = match mode {
            OpenMode::Read => fs::File::open(&local).await,
            OpenMode::Write => fs::File::create(&local).await,
        }
        .map_err(|e| FsError::io(view_path, e))?;

        Ok(Box::new(ScopedHandle {
            file,
            path: view_path.to_string(),
        }))
    }

    async fn remove(&self, view_path: &str) -> Result<(), FsError> {
        let local = self.resolve(view_path)?;
        let metadata = match fs::symlink_metadata(&local).await {
            Ok(metadata) => metadata,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(()),
            Err(e) => return Err(FsError::io(view_path, e)),
        };

        let result = if metadata.is_dir() {
            fs::remove_dir_all(&local).await
        } else {
            fs::remove_file(&local).await
        };

        match result {
            Err(e) if e.kind() != io::ErrorKind::NotFound => Err(FsError::io(view_path, e)),
            _ => Ok(()),
        }
    }
}

struct ScopedHandle {
    file: fs::File,
    path: String,
}

impl ScopedHandle {
    async fn duplicate(&self) -> Result<fs::File, FsError> {
        self.file
            .try_clone()
            .await
            .map_err(|e| FsError::io(self.path.clone(), e))
    }
}

#[async_trait]
impl FileHandle for ScopedHandle {
    async fn reader(&mut self) -> Result<BoxedReader, FsError> {
        Ok(Box::pin(self.duplicate().await?))
    }

    async fn writer(&mut self) -> Result<BoxedWriter, FsError> {
        Ok(Box::pin(self.duplicate().await?))
    }

    async fn set_times(
        &mut self,
        accessed: Option<SystemTime>,
        modified: SystemTime,
    ) -> Result<(), FsError> {
        let file = self.duplicate().await?.into_std().await;
        let path = self.path.clone();

        let mut times = FileTimes::new().set_modified(modified);
        if let Some(accessed) = accessed {
            times = times.set_accessed(accessed);
        }

        tokio::task::spawn_blocking(move || file.set_times(times))
            .await
            .map_err(|e| FsError::io(path.clone(), io::Error::other(e)))?
            .map_err(|e| FsError::io(path, e))
    }
}
