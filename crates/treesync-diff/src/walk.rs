//! Recursive listing of the files below a path.

use async_stream::try_stream;
use futures::stream::{BoxStream, StreamExt};

use treesync_core::{EntryKind, FilesystemView, SyncError, path};

enum Pending {
    File(String),
    Dir(String),
    Unknown(String),
}

/// Stream every file at or below `rel`, depth-first in listing order.
///
/// `rel` and the yielded paths are relative to `root`; the view itself is
/// queried at `root` joined with them. Directories are descended but not
/// yielded. Entries that are neither files nor directories end the stream
/// with [`SyncError::TypeMismatch`].
pub fn walk_files<'a>(
    view: &'a dyn FilesystemView,
    root: &str,
    rel: &str,
) -> BoxStream<'a, Result<String, SyncError>> {
    let root = root.to_string();
    let start = rel.to_string();

    try_stream! {
        let mut stack = vec![Pending::Unknown(start)];

        while let Some(item) = stack.pop() {
            let rel = match item {
                Pending::File(rel) => {
                    yield rel;
                    continue;
                }
                Pending::Dir(rel) => rel,
                Pending::Unknown(rel) => {
                    let stat = view.stat(&path::join(&root, &rel)).await?;
                    match stat.kind {
                        EntryKind::File => {
                            yield rel;
                            continue;
                        }
                        EntryKind::Directory => rel,
                        EntryKind::Other => Err(SyncError::TypeMismatch { path: rel })?,
                    }
                }
            };

            let entries = view.read_dir(&path::join(&root, &rel)).await?;
            for entry in entries.into_iter().rev() {
                let child = path::child(&rel, &entry.name);
                stack.push(match entry.kind {
                    EntryKind::File => Pending::File(child),
                    EntryKind::Directory => Pending::Dir(child),
                    EntryKind::Other => Pending::Unknown(child),
                });
            }
        }
    }
    .boxed()
}
