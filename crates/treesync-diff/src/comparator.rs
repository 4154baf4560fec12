//! Depth-first tree comparison.

use std::collections::HashSet;

use async_stream::try_stream;
use futures::TryStreamExt;
use futures::stream::{BoxStream, StreamExt};
use tracing::debug;

use treesync_core::{Change, EntryKind, EntryStat, FilesystemView, SyncError, path};

use crate::contents::compare_contents;
use crate::walk::walk_files;

/// Pending work, popped from the back of the stack.
#[derive(Debug)]
enum Step {
    /// Compare the entry at this path on both sides.
    Compare(String),
    /// Source-only file.
    Add(String),
    /// Source-only entry that may hold many files.
    AddTree(String),
    /// Destination-only entry.
    Remove(String),
}

/// Stream the changes that turn `to` into a copy of `from` below `root`.
///
/// Yielded paths are relative to `root` and start with `/`. Within each
/// directory, source entries come first in source listing order, each
/// fully expanded before the next, followed by removals of
/// destination-only entries in destination listing order.
///
/// The stream ends with [`SyncError::TypeMismatch`] when it meets an
/// entry that is neither a file nor a directory, and with
/// [`SyncError::Fs`] when a view fails for any reason other than a
/// missing entry.
pub fn diff<'a>(
    from: &'a dyn FilesystemView,
    to: &'a dyn FilesystemView,
    root: &str,
) -> BoxStream<'a, Result<Change, SyncError>> {
    let root = root.to_string();

    try_stream! {
        let root = path::normalize(&root)?;
        let mut stack = vec![Step::Compare(path::ROOT.to_string())];

        while let Some(step) = stack.pop() {
            match step {
                Step::Add(rel) => yield Change::add(rel),
                Step::Remove(rel) => yield Change::remove(rel),
                Step::AddTree(rel) => {
                    let mut files = walk_files(from, &root, &rel);
                    while let Some(file) = files.try_next().await? {
                        yield Change::add(file);
                    }
                }
                Step::Compare(rel) => {
                    let full = path::join(&root, &rel);
                    let (from_stat, to_stat) =
                        futures::try_join!(stat_opt(from, &full), stat_opt(to, &full))?;
                    debug!(path = %rel, source = ?from_stat.as_ref().map(|s| s.kind),
                        destination = ?to_stat.as_ref().map(|s| s.kind), "comparing");

                    let (from_stat, to_stat) = match (from_stat, to_stat) {
                        (None, None) => continue,
                        (None, Some(_)) => {
                            yield Change::remove(rel);
                            continue;
                        }
                        (Some(_), None) => {
                            stack.push(Step::AddTree(rel));
                            continue;
                        }
                        (Some(from_stat), Some(to_stat)) => (from_stat, to_stat),
                    };

                    if from_stat.kind == EntryKind::Other || to_stat.kind == EntryKind::Other {
                        Err(SyncError::TypeMismatch { path: rel.clone() })?;
                    }

                    if from_stat.kind != to_stat.kind {
                        yield Change::remove(rel.clone());
                        yield Change::add(rel);
                        continue;
                    }

                    if from_stat.is_file() {
                        if files_differ(from, to, &full, &from_stat, &to_stat).await? {
                            yield Change::change(rel);
                        }
                        continue;
                    }

                    let (from_entries, to_entries) =
                        futures::try_join!(from.read_dir(&full), to.read_dir(&full))?;
                    let from_names: HashSet<&str> =
                        from_entries.iter().map(|e| e.name.as_str()).collect();
                    let to_names: HashSet<&str> =
                        to_entries.iter().map(|e| e.name.as_str()).collect();

                    for entry in to_entries.iter().rev() {
                        if !from_names.contains(entry.name.as_str()) {
                            stack.push(Step::Remove(path::child(&rel, &entry.name)));
                        }
                    }
                    for entry in from_entries.iter().rev() {
                        let child = path::child(&rel, &entry.name);
                        stack.push(if to_names.contains(entry.name.as_str()) {
                            Step::Compare(child)
                        } else if entry.kind.is_file() {
                            Step::Add(child)
                        } else {
                            Step::AddTree(child)
                        });
                    }
                }
            }
        }
    }
    .boxed()
}

/// `stat` that reports absence as `None`.
async fn stat_opt(view: &dyn FilesystemView, path: &str) -> Result<Option<EntryStat>, SyncError> {
    match view.stat(path).await {
        Ok(stat) => Ok(Some(stat)),
        Err(e) if e.is_not_found() => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// Decide whether two files at the same path hold different bytes.
///
/// Different sizes settle it at once. Matching sizes with matching
/// modification times count as equal. Anything else is settled by
/// reading both files.
async fn files_differ(
    from: &dyn FilesystemView,
    to: &dyn FilesystemView,
    full: &str,
    from_stat: &EntryStat,
    to_stat: &EntryStat,
) -> Result<bool, SyncError> {
    if from_stat.size != to_stat.size {
        return Ok(true);
    }
    if let (Some(a), Some(b)) = (from_stat.modified, to_stat.modified) {
        if a == b {
            return Ok(false);
        }
    }
    Ok(!compare_contents(from, to, full).await?)
}
