//! Applying changes to the destination.

use std::sync::Arc;

use async_stream::try_stream;
use futures::TryStreamExt;
use futures::stream::{BoxStream, StreamExt};
use tokio::io::AsyncWriteExt;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use treesync_core::{Change, ChangeOp, FilesystemView, FsError, OpenMode, SyncError, SyncOptions, path};
use treesync_diff::{diff, walk_files};

use crate::progress::ProgressTracker;
use crate::{ApplyOutcome, SYNC_CHANNEL_SIZE, SyncEvent, SyncedChange};

/// Make `to` match `from` below `options.root`, yielding each change as
/// it is applied.
///
/// Changes are applied strictly in comparator order, one at a time.
/// Ignored changes, and removals when deletions are disabled, are
/// skipped without being yielded. When a skipped removal leaves an
/// entry of the other type in place, the add that would replace it is
/// skipped too. The first failure ends the stream;
/// changes already yielded stay applied. The destination is flushed
/// once after the last change.
pub fn sync<'a>(
    from: &'a dyn FilesystemView,
    to: &'a dyn FilesystemView,
    options: SyncOptions,
) -> BoxStream<'a, Result<SyncedChange, SyncError>> {
    try_stream! {
        let root = path::normalize(&options.root)?;
        info!(
            source = from.name(),
            destination = to.name(),
            %root,
            no_delete = options.no_delete,
            "starting sync"
        );

        let mut changes = diff(from, to, &root);
        let mut applied = 0usize;
        // Destination entry left in place by a skipped removal.
        let mut kept: Option<String> = None;
        while let Some(change) = changes.try_next().await? {
            let kept_here = kept.take().is_some_and(|path| path == change.path);
            if kept_here && change.op == ChangeOp::Add {
                debug!(%change, "destination entry kept, replacement skipped");
                continue;
            }

            if options.should_ignore(&change).await {
                debug!(%change, "ignored");
                if change.op == ChangeOp::Remove {
                    kept = Some(change.path);
                }
                continue;
            }

            if change.op == ChangeOp::Remove && options.no_delete {
                debug!(%change, "kept, deletions disabled");
                kept = Some(change.path);
                continue;
            }

            let synced = apply_change(from, to, &root, &options, change).await?;
            debug!(change = %synced.change, bytes = synced.bytes, "applied");
            applied += 1;
            yield synced;
        }

        to.flush().await?;
        info!(applied, "sync finished");
    }
    .boxed()
}

/// Apply a single change below `root`.
async fn apply_change(
    from: &dyn FilesystemView,
    to: &dyn FilesystemView,
    root: &str,
    options: &SyncOptions,
    change: Change,
) -> Result<SyncedChange, SyncError> {
    if change.op.copies_content() {
        let (outcome, bytes) = copy_entry(from, to, root, options, &change.path).await?;
        return Ok(SyncedChange {
            change,
            outcome,
            bytes,
        });
    }

    let full = path::join(root, &change.path);
    to.remove(&full)
        .await
        .map_err(|e| SyncError::transfer(&full, e))?;
    Ok(SyncedChange::removed(change))
}

/// Copy the source entry at `rel` onto the destination. Directories are
/// materialized with every file below them that the ignore filter lets
/// through.
async fn copy_entry(
    from: &dyn FilesystemView,
    to: &dyn FilesystemView,
    root: &str,
    options: &SyncOptions,
    rel: &str,
) -> Result<(ApplyOutcome, u64), SyncError> {
    let full = path::join(root, rel);
    let stat = from
        .stat(&full)
        .await
        .map_err(|e| SyncError::transfer(&full, e))?;

    if !stat.is_dir() {
        return copy_file(from, to, &full).await;
    }

    to.mkdir(&full)
        .await
        .map_err(|e| SyncError::transfer(&full, e))?;

    let mut outcome = ApplyOutcome::Applied;
    let mut bytes = 0;
    let mut files = walk_files(from, root, rel);
    while let Some(file) = files.try_next().await? {
        let nested = Change::add(file);
        if options.should_ignore(&nested).await {
            debug!(change = %nested, "ignored");
            continue;
        }
        let (file_outcome, file_bytes) =
            copy_file(from, to, &path::join(root, &nested.path)).await?;
        outcome = outcome.merge(file_outcome);
        bytes += file_bytes;
    }
    Ok((outcome, bytes))
}

/// Stream one file's content, then carry over its modification time.
async fn copy_file(
    from: &dyn FilesystemView,
    to: &dyn FilesystemView,
    full: &str,
) -> Result<(ApplyOutcome, u64), SyncError> {
    let transfer = |e: FsError| SyncError::transfer(full, e);

    if let Some(parent) = path::parent(full) {
        to.mkdir(parent).await.map_err(transfer)?;
    }

    let mut source = from.open(full, OpenMode::Read).await.map_err(transfer)?;
    let mut destination = to.open(full, OpenMode::Write).await.map_err(transfer)?;

    let mut reader = source.reader().await.map_err(transfer)?;
    let mut writer = destination.writer().await.map_err(transfer)?;
    let bytes = tokio::io::copy(&mut reader, &mut writer)
        .await
        .map_err(|e| transfer(FsError::io(full, e)))?;
    writer
        .shutdown()
        .await
        .map_err(|e| transfer(FsError::io(full, e)))?;

    let Some(modified) = from.stat(full).await.map_err(transfer)?.modified else {
        return Ok((ApplyOutcome::Applied, bytes));
    };

    let outcome = match destination.set_times(None, modified).await {
        Ok(()) => ApplyOutcome::Applied,
        Err(e) => {
            warn!(path = %full, destination = to.name(), error = %e, "modification time not kept");
            ApplyOutcome::MetadataDegraded {
                reason: e.to_string(),
            }
        }
    };
    Ok((outcome, bytes))
}

/// Run [`sync`] on a background task, reporting through a channel.
///
/// Every applied change produces a [`SyncEvent::Progress`]; the run
/// always ends with one [`SyncEvent::Complete`] carrying the summary and,
/// if the run stopped early, its error. Dropping the receiver stops the
/// run before the next change.
pub fn start_sync(
    from: Arc<dyn FilesystemView>,
    to: Arc<dyn FilesystemView>,
    options: SyncOptions,
) -> mpsc::Receiver<SyncEvent> {
    let (tx, rx) = mpsc::channel(SYNC_CHANNEL_SIZE);

    tokio::spawn(async move {
        sync_impl(from.as_ref(), to.as_ref(), options, tx).await;
    });

    rx
}

async fn sync_impl(
    from: &dyn FilesystemView,
    to: &dyn FilesystemView,
    options: SyncOptions,
    tx: mpsc::Sender<SyncEvent>,
) {
    let mut tracker = ProgressTracker::new();
    let mut changes = sync(from, to, options);

    let error = loop {
        match changes.next().await {
            Some(Ok(synced)) => {
                let progress = tracker.record(synced);
                if tx.send(SyncEvent::Progress(progress)).await.is_err() {
                    debug!("progress receiver dropped, stopping sync");
                    return;
                }
            }
            Some(Err(e)) => break Some(e.to_string()),
            None => break None,
        }
    };

    let _ = tx.send(SyncEvent::Complete(tracker.finish(error))).await;
}

#[cfg(test)]
mod tests {
    use std::time::{Duration, SystemTime};

    use super::*;
    use treesync_fs::MemoryFs;

    fn at(secs: u64) -> Option<SystemTime> {
        Some(SystemTime::UNIX_EPOCH + Duration::from_secs(secs))
    }

    async fn run(from: &MemoryFs, to: &MemoryFs, options: SyncOptions) -> Vec<SyncedChange> {
        sync(from, to, options).try_collect().await.unwrap()
    }

    #[tokio::test]
    async fn test_add_copies_content_and_mtime() {
        let from = MemoryFs::new();
        let to = MemoryFs::new();
        from.insert_file("/a.txt", b"hi", at(42));

        let synced = run(&from, &to, SyncOptions::default()).await;

        assert_eq!(
            synced,
            vec![SyncedChange {
                change: Change::add("/a.txt"),
                outcome: ApplyOutcome::Applied,
                bytes: 2,
            }]
        );
        assert_eq!(to.read_file("/a.txt").as_deref(), Some(&b"hi"[..]));
        assert_eq!(to.modified("/a.txt"), at(42));
        assert_eq!(to.flush_count(), 1);
    }

    #[tokio::test]
    async fn test_nested_add_creates_parents() {
        let from = MemoryFs::new();
        let to = MemoryFs::new();
        from.insert_file("/a/b/c.txt", b"c", at(1));

        run(&from, &to, SyncOptions::default()).await;

        assert!(to.contains("/a/b"));
        assert_eq!(to.read_file("/a/b/c.txt").as_deref(), Some(&b"c"[..]));
    }

    #[tokio::test]
    async fn test_directory_replaces_file() {
        let from = MemoryFs::new();
        let to = MemoryFs::new();
        from.insert_file("/p/inner.txt", b"in", at(3));
        to.insert_file("/p", b"was a file", at(3));

        let synced = run(&from, &to, SyncOptions::default()).await;

        assert_eq!(
            synced.iter().map(|s| s.change.clone()).collect::<Vec<_>>(),
            vec![Change::remove("/p"), Change::add("/p")]
        );
        assert_eq!(synced[1].bytes, 2);
        assert_eq!(to.read_file("/p/inner.txt").as_deref(), Some(&b"in"[..]));
        assert!(run(&from, &to, SyncOptions::default()).await.is_empty());
    }

    #[tokio::test]
    async fn test_no_delete_skips_removals() {
        let from = MemoryFs::new();
        let to = MemoryFs::new();
        to.insert_file("/keep.txt", b"k", None);

        let options = SyncOptions::builder().no_delete(true).build().unwrap();
        assert!(run(&from, &to, options).await.is_empty());
        assert!(to.contains("/keep.txt"));
    }

    #[tokio::test]
    async fn test_degraded_metadata_is_reported() {
        let from = MemoryFs::new();
        let to = MemoryFs::new().without_set_times();
        from.insert_file("/a.txt", b"hi", at(42));

        let synced = run(&from, &to, SyncOptions::default()).await;

        assert_eq!(synced.len(), 1);
        assert!(synced[0].outcome.is_degraded());
        assert_eq!(to.read_file("/a.txt").as_deref(), Some(&b"hi"[..]));
    }

    #[tokio::test]
    async fn test_source_without_mtime_is_applied() {
        let from = MemoryFs::new().without_mtimes();
        let to = MemoryFs::new();
        from.insert_file("/a.txt", b"hi", None);

        let synced = run(&from, &to, SyncOptions::default()).await;
        assert_eq!(synced[0].outcome, ApplyOutcome::Applied);
    }

    #[tokio::test]
    async fn test_start_sync_reports_progress_and_summary() {
        let from = MemoryFs::new();
        let to = MemoryFs::new();
        from.insert_file("/a", b"aa", at(1));
        from.insert_file("/b", b"bbb", at(1));
        to.insert_file("/c", b"c", at(1));

        let mut rx = start_sync(
            Arc::new(from),
            Arc::new(to.clone()),
            SyncOptions::default(),
        );

        let mut progress = Vec::new();
        let mut summary = None;
        while let Some(event) = rx.recv().await {
            match event {
                SyncEvent::Progress(p) => progress.push(p),
                SyncEvent::Complete(s) => summary = Some(s),
            }
        }

        let summary = summary.unwrap();
        assert_eq!(progress.len(), 3);
        assert_eq!(progress[2].changes_applied, 3);
        assert_eq!((summary.added, summary.removed), (2, 1));
        assert_eq!(summary.bytes_copied, 5);
        assert!(summary.is_success());
        assert!(!to.contains("/c"));
    }

    #[tokio::test]
    async fn test_start_sync_reports_failure() {
        let from = MemoryFs::new();
        let to = MemoryFs::new();
        from.insert_file("/a", b"a", at(1));
        from.insert_file("/b", b"b", at(1));
        to.fail_writes_to("/b");

        let mut rx = start_sync(Arc::new(from), Arc::new(to), SyncOptions::default());

        let mut last = None;
        while let Some(event) = rx.recv().await {
            last = Some(event);
        }
        match last {
            Some(SyncEvent::Complete(summary)) => {
                assert_eq!(summary.added, 1);
                assert!(summary.error.unwrap().contains("/b"));
            }
            other => panic!("expected completion, got {other:?}"),
        }
    }
}
