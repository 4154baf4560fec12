use std::time::{Duration, SystemTime};

use futures::TryStreamExt;
use tempfile::TempDir;
use treesync_core::{FilesystemView, SyncError};
use treesync_diff::{Change, diff, walk_files};
use treesync_fs::{MemoryFs, ScopedFs};

async fn collect(from: &dyn FilesystemView, to: &dyn FilesystemView, root: &str) -> Vec<Change> {
    diff(from, to, root).try_collect().await.unwrap()
}

fn at(secs: u64) -> Option<SystemTime> {
    Some(SystemTime::UNIX_EPOCH + Duration::from_secs(secs))
}

#[tokio::test]
async fn test_single_file_into_empty_tree() {
    let from = MemoryFs::new();
    let to = MemoryFs::new();
    from.insert_file("/a.txt", "hi", None);

    assert_eq!(collect(&from, &to, "/").await, vec![Change::add("/a.txt")]);
}

#[tokio::test]
async fn test_source_entries_before_destination_removals() {
    let from = MemoryFs::new();
    let to = MemoryFs::new();
    from.insert_file("/dir/x.txt", "1", at(1));
    to.insert_file("/dir/x.txt", "2", at(2));
    to.insert_file("/dir/y.txt", "3", at(2));

    assert_eq!(
        collect(&from, &to, "/").await,
        vec![Change::change("/dir/x.txt"), Change::remove("/dir/y.txt")]
    );
}

#[tokio::test]
async fn test_file_replaced_by_directory() {
    let from = MemoryFs::new();
    let to = MemoryFs::new();
    from.insert_file("/p", "file", None);
    to.insert_file("/p/nested/deep.txt", "d", None);

    assert_eq!(
        collect(&from, &to, "/").await,
        vec![Change::remove("/p"), Change::add("/p")]
    );
}

#[tokio::test]
async fn test_directory_replaced_by_file() {
    let from = MemoryFs::new();
    let to = MemoryFs::new();
    from.insert_file("/p/inner.txt", "i", None);
    to.insert_file("/p", "file", None);

    assert_eq!(
        collect(&from, &to, "/").await,
        vec![Change::remove("/p"), Change::add("/p")]
    );
}

#[tokio::test]
async fn test_identical_bytes_with_different_mtimes() {
    let from = MemoryFs::new();
    let to = MemoryFs::new();
    from.insert_file("/same.txt", "content", at(10));
    to.insert_file("/same.txt", "content", at(20));

    assert!(collect(&from, &to, "/").await.is_empty());
}

#[tokio::test]
async fn test_reverse_direction_is_not_empty() {
    let a = MemoryFs::new();
    let b = MemoryFs::new();
    a.insert_file("/only-a.txt", "a", None);
    b.insert_file("/only-b.txt", "b", None);

    assert_eq!(
        collect(&a, &b, "/").await,
        vec![Change::add("/only-a.txt"), Change::remove("/only-b.txt")]
    );
    assert_eq!(
        collect(&b, &a, "/").await,
        vec![Change::add("/only-b.txt"), Change::remove("/only-a.txt")]
    );
}

#[tokio::test]
async fn test_depth_first_order() {
    let from = MemoryFs::new();
    let to = MemoryFs::new();
    for (path, data) in [("/a/1.txt", "1"), ("/a/b/2.txt", "2"), ("/c.txt", "3")] {
        from.insert_file(path, data, None);
    }
    to.insert_dir("/a", None);

    assert_eq!(
        collect(&from, &to, "/").await,
        vec![
            Change::add("/a/1.txt"),
            Change::add("/a/b/2.txt"),
            Change::add("/c.txt"),
        ]
    );
}

#[tokio::test]
async fn test_paths_are_relative_to_root() {
    let from = MemoryFs::new();
    let to = MemoryFs::new();
    from.insert_file("/base/sub/new.txt", "n", None);
    from.insert_file("/outside.txt", "o", None);
    to.insert_dir("/base", None);

    assert_eq!(
        collect(&from, &to, "/base").await,
        vec![Change::add("/sub/new.txt")]
    );
}

#[tokio::test]
async fn test_walk_files_lists_leaves() {
    let view = MemoryFs::new();
    view.insert_file("/t/a.txt", "a", None);
    view.insert_file("/t/z/b.txt", "b", None);
    view.insert_dir("/t/empty", None);

    let files: Vec<String> = walk_files(&view, "/", "/t").try_collect().await.unwrap();
    assert_eq!(files, vec!["/t/a.txt".to_string(), "/t/z/b.txt".to_string()]);
}

#[tokio::test]
async fn test_other_entry_below_added_directory_fails() {
    let from = MemoryFs::new();
    let to = MemoryFs::new();
    from.insert_other("/new/fifo");

    let result: Result<Vec<Change>, _> = diff(&from, &to, "/").try_collect().await;
    assert!(matches!(result, Err(SyncError::TypeMismatch { path }) if path == "/new/fifo"));
}

#[tokio::test]
async fn test_local_directories() {
    let src = TempDir::new().unwrap();
    let dst = TempDir::new().unwrap();
    std::fs::create_dir(src.path().join("docs")).unwrap();
    std::fs::write(src.path().join("docs/readme.md"), "hello").unwrap();
    std::fs::write(dst.path().join("stale.log"), "old").unwrap();

    let from = ScopedFs::new(src.path());
    let to = ScopedFs::new(dst.path());

    assert_eq!(
        collect(&from, &to, "/").await,
        vec![Change::add("/docs/readme.md"), Change::remove("/stale.log")]
    );
}
