use std::sync::Arc;
use std::time::SystemTime;

use treesync_core::{
    Change, ChangeFilter, ChangeOp, EntryKind, EntryStat, FsError, SyncError, SyncOptions, path,
};

#[test]
fn test_change_serializes_lowercase() {
    let change = Change::change("/dir/x.txt");
    let json = serde_json::to_string(&change).unwrap();
    assert_eq!(json, r#"{"op":"change","path":"/dir/x.txt"}"#);

    let back: Change = serde_json::from_str(r#"{"op":"remove","path":"/y"}"#).unwrap();
    assert_eq!(back, Change::remove("/y"));
}

#[test]
fn test_unknown_operation_is_rejected() {
    let err = "rename".parse::<ChangeOp>().unwrap_err();
    assert!(matches!(err, SyncError::UnknownOperation { ref op } if op == "rename"));
    assert!(serde_json::from_str::<Change>(r#"{"op":"rename","path":"/y"}"#).is_err());
}

#[test]
fn test_path_helpers_agree() {
    let joined = path::join("/base", "/sub/file.txt");
    assert_eq!(joined, "/base/sub/file.txt");
    assert_eq!(path::parent(&joined), Some("/base/sub"));
    assert_eq!(path::file_name(&joined), "file.txt");
    assert_eq!(path::child("/base/sub", "file.txt"), joined);
    assert_eq!(path::join("/", "/"), "/");
}

#[test]
fn test_entry_stat_constructors() {
    let now = SystemTime::now();
    let file = EntryStat::file(10, Some(now)).with_mode(0o644);
    assert!(file.is_file());
    assert_eq!(file.mode, Some(0o644));

    let dir = EntryStat::directory(None);
    assert_eq!(dir.kind, EntryKind::Directory);
    assert_eq!(dir.size, 0);
}

#[test]
fn test_fs_error_wraps_into_sync_error() {
    let err: SyncError = FsError::NotFound {
        path: "/gone".to_string(),
    }
    .into();
    assert!(matches!(err, SyncError::Fs(ref e) if e.is_not_found()));
    assert_eq!(err.to_string(), "Path not found: /gone");
}

#[tokio::test]
async fn test_options_builder() {
    let filter: Arc<dyn ChangeFilter> = Arc::new(|change: &Change| change.op == ChangeOp::Remove);
    let options = SyncOptions::builder()
        .root("/data")
        .no_delete(true)
        .ignore(filter)
        .build()
        .unwrap();

    assert_eq!(options.root, "/data");
    assert!(options.no_delete);
    assert!(options.should_ignore(&Change::remove("/x")).await);
    assert!(!options.should_ignore(&Change::add("/x")).await);

    assert!(SyncOptions::builder().root("relative").build().is_err());
    assert!(SyncOptions::builder().root("/a/../b").build().is_err());
}
