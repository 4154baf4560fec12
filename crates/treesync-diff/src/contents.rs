//! Byte-exact content comparison.

use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::debug;

use treesync_core::{FilesystemView, FsError, OpenMode, SyncError};

const COMPARE_BUFFER_SIZE: usize = 64 * 1024;

/// Compare the files at `path` in both views byte for byte.
///
/// Both files are streamed; neither is held in memory. Returns `false`
/// at the first differing byte or as soon as one stream ends before the
/// other.
pub async fn compare_contents(
    from: &dyn FilesystemView,
    to: &dyn FilesystemView,
    path: &str,
) -> Result<bool, SyncError> {
    let (mut from_handle, mut to_handle) = futures::try_join!(
        from.open(path, OpenMode::Read),
        to.open(path, OpenMode::Read)
    )?;
    let (from_reader, to_reader) =
        futures::try_join!(from_handle.reader(), to_handle.reader())?;

    let mut left = BufReader::with_capacity(COMPARE_BUFFER_SIZE, from_reader);
    let mut right = BufReader::with_capacity(COMPARE_BUFFER_SIZE, to_reader);
    let mut compared = 0u64;

    loop {
        let (consumed, verdict) = {
            let a = left
                .fill_buf()
                .await
                .map_err(|e| FsError::io(path, e))?;
            let b = right
                .fill_buf()
                .await
                .map_err(|e| FsError::io(path, e))?;

            let n = a.len().min(b.len());
            if n == 0 {
                (0, Some(a.is_empty() && b.is_empty()))
            } else if a[..n] != b[..n] {
                (n, Some(false))
            } else {
                (n, None)
            }
        };

        if let Some(equal) = verdict {
            debug!(path, compared, equal, "content comparison finished");
            return Ok(equal);
        }

        left.consume(consumed);
        right.consume(consumed);
        compared += consumed as u64;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use treesync_fs::MemoryFs;

    #[tokio::test]
    async fn test_equal_contents() {
        let a = MemoryFs::new();
        let b = MemoryFs::new();
        a.insert_file("/x", b"same bytes", None);
        b.insert_file("/x", b"same bytes", None);

        assert!(compare_contents(&a, &b, "/x").await.unwrap());
    }

    #[tokio::test]
    async fn test_different_contents_same_length() {
        let a = MemoryFs::new();
        let b = MemoryFs::new();
        a.insert_file("/x", b"abcd", None);
        b.insert_file("/x", b"abce", None);

        assert!(!compare_contents(&a, &b, "/x").await.unwrap());
    }

    #[tokio::test]
    async fn test_prefix_is_not_equal() {
        let a = MemoryFs::new();
        let b = MemoryFs::new();
        a.insert_file("/x", b"abc", None);
        b.insert_file("/x", b"abcdef", None);

        assert!(!compare_contents(&a, &b, "/x").await.unwrap());
        assert!(!compare_contents(&b, &a, "/x").await.unwrap());
    }

    #[tokio::test]
    async fn test_empty_files_are_equal() {
        let a = MemoryFs::new();
        let b = MemoryFs::new();
        a.insert_file("/x", b"", None);
        b.insert_file("/x", b"", None);

        assert!(compare_contents(&a, &b, "/x").await.unwrap());
    }

    #[tokio::test]
    async fn test_large_files_span_buffers() {
        let a = MemoryFs::new();
        let b = MemoryFs::new();
        let mut data = vec![7u8; COMPARE_BUFFER_SIZE * 3 + 17];
        a.insert_file("/big", &data, None);
        *data.last_mut().unwrap() = 8;
        b.insert_file("/big", &data, None);

        assert!(!compare_contents(&a, &b, "/big").await.unwrap());
    }

    #[tokio::test]
    async fn test_missing_file_is_an_error() {
        let a = MemoryFs::new();
        let b = MemoryFs::new();
        a.insert_file("/x", b"1", None);

        let err = compare_contents(&a, &b, "/x").await.unwrap_err();
        assert!(matches!(err, SyncError::Fs(FsError::NotFound { .. })));
    }
}
