//! Sync executor for treesync.
//!
//! This crate applies the changes produced by
//! [`treesync_diff::diff`] to a destination view, one change at a time,
//! streaming file content and propagating modification times where the
//! destination allows it. Progress can be consumed directly as a stream
//! ([`sync`]) or through a channel from a background task ([`start_sync`]).

mod executor;
mod outcome;
mod progress;

pub use executor::{start_sync, sync};
pub use outcome::{ApplyOutcome, SyncedChange};
pub use progress::{SyncEvent, SyncProgress, SyncSummary};

// Re-export core types for convenience
pub use treesync_core::{Change, ChangeOp, FilesystemView, SyncError, SyncOptions};

/// Default channel buffer size for sync progress updates.
pub const SYNC_CHANNEL_SIZE: usize = 100;
