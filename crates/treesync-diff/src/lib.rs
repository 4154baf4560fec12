//! Tree comparison for treesync.
//!
//! This crate turns two [`FilesystemView`]s into a lazy stream of
//! [`Change`] records describing how the destination must be mutated to
//! match the source.
//!
//! # Overview
//!
//! - **Depth-first** traversal over an explicit work stack, so depth is
//!   bounded by memory rather than call frames
//! - **Pairwise I/O**: both `stat` calls, and both listings, of a level
//!   are awaited together
//! - **Content is the ground truth**: timestamps only short-circuit the
//!   comparison when they agree; otherwise bytes are compared
//!
//! # Example
//!
//! ```rust,no_run
//! use futures::TryStreamExt;
//! use treesync_diff::diff;
//! # async fn run(from: &dyn treesync_core::FilesystemView, to: &dyn treesync_core::FilesystemView)
//! # -> Result<(), treesync_core::SyncError> {
//! let changes: Vec<_> = diff(from, to, "/").try_collect().await?;
//! for change in changes {
//!     println!("{change}");
//! }
//! # Ok(())
//! # }
//! ```

mod comparator;
mod contents;
mod walk;

pub use comparator::diff;
pub use contents::compare_contents;
pub use walk::walk_files;

// Re-export core types for convenience
pub use treesync_core::{Change, ChangeOp, FilesystemView, SyncError};
