//! Core types and traits for treesync.
//!
//! This crate provides the data model shared by the comparator and the
//! executor: change records, entry metadata, tree paths, sync options and
//! the filesystem capability traits every storage adapter implements.

mod change;
mod config;
mod error;
pub mod path;
mod stat;
mod view;

pub use change::{Change, ChangeOp};
pub use config::{ChangeFilter, SyncOptions, SyncOptionsBuilder};
pub use error::{FsError, SyncError};
pub use stat::{DirEntry, EntryKind, EntryStat};
pub use view::{BoxedReader, BoxedWriter, FileHandle, FilesystemView, OpenMode};
