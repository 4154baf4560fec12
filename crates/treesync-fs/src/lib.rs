//! Filesystem views for treesync.
//!
//! Two [`FilesystemView`](treesync_core::FilesystemView) implementations:
//!
//! - [`ScopedFs`]: a local directory, with every view path resolved
//!   below a fixed root
//! - [`MemoryFs`]: an in-memory tree; with modification times turned
//!   off it behaves like a content-addressed store that cannot report
//!   or set them

mod memory;
mod scoped;

pub use memory::MemoryFs;
pub use scoped::ScopedFs;
