//! Progress reporting types for sync runs.

use std::time::{Duration, Instant};

use treesync_core::ChangeOp;

use crate::SyncedChange;

/// Message sent through the channel of [`start_sync`](crate::start_sync).
#[derive(Debug, Clone)]
pub enum SyncEvent {
    /// A change was applied.
    Progress(SyncProgress),
    /// The run ended, successfully or not.
    Complete(SyncSummary),
}

/// Progress information for an ongoing sync.
#[derive(Debug, Clone)]
pub struct SyncProgress {
    /// The change just applied.
    pub last: SyncedChange,
    /// Number of changes applied so far.
    pub changes_applied: usize,
    /// Number of bytes copied so far.
    pub bytes_copied: u64,
    /// Time elapsed since the sync started.
    pub elapsed: Duration,
}

/// Result of a finished sync.
#[derive(Debug, Clone, Default)]
pub struct SyncSummary {
    /// Files added.
    pub added: usize,
    /// Files whose content was replaced.
    pub changed: usize,
    /// Entries removed.
    pub removed: usize,
    /// Copies whose modification time could not be kept.
    pub degraded: usize,
    /// Total bytes copied.
    pub bytes_copied: u64,
    /// Error that ended the run early, if any.
    pub error: Option<String>,
    /// Wall time of the run.
    pub elapsed: Duration,
}

impl SyncSummary {
    /// Count one applied change.
    pub fn record(&mut self, synced: &SyncedChange) {
        match synced.change.op {
            ChangeOp::Add => self.added += 1,
            ChangeOp::Change => self.changed += 1,
            ChangeOp::Remove => self.removed += 1,
        }
        if synced.outcome.is_degraded() {
            self.degraded += 1;
        }
        self.bytes_copied += synced.bytes;
    }

    /// Total changes applied.
    pub fn total(&self) -> usize {
        self.added + self.changed + self.removed
    }

    /// Check if the run reached the end without an error.
    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }

    /// Get a human-readable summary of the run.
    pub fn summary(&self) -> String {
        let mut text = format!(
            "{} added, {} changed, {} removed ({} bytes)",
            self.added, self.changed, self.removed, self.bytes_copied
        );
        if self.degraded > 0 {
            text.push_str(&format!(", {} without mtime", self.degraded));
        }
        if let Some(error) = &self.error {
            text.push_str(&format!("; stopped: {error}"));
        }
        text
    }
}

/// Accumulates a summary and hands out progress snapshots.
#[derive(Debug)]
pub(crate) struct ProgressTracker {
    start_time: Instant,
    summary: SyncSummary,
}

impl ProgressTracker {
    pub fn new() -> Self {
        Self {
            start_time: Instant::now(),
            summary: SyncSummary::default(),
        }
    }

    pub fn record(&mut self, synced: SyncedChange) -> SyncProgress {
        self.summary.record(&synced);
        SyncProgress {
            last: synced,
            changes_applied: self.summary.total(),
            bytes_copied: self.summary.bytes_copied,
            elapsed: self.start_time.elapsed(),
        }
    }

    pub fn finish(mut self, error: Option<String>) -> SyncSummary {
        self.summary.error = error;
        self.summary.elapsed = self.start_time.elapsed();
        self.summary
    }
}
