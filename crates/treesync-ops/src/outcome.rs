//! Per-change results reported by the executor.

use std::fmt;

use serde::{Deserialize, Serialize};

use treesync_core::Change;

/// What applying a change actually did to the destination.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ApplyOutcome {
    /// Content copied and, when the source had one, its modification time set.
    Applied,
    /// Content copied, but the modification time could not be propagated.
    MetadataDegraded { reason: String },
    /// The destination entry was removed.
    Removed,
}

impl ApplyOutcome {
    /// Whether metadata propagation failed.
    pub fn is_degraded(&self) -> bool {
        matches!(self, Self::MetadataDegraded { .. })
    }

    /// Keep the first degradation seen when folding several file copies
    /// into one outcome.
    pub(crate) fn merge(self, other: Self) -> Self {
        match self {
            Self::MetadataDegraded { .. } => self,
            _ => other,
        }
    }
}

/// A change that was applied, with its outcome.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncedChange {
    /// The record as produced by the comparator.
    pub change: Change,
    /// What happened on the destination.
    pub outcome: ApplyOutcome,
    /// Bytes written to the destination.
    pub bytes: u64,
}

impl SyncedChange {
    /// A removal.
    pub fn removed(change: Change) -> Self {
        Self {
            change,
            outcome: ApplyOutcome::Removed,
            bytes: 0,
        }
    }
}

impl fmt::Display for SyncedChange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.change)?;
        if let ApplyOutcome::MetadataDegraded { reason } = &self.outcome {
            write!(f, " (mtime not kept: {reason})")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_merge_keeps_first_degradation() {
        let degraded = ApplyOutcome::MetadataDegraded {
            reason: "first".to_string(),
        };
        let merged = ApplyOutcome::Applied
            .merge(degraded.clone())
            .merge(ApplyOutcome::Applied)
            .merge(ApplyOutcome::MetadataDegraded {
                reason: "second".to_string(),
            });
        assert_eq!(merged, degraded);
    }

    #[test]
    fn test_display() {
        let synced = SyncedChange {
            change: Change::add("/a.txt"),
            outcome: ApplyOutcome::MetadataDegraded {
                reason: "unsupported".to_string(),
            },
            bytes: 2,
        };
        assert_eq!(synced.to_string(), "add /a.txt (mtime not kept: unsupported)");
        assert_eq!(SyncedChange::removed(Change::remove("/x")).to_string(), "remove /x");
    }
}
