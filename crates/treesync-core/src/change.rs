//! Change records produced by the comparator.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::SyncError;

/// The kind of mutation a destination needs at a path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeOp {
    /// The source has an entry the destination lacks.
    Add,
    /// The destination has an entry the source lacks.
    Remove,
    /// Both sides have a file at the path but the contents differ.
    Change,
}

impl ChangeOp {
    /// Wire name of the operation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Add => "add",
            Self::Remove => "remove",
            Self::Change => "change",
        }
    }

    /// Whether applying this operation copies content from the source.
    pub fn copies_content(&self) -> bool {
        matches!(self, Self::Add | Self::Change)
    }
}

impl fmt::Display for ChangeOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ChangeOp {
    type Err = SyncError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "add" => Ok(Self::Add),
            "remove" => Ok(Self::Remove),
            "change" => Ok(Self::Change),
            other => Err(SyncError::UnknownOperation {
                op: other.to_string(),
            }),
        }
    }
}

/// One unit of divergence between two trees.
///
/// `path` is relative to the comparison root and always starts with `/`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Change {
    pub op: ChangeOp,
    pub path: String,
}

impl Change {
    /// Create a change record.
    pub fn new(op: ChangeOp, path: impl Into<String>) -> Self {
        Self {
            op,
            path: path.into(),
        }
    }

    /// Create an add record.
    pub fn add(path: impl Into<String>) -> Self {
        Self::new(ChangeOp::Add, path)
    }

    /// Create a remove record.
    pub fn remove(path: impl Into<String>) -> Self {
        Self::new(ChangeOp::Remove, path)
    }

    /// Create a content-change record.
    pub fn change(path: impl Into<String>) -> Self {
        Self::new(ChangeOp::Change, path)
    }
}

impl fmt::Display for Change {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.op, self.path)
    }
}
