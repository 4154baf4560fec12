//! Sync configuration types.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use derive_builder::{Builder, UninitializedFieldError};

use crate::{Change, SyncError, path};

/// Decides whether a change is skipped by the executor.
///
/// Implemented for any `Fn(&Change) -> bool`, so plain closures work;
/// implement it directly when the decision needs to await something.
#[async_trait]
pub trait ChangeFilter: Send + Sync {
    /// Return `true` to skip `change` without applying or reporting it.
    async fn ignore(&self, change: &Change) -> bool;
}

#[async_trait]
impl<F> ChangeFilter for F
where
    F: Fn(&Change) -> bool + Send + Sync,
{
    async fn ignore(&self, change: &Change) -> bool {
        self(change)
    }
}

/// Options for one sync invocation.
#[derive(Clone, Builder)]
#[builder(build_fn(private, name = "build_unchecked", validate = "Self::validate", error = "SyncError"))]
pub struct SyncOptions {
    /// Tree path both views are compared under.
    #[builder(setter(into), default = "path::ROOT.to_string()")]
    pub root: String,

    /// Never remove anything from the destination.
    #[builder(default = "false")]
    pub no_delete: bool,

    /// Predicate for changes to skip.
    #[builder(setter(strip_option), default)]
    pub ignore: Option<Arc<dyn ChangeFilter>>,
}

impl SyncOptionsBuilder {
    /// Build the options. The root comes out in canonical form, so
    /// `"/data/"` and `"/data"` give the same options.
    pub fn build(&self) -> Result<SyncOptions, SyncError> {
        let mut options = self.build_unchecked()?;
        options.root = path::normalize(&options.root)?;
        Ok(options)
    }

    fn validate(&self) -> Result<(), SyncError> {
        match self.root {
            Some(ref root) if !root.starts_with('/') => Err(SyncError::InvalidOptions {
                message: format!("Root must start with '/', got {root:?}"),
            }),
            _ => Ok(()),
        }
    }
}

impl From<UninitializedFieldError> for SyncError {
    fn from(err: UninitializedFieldError) -> Self {
        Self::InvalidOptions {
            message: err.to_string(),
        }
    }
}

impl SyncOptions {
    /// Create a new sync options builder.
    pub fn builder() -> SyncOptionsBuilder {
        SyncOptionsBuilder::default()
    }

    /// Options rooted at `root`, with deletions enabled and nothing ignored.
    pub fn new(root: &str) -> Result<Self, SyncError> {
        Ok(Self {
            root: path::normalize(root)?,
            no_delete: false,
            ignore: None,
        })
    }

    /// Ask the configured filter whether `change` should be skipped.
    pub async fn should_ignore(&self, change: &Change) -> bool {
        match &self.ignore {
            Some(filter) => filter.ignore(change).await,
            None => false,
        }
    }
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self {
            root: path::ROOT.to_string(),
            no_delete: false,
            ignore: None,
        }
    }
}

impl fmt::Debug for SyncOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SyncOptions")
            .field("root", &self.root)
            .field("no_delete", &self.no_delete)
            .field("ignore", &self.ignore.as_ref().map(|_| ".."))
            .finish()
    }
}
