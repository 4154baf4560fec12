//! Glob-based change filter for `--ignore`.

use async_trait::async_trait;
use color_eyre::eyre::{Context, Result};
use globset::{Glob, GlobSet, GlobSetBuilder};

use treesync_core::{Change, ChangeFilter};

/// Skips changes whose path matches any of a set of globs.
///
/// Patterns are tried against the change path both with and without its
/// leading `/`, so `*.tmp` and `/cache/**` both work.
#[derive(Debug)]
pub struct GlobFilter {
    set: GlobSet,
}

impl GlobFilter {
    pub fn new(patterns: &[String]) -> Result<Self> {
        let mut builder = GlobSetBuilder::new();
        for pattern in patterns {
            let glob =
                Glob::new(pattern).with_context(|| format!("Invalid ignore pattern {pattern:?}"))?;
            builder.add(glob);
        }
        Ok(Self {
            set: builder.build().context("Failed to compile ignore patterns")?,
        })
    }

    pub fn matches(&self, path: &str) -> bool {
        self.set.is_match(path) || self.set.is_match(path.trim_start_matches('/'))
    }
}

#[async_trait]
impl ChangeFilter for GlobFilter {
    async fn ignore(&self, change: &Change) -> bool {
        self.matches(&change.path)
    }
}
