//! treesync - mirror one directory tree onto another.
//!
//! Usage:
//!   treesync diff <FROM> <TO>    List the changes that would make TO match FROM
//!   treesync sync <FROM> <TO>    Apply them
//!   treesync --help              Show help

mod filter;

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand, ValueEnum};
use color_eyre::eyre::{Context, Result, bail};
use futures::TryStreamExt;

use treesync_core::{Change, ChangeOp, SyncOptions};
use treesync_diff::diff;
use treesync_fs::ScopedFs;
use treesync_ops::{SyncSummary, SyncedChange, sync};

use crate::filter::GlobFilter;

#[derive(Parser)]
#[command(
    name = "treesync",
    version,
    about = "Mirror one directory tree onto another",
    long_about = "treesync compares two directory trees and makes the second one \
                  match the first, copying only what differs."
)]
struct Cli {
    /// Log verbosity
    #[arg(long, global = true, default_value = "warn")]
    log_level: LogLevel,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List the changes needed to make TO match FROM
    Diff {
        /// Source directory
        from: PathBuf,

        /// Destination directory
        to: PathBuf,

        /// Subtree to compare, as a path inside both trees
        #[arg(short, long, default_value = "/")]
        root: String,

        /// Output format
        #[arg(short, long, default_value = "text")]
        format: OutputFormat,
    },

    /// Make TO match FROM
    Sync {
        /// Source directory
        from: PathBuf,

        /// Destination directory
        to: PathBuf,

        /// Subtree to sync, as a path inside both trees
        #[arg(short, long, default_value = "/")]
        root: String,

        /// Keep entries that only exist in the destination
        #[arg(long)]
        no_delete: bool,

        /// Skip changes whose path matches this glob (repeatable)
        #[arg(short, long = "ignore", value_name = "GLOB")]
        ignore: Vec<String>,

        /// Print the changes without applying them
        #[arg(short = 'n', long)]
        dry_run: bool,

        /// Output format
        #[arg(short, long, default_value = "text")]
        format: OutputFormat,
    },
}

#[derive(Clone, Copy, ValueEnum, Default)]
enum OutputFormat {
    #[default]
    Text,
    Json,
}

#[derive(Debug, Clone, ValueEnum, Default)]
enum LogLevel {
    Debug,
    Info,
    #[default]
    Warn,
    Error,
    Silent,
}

impl LogLevel {
    fn to_tracing_level(&self) -> Option<tracing::Level> {
        match self {
            LogLevel::Debug => Some(tracing::Level::DEBUG),
            LogLevel::Info => Some(tracing::Level::INFO),
            LogLevel::Warn => Some(tracing::Level::WARN),
            LogLevel::Error => Some(tracing::Level::ERROR),
            LogLevel::Silent => None,
        }
    }
}

fn setup_tracing(level: &LogLevel) {
    if let Some(level) = level.to_tracing_level() {
        tracing_subscriber::fmt()
            .with_max_level(level)
            .with_writer(std::io::stderr)
            .without_time()
            .compact()
            .init();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;

    let cli = Cli::parse();
    setup_tracing(&cli.log_level);

    match cli.command {
        Command::Diff {
            from,
            to,
            root,
            format,
        } => run_diff(from, to, root, format).await,
        Command::Sync {
            from,
            to,
            root,
            no_delete,
            ignore,
            dry_run,
            format,
        } => {
            let mut builder = SyncOptions::builder();
            builder.root(root).no_delete(no_delete);
            if !ignore.is_empty() {
                builder.ignore(Arc::new(GlobFilter::new(&ignore)?));
            }
            let options = builder.build().context("Invalid sync options")?;

            if dry_run {
                run_dry_sync(from, to, options, format).await
            } else {
                run_sync(from, to, options, format).await
            }
        }
    }
}

fn open_tree(path: PathBuf) -> Result<ScopedFs> {
    if !path.is_dir() {
        bail!("{} is not a directory", path.display());
    }
    Ok(ScopedFs::new(path))
}

async fn run_diff(from: PathBuf, to: PathBuf, root: String, format: OutputFormat) -> Result<()> {
    let from = open_tree(from)?;
    let to = open_tree(to)?;

    let mut changes = diff(&from, &to, &root);
    let mut count = 0usize;
    while let Some(change) = changes.try_next().await.context("Failed to compare trees")? {
        print_change(&change, format)?;
        count += 1;
    }

    eprintln!("{count} changes");
    Ok(())
}

async fn run_dry_sync(
    from: PathBuf,
    to: PathBuf,
    options: SyncOptions,
    format: OutputFormat,
) -> Result<()> {
    let from = open_tree(from)?;
    let to = open_tree(to)?;

    let mut changes = diff(&from, &to, &options.root);
    let mut count = 0usize;
    while let Some(change) = changes.try_next().await.context("Failed to compare trees")? {
        if options.should_ignore(&change).await
            || (change.op == ChangeOp::Remove && options.no_delete)
        {
            continue;
        }
        print_change(&change, format)?;
        count += 1;
    }

    eprintln!("{count} changes (dry run, nothing applied)");
    Ok(())
}

async fn run_sync(
    from: PathBuf,
    to: PathBuf,
    options: SyncOptions,
    format: OutputFormat,
) -> Result<()> {
    let from = open_tree(from)?;
    let to = open_tree(to)?;

    let mut summary = SyncSummary::default();
    let mut changes = sync(&from, &to, options);
    let result = loop {
        match changes.try_next().await {
            Ok(Some(synced)) => {
                print_synced(&synced, format)?;
                summary.record(&synced);
            }
            Ok(None) => break Ok(()),
            Err(e) => {
                summary.error = Some(e.to_string());
                break Err(e);
            }
        }
    };

    eprintln!("{}", summary.summary());
    result.context("Sync stopped")
}

fn print_change(change: &Change, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Text => println!("{change}"),
        OutputFormat::Json => println!("{}", serde_json::to_string(change)?),
    }
    Ok(())
}

fn print_synced(synced: &SyncedChange, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Text => println!("{synced}"),
        OutputFormat::Json => println!("{}", serde_json::to_string(synced)?),
    }
    Ok(())
}
