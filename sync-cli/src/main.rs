//! # spendsync
//!
//! Command-line front end for the SpendSync sync engine.
//!
//! Every command opens the engine from the data directory, does its work,
//! and flushes state back to disk. The remote store is a shared directory
//! (see `[remote] dir`), so two data directories pointed at the same
//! remote behave like two devices on one account.
//!
//! ## Commands
//!
//! - `status`: Show the sync register and queue
//! - `enqueue`: Apply a mutation locally and queue it for push
//! - `sync`: Manual "sync now"
//! - `pull`: Manual full download
//! - `enable` / `disable`: Toggle sync
//! - `continue-offline`: Skip the initial download
//! - `clear-queue`: Discard queued mutations
//! - `list`: Print local records
//!
//! ## Example
//!
//! ```bash
//! # Record an expense while offline
//! spendsync --offline enqueue transaction create '{"id":"t1",...}'
//!
//! # Back online: push it
//! spendsync sync
//! ```

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use spendsync_types::{EntityKind, MutationAction};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

mod commands;
mod config;
mod engine;
mod remote;

use commands::{enqueue, list, queue, status, sync};
use config::Config;
use engine::Engine;

/// Command-line front end for the SpendSync sync engine.
#[derive(Parser, Debug)]
#[command(name = "spendsync")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Data directory for sync state and local records
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Config file (default: <data-dir>/spendsync.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Treat the network as disconnected
    #[arg(long, global = true)]
    offline: bool,

    /// Debug logging (overridden by RUST_LOG)
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Show sync status
    Status,

    /// Apply a mutation locally and queue it for push
    Enqueue {
        /// Entity type: user, friend, transaction, budget
        kind: EntityKind,

        /// Mutation: create, update, delete
        action: MutationAction,

        /// Record as JSON (or use --file)
        json: Option<String>,

        /// Read the record from a file
        #[arg(long, short, conflicts_with = "json")]
        file: Option<PathBuf>,

        /// Queue only; do not attempt a push
        #[arg(long)]
        no_sync: bool,
    },

    /// Push queued mutations now (or run the initial download)
    Sync,

    /// Download every record from the remote store
    Pull,

    /// Enable sync and drain the queue
    Enable,

    /// Disable sync; mutations keep queueing
    Disable,

    /// Skip the initial download and work offline
    ContinueOffline,

    /// Discard every queued mutation
    ClearQueue {
        /// Confirm the queue should be discarded
        #[arg(long)]
        yes: bool,
    },

    /// Print local records of one type
    List {
        /// Entity type: user, friend, transaction, budget
        kind: EntityKind,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(std::io::stderr)
        .init();

    // Determine data directory
    let data_dir = match cli.data_dir {
        Some(dir) => dir,
        None => default_data_dir()?,
    };

    tokio::fs::create_dir_all(&data_dir)
        .await
        .context("Failed to create data directory")?;
    config::set_dir_permissions_0700(&data_dir).await?;

    let config_path = cli
        .config
        .unwrap_or_else(|| data_dir.join(config::CONFIG_FILE));
    let config = Config::load_or_default(&config_path)?;

    let engine = Engine::open(&data_dir, &config, cli.offline).await?;

    let result = match cli.command {
        Commands::Status => status::run(&engine).await,
        Commands::Enqueue {
            kind,
            action,
            json,
            file,
            no_sync,
        } => {
            let json = if let Some(json) = json {
                json
            } else if let Some(path) = file {
                tokio::fs::read_to_string(&path)
                    .await
                    .context("Failed to read file")?
            } else {
                anyhow::bail!("Must specify a JSON record or --file");
            };
            enqueue::run(&engine, kind, action, &json, no_sync).await
        }
        Commands::Sync => sync::run(&engine).await,
        Commands::Pull => sync::pull(&engine).await,
        Commands::Enable => queue::set_enabled(&engine, true).await,
        Commands::Disable => queue::set_enabled(&engine, false).await,
        Commands::ContinueOffline => queue::continue_offline(&engine).await,
        Commands::ClearQueue { yes } => queue::clear(&engine, yes).await,
        Commands::List { kind } => list::run(&engine, kind).await,
    };

    engine.close().await?;
    result
}

/// Get the default data directory for spendsync.
fn default_data_dir() -> Result<PathBuf> {
    let dirs = directories::ProjectDirs::from("io", "spendsync", "spendsync")
        .context("Could not determine home directory")?;
    Ok(dirs.data_dir().to_path_buf())
}
