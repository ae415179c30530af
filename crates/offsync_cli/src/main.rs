//! offsync CLI
//!
//! Offline maintenance tools for a persisted sync queue.
//!
//! # Commands
//!
//! - `inspect` - Display queue statistics
//! - `list` - List queued payloads
//! - `export` / `import` - Move a queue as JSON
//! - `purge-failed` - Drop payloads that ran out of retries
//! - `retry` - Reset a payload's retry budget
//! - `clear` - Drop payloads, optionally of one type

mod commands;

use clap::{Parser, Subcommand};
use offsync_queue::{PayloadId, SyncType, DEFAULT_STORAGE_KEY};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// offsync command-line queue tools.
#[derive(Parser)]
#[command(name = "offsync")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to the queue store directory
    #[arg(global = true, short, long)]
    path: Option<PathBuf>,

    /// Storage key of the queue snapshot
    #[arg(global = true, short, long, default_value = DEFAULT_STORAGE_KEY)]
    key: String,

    /// Enable verbose output
    #[arg(global = true, short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Display queue statistics
    Inspect {
        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// List queued payloads in processing order
    List {
        /// Only show payloads of this type
        #[arg(short = 't', long = "type")]
        sync_type: Option<SyncType>,

        /// Only show payloads that ran out of retries
        #[arg(long)]
        failed: bool,
    },

    /// Export the queue as JSON
    Export {
        /// Write to this file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Replace the queue with a JSON export
    Import {
        /// File produced by `export`
        #[arg(short, long)]
        input: PathBuf,
    },

    /// Remove payloads that ran out of retries
    PurgeFailed,

    /// Reset the retry budget of one payload
    Retry {
        /// Payload id
        id: PayloadId,
    },

    /// Remove queued payloads
    Clear {
        /// Only remove payloads of this type
        #[arg(short = 't', long = "type")]
        sync_type: Option<SyncType>,
    },

    /// Show version information
    Version,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    if let Commands::Version = cli.command {
        println!("offsync CLI v{}", env!("CARGO_PKG_VERSION"));
        println!("Snapshot format v{}", offsync_queue::SNAPSHOT_VERSION);
        return Ok(());
    }

    let path = cli.path.ok_or("Queue store path required")?;
    let mut queue = commands::open_queue(&path, &cli.key)?;

    match cli.command {
        Commands::Inspect { format } => commands::inspect::run(&queue, &path, &format)?,
        Commands::List { sync_type, failed } => commands::list::run(&queue, sync_type, failed),
        Commands::Export { output } => commands::transfer::export(&queue, output.as_deref())?,
        Commands::Import { input } => commands::transfer::import(&mut queue, &input)?,
        Commands::PurgeFailed => commands::maintain::purge_failed(&mut queue)?,
        Commands::Retry { id } => commands::maintain::retry(&mut queue, &id)?,
        Commands::Clear { sync_type } => commands::maintain::clear(&mut queue, sync_type)?,
        Commands::Version => {}
    }

    Ok(())
}
