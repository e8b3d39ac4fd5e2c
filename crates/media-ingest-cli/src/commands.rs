use clap::{Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(name = "media-ingest")]
#[command(about = "Groups noisy downloaded media files into canonical media units", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Record one observed file path in the ingest log
    Ingest {
        path: String,
        /// Hash the file content so moves and repeats can be recognized
        #[arg(long)]
        fingerprint: bool,
    },
    /// Classify unprocessed ingest records and update the media unit catalog
    Resolve {
        /// Print decisions without changing the catalog
        #[arg(long)]
        dry_run: bool,
    },
    /// Report cores, candidates and decorations per folder
    AnalyzeFolders,
    /// Show the most recent ingest records and media units
    Inspect {
        #[arg(long, default_value_t = 5)]
        limit: usize,
    },
    /// Move a pending media unit to ready or error
    SetStatus {
        unit_id: i64,
        #[arg(value_parser = ["ready", "error"])]
        status: String,
    },
    /// Print configuration values
    PrintConfig,
    /// Truncate all database tables
    TruncateDb,
}
