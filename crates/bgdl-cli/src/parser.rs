//! Main CLI parser and top-level argument handling.

use clap::Parser;

use crate::commands::Commands;

/// Command-line interface for managing background downloads.
#[derive(Parser, Debug)]
#[command(name = "bgdl")]
#[command(about = "Start, track and cancel downloads that survive restarts")]
#[command(version)]
pub struct Cli {
    /// Storage root for downloads and the download index
    #[arg(long = "data-dir", env = "BGDL_DATA_DIR", global = true)]
    pub data_dir: Option<String>,

    /// Status poll interval in milliseconds
    #[arg(long = "poll-ms", default_value_t = 500, global = true)]
    pub poll_ms: u64,

    /// Enable verbose/debug output
    #[arg(short = 'v', long = "verbose", global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}
