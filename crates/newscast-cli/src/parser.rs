//! Main CLI parser and top-level argument handling.

use std::path::PathBuf;

use clap::Parser;

use crate::commands::Commands;

/// Command-line interface for continuous news playback.
#[derive(Parser)]
#[command(name = "newscast")]
#[command(about = "Listen to the news, one category at a time")]
#[command(version)]
pub struct Cli {
    /// Override the data directory for this invocation
    #[arg(long = "data-dir", global = true)]
    pub data_dir: Option<PathBuf>,

    /// Load playback settings from this JSON file
    #[arg(long = "config", global = true)]
    pub config: Option<PathBuf>,

    /// Keep history in memory only; nothing is written to the data directory
    #[arg(long = "ephemeral", global = true)]
    pub ephemeral: bool,

    /// Enable verbose/debug output
    #[arg(short = 'v', long = "verbose", global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}
