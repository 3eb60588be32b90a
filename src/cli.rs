use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "slidequeue")]
#[command(author, version, about = "Slideshow queue engine for large media collections")]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Scan a folder tree and report what the random queue discovered
    Scan {
        /// Root folder to scan
        #[arg(required = true)]
        root: PathBuf,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Run a slideshow session and print each item as it is shown
    Play {
        /// Root folder (or single file) to show
        #[arg(required = true)]
        root: PathBuf,

        /// Provider mode: random, sequential or single
        #[arg(short, long)]
        mode: Option<String>,

        /// Number of items to show
        #[arg(short = 'n', long, default_value = "20")]
        count: usize,

        /// Delay between items in milliseconds
        #[arg(long, default_value = "0")]
        interval_ms: u64,
    },

    /// Validate configuration file
    Validate {
        /// Config file to validate (uses default if not specified)
        config: Option<PathBuf>,
    },

    /// Display version information
    Version,
}
