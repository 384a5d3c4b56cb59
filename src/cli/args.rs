use std::path::PathBuf;

use clap::Parser;

use crate::Commands;

/// Main CLI application arguments and command structure
#[derive(Parser, Debug)]
#[clap(
    name = "notozen",
    version,
    about = "Notes with tags and folders, kept in a local store"
)]
pub struct Cli {
    /// Path to the configuration file
    #[clap(short = 'c', long, value_parser)]
    pub config: Option<PathBuf>,

    /// Directory holding the stored notes and folders
    #[clap(long, value_parser)]
    pub data_dir: Option<PathBuf>,

    /// Key namespace inside the data directory
    #[clap(long)]
    pub namespace: Option<String>,

    /// Verbose output mode
    #[clap(short, long)]
    pub verbose: bool,

    /// Subcommands for the notozen application
    #[clap(subcommand)]
    pub command: Commands,
}
