use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Configuration file path
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Translate one metadata field into a set of locales
    Translate {
        /// Metadata field name (e.g. name, keywords, description)
        #[arg(short, long)]
        field: String,

        /// Source text to translate
        #[arg(short, long)]
        text: String,

        /// Target locales, comma-separated; "all" fans out to the whole catalog
        #[arg(short, long, default_value = "all")]
        locales: String,

        /// Session seed override for reproducible runs
        #[arg(long)]
        seed: Option<u64>,

        /// Concurrent translation cap (0 = auto)
        #[arg(long, default_value = "0")]
        concurrency: usize,
    },

    /// List the supported locale catalog
    Locales,

    /// List metadata fields and their character limits
    Fields,

    /// List apps on the catalog account
    Apps,

    /// Write a default configuration file
    InitConfig {
        /// Destination path
        #[arg(short, long, default_value = "config.toml")]
        output: PathBuf,
    },
}
