//! Command-line argument definitions.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(name = "meridian")]
#[command(
    author,
    version,
    about = "Ask questions about an uploaded PDF or the current weather"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Config file (falls back to MERIDIAN_CONFIG, then config/default.toml)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run the HTTP gateway
    Serve,

    /// Index a document and make it the active one
    Index {
        file: PathBuf,
        /// Re-embed even when the document is already indexed
        #[arg(long)]
        force: bool,
    },

    /// Answer a single question
    Ask {
        #[arg(required = true, num_args = 1..)]
        question: Vec<String>,
    },

    /// Interactive session on stdin
    Chat {
        /// Index this document before the first turn
        #[arg(long)]
        document: Option<PathBuf>,
    },
}
