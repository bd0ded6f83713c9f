//! Clap CLI definitions for unimem.

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use unimem_types::MemorySource;

pub const AFTER_HELP: &str = "\
\x1b[1;36mExamples:\x1b[0m
  unimem list                        First page of memories for the default user
  unimem --source platform search tea
  unimem add \"Prefers window seats\" --user alice
  unimem delete 3f1c 9b2e
  unimem health                      Probe every configured backend

\x1b[1;36mConfig:\x1b[0m
  ~/.unimem/config.toml (override with --config or UNIMEM_HOME)";

/// unimem: one CLI over the Local and Platform memory backends.
#[derive(Parser)]
#[command(name = "unimem", version, after_help = AFTER_HELP)]
pub struct Cli {
    /// Path to config file.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Backend to use instead of the configured default (local, platform).
    #[arg(long, global = true)]
    pub source: Option<MemorySource>,

    /// User to scope the call to.
    #[arg(long, global = true)]
    pub user: Option<String>,

    /// Agent to scope the call to (Platform only).
    #[arg(long, global = true)]
    pub agent: Option<String>,

    /// Print raw JSON instead of formatted output.
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// List memories.
    List {
        /// Page number (1-based).
        #[arg(long, default_value_t = 1)]
        page: u32,
        /// Page size.
        #[arg(long, default_value_t = 10)]
        size: u32,
        /// Only memories in these categories.
        #[arg(long, value_delimiter = ',')]
        category: Vec<String>,
    },
    /// Show one memory.
    Get { id: String },
    /// Store a new memory.
    Add {
        text: String,
        /// Store the text verbatim instead of running extraction.
        #[arg(long)]
        no_infer: bool,
    },
    /// Semantic search.
    Search {
        query: String,
        /// Maximum number of hits.
        #[arg(long)]
        limit: Option<u32>,
        /// Minimum relevance score (platform only).
        #[arg(long)]
        threshold: Option<f64>,
    },
    /// Replace a memory's text.
    Update { id: String, text: String },
    /// Delete one or more memories.
    Delete {
        #[arg(required = true)]
        ids: Vec<String>,
    },
    /// Change history of a memory (platform only).
    History { id: String },
    /// Show the active feature flags and available backends.
    Flags,
    /// Probe every configured backend.
    Health,
}
