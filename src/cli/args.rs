//! CLI argument definitions using clap
//!
//! Commands:
//! - docroute query --config <path> [--query <json>] [--page N] [--page-size N] [--format json|table]
//! - docroute collections --config <path> --database <name>
//! - docroute serve --config <path>

use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// docroute - search every collection of a document database at once
#[derive(Parser, Debug)]
#[command(name = "docroute")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

/// Options shared by every command
#[derive(Args, Debug, Clone)]
pub struct ConnectArgs {
    /// Path to configuration file
    #[arg(long, default_value = "./docroute.json")]
    pub config: PathBuf,

    /// MongoDB URI; replaces the configured backend
    #[arg(long)]
    pub uri: Option<String>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Route one query and exit
    Query {
        #[command(flatten)]
        connect: ConnectArgs,

        /// Query JSON; read from stdin when absent
        #[arg(long)]
        query: Option<String>,

        /// Zero-based page number
        #[arg(long, default_value_t = 0)]
        page: i64,

        /// Documents per collection per page (default: from config)
        #[arg(long)]
        page_size: Option<i64>,

        #[arg(long, value_enum, default_value_t = OutputFormat::Json)]
        format: OutputFormat,
    },

    /// List collections and their sampled fields
    Collections {
        #[command(flatten)]
        connect: ConnectArgs,

        #[arg(long)]
        database: String,
    },

    /// Answer line-delimited JSON requests on stdin
    Serve {
        #[command(flatten)]
        connect: ConnectArgs,
    },
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Json,
    Table,
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Cli::parse()
    }
}
