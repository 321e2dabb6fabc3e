//! CLI module for docroute
//!
//! Provides command-line interface for:
//! - query: route one query and print the merged result
//! - collections: list collections and sampled fields
//! - serve: line-delimited JSON requests with conversation history

mod args;
mod commands;
mod errors;
mod io;

pub use args::{Cli, Command, ConnectArgs, OutputFormat};
pub use commands::{collections, query, run, run_command, serve};
pub use errors::{CliError, CliResult};
pub use io::write_error;
