//! docroute CLI entry point
//!
//! Parses arguments and dispatches to the CLI module. Errors are written
//! as a JSON error line on stdout and as text on stderr; the process then
//! exits non-zero.

use docroute::cli;

#[tokio::main]
async fn main() {
    if let Err(e) = cli::run().await {
        let _ = cli::write_error(e.code(), &e.to_string());
        eprintln!("{}: {}", e.code(), e);
        std::process::exit(1);
    }
}
