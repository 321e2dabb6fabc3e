//! CLI command implementations
//!
//! Every command boots the same way: load config, apply `--uri`, start
//! logging, connect the store, build the router. The store is shut down
//! before the command returns.

use std::sync::Arc;

use serde::Deserialize;
use serde_json::{json, Value};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, warn};

use crate::catalog::{CollectionEnumerator, FieldDiscoverer};
use crate::config::Config;
use crate::logging::init_logging;
use crate::memory::{ConversationMemory, DigestSummarizer};
use crate::normalize::render_table;
use crate::query::{PageSpec, QuerySpec};
use crate::router::{QueryRouter, RouteOutcome, RouteReport};
use crate::session::{QuerySession, SessionReply};

use super::args::{Command, ConnectArgs, OutputFormat};
use super::errors::{CliError, CliResult};
use super::io::{
    error_response, ok_response, read_request_text, write_line, write_response, write_text,
};

/// Parse arguments and run the selected command
pub async fn run() -> CliResult<()> {
    let cli = super::args::Cli::parse_args();
    run_command(cli.command).await
}

/// Run the appropriate command based on CLI args
pub async fn run_command(cmd: Command) -> CliResult<()> {
    match cmd {
        Command::Query {
            connect,
            query: text,
            page,
            page_size,
            format,
        } => query(&connect, text, page, page_size, format).await,
        Command::Collections { connect, database } => collections(&connect, &database).await,
        Command::Serve { connect } => serve(&connect).await,
    }
}

async fn boot(connect: &ConnectArgs) -> CliResult<(Config, QueryRouter)> {
    let mut config = Config::load(&connect.config)?;
    if let Some(uri) = &connect.uri {
        config.override_uri(uri.clone());
    }
    init_logging(&config.logging);

    let store = config.backend.connect().await?;
    info!(
        event = "BOOT_COMPLETE",
        backend = store.backend(),
        relationships = config.relationships.len()
    );
    let router = QueryRouter::new(
        store,
        config.relationships.clone(),
        config.router.options(),
    );
    Ok((config, router))
}

fn page_spec(config: &Config, page: i64, page_size: Option<i64>) -> CliResult<PageSpec> {
    let size = page_size.unwrap_or(config.router.default_page_size as i64);
    Ok(PageSpec::new(page, size)?)
}

/// Route one query and exit. Ctrl-C drops the route, which aborts every
/// collection still running.
pub async fn query(
    connect: &ConnectArgs,
    text: Option<String>,
    page: i64,
    page_size: Option<i64>,
    format: OutputFormat,
) -> CliResult<()> {
    let (config, router) = boot(connect).await?;
    let page = page_spec(&config, page, page_size)?;
    let text = match text {
        Some(text) => text,
        None => read_request_text()?,
    };
    let spec = QuerySpec::parse(&text)?;

    let result = tokio::select! {
        report = router.route_detailed(&spec, page) => report.map_err(CliError::from),
        _ = tokio::signal::ctrl_c() => {
            warn!(event = "ROUTE_INTERRUPTED");
            Err(CliError::Cancelled)
        }
    };
    router.shutdown().await?;
    let report = result?;

    match format {
        OutputFormat::Json => write_response(report_json(&report)),
        OutputFormat::Table => match &report.outcome {
            RouteOutcome::Documents(rows) => write_text(&render_table(rows)),
            RouteOutcome::NoDataFound(reason) => write_text(&reason.to_string()),
        },
    }
}

/// List collections and the fields of one sampled document of each
pub async fn collections(connect: &ConnectArgs, database: &str) -> CliResult<()> {
    let (_, router) = boot(connect).await?;
    let result = describe_collections(&router, database).await;
    router.shutdown().await?;
    write_response(result?)
}

async fn describe_collections(router: &QueryRouter, database: &str) -> CliResult<Value> {
    let store = Arc::clone(router.store());
    let names = CollectionEnumerator::new(Arc::clone(&store))
        .list(database)
        .await?;
    let discoverer = FieldDiscoverer::new(store);

    let mut out = Vec::with_capacity(names.len());
    for name in names {
        let fields = discoverer.discover(database, &name).await?;
        out.push(json!({
            "name": name,
            "fields": fields.iter().collect::<Vec<_>>(),
        }));
    }
    Ok(Value::Array(out))
}

/// One `serve` request line
#[derive(Debug, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
enum ServeRequest {
    Query {
        /// Query document, or its JSON text
        query: Value,
        #[serde(default)]
        page: Option<i64>,
        #[serde(default)]
        page_size: Option<i64>,
        /// What the user typed, recorded in history instead of the query
        #[serde(default)]
        text: Option<String>,
    },
    History,
}

/// Serving loop: one JSON request per stdin line, one response per stdout
/// line. Ctrl-C interrupts the request in flight and ends the loop.
pub async fn serve(connect: &ConnectArgs) -> CliResult<()> {
    let (config, router) = boot(connect).await?;
    let memory = ConversationMemory::new(
        Arc::new(DigestSummarizer),
        config.memory.summary_interval,
    );
    let session = QuerySession::new(router, Arc::new(memory));
    info!(event = "SERVE_STARTED");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let result = loop {
        let line = tokio::select! {
            line = lines.next_line() => line,
            _ = tokio::signal::ctrl_c() => break Ok(()),
        };
        let line = match line {
            Ok(Some(line)) => line,
            Ok(None) => break Ok(()),
            Err(e) => break Err(CliError::from(e)),
        };
        if line.trim().is_empty() {
            continue;
        }

        let response = tokio::select! {
            response = respond(&session, &config, &line) => response,
            _ = tokio::signal::ctrl_c() => {
                let err = CliError::Cancelled;
                write_line(&error_response(err.code(), &err.to_string()))?;
                break Ok(());
            }
        };
        write_line(&response)?;
    };

    session.router().shutdown().await?;
    info!(event = "SERVE_STOPPED");
    result
}

/// Full response object for one request line
async fn respond(session: &QuerySession, config: &Config, line: &str) -> Value {
    match answer(session, config, line).await {
        Ok(data) => ok_response(data),
        Err(e) => error_response(e.code(), &e.to_string()),
    }
}

async fn answer(session: &QuerySession, config: &Config, line: &str) -> CliResult<Value> {
    let request: ServeRequest = serde_json::from_str(line)?;
    match request {
        ServeRequest::Query {
            query,
            page,
            page_size,
            text,
        } => {
            let page = page_spec(config, page.unwrap_or(0), page_size)?;
            let query_text = match query {
                Value::String(s) => s,
                other => other.to_string(),
            };
            match session.run(&query_text, page, text.as_deref()).await {
                SessionReply::Rejected { code, message } => {
                    Err(CliError::Rejected { code, message })
                }
                reply => Ok(serde_json::to_value(&reply)?),
            }
        }
        ServeRequest::History => Ok(serde_json::to_value(session.history())?),
    }
}

fn report_json(report: &RouteReport) -> Value {
    match &report.outcome {
        RouteOutcome::Documents(rows) => json!({
            "documents": rows,
            "summary": report.summary,
        }),
        RouteOutcome::NoDataFound(reason) => json!({
            "documents": [],
            "message": reason.to_string(),
            "summary": report.summary,
        }),
    }
}
