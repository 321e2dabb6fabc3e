//! JSON I/O handling for CLI
//!
//! - Input: a query document on stdin, or one request per line for `serve`
//! - Output: one JSON object per line on stdout
//! - Logs go to stderr

use std::io::{self, Read, Write};

use serde_json::Value;

use super::errors::{CliError, CliResult};

/// Read the whole of stdin as one request
pub fn read_request_text() -> CliResult<String> {
    let mut text = String::new();
    io::stdin().lock().read_to_string(&mut text)?;

    if text.trim().is_empty() {
        return Err(CliError::input("Empty input"));
    }
    Ok(text)
}

pub fn ok_response(data: Value) -> Value {
    serde_json::json!({
        "status": "ok",
        "data": data
    })
}

pub fn error_response(code: &str, message: &str) -> Value {
    serde_json::json!({
        "status": "error",
        "code": code,
        "message": message
    })
}

/// Write a success response to stdout
pub fn write_response(data: Value) -> CliResult<()> {
    write_line(&ok_response(data))
}

/// Write an error response to stdout
pub fn write_error(code: &str, message: &str) -> CliResult<()> {
    write_line(&error_response(code, message))
}

/// Write raw text to stdout
pub fn write_text(text: &str) -> CliResult<()> {
    let mut stdout = io::stdout().lock();
    stdout.write_all(text.as_bytes())?;
    if !text.ends_with('\n') {
        writeln!(stdout)?;
    }
    stdout.flush()?;
    Ok(())
}

/// Write one JSON value as a line
pub fn write_line(value: &Value) -> CliResult<()> {
    let mut stdout = io::stdout().lock();
    writeln!(stdout, "{}", value)?;
    stdout.flush()?;
    Ok(())
}
