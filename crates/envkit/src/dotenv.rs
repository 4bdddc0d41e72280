//! Reading and writing dotenv files.
//!
//! Parsing is delegated to `dotenvy`, which already handles comments,
//! `export` prefixes, quoting and escapes. Unlike `dotenvy::dotenv`, nothing
//! here touches the process environment: entries are returned in file order.

use crate::error::{Error, Result};
use crate::types::Variable;
use std::path::Path;

/// Parse a dotenv file into variables, in file order.
pub fn parse_file(path: &Path) -> Result<Vec<Variable>> {
    let iter = dotenvy::from_path_iter(path).map_err(|e| match e {
        dotenvy::Error::Io(source) => Error::io(path, source),
        other => Error::Parse {
            path: path.to_path_buf(),
            message: other.to_string(),
        },
    })?;
    collect(iter, path)
}

/// Parse dotenv content held in memory.
pub fn parse_str(content: &str) -> Result<Vec<Variable>> {
    collect(dotenvy::from_read_iter(content.as_bytes()), Path::new("<memory>"))
}

fn collect<I>(iter: I, path: &Path) -> Result<Vec<Variable>>
where
    I: Iterator<Item = dotenvy::Result<(String, String)>>,
{
    iter.map(|entry| {
        entry
            .map(|(name, value)| Variable::new(name, value))
            .map_err(|e| Error::Parse {
                path: path.to_path_buf(),
                message: e.to_string(),
            })
    })
    .collect()
}

/// Whether a value must be quoted to survive a dotenv re-parse.
fn needs_quotes(value: &str) -> bool {
    value
        .chars()
        .any(|c| c.is_whitespace() || matches!(c, '#' | '"' | '\'' | '$' | '\\' | '='))
}

/// Format one `NAME=value` line (without trailing newline).
///
/// Plain values are written as-is; anything with whitespace, quotes, `#`,
/// `$` or backslashes is double-quoted and escaped.
///
/// # Example
///
/// ```
/// use envkit::dotenv::format_entry;
///
/// assert_eq!(format_entry("PORT", "8080"), "PORT=8080");
/// assert_eq!(format_entry("GREETING", "hello world"), "GREETING=\"hello world\"");
/// ```
#[must_use]
pub fn format_entry(name: &str, value: &str) -> String {
    format!("{name}={}", quote_value(value))
}

/// The right-hand side of [`format_entry`]: `value` itself, or a
/// double-quoted, escaped form. The result never contains a newline.
#[must_use]
pub fn quote_value(value: &str) -> String {
    if !needs_quotes(value) {
        return value.to_string();
    }
    let mut escaped = String::with_capacity(value.len() + 2);
    for c in value.chars() {
        match c {
            '\\' => escaped.push_str("\\\\"),
            '"' => escaped.push_str("\\\""),
            '$' => escaped.push_str("\\$"),
            '\n' => escaped.push_str("\\n"),
            other => escaped.push(other),
        }
    }
    format!("\"{escaped}\"")
}
