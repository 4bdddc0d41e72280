//! Export of one environment to a dotenv file.
//!
//! Variables are written with their values. Secrets are written as empty
//! `NAME=` placeholders since their values cannot be read back.

use crate::backend::Backend;
use crate::dotenv::format_entry;
use crate::error::{Error, Result};
use crate::render::timestamp;
use crate::types::{ExportSummary, RepoRef, SecretMeta, Variable};
use chrono::{DateTime, Utc};
use std::fmt::Write;
use std::path::{Path, PathBuf};

/// File name used when no output path is given: `{env}-export-{millis}.env`.
#[must_use]
pub fn default_export_path(env: &str, now: DateTime<Utc>) -> PathBuf {
    let safe: String = env
        .chars()
        .map(|c| if matches!(c, '/' | '\\') { '-' } else { c })
        .collect();
    PathBuf::from(format!("{safe}-export-{}.env", now.timestamp_millis()))
}

/// Render the export file content.
#[must_use]
pub fn render_export(
    repo: &RepoRef,
    env: &str,
    variables: &[Variable],
    secrets: &[SecretMeta],
    generated_at: DateTime<Utc>,
) -> String {
    let mut out = String::new();
    writeln!(out, "# GitHub Environment Export: {env}").unwrap();
    writeln!(out, "# Repository: {repo}").unwrap();
    writeln!(out, "# Generated on: {}", timestamp(generated_at)).unwrap();
    writeln!(out).unwrap();

    writeln!(out, "# Environment Variables ({} total)", variables.len()).unwrap();
    if variables.is_empty() {
        writeln!(out, "# No variables found in this environment").unwrap();
    } else {
        writeln!(out, "# Format: VARIABLE_NAME=value").unwrap();
        writeln!(out).unwrap();
        for var in variables {
            writeln!(out, "{}", format_entry(&var.name, &var.value)).unwrap();
        }
    }
    writeln!(out).unwrap();

    writeln!(out, "# Secret Names ({} total)", secrets.len()).unwrap();
    writeln!(out, "# Note: Secret values are not exported for security reasons").unwrap();
    writeln!(out, "# Format: SECRET_NAME= (you need to set values manually)").unwrap();
    writeln!(out).unwrap();
    if secrets.is_empty() {
        writeln!(out, "# No secrets found in this environment").unwrap();
    } else {
        for secret in secrets {
            writeln!(out, "{}=", secret.name).unwrap();
        }
    }
    out
}

/// Fetch an environment and write it to `output` (or the default path).
///
/// Variables and secret names are fetched concurrently; either failing
/// aborts the export before anything is written.
pub fn export_environment(
    backend: &dyn Backend,
    repo: &RepoRef,
    env: &str,
    output: Option<&Path>,
    now: DateTime<Utc>,
) -> Result<ExportSummary> {
    log::info!("exporting environment '{env}' of {repo}");

    let (variables, secrets) = rayon::join(
        || backend.list_variables(repo, env),
        || backend.list_secret_names(repo, env),
    );
    let (variables, secrets) = (variables?, secrets?);

    let path = output.map_or_else(|| default_export_path(env, now), Path::to_path_buf);
    let content = render_export(repo, env, &variables, &secrets, now);
    std::fs::write(&path, content).map_err(|e| Error::io(&path, e))?;
    log::debug!("wrote {}", path.display());

    Ok(ExportSummary {
        path,
        variable_count: variables.len(),
        secret_count: secrets.len(),
    })
}
