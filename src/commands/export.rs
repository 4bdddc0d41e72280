use anyhow::{Context as _, Result};
use chrono::{DateTime, Utc};
use envkit::{Client, ExportSummary};
use std::path::Path;

use crate::Context;
use crate::cli::ExportArgs;
use crate::progress;
use crate::prompt::Terminal;
use crate::ui;

pub fn run(ctx: &Context, args: ExportArgs) -> Result<()> {
    let Some(repo) = super::resolve_repo(ctx, &Terminal)? else {
        ui::warn("Operation cancelled or missing repository input.");
        return Ok(());
    };
    let client = ctx.settings.client(repo)?;
    execute(&client, &args.env, args.output.as_deref(), Utc::now())?;
    Ok(())
}

/// Export `env` to `output`, or to a timestamped file in the current directory.
pub fn execute(
    client: &Client,
    env: &str,
    output: Option<&Path>,
    now: DateTime<Utc>,
) -> Result<ExportSummary> {
    ui::header(&format!("Exporting environment '{env}' from {}", client.repo()));

    let pb = progress::spinner(&format!("Fetching variables and secrets of '{env}'..."));
    let summary = match client.export(env, output, now) {
        Ok(summary) => summary,
        Err(err) => {
            progress::finish_error(&pb, &format!("Could not export '{env}'"));
            return Err(err).with_context(|| format!("Error exporting environment '{env}'"));
        }
    };
    progress::finish_success(&pb, &format!("Environment exported to {}", summary.path.display()));

    ui::kv("Variables exported", &summary.variable_count.to_string());
    ui::kv("Secret names exported", &summary.secret_count.to_string());
    if summary.secret_count > 0 {
        ui::dim("Secret values are not exported; fill them in manually.");
    }
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::testing::client;
    use chrono::TimeZone;
    use envkit::MockBackend;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_export_writes_file() {
        let mock = MockBackend::new();
        mock.add_variable("prod", "API_URL", "https://api.example.com");
        mock.add_secret("prod", "TOKEN");
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("prod.env");
        let now = Utc.with_ymd_and_hms(2024, 5, 17, 9, 30, 0).unwrap();

        let summary = execute(&client(&mock), "prod", Some(&path), now).unwrap();

        assert_eq!(summary.path, path);
        assert_eq!(summary.variable_count, 1);
        assert_eq!(summary.secret_count, 1);
        let content = fs::read_to_string(&path).unwrap();
        assert!(content.starts_with("# GitHub Environment Export: prod\n"));
        assert!(content.contains("# Repository: octo/site\n"));
        assert!(content.contains("API_URL=https://api.example.com\n"));
        assert!(content.contains("TOKEN=\n"));
    }

    #[test]
    fn test_export_missing_environment() {
        let mock = MockBackend::new();
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("ghost.env");

        let err = execute(&client(&mock), "ghost", Some(&path), Utc::now()).unwrap_err();

        assert!(err.to_string().contains("Error exporting environment 'ghost'"));
        let cause = err.chain().find_map(|e| e.downcast_ref::<envkit::Error>()).unwrap();
        assert!(cause.is_not_found());
        assert!(!path.exists());
    }
}
