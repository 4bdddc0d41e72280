use anyhow::Result;
use chrono::{DateTime, Utc};
use colored::Colorize;
use envkit::dotenv::format_entry;
use envkit::{Client, DiffResults, render};
use std::fmt::Write;

use crate::Context;
use crate::cli::DiffArgs;
use crate::progress;
use crate::prompt::Terminal;
use crate::ui;

pub fn run(ctx: &Context, args: DiffArgs) -> Result<()> {
    let Some(repo) = super::resolve_repo(ctx, &Terminal)? else {
        ui::warn("Operation cancelled or missing repository input.");
        return Ok(());
    };
    let client = ctx.settings.client(repo)?;

    let Some(results) = perform_diff(&client, &args.source, &args.compare) else {
        return Ok(());
    };
    print!("{}", render_report(&results));

    if args.env_file {
        println!();
        print!("{}", render_remediation_block(&results, Utc::now()));
    }

    println!();
    ui::success("Diff completed successfully!");
    Ok(())
}

/// Fetch both environments and compare them.
///
/// Failures are reported here and give `None`; the diff never aborts the
/// surrounding session.
pub fn perform_diff(client: &Client, source: &str, compare: &str) -> Option<DiffResults> {
    let pb = progress::spinner(&format!(
        "Comparing '{source}' with '{compare}' in {}...",
        client.repo()
    ));
    match client.diff(source, compare) {
        Ok(results) => {
            progress::finish_success(&pb, &format!("Fetched '{source}' and '{compare}'"));
            log::debug!("{} differences", results.total());
            Some(results)
        }
        Err(err) => {
            progress::finish_error(&pb, &format!("Error performing diff: {err}"));
            if let Some(payload) = err.payload() {
                ui::payload(payload);
            }
            None
        }
    }
}

/// Human-readable diff report.
pub fn render_report(results: &DiffResults) -> String {
    let source = &results.source_env;
    let compare = &results.compare_env;
    let vars = &results.variables;
    let secrets = &results.secrets;

    let mut out = String::new();
    writeln!(
        out,
        "{}",
        format!("--- Diff Report: '{source}' vs '{compare}' ---").bold()
    )
    .unwrap();

    writeln!(out).unwrap();
    writeln!(out, "{}", "Variables:".cyan().bold()).unwrap();
    if vars.is_empty() {
        writeln!(out, "  Variables are identical in both environments.").unwrap();
    } else {
        if !vars.source_only.is_empty() {
            writeln!(out, "  {}", format!("Only in '{source}':").green()).unwrap();
            for var in &vars.source_only {
                writeln!(out, "    - {}", format_entry(&var.name, &var.value)).unwrap();
            }
        }
        if !vars.compare_only.is_empty() {
            let title = format!("Only in '{compare}' (missing from '{source}'):");
            writeln!(out, "  {}", title.red()).unwrap();
            for var in &vars.compare_only {
                writeln!(out, "    - {}", format_entry(&var.name, &var.value)).unwrap();
            }
        }
        if !vars.value_changed.is_empty() {
            writeln!(out, "  {}", "Different values:".yellow()).unwrap();
            for change in &vars.value_changed {
                writeln!(
                    out,
                    "    - {}: ('{source}': \"{}\", '{compare}': \"{}\")",
                    change.name,
                    change.source_value.escape_debug(),
                    change.compare_value.escape_debug()
                )
                .unwrap();
            }
        }
    }

    writeln!(out).unwrap();
    writeln!(out, "{}", "Secrets (names only):".cyan().bold()).unwrap();
    if secrets.is_empty() {
        writeln!(out, "  Secret names are identical in both environments.").unwrap();
    } else {
        if !secrets.source_only_names.is_empty() {
            writeln!(out, "  {}", format!("Only in '{source}':").green()).unwrap();
            for name in &secrets.source_only_names {
                writeln!(out, "    - {name}").unwrap();
            }
        }
        if !secrets.compare_only_names.is_empty() {
            let title = format!("Only in '{compare}' (missing from '{source}'):");
            writeln!(out, "  {}", title.red()).unwrap();
            for name in &secrets.compare_only_names {
                writeln!(out, "    - {name}").unwrap();
            }
        }
    }

    writeln!(out).unwrap();
    writeln!(out, "{}", "--- End of Diff Report ---".bold()).unwrap();
    out
}

/// The remediation content between copy/paste markers.
pub fn render_remediation_block(results: &DiffResults, generated_at: DateTime<Utc>) -> String {
    let mut out = String::new();
    writeln!(
        out,
        "{}",
        "--- Recommended .env content (copy and paste below) ---".bold()
    )
    .unwrap();
    out.push_str(&render::remediation(results, generated_at));
    writeln!(out, "{}", "--- End of .env content ---".bold()).unwrap();
    out
}
