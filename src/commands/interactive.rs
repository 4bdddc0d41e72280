use anyhow::{Context as _, Result};
use chrono::Utc;
use envkit::Client;
use std::path::PathBuf;

use crate::Context;
use crate::prompt::{self, Action, Prompter, Terminal};
use crate::ui;

use super::{diff, export, sync, token};

/// Interactive menu, used when no subcommand is given.
pub fn run(ctx: &Context) -> Result<()> {
    let prompter = Terminal;
    if !ctx.settings.has_token() {
        let cwd = std::env::current_dir().context("Could not determine current directory")?;
        return token::offer_guide(&prompter, &cwd);
    }

    let Some(action) = prompt::ask_action(&prompter)? else {
        ui::info("Operation cancelled by user.");
        return Ok(());
    };
    let Some(repo) = super::resolve_repo(ctx, &prompter)? else {
        ui::warn("Operation cancelled or missing repository input.");
        return Ok(());
    };
    let client = ctx.settings.client(repo)?;
    dispatch(&client, &prompter, action)
}

/// Ask the per-action questions and run the action.
pub fn dispatch(client: &Client, p: &dyn Prompter, action: Action) -> Result<()> {
    match action {
        Action::Sync => {
            let prompt = "Enter the name of the TARGET GitHub Actions environment for copy/sync";
            let Some(target) = prompt::ask_name(p, prompt)? else {
                ui::warn("Target environment name is required for copy/sync.");
                return Ok(());
            };
            sync::execute(client, p, &target, None, None)?;
        }
        Action::Diff => {
            let source = prompt::ask_name(p, "Enter the name of the SOURCE environment for diff")?;
            let compare =
                prompt::ask_name(p, "Enter the name of the COMPARE environment for diff")?;
            let (Some(source), Some(compare)) = (source, compare) else {
                ui::warn("Both source and compare environment names are required for diff.");
                return Ok(());
            };
            run_diff(client, p, &source, &compare)?;
        }
        Action::Export => {
            let Some(env) = prompt::ask_name(p, "Enter the name of the environment to export")?
            else {
                ui::warn("Environment name is required for export.");
                return Ok(());
            };
            let output = prompt::ask_name(
                p,
                "Enter the output file path (optional, will auto-generate if empty)",
            )?
            .map(PathBuf::from);
            export::execute(client, &env, output.as_deref(), Utc::now())?;
        }
    }
    Ok(())
}

fn run_diff(client: &Client, p: &dyn Prompter, source: &str, compare: &str) -> Result<()> {
    let Some(results) = diff::perform_diff(client, source, compare) else {
        return Ok(());
    };
    print!("{}", diff::render_report(&results));

    if !results.is_identical()
        && p.confirm(
            &format!("Generate .env content to align '{compare}' with '{source}'?"),
            false,
        )?
    {
        println!();
        print!("{}", diff::render_remediation_block(&results, Utc::now()));
    }

    println!();
    ui::success("Diff completed successfully!");
    Ok(())
}
