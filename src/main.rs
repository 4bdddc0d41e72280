mod cli;
mod commands;
mod config;
mod progress;
mod prompt;
mod ui;

use anyhow::Result;
use clap::{CommandFactory, Parser};
use clap_complete::generate;
use colored::Colorize;
use cli::{Cli, Command};
use config::{FileConfig, Settings};
use std::io;
use std::process::ExitCode;

/// Global context for the application
pub struct Context {
    pub verbose: u8,
    pub quiet: bool,
    pub settings: Settings,
}

fn main() -> ExitCode {
    // A .env in the working directory may provide GITHUB_TOKEN and REPO_FULL_NAME;
    // it must be loaded before clap reads the environment.
    let dotenv = dotenvy::dotenv();

    let cli = Cli::parse();

    // Initialize logging based on verbosity
    let log_level = match cli.verbose {
        0 => log::LevelFilter::Warn,
        1 => log::LevelFilter::Info,
        2 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };

    env_logger::Builder::new()
        .filter_level(if cli.quiet {
            log::LevelFilter::Error
        } else {
            log_level
        })
        .format_timestamp(None)
        .init();

    match &dotenv {
        Ok(path) => log::debug!("loaded {}", path.display()),
        Err(err) if err.not_found() => log::debug!("no .env file found"),
        Err(err) => ui::warn(&format!("Could not load .env file: {err}")),
    }

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            report(&err);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    let file = FileConfig::load().unwrap_or_else(|err| {
        ui::warn(&format!("Ignoring config file: {err:#}"));
        FileConfig::default()
    });

    let ctx = Context {
        verbose: cli.verbose,
        quiet: cli.quiet,
        settings: Settings::resolve(cli.repo, cli.token, cli.api_url, file),
    };
    log::debug!("verbosity {}, quiet {}", ctx.verbose, ctx.quiet);

    match cli.command {
        None => commands::interactive::run(&ctx),
        Some(Command::Sync(args)) => commands::sync::run(&ctx, args),
        Some(Command::Diff(args)) => commands::diff::run(&ctx, args),
        Some(Command::Export(args)) => commands::export::run(&ctx, args),
        Some(Command::Completions { shell }) => {
            generate(shell, &mut Cli::command(), "ghenv", &mut io::stdout());
            Ok(())
        }
    }
}

/// Print an error that reached the top level.
fn report(err: &anyhow::Error) {
    ui::error(&error_report(err));
}

/// Message chain, then category advice and any API payload of the
/// innermost library error.
fn error_report(err: &anyhow::Error) -> String {
    let mut out = format!("{err:#}");
    if let Some(cause) = err.chain().find_map(|e| e.downcast_ref::<envkit::Error>()) {
        out.push_str(&format!("\n  {}", cause.category().advice().dimmed()));
        if let Some(payload) = cause.payload() {
            out.push('\n');
            out.push_str(&ui::format_payload(payload));
        }
    }
    out
}
