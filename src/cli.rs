use clap::{Args, Parser, Subcommand};
use clap_complete::Shell;
use envkit::SourceChoice;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "ghenv")]
#[command(author = "Alberto Cavalcante")]
#[command(version)]
#[command(
    about = "Sync, diff and export GitHub Actions environment variables and secrets",
    long_about = "Sync, diff and export GitHub Actions environment variables and secrets.\n\n\
                  Run without a subcommand for the interactive menu."
)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Verbosity level
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Repository in owner/repo form
    #[arg(long, env = "REPO_FULL_NAME", global = true)]
    pub repo: Option<String>,

    /// GitHub personal access token
    #[arg(long, env = "GITHUB_TOKEN", hide_env_values = true, global = true)]
    pub token: Option<String>,

    /// GitHub API base URL (for GitHub Enterprise)
    #[arg(long, env = "GITHUB_API_URL", global = true)]
    pub api_url: Option<String>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand)]
pub enum Command {
    /// Copy variables and secrets into a target environment
    Sync(SyncArgs),

    /// Compare two environments
    Diff(DiffArgs),

    /// Export an environment to a .env file
    Export(ExportArgs),

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

// ============================================================================
// Sync
// ============================================================================

#[derive(Args)]
pub struct SyncArgs {
    /// Target environment (created if missing)
    #[arg(short, long)]
    pub target: Option<String>,

    #[command(flatten)]
    pub vars: VarSourceArgs,

    #[command(flatten)]
    pub secrets: SecretSourceArgs,
}

/// Where variables come from. Prompted when none is given.
#[derive(Args, Default)]
#[group(multiple = false)]
pub struct VarSourceArgs {
    /// Copy variables from another environment
    #[arg(long, value_name = "ENV")]
    pub vars_from_env: Option<String>,

    /// Import variables from a .env file
    #[arg(long, value_name = "FILE")]
    pub vars_from_file: Option<PathBuf>,

    /// Do not process variables
    #[arg(long)]
    pub skip_vars: bool,
}

impl VarSourceArgs {
    pub fn choice(&self) -> Option<SourceChoice> {
        source_choice(
            self.vars_from_env.as_ref(),
            self.vars_from_file.as_ref(),
            self.skip_vars,
        )
    }
}

/// Where secrets come from. Prompted when none is given.
#[derive(Args, Default)]
#[group(multiple = false)]
pub struct SecretSourceArgs {
    /// Copy secret names from another environment (values are prompted)
    #[arg(long, value_name = "ENV")]
    pub secrets_from_env: Option<String>,

    /// Import secret names and values from a .env file
    #[arg(long, value_name = "FILE")]
    pub secrets_from_file: Option<PathBuf>,

    /// Do not process secrets
    #[arg(long)]
    pub skip_secrets: bool,
}

impl SecretSourceArgs {
    pub fn choice(&self) -> Option<SourceChoice> {
        source_choice(
            self.secrets_from_env.as_ref(),
            self.secrets_from_file.as_ref(),
            self.skip_secrets,
        )
    }
}

fn source_choice(env: Option<&String>, file: Option<&PathBuf>, skip: bool) -> Option<SourceChoice> {
    match (env, file, skip) {
        (Some(env), _, _) => Some(SourceChoice::Env(env.clone())),
        (None, Some(file), _) => Some(SourceChoice::File(file.clone())),
        (None, None, true) => Some(SourceChoice::Skip),
        (None, None, false) => None,
    }
}

// ============================================================================
// Diff / Export
// ============================================================================

#[derive(Args)]
pub struct DiffArgs {
    /// Source environment (the reference)
    pub source: String,

    /// Environment to compare against the source
    pub compare: String,

    /// Also print .env content that aligns COMPARE with SOURCE
    #[arg(long)]
    pub env_file: bool,
}

#[derive(Args)]
pub struct ExportArgs {
    /// Environment to export
    pub env: String,

    /// Output file (defaults to <env>-export-<millis>.env)
    #[arg(short, long, value_name = "PATH")]
    pub output: Option<PathBuf>,
}
