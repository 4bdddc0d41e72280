//! Interactive prompts.
//!
//! Commands talk to the user through the [`Prompter`] trait so they can be
//! driven by a scripted prompter in tests.

use crate::ui;
use anyhow::{Context, Result};
use dialoguer::{Confirm, Input, Password, Select};
use envkit::{RepoRef, SecretPrompt, SecretValue, SourceChoice};
use std::path::PathBuf;

/// Source of user answers.
pub trait Prompter {
    /// Pick one of `items`. `None` when the user cancels (Esc or q).
    fn select(&self, prompt: &str, items: &[&str], default: usize) -> Result<Option<usize>>;

    /// Free text; may be empty.
    fn input(&self, prompt: &str) -> Result<String>;

    /// Hidden text; may be empty.
    fn password(&self, prompt: &str) -> Result<String>;

    /// Yes/no question.
    fn confirm(&self, prompt: &str, default: bool) -> Result<bool>;
}

/// Prompts on the controlling terminal.
pub struct Terminal;

impl Prompter for Terminal {
    fn select(&self, prompt: &str, items: &[&str], default: usize) -> Result<Option<usize>> {
        Select::new()
            .with_prompt(prompt)
            .items(items)
            .default(default)
            .interact_opt()
            .context("Failed to read selection")
    }

    fn input(&self, prompt: &str) -> Result<String> {
        Input::<String>::new()
            .with_prompt(prompt)
            .allow_empty(true)
            .interact_text()
            .context("Failed to read user input")
    }

    fn password(&self, prompt: &str) -> Result<String> {
        Password::new()
            .with_prompt(prompt)
            .allow_empty_password(true)
            .interact()
            .context("Failed to read secret value")
    }

    fn confirm(&self, prompt: &str, default: bool) -> Result<bool> {
        Confirm::new()
            .with_prompt(prompt)
            .default(default)
            .interact()
            .context("Failed to read user input")
    }
}

// ============================================================================
// Questions
// ============================================================================

/// Top-level action of the interactive menu.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Sync,
    Diff,
    Export,
}

impl Action {
    const ALL: [Self; 3] = [Self::Sync, Self::Diff, Self::Export];

    fn label(self) -> &'static str {
        match self {
            Self::Sync => "Copy/Sync environments",
            Self::Diff => "Diff two environments",
            Self::Export => "Export environment to file",
        }
    }
}

/// Ask which action to run. `None` if cancelled.
pub fn ask_action(p: &dyn Prompter) -> Result<Option<Action>> {
    let labels: Vec<_> = Action::ALL.iter().map(|a| a.label()).collect();
    let choice = p.select("What action do you want to perform?", &labels, 0)?;
    Ok(choice.and_then(|i| Action::ALL.get(i).copied()))
}

/// Ask for a name, trimming it. Empty answers are `None`.
pub fn ask_name(p: &dyn Prompter, prompt: &str) -> Result<Option<String>> {
    let answer = p.input(prompt)?;
    let answer = answer.trim();
    Ok((!answer.is_empty()).then(|| answer.to_string()))
}

/// Ask for the repository. Invalid input is reported and gives `None`.
pub fn ask_repo(p: &dyn Prompter) -> Result<Option<RepoRef>> {
    let Some(answer) = ask_name(p, "Enter the target repository name (e.g., owner/repo)")? else {
        return Ok(None);
    };
    match answer.parse() {
        Ok(repo) => Ok(Some(repo)),
        Err(err) => {
            ui::warn(&err.to_string());
            Ok(None)
        }
    }
}

/// What a source question is about.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemKind {
    Variables,
    Secrets,
}

impl ItemKind {
    pub fn noun(self) -> &'static str {
        match self {
            Self::Variables => "variables",
            Self::Secrets => "secrets",
        }
    }

    fn choices(self) -> [&'static str; 3] {
        match self {
            Self::Variables => [
                "Copy from a source GitHub Environment",
                "Import from a local .env file",
                "Skip variable processing",
            ],
            Self::Secrets => [
                "Copy names from a source GitHub Environment (values will be prompted)",
                "Import names and values from a local file (e.g., secrets.env)",
                "Skip secret processing",
            ],
        }
    }

    fn file_example(self) -> &'static str {
        match self {
            Self::Variables => "variables.env",
            Self::Secrets => "secrets.env",
        }
    }
}

/// Ask where variables or secrets come from, defaulting to skip.
///
/// Follow-up questions (source environment, file path) are asked here; an
/// empty answer to them turns the choice into [`SourceChoice::Skip`].
pub fn ask_source(p: &dyn Prompter, kind: ItemKind) -> Result<SourceChoice> {
    let noun = kind.noun();
    let prompt = format!("How do you want to source {}?", noun.to_uppercase());
    let choice = p.select(&prompt, &kind.choices(), 2)?;

    match choice {
        Some(0) => {
            let prompt = format!(
                "Enter the name of the SOURCE GitHub Actions environment to copy {noun} FROM"
            );
            match ask_name(p, &prompt)? {
                Some(env) => Ok(SourceChoice::Env(env)),
                None => {
                    ui::info(&format!(
                        "No source environment name provided. Skipping {noun} copy."
                    ));
                    Ok(SourceChoice::Skip)
                }
            }
        }
        Some(1) => {
            let prompt = format!(
                "Enter the path to the {noun} file (e.g., {})",
                kind.file_example()
            );
            match ask_name(p, &prompt)? {
                Some(path) => Ok(SourceChoice::File(PathBuf::from(path))),
                None => {
                    ui::info(&format!(
                        "No file path provided for {noun}. Skipping file import."
                    ));
                    Ok(SourceChoice::Skip)
                }
            }
        }
        _ => Ok(SourceChoice::Skip),
    }
}

/// Asks for secret values with a hidden prompt. Empty answers skip the secret.
pub struct PasswordPrompt<'a> {
    prompter: &'a dyn Prompter,
}

impl<'a> PasswordPrompt<'a> {
    pub fn new(prompter: &'a dyn Prompter) -> Self {
        Self { prompter }
    }
}

impl SecretPrompt for PasswordPrompt<'_> {
    fn secret_value(&self, name: &str) -> Option<SecretValue> {
        match self
            .prompter
            .password(&format!("Enter value for secret '{name}'"))
        {
            Ok(value) if value.is_empty() => None,
            Ok(value) => Some(SecretValue::new(value)),
            Err(err) => {
                log::warn!("could not read value for secret '{name}': {err:#}");
                None
            }
        }
    }
}

// ============================================================================
// Test support
// ============================================================================
