use anyhow::{Context as _, Result};
use envkit::{Client, SourceChoice, SyncReport};

use crate::Context;
use crate::cli::SyncArgs;
use crate::progress;
use crate::prompt::{self, ItemKind, PasswordPrompt, Prompter, Terminal};
use crate::ui;

const STEPS: usize = 3;

pub fn run(ctx: &Context, args: SyncArgs) -> Result<()> {
    let prompter = Terminal;
    let Some(repo) = super::resolve_repo(ctx, &prompter)? else {
        ui::warn("Operation cancelled or missing repository input.");
        return Ok(());
    };

    let target = match args.target.filter(|t| !t.trim().is_empty()) {
        Some(target) => Some(target),
        None => prompt::ask_name(
            &prompter,
            "Enter the name of the TARGET GitHub Actions environment",
        )?,
    };
    let Some(target) = target else {
        ui::warn("Target environment name is required for copy/sync.");
        return Ok(());
    };

    let client = ctx.settings.client(repo)?;
    execute(
        &client,
        &prompter,
        &target,
        args.vars.choice(),
        args.secrets.choice(),
    )?;
    Ok(())
}

/// Reports of one sync run. `None` means that kind was not processed.
#[derive(Debug, Default)]
pub struct SyncOutcome {
    pub variables: Option<SyncReport>,
    pub secrets: Option<SyncReport>,
}

/// Run a sync into `target`. Missing source choices are asked for.
pub fn execute(
    client: &Client,
    p: &dyn Prompter,
    target: &str,
    vars: Option<SourceChoice>,
    secrets: Option<SourceChoice>,
) -> Result<SyncOutcome> {
    ui::header(&format!(
        "Syncing environment '{target}' in {}",
        client.repo()
    ));

    ui::step(1, STEPS, &format!("Setting up TARGET environment '{target}'..."));
    let pb = progress::spinner(&format!("Checking environment '{target}'..."));
    match client.ensure_environment(target) {
        Ok(env) => progress::finish_success(&pb, &format!("Environment '{}' is ready", env.name)),
        Err(err) => {
            progress::finish_error(&pb, &format!("Could not set up environment '{target}'"));
            return Err(err).with_context(|| format!("Failed to set up environment '{target}'"));
        }
    }

    println!();
    ui::step(2, STEPS, &format!("Processing variables for '{target}'..."));
    let choice = match vars {
        Some(choice) => choice,
        None => prompt::ask_source(p, ItemKind::Variables)?,
    };
    let variables = sync_variables(client, target, &choice);

    println!();
    ui::step(3, STEPS, &format!("Processing secrets for '{target}'..."));
    let choice = match secrets {
        Some(choice) => choice,
        None => prompt::ask_source(p, ItemKind::Secrets)?,
    };
    let secrets = sync_secrets(client, p, target, &choice);

    println!();
    ui::success(&format!(
        "Process finished for target environment '{target}' in '{}'",
        client.repo()
    ));
    Ok(SyncOutcome { variables, secrets })
}

fn sync_variables(client: &Client, target: &str, choice: &SourceChoice) -> Option<SyncReport> {
    if choice.is_skip() {
        ui::dim("Skipping variable processing.");
        return None;
    }

    let items = match client.load_variables(choice) {
        Ok(items) => items,
        Err(err) => {
            ui::warn(&format!("Could not load variables from {choice}: {err}"));
            return None;
        }
    };
    if items.is_empty() {
        ui::info(&format!("No variables found in {choice}."));
        return None;
    }
    ui::info(&format!("Found {} in {choice}", ui::count_noun(items.len(), "variable")));

    let pb = progress::spinner(&format!(
        "Writing {} into '{target}'...",
        ui::count_noun(items.len(), "variable")
    ));
    let report = client.sync_variables(target, &items);
    pb.finish_and_clear();

    print_report(&report, "variable", target);
    Some(report)
}

fn sync_secrets(
    client: &Client,
    p: &dyn Prompter,
    target: &str,
    choice: &SourceChoice,
) -> Option<SyncReport> {
    if choice.is_skip() {
        ui::dim("Skipping secret processing.");
        return None;
    }

    // One key per run, fetched before anything is loaded or prompted.
    let pb = progress::spinner("Fetching public key for target environment...");
    let sealer = match client.prepare_sealer(target) {
        Ok(sealer) => {
            progress::finish_success(&pb, "Public key fetched");
            sealer
        }
        Err(err) => {
            progress::finish_error(&pb, &format!("Could not fetch public key: {err}"));
            ui::warn("Skipping secret processing due to public key error.");
            return None;
        }
    };

    let items = match client.load_secrets(choice) {
        Ok(items) => items,
        Err(err) => {
            ui::warn(&format!("Could not load secrets from {choice}: {err}"));
            return None;
        }
    };
    if items.is_empty() {
        ui::info(&format!("No secrets found in {choice}."));
        return None;
    }
    match choice {
        SourceChoice::Env(_) => ui::info(&format!(
            "Found {} in {choice}. You will be prompted for their values.",
            ui::count_noun(items.len(), "secret name")
        )),
        _ => ui::info(&format!("Found {} in {choice}", ui::count_noun(items.len(), "secret"))),
    }

    let report = client.sync_secrets(target, &items, &sealer, &PasswordPrompt::new(p));
    print_report(&report, "secret", target);
    Some(report)
}

fn print_report(report: &SyncReport, noun: &str, target: &str) {
    for name in &report.created {
        ui::dim(&format!("Created {noun} '{name}'"));
    }
    for name in &report.updated {
        ui::dim(&format!("Set {noun} '{name}'"));
    }
    for name in &report.skipped {
        ui::dim(&format!("Skipping {noun} '{name}' as no value was provided."));
    }
    for (name, message) in &report.failed {
        ui::warn(&format!("Failed to set {noun} '{name}': {message}"));
    }
    ui::success(&format!(
        "{} processed into '{target}'",
        ui::count_noun(report.processed(), noun)
    ));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::testing::{client, keyed_mock};
    use crate::prompt::testing::{Answer, Scripted};
    use envkit::MockBackend;
    use envkit::Variable;
    use envkit::backend::MockOp;
    use std::io::Write;

    #[test]
    fn test_sync_creates_target_and_copies_variables() {
        let mock = MockBackend::new();
        mock.add_variable("staging", "A", "1");
        mock.add_variable("staging", "B", "2");
        let p = Scripted::default();

        let outcome = execute(
            &client(&mock),
            &p,
            "preview",
            Some(SourceChoice::Env("staging".into())),
            Some(SourceChoice::Skip),
        )
        .unwrap();

        assert!(mock.has_environment("preview"));
        assert_eq!(outcome.variables.unwrap().created, vec!["A", "B"]);
        assert!(outcome.secrets.is_none());
        assert_eq!(
            mock.variables("preview"),
            vec![Variable::new("A", "1"), Variable::new("B", "2")]
        );
    }

    #[test]
    fn test_sync_prompts_for_missing_choices() {
        let mock = keyed_mock("prod");
        mock.add_secret("staging", "API_KEY");
        mock.add_secret("staging", "UNSET");
        let p = Scripted::new([
            Answer::Select(Some(2)),
            Answer::Select(Some(0)),
            Answer::Text("staging"),
            Answer::Password("k-123"),
            Answer::Password(""),
        ]);

        let outcome = execute(&client(&mock), &p, "prod", None, None).unwrap();

        assert!(outcome.variables.is_none());
        let secrets = outcome.secrets.unwrap();
        assert_eq!(secrets.updated, vec!["API_KEY"]);
        assert_eq!(secrets.skipped, vec!["UNSET"]);
        assert!(mock.stored_secret("prod", "API_KEY").is_some());
        assert_eq!(p.remaining(), 0);
    }

    #[test]
    fn test_sync_secrets_from_file() {
        let mock = keyed_mock("prod");
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "DB_PASSWORD=hunter2").unwrap();
        writeln!(file, "EMPTY=").unwrap();
        let p = Scripted::default();

        let outcome = execute(
            &client(&mock),
            &p,
            "prod",
            Some(SourceChoice::Skip),
            Some(SourceChoice::File(file.path().to_path_buf())),
        )
        .unwrap();

        assert_eq!(outcome.secrets.unwrap().updated, vec!["DB_PASSWORD", "EMPTY"]);
        let stored = mock.stored_secret("prod", "DB_PASSWORD").unwrap();
        assert!(!stored.encrypted_value.contains("hunter2"));
        assert!(p.asked.borrow().is_empty());
    }

    #[test]
    fn test_public_key_failure_skips_secrets_only() {
        let mock = keyed_mock("prod");
        mock.add_variable("staging", "A", "1");
        mock.add_secret("staging", "S1");
        mock.fail(MockOp::GetPublicKey, "prod", 500);
        let p = Scripted::default();

        let outcome = execute(
            &client(&mock),
            &p,
            "prod",
            Some(SourceChoice::Env("staging".into())),
            Some(SourceChoice::Env("staging".into())),
        )
        .unwrap();

        assert_eq!(outcome.variables.unwrap().created, vec!["A"]);
        assert!(outcome.secrets.is_none());
        assert!(!mock.calls().contains(&"list_secrets staging".to_string()));
        assert!(p.asked.borrow().is_empty());
    }

    #[test]
    fn test_variable_load_failure_is_not_fatal() {
        let mock = MockBackend::new();
        let p = Scripted::default();

        let outcome = execute(
            &client(&mock),
            &p,
            "prod",
            Some(SourceChoice::Env("ghost".into())),
            Some(SourceChoice::Skip),
        )
        .unwrap();

        assert!(outcome.variables.is_none());
        assert!(mock.has_environment("prod"));
    }

    #[test]
    fn test_environment_setup_failure_aborts() {
        let mock = MockBackend::new();
        mock.fail(MockOp::CreateEnvironment, "prod", 403);
        let p = Scripted::default();

        let err = execute(
            &client(&mock),
            &p,
            "prod",
            Some(SourceChoice::Skip),
            Some(SourceChoice::Skip),
        )
        .unwrap_err();

        assert!(err.to_string().contains("Failed to set up environment 'prod'"));
        assert!(
            err.chain()
                .any(|e| e.downcast_ref::<envkit::Error>().is_some())
        );
    }
}
