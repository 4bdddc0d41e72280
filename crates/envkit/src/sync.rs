//! Writing variables and secrets into a target environment.
//!
//! Writes are strictly sequential. A failing item is logged and recorded in
//! the [`SyncReport`]; the rest of the batch still runs.

use crate::backend::Backend;
use crate::dotenv;
use crate::error::{Error, Result};
use crate::seal::Sealer;
use crate::types::{
    Environment, RepoRef, SecretItem, SecretValue, SourceChoice, SyncReport, Variable,
};

/// Supplies secret values that are only known by name.
///
/// Called once per secret, in order, before that secret is written.
/// Returning `None` skips the secret.
pub trait SecretPrompt {
    /// Ask for the value of `name`.
    fn secret_value(&self, name: &str) -> Option<SecretValue>;
}

/// A prompt that never supplies a value, so every name-only secret is skipped.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoPrompt;

impl SecretPrompt for NoPrompt {
    fn secret_value(&self, _name: &str) -> Option<SecretValue> {
        None
    }
}

/// Get the target environment, creating it if it does not exist.
pub fn ensure_environment(
    backend: &dyn Backend,
    repo: &RepoRef,
    name: &str,
) -> Result<Environment> {
    if let Some(environment) = backend.get_environment(repo, name)? {
        log::debug!("environment '{name}' exists (id {})", environment.id);
        return Ok(environment);
    }

    log::info!("creating environment '{name}' in {repo}");
    backend.create_environment(repo, name)?;
    backend
        .get_environment(repo, name)?
        .ok_or_else(|| Error::Other(format!("environment '{name}' missing right after creation")))
}

/// Load the variables a [`SourceChoice`] points at.
pub fn load_variables(
    backend: &dyn Backend,
    repo: &RepoRef,
    source: &SourceChoice,
) -> Result<Vec<Variable>> {
    match source {
        SourceChoice::Env(env) => backend.list_variables(repo, env),
        SourceChoice::File(path) => dotenv::parse_file(path),
        SourceChoice::Skip => Ok(Vec::new()),
    }
}

/// Load the secrets a [`SourceChoice`] points at.
///
/// File entries carry their values; environment entries are names only.
pub fn load_secrets(
    backend: &dyn Backend,
    repo: &RepoRef,
    source: &SourceChoice,
) -> Result<Vec<SecretItem>> {
    match source {
        SourceChoice::Env(env) => Ok(backend
            .list_secret_names(repo, env)?
            .into_iter()
            .map(|meta| SecretItem::name_only(meta.name))
            .collect()),
        SourceChoice::File(path) => Ok(dotenv::parse_file(path)?
            .into_iter()
            .map(|var| SecretItem::with_value(var.name, var.value))
            .collect()),
        SourceChoice::Skip => Ok(Vec::new()),
    }
}

/// Fetch the target's public key and prepare it for sealing.
pub fn prepare_sealer(backend: &dyn Backend, repo: &RepoRef, target: &str) -> Result<Sealer> {
    let key = backend.get_public_key(repo, target)?;
    log::debug!("fetched public key {} for '{target}'", key.key_id);
    Sealer::new(&key)
}

/// Create or update every variable in `items`, in order.
pub fn sync_variables(
    backend: &dyn Backend,
    repo: &RepoRef,
    target: &str,
    items: &[Variable],
) -> SyncReport {
    let mut report = SyncReport::default();
    for variable in items {
        match backend.create_or_update_variable(repo, target, variable) {
            Ok(outcome) => {
                log::info!("variable '{}' {outcome:?} in '{target}'", variable.name);
                report.record(&variable.name, outcome);
            }
            Err(err) => {
                log::warn!("failed to set variable '{}' in '{target}': {err}", variable.name);
                report.failed.push((variable.name.clone(), err.to_string()));
            }
        }
    }
    report
}

/// Seal and write every secret in `items`, in order.
///
/// Name-only items are resolved through `prompt` just before they are
/// written. Secret writes always replace, so each success counts as updated.
pub fn sync_secrets(
    backend: &dyn Backend,
    repo: &RepoRef,
    target: &str,
    items: &[SecretItem],
    sealer: &Sealer,
    prompt: &dyn SecretPrompt,
) -> SyncReport {
    let mut report = SyncReport::default();
    for item in items {
        let value = match &item.value {
            Some(value) => value.clone(),
            None => match prompt.secret_value(&item.name) {
                Some(value) => value,
                None => {
                    log::info!("skipping secret '{}', no value provided", item.name);
                    report.skipped.push(item.name.clone());
                    continue;
                }
            },
        };

        let sealed = sealer.seal(&value);
        match backend.create_or_update_secret(repo, target, &item.name, &sealed, sealer.key_id()) {
            Ok(()) => {
                log::info!("secret '{}' set in '{target}'", item.name);
                report.updated.push(item.name.clone());
            }
            Err(err) => {
                log::warn!("failed to set secret '{}' in '{target}': {err}", item.name);
                report.failed.push((item.name.clone(), err.to_string()));
            }
        }
    }
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{MockBackend, MockOp};
    use crate::types::PublicKeyInfo;
    use base64::Engine;
    use base64::engine::general_purpose::STANDARD;
    use sodiumoxide::crypto::{box_, sealedbox};
    use std::cell::RefCell;
    use std::collections::HashMap;
    use std::io::Write;

    fn repo() -> RepoRef {
        RepoRef::new("octo-org", "website")
    }

    /// Answers from a fixed map and records which names were asked.
    struct MapPrompt {
        answers: HashMap<&'static str, &'static str>,
        asked: RefCell<Vec<String>>,
    }

    impl MapPrompt {
        fn new(answers: &[(&'static str, &'static str)]) -> Self {
            Self {
                answers: answers.iter().copied().collect(),
                asked: RefCell::new(Vec::new()),
            }
        }
    }

    impl SecretPrompt for MapPrompt {
        fn secret_value(&self, name: &str) -> Option<SecretValue> {
            self.asked.borrow_mut().push(name.to_string());
            self.answers.get(name).map(|v| SecretValue::new(*v))
        }
    }

    fn keyed_mock(env: &str) -> (MockBackend, box_::PublicKey, box_::SecretKey) {
        sodiumoxide::init().unwrap();
        let (pk, sk) = box_::gen_keypair();
        let mock = MockBackend::new();
        mock.add_environment(env);
        mock.set_public_key(
            env,
            PublicKeyInfo {
                key: STANDARD.encode(pk.0),
                key_id: "kid-42".to_string(),
            },
        );
        (mock, pk, sk)
    }

    fn open(
        mock: &MockBackend,
        env: &str,
        name: &str,
        pk: &box_::PublicKey,
        sk: &box_::SecretKey,
    ) -> String {
        let stored = mock.stored_secret(env, name).unwrap();
        assert_eq!(stored.key_id, "kid-42");
        let bytes = STANDARD.decode(stored.encrypted_value).unwrap();
        String::from_utf8(sealedbox::open(&bytes, pk, sk).unwrap()).unwrap()
    }

    #[test]
    fn test_ensure_environment_existing() {
        let mock = MockBackend::new();
        mock.add_environment("prod");

        let env = ensure_environment(&mock, &repo(), "prod").unwrap();
        assert_eq!(env.name, "prod");
        assert_eq!(mock.calls(), vec!["get_environment prod"]);
    }

    #[test]
    fn test_ensure_environment_creates_missing() {
        let mock = MockBackend::new();

        let env = ensure_environment(&mock, &repo(), "preview").unwrap();
        assert_eq!(env.name, "preview");
        assert_eq!(
            mock.calls(),
            vec![
                "get_environment preview",
                "create_environment preview",
                "get_environment preview"
            ]
        );
    }

    #[test]
    fn test_ensure_environment_create_failure() {
        let mock = MockBackend::new();
        mock.fail(MockOp::CreateEnvironment, "preview", 403);

        let err = ensure_environment(&mock, &repo(), "preview").unwrap_err();
        assert_eq!(err.category(), crate::ErrorCategory::Auth);
    }

    #[test]
    fn test_sync_variables_creates_and_updates() {
        let mock = MockBackend::new();
        mock.add_variable("prod", "A", "old");

        let report = sync_variables(
            &mock,
            &repo(),
            "prod",
            &[Variable::new("A", "new"), Variable::new("B", "2")],
        );

        assert_eq!(report.updated, vec!["A"]);
        assert_eq!(report.created, vec!["B"]);
        assert_eq!(report.processed(), 2);
        assert_eq!(
            mock.variables("prod"),
            vec![Variable::new("A", "new"), Variable::new("B", "2")]
        );
    }

    #[test]
    fn test_sync_variables_partial_failure_continues() {
        let mock = MockBackend::new();
        mock.add_environment("prod");
        mock.fail(MockOp::CreateVariable, "BAD", 422);

        let report = sync_variables(
            &mock,
            &repo(),
            "prod",
            &[
                Variable::new("A", "1"),
                Variable::new("BAD", "x"),
                Variable::new("C", "3"),
            ],
        );

        assert_eq!(report.created, vec!["A", "C"]);
        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.failed[0].0, "BAD");
        assert!(report.has_failures());
    }

    #[test]
    fn test_load_variables_sources() {
        let mock = MockBackend::new();
        mock.add_variable("staging", "A", "1");

        let source = SourceChoice::Env("staging".into());
        let from_env = load_variables(&mock, &repo(), &source).unwrap();
        assert_eq!(from_env, vec![Variable::new("A", "1")]);

        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "X=10").unwrap();
        let source = SourceChoice::File(file.path().to_path_buf());
        let from_file = load_variables(&mock, &repo(), &source).unwrap();
        assert_eq!(from_file, vec![Variable::new("X", "10")]);

        assert!(load_variables(&mock, &repo(), &SourceChoice::Skip).unwrap().is_empty());
    }

    #[test]
    fn test_load_secrets_sources() {
        let mock = MockBackend::new();
        mock.add_secret("staging", "TOKEN");

        let source = SourceChoice::Env("staging".into());
        let from_env = load_secrets(&mock, &repo(), &source).unwrap();
        assert_eq!(from_env, vec![SecretItem::name_only("TOKEN")]);

        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "DB_PASSWORD=hunter2").unwrap();
        let source = SourceChoice::File(file.path().to_path_buf());
        let from_file = load_secrets(&mock, &repo(), &source).unwrap();
        assert_eq!(from_file, vec![SecretItem::with_value("DB_PASSWORD", "hunter2")]);
    }

    #[test]
    fn test_load_from_missing_environment_fails() {
        let source = SourceChoice::Env("ghost".into());
        let err = load_variables(&MockBackend::new(), &repo(), &source).unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn test_sync_secrets_from_file_values() {
        let (mock, pk, sk) = keyed_mock("prod");
        let sealer = prepare_sealer(&mock, &repo(), "prod").unwrap();
        let prompt = MapPrompt::new(&[]);

        let report = sync_secrets(
            &mock,
            &repo(),
            "prod",
            &[
                SecretItem::with_value("DB_PASSWORD", "hunter2"),
                SecretItem::with_value("EMPTY", ""),
            ],
            &sealer,
            &prompt,
        );

        assert_eq!(report.updated, vec!["DB_PASSWORD", "EMPTY"]);
        assert!(prompt.asked.borrow().is_empty());
        assert_eq!(open(&mock, "prod", "DB_PASSWORD", &pk, &sk), "hunter2");
        assert_eq!(open(&mock, "prod", "EMPTY", &pk, &sk), "");
    }

    #[test]
    fn test_sync_secrets_prompts_and_skips() {
        let (mock, pk, sk) = keyed_mock("prod");
        let sealer = prepare_sealer(&mock, &repo(), "prod").unwrap();
        let prompt = MapPrompt::new(&[("API_KEY", "k-123")]);

        let report = sync_secrets(
            &mock,
            &repo(),
            "prod",
            &[SecretItem::name_only("API_KEY"), SecretItem::name_only("UNSET")],
            &sealer,
            &prompt,
        );

        assert_eq!(*prompt.asked.borrow(), vec!["API_KEY", "UNSET"]);
        assert_eq!(report.updated, vec!["API_KEY"]);
        assert_eq!(report.skipped, vec!["UNSET"]);
        assert_eq!(open(&mock, "prod", "API_KEY", &pk, &sk), "k-123");
        assert!(mock.stored_secret("prod", "UNSET").is_none());
    }

    #[test]
    fn test_sync_secrets_partial_failure_continues() {
        let (mock, _, _) = keyed_mock("prod");
        mock.fail(MockOp::PutSecret, "A", 500);
        let sealer = prepare_sealer(&mock, &repo(), "prod").unwrap();

        let report = sync_secrets(
            &mock,
            &repo(),
            "prod",
            &[SecretItem::with_value("A", "1"), SecretItem::with_value("B", "2")],
            &sealer,
            &NoPrompt,
        );

        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.updated, vec!["B"]);
    }

    #[test]
    fn test_prepare_sealer_missing_key() {
        let mock = MockBackend::new();
        mock.add_environment("prod");
        assert!(prepare_sealer(&mock, &repo(), "prod").unwrap_err().is_not_found());
    }

    #[test]
    fn test_no_prompt_skips_everything() {
        let (mock, _, _) = keyed_mock("prod");
        let sealer = prepare_sealer(&mock, &repo(), "prod").unwrap();

        let items = [SecretItem::name_only("X")];
        let report = sync_secrets(&mock, &repo(), "prod", &items, &sealer, &NoPrompt);
        assert_eq!(report.skipped, vec!["X"]);
        assert_eq!(report.processed(), 0);
    }
}
