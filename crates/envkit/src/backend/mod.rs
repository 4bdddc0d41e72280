//! Backend traits and implementations for the remote configuration store.
//!
//! This module provides the [`Backend`] trait, the only seam through which
//! envkit talks to the hosting platform. The primary implementation is
//! [`github::GitHubBackend`].
//!
//! # Testing
//!
//! Use [`MockBackend`] for testing without network access:
//!
//! ```
//! use envkit::backend::{Backend, MockBackend};
//! use envkit::{RepoRef, Variable};
//!
//! let mock = MockBackend::new();
//! mock.add_environment("staging");
//! mock.add_variable("staging", "API_URL", "https://staging.example.com");
//!
//! let repo = RepoRef::new("octo-org", "website");
//! let vars = mock.list_variables(&repo, "staging").unwrap();
//! assert_eq!(vars, vec![Variable::new("API_URL", "https://staging.example.com")]);
//! ```

pub mod github;

use crate::error::{Error, Result};
use crate::types::{Environment, PublicKeyInfo, RepoRef, SecretMeta, UpsertOutcome, Variable};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

/// Backend trait for reading and writing environment configuration.
///
/// Every operation distinguishes "not found" from other failures:
/// [`Backend::get_environment`] answers `Ok(None)`, the rest return an error
/// whose category is [`crate::ErrorCategory::NotFound`].
pub trait Backend: Send + Sync {
    /// Fetch an environment, `None` if it does not exist.
    fn get_environment(&self, repo: &RepoRef, env: &str) -> Result<Option<Environment>>;

    /// Create an environment (a no-op on the platform if it already exists).
    fn create_environment(&self, repo: &RepoRef, env: &str) -> Result<()>;

    /// Fetch the public key used to seal secrets for an environment.
    fn get_public_key(&self, repo: &RepoRef, env: &str) -> Result<PublicKeyInfo>;

    /// List all variables of an environment, following pagination.
    fn list_variables(&self, repo: &RepoRef, env: &str) -> Result<Vec<Variable>>;

    /// List all secret names of an environment, following pagination.
    fn list_secret_names(&self, repo: &RepoRef, env: &str) -> Result<Vec<SecretMeta>>;

    /// Create a variable.
    ///
    /// # Errors
    ///
    /// Fails with category `AlreadyExists` when the name is taken.
    fn create_variable(&self, repo: &RepoRef, env: &str, variable: &Variable) -> Result<()>;

    /// Update an existing variable.
    fn update_variable(&self, repo: &RepoRef, env: &str, variable: &Variable) -> Result<()>;

    /// Create or replace a secret with an already sealed value.
    fn create_or_update_secret(
        &self,
        repo: &RepoRef,
        env: &str,
        name: &str,
        encrypted_value: &str,
        key_id: &str,
    ) -> Result<()>;

    /// Create a variable, falling back to an update if it already exists.
    fn create_or_update_variable(
        &self,
        repo: &RepoRef,
        env: &str,
        variable: &Variable,
    ) -> Result<UpsertOutcome> {
        match self.create_variable(repo, env, variable) {
            Ok(()) => Ok(UpsertOutcome::Created),
            Err(err) if err.is_already_exists() => {
                log::debug!(
                    "variable '{}' exists in '{}', updating",
                    variable.name,
                    env
                );
                self.update_variable(repo, env, variable)?;
                Ok(UpsertOutcome::Updated)
            }
            Err(err) => Err(err),
        }
    }
}

/// Operations of [`MockBackend`] that can be made to fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MockOp {
    /// [`Backend::get_environment`], keyed by environment name.
    GetEnvironment,
    /// [`Backend::create_environment`], keyed by environment name.
    CreateEnvironment,
    /// [`Backend::get_public_key`], keyed by environment name.
    GetPublicKey,
    /// [`Backend::list_variables`], keyed by environment name.
    ListVariables,
    /// [`Backend::list_secret_names`], keyed by environment name.
    ListSecrets,
    /// [`Backend::create_variable`], keyed by variable name.
    CreateVariable,
    /// [`Backend::update_variable`], keyed by variable name.
    UpdateVariable,
    /// [`Backend::create_or_update_secret`], keyed by secret name.
    PutSecret,
}

/// A sealed secret as stored by [`MockBackend`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredSecret {
    /// Base64 sealed value.
    pub encrypted_value: String,
    /// Key id sent along with the value.
    pub key_id: String,
}

#[derive(Debug, Default)]
struct MockEnvironment {
    id: u64,
    variables: Vec<Variable>,
    secrets: Vec<(String, Option<StoredSecret>)>,
}

#[derive(Debug, Default)]
struct MockState {
    environments: HashMap<String, MockEnvironment>,
    public_keys: HashMap<String, PublicKeyInfo>,
    failures: HashMap<(MockOp, String), u16>,
    calls: Vec<String>,
    next_id: u64,
}

/// Mock backend for testing without network access.
///
/// State lives behind an `Arc<Mutex<_>>` so clones observe the same store.
/// Environments must be added before they can be listed or written to,
/// mirroring the 404s of the real API.
#[derive(Debug, Clone, Default)]
pub struct MockBackend {
    state: Arc<Mutex<MockState>>,
}

impl MockBackend {
    /// Create a new empty mock backend.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    /// Add an empty environment.
    pub fn add_environment(&self, env: &str) {
        let mut state = self.lock();
        state.next_id += 1;
        let id = state.next_id;
        state
            .environments
            .entry(env.to_string())
            .or_insert_with(|| MockEnvironment {
                id,
                ..MockEnvironment::default()
            });
    }

    /// Add a variable to an environment, creating the environment if needed.
    ///
    /// Duplicate names are appended as-is, which the real API never does.
    pub fn add_variable(&self, env: &str, name: &str, value: &str) {
        self.add_environment(env);
        let mut state = self.lock();
        if let Some(environment) = state.environments.get_mut(env) {
            environment.variables.push(Variable::new(name, value));
        }
    }

    /// Add a secret name to an environment, creating the environment if needed.
    pub fn add_secret(&self, env: &str, name: &str) {
        self.add_environment(env);
        let mut state = self.lock();
        if let Some(environment) = state.environments.get_mut(env) {
            environment.secrets.push((name.to_string(), None));
        }
    }

    /// Set the public key of an environment.
    pub fn set_public_key(&self, env: &str, key: PublicKeyInfo) {
        self.lock().public_keys.insert(env.to_string(), key);
    }

    /// Make an operation fail with an HTTP status for the given target.
    pub fn fail(&self, op: MockOp, target: &str, status: u16) {
        self.lock().failures.insert((op, target.to_string()), status);
    }

    /// Every call made so far, as `"<op> <env> [<item>]"` strings.
    #[must_use]
    pub fn calls(&self) -> Vec<String> {
        self.lock().calls.clone()
    }

    /// Whether an environment exists.
    #[must_use]
    pub fn has_environment(&self, env: &str) -> bool {
        self.lock().environments.contains_key(env)
    }

    /// The sealed value stored for a secret written through the backend.
    #[must_use]
    pub fn stored_secret(&self, env: &str, name: &str) -> Option<StoredSecret> {
        let state = self.lock();
        state.environments.get(env).and_then(|e| {
            e.secrets
                .iter()
                .find(|(n, _)| n == name)
                .and_then(|(_, stored)| stored.clone())
        })
    }

    /// Variables currently stored for an environment.
    #[must_use]
    pub fn variables(&self, env: &str) -> Vec<Variable> {
        self.lock()
            .environments
            .get(env)
            .map(|e| e.variables.clone())
            .unwrap_or_default()
    }

    fn enter(&self, op: MockOp, call: String, target: &str) -> Result<MutexGuard<'_, MockState>> {
        let mut state = self.lock();
        state.calls.push(call);
        if let Some(status) = state.failures.get(&(op, target.to_string())) {
            return Err(Error::Api {
                status: *status,
                message: format!("mock failure for {target}"),
                payload: Some(serde_json::json!({ "message": "mock failure" })),
            });
        }
        Ok(state)
    }
}

fn missing_env(env: &str) -> Error {
    Error::not_found(format!("environment '{env}'"))
}

impl Backend for MockBackend {
    fn get_environment(&self, _repo: &RepoRef, env: &str) -> Result<Option<Environment>> {
        let state = self.enter(MockOp::GetEnvironment, format!("get_environment {env}"), env)?;
        Ok(state.environments.get(env).map(|e| Environment {
            id: e.id,
            name: env.to_string(),
            html_url: None,
            created_at: None,
            updated_at: None,
        }))
    }

    fn create_environment(&self, _repo: &RepoRef, env: &str) -> Result<()> {
        drop(self.enter(
            MockOp::CreateEnvironment,
            format!("create_environment {env}"),
            env,
        )?);
        self.add_environment(env);
        Ok(())
    }

    fn get_public_key(&self, _repo: &RepoRef, env: &str) -> Result<PublicKeyInfo> {
        let state = self.enter(MockOp::GetPublicKey, format!("get_public_key {env}"), env)?;
        if !state.environments.contains_key(env) {
            return Err(missing_env(env));
        }
        state
            .public_keys
            .get(env)
            .cloned()
            .ok_or_else(|| Error::not_found(format!("public key of environment '{env}'")))
    }

    fn list_variables(&self, _repo: &RepoRef, env: &str) -> Result<Vec<Variable>> {
        let state = self.enter(MockOp::ListVariables, format!("list_variables {env}"), env)?;
        state
            .environments
            .get(env)
            .map(|e| e.variables.clone())
            .ok_or_else(|| missing_env(env))
    }

    fn list_secret_names(&self, _repo: &RepoRef, env: &str) -> Result<Vec<SecretMeta>> {
        let state = self.enter(MockOp::ListSecrets, format!("list_secrets {env}"), env)?;
        state
            .environments
            .get(env)
            .map(|e| e.secrets.iter().map(|(n, _)| SecretMeta::new(n)).collect())
            .ok_or_else(|| missing_env(env))
    }

    fn create_variable(&self, _repo: &RepoRef, env: &str, variable: &Variable) -> Result<()> {
        let mut state = self.enter(
            MockOp::CreateVariable,
            format!("create_variable {env} {}", variable.name),
            &variable.name,
        )?;
        let environment = state.environments.get_mut(env).ok_or_else(|| missing_env(env))?;
        if environment.variables.iter().any(|v| v.name == variable.name) {
            return Err(Error::Api {
                status: 409,
                message: "Already exists - Variable already exists".to_string(),
                payload: None,
            });
        }
        environment.variables.push(variable.clone());
        Ok(())
    }

    fn update_variable(&self, _repo: &RepoRef, env: &str, variable: &Variable) -> Result<()> {
        let mut state = self.enter(
            MockOp::UpdateVariable,
            format!("update_variable {env} {}", variable.name),
            &variable.name,
        )?;
        let environment = state.environments.get_mut(env).ok_or_else(|| missing_env(env))?;
        match environment
            .variables
            .iter_mut()
            .find(|v| v.name == variable.name)
        {
            Some(existing) => {
                existing.value = variable.value.clone();
                Ok(())
            }
            None => Err(Error::not_found(format!("variable '{}'", variable.name))),
        }
    }

    fn create_or_update_secret(
        &self,
        _repo: &RepoRef,
        env: &str,
        name: &str,
        encrypted_value: &str,
        key_id: &str,
    ) -> Result<()> {
        let mut state = self.enter(MockOp::PutSecret, format!("put_secret {env} {name}"), name)?;
        let environment = state.environments.get_mut(env).ok_or_else(|| missing_env(env))?;
        let stored = StoredSecret {
            encrypted_value: encrypted_value.to_string(),
            key_id: key_id.to_string(),
        };
        match environment.secrets.iter_mut().find(|(n, _)| n == name) {
            Some(existing) => existing.1 = Some(stored),
            None => environment.secrets.push((name.to_string(), Some(stored))),
        }
        Ok(())
    }
}
