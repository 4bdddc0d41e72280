//! # envkit
//!
//! Pure Rust library for reading, comparing and writing the variables and
//! secrets of GitHub Actions deployment environments.
//!
//! This crate provides functionality for:
//! - Diffing two environments (variables by value, secrets by name)
//! - Rendering a remediation dotenv snippet from a diff
//! - Exporting an environment to a dotenv file
//! - Copying variables and secrets from another environment or a file,
//!   sealing secret values with the target's public key
//!
//! ## Example
//!
//! ```no_run
//! use envkit::{Client, RepoRef};
//!
//! let repo: RepoRef = "octo-org/website".parse().unwrap();
//! let client = Client::new("ghp_example", repo);
//!
//! let results = client.diff("production", "staging").expect("diff failed");
//! if results.is_identical() {
//!     println!("Nothing to do");
//! }
//! ```
//!
//! ## Testing
//!
//! Every operation goes through the [`backend::Backend`] trait, so tests can
//! swap in a [`MockBackend`]:
//!
//! ```
//! use envkit::{Client, MockBackend, RepoRef};
//!
//! let mock = MockBackend::new();
//! mock.add_variable("prod", "A", "1");
//! mock.add_variable("staging", "A", "2");
//!
//! let client = Client::with_backend(Box::new(mock), RepoRef::new("o", "r"));
//! let results = client.diff("prod", "staging").unwrap();
//! assert_eq!(results.variables.value_changed.len(), 1);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod backend;
pub mod diff;
pub mod dotenv;
pub mod error;
pub mod export;
pub mod render;
pub mod seal;
pub mod sync;
pub mod types;

pub use diff::DiffResults;
pub use error::{Error, ErrorCategory, Result};
pub use sync::{NoPrompt, SecretPrompt};
pub use types::{
    Environment, ExportSummary, PublicKeyInfo, RepoRef, SecretItem, SecretMeta, SecretValue,
    SourceChoice, SyncReport, UpsertOutcome, Variable,
};

use backend::Backend;
pub use backend::MockBackend;
use backend::github::GitHubBackend;
use chrono::{DateTime, Utc};
use seal::Sealer;
use std::path::Path;

/// High-level client bound to one repository.
///
/// # Example
///
/// ```no_run
/// use envkit::{Client, RepoRef, SourceChoice};
///
/// let client = Client::new("ghp_example", RepoRef::new("octo-org", "website"));
///
/// client.ensure_environment("preview").unwrap();
/// let vars = client.load_variables(&SourceChoice::Env("staging".into())).unwrap();
/// let report = client.sync_variables("preview", &vars);
/// println!("{} variable(s) processed", report.processed());
/// ```
pub struct Client {
    backend: Box<dyn Backend>,
    repo: RepoRef,
}

impl Client {
    /// Create a client with the GitHub backend against the public API.
    #[must_use]
    pub fn new(token: impl Into<String>, repo: RepoRef) -> Self {
        Self::with_backend(Box::new(GitHubBackend::new(token)), repo)
    }

    /// Create a client with a custom backend (useful for testing).
    #[must_use]
    pub fn with_backend(backend: Box<dyn Backend>, repo: RepoRef) -> Self {
        Self { backend, repo }
    }

    /// Repository this client operates on.
    #[must_use]
    pub fn repo(&self) -> &RepoRef {
        &self.repo
    }

    /// Underlying backend.
    #[must_use]
    pub fn backend(&self) -> &dyn Backend {
        self.backend.as_ref()
    }

    // =========================================================================
    // Read Operations
    // =========================================================================

    /// Compare two environments. See [`diff::compare_environments`].
    pub fn diff(&self, source_env: &str, compare_env: &str) -> Result<DiffResults> {
        diff::compare_environments(self.backend(), &self.repo, source_env, compare_env)
    }

    /// Export an environment to a file. See [`export::export_environment`].
    pub fn export(
        &self,
        env: &str,
        output: Option<&Path>,
        now: DateTime<Utc>,
    ) -> Result<ExportSummary> {
        export::export_environment(self.backend(), &self.repo, env, output, now)
    }

    /// Load variables from a source.
    pub fn load_variables(&self, source: &SourceChoice) -> Result<Vec<Variable>> {
        sync::load_variables(self.backend(), &self.repo, source)
    }

    /// Load secrets from a source.
    pub fn load_secrets(&self, source: &SourceChoice) -> Result<Vec<SecretItem>> {
        sync::load_secrets(self.backend(), &self.repo, source)
    }

    // =========================================================================
    // Write Operations
    // =========================================================================

    /// Get an environment, creating it first if needed.
    pub fn ensure_environment(&self, name: &str) -> Result<Environment> {
        sync::ensure_environment(self.backend(), &self.repo, name)
    }

    /// Fetch the public key of `target` for this run.
    pub fn prepare_sealer(&self, target: &str) -> Result<Sealer> {
        sync::prepare_sealer(self.backend(), &self.repo, target)
    }

    /// Create or update variables in `target`.
    pub fn sync_variables(&self, target: &str, items: &[Variable]) -> SyncReport {
        sync::sync_variables(self.backend(), &self.repo, target, items)
    }

    /// Seal and write secrets into `target`.
    pub fn sync_secrets(
        &self,
        target: &str,
        items: &[SecretItem],
        sealer: &Sealer,
        prompt: &dyn SecretPrompt,
    ) -> SyncReport {
        sync::sync_secrets(self.backend(), &self.repo, target, items, sealer, prompt)
    }
}
