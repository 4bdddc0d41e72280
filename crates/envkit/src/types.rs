//! Core types for environment configuration.
//!
//! This module contains the data structures shared by the diff, sync and
//! export engines: repository references, environments, variables, secret
//! metadata, public keys and per-run result types.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

/// A repository on the hosting platform, written `owner/repo`.
///
/// # Example
///
/// ```
/// use envkit::RepoRef;
///
/// let repo: RepoRef = "octo-org/website".parse().unwrap();
/// assert_eq!(repo.owner, "octo-org");
/// assert_eq!(repo.repo, "website");
/// assert_eq!(repo.to_string(), "octo-org/website");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RepoRef {
    /// Owning user or organization.
    pub owner: String,
    /// Repository name.
    pub repo: String,
}

impl RepoRef {
    /// Create a new repository reference.
    #[must_use]
    pub fn new(owner: impl Into<String>, repo: impl Into<String>) -> Self {
        Self {
            owner: owner.into(),
            repo: repo.into(),
        }
    }
}

impl FromStr for RepoRef {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        match s.split_once('/') {
            Some((owner, repo))
                if !owner.is_empty() && !repo.is_empty() && !repo.contains('/') =>
            {
                Ok(Self::new(owner, repo))
            }
            _ => Err(Error::InvalidInput(format!(
                "'{s}' is not a repository, please use owner/repo format"
            ))),
        }
    }
}

impl fmt::Display for RepoRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner, self.repo)
    }
}

/// A deployment environment of a repository.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Environment {
    /// Platform identifier.
    pub id: u64,
    /// Environment name.
    pub name: String,
    /// Web URL, when the API reports one.
    #[serde(default)]
    pub html_url: Option<String>,
    /// Creation timestamp (ISO 8601).
    #[serde(default)]
    pub created_at: Option<String>,
    /// Last update timestamp (ISO 8601).
    #[serde(default)]
    pub updated_at: Option<String>,
}

/// A named plaintext configuration value.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Variable {
    /// Variable name, unique within an environment.
    pub name: String,
    /// Plaintext value.
    pub value: String,
}

impl Variable {
    /// Create a new variable.
    #[must_use]
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// Metadata of a secret. The platform never returns secret values.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SecretMeta {
    /// Secret name.
    pub name: String,
    /// Creation timestamp (ISO 8601).
    #[serde(default)]
    pub created_at: Option<String>,
    /// Last update timestamp (ISO 8601).
    #[serde(default)]
    pub updated_at: Option<String>,
}

impl SecretMeta {
    /// Create secret metadata with just a name.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            created_at: None,
            updated_at: None,
        }
    }
}

/// A plaintext secret value held only in memory.
///
/// `Debug` is redacted so values cannot leak through logging.
#[derive(Clone, PartialEq, Eq)]
pub struct SecretValue(String);

impl SecretValue {
    /// Wrap a plaintext value.
    #[must_use]
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Borrow the plaintext. Only the sealer should need this.
    #[must_use]
    pub fn expose(&self) -> &str {
        &self.0
    }

    /// Whether the value is the empty string.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for SecretValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SecretValue([redacted])")
    }
}

/// A secret queued for writing. `value` is `None` when only the name is known.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SecretItem {
    /// Secret name.
    pub name: String,
    /// Known plaintext value, if any.
    pub value: Option<SecretValue>,
}

impl SecretItem {
    /// A secret whose value is already known (file import).
    #[must_use]
    pub fn with_value(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: Some(SecretValue::new(value)),
        }
    }

    /// A secret known only by name (copied from another environment).
    #[must_use]
    pub fn name_only(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: None,
        }
    }
}

/// Public key of an environment, used to seal secret values.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublicKeyInfo {
    /// Base64 encoded curve25519 public key.
    pub key: String,
    /// Identifier to send back along with sealed values.
    pub key_id: String,
}

/// Where the items of a write operation come from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceChoice {
    /// Copy from another environment of the same repository.
    Env(String),
    /// Import from a local dotenv file.
    File(PathBuf),
    /// Do not process this kind of item.
    Skip,
}

impl SourceChoice {
    /// Whether this choice skips processing.
    #[must_use]
    pub fn is_skip(&self) -> bool {
        matches!(self, Self::Skip)
    }
}

impl fmt::Display for SourceChoice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Env(name) => write!(f, "environment '{name}'"),
            Self::File(path) => write!(f, "file '{}'", path.display()),
            Self::Skip => write!(f, "skip"),
        }
    }
}

/// Outcome of a single create-or-update call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    /// The item did not exist and was created.
    Created,
    /// The item existed and was updated.
    Updated,
}

/// Result of writing one batch of items into an environment.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncReport {
    /// Names of items created.
    pub created: Vec<String>,
    /// Names of items updated.
    pub updated: Vec<String>,
    /// Names of items skipped because no value was supplied.
    pub skipped: Vec<String>,
    /// Names of items that failed, with the error message.
    pub failed: Vec<(String, String)>,
}

impl SyncReport {
    /// Number of items written (created or updated).
    #[must_use]
    pub fn processed(&self) -> usize {
        self.created.len() + self.updated.len()
    }

    /// Whether any item failed.
    #[must_use]
    pub fn has_failures(&self) -> bool {
        !self.failed.is_empty()
    }

    /// Record an upsert outcome.
    pub fn record(&mut self, name: &str, outcome: UpsertOutcome) {
        match outcome {
            UpsertOutcome::Created => self.created.push(name.to_string()),
            UpsertOutcome::Updated => self.updated.push(name.to_string()),
        }
    }
}

/// Result of an export.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportSummary {
    /// File written.
    pub path: PathBuf,
    /// Number of variables exported with values.
    pub variable_count: usize,
    /// Number of secret names exported as placeholders.
    pub secret_count: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_repo_ref_parse() {
        let repo: RepoRef = "owner/repo".parse().unwrap();
        assert_eq!(repo, RepoRef::new("owner", "repo"));

        let trimmed: RepoRef = "  owner/repo \n".parse().unwrap();
        assert_eq!(trimmed.to_string(), "owner/repo");
    }

    #[test]
    fn test_repo_ref_rejects_bad_shapes() {
        for input in ["", "owner", "owner/", "/repo", "a/b/c"] {
            let err = input.parse::<RepoRef>().unwrap_err();
            assert!(matches!(err, Error::InvalidInput(_)), "accepted {input:?}");
        }
    }

    #[test]
    fn test_secret_value_debug_is_redacted() {
        let value = SecretValue::new("hunter2");
        let debug = format!("{value:?}");
        assert!(!debug.contains("hunter2"));

        let item = SecretItem::with_value("TOKEN", "hunter2");
        assert!(!format!("{item:?}").contains("hunter2"));
    }

    #[test]
    fn test_source_choice_display() {
        assert_eq!(SourceChoice::Env("prod".into()).to_string(), "environment 'prod'");
        assert_eq!(
            SourceChoice::File(PathBuf::from("vars.env")).to_string(),
            "file 'vars.env'"
        );
        assert!(SourceChoice::Skip.is_skip());
    }

    #[test]
    fn test_sync_report_counts() {
        let mut report = SyncReport::default();
        report.record("A", UpsertOutcome::Created);
        report.record("B", UpsertOutcome::Updated);
        report.failed.push(("C".into(), "boom".into()));

        assert_eq!(report.processed(), 2);
        assert!(report.has_failures());
    }

    #[test]
    fn test_environment_deserialize_minimal() {
        let env: Environment = serde_json::from_str(r#"{"id": 7, "name": "staging"}"#).unwrap();
        assert_eq!(env.id, 7);
        assert!(env.html_url.is_none());
    }
}
