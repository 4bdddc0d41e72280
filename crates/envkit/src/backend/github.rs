//! GitHub REST backend.
//!
//! This module provides the [`GitHubBackend`] implementation of [`Backend`]
//! on top of the GitHub Actions environment endpoints:
//!
//! - `GET/PUT  /repos/{owner}/{repo}/environments/{env}`
//! - `GET      .../environments/{env}/secrets/public-key`
//! - `GET/POST .../environments/{env}/variables`, `PATCH .../variables/{name}`
//! - `GET      .../environments/{env}/secrets`, `PUT .../secrets/{name}`
//!
//! # Authentication
//!
//! The token is passed explicitly to the constructor. It needs the `repo`
//! scope (classic tokens) or read/write on Environments, Secrets and
//! Variables (fine-grained tokens).

use crate::backend::Backend;
use crate::error::{Error, Result};
use crate::types::{Environment, PublicKeyInfo, RepoRef, SecretMeta, Variable};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use ureq::http::Response;
use url::Url;

/// Default public API endpoint.
pub const DEFAULT_API_BASE: &str = "https://api.github.com";

const DEFAULT_USER_AGENT: &str = concat!("ghenv/", env!("CARGO_PKG_VERSION"));
const API_VERSION: &str = "2022-11-28";

/// The variables endpoint caps pages at 30 items.
const VARIABLES_PER_PAGE: usize = 30;
const SECRETS_PER_PAGE: usize = 100;
/// Upper bound on pages fetched for a single listing.
const MAX_PAGES: usize = 1000;

/// GitHub environments backend.
///
/// # Example
///
/// ```no_run
/// use envkit::backend::Backend;
/// use envkit::backend::github::GitHubBackend;
/// use envkit::RepoRef;
///
/// let backend = GitHubBackend::new("ghp_example");
/// let repo = RepoRef::new("octo-org", "website");
/// let vars = backend.list_variables(&repo, "staging").unwrap();
/// println!("Found {} variables", vars.len());
/// ```
pub struct GitHubBackend {
    /// HTTP agent for requests.
    agent: ureq::Agent,
    /// GitHub API base URL.
    api_base: String,
    /// Bearer token.
    token: String,
    /// User-Agent header value.
    user_agent: String,
}

impl GitHubBackend {
    /// Create a backend against the public GitHub API.
    #[must_use]
    pub fn new(token: impl Into<String>) -> Self {
        Self::with_api_base(token, DEFAULT_API_BASE)
    }

    /// Create a backend with a custom API base (GitHub Enterprise, tests).
    #[must_use]
    pub fn with_api_base(token: impl Into<String>, api_base: impl Into<String>) -> Self {
        // Error statuses are read as responses so their JSON body survives.
        let config = ureq::Agent::config_builder()
            .http_status_as_error(false)
            .build();
        Self {
            agent: ureq::Agent::new_with_config(config),
            api_base: api_base.into(),
            token: token.into(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }

    /// Override the User-Agent header.
    #[must_use]
    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Get the current API base URL.
    #[must_use]
    pub fn api_base(&self) -> &str {
        &self.api_base
    }

    /// Build `{base}/repos/{owner}/{repo}/environments/{env}/{tail..}`.
    ///
    /// Every segment is percent-encoded, so names with spaces or slashes
    /// stay a single path segment.
    fn env_url(&self, repo: &RepoRef, env: &str, tail: &[&str]) -> Result<Url> {
        let mut url = Url::parse(&self.api_base)
            .map_err(|e| Error::InvalidInput(format!("invalid API URL '{}': {e}", self.api_base)))?;
        url.path_segments_mut()
            .map_err(|()| Error::InvalidInput(format!("invalid API URL '{}'", self.api_base)))?
            .pop_if_empty()
            .extend([
                "repos",
                repo.owner.as_str(),
                repo.repo.as_str(),
                "environments",
                env,
            ])
            .extend(tail);
        Ok(url)
    }

    fn authorize<B>(&self, request: ureq::RequestBuilder<B>) -> ureq::RequestBuilder<B> {
        request
            .header("Accept", "application/vnd.github+json")
            .header("Authorization", format!("Bearer {}", self.token))
            .header("X-GitHub-Api-Version", API_VERSION)
            .header("User-Agent", self.user_agent.as_str())
    }

    fn get_json<T: DeserializeOwned>(&self, url: &Url, what: &str) -> Result<T> {
        log::debug!("GET {url}");
        let response = self.authorize(self.agent.get(url.as_str())).call()?;
        let mut response = check(response, what)?;
        Ok(response.body_mut().read_json()?)
    }

    /// Fetch every page of a listing endpoint.
    fn paginate<P, T>(
        &self,
        base: &Url,
        per_page: usize,
        what: &str,
        split: impl Fn(P) -> (usize, Vec<T>),
    ) -> Result<Vec<T>>
    where
        P: DeserializeOwned,
    {
        let mut items = Vec::new();
        for page in 1..=MAX_PAGES {
            let mut url = base.clone();
            url.query_pairs_mut()
                .append_pair("per_page", &per_page.to_string())
                .append_pair("page", &page.to_string());

            let (total, batch) = split(self.get_json(&url, what)?);
            let done = batch.is_empty();
            items.extend(batch);
            if done || items.len() >= total {
                break;
            }
        }
        Ok(items)
    }
}

/// Turn a non-success response into an [`Error`].
fn check(mut response: Response<ureq::Body>, what: &str) -> Result<Response<ureq::Body>> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    if status.as_u16() == 404 {
        return Err(Error::not_found(what));
    }
    let body = response.body_mut().read_to_string().unwrap_or_default();
    Err(api_error(status.as_u16(), &body, what))
}

/// Build an API error from a status and the raw error body.
fn api_error(status: u16, body: &str, what: &str) -> Error {
    let payload = serde_json::from_str::<serde_json::Value>(body).ok();
    let message = payload
        .as_ref()
        .and_then(|p| p.get("message"))
        .and_then(serde_json::Value::as_str)
        .map_or_else(|| format!("HTTP {status} for {what}"), |m| format!("{m} ({what})"));
    Error::Api {
        status,
        message,
        payload,
    }
}

impl Backend for GitHubBackend {
    fn get_environment(&self, repo: &RepoRef, env: &str) -> Result<Option<Environment>> {
        let url = self.env_url(repo, env, &[])?;
        match self.get_json(&url, &format!("environment '{env}'")) {
            Ok(environment) => Ok(Some(environment)),
            Err(err) if err.is_not_found() => Ok(None),
            Err(err) => Err(err),
        }
    }

    fn create_environment(&self, repo: &RepoRef, env: &str) -> Result<()> {
        let url = self.env_url(repo, env, &[])?;
        log::debug!("PUT {url}");
        let response = self
            .authorize(self.agent.put(url.as_str()))
            .send_json(serde_json::json!({}))?;
        check(response, &format!("environment '{env}'"))?;
        Ok(())
    }

    fn get_public_key(&self, repo: &RepoRef, env: &str) -> Result<PublicKeyInfo> {
        let url = self.env_url(repo, env, &["secrets", "public-key"])?;
        self.get_json(&url, &format!("public key of environment '{env}'"))
    }

    fn list_variables(&self, repo: &RepoRef, env: &str) -> Result<Vec<Variable>> {
        let url = self.env_url(repo, env, &["variables"])?;
        self.paginate(
            &url,
            VARIABLES_PER_PAGE,
            &format!("variables of environment '{env}'"),
            |page: VariablesPage| (page.total_count, page.variables),
        )
    }

    fn list_secret_names(&self, repo: &RepoRef, env: &str) -> Result<Vec<SecretMeta>> {
        let url = self.env_url(repo, env, &["secrets"])?;
        self.paginate(
            &url,
            SECRETS_PER_PAGE,
            &format!("secrets of environment '{env}'"),
            |page: SecretsPage| (page.total_count, page.secrets),
        )
    }

    fn create_variable(&self, repo: &RepoRef, env: &str, variable: &Variable) -> Result<()> {
        let url = self.env_url(repo, env, &["variables"])?;
        log::debug!("POST {url} ({})", variable.name);
        let response = self.authorize(self.agent.post(url.as_str())).send_json(variable)?;
        check(response, &format!("variable '{}'", variable.name))?;
        Ok(())
    }

    fn update_variable(&self, repo: &RepoRef, env: &str, variable: &Variable) -> Result<()> {
        let url = self.env_url(repo, env, &["variables", &variable.name])?;
        log::debug!("PATCH {url}");
        let response = self
            .authorize(self.agent.patch(url.as_str()))
            .send_json(variable)?;
        check(response, &format!("variable '{}'", variable.name))?;
        Ok(())
    }

    fn create_or_update_secret(
        &self,
        repo: &RepoRef,
        env: &str,
        name: &str,
        encrypted_value: &str,
        key_id: &str,
    ) -> Result<()> {
        let url = self.env_url(repo, env, &["secrets", name])?;
        log::debug!("PUT {url}");
        let body = SecretBody {
            encrypted_value,
            key_id,
        };
        let response = self.authorize(self.agent.put(url.as_str())).send_json(&body)?;
        check(response, &format!("secret '{name}'"))?;
        Ok(())
    }
}

// =============================================================================
// GitHub API payloads
// =============================================================================

#[derive(Debug, Deserialize)]
struct VariablesPage {
    total_count: usize,
    variables: Vec<Variable>,
}

#[derive(Debug, Deserialize)]
struct SecretsPage {
    total_count: usize,
    secrets: Vec<SecretMeta>,
}

#[derive(Debug, serde::Serialize)]
struct SecretBody<'a> {
    encrypted_value: &'a str,
    key_id: &'a str,
}
