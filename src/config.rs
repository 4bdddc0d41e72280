use anyhow::{Context, Result, bail};
use envkit::backend::github::{DEFAULT_API_BASE, GitHubBackend};
use envkit::{Client, RepoRef};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Get the config directory path
pub fn config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir().context("Could not determine home directory")?;
    Ok(home.join(".config").join("ghenv"))
}

// ============================================================================
// Config File
// ============================================================================

/// Optional `~/.config/ghenv/config.toml`.
///
/// There is no token field. The token only comes from the command line,
/// the environment or a `.env` file.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileConfig {
    /// Default repository, `owner/repo`
    pub repo: Option<String>,
    /// API base URL
    pub api_url: Option<String>,
    /// User-Agent header override
    pub user_agent: Option<String>,
}

impl FileConfig {
    /// Load the config file from its default location
    pub fn load() -> Result<Self> {
        Self::load_from(&config_dir()?.join("config.toml"))
    }

    /// Load a config file, returning defaults if it does not exist
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = fs::read_to_string(path)
            .with_context(|| format!("Could not read {}", path.display()))?;
        toml::from_str(&content).with_context(|| format!("Invalid config in {}", path.display()))
    }
}

// ============================================================================
// Resolved Settings
// ============================================================================

/// Settings after merging flags/environment with the config file.
///
/// No `Debug` impl, so the token cannot end up in log output.
#[derive(Clone, PartialEq, Eq)]
pub struct Settings {
    pub token: Option<String>,
    pub repo: Option<String>,
    pub api_url: String,
    pub user_agent: Option<String>,
}

impl Settings {
    /// Merge values from the command line (which already includes the
    /// environment and `.env`) over the config file.
    pub fn resolve(
        repo: Option<String>,
        token: Option<String>,
        api_url: Option<String>,
        file: FileConfig,
    ) -> Self {
        let non_empty = |v: Option<String>| v.filter(|s| !s.trim().is_empty());
        Self {
            token: non_empty(token),
            repo: non_empty(repo).or(non_empty(file.repo)),
            api_url: non_empty(api_url)
                .or(non_empty(file.api_url))
                .unwrap_or_else(|| DEFAULT_API_BASE.to_string()),
            user_agent: non_empty(file.user_agent),
        }
    }

    pub fn has_token(&self) -> bool {
        self.token.is_some()
    }

    /// Parse the configured repository, if any.
    pub fn repo_ref(&self) -> Option<Result<RepoRef>> {
        self.repo
            .as_deref()
            .map(|r| r.parse::<RepoRef>().map_err(Into::into))
    }

    /// Build a client for `repo` against the configured API.
    pub fn client(&self, repo: RepoRef) -> Result<Client> {
        let Some(token) = &self.token else {
            bail!(
                "No GitHub token configured. Set GITHUB_TOKEN in the environment or a .env file, \
                 or pass --token"
            );
        };
        let mut backend = GitHubBackend::with_api_base(token.clone(), self.api_url.clone());
        if let Some(user_agent) = &self.user_agent {
            backend = backend.user_agent(user_agent.clone());
        }
        log::debug!("using API at {}", backend.api_base());
        Ok(Client::with_backend(Box::new(backend), repo))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn file(repo: &str, api_url: &str) -> FileConfig {
        FileConfig {
            repo: Some(repo.to_string()),
            api_url: Some(api_url.to_string()),
            user_agent: None,
        }
    }

    #[test]
    fn test_flags_override_file() {
        let settings = Settings::resolve(
            Some("cli/repo".into()),
            Some("tok".into()),
            Some("https://cli.example.com".into()),
            file("file/repo", "https://file.example.com"),
        );
        assert_eq!(settings.repo.as_deref(), Some("cli/repo"));
        assert_eq!(settings.api_url, "https://cli.example.com");
        assert!(settings.has_token());
    }

    #[test]
    fn test_file_fills_gaps() {
        let settings =
            Settings::resolve(None, None, None, file("file/repo", "https://file.example.com"));
        assert_eq!(settings.repo.as_deref(), Some("file/repo"));
        assert_eq!(settings.api_url, "https://file.example.com");
        assert!(!settings.has_token());
    }

    #[test]
    fn test_defaults() {
        let settings = Settings::resolve(None, Some("  ".into()), None, FileConfig::default());
        assert_eq!(settings.api_url, DEFAULT_API_BASE);
        assert!(settings.repo.is_none());
        assert!(!settings.has_token());
    }

    #[test]
    fn test_repo_ref() {
        let settings =
            Settings::resolve(Some("octo/site".into()), None, None, FileConfig::default());
        assert_eq!(settings.repo_ref().unwrap().unwrap(), RepoRef::new("octo", "site"));

        let bad = Settings::resolve(Some("nope".into()), None, None, FileConfig::default());
        assert!(bad.repo_ref().unwrap().is_err());
    }

    #[test]
    fn test_client_requires_token() {
        let settings = Settings::resolve(None, None, None, FileConfig::default());
        let err = settings.client(RepoRef::new("o", "r")).err().unwrap();
        assert!(err.to_string().contains("No GitHub token"));
    }

    #[test]
    fn test_load_missing_file_is_default() {
        let dir = TempDir::new().unwrap();
        let config = FileConfig::load_from(&dir.path().join("config.toml")).unwrap();
        assert_eq!(config, FileConfig::default());
    }

    #[test]
    fn test_load_file_ignores_token() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(
            &path,
            "repo = \"octo/site\"\nuser_agent = \"ci-bot\"\ntoken = \"ghp_should_not_be_used\"\n",
        )
        .unwrap();

        let config = FileConfig::load_from(&path).unwrap();
        assert_eq!(config.repo.as_deref(), Some("octo/site"));
        assert_eq!(config.user_agent.as_deref(), Some("ci-bot"));

        let settings = Settings::resolve(None, None, None, config);
        assert!(!settings.has_token());
    }

    #[test]
    fn test_load_invalid_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "repo = [").unwrap();
        assert!(FileConfig::load_from(&path).is_err());
    }
}
