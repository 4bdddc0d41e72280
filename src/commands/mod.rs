pub mod diff;
pub mod export;
pub mod interactive;
pub mod sync;
pub mod token;

use anyhow::Result;
use envkit::RepoRef;

use crate::Context;
use crate::prompt::{self, Prompter};
use crate::ui;

/// The repository from settings, or asked for when none is configured.
///
/// An invalid configured repository is reported and gives `None`.
pub fn resolve_repo(ctx: &Context, p: &dyn Prompter) -> Result<Option<RepoRef>> {
    match ctx.settings.repo_ref() {
        Some(Ok(repo)) => {
            log::debug!("using repository {repo}");
            Ok(Some(repo))
        }
        Some(Err(err)) => {
            ui::warn(&format!("{err:#}"));
            Ok(None)
        }
        None => prompt::ask_repo(p),
    }
}

#[cfg(test)]
pub mod testing {
    use envkit::{Client, MockBackend, PublicKeyInfo, RepoRef};

    /// A valid Curve25519 public key, base64.
    pub const TEST_PUBLIC_KEY: &str = "CQAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAA=";

    /// A client sharing state with `mock`.
    pub fn client(mock: &MockBackend) -> Client {
        Client::with_backend(Box::new(mock.clone()), RepoRef::new("octo", "site"))
    }

    /// A mock with `env` created and holding a public key.
    pub fn keyed_mock(env: &str) -> MockBackend {
        let mock = MockBackend::new();
        mock.add_environment(env);
        mock.set_public_key(
            env,
            PublicKeyInfo {
                key: TEST_PUBLIC_KEY.to_string(),
                key_id: "test-key".to_string(),
            },
        );
        mock
    }
}
