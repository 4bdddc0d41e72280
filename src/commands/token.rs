use anyhow::{Context as _, Result, bail};
use std::fs::OpenOptions;
use std::io::Write;
use std::path::Path;

use crate::prompt::Prompter;
use crate::ui;

const ENV_TEMPLATE: &str = "GITHUB_TOKEN=your_github_pat_here\n";

const GUIDE: &str = "\
Creating a GitHub Personal Access Token (PAT) for ghenv

ghenv needs a personal access token to talk to the GitHub API.

1.  Open https://github.com/settings/tokens?type=beta

2.  Generate a new token:
    - Give it a descriptive name, e.g. \"ghenv-token\", and an expiration.
    - Classic tokens: select the `repo` scope. Add `admin:org` only if you
      hit permission errors on organization-owned repositories.
    - Fine-grained tokens: pick \"Only select repositories\", choose the
      repository, then grant these repository permissions:
        Actions:        Read and Write
        Administration: Read and Write (Read-only if environments exist)
        Secrets:        Read and Write
        Variables:      Read and Write
        Environments:   Read and Write

3.  Click \"Generate token\" and copy it right away. GitHub shows it once.

4.  Put it in a .env file in the directory you run ghenv from:

        GITHUB_TOKEN=your_github_pat_here

    or export GITHUB_TOKEN in your shell.

5.  Make sure .env is listed in your .gitignore so the token is never
    committed.

6.  Run ghenv again.
";

/// Offer the token guide when no token is configured.
///
/// Declining is an error; accepting prints the guide and optionally creates
/// a `.env` template in `dir`.
pub fn offer_guide(p: &dyn Prompter, dir: &Path) -> Result<()> {
    let wants_guide = p.confirm(
        "GITHUB_TOKEN is not set. Would you like guidance on creating one?",
        true,
    )?;
    if !wants_guide {
        bail!(
            "GITHUB_TOKEN is required to interact with the GitHub API. \
             Set it in your environment or a .env file"
        );
    }

    ui::header("Creating a GitHub token");
    println!("{GUIDE}");

    let env_path = dir.join(".env");
    if env_path.exists() {
        ui::info(&format!(
            "An .env file already exists at {}. Make sure GITHUB_TOKEN is set there.",
            env_path.display()
        ));
    } else if p.confirm(
        "No .env file found. Create one with a GITHUB_TOKEN placeholder? \
         (You'll still need to paste the token value manually)",
        true,
    )? {
        create_env_template(&env_path)?;
        ui::success(&format!(
            ".env file created at {}. Open it and paste your GitHub token.",
            env_path.display()
        ));
    }

    ui::info("Update your .env file with GITHUB_TOKEN and run ghenv again.");
    Ok(())
}

/// Write the `.env` template. Never overwrites an existing file.
pub fn create_env_template(path: &Path) -> Result<()> {
    let mut file = OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(path)
        .with_context(|| format!("Could not create {}", path.display()))?;
    file.write_all(ENV_TEMPLATE.as_bytes())
        .with_context(|| format!("Could not write {}", path.display()))?;
    Ok(())
}
