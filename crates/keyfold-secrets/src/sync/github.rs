//! GitHub CLI remote store
//!
//! Uses `gh secret list` / `gh secret set`. Requires the GitHub CLI to be
//! installed and authenticated. Secret values are written to `gh` through
//! stdin so they never show up in process listings.
//!
//! See: https://cli.github.com/manual/gh_secret

use std::io::Write;
use std::path::PathBuf;
use std::process::{Command, Stdio};

use serde::Deserialize;

use crate::error::SecretError;
use crate::process::{find_in_path, run_captured};

use super::{RemoteStore, Scope};

/// A repository's secrets, managed through `gh`
#[derive(Debug, Clone)]
pub struct GhCli {
    binary: PathBuf,
    repo: String,
}

#[derive(Debug, Deserialize)]
struct ListedSecret {
    name: String,
}

impl GhCli {
    pub fn new(binary: impl Into<PathBuf>, repo: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
            repo: repo.into(),
        }
    }

    /// Find `gh` on `PATH`
    pub fn locate(repo: impl Into<String>) -> Result<Self, SecretError> {
        let binary = find_in_path("gh").ok_or_else(|| SecretError::CommandNotFound {
            program: "GitHub CLI (gh)".to_string(),
            hint: "please install and authenticate with GitHub CLI".to_string(),
        })?;
        Ok(Self::new(binary, repo))
    }

    pub fn repo(&self) -> &str {
        &self.repo
    }

    /// Fail unless `gh auth status` succeeds
    pub fn check_auth(&self) -> Result<(), SecretError> {
        run_captured(&self.binary, &["auth", "status"], "check authentication").map_err(|_| {
            SecretError::command(
                "gh",
                "check authentication",
                "GitHub CLI not authenticated - run 'gh auth login' first",
            )
        })?;
        Ok(())
    }

    fn list_args(&self, scope: Scope) -> Vec<&str> {
        let mut args = vec!["secret", "list"];
        if scope == Scope::Dependabot {
            args.extend(["--app", "dependabot"]);
        }
        args.extend(["--repo", self.repo.as_str(), "--json", "name"]);
        args
    }

    fn set_args<'a>(&'a self, key: &'a str, scope: Scope) -> Vec<&'a str> {
        let mut args = vec!["secret", "set", key];
        if scope == Scope::Dependabot {
            args.extend(["--app", "dependabot"]);
        }
        args.extend(["--repo", self.repo.as_str()]);
        args
    }
}

/// Parse `gh secret list --json name` output
pub fn parse_secret_list(stdout: &[u8]) -> Result<Vec<String>, SecretError> {
    let listed: Vec<ListedSecret> =
        serde_json::from_slice(stdout).map_err(|e| SecretError::InvalidOutput {
            program: "gh".to_string(),
            message: e.to_string(),
        })?;
    Ok(listed.into_iter().map(|s| s.name).collect())
}

impl RemoteStore for GhCli {
    fn list(&self, scope: Scope) -> Result<Vec<String>, SecretError> {
        let action = format!("list {} secrets", scope);
        let output = run_captured(&self.binary, &self.list_args(scope), &action)?;
        parse_secret_list(&output.stdout)
    }

    fn set(&self, key: &str, value: &str, scope: Scope) -> Result<(), SecretError> {
        tracing::debug!("Executing: gh {} <redacted>", self.set_args(key, scope).join(" "));

        let mut child = Command::new(&self.binary)
            .args(self.set_args(key, scope))
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| SecretError::remote(key, scope, e.to_string()))?;

        if let Some(mut stdin) = child.stdin.take() {
            stdin
                .write_all(value.as_bytes())
                .map_err(|e| SecretError::remote(key, scope, e.to_string()))?;
        }

        let output = child
            .wait_with_output()
            .map_err(|e| SecretError::remote(key, scope, e.to_string()))?;

        if !output.status.success() {
            tracing::debug!(
                key,
                %scope,
                stderr = %String::from_utf8_lossy(&output.stderr).trim(),
                "gh secret set failed"
            );
            return Err(SecretError::remote(key, scope, output.status.to_string()));
        }

        tracing::info!(key, %scope, "Set secret");
        Ok(())
    }

    fn describe_set(&self, key: &str, scope: Scope) -> String {
        format!("gh {} < <redacted>", self.set_args(key, scope).join(" "))
    }
}
