//! GitHub token discovery

use super::AuthSource;
use crate::error::{Error, Result};
use tokio::process::Command;
use tracing::debug;

/// Environment variables checked, in order
const TOKEN_ENV_VARS: [&str; 2] = ["GH_TOKEN", "GITHUB_TOKEN"];

/// Environment variable naming a GitHub Enterprise host
const HOST_ENV_VAR: &str = "GH_HOST";

/// Resolved GitHub credentials
#[derive(Debug, Clone)]
pub struct GitHubAuthConfig {
    /// API token
    pub token: String,
    /// Where the token came from
    pub source: AuthSource,
    /// Custom host (None for github.com)
    pub host: Option<String>,
}

fn token_from_env() -> Option<String> {
    TOKEN_ENV_VARS
        .iter()
        .filter_map(|var| std::env::var(var).ok())
        .map(|t| t.trim().to_string())
        .find(|t| !t.is_empty())
}

fn host_from_env() -> Option<String> {
    std::env::var(HOST_ENV_VAR)
        .ok()
        .map(|h| h.trim().to_string())
        .filter(|h| !h.is_empty() && h != "github.com")
}

async fn token_from_gh_cli(host: Option<&str>) -> Result<String> {
    let mut cmd = Command::new("gh");
    cmd.args(["auth", "token"]);
    if let Some(h) = host {
        cmd.args(["--hostname", h]);
    }

    let output = cmd
        .output()
        .await
        .map_err(|e| Error::Auth(format!("failed to run 'gh auth token': {e}")))?;

    if !output.status.success() {
        return Err(Error::Auth(format!(
            "'gh auth token' failed: {}",
            String::from_utf8_lossy(&output.stderr).trim()
        )));
    }

    let token = String::from_utf8_lossy(&output.stdout).trim().to_string();
    if token.is_empty() {
        return Err(Error::Auth("'gh auth token' returned no token".to_string()));
    }
    Ok(token)
}

/// Find a GitHub token: environment first, then the gh CLI
pub async fn get_github_auth() -> Result<GitHubAuthConfig> {
    let host = host_from_env();

    if let Some(token) = token_from_env() {
        debug!("using GitHub token from environment");
        return Ok(GitHubAuthConfig {
            token,
            source: AuthSource::EnvVar,
            host,
        });
    }

    let token = token_from_gh_cli(host.as_deref()).await?;
    debug!("using GitHub token from gh CLI");
    Ok(GitHubAuthConfig {
        token,
        source: AuthSource::Cli,
        host,
    })
}
