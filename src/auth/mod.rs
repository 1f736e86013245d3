//! GitHub authentication
//!
//! Resolves a token from an explicit value, the environment, or the `gh`
//! CLI, in that order.

use crate::error::{Error, Result};
use tokio::process::Command;
use tracing::debug;

/// Environment variables checked for a token, in order
pub const TOKEN_ENV_VARS: [&str; 2] = ["GITHUB_TOKEN", "GH_TOKEN"];

/// Source of authentication token
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthSource {
    /// Passed on the command line
    Flag,
    /// Token from environment variable
    EnvVar,
    /// Token from `gh auth token`
    Cli,
}

/// A resolved GitHub token
#[derive(Clone)]
pub struct GitHubAuthConfig {
    /// The token itself
    pub token: String,
    /// Where it came from
    pub source: AuthSource,
}

impl std::fmt::Debug for GitHubAuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GitHubAuthConfig")
            .field("token", &"<redacted>")
            .field("source", &self.source)
            .finish()
    }
}

/// Pick the first non-empty token from `explicit` or the environment.
///
/// `lookup` reads an environment variable; it is injected so the order can
/// be tested without touching the process environment.
pub fn token_from_sources(
    explicit: Option<&str>,
    lookup: impl Fn(&str) -> Option<String>,
) -> Option<GitHubAuthConfig> {
    if let Some(token) = explicit.map(str::trim).filter(|t| !t.is_empty()) {
        return Some(GitHubAuthConfig {
            token: token.to_string(),
            source: AuthSource::Flag,
        });
    }

    TOKEN_ENV_VARS.into_iter().find_map(|name| {
        let token = lookup(name)?;
        let token = token.trim();
        (!token.is_empty()).then(|| {
            debug!(var = name, "using token from environment");
            GitHubAuthConfig {
                token: token.to_string(),
                source: AuthSource::EnvVar,
            }
        })
    })
}

/// Resolve a GitHub token.
///
/// Falls back to `gh auth token` when neither a flag nor an environment
/// variable provides one. A missing token is a configuration error.
pub async fn get_github_auth(explicit: Option<&str>) -> Result<GitHubAuthConfig> {
    if let Some(auth) = token_from_sources(explicit, |name| std::env::var(name).ok()) {
        return Ok(auth);
    }

    if let Some(token) = gh_cli_token().await {
        debug!("using token from gh CLI");
        return Ok(GitHubAuthConfig {
            token,
            source: AuthSource::Cli,
        });
    }

    Err(Error::Config(
        "no GitHub token found. Pass --token, set GITHUB_TOKEN or GH_TOKEN, or run 'gh auth login'"
            .to_string(),
    ))
}

async fn gh_cli_token() -> Option<String> {
    let output = Command::new("gh")
        .args(["auth", "token"])
        .output()
        .await
        .ok()?;
    if !output.status.success() {
        return None;
    }
    let token = String::from_utf8(output.stdout).ok()?;
    let token = token.trim();
    (!token.is_empty()).then(|| token.to_string())
}
