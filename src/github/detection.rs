//! Repository identifier parsing

use crate::error::{Error, Result};
use crate::types::RepoConfig;
use regex::Regex;
use std::sync::LazyLock;

static SHORTHAND: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?P<owner>[A-Za-z0-9_.-]+)/(?P<repo>[A-Za-z0-9_.-]+)$").expect("valid regex")
});

static HTTPS_URL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:https?|ssh)://(?:[^@/]+@)?(?P<host>[^/:]+)(?::\d+)?/(?P<owner>[^/]+)/(?P<repo>[^/]+?)(?:\.git)?/*$")
        .expect("valid regex")
});

static SCP_URL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:[^@]+@)?(?P<host>[^:/]+):(?P<owner>[^/]+)/(?P<repo>[^/]+?)(?:\.git)?/*$")
        .expect("valid regex")
});

/// Parse `owner/repo`, a GitHub web URL, or a git remote URL.
///
/// `github.com` maps to `host: None`; any other host is treated as GitHub
/// Enterprise.
pub fn parse_repo_info(input: &str) -> Result<RepoConfig> {
    let input = input.trim();

    if let Some(caps) = SHORTHAND.captures(input) {
        return Ok(RepoConfig {
            owner: caps["owner"].to_string(),
            repo: caps["repo"].trim_end_matches(".git").to_string(),
            host: None,
        });
    }

    let caps = HTTPS_URL
        .captures(input)
        .or_else(|| SCP_URL.captures(input))
        .ok_or_else(|| Error::InvalidRepo(input.to_string()))?;

    let host = &caps["host"];
    let repo = caps["repo"].to_string();
    if repo.is_empty() {
        return Err(Error::InvalidRepo(input.to_string()));
    }

    Ok(RepoConfig {
        owner: caps["owner"].to_string(),
        repo,
        host: (host != "github.com" && host != "www.github.com").then(|| host.to_string()),
    })
}
