//! Shared command context for the CLI
//!
//! Turns parsed arguments into settings, a repository, a GitHub client and
//! a commit cache.

use crate::cli::Args;
use relnotes::auth::get_github_auth;
use relnotes::cache::{CommitCache, FileCacheStore, MemoryCacheStore};
use relnotes::config::Settings;
use relnotes::error::{Error, Result};
use relnotes::github::{GitHubApi, GitHubService, parse_repo_info};
use relnotes::types::RepoConfig;
use std::path::Path;
use std::sync::Arc;
use tokio::process::Command;
use tracing::debug;

/// Everything a run needs, resolved from arguments and environment
pub struct CommandContext {
    /// Layered settings with CLI overrides applied
    pub settings: Settings,
    /// Target repository
    pub repo: RepoConfig,
    /// GitHub client
    pub api: Arc<dyn GitHubApi>,
    /// Commit cache (in-memory when caching is off)
    pub cache: CommitCache,
}

impl CommandContext {
    /// Build a context from `args`, reading settings relative to `cwd`
    pub async fn new(args: &Args, cwd: &Path) -> Result<Self> {
        let settings = settings_from_args(args, cwd)?;
        let repo = resolve_repo(args.repo.as_deref(), cwd).await?;
        let auth = get_github_auth(args.token.as_deref()).await?;
        debug!(repo = %repo, source = ?auth.source, "resolved repository and token");

        let service = match &settings.api_url {
            Some(url) => GitHubService::with_api_url(&auth.token, repo.clone(), url)?,
            None => GitHubService::new(&auth.token, repo.clone())?,
        };

        let filter = settings.filter();
        let cache = if settings.cache {
            CommitCache::new(FileCacheStore::new(&settings.cache_dir), &filter)
        } else {
            CommitCache::new(MemoryCacheStore::new(), &filter)
        };

        Ok(Self {
            settings,
            repo,
            api: Arc::new(service),
            cache,
        })
    }
}

/// Layer CLI flags over file settings and validate the result
pub fn settings_from_args(args: &Args, cwd: &Path) -> Result<Settings> {
    let mut settings = Settings::load(args.config.as_deref(), cwd)?;

    if let Some(label) = &args.label {
        settings.label.clone_from(label);
    }
    if let Some(branch) = &args.branch {
        settings.branch.clone_from(branch);
    }
    if let Some(concurrency) = args.concurrency {
        settings.concurrency = concurrency;
    }
    if let Some(dir) = &args.cache_dir {
        settings.cache_dir.clone_from(dir);
    }
    if args.no_cache {
        settings.cache = false;
    }
    if let Some(url) = &args.api_url {
        settings.api_url = Some(url.clone());
    }
    if settings.cache_dir.is_relative() {
        settings.cache_dir = cwd.join(&settings.cache_dir);
    }

    settings.validate()?;
    Ok(settings)
}

/// Repository from `--repo`/`GITHUB_REPOSITORY`, else the `origin` remote
async fn resolve_repo(explicit: Option<&str>, cwd: &Path) -> Result<RepoConfig> {
    if let Some(repo) = explicit.map(str::trim).filter(|r| !r.is_empty()) {
        return parse_repo_info(repo);
    }

    let output = Command::new("git")
        .args(["remote", "get-url", "origin"])
        .current_dir(cwd)
        .output()
        .await
        .map_err(|e| Error::Config(format!("failed to run git: {e}")))?;
    if !output.status.success() {
        return Err(Error::Config(
            "no repository given. Pass --repo owner/name or set GITHUB_REPOSITORY".to_string(),
        ));
    }

    let url = String::from_utf8_lossy(&output.stdout);
    parse_repo_info(url.trim())
}
