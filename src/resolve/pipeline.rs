//! Resolution orchestration - effectful
//!
//! Turns a commit range into the qualifying pull requests for it, fetching
//! uncached commits concurrently through the rate limiter.

use crate::cache::{CacheEntry, partition};
use crate::error::{Error, Result};
use crate::github::{COMMITS_PER_PAGE, GitHubApi};
use crate::resolve::ResolutionResult;
use crate::resolve::fold::ResolutionBuilder;
use crate::throttle::{
    BackoffPolicy, DEFAULT_CONCURRENCY, RateLimiter, wait_out_rate_limits,
};
use crate::types::{CommitRange, CommitRef, QualifyingFilter};
use std::sync::Arc;
use tokio::task::JoinSet;
use tracing::{debug, error, info};

/// Resolves commit ranges into pull requests
pub struct Resolver {
    api: Arc<dyn GitHubApi>,
    backoff: BackoffPolicy,
    concurrency: usize,
}

impl Resolver {
    /// Resolver with default backoff and concurrency
    pub fn new(api: Arc<dyn GitHubApi>) -> Self {
        Self {
            api,
            backoff: BackoffPolicy::default(),
            concurrency: DEFAULT_CONCURRENCY,
        }
    }

    /// Use a different retry schedule
    #[must_use]
    pub const fn with_backoff(mut self, backoff: BackoffPolicy) -> Self {
        self.backoff = backoff;
        self
    }

    /// Allow `concurrency` per-commit lookups in flight at once
    #[must_use]
    pub const fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency;
        self
    }

    /// The retry schedule applied to every call
    pub const fn backoff(&self) -> &BackoffPolicy {
        &self.backoff
    }

    /// List the commits in `range`.
    ///
    /// Without a base, walks the whole history ending at `head` one page at
    /// a time; each page gets its own retry budget and waits out rate limits
    /// on its own.
    pub async fn commits_in_range(&self, range: &CommitRange) -> Result<Vec<CommitRef>> {
        if let Some(base) = &range.base {
            let commits = self
                .backoff
                .execute(
                    || {
                        wait_out_rate_limits(move || self.api.compare_commits(base, &range.head))
                    },
                    "compare commits",
                )
                .await?;
            info!("Found {} commits since last release", commits.len());
            return Ok(commits);
        }

        let mut commits = Vec::new();
        for page in 1u32.. {
            let context = format!("list commits page {page}");
            let batch = self
                .backoff
                .execute(
                    || {
                        wait_out_rate_limits(move || {
                            self.api
                                .list_commits_page(&range.head, page, COMMITS_PER_PAGE)
                        })
                    },
                    &context,
                )
                .await?;
            let last_page = batch.len() < COMMITS_PER_PAGE as usize;
            commits.extend(batch);
            if last_page {
                break;
            }
        }
        info!("Found {} commits in full history", commits.len());
        Ok(commits)
    }

    /// Resolve every qualifying pull request reachable in `range`.
    ///
    /// Cached commits are answered without network access. Uncached commits
    /// are fetched concurrently; the first terminal failure aborts the whole
    /// resolution, since a dropped commit would silently shorten the
    /// changelog.
    pub async fn resolve(
        &self,
        range: &CommitRange,
        filter: &QualifyingFilter,
        cache: Option<&CacheEntry>,
    ) -> Result<ResolutionResult> {
        let commits = self.commits_in_range(range).await?;
        let split = partition(&commits, cache);
        info!(
            total = commits.len(),
            cached = split.cached.len(),
            uncached = split.uncached.len(),
            "partitioned commits"
        );

        let mut builder = ResolutionBuilder::new();
        self.fetch_uncached(split.uncached, filter, &mut builder)
            .await?;
        builder.record_cached(&split.cached);

        let result = builder.finish(commits.len());
        info!(
            total_commits = result.stats.total_commits,
            fetched_commits = result.stats.fetched_commits,
            cached_commits = result.stats.cached_commits,
            qualifying_prs = result.stats.qualifying_prs,
            "resolution complete"
        );
        Ok(result)
    }

    async fn fetch_uncached(
        &self,
        uncached: Vec<CommitRef>,
        filter: &QualifyingFilter,
        builder: &mut ResolutionBuilder,
    ) -> Result<()> {
        if uncached.is_empty() {
            return Ok(());
        }

        let limiter = RateLimiter::new(self.concurrency);
        let mut tasks = JoinSet::new();

        for sha in uncached {
            let api = Arc::clone(&self.api);
            let limiter = limiter.clone();
            let backoff = self.backoff;
            tasks.spawn(async move {
                debug!(%sha, "Fetching");
                let context = format!("list PRs for {sha}");
                let outcome = backoff
                    .execute(
                        || limiter.schedule(|| api.list_pull_requests_for_commit(&sha)),
                        &context,
                    )
                    .await;
                (sha, outcome)
            });
        }

        while let Some(joined) = tasks.join_next().await {
            let outcome = joined
                .map_err(|e| Error::Internal(format!("fetch task failed: {e}")))
                .and_then(|(sha, result)| result.map(|prs| (sha, prs)));

            match outcome {
                Ok((sha, prs)) => builder.record_fetched(sha, prs, filter),
                Err(e) => {
                    error!(error = %e, "commit lookup failed, abandoning remaining lookups");
                    // Queued lookups fail fast; running ones finish on their own.
                    limiter.close();
                    tasks.detach_all();
                    return Err(e);
                }
            }
        }
        Ok(())
    }
}
