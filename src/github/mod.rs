//! GitHub API access
//!
//! The resolution pipeline only talks to GitHub through [`GitHubApi`], so it
//! can run against in-memory fakes in tests.

mod detection;
mod service;

pub use detection::parse_repo_info;
pub use service::{GitHubService, classify_response};

use crate::error::Result;
use crate::types::{CommitRef, RawPullRequest, RepoConfig};
use async_trait::async_trait;

/// Page size used when walking commit history
pub const COMMITS_PER_PAGE: u32 = 100;

/// Read-only GitHub operations needed to build release notes
///
/// Every method is a single request, so callers can wrap each one in its
/// own retry budget. Errors carry enough classification (status codes,
/// network codes, rate-limit signals) for [`BackoffPolicy`] and
/// [`RateLimiter`] to decide what to do.
///
/// [`BackoffPolicy`]: crate::throttle::BackoffPolicy
/// [`RateLimiter`]: crate::throttle::RateLimiter
#[async_trait]
pub trait GitHubApi: Send + Sync {
    /// Latest commit on `branch`
    async fn head_commit(&self, branch: &str) -> Result<CommitRef>;

    /// Tag of the latest published release, `None` if there is none
    async fn latest_release_tag(&self) -> Result<Option<String>>;

    /// Commits reachable from `head` but not from `base`
    async fn compare_commits(&self, base: &CommitRef, head: &CommitRef)
    -> Result<Vec<CommitRef>>;

    /// One page (1-based) of the history ending at `head`
    ///
    /// A page shorter than `per_page` is the last one.
    async fn list_commits_page(
        &self,
        head: &CommitRef,
        page: u32,
        per_page: u32,
    ) -> Result<Vec<CommitRef>>;

    /// Pull requests associated with a commit
    async fn list_pull_requests_for_commit(&self, sha: &CommitRef) -> Result<Vec<RawPullRequest>>;

    /// Repository this client is bound to
    fn config(&self) -> &RepoConfig;
}
