//! Pull request resolution for a commit range
//!
//! Two parts, following the gather/fold split:
//! 1. [`Resolver`] - lists commits and fetches uncached ones (effectful)
//! 2. [`ResolutionBuilder`] - folds fetched and cached results (pure)

mod fold;
mod pipeline;

pub use fold::ResolutionBuilder;
pub use pipeline::Resolver;

use crate::cache::CommitPrMap;
use crate::types::PullRequestInfo;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Counters describing one resolution
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ResolutionStats {
    /// Commits in the range
    pub total_commits: usize,
    /// Commits answered from the cache
    pub cached_commits: usize,
    /// Commits looked up on GitHub
    pub fetched_commits: usize,
    /// Distinct qualifying pull requests found
    pub qualifying_prs: usize,
}

/// Qualifying pull requests for a range, plus what to add to the cache
#[derive(Debug, Clone, Default)]
pub struct ResolutionResult {
    /// Deduplicated pull requests keyed by number
    pub pull_requests: BTreeMap<u64, Arc<PullRequestInfo>>,
    /// Per-commit results fetched during this resolution
    pub new_entries: CommitPrMap,
    /// Counters
    pub stats: ResolutionStats,
}

impl ResolutionResult {
    /// PR numbers in ascending order
    pub fn numbers(&self) -> Vec<u64> {
        self.pull_requests.keys().copied().collect()
    }

    /// The pull requests, ascending by number
    pub fn pull_requests(&self) -> impl Iterator<Item = &PullRequestInfo> {
        self.pull_requests.values().map(AsRef::as_ref)
    }

    /// Number of qualifying pull requests
    pub fn len(&self) -> usize {
        self.pull_requests.len()
    }

    /// Whether nothing qualified
    pub fn is_empty(&self) -> bool {
        self.pull_requests.is_empty()
    }
}
