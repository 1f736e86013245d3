//! Result accumulation - pure, no I/O
//!
//! The orchestrator feeds every fetched or cached commit through a
//! [`ResolutionBuilder`] one at a time. Workers never touch these maps.

use crate::cache::CommitPrMap;
use crate::resolve::{ResolutionResult, ResolutionStats};
use crate::types::{CommitRef, PullRequestInfo, QualifyingFilter, RawPullRequest};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Accumulates qualifying pull requests keyed by number
///
/// The same pull request usually shows up for several commits. Insertion is
/// last-write-wins by PR number; the values are equal whichever commit
/// surfaced them, so the winner does not matter.
#[derive(Debug, Default)]
pub struct ResolutionBuilder {
    pull_requests: BTreeMap<u64, Arc<PullRequestInfo>>,
    new_entries: CommitPrMap,
    stats: ResolutionStats,
}

impl ResolutionBuilder {
    /// Empty builder
    pub fn new() -> Self {
        Self::default()
    }

    /// Filter a commit's freshly fetched PRs and record the survivors.
    ///
    /// The commit is recorded for the cache even when nothing survives, so
    /// it is not fetched again next run.
    pub fn record_fetched(
        &mut self,
        commit: CommitRef,
        prs: Vec<RawPullRequest>,
        filter: &QualifyingFilter,
    ) {
        let retained: Vec<Arc<PullRequestInfo>> = prs
            .into_iter()
            .filter_map(|pr| filter.apply(pr))
            .map(Arc::new)
            .collect();

        self.insert_all(&retained);
        self.new_entries.insert(commit, retained);
        self.stats.fetched_commits += 1;
    }

    /// Record pre-qualified PRs straight from the cache.
    pub fn record_cached(&mut self, cached: &CommitPrMap) {
        for prs in cached.values() {
            self.insert_all(prs);
        }
        self.stats.cached_commits += cached.len();
    }

    fn insert_all(&mut self, prs: &[Arc<PullRequestInfo>]) {
        for pr in prs {
            self.pull_requests.insert(pr.number, Arc::clone(pr));
        }
    }

    /// Finish with the total number of commits in the range
    pub fn finish(mut self, total_commits: usize) -> ResolutionResult {
        self.stats.total_commits = total_commits;
        self.stats.qualifying_prs = self.pull_requests.len();
        ResolutionResult {
            pull_requests: self.pull_requests,
            new_entries: self.new_entries,
            stats: self.stats,
        }
    }
}
