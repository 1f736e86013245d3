//! Mock GitHub service for testing
//!
//! These are test utilities - not all may be used by every test binary.

#![allow(dead_code)]

use async_trait::async_trait;
use relnotes::error::{Error, RateLimitKind, Result};
use relnotes::github::GitHubApi;
use relnotes::types::{CommitRef, RawPullRequest, RepoConfig};
use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

/// Call record for `compare_commits`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompareCall {
    pub base: String,
    pub head: String,
}

/// Call record for `list_commits_page`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageCall {
    pub head: String,
    pub page: u32,
    pub per_page: u32,
}

/// How a commit's PR lookup should misbehave
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Failure {
    /// 502 for the next N calls, then normal
    Transient(u32),
    /// Secondary rate limit for the next N calls, then normal
    RateLimited(u32),
    /// 404 forever
    Terminal,
}

/// Hand-written fake of [`GitHubApi`]
///
/// Features:
/// - In-memory history, release tag and commit-to-PR table
/// - Call tracking for verification
/// - Error injection per commit (transient, rate limited, terminal) and
///   rate limits on history pages
/// - In-flight tracking to verify concurrency bounds
pub struct MockGitHubService {
    config: RepoConfig,
    head: Mutex<CommitRef>,
    latest_tag: Mutex<Option<String>>,
    history: Mutex<Vec<CommitRef>>,
    compare_response: Mutex<Vec<CommitRef>>,
    prs: Mutex<HashMap<CommitRef, Vec<RawPullRequest>>>,
    pr_lookup_delay: Mutex<Duration>,
    // Call tracking
    head_calls: Mutex<Vec<String>>,
    release_calls: AtomicUsize,
    compare_calls: Mutex<Vec<CompareCall>>,
    page_calls: Mutex<Vec<PageCall>>,
    pr_calls: Mutex<Vec<CommitRef>>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    // Error injection
    error_on_head: Mutex<Option<String>>,
    page_rate_limits: AtomicUsize,
    pr_failures: Mutex<HashMap<CommitRef, Failure>>,
}

impl MockGitHubService {
    /// Create a new mock for `owner/repo` whose head is `head`
    pub fn new(owner: &str, repo: &str, head: &str) -> Self {
        Self {
            config: RepoConfig {
                owner: owner.to_string(),
                repo: repo.to_string(),
                host: None,
            },
            head: Mutex::new(CommitRef::from(head)),
            latest_tag: Mutex::new(None),
            history: Mutex::new(Vec::new()),
            compare_response: Mutex::new(Vec::new()),
            prs: Mutex::new(HashMap::new()),
            pr_lookup_delay: Mutex::new(Duration::ZERO),
            head_calls: Mutex::new(Vec::new()),
            release_calls: AtomicUsize::new(0),
            compare_calls: Mutex::new(Vec::new()),
            page_calls: Mutex::new(Vec::new()),
            pr_calls: Mutex::new(Vec::new()),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
            error_on_head: Mutex::new(None),
            page_rate_limits: AtomicUsize::new(0),
            pr_failures: Mutex::new(HashMap::new()),
        }
    }

    // === Response setup ===

    /// Set the latest release tag
    pub fn set_latest_tag(&self, tag: &str) {
        *self.latest_tag.lock().unwrap() = Some(tag.to_string());
    }

    /// Set the full history, newest first
    pub fn set_history(&self, shas: &[&str]) {
        *self.history.lock().unwrap() = shas.iter().copied().map(CommitRef::from).collect();
    }

    /// Set the full history to `count` generated commits
    pub fn set_generated_history(&self, count: usize) {
        *self.history.lock().unwrap() = (0..count)
            .map(|i| CommitRef::new(format!("c{i:04}")))
            .collect();
    }

    /// Set the commits returned by `compare_commits`
    pub fn set_compare_response(&self, shas: &[&str]) {
        *self.compare_response.lock().unwrap() =
            shas.iter().copied().map(CommitRef::from).collect();
    }

    /// Set the PRs associated with a commit
    pub fn set_prs(&self, sha: &str, prs: Vec<RawPullRequest>) {
        self.prs.lock().unwrap().insert(CommitRef::from(sha), prs);
    }

    /// Make every PR lookup take at least `delay`
    pub fn set_pr_lookup_delay(&self, delay: Duration) {
        *self.pr_lookup_delay.lock().unwrap() = delay;
    }

    // === Error injection methods ===

    /// Make `head_commit` return an error
    pub fn fail_head(&self, msg: &str) {
        *self.error_on_head.lock().unwrap() = Some(msg.to_string());
    }

    /// Make the next `times` history page requests hit a secondary rate limit
    pub fn rate_limit_commit_pages(&self, times: usize) {
        self.page_rate_limits.store(times, Ordering::SeqCst);
    }

    /// Make the next `times` PR lookups for `sha` fail with a 502
    pub fn fail_pr_lookup_transiently(&self, sha: &str, times: u32) {
        self.pr_failures
            .lock()
            .unwrap()
            .insert(CommitRef::from(sha), Failure::Transient(times));
    }

    /// Make the next `times` PR lookups for `sha` hit a secondary rate limit
    pub fn rate_limit_pr_lookup(&self, sha: &str, times: u32) {
        self.pr_failures
            .lock()
            .unwrap()
            .insert(CommitRef::from(sha), Failure::RateLimited(times));
    }

    /// Make every PR lookup for `sha` fail with a 404
    pub fn fail_pr_lookup(&self, sha: &str) {
        self.pr_failures
            .lock()
            .unwrap()
            .insert(CommitRef::from(sha), Failure::Terminal);
    }

    // === Call inspection ===

    pub fn get_head_calls(&self) -> Vec<String> {
        self.head_calls.lock().unwrap().clone()
    }

    pub fn release_call_count(&self) -> usize {
        self.release_calls.load(Ordering::SeqCst)
    }

    pub fn get_compare_calls(&self) -> Vec<CompareCall> {
        self.compare_calls.lock().unwrap().clone()
    }

    pub fn get_page_calls(&self) -> Vec<PageCall> {
        self.page_calls.lock().unwrap().clone()
    }

    pub fn get_pr_calls(&self) -> Vec<CommitRef> {
        self.pr_calls.lock().unwrap().clone()
    }

    /// Number of PR lookups made for `sha`
    pub fn pr_call_count(&self, sha: &str) -> usize {
        self.pr_calls
            .lock()
            .unwrap()
            .iter()
            .filter(|c| c.as_str() == sha)
            .count()
    }

    /// Highest number of PR lookups observed in flight at once
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    // === Assertions ===

    pub fn assert_compare_called(&self, base: &str, head: &str) {
        let calls = self.get_compare_calls();
        assert!(
            calls.iter().any(|c| c.base == base && c.head == head),
            "Expected compare_commits({base}, {head}), got: {calls:?}"
        );
    }

    pub fn assert_no_pr_lookups(&self) {
        let calls = self.get_pr_calls();
        assert!(calls.is_empty(), "Expected no PR lookups, got: {calls:?}");
    }

    fn take_failure(&self, sha: &CommitRef) -> Option<Error> {
        let mut failures = self.pr_failures.lock().unwrap();
        let failure = failures.get_mut(sha)?;
        match failure {
            Failure::Terminal => Some(Error::Http {
                status: 404,
                message: "Not Found".to_string(),
            }),
            Failure::Transient(0) | Failure::RateLimited(0) => None,
            Failure::Transient(n) => {
                *n -= 1;
                Some(Error::Http {
                    status: 502,
                    message: "Bad Gateway".to_string(),
                })
            }
            Failure::RateLimited(n) => {
                *n -= 1;
                Some(Error::RateLimited {
                    kind: RateLimitKind::Secondary,
                    retry_after: Duration::from_millis(1),
                })
            }
        }
    }
}

#[async_trait]
impl GitHubApi for MockGitHubService {
    async fn head_commit(&self, branch: &str) -> Result<CommitRef> {
        self.head_calls.lock().unwrap().push(branch.to_string());
        if let Some(msg) = self.error_on_head.lock().unwrap().clone() {
            return Err(Error::GitHubApi(msg));
        }
        Ok(self.head.lock().unwrap().clone())
    }

    async fn latest_release_tag(&self) -> Result<Option<String>> {
        self.release_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.latest_tag.lock().unwrap().clone())
    }

    async fn compare_commits(
        &self,
        base: &CommitRef,
        head: &CommitRef,
    ) -> Result<Vec<CommitRef>> {
        self.compare_calls.lock().unwrap().push(CompareCall {
            base: base.to_string(),
            head: head.to_string(),
        });
        Ok(self.compare_response.lock().unwrap().clone())
    }

    async fn list_commits_page(
        &self,
        head: &CommitRef,
        page: u32,
        per_page: u32,
    ) -> Result<Vec<CommitRef>> {
        self.page_calls.lock().unwrap().push(PageCall {
            head: head.to_string(),
            page,
            per_page,
        });
        let limited = self
            .page_rate_limits
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if limited {
            return Err(Error::RateLimited {
                kind: RateLimitKind::Secondary,
                retry_after: Duration::from_millis(1),
            });
        }
        let history = self.history.lock().unwrap();
        let per_page = per_page as usize;
        let start = (page as usize - 1) * per_page;
        Ok(history.iter().skip(start).take(per_page).cloned().collect())
    }

    async fn list_pull_requests_for_commit(&self, sha: &CommitRef) -> Result<Vec<RawPullRequest>> {
        self.pr_calls.lock().unwrap().push(sha.clone());

        let active = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(active, Ordering::SeqCst);

        let delay = *self.pr_lookup_delay.lock().unwrap();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        let outcome = match self.take_failure(sha) {
            Some(err) => Err(err),
            None => Ok(self.prs.lock().unwrap().get(sha).cloned().unwrap_or_default()),
        };
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        outcome
    }

    fn config(&self) -> &RepoConfig {
        &self.config
    }
}
