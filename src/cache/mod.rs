//! Persistent commit-to-pull-request cache
//!
//! Maps each commit SHA to the qualifying pull requests already resolved for
//! it, so later runs only ask GitHub about commits they have not seen. Only
//! filtered results are ever stored, so a hit is used as-is.
//!
//! Loading and saving never fail a run: problems are logged and treated as a
//! cache miss or a skipped save.

mod store;

pub use store::{CACHE_DIR, CacheStore, FileCacheStore, MemoryCacheStore};

use crate::error::{Error, Result};
use crate::types::{CommitRef, PullRequestInfo, QualifyingFilter};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Cache schema version; bump when the stored shape changes.
pub const CACHE_VERSION: &str = "v1";

/// Qualifying pull requests per commit
pub type CommitPrMap = BTreeMap<CommitRef, Vec<Arc<PullRequestInfo>>>;

/// Stored cache contents for one repository
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheEntry {
    /// Schema version
    pub version: String,
    /// Repository owner
    pub owner: String,
    /// Repository name
    pub repo: String,
    /// Label the stored PRs were filtered on
    pub label: String,
    /// Resolved PRs per commit (empty list = commit has none)
    #[serde(rename = "commitToPRs")]
    pub commit_to_prs: CommitPrMap,
    /// When the entry was last written
    pub last_updated: DateTime<Utc>,
}

impl CacheEntry {
    /// Empty entry for a repository and label
    pub fn new(owner: &str, repo: &str, label: &str) -> Self {
        Self {
            version: CACHE_VERSION.to_string(),
            owner: owner.to_string(),
            repo: repo.to_string(),
            label: label.to_string(),
            commit_to_prs: BTreeMap::new(),
            last_updated: Utc::now(),
        }
    }

    /// Add entries, replacing any existing mapping for the same commit
    pub fn merge(&mut self, entries: CommitPrMap) {
        self.commit_to_prs.extend(entries);
    }

    /// Cached PRs for a commit
    pub fn get(&self, commit: &CommitRef) -> Option<&[Arc<PullRequestInfo>]> {
        self.commit_to_prs.get(commit).map(Vec::as_slice)
    }

    /// Number of commits cached
    pub fn len(&self) -> usize {
        self.commit_to_prs.len()
    }

    /// Whether no commits are cached
    pub fn is_empty(&self) -> bool {
        self.commit_to_prs.is_empty()
    }

    fn matches(&self, owner: &str, repo: &str, label: &str) -> bool {
        self.version == CACHE_VERSION
            && self.owner == owner
            && self.repo == repo
            && self.label == label
    }
}

/// Commits split by whether the cache already knows them
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Partition {
    /// Commits that need a network lookup
    pub uncached: Vec<CommitRef>,
    /// Commits answered from the cache
    pub cached: CommitPrMap,
}

/// Split `commits` into cached and uncached using only cache lookups.
///
/// With no entry, every commit is uncached.
pub fn partition(commits: &[CommitRef], entry: Option<&CacheEntry>) -> Partition {
    let Some(entry) = entry else {
        return Partition {
            uncached: commits.to_vec(),
            cached: BTreeMap::new(),
        };
    };

    let mut result = Partition::default();
    for commit in commits {
        match entry.commit_to_prs.get(commit) {
            Some(prs) => {
                result.cached.insert(commit.clone(), prs.clone());
            }
            None => result.uncached.push(commit.clone()),
        }
    }
    result
}

/// Cache key for a repository
pub fn cache_key(owner: &str, repo: &str) -> String {
    format!("release-notes-{CACHE_VERSION}-{owner}-{repo}")
}

/// Commit cache bound to a store and a qualifying label
pub struct CommitCache {
    store: Box<dyn CacheStore>,
    label: String,
}

impl CommitCache {
    /// Cache over `store` for results filtered by `filter`
    pub fn new(store: impl CacheStore + 'static, filter: &QualifyingFilter) -> Self {
        Self {
            store: Box::new(store),
            label: filter.target_label().to_string(),
        }
    }

    /// Load the entry for a repository.
    ///
    /// Returns `None` when nothing is stored, when the stored entry belongs
    /// to another schema version, repository or label, or when reading fails.
    pub fn load(&self, owner: &str, repo: &str) -> Option<CacheEntry> {
        match self.try_load(owner, repo) {
            Ok(Some(entry)) => {
                info!(commits = entry.len(), "Loaded cached commit-to-PR mappings");
                Some(entry)
            }
            Ok(None) => {
                info!("No PR cache found, starting fresh");
                None
            }
            Err(e) => {
                warn!(error = %e, "Failed to load PR cache");
                None
            }
        }
    }

    fn try_load(&self, owner: &str, repo: &str) -> Result<Option<CacheEntry>> {
        match self.store.restore(&cache_key(owner, repo))? {
            Some(bytes) => self.decode(owner, repo, &bytes),
            None => Ok(None),
        }
    }

    fn decode(&self, owner: &str, repo: &str, bytes: &[u8]) -> Result<Option<CacheEntry>> {
        let entry: CacheEntry = serde_json::from_slice(bytes)
            .map_err(|e| Error::Cache(format!("malformed cache data: {e}")))?;

        if !entry.matches(owner, repo, &self.label) {
            debug!(
                version = %entry.version,
                owner = %entry.owner,
                repo = %entry.repo,
                label = %entry.label,
                "cache identity mismatch, ignoring"
            );
            return Ok(None);
        }
        Ok(Some(entry))
    }

    /// Merge `entry`'s mappings into what is stored and write it back.
    ///
    /// Existing mappings are never removed: if the stored entry cannot be
    /// read the save is skipped, and only undecodable or foreign data is
    /// replaced. Failures are logged.
    pub fn save(&self, owner: &str, repo: &str, entry: &CacheEntry) {
        match self.try_save(owner, repo, entry) {
            Ok(count) => info!(commits = count, "PR cache saved"),
            Err(e) => warn!(error = %e, "Failed to save PR cache"),
        }
    }

    fn try_save(&self, owner: &str, repo: &str, entry: &CacheEntry) -> Result<usize> {
        let key = cache_key(owner, repo);
        // An unreadable store may still hold mappings, so nothing is written.
        let stored = self.store.restore(&key)?;
        let existing = match stored {
            Some(bytes) => self.decode(owner, repo, &bytes).unwrap_or_else(|e| {
                debug!(error = %e, "existing cache undecodable, replacing it");
                None
            }),
            None => None,
        };

        let mut merged = existing.unwrap_or_else(|| CacheEntry::new(owner, repo, &self.label));
        merged.merge(entry.commit_to_prs.clone());
        merged.last_updated = Utc::now();

        let bytes = serde_json::to_vec_pretty(&merged)?;
        self.store.persist(&key, &bytes)?;
        Ok(merged.len())
    }
}
