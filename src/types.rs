//! Core types for relnotes

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Commit identifier (SHA, or a tag name when used as a compare base)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CommitRef(String);

impl CommitRef {
    /// Wrap a SHA or ref name
    pub fn new(sha: impl Into<String>) -> Self {
        Self(sha.into())
    }

    /// Borrow the underlying identifier
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for CommitRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for CommitRef {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for CommitRef {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// The span of history to collect pull requests from
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitRange {
    /// Previous release point (None = entire history up to head)
    pub base: Option<CommitRef>,
    /// Newest commit included
    pub head: CommitRef,
}

impl CommitRange {
    /// Range covering everything since `base`
    pub const fn since(base: CommitRef, head: CommitRef) -> Self {
        Self {
            base: Some(base),
            head,
        }
    }

    /// Range covering the whole history up to `head`
    pub const fn full_history(head: CommitRef) -> Self {
        Self { base: None, head }
    }
}

/// A GitHub user credited on a pull request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Author {
    /// Login name
    pub username: String,
    /// Profile URL
    pub url: String,
}

/// A merged pull request that passed the qualifying filter
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PullRequestInfo {
    /// PR number (unique key)
    pub number: u64,
    /// PR title
    pub title: String,
    /// Web URL for the PR
    pub url: String,
    /// When the PR was merged
    pub merged_at: DateTime<Utc>,
    /// PR author, when GitHub still knows the account
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<Author>,
    /// Label names
    #[serde(default)]
    pub labels: BTreeSet<String>,
}

/// A pull request as returned for a commit, before filtering
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawPullRequest {
    /// PR number
    pub number: u64,
    /// PR title
    pub title: String,
    /// Web URL for the PR
    pub url: String,
    /// Merge time (None if closed unmerged or still open)
    pub merged_at: Option<DateTime<Utc>>,
    /// Label names
    pub labels: Vec<String>,
    /// PR author
    pub author: Option<Author>,
}

/// Decides which pull requests belong in the changelog
///
/// A pull request qualifies when it has been merged and carries the
/// target label. The filter is fixed for the duration of a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QualifyingFilter {
    label: String,
}

impl QualifyingFilter {
    /// Filter on merged PRs carrying `label`
    pub fn label(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
        }
    }

    /// The label a PR must carry
    pub fn target_label(&self) -> &str {
        &self.label
    }

    /// Check whether a raw PR qualifies
    pub fn matches(&self, pr: &RawPullRequest) -> bool {
        pr.merged_at.is_some() && pr.labels.iter().any(|l| *l == self.label)
    }

    /// Convert a raw PR into a [`PullRequestInfo`] if it qualifies
    pub fn apply(&self, pr: RawPullRequest) -> Option<PullRequestInfo> {
        if !self.matches(&pr) {
            return None;
        }
        let merged_at = pr.merged_at?;
        Some(PullRequestInfo {
            number: pr.number,
            title: pr.title,
            url: pr.url,
            merged_at,
            author: pr.author,
            labels: pr.labels.into_iter().collect(),
        })
    }
}

impl Default for QualifyingFilter {
    fn default() -> Self {
        Self::label("ios")
    }
}

/// Repository coordinates
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoConfig {
    /// Repository owner (user or organization)
    pub owner: String,
    /// Repository name
    pub repo: String,
    /// Custom host (None for github.com)
    pub host: Option<String>,
}

impl std::fmt::Display for RepoConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.owner, self.repo)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn raw(number: u64, merged: bool, labels: &[&str]) -> RawPullRequest {
        RawPullRequest {
            number,
            title: format!("PR {number}"),
            url: format!("https://github.com/o/r/pull/{number}"),
            merged_at: merged.then(|| Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap()),
            labels: labels.iter().map(ToString::to_string).collect(),
            author: None,
        }
    }

    #[test]
    fn test_filter_keeps_merged_with_label() {
        let filter = QualifyingFilter::label("ios");
        let info = filter.apply(raw(1, true, &["ios", "bug"])).unwrap();
        assert_eq!(info.number, 1);
        assert!(info.labels.contains("bug"));
    }

    #[test]
    fn test_filter_drops_unmerged() {
        let filter = QualifyingFilter::label("ios");
        assert!(filter.apply(raw(1, false, &["ios"])).is_none());
    }

    #[test]
    fn test_filter_drops_missing_label() {
        let filter = QualifyingFilter::label("ios");
        assert!(filter.apply(raw(1, true, &["android"])).is_none());
        assert!(filter.apply(raw(2, true, &[])).is_none());
    }

    #[test]
    fn test_filter_label_is_exact_match() {
        let filter = QualifyingFilter::label("ios");
        assert!(!filter.matches(&raw(1, true, &["iOS", "ios-extension"])));
    }

    #[test]
    fn test_pull_request_info_json_shape() {
        let info = QualifyingFilter::default()
            .apply(raw(7, true, &["ios"]))
            .unwrap();
        let json = serde_json::to_value(&info).unwrap();
        assert_eq!(json["number"], 7);
        assert!(json.get("mergedAt").is_some());
        assert!(json.get("author").is_none());
    }
}
