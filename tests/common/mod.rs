//! Shared test helpers

#![allow(dead_code)]

mod mock_github;

pub use mock_github::{CompareCall, MockGitHubService, PageCall};

use chrono::{TimeZone, Utc};
use relnotes::throttle::BackoffPolicy;
use relnotes::types::{Author, RawPullRequest};
use std::time::Duration;

/// Merged PR carrying `labels`, merged on day `day` of March 2024
pub fn merged_pr(number: u64, day: u32, labels: &[&str]) -> RawPullRequest {
    RawPullRequest {
        number,
        title: format!("Change {number}"),
        url: format!("https://github.com/acme/app/pull/{number}"),
        merged_at: Some(Utc.with_ymd_and_hms(2024, 3, day, 9, 30, 0).unwrap()),
        labels: labels.iter().map(ToString::to_string).collect(),
        author: Some(Author {
            username: format!("dev{number}"),
            url: format!("https://github.com/dev{number}"),
        }),
    }
}

/// Open or closed-unmerged PR carrying `labels`
pub fn unmerged_pr(number: u64, labels: &[&str]) -> RawPullRequest {
    RawPullRequest {
        merged_at: None,
        ..merged_pr(number, 1, labels)
    }
}

/// Backoff with millisecond delays so retry tests stay fast
pub fn fast_backoff() -> BackoffPolicy {
    BackoffPolicy {
        max_retries: 3,
        initial_delay: Duration::from_millis(1),
        max_delay: Duration::from_millis(4),
        multiplier: 2.0,
    }
}
