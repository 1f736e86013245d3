//! relnotes - release notes from labeled pull requests
//!
//! Collects the pull requests merged since the latest GitHub release that
//! carry a given label, and renders them as a changelog.
//!
//! The moving parts:
//! - [`github`] - API access behind the [`github::GitHubApi`] trait
//! - [`throttle`] - retry backoff and concurrency/rate limiting
//! - [`resolve`] - commit range to deduplicated pull requests
//! - [`cache`] - persisted commit-to-PR mappings
//! - [`changelog`] - markdown and plain-text rendering
//! - [`notes`] - the whole run, end to end

pub mod auth;
pub mod cache;
pub mod changelog;
pub mod config;
pub mod error;
pub mod github;
pub mod notes;
pub mod resolve;
pub mod throttle;
pub mod types;
