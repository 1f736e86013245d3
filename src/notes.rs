//! End-to-end release notes generation

use crate::cache::{CacheEntry, CommitCache};
use crate::changelog::{Format, render};
use crate::config::Settings;
use crate::error::Result;
use crate::github::GitHubApi;
use crate::resolve::{ResolutionStats, Resolver};
use crate::throttle::wait_out_rate_limits;
use crate::types::{CommitRange, CommitRef};
use std::sync::Arc;
use tracing::info;

/// Rendered release notes and how they were produced
#[derive(Debug, Clone)]
pub struct ReleaseNotes {
    /// Markdown changelog
    pub markdown: String,
    /// Plain-text changelog
    pub plaintext: String,
    /// Tag of the release the range starts after, if any
    pub latest_tag: Option<String>,
    /// Range that was resolved
    pub range: CommitRange,
    /// Resolution counters
    pub stats: ResolutionStats,
}

impl ReleaseNotes {
    /// Changelog text in `format`
    pub fn rendered(&self, format: Format) -> &str {
        match format {
            Format::Markdown => &self.markdown,
            Format::Plaintext => &self.plaintext,
        }
    }
}

/// Build release notes for everything merged since the latest release.
///
/// Head commit, then latest release tag (none means full history), then
/// cache lookup, resolution, cache write-back and rendering. Cache problems
/// never fail the run; any API failure that survives retries does.
pub async fn build_release_notes(
    api: Arc<dyn GitHubApi>,
    cache: &CommitCache,
    settings: &Settings,
) -> Result<ReleaseNotes> {
    let backoff = settings.backoff();
    let filter = settings.filter();
    let (owner, repo) = {
        let config = api.config();
        (config.owner.clone(), config.repo.clone())
    };

    let github = api.as_ref();
    let head = backoff
        .execute(
            || wait_out_rate_limits(move || github.head_commit(&settings.branch)),
            "fetch head commit",
        )
        .await?;
    let latest_tag = backoff
        .execute(
            || wait_out_rate_limits(move || github.latest_release_tag()),
            "fetch latest release",
        )
        .await?;

    let range = match &latest_tag {
        Some(tag) => {
            info!(%tag, %head, "generating notes since latest release");
            CommitRange::since(CommitRef::new(tag.as_str()), head)
        }
        None => {
            info!(%head, "no release found, using full history");
            CommitRange::full_history(head)
        }
    };

    let cached = cache.load(&owner, &repo);

    let result = Resolver::new(Arc::clone(&api))
        .with_backoff(backoff)
        .with_concurrency(settings.concurrency)
        .resolve(&range, &filter, cached.as_ref())
        .await?;

    if !result.new_entries.is_empty() {
        let mut entry = CacheEntry::new(&owner, &repo, filter.target_label());
        entry.merge(result.new_entries.clone());
        cache.save(&owner, &repo, &entry);
    }

    Ok(ReleaseNotes {
        markdown: render(result.pull_requests(), Format::Markdown),
        plaintext: render(result.pull_requests(), Format::Plaintext),
        latest_tag,
        range,
        stats: result.stats,
    })
}
