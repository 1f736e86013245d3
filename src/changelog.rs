//! Changelog rendering
//!
//! Pure formatting of resolved pull requests. Newest merges come first.

use crate::types::PullRequestInfo;

const INTRO: &str = "Here are the latest changes in the reverse chronological order:";

/// Output flavour for a changelog
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    /// Hyperlinked PR numbers and authors
    Markdown,
    /// Plain `#N` and `@user` identifiers
    Plaintext,
}

/// Render `prs` as a changelog document.
///
/// Sorted by merge time descending, ties broken by PR number descending.
/// An empty input yields just the header.
pub fn render<'a, I>(prs: I, format: Format) -> String
where
    I: IntoIterator<Item = &'a PullRequestInfo>,
{
    let mut sorted: Vec<&PullRequestInfo> = prs.into_iter().collect();
    sorted.sort_by(|a, b| {
        b.merged_at
            .cmp(&a.merged_at)
            .then_with(|| b.number.cmp(&a.number))
    });

    let mut out = header(format);
    for pr in sorted {
        out.push_str(&line(pr, format));
        out.push('\n');
    }
    out
}

fn header(format: Format) -> String {
    match format {
        Format::Markdown => format!("# Changes\n\n{INTRO}\n\n"),
        Format::Plaintext => format!("Changes\n=======\n{INTRO}\n\n"),
    }
}

fn line(pr: &PullRequestInfo, format: Format) -> String {
    match format {
        Format::Markdown => {
            let by = pr.author.as_ref().map_or_else(String::new, |a| {
                format!(" by [@{}]({})", a.username, a.url)
            });
            format!("* ([#{}]({})) {}{by}", pr.number, pr.url, pr.title)
        }
        Format::Plaintext => {
            let by = pr
                .author
                .as_ref()
                .map_or_else(String::new, |a| format!(" by @{}", a.username));
            format!("* (#{}) {}{by}", pr.number, pr.title)
        }
    }
}
