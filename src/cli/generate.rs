//! Generate command - print release notes and publish step outputs

use crate::cli::context::CommandContext;
use crate::cli::style::{Stylize, check};
use crate::cli::{Args, OutputFormat};
use anstream::{eprintln, print};
use relnotes::changelog::Format;
use relnotes::error::{Error, Result};
use relnotes::notes::{ReleaseNotes, build_release_notes};
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::Path;

/// Step output holding the markdown changelog
pub const MARKDOWN_OUTPUT: &str = "release-notes";
/// Step output holding the plain-text changelog
pub const PLAINTEXT_OUTPUT: &str = "release-notes-plaintext";

/// Run the generate command
pub async fn run_generate(args: &Args, cwd: &Path) -> Result<()> {
    let ctx = CommandContext::new(args, cwd).await?;

    eprintln!(
        "{} {} {}",
        "Collecting".emphasis(),
        format!("'{}'", ctx.settings.label).accent(),
        format!("PRs for {}...", ctx.repo).muted()
    );

    let notes = build_release_notes(ctx.api.clone(), &ctx.cache, &ctx.settings).await?;

    let text = stdout_text(&notes, args.format);
    print!("{text}");

    if let Some(path) = &args.output {
        fs::write(path, &text)
            .map_err(|e| Error::Internal(format!("failed to write {}: {e}", path.display())))?;
    }

    if let Some(path) = std::env::var_os("GITHUB_OUTPUT").filter(|p| !p.is_empty()) {
        write_step_outputs(Path::new(&path), &notes)?;
    }

    print_summary(&notes);
    Ok(())
}

/// What goes to stdout for `format`
pub fn stdout_text(notes: &ReleaseNotes, format: OutputFormat) -> String {
    match format {
        OutputFormat::Markdown => notes.rendered(Format::Markdown).to_string(),
        OutputFormat::Plaintext => notes.rendered(Format::Plaintext).to_string(),
        OutputFormat::Both => format!(
            "{}\n{}",
            notes.rendered(Format::Markdown),
            notes.rendered(Format::Plaintext)
        ),
    }
}

/// Append both changelogs to a GitHub Actions output file.
pub fn write_step_outputs(path: &Path, notes: &ReleaseNotes) -> Result<()> {
    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|e| Error::Internal(format!("failed to open {}: {e}", path.display())))?;

    let mut block = step_output(MARKDOWN_OUTPUT, &notes.markdown);
    block.push_str(&step_output(PLAINTEXT_OUTPUT, &notes.plaintext));
    file.write_all(block.as_bytes())
        .map_err(|e| Error::Internal(format!("failed to write {}: {e}", path.display())))
}

/// One multiline output in `name<<DELIM ... DELIM` form.
///
/// The delimiter is regenerated until it does not occur in `value`.
pub fn step_output(name: &str, value: &str) -> String {
    let delimiter = loop {
        let candidate = format!("ghadelimiter_{:016x}", rand::random::<u64>());
        if !value.contains(&candidate) {
            break candidate;
        }
    };
    let value = value.strip_suffix('\n').unwrap_or(value);
    format!("{name}<<{delimiter}\n{value}\n{delimiter}\n")
}

fn print_summary(notes: &ReleaseNotes) {
    let stats = notes.stats;
    let since = notes
        .latest_tag
        .as_deref()
        .map_or_else(|| "full history".to_string(), |tag| format!("since {tag}"));

    eprintln!(
        "{} {} {}",
        check(),
        format!("{} PR(s)", stats.qualifying_prs).accent(),
        format!(
            "from {} commit(s) {since} ({} cached, {} fetched)",
            stats.total_commits, stats.cached_commits, stats.fetched_commits
        )
        .muted()
    );
}
