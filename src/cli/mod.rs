//! Command-line interface

pub mod context;
pub mod generate;
pub mod style;

use clap::{Parser, ValueEnum};
use std::path::PathBuf;

/// Which changelog flavours to emit on stdout
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    /// Markdown with links
    #[default]
    Markdown,
    /// Plain text
    Plaintext,
    /// Markdown, then plain text
    Both,
}

/// Generate release notes from the labeled PRs merged since the last release
#[derive(Debug, Parser)]
#[command(name = "relnotes", version, about)]
pub struct Args {
    /// Repository as owner/name or a GitHub URL [default: origin remote]
    #[arg(long, env = "GITHUB_REPOSITORY")]
    pub repo: Option<String>,

    /// GitHub token [default: GITHUB_TOKEN, GH_TOKEN, or `gh auth token`]
    #[arg(long)]
    pub token: Option<String>,

    /// Label a merged PR must carry
    #[arg(long)]
    pub label: Option<String>,

    /// Branch whose tip ends the range
    #[arg(long)]
    pub branch: Option<String>,

    /// Maximum concurrent per-commit lookups
    #[arg(long)]
    pub concurrency: Option<usize>,

    /// What to print on stdout
    #[arg(long, value_enum, default_value_t)]
    pub format: OutputFormat,

    /// Also write the stdout text to this file
    #[arg(long, short)]
    pub output: Option<PathBuf>,

    /// Neither read nor write the commit cache
    #[arg(long)]
    pub no_cache: bool,

    /// Directory for the commit cache
    #[arg(long)]
    pub cache_dir: Option<PathBuf>,

    /// Settings file [default: ./relnotes.toml]
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// GitHub API base URL, for GitHub Enterprise
    #[arg(long, env = "GITHUB_API_URL")]
    pub api_url: Option<String>,
}
