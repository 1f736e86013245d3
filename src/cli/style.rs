//! Terminal styling helpers
//!
//! Colors are always emitted; `anstream` strips them when the target is not
//! a terminal or `NO_COLOR` is set.

use owo_colors::OwoColorize;
use std::fmt::Display;

/// Semantic styles for CLI output
pub trait Stylize {
    /// Bold
    fn emphasis(&self) -> String;
    /// Cyan, for counts and names
    fn accent(&self) -> String;
    /// Dimmed, for secondary detail
    fn muted(&self) -> String;
    /// Bold red
    fn error(&self) -> String;
}

impl<T: Display> Stylize for T {
    fn emphasis(&self) -> String {
        self.bold().to_string()
    }

    fn accent(&self) -> String {
        self.cyan().to_string()
    }

    fn muted(&self) -> String {
        self.dimmed().to_string()
    }

    fn error(&self) -> String {
        self.red().bold().to_string()
    }
}

/// Green check mark
pub fn check() -> String {
    "✓".green().to_string()
}
