//! Run settings
//!
//! Layered as built-in defaults, then a TOML file, then whatever the caller
//! overrides (the binary applies CLI flags on top).

use crate::cache::CACHE_DIR;
use crate::error::{Error, Result};
use crate::throttle::{BackoffPolicy, DEFAULT_CONCURRENCY, DEFAULT_MAX_RETRIES};
use crate::types::QualifyingFilter;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

/// Settings file looked up in the working directory
pub const CONFIG_FILE: &str = "relnotes.toml";

/// Settings for one release-notes run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    /// Label a merged PR must carry
    pub label: String,
    /// Branch whose tip is the head of the range
    pub branch: String,
    /// Maximum per-commit lookups in flight
    pub concurrency: usize,
    /// Retries after the first attempt for transient failures
    pub max_retries: u32,
    /// Delay before the first retry, in milliseconds
    pub initial_delay_ms: u64,
    /// Cap on the un-jittered retry delay, in milliseconds
    pub max_delay_ms: u64,
    /// Directory holding the commit cache
    pub cache_dir: PathBuf,
    /// Whether to read and write the commit cache
    pub cache: bool,
    /// GitHub API base URL (GitHub Enterprise)
    pub api_url: Option<String>,
}

impl Default for Settings {
    fn default() -> Self {
        let backoff = BackoffPolicy::default();
        Self {
            label: QualifyingFilter::default().target_label().to_string(),
            branch: "main".to_string(),
            concurrency: DEFAULT_CONCURRENCY,
            max_retries: DEFAULT_MAX_RETRIES,
            initial_delay_ms: duration_ms(backoff.initial_delay),
            max_delay_ms: duration_ms(backoff.max_delay),
            cache_dir: PathBuf::from(CACHE_DIR),
            cache: true,
            api_url: None,
        }
    }
}

fn duration_ms(d: Duration) -> u64 {
    u64::try_from(d.as_millis()).unwrap_or(u64::MAX)
}

impl Settings {
    /// Parse settings from TOML text; missing keys take their defaults.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| Error::Config(format!("invalid settings: {e}")))
    }

    /// Load settings from `path`, which must exist.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("failed to read {}: {e}", path.display())))?;
        toml::from_str(&content)
            .map_err(|e| Error::Config(format!("failed to parse {}: {e}", path.display())))
    }

    /// Load layered settings.
    ///
    /// An explicit path must exist. Otherwise `relnotes.toml` in `dir` is
    /// used, then `relnotes/config.toml` under the user config directory,
    /// then the defaults.
    pub fn load(explicit: Option<&Path>, dir: &Path) -> Result<Self> {
        if let Some(path) = explicit {
            debug!(path = %path.display(), "loading settings");
            return Self::from_file(path);
        }

        let candidates = [
            Some(dir.join(CONFIG_FILE)),
            dirs::config_dir().map(|d| d.join("relnotes").join("config.toml")),
        ];
        for path in candidates.into_iter().flatten() {
            if path.is_file() {
                debug!(path = %path.display(), "loading settings");
                return Self::from_file(&path);
            }
        }

        Ok(Self::default())
    }

    /// Reject settings no run could use
    pub fn validate(&self) -> Result<()> {
        if self.label.trim().is_empty() {
            return Err(Error::Config("label must not be empty".to_string()));
        }
        if self.branch.trim().is_empty() {
            return Err(Error::Config("branch must not be empty".to_string()));
        }
        if self.concurrency == 0 {
            return Err(Error::Config("concurrency must be at least 1".to_string()));
        }
        if self.initial_delay_ms > self.max_delay_ms {
            return Err(Error::Config(format!(
                "initial_delay_ms ({}) exceeds max_delay_ms ({})",
                self.initial_delay_ms, self.max_delay_ms
            )));
        }
        Ok(())
    }

    /// Retry schedule described by these settings
    pub fn backoff(&self) -> BackoffPolicy {
        BackoffPolicy {
            max_retries: self.max_retries,
            initial_delay: Duration::from_millis(self.initial_delay_ms),
            max_delay: Duration::from_millis(self.max_delay_ms),
            ..BackoffPolicy::default()
        }
    }

    /// Filter selecting the PRs to list
    pub fn filter(&self) -> QualifyingFilter {
        QualifyingFilter::label(self.label.trim())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults() {
        let settings = Settings::default();
        assert_eq!(settings.label, "ios");
        assert_eq!(settings.branch, "main");
        assert_eq!(settings.concurrency, 10);
        assert_eq!(settings.max_retries, 3);
        assert_eq!(settings.initial_delay_ms, 1000);
        assert_eq!(settings.max_delay_ms, 30_000);
        assert_eq!(settings.cache_dir, PathBuf::from(".release-notes-cache"));
        assert!(settings.cache);
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let settings = Settings::from_toml_str("label = \"android\"\nconcurrency = 4\n").unwrap();
        assert_eq!(settings.label, "android");
        assert_eq!(settings.concurrency, 4);
        assert_eq!(settings.branch, "main");
    }

    #[test]
    fn test_unknown_key_rejected() {
        let err = Settings::from_toml_str("lable = \"ios\"").unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_load_from_working_dir() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join(CONFIG_FILE), "branch = \"develop\"\n").unwrap();

        let settings = Settings::load(None, temp.path()).unwrap();
        assert_eq!(settings.branch, "develop");
    }

    #[test]
    fn test_explicit_path_must_exist() {
        let temp = TempDir::new().unwrap();
        let missing = temp.path().join("nope.toml");
        assert!(matches!(
            Settings::load(Some(&missing), temp.path()),
            Err(Error::Config(_))
        ));
    }

    #[test]
    fn test_validate() {
        let mut settings = Settings {
            concurrency: 0,
            ..Settings::default()
        };
        assert!(settings.validate().is_err());

        settings.concurrency = 2;
        settings.initial_delay_ms = 60_000;
        assert!(settings.validate().is_err());

        settings.initial_delay_ms = 10;
        settings.label = " ".to_string();
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_backoff_from_settings() {
        let settings = Settings {
            max_retries: 5,
            initial_delay_ms: 10,
            max_delay_ms: 100,
            ..Settings::default()
        };
        let policy = settings.backoff();
        assert_eq!(policy.max_retries, 5);
        assert_eq!(policy.initial_delay, Duration::from_millis(10));
        assert_eq!(policy.max_delay, Duration::from_millis(100));
        assert!((policy.multiplier - 2.0).abs() < f64::EPSILON);
    }
}
