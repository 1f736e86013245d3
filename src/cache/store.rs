//! Byte-level storage backends for the commit cache.

use crate::error::{Error, Result};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// Default directory name for the file-backed store.
pub const CACHE_DIR: &str = ".release-notes-cache";

/// Persistent key/value storage for serialized cache entries
///
/// Implementations report failures as errors; [`CommitCache`] decides that
/// they are non-fatal.
///
/// [`CommitCache`]: super::CommitCache
pub trait CacheStore: Send + Sync {
    /// Fetch the bytes stored under `key`, if any
    fn restore(&self, key: &str) -> Result<Option<Vec<u8>>>;

    /// Store `bytes` under `key`, replacing what was there
    fn persist(&self, key: &str, bytes: &[u8]) -> Result<()>;
}

/// Stores each key as `<dir>/<key>.json`
#[derive(Debug, Clone)]
pub struct FileCacheStore {
    dir: PathBuf,
}

impl FileCacheStore {
    /// Store files under `dir` (created on first write)
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Directory holding the cache files
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the file backing `key`
    pub fn path_for(&self, key: &str) -> PathBuf {
        let safe: String = key
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.') {
                    c
                } else {
                    '_'
                }
            })
            .collect();
        self.dir.join(format!("{safe}.json"))
    }
}

impl CacheStore for FileCacheStore {
    fn restore(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let path = self.path_for(key);
        if !path.exists() {
            return Ok(None);
        }
        fs::read(&path)
            .map(Some)
            .map_err(|e| Error::Cache(format!("failed to read {}: {e}", path.display())))
    }

    fn persist(&self, key: &str, bytes: &[u8]) -> Result<()> {
        if !self.dir.exists() {
            fs::create_dir_all(&self.dir).map_err(|e| {
                Error::Cache(format!("failed to create {}: {e}", self.dir.display()))
            })?;
        }

        let path = self.path_for(key);
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, bytes)
            .map_err(|e| Error::Cache(format!("failed to write {}: {e}", tmp.display())))?;
        fs::rename(&tmp, &path)
            .map_err(|e| Error::Cache(format!("failed to replace {}: {e}", path.display())))?;
        Ok(())
    }
}

/// In-process store, used for `--no-cache` runs and tests
#[derive(Debug, Default)]
pub struct MemoryCacheStore {
    entries: Mutex<HashMap<String, Vec<u8>>>,
}

impl MemoryCacheStore {
    /// Empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of keys stored
    pub fn len(&self) -> usize {
        self.entries.lock().map_or(0, |e| e.len())
    }

    /// Whether nothing has been stored
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl CacheStore for MemoryCacheStore {
    fn restore(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let entries = self
            .entries
            .lock()
            .map_err(|_| Error::Cache("memory store poisoned".to_string()))?;
        Ok(entries.get(key).cloned())
    }

    fn persist(&self, key: &str, bytes: &[u8]) -> Result<()> {
        self.entries
            .lock()
            .map_err(|_| Error::Cache("memory store poisoned".to_string()))?
            .insert(key.to_string(), bytes.to_vec());
        Ok(())
    }
}
