//! File-backed TTL cache for contract query results (`data/cache.json`).
//!
//! The bot's contract pages are read far more often than they change, and
//! the cache file survives container restarts (it is a mounted volume).
//! Whole-file load/store per operation: entries are small and the write
//! pattern is a single process.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

use crate::error::{Result, VitrinaError};

/// Default entry lifetime: 30 minutes.
const DEFAULT_TTL: Duration = Duration::from_secs(30 * 60);

#[derive(Debug, Serialize, Deserialize)]
struct CacheEntry {
    /// Unix seconds at store time
    timestamp: u64,
    value: serde_json::Value,
}

/// File-backed JSON cache with per-entry TTL
#[derive(Debug, Clone)]
pub struct ContractCache {
    path: PathBuf,
    ttl: Duration,
}

impl ContractCache {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            ttl: DEFAULT_TTL,
        }
    }

    pub fn with_ttl(path: impl Into<PathBuf>, ttl: Duration) -> Self {
        Self {
            path: path.into(),
            ttl,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Fetch a live entry. Expired entries are removed from the file on the
    /// way out so the cache doesn't accumulate stale agents forever.
    pub fn get(&self, key: &str) -> Result<Option<serde_json::Value>> {
        let mut entries = self.load()?;

        match entries.get(key) {
            Some(entry) if self.is_live(entry.timestamp) => Ok(Some(entry.value.clone())),
            Some(_) => {
                entries.remove(key);
                self.store(&entries)?;
                tracing::debug!(key, "cache entry expired, removed");
                Ok(None)
            }
            None => Ok(None),
        }
    }

    /// Store a value under a key, stamping it with the current time.
    pub fn set(&self, key: &str, value: serde_json::Value) -> Result<()> {
        let mut entries = self.load()?;
        entries.insert(
            key.to_string(),
            CacheEntry {
                timestamp: now_secs(),
                value,
            },
        );
        self.store(&entries)
    }

    /// Drop a single entry (e.g. after a contract update invalidates it).
    pub fn invalidate(&self, key: &str) -> Result<()> {
        let mut entries = self.load()?;
        if entries.remove(key).is_some() {
            self.store(&entries)?;
        }
        Ok(())
    }

    /// Drop every entry under a key prefix. A write invalidates all of the
    /// agent's cached pages at once; keys are `agent:filter:page`.
    pub fn invalidate_prefix(&self, prefix: &str) -> Result<usize> {
        let mut entries = self.load()?;
        let before = entries.len();
        entries.retain(|key, _| !key.starts_with(prefix));
        let dropped = before - entries.len();
        if dropped > 0 {
            self.store(&entries)?;
        }
        Ok(dropped)
    }

    fn is_live(&self, timestamp: u64) -> bool {
        now_secs().saturating_sub(timestamp) < self.ttl.as_secs()
    }

    fn load(&self) -> Result<HashMap<String, CacheEntry>> {
        if !self.path.exists() {
            return Ok(HashMap::new());
        }
        let raw = std::fs::read_to_string(&self.path)?;
        if raw.trim().is_empty() {
            return Ok(HashMap::new());
        }
        serde_json::from_str(&raw).map_err(|e| VitrinaError::json(self.path.display().to_string(), e))
    }

    fn store(&self, entries: &HashMap<String, CacheEntry>) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let raw = serde_json::to_string_pretty(entries)
            .map_err(|e| VitrinaError::json("cache serialization", e))?;
        std::fs::write(&self.path, raw)?;
        Ok(())
    }
}

fn now_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}
