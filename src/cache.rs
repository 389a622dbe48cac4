//! Shared cache collaborator
//!
//! Cross-session convenience state (like last-viewed pages) lives in a
//! cache shared with the embedder and with other viewer instances. The
//! viewer only reads and writes through this seam and never assumes
//! exclusive ownership: `has`/`get` are snapshots, and the only
//! persistence guarantee is last-write-wins per key.

use std::collections::HashMap;
use std::fs;
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};

use anyhow::Result;
use lru::LruCache;
use serde_json::Value;

/// Key/value store shared across viewer instances.
pub trait SharedCache {
    fn has(&self, key: &str) -> bool;
    fn get(&mut self, key: &str) -> Option<Value>;
    fn set(&mut self, key: &str, value: Value) -> Result<()>;
    fn unset(&mut self, key: &str) -> Result<()>;
}

const DEFAULT_CAPACITY: usize = 256;

/// Bounded in-memory cache. Old keys are evicted least-recently-used,
/// which is acceptable for convenience state.
pub struct MemoryCache {
    entries: LruCache<String, Value>,
}

impl MemoryCache {
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: LruCache::new(
                NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::new(1).expect("1 is non-zero")),
            ),
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for MemoryCache {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl SharedCache for MemoryCache {
    fn has(&self, key: &str) -> bool {
        self.entries.contains(key)
    }

    fn get(&mut self, key: &str) -> Option<Value> {
        self.entries.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: Value) -> Result<()> {
        self.entries.put(key.to_string(), value);
        Ok(())
    }

    fn unset(&mut self, key: &str) -> Result<()> {
        self.entries.pop(key);
        Ok(())
    }
}

/// JSON-file backed cache for embedders without their own store. Every
/// write persists the whole map; a corrupt or missing file starts empty.
pub struct JsonFileCache {
    entries: HashMap<String, Value>,
    path: PathBuf,
}

impl JsonFileCache {
    /// Load the cache from `path`, starting empty if the file is missing
    /// or unreadable.
    #[must_use]
    pub fn load_or_empty(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref().to_path_buf();
        let entries = match fs::read_to_string(&path) {
            Ok(content) => serde_json::from_str(&content).unwrap_or_else(|err| {
                log::error!("discarding unreadable cache file {}: {err}", path.display());
                HashMap::new()
            }),
            Err(_) => HashMap::new(),
        };
        Self { entries, path }
    }

    fn persist(&self) -> Result<()> {
        let content = serde_json::to_string_pretty(&self.entries)?;
        fs::write(&self.path, content)?;
        Ok(())
    }
}

impl SharedCache for JsonFileCache {
    fn has(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    fn get(&mut self, key: &str) -> Option<Value> {
        self.entries.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: Value) -> Result<()> {
        self.entries.insert(key.to_string(), value);
        self.persist()
    }

    fn unset(&mut self, key: &str) -> Result<()> {
        self.entries.remove(key);
        self.persist()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn memory_cache_set_get_unset() {
        let mut cache = MemoryCache::default();

        assert!(!cache.has("k"));
        assert_eq!(cache.get("k"), None);

        cache.set("k", json!({"page": 3})).unwrap();
        assert!(cache.has("k"));
        assert_eq!(cache.get("k"), Some(json!({"page": 3})));

        cache.unset("k").unwrap();
        assert!(!cache.has("k"));
    }

    #[test]
    fn memory_cache_evicts_least_recently_used() {
        let mut cache = MemoryCache::new(2);

        cache.set("a", json!(1)).unwrap();
        cache.set("b", json!(2)).unwrap();
        cache.set("c", json!(3)).unwrap();

        assert!(!cache.has("a"));
        assert!(cache.has("b"));
        assert!(cache.has("c"));
    }

    #[test]
    fn file_cache_round_trips_across_loads() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cache.json");

        {
            let mut cache = JsonFileCache::load_or_empty(&path);
            cache.set("doc", json!({"1": 7})).unwrap();
        }

        let mut reloaded = JsonFileCache::load_or_empty(&path);
        assert_eq!(reloaded.get("doc"), Some(json!({"1": 7})));
    }

    #[test]
    fn file_cache_starts_empty_on_corrupt_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cache.json");
        fs::write(&path, "not json").unwrap();

        let cache = JsonFileCache::load_or_empty(&path);
        assert!(!cache.has("doc"));
    }
}
