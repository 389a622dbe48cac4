//! Last-viewed page persistence
//!
//! The per-document page map lives under one well-known key in the shared
//! cache. Position memory is a convenience, never correctness-critical
//! state: cache failures are logged and ignored, and concurrent writers
//! are tolerated because the whole map is rewritten last-write-wins.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::cache::SharedCache;

/// Cache key holding the per-document page map.
pub const CURRENT_PAGE_CACHE_KEY: &str = "docpane-current-page";

#[derive(Debug, Serialize, Deserialize)]
struct PageEntry {
    page: u32,
    last_viewed: DateTime<Utc>,
}

/// Reads and writes the last-viewed page map through the shared cache.
pub struct PageMemory {
    cache: Box<dyn SharedCache>,
}

impl PageMemory {
    #[must_use]
    pub fn new(cache: Box<dyn SharedCache>) -> Self {
        Self { cache }
    }

    /// The cached page for `document_id`, or `1` when nothing is cached.
    #[must_use]
    pub fn cached_page(&mut self, document_id: &str) -> u32 {
        if !self.cache.has(CURRENT_PAGE_CACHE_KEY) {
            return 1;
        }

        self.cache
            .get(CURRENT_PAGE_CACHE_KEY)
            .as_ref()
            .and_then(|map| map.get(document_id))
            .and_then(|raw| serde_json::from_value::<PageEntry>(raw.clone()).ok())
            .map_or(1, |entry| entry.page)
    }

    /// Record `page` as the last-viewed page for `document_id`. The whole
    /// map is read, updated, and written back in one `set`.
    pub fn cache_page(&mut self, document_id: &str, page: u32) {
        let mut map = self.page_map();

        let entry = PageEntry {
            page,
            last_viewed: Utc::now(),
        };
        match serde_json::to_value(entry) {
            Ok(value) => {
                map.insert(document_id.to_string(), value);
            }
            Err(err) => {
                log::warn!("could not encode page entry for {document_id}: {err}");
                return;
            }
        }

        if let Err(err) = self.cache.set(CURRENT_PAGE_CACHE_KEY, Value::Object(map)) {
            log::warn!("could not persist page {page} for {document_id}: {err:#}");
        }
    }

    /// Drop the remembered page for `document_id`. Releases the cache key
    /// entirely once the map is empty.
    pub fn forget(&mut self, document_id: &str) {
        let mut map = self.page_map();
        if map.remove(document_id).is_none() {
            return;
        }

        let result = if map.is_empty() {
            self.cache.unset(CURRENT_PAGE_CACHE_KEY)
        } else {
            self.cache.set(CURRENT_PAGE_CACHE_KEY, Value::Object(map))
        };
        if let Err(err) = result {
            log::warn!("could not forget page for {document_id}: {err:#}");
        }
    }

    fn page_map(&mut self) -> Map<String, Value> {
        if !self.cache.has(CURRENT_PAGE_CACHE_KEY) {
            return Map::new();
        }

        match self.cache.get(CURRENT_PAGE_CACHE_KEY) {
            Some(Value::Object(map)) => map,
            _ => Map::new(),
        }
    }
}
