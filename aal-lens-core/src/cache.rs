use aal_lens_common::Result;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

#[derive(Debug, Serialize, Deserialize)]
struct CachedResponse {
    fetched_at: u64, // unix timestamp secs
    url: String,
    body: Value,
}

/// On-disk cache of API response bodies keyed by request URL.
#[derive(Debug, Clone)]
pub struct ResponseCache {
    dir: PathBuf,
    ttl_secs: u64,
}

fn now_secs() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

fn url_hash(url: &str) -> u64 {
    xxhash_rust::xxh3::xxh3_64(url.as_bytes())
}

impl ResponseCache {
    pub fn new(ttl_secs: u64) -> Self {
        let dir = dirs::cache_dir().unwrap_or_else(|| PathBuf::from(".")).join("aal-lens");
        Self { dir, ttl_secs }
    }

    pub fn with_dir(dir: impl Into<PathBuf>, ttl_secs: u64) -> Self {
        Self { dir: dir.into(), ttl_secs }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn entry_path(&self, url: &str) -> PathBuf {
        self.dir.join(format!("http_{:016x}.json", url_hash(url)))
    }

    /// Cached body for `url` if present, fresh, and recorded for the same URL.
    pub fn get(&self, url: &str) -> Option<Value> {
        let raw = std::fs::read_to_string(self.entry_path(url)).ok()?;
        let entry: CachedResponse = match serde_json::from_str(&raw) {
            Ok(e) => e,
            Err(e) => {
                warn!(url, error = %e, "discarding unreadable cache entry");
                return None;
            }
        };
        if entry.url != url {
            return None;
        }
        let age = now_secs().saturating_sub(entry.fetched_at);
        if age > self.ttl_secs {
            debug!(url, age, "cache entry expired");
            return None;
        }
        debug!(url, age, "cache hit");
        Some(entry.body)
    }

    pub fn put(&self, url: &str, body: &Value) -> Result<()> {
        std::fs::create_dir_all(&self.dir)?;
        let entry = CachedResponse { fetched_at: now_secs(), url: url.to_owned(), body: body.clone() };
        std::fs::write(self.entry_path(url), serde_json::to_string(&entry)?)?;
        Ok(())
    }

    /// Remove every cached response. Returns how many were deleted.
    pub fn clear(&self) -> Result<usize> {
        let Ok(entries) = std::fs::read_dir(&self.dir) else {
            return Ok(0);
        };
        let mut removed = 0;
        for entry in entries {
            let path = entry?.path();
            let is_http = path
                .file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|n| n.starts_with("http_") && n.ends_with(".json"));
            if is_http {
                std::fs::remove_file(&path)?;
                removed += 1;
            }
        }
        Ok(removed)
    }
}

#[cfg(test)]
mod tests_cache {
    use super::*;
    use serde_json::json;

    #[test]
    fn put_then_get() {
        let tmp = tempfile::tempdir().unwrap();
        let cache = ResponseCache::with_dir(tmp.path(), 60);
        let url = "http://localhost:5000/api/aal-provinsi-list";
        assert!(cache.get(url).is_none());
        cache.put(url, &json!(["Aceh", "Bali"])).unwrap();
        assert_eq!(cache.get(url), Some(json!(["Aceh", "Bali"])));
        assert!(cache.get("http://localhost:5000/api/other").is_none());
    }

    #[test]
    fn expired_entries_are_ignored() {
        let tmp = tempfile::tempdir().unwrap();
        let cache = ResponseCache::with_dir(tmp.path(), 60);
        let url = "http://x/api/gedung";
        let stale = CachedResponse { fetched_at: now_secs() - 120, url: url.into(), body: json!(1) };
        std::fs::write(cache.entry_path(url), serde_json::to_string(&stale).unwrap()).unwrap();
        assert!(cache.get(url).is_none());
    }

    #[test]
    fn corrupt_entry_is_a_miss_and_clear_removes() {
        let tmp = tempfile::tempdir().unwrap();
        let cache = ResponseCache::with_dir(tmp.path(), 60);
        std::fs::write(cache.entry_path("u"), "{not json").unwrap();
        assert!(cache.get("u").is_none());
        cache.put("v", &json!({})).unwrap();
        std::fs::write(tmp.path().join("keep.txt"), "x").unwrap();
        assert_eq!(cache.clear().unwrap(), 2);
        assert!(tmp.path().join("keep.txt").exists());
    }
}
