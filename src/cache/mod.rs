mod memory;
mod redis;

pub use memory::MemoryCache;
pub use redis::RedisCache;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// The looked-aside projection of a link: just enough to serve a redirect
/// without touching the link store. Serialized field names match the wire
/// layout shared with other consumers of the cache.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CachedLink {
    #[serde(rename = "urlId")]
    pub link_id: i64,
    #[serde(rename = "url")]
    pub original_url: String,
}

/// Lookaside cache keyed by short code.
///
/// Entries are a disposable projection of the link store: `get` degrades
/// any backend failure to a miss, `put` is best-effort, and only `remove`
/// reports failure so the purge run can log skipped evictions.
#[async_trait]
pub trait LinkCache: Send + Sync {
    async fn get(&self, url_code: &str) -> Option<CachedLink>;

    async fn put(&self, url_code: &str, entry: CachedLink);

    async fn remove(&self, url_code: &str) -> anyhow::Result<()>;
}
