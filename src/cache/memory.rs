use async_trait::async_trait;
use moka::future::Cache;

use super::{CachedLink, LinkCache};

/// In-process cache backend. Entries live until evicted by capacity or
/// removed by the purge run; there is no TTL, matching the shared
/// backend's behavior.
pub struct MemoryCache {
    entries: Cache<String, CachedLink>,
}

impl MemoryCache {
    pub fn new(max_entries: u64) -> Self {
        let entries = Cache::builder().max_capacity(max_entries).build();
        Self { entries }
    }
}

#[async_trait]
impl LinkCache for MemoryCache {
    async fn get(&self, url_code: &str) -> Option<CachedLink> {
        self.entries.get(url_code).await
    }

    async fn put(&self, url_code: &str, entry: CachedLink) {
        self.entries.insert(url_code.to_string(), entry).await;
    }

    async fn remove(&self, url_code: &str) -> anyhow::Result<()> {
        self.entries.invalidate(url_code).await;
        Ok(())
    }
}
