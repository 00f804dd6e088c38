use async_trait::async_trait;
use redis::{aio::MultiplexedConnection, AsyncCommands};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, error, trace};

use super::{CachedLink, LinkCache};

/// Redis cache backend for deployments where several instances share one
/// lookaside store. Values are JSON strings keyed by namespaced code.
pub struct RedisCache {
    client: redis::Client,
    // Persistent multiplexed connection, rebuilt after errors
    connection: Arc<RwLock<Option<MultiplexedConnection>>>,
    namespace: String,
}

impl RedisCache {
    pub fn new(url: &str, namespace: &str) -> anyhow::Result<Self> {
        let client = redis::Client::open(url)?;
        Ok(Self {
            client,
            connection: Arc::new(RwLock::new(None)),
            namespace: namespace.to_string(),
        })
    }

    async fn connection(&self) -> Result<MultiplexedConnection, redis::RedisError> {
        {
            let conn_guard = self.connection.read().await;
            if let Some(ref conn) = *conn_guard {
                return Ok(conn.clone());
            }
        }

        let mut conn_guard = self.connection.write().await;

        // Another task may have connected while we waited for the lock
        if let Some(ref conn) = *conn_guard {
            return Ok(conn.clone());
        }

        let new_conn = self.client.get_multiplexed_async_connection().await?;
        *conn_guard = Some(new_conn.clone());
        debug!("redis connection established and cached");

        Ok(new_conn)
    }

    async fn reset_connection(&self) {
        let mut conn_guard = self.connection.write().await;
        *conn_guard = None;
        debug!("redis connection reset after error");
    }

    fn entry_key(&self, url_code: &str) -> String {
        format!("{}:{}", self.namespace, url_code)
    }
}

#[async_trait]
impl LinkCache for RedisCache {
    async fn get(&self, url_code: &str) -> Option<CachedLink> {
        let key = self.entry_key(url_code);

        let mut conn = match self.connection().await {
            Ok(c) => c,
            Err(e) => {
                error!("failed to get redis connection: {e}");
                self.reset_connection().await;
                return None;
            }
        };

        let result: redis::RedisResult<Option<String>> = conn.get(&key).await;

        match result {
            Ok(Some(data)) => match serde_json::from_str(&data) {
                Ok(entry) => {
                    trace!("cache hit for code '{url_code}'");
                    Some(entry)
                }
                Err(e) => {
                    error!("failed to deserialize cache entry for '{url_code}': {e}");
                    None
                }
            },
            Ok(None) => {
                trace!("cache miss for code '{url_code}'");
                None
            }
            Err(e) => {
                error!("failed to read cache key '{url_code}': {e}");
                self.reset_connection().await;
                None
            }
        }
    }

    async fn put(&self, url_code: &str, entry: CachedLink) {
        let key = self.entry_key(url_code);

        let mut conn = match self.connection().await {
            Ok(c) => c,
            Err(e) => {
                error!("failed to get redis connection: {e}");
                self.reset_connection().await;
                return;
            }
        };

        let payload = match serde_json::to_string(&entry) {
            Ok(p) => p,
            Err(e) => {
                error!("failed to serialize cache entry for '{url_code}': {e}");
                return;
            }
        };

        match conn.set::<String, String, ()>(key, payload).await {
            Ok(_) => trace!("cached code '{url_code}'"),
            Err(e) => {
                error!("failed to write cache key '{url_code}': {e}");
                self.reset_connection().await;
            }
        }
    }

    async fn remove(&self, url_code: &str) -> anyhow::Result<()> {
        let key = self.entry_key(url_code);

        let mut conn = match self.connection().await {
            Ok(c) => c,
            Err(e) => {
                self.reset_connection().await;
                return Err(e.into());
            }
        };

        match conn.del::<String, i64>(key).await {
            Ok(_) => Ok(()),
            Err(e) => {
                self.reset_connection().await;
                Err(e.into())
            }
        }
    }
}
