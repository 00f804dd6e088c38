use crate::models::{
    AnalyticsEvent, BrowserCount, DeviceCount, HourBucket, NewEvent, NewLink, ReferrerCount,
    ShortLink,
};
use anyhow::Result;
use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("link already exists")]
    Conflict,
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Persistent source of truth for short links.
#[async_trait]
pub trait LinkStore: Send + Sync {
    /// Initialize the link schema (tables, indexes)
    async fn init(&self) -> Result<()>;

    /// Persist a new link. Fails with [`StoreError::Conflict`] when either
    /// the code or the (original_url, owner_id) pair is already taken.
    async fn insert(&self, link: NewLink) -> StoreResult<ShortLink>;

    /// Look up a link by its short code
    async fn find_by_code(&self, url_code: &str) -> Result<Option<ShortLink>>;

    /// Look up a link by primary key
    async fn find_by_id(&self, id: i64) -> Result<Option<ShortLink>>;

    /// Exact (owner, original URL) lookup backing idempotent shortens
    async fn find_by_owner_and_url(
        &self,
        owner_id: &str,
        original_url: &str,
    ) -> Result<Option<ShortLink>>;

    /// All links owned by `owner_id`, newest first
    async fn list_by_owner(&self, owner_id: &str) -> Result<Vec<ShortLink>>;

    /// Atomically add one click and stamp `last_clicked_at`. Returns false
    /// when the link no longer exists.
    async fn record_click(&self, id: i64, at: i64) -> Result<bool>;

    /// Links created at or before `cutoff` (unix seconds)
    async fn find_created_before(&self, cutoff: i64) -> Result<Vec<ShortLink>>;

    /// Bulk-delete links created at or before `cutoff`; returns how many
    /// rows went away.
    async fn delete_created_before(&self, cutoff: i64) -> Result<u64>;
}

/// Append-mostly store for per-visit records and their rollups.
#[async_trait]
pub trait AnalyticsStore: Send + Sync {
    /// Initialize the analytics schema (tables, indexes)
    async fn init(&self) -> Result<()>;

    /// Record one visit. Absent metadata fields are persisted with their
    /// documented fallbacks ("direct" / "unknown" / "other").
    async fn insert_event(&self, event: NewEvent) -> Result<()>;

    /// All events recorded for a link, oldest first. The serving path only
    /// reads the grouped rollups below; this raw listing exists so callers
    /// and tests can inspect what a visit actually wrote.
    async fn find_events(&self, link_id: i64) -> Result<Vec<AnalyticsEvent>>;

    /// Visit counts grouped by referral source (group order unspecified)
    async fn count_referrers(&self, link_id: i64) -> Result<Vec<ReferrerCount>>;

    /// Visit counts grouped by browser name (group order unspecified)
    async fn count_browsers(&self, link_id: i64) -> Result<Vec<BrowserCount>>;

    /// Visit counts grouped by device category (group order unspecified)
    async fn count_devices(&self, link_id: i64) -> Result<Vec<DeviceCount>>;

    /// Visit counts per (calendar date, hour of day) in UTC, busiest
    /// buckets first. Equal-count buckets come back in backend order.
    async fn hour_buckets(&self, link_id: i64) -> Result<Vec<HourBucket>>;

    /// Delete every event belonging to one of `link_ids`; returns how many
    /// rows went away.
    async fn delete_for_links(&self, link_ids: &[i64]) -> Result<u64>;
}
