use crate::models::{
    AnalyticsEvent, BrowserCount, DeviceCount, HourBucket, NewEvent, NewLink, ReferrerCount,
    ShortLink,
};
use crate::store::{AnalyticsStore, LinkStore, StoreError, StoreResult};
use anyhow::Result;
use async_trait::async_trait;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use std::sync::Arc;

pub struct PostgresStore {
    pool: Arc<PgPool>,
}

impl PostgresStore {
    pub async fn new(database_url: &str, max_connections: u32) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await?;
        Ok(Self {
            pool: Arc::new(pool),
        })
    }
}

fn unix_now() -> Result<i64> {
    let now = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)?
        .as_secs() as i64;
    Ok(now)
}

const LINK_COLUMNS: &str =
    "id, original_url, url_code, short_url, owner_id, click_count, last_clicked_at, created_at, updated_at";

#[async_trait]
impl LinkStore for PostgresStore {
    async fn init(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS links (
                id BIGSERIAL PRIMARY KEY,
                original_url TEXT NOT NULL,
                url_code TEXT NOT NULL UNIQUE,
                short_url TEXT NOT NULL,
                owner_id TEXT NOT NULL,
                click_count BIGINT NOT NULL DEFAULT 0,
                last_clicked_at BIGINT NOT NULL,
                created_at BIGINT NOT NULL,
                updated_at BIGINT NOT NULL
            )
            "#,
        )
        .execute(self.pool.as_ref())
        .await?;

        // One short link per (original URL, owner); shortening is idempotent
        sqlx::query(
            "CREATE UNIQUE INDEX IF NOT EXISTS idx_links_owner_url ON links(original_url, owner_id)",
        )
        .execute(self.pool.as_ref())
        .await?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_links_owner ON links(owner_id)")
            .execute(self.pool.as_ref())
            .await?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_links_created_at ON links(created_at)")
            .execute(self.pool.as_ref())
            .await?;

        Ok(())
    }

    async fn insert(&self, link: NewLink) -> StoreResult<ShortLink> {
        let now = unix_now().map_err(StoreError::Other)?;

        let stored = sqlx::query_as::<_, ShortLink>(&format!(
            r#"
            INSERT INTO links (original_url, url_code, short_url, owner_id, click_count, last_clicked_at, created_at, updated_at)
            VALUES ($1, $2, $3, $4, 0, $5, $6, $7)
            ON CONFLICT DO NOTHING
            RETURNING {LINK_COLUMNS}
            "#
        ))
        .bind(&link.original_url)
        .bind(&link.url_code)
        .bind(&link.short_url)
        .bind(&link.owner_id)
        .bind(now)
        .bind(now)
        .bind(now)
        .fetch_optional(self.pool.as_ref())
        .await
        .map_err(|e| StoreError::Other(e.into()))?;

        stored.ok_or(StoreError::Conflict)
    }

    async fn find_by_code(&self, url_code: &str) -> Result<Option<ShortLink>> {
        let link = sqlx::query_as::<_, ShortLink>(&format!(
            "SELECT {LINK_COLUMNS} FROM links WHERE url_code = $1"
        ))
        .bind(url_code)
        .fetch_optional(self.pool.as_ref())
        .await?;

        Ok(link)
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<ShortLink>> {
        let link = sqlx::query_as::<_, ShortLink>(&format!(
            "SELECT {LINK_COLUMNS} FROM links WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(self.pool.as_ref())
        .await?;

        Ok(link)
    }

    async fn find_by_owner_and_url(
        &self,
        owner_id: &str,
        original_url: &str,
    ) -> Result<Option<ShortLink>> {
        let link = sqlx::query_as::<_, ShortLink>(&format!(
            "SELECT {LINK_COLUMNS} FROM links WHERE owner_id = $1 AND original_url = $2"
        ))
        .bind(owner_id)
        .bind(original_url)
        .fetch_optional(self.pool.as_ref())
        .await?;

        Ok(link)
    }

    async fn list_by_owner(&self, owner_id: &str) -> Result<Vec<ShortLink>> {
        let links = sqlx::query_as::<_, ShortLink>(&format!(
            "SELECT {LINK_COLUMNS} FROM links WHERE owner_id = $1 ORDER BY created_at DESC, id DESC"
        ))
        .bind(owner_id)
        .fetch_all(self.pool.as_ref())
        .await?;

        Ok(links)
    }

    async fn record_click(&self, id: i64, at: i64) -> Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE links
            SET click_count = click_count + 1,
                last_clicked_at = $1,
                updated_at = $1
            WHERE id = $2
            "#,
        )
        .bind(at)
        .bind(id)
        .execute(self.pool.as_ref())
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn find_created_before(&self, cutoff: i64) -> Result<Vec<ShortLink>> {
        let links = sqlx::query_as::<_, ShortLink>(&format!(
            "SELECT {LINK_COLUMNS} FROM links WHERE created_at <= $1"
        ))
        .bind(cutoff)
        .fetch_all(self.pool.as_ref())
        .await?;

        Ok(links)
    }

    async fn delete_created_before(&self, cutoff: i64) -> Result<u64> {
        let result = sqlx::query("DELETE FROM links WHERE created_at <= $1")
            .bind(cutoff)
            .execute(self.pool.as_ref())
            .await?;

        Ok(result.rows_affected())
    }
}

#[async_trait]
impl AnalyticsStore for PostgresStore {
    async fn init(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS link_events (
                id BIGSERIAL PRIMARY KEY,
                link_id BIGINT NOT NULL,
                referral_source TEXT NOT NULL,
                browser_type TEXT NOT NULL,
                device_type TEXT NOT NULL,
                created_at BIGINT NOT NULL
            )
            "#,
        )
        .execute(self.pool.as_ref())
        .await?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_events_link ON link_events(link_id)")
            .execute(self.pool.as_ref())
            .await?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_events_created_at ON link_events(created_at)")
            .execute(self.pool.as_ref())
            .await?;

        Ok(())
    }

    async fn insert_event(&self, event: NewEvent) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO link_events (link_id, referral_source, browser_type, device_type, created_at)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(event.link_id)
        .bind(event.meta.referrer())
        .bind(event.meta.browser())
        .bind(event.meta.device())
        .bind(event.recorded_at)
        .execute(self.pool.as_ref())
        .await?;

        Ok(())
    }

    async fn find_events(&self, link_id: i64) -> Result<Vec<AnalyticsEvent>> {
        let events = sqlx::query_as::<_, AnalyticsEvent>(
            r#"
            SELECT id, link_id, referral_source, browser_type, device_type, created_at
            FROM link_events
            WHERE link_id = $1
            ORDER BY id
            "#,
        )
        .bind(link_id)
        .fetch_all(self.pool.as_ref())
        .await?;

        Ok(events)
    }

    async fn count_referrers(&self, link_id: i64) -> Result<Vec<ReferrerCount>> {
        let counts = sqlx::query_as::<_, ReferrerCount>(
            r#"
            SELECT referral_source, COUNT(*) AS total_count
            FROM link_events
            WHERE link_id = $1
            GROUP BY referral_source
            "#,
        )
        .bind(link_id)
        .fetch_all(self.pool.as_ref())
        .await?;

        Ok(counts)
    }

    async fn count_browsers(&self, link_id: i64) -> Result<Vec<BrowserCount>> {
        let counts = sqlx::query_as::<_, BrowserCount>(
            r#"
            SELECT browser_type AS browser_name, COUNT(*) AS total_count
            FROM link_events
            WHERE link_id = $1
            GROUP BY browser_type
            "#,
        )
        .bind(link_id)
        .fetch_all(self.pool.as_ref())
        .await?;

        Ok(counts)
    }

    async fn count_devices(&self, link_id: i64) -> Result<Vec<DeviceCount>> {
        let counts = sqlx::query_as::<_, DeviceCount>(
            r#"
            SELECT device_type, COUNT(*) AS total_count
            FROM link_events
            WHERE link_id = $1
            GROUP BY device_type
            "#,
        )
        .bind(link_id)
        .fetch_all(self.pool.as_ref())
        .await?;

        Ok(counts)
    }

    async fn hour_buckets(&self, link_id: i64) -> Result<Vec<HourBucket>> {
        let buckets = sqlx::query_as::<_, HourBucket>(
            r#"
            SELECT to_char(to_timestamp(created_at) AT TIME ZONE 'UTC', 'YYYY-MM-DD') AS date,
                   CAST(EXTRACT(HOUR FROM to_timestamp(created_at) AT TIME ZONE 'UTC') AS INTEGER) AS hour,
                   COUNT(*) AS hits
            FROM link_events
            WHERE link_id = $1
            GROUP BY 1, 2
            ORDER BY hits DESC
            "#,
        )
        .bind(link_id)
        .fetch_all(self.pool.as_ref())
        .await?;

        Ok(buckets)
    }

    async fn delete_for_links(&self, link_ids: &[i64]) -> Result<u64> {
        if link_ids.is_empty() {
            return Ok(0);
        }

        let result = sqlx::query("DELETE FROM link_events WHERE link_id = ANY($1)")
            .bind(link_ids)
            .execute(self.pool.as_ref())
            .await?;

        Ok(result.rows_affected())
    }
}
