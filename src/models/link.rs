use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A stored short link. Timestamps are unix epoch seconds (UTC).
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct ShortLink {
    pub id: i64,
    pub original_url: String,
    pub url_code: String,
    pub short_url: String,
    pub owner_id: String,
    pub click_count: i64,
    pub last_clicked_at: i64,
    pub created_at: i64,
    pub updated_at: i64,
}

/// Fields supplied when persisting a new link; the store stamps ids,
/// counters and timestamps itself.
#[derive(Debug, Clone)]
pub struct NewLink {
    pub original_url: String,
    pub url_code: String,
    pub short_url: String,
    pub owner_id: String,
}

#[derive(Debug, Deserialize)]
pub struct ShortenRequest {
    pub url: String,
}
