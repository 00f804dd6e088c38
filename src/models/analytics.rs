use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Recorded value when a visit carries no Referer header.
pub const DIRECT_REFERRER: &str = "direct";
/// Recorded value when the browser cannot be identified.
pub const UNKNOWN_BROWSER: &str = "unknown";
/// Recorded value when the device category cannot be identified.
pub const OTHER_DEVICE: &str = "other";

/// Per-visit context captured at the redirect edge. Every field is
/// optional; the analytics store substitutes the documented fallback
/// when a field is absent.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HitMetadata {
    pub referral_source: Option<String>,
    pub browser_type: Option<String>,
    pub device_type: Option<String>,
}

impl HitMetadata {
    pub fn referrer(&self) -> &str {
        self.referral_source.as_deref().unwrap_or(DIRECT_REFERRER)
    }

    pub fn browser(&self) -> &str {
        self.browser_type.as_deref().unwrap_or(UNKNOWN_BROWSER)
    }

    pub fn device(&self) -> &str {
        self.device_type.as_deref().unwrap_or(OTHER_DEVICE)
    }
}

/// One visit to record against a link. `recorded_at` is the event time in
/// unix epoch seconds and doubles as the bucket key for hourly rollups.
#[derive(Debug, Clone)]
pub struct NewEvent {
    pub link_id: i64,
    pub meta: HitMetadata,
    pub recorded_at: i64,
}

/// A persisted visit record, with metadata fallbacks already applied.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct AnalyticsEvent {
    pub id: i64,
    pub link_id: i64,
    pub referral_source: String,
    pub browser_type: String,
    pub device_type: String,
    pub created_at: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ReferrerCount {
    pub referral_source: String,
    pub total_count: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct BrowserCount {
    pub browser_name: String,
    pub total_count: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct DeviceCount {
    pub device_type: String,
    pub total_count: i64,
}

/// One (calendar date, hour of day) visit bucket as produced by the
/// analytics store. `hour` is 0-23 in UTC.
#[derive(Debug, Clone, FromRow, PartialEq, Eq)]
pub struct HourBucket {
    pub date: String,
    pub hour: i32,
    pub hits: i64,
}

/// The busiest hour of one calendar date, with the hour rendered on a
/// 12-hour clock ("12 AM", "3 PM").
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PeakHourEntry {
    pub hour: String,
    pub hit_count: i64,
}

/// Everything the analytics endpoint returns for one link.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyticsSummary {
    pub click_count: i64,
    pub referrers_data: Vec<ReferrerCount>,
    pub browsers_data: Vec<BrowserCount>,
    pub devices_data: Vec<DeviceCount>,
    pub peak_hours: BTreeMap<String, PeakHourEntry>,
}
