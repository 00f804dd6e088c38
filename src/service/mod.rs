use std::collections::BTreeMap;
use std::sync::Arc;

use anyhow::anyhow;
use chrono::Utc;
use tracing::{debug, error, warn};

use crate::cache::{CachedLink, LinkCache};
use crate::codegen;
use crate::error::{ServiceError, ServiceResult};
use crate::models::{
    AnalyticsSummary, HitMetadata, HourBucket, NewEvent, NewLink, PeakHourEntry, ShortLink,
};
use crate::store::{AnalyticsStore, LinkStore, StoreError};

/// How many fresh codes a shorten attempt may try before giving up.
const MAX_CODE_ATTEMPTS: u32 = 5;

/// Outcome of one purge run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PurgeOutcome {
    pub links_deleted: u64,
    pub events_deleted: u64,
}

/// Core engine tying the link store, analytics store and lookaside cache
/// together. Handlers and the purge scheduler share one instance.
pub struct ResolutionService {
    links: Arc<dyn LinkStore>,
    analytics: Arc<dyn AnalyticsStore>,
    cache: Arc<dyn LinkCache>,
    short_url_prefix: String,
    retention_secs: i64,
}

impl ResolutionService {
    pub fn new(
        links: Arc<dyn LinkStore>,
        analytics: Arc<dyn AnalyticsStore>,
        cache: Arc<dyn LinkCache>,
        short_url_prefix: String,
        retention_secs: u64,
    ) -> Self {
        Self {
            links,
            analytics,
            cache,
            short_url_prefix,
            retention_secs: retention_secs as i64,
        }
    }

    fn short_url(&self, url_code: &str) -> String {
        format!("{}link/{}", self.short_url_prefix, url_code)
    }

    /// Shorten `original_url` for `owner_id`, reusing the existing link if
    /// this owner already shortened the same URL. Returns the short URL.
    pub async fn shorten_url(&self, original_url: &str, owner_id: &str) -> ServiceResult<String> {
        if let Some(existing) = self
            .links
            .find_by_owner_and_url(owner_id, original_url)
            .await?
        {
            return Ok(existing.short_url);
        }

        for _ in 0..MAX_CODE_ATTEMPTS {
            let code = codegen::generate_code();
            let link = NewLink {
                original_url: original_url.to_string(),
                url_code: code.clone(),
                short_url: self.short_url(&code),
                owner_id: owner_id.to_string(),
            };

            match self.links.insert(link).await {
                Ok(stored) => {
                    self.cache
                        .put(
                            &stored.url_code,
                            CachedLink {
                                link_id: stored.id,
                                original_url: stored.original_url.clone(),
                            },
                        )
                        .await;
                    return Ok(stored.short_url);
                }
                Err(StoreError::Conflict) => {
                    // Either a concurrent shorten of the same (URL, owner)
                    // pair or a code collision; a re-query tells them apart.
                    if let Some(existing) = self
                        .links
                        .find_by_owner_and_url(owner_id, original_url)
                        .await?
                    {
                        return Ok(existing.short_url);
                    }
                    debug!(code, "short code collided, regenerating");
                }
                Err(StoreError::Other(err)) => return Err(ServiceError::Internal(err)),
            }
        }

        Err(ServiceError::Internal(anyhow!(
            "could not allocate a unique short code after {MAX_CODE_ATTEMPTS} attempts"
        )))
    }

    /// Resolve a short code to its original URL, recording the visit off
    /// the request path. Cache misses fall through to the link store and
    /// repopulate the cache.
    pub async fn resolve_url(&self, url_code: &str, meta: HitMetadata) -> ServiceResult<String> {
        let entry = match self.cache.get(url_code).await {
            Some(entry) => entry,
            None => {
                let link = self
                    .links
                    .find_by_code(url_code)
                    .await?
                    .ok_or(ServiceError::NotFound)?;
                let entry = CachedLink {
                    link_id: link.id,
                    original_url: link.original_url,
                };
                self.cache.put(url_code, entry.clone()).await;
                entry
            }
        };

        self.spawn_hit_recording(url_code, entry.link_id, meta);

        Ok(entry.original_url)
    }

    /// Record one visit without holding up the redirect: bump the click
    /// counter, then append the analytics event. The task outlives the
    /// request and reports failures only to the log.
    fn spawn_hit_recording(&self, url_code: &str, link_id: i64, meta: HitMetadata) {
        let links = Arc::clone(&self.links);
        let analytics = Arc::clone(&self.analytics);
        let cache = Arc::clone(&self.cache);
        let url_code = url_code.to_string();

        tokio::spawn(async move {
            let now = Utc::now().timestamp();

            match links.record_click(link_id, now).await {
                Ok(true) => {}
                Ok(false) => {
                    // The cache served a link the store no longer has, most
                    // likely one the purge removed underneath a shared
                    // cache. Evict so the next resolve sees the truth.
                    warn!(url_code, link_id, "cached link no longer in store, evicting");
                    if let Err(err) = cache.remove(&url_code).await {
                        warn!(url_code, error = %err, "failed to evict stale cache entry");
                    }
                    return;
                }
                Err(err) => {
                    error!(link_id, error = %err, "failed to record click");
                }
            }

            if let Err(err) = analytics
                .insert_event(NewEvent {
                    link_id,
                    meta,
                    recorded_at: now,
                })
                .await
            {
                error!(link_id, error = %err, "failed to record analytics event");
            }
        });
    }

    /// All links owned by `owner_id`, newest first.
    pub async fn fetch_owner_links(&self, owner_id: &str) -> ServiceResult<Vec<ShortLink>> {
        let links = self.links.list_by_owner(owner_id).await?;
        Ok(links)
    }

    /// The full analytics summary for one link, visible only to its owner.
    pub async fn get_analytics(
        &self,
        link_id: i64,
        requester_id: &str,
    ) -> ServiceResult<AnalyticsSummary> {
        let link = self
            .links
            .find_by_id(link_id)
            .await?
            .ok_or(ServiceError::NotFound)?;

        if link.owner_id != requester_id {
            return Err(ServiceError::Forbidden);
        }

        let (referrers, browsers, devices, buckets) = tokio::try_join!(
            self.analytics.count_referrers(link_id),
            self.analytics.count_browsers(link_id),
            self.analytics.count_devices(link_id),
            self.analytics.hour_buckets(link_id),
        )?;

        Ok(AnalyticsSummary {
            click_count: link.click_count,
            referrers_data: referrers,
            browsers_data: browsers,
            devices_data: devices,
            peak_hours: collapse_peak_hours(buckets),
        })
    }

    /// Remove links older than the retention window together with their
    /// analytics events and cache entries. Failed cache evictions are
    /// logged and left for the stale-entry path to mop up.
    pub async fn purge_expired(&self) -> ServiceResult<PurgeOutcome> {
        let cutoff = Utc::now().timestamp() - self.retention_secs;

        let expired = self.links.find_created_before(cutoff).await?;
        if expired.is_empty() {
            return Ok(PurgeOutcome::default());
        }

        let link_ids: Vec<i64> = expired.iter().map(|l| l.id).collect();

        let evictions = async {
            for link in &expired {
                if let Err(err) = self.cache.remove(&link.url_code).await {
                    warn!(code = link.url_code, error = %err, "failed to evict cache entry during purge");
                }
            }
        };

        let (_, links_deleted, events_deleted) = tokio::join!(
            evictions,
            self.links.delete_created_before(cutoff),
            self.analytics.delete_for_links(&link_ids),
        );

        let mut outcome = PurgeOutcome::default();
        let mut first_err = None;

        match links_deleted {
            Ok(n) => outcome.links_deleted = n,
            Err(err) => {
                error!(error = %err, "failed to delete expired links");
                first_err.get_or_insert(err);
            }
        }
        match events_deleted {
            Ok(n) => outcome.events_deleted = n,
            Err(err) => {
                error!(error = %err, "failed to delete analytics events for expired links");
                first_err.get_or_insert(err);
            }
        }

        match first_err {
            None => Ok(outcome),
            Some(err) => Err(ServiceError::Internal(err)),
        }
    }
}

/// Reduce (date, hour) buckets, already ordered busiest first, to the
/// single peak hour of each calendar date. Ties keep whichever bucket the
/// store listed first.
fn collapse_peak_hours(buckets: Vec<HourBucket>) -> BTreeMap<String, PeakHourEntry> {
    let mut peaks = BTreeMap::new();
    for bucket in buckets {
        let HourBucket { date, hour, hits } = bucket;
        peaks.entry(date).or_insert_with(|| PeakHourEntry {
            hour: format_hour_12h(hour),
            hit_count: hits,
        });
    }
    peaks
}

/// Render an hour of day (0-23) on a 12-hour clock.
fn format_hour_12h(hour: i32) -> String {
    match hour {
        0 => "12 AM".to_string(),
        12 => "12 PM".to_string(),
        h if h < 12 => format!("{h} AM"),
        h => format!("{} PM", h - 12),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_hour_12h() {
        assert_eq!(format_hour_12h(0), "12 AM");
        assert_eq!(format_hour_12h(1), "1 AM");
        assert_eq!(format_hour_12h(11), "11 AM");
        assert_eq!(format_hour_12h(12), "12 PM");
        assert_eq!(format_hour_12h(13), "1 PM");
        assert_eq!(format_hour_12h(23), "11 PM");
    }

    fn bucket(date: &str, hour: i32, hits: i64) -> HourBucket {
        HourBucket {
            date: date.to_string(),
            hour,
            hits,
        }
    }

    #[test]
    fn test_collapse_keeps_first_bucket_per_date() {
        let buckets = vec![
            bucket("2024-03-15", 10, 5),
            bucket("2024-03-16", 22, 4),
            bucket("2024-03-15", 14, 3),
            bucket("2024-03-16", 7, 1),
        ];

        let peaks = collapse_peak_hours(buckets);
        assert_eq!(peaks.len(), 2);
        assert_eq!(
            peaks["2024-03-15"],
            PeakHourEntry {
                hour: "10 AM".to_string(),
                hit_count: 5,
            }
        );
        assert_eq!(
            peaks["2024-03-16"],
            PeakHourEntry {
                hour: "10 PM".to_string(),
                hit_count: 4,
            }
        );
    }

    #[test]
    fn test_collapse_tie_picks_a_maximal_bucket() {
        // Two buckets share the top count; either may win but the winner
        // must carry the maximal count
        let buckets = vec![
            bucket("2024-03-15", 9, 3),
            bucket("2024-03-15", 17, 3),
            bucket("2024-03-15", 11, 1),
        ];

        let peaks = collapse_peak_hours(buckets);
        let peak = &peaks["2024-03-15"];
        assert_eq!(peak.hit_count, 3);
        assert!(peak.hour == "9 AM" || peak.hour == "5 PM");
    }

    #[test]
    fn test_collapse_empty_input() {
        let peaks = collapse_peak_hours(Vec::new());
        assert!(peaks.is_empty());
    }
}
