//! Service flow integration tests
//!
//! These tests drive the resolution service end to end over in-memory
//! SQLite storage: shortening idempotency, cache-aside resolution,
//! visit recording, the retention purge and the purge scheduler.

use std::sync::Arc;
use std::time::Duration;

use curtail::cache::{LinkCache, MemoryCache};
use curtail::error::ServiceError;
use curtail::models::HitMetadata;
use curtail::scheduler::PurgeScheduler;
use curtail::service::ResolutionService;
use curtail::store::{AnalyticsStore, LinkStore, SqliteStore};

const PREFIX: &str = "http://sho.rt/";
const WEEK_SECS: u64 = 7 * 24 * 60 * 60;

/// Helper to build a service over shared store and cache handles
async fn setup() -> (Arc<SqliteStore>, Arc<MemoryCache>, Arc<ResolutionService>) {
    // A single connection keeps the in-memory database shared
    let store = Arc::new(SqliteStore::new("sqlite::memory:", 1).await.unwrap());
    LinkStore::init(store.as_ref()).await.unwrap();
    AnalyticsStore::init(store.as_ref()).await.unwrap();

    let cache = Arc::new(MemoryCache::new(1000));

    let service = Arc::new(ResolutionService::new(
        Arc::clone(&store) as Arc<dyn LinkStore>,
        Arc::clone(&store) as Arc<dyn AnalyticsStore>,
        Arc::clone(&cache) as Arc<dyn LinkCache>,
        PREFIX.to_string(),
        WEEK_SECS,
    ));

    (store, cache, service)
}

fn full_meta() -> HitMetadata {
    HitMetadata {
        referral_source: Some("https://google.com".to_string()),
        browser_type: Some("chrome".to_string()),
        device_type: Some("pc".to_string()),
    }
}

fn code_of(short_url: &str) -> String {
    short_url.rsplit('/').next().unwrap().to_string()
}

#[tokio::test]
async fn test_shorten_returns_prefixed_url_with_seven_char_code() {
    let (store, _cache, service) = setup().await;

    let short_url = service
        .shorten_url("https://example.com/article", "alice")
        .await
        .unwrap();

    assert!(
        short_url.starts_with("http://sho.rt/link/"),
        "unexpected short URL: {short_url}"
    );
    let code = code_of(&short_url);
    assert_eq!(code.len(), 7);
    assert!(code.chars().all(|c| c.is_ascii_alphanumeric()));

    let stored = store.find_by_code(&code).await.unwrap().unwrap();
    assert_eq!(stored.original_url, "https://example.com/article");
    assert_eq!(stored.owner_id, "alice");
    assert_eq!(stored.click_count, 0);
}

#[tokio::test]
async fn test_shorten_is_idempotent_per_owner() {
    let (store, _cache, service) = setup().await;

    let first = service
        .shorten_url("https://example.com/page", "alice")
        .await
        .unwrap();
    let second = service
        .shorten_url("https://example.com/page", "alice")
        .await
        .unwrap();
    assert_eq!(first, second, "same owner and URL should reuse the link");

    let alice_links = store.list_by_owner("alice").await.unwrap();
    assert_eq!(alice_links.len(), 1, "no duplicate row should exist");

    // A different owner shortening the same URL gets a distinct link
    let bobs = service
        .shorten_url("https://example.com/page", "bob")
        .await
        .unwrap();
    assert_ne!(first, bobs);

    // The same owner shortening a different URL gets a distinct link
    let other = service
        .shorten_url("https://example.com/other", "alice")
        .await
        .unwrap();
    assert_ne!(first, other);
}

#[tokio::test]
async fn test_resolve_returns_original_url_and_records_visit() {
    let (store, _cache, service) = setup().await;

    let short_url = service
        .shorten_url("https://example.com/destination", "alice")
        .await
        .unwrap();
    let code = code_of(&short_url);
    let link = store.find_by_code(&code).await.unwrap().unwrap();

    let resolved = service.resolve_url(&code, full_meta()).await.unwrap();
    assert_eq!(resolved, "https://example.com/destination");

    // Click and event land off the request path
    tokio::time::sleep(Duration::from_millis(200)).await;

    let after = store.find_by_id(link.id).await.unwrap().unwrap();
    assert_eq!(after.click_count, 1);
    assert!(after.last_clicked_at >= link.created_at);

    let events = store.find_events(link.id).await.unwrap();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].referral_source, "https://google.com");
    assert_eq!(events[0].browser_type, "chrome");
    assert_eq!(events[0].device_type, "pc");
}

#[tokio::test]
async fn test_resolve_unknown_code_is_not_found_without_side_effects() {
    let (store, cache, service) = setup().await;

    // A control link shows whether anything was mutated
    let short_url = service
        .shorten_url("https://example.com/control", "alice")
        .await
        .unwrap();
    let control = store
        .find_by_code(&code_of(&short_url))
        .await
        .unwrap()
        .unwrap();

    let result = service.resolve_url("zzzzzzz", HitMetadata::default()).await;
    assert!(matches!(result, Err(ServiceError::NotFound)));

    tokio::time::sleep(Duration::from_millis(200)).await;

    assert!(cache.get("zzzzzzz").await.is_none());
    let untouched = store.find_by_id(control.id).await.unwrap().unwrap();
    assert_eq!(untouched.click_count, 0);
    assert!(store.find_events(control.id).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_resolve_populates_cache_on_miss() {
    let (store, cache, service) = setup().await;

    let short_url = service
        .shorten_url("https://example.com/cached", "alice")
        .await
        .unwrap();
    let code = code_of(&short_url);

    // Shortening already primed the cache; clear it to force the miss path
    cache.remove(&code).await.unwrap();
    assert!(cache.get(&code).await.is_none());

    let resolved = service.resolve_url(&code, HitMetadata::default()).await.unwrap();
    assert_eq!(resolved, "https://example.com/cached");

    let entry = cache.get(&code).await.expect("miss should repopulate the cache");
    let link = store.find_by_code(&code).await.unwrap().unwrap();
    assert_eq!(entry.link_id, link.id);
    assert_eq!(entry.original_url, link.original_url);
}

#[tokio::test]
async fn test_concurrent_resolves_count_every_click() {
    let (store, _cache, service) = setup().await;

    let short_url = service
        .shorten_url("https://example.com/popular", "alice")
        .await
        .unwrap();
    let code = code_of(&short_url);
    let link = store.find_by_code(&code).await.unwrap().unwrap();

    let mut handles = vec![];
    for _ in 0..50 {
        let service = Arc::clone(&service);
        let code = code.clone();
        handles.push(tokio::spawn(async move {
            service.resolve_url(&code, HitMetadata::default()).await
        }));
    }

    for handle in handles {
        let resolved = handle.await.unwrap().unwrap();
        assert_eq!(resolved, "https://example.com/popular");
    }

    // The increments are detached from the requests; poll until they settle
    let mut clicks = 0;
    for _ in 0..50 {
        tokio::time::sleep(Duration::from_millis(100)).await;
        clicks = store
            .find_by_id(link.id)
            .await
            .unwrap()
            .unwrap()
            .click_count;
        if clicks == 50 {
            break;
        }
    }
    assert_eq!(clicks, 50, "every resolve should add exactly one click");

    let events = store.find_events(link.id).await.unwrap();
    assert_eq!(events.len(), 50, "every resolve should record one event");
}

#[tokio::test]
async fn test_stale_cache_entry_serves_once_then_evicts() {
    let (store, cache, service) = setup().await;

    let short_url = service
        .shorten_url("https://example.com/soon-gone", "alice")
        .await
        .unwrap();
    let code = code_of(&short_url);

    // Drop the row behind the cache's back, as a purge on another
    // instance would
    let now = chrono::Utc::now().timestamp();
    let deleted = store.delete_created_before(now + 5).await.unwrap();
    assert_eq!(deleted, 1);
    assert!(cache.get(&code).await.is_some(), "cache entry should linger");

    // The stale entry still serves this resolve
    let resolved = service.resolve_url(&code, HitMetadata::default()).await.unwrap();
    assert_eq!(resolved, "https://example.com/soon-gone");

    // The failed click increment evicts the entry in the background
    let mut evicted = false;
    for _ in 0..50 {
        tokio::time::sleep(Duration::from_millis(100)).await;
        if cache.get(&code).await.is_none() {
            evicted = true;
            break;
        }
    }
    assert!(evicted, "stale entry should be evicted after the miss");

    let result = service.resolve_url(&code, HitMetadata::default()).await;
    assert!(matches!(result, Err(ServiceError::NotFound)));
}

#[tokio::test]
async fn test_purge_removes_expired_links_events_and_cache_entries() {
    let (store, cache, _service) = setup().await;

    // Same store and cache, two seconds of retention
    let purging = ResolutionService::new(
        Arc::clone(&store) as Arc<dyn LinkStore>,
        Arc::clone(&store) as Arc<dyn AnalyticsStore>,
        Arc::clone(&cache) as Arc<dyn LinkCache>,
        PREFIX.to_string(),
        2,
    );

    let old_url = purging
        .shorten_url("https://example.com/old", "alice")
        .await
        .unwrap();
    let old_code = code_of(&old_url);
    let old = store.find_by_code(&old_code).await.unwrap().unwrap();

    purging
        .resolve_url(&old_code, full_meta())
        .await
        .unwrap();

    // Let the visit land, then age the link past the retention window
    tokio::time::sleep(Duration::from_millis(300)).await;
    assert_eq!(store.find_events(old.id).await.unwrap().len(), 1);
    tokio::time::sleep(Duration::from_secs(3)).await;

    let fresh_url = purging
        .shorten_url("https://example.com/fresh", "alice")
        .await
        .unwrap();
    let fresh_code = code_of(&fresh_url);
    let fresh = store.find_by_code(&fresh_code).await.unwrap().unwrap();

    let outcome = purging.purge_expired().await.unwrap();
    assert_eq!(outcome.links_deleted, 1);
    assert_eq!(outcome.events_deleted, 1);

    // Expired link is gone everywhere
    assert!(store.find_by_code(&old_code).await.unwrap().is_none());
    assert!(store.find_events(old.id).await.unwrap().is_empty());
    assert!(cache.get(&old_code).await.is_none());

    // The fresh link survived with its cache entry
    assert!(store.find_by_code(&fresh_code).await.unwrap().is_some());
    assert!(cache.get(&fresh_code).await.is_some());
    assert_eq!(fresh.click_count, 0);
}

#[tokio::test]
async fn test_purge_with_nothing_expired_is_a_noop() {
    let (store, _cache, service) = setup().await;

    let short_url = service
        .shorten_url("https://example.com/young", "alice")
        .await
        .unwrap();

    let outcome = service.purge_expired().await.unwrap();
    assert_eq!(outcome.links_deleted, 0);
    assert_eq!(outcome.events_deleted, 0);

    let still_there = store.find_by_code(&code_of(&short_url)).await.unwrap();
    assert!(still_there.is_some());
}

#[tokio::test]
async fn test_scheduler_purges_on_tick_and_stops_after_shutdown() {
    let (store, cache, _service) = setup().await;

    // Same store and cache, one second of retention
    let purging = Arc::new(ResolutionService::new(
        Arc::clone(&store) as Arc<dyn LinkStore>,
        Arc::clone(&store) as Arc<dyn AnalyticsStore>,
        Arc::clone(&cache) as Arc<dyn LinkCache>,
        PREFIX.to_string(),
        1,
    ));

    let old_url = purging
        .shorten_url("https://example.com/expiring", "alice")
        .await
        .unwrap();
    let old_code = code_of(&old_url);

    // Age the link past the retention window before the loop starts
    tokio::time::sleep(Duration::from_secs(2)).await;

    let scheduler = PurgeScheduler::spawn(Arc::clone(&purging), Duration::from_millis(500));

    // The interval tick that fires at startup is skipped, so the aged link
    // is still there until a full interval has elapsed
    assert!(store.find_by_code(&old_code).await.unwrap().is_some());

    let mut purged = false;
    for _ in 0..50 {
        tokio::time::sleep(Duration::from_millis(100)).await;
        if store.find_by_code(&old_code).await.unwrap().is_none()
            && cache.get(&old_code).await.is_none()
        {
            purged = true;
            break;
        }
    }
    assert!(purged, "a tick should purge the aged link and its cache entry");

    scheduler.shutdown();
    // Let the loop observe the signal and exit
    tokio::time::sleep(Duration::from_millis(100)).await;

    let survivor_url = purging
        .shorten_url("https://example.com/survivor", "alice")
        .await
        .unwrap();
    let survivor_code = code_of(&survivor_url);

    // Aged well past the retention window; several would-be ticks go by
    tokio::time::sleep(Duration::from_secs(2)).await;
    assert!(
        store.find_by_code(&survivor_code).await.unwrap().is_some(),
        "no purge should run after shutdown"
    );
    assert!(cache.get(&survivor_code).await.is_some());
}
