use anyhow::{Context, Result};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

use curtail::auth::AuthService;
use curtail::cache::{LinkCache, MemoryCache, RedisCache};
use curtail::config::{AuthMode, CacheBackend, Config, DatabaseBackend};
use curtail::scheduler::PurgeScheduler;
use curtail::service::ResolutionService;
use curtail::store::{AnalyticsStore, LinkStore, PostgresStore, SqliteStore};
use curtail::{api, redirect};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    // Load configuration
    let config = Config::from_env()?;
    info!("Loaded configuration");

    // Initialize stores (one database backend serves both roles)
    let (link_store, analytics_store): (Arc<dyn LinkStore>, Arc<dyn AnalyticsStore>) =
        match config.database.backend {
            DatabaseBackend::Sqlite => {
                info!("Using SQLite storage: {}", config.database.url);
                let store = Arc::new(
                    SqliteStore::new(&config.database.url, config.database.max_connections)
                        .await?,
                );
                (
                    Arc::clone(&store) as Arc<dyn LinkStore>,
                    store as Arc<dyn AnalyticsStore>,
                )
            }
            DatabaseBackend::Postgres => {
                info!("Using PostgreSQL storage: {}", config.database.url);
                let store = Arc::new(
                    PostgresStore::new(&config.database.url, config.database.max_connections)
                        .await?,
                );
                (
                    Arc::clone(&store) as Arc<dyn LinkStore>,
                    store as Arc<dyn AnalyticsStore>,
                )
            }
        };

    // Initialize database
    info!("Initializing database...");
    link_store.init().await?;
    analytics_store.init().await?;
    info!("Database initialized successfully");

    // Initialize lookaside cache
    let cache: Arc<dyn LinkCache> = match config.cache.backend {
        CacheBackend::Memory => {
            info!(
                "Using in-memory cache (up to {} entries)",
                config.cache.max_entries
            );
            Arc::new(MemoryCache::new(config.cache.max_entries))
        }
        CacheBackend::Redis => {
            let redis = config
                .cache
                .redis
                .as_ref()
                .context("redis cache selected but no redis config present")?;
            info!("Using redis cache at {}", redis.url);
            Arc::new(RedisCache::new(&redis.url, &config.cache.namespace)?)
        }
    };

    let service = Arc::new(ResolutionService::new(
        link_store,
        analytics_store,
        cache,
        config.links.short_url_prefix.clone(),
        config.purge.retention_secs,
    ));

    // Initialize auth service
    let auth_service = Arc::new(AuthService::new(&config.auth));
    match config.auth.mode {
        AuthMode::None => {
            info!("🔓 Authentication is disabled - all API requests are allowed");
        }
        AuthMode::Jwt => {
            info!("🔐 JWT authentication enabled");
        }
    }

    // Background purge of expired links
    let _purge_scheduler = PurgeScheduler::spawn(
        Arc::clone(&service),
        Duration::from_secs(config.purge.interval_secs),
    );
    info!(
        "Purge scheduler running every {}s (retention {}s)",
        config.purge.interval_secs, config.purge.retention_secs
    );

    // Create routers
    let api_router = api::create_api_router(Arc::clone(&service), auth_service);
    let redirect_router = redirect::create_redirect_router(Arc::clone(&service));

    // Start API server
    let api_addr = format!("{}:{}", config.api_server.host, config.api_server.port);
    let api_listener = tokio::net::TcpListener::bind(&api_addr).await?;
    info!("🚀 API server listening on http://{}", api_addr);
    info!("   - API endpoints available at http://{}/api/...", api_addr);

    // Start redirect server
    let redirect_addr = format!(
        "{}:{}",
        config.redirect_server.host, config.redirect_server.port
    );
    let redirect_listener = tokio::net::TcpListener::bind(&redirect_addr).await?;
    info!("🚀 Redirect server listening on http://{}", redirect_addr);
    info!(
        "   - Short links resolve at http://{}/link/<code>",
        redirect_addr
    );

    // Run both servers concurrently
    tokio::try_join!(
        axum::serve(api_listener, api_router),
        axum::serve(redirect_listener, redirect_router),
    )?;

    Ok(())
}
