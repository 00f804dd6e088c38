use anyhow::Context;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub database: DatabaseConfig,
    pub cache: CacheConfig,
    pub api_server: ServerConfig,
    pub redirect_server: ServerConfig,
    pub auth: AuthConfig,
    pub links: LinkConfig,
    pub purge: PurgeConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub backend: DatabaseBackend,
    pub url: String,
    #[serde(default = "DatabaseConfig::default_max_connections")]
    pub max_connections: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DatabaseBackend {
    Sqlite,
    Postgres,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    pub backend: CacheBackend,
    #[serde(default)]
    pub redis: Option<RedisConfig>,
    #[serde(default = "CacheConfig::default_namespace")]
    pub namespace: String,
    #[serde(default = "CacheConfig::default_max_entries")]
    pub max_entries: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheBackend {
    Memory,
    Redis,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedisConfig {
    pub url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuthMode {
    None,
    Jwt,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    pub mode: AuthMode,
    #[serde(default)]
    pub jwt: Option<JwtConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JwtConfig {
    pub secret: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinkConfig {
    /// Base every generated short URL starts with, always ending in `/`.
    /// Redirects for `<prefix>link/<code>` are served by the redirect
    /// server, so this should point at it.
    pub short_url_prefix: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PurgeConfig {
    #[serde(default = "PurgeConfig::default_interval_secs")]
    pub interval_secs: u64,
    #[serde(default = "PurgeConfig::default_retention_secs")]
    pub retention_secs: u64,
}

impl DatabaseConfig {
    const fn default_max_connections() -> u32 {
        5
    }
}

impl CacheConfig {
    fn default_namespace() -> String {
        "curtail:links".to_string()
    }

    const fn default_max_entries() -> u64 {
        10_000
    }
}

impl PurgeConfig {
    /// One week, matching the retention window.
    const fn default_interval_secs() -> u64 {
        7 * 24 * 60 * 60
    }

    const fn default_retention_secs() -> u64 {
        7 * 24 * 60 * 60
    }
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let backend_str =
            std::env::var("DATABASE_BACKEND").unwrap_or_else(|_| "sqlite".to_string());

        let backend = match backend_str.to_lowercase().as_str() {
            "postgres" | "postgresql" => DatabaseBackend::Postgres,
            _ => DatabaseBackend::Sqlite,
        };

        let database_url =
            std::env::var("DATABASE_URL").unwrap_or_else(|_| "sqlite://./curtail.db".to_string());

        let max_connections = std::env::var("DATABASE_MAX_CONNECTIONS")
            .ok()
            .and_then(|v| v.parse::<u32>().ok())
            .unwrap_or_else(DatabaseConfig::default_max_connections);

        let cache_backend_str =
            std::env::var("CACHE_BACKEND").unwrap_or_else(|_| "memory".to_string());

        let cache_backend = match cache_backend_str.to_lowercase().as_str() {
            "redis" => CacheBackend::Redis,
            "memory" => CacheBackend::Memory,
            other => {
                tracing::warn!(
                    "Unknown CACHE_BACKEND '{other}', falling back to 'memory'. Supported values: memory, redis"
                );
                CacheBackend::Memory
            }
        };

        let redis = if matches!(cache_backend, CacheBackend::Redis) {
            let url = std::env::var("REDIS_URL")
                .context("REDIS_URL must be set when CACHE_BACKEND=redis")?;
            Some(RedisConfig { url })
        } else {
            None
        };

        let cache_namespace =
            std::env::var("CACHE_NAMESPACE").unwrap_or_else(|_| CacheConfig::default_namespace());

        let cache_max_entries = std::env::var("CACHE_MAX_ENTRIES")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or_else(CacheConfig::default_max_entries);

        let api_host = std::env::var("API_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let api_port = std::env::var("API_PORT")
            .unwrap_or_else(|_| "8080".to_string())
            .parse::<u16>()?;

        let redirect_host =
            std::env::var("REDIRECT_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let redirect_port = std::env::var("REDIRECT_PORT")
            .unwrap_or_else(|_| "3000".to_string())
            .parse::<u16>()?;

        let auth_mode = std::env::var("AUTH_MODE")
            .unwrap_or_else(|_| "none".to_string())
            .to_lowercase();

        let auth_mode = match auth_mode.as_str() {
            "none" => AuthMode::None,
            "jwt" => AuthMode::Jwt,
            other => {
                tracing::warn!(
                    "Unknown AUTH_MODE '{other}', falling back to 'none'. Supported values: none, jwt"
                );
                AuthMode::None
            }
        };

        let jwt = if matches!(auth_mode, AuthMode::Jwt) {
            let secret =
                std::env::var("JWT_SECRET").context("JWT_SECRET must be set when AUTH_MODE=jwt")?;
            Some(JwtConfig { secret })
        } else {
            None
        };

        let mut short_url_prefix = std::env::var("SHORT_URL_PREFIX")
            .unwrap_or_else(|_| format!("http://{redirect_host}:{redirect_port}/"));
        if !short_url_prefix.ends_with('/') {
            short_url_prefix.push('/');
        }

        let purge_interval_secs = std::env::var("PURGE_INTERVAL_SECS")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or_else(PurgeConfig::default_interval_secs);

        let retention_secs = std::env::var("LINK_RETENTION_SECS")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or_else(PurgeConfig::default_retention_secs);

        Ok(Config {
            database: DatabaseConfig {
                backend,
                url: database_url,
                max_connections,
            },
            cache: CacheConfig {
                backend: cache_backend,
                redis,
                namespace: cache_namespace,
                max_entries: cache_max_entries,
            },
            api_server: ServerConfig {
                host: api_host,
                port: api_port,
            },
            redirect_server: ServerConfig {
                host: redirect_host,
                port: redirect_port,
            },
            auth: AuthConfig {
                mode: auth_mode,
                jwt,
            },
            links: LinkConfig { short_url_prefix },
            purge: PurgeConfig {
                interval_secs: purge_interval_secs,
                retention_secs,
            },
        })
    }
}
