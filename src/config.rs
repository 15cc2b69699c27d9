use std::env;
use std::str::FromStr;
use std::time::Duration;

/// Default User-Agent sent when fetching external feeds
pub const DEFAULT_FEED_USER_AGENT: &str = "CanopyFeedBot/1.0 (+https://canopy.local)";

/// Server configuration, one section per concern
#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub database: DatabaseConfig,
    pub rate_limit: RateLimitConfig,
    pub feeds: FeedConfig,
    pub admin: AdminConfig,
    pub integrations: IntegrationsConfig,
}

/// PostgreSQL pool sizing and timeouts
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
    pub acquire_timeout: Duration,
    pub idle_timeout: Duration,
    pub max_lifetime: Duration,
}

/// Per-address daily request limit for the heartbeat endpoint
#[derive(Debug, Clone)]
pub struct RateLimitConfig {
    /// Max requests per caller address per UTC calendar day (always >= 1)
    pub daily_limit: i64,
}

/// Feed ingestion settings
#[derive(Debug, Clone)]
pub struct FeedConfig {
    pub user_agent: String,
    /// Upper bound for a single source fetch, including reading the body
    pub fetch_timeout: Duration,
    pub max_items_per_source: usize,
    pub summary_max_chars: usize,
}

/// Administrative endpoints
#[derive(Debug, Clone)]
pub struct AdminConfig {
    /// Shared secret for the ingestion trigger. Unset means the trigger is open.
    pub token: Option<String>,
}

/// Optional third-party integrations
#[derive(Debug, Clone, Default)]
pub struct IntegrationsConfig {
    pub marketing_api_key: Option<String>,
}

impl Config {
    /// Reads every section from the process environment
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            host: env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: match env::var("PORT") {
                Ok(port) => port.parse().map_err(|_| ConfigError::InvalidPort)?,
                Err(_) => 8080,
            },
            database: DatabaseConfig::from_env()?,
            rate_limit: RateLimitConfig::from_env(),
            feeds: FeedConfig::from_env(),
            admin: AdminConfig::from_env(),
            integrations: IntegrationsConfig::from_env(),
        })
    }
}

impl RateLimitConfig {
    pub fn from_env() -> Self {
        Self {
            daily_limit: env_or("DAILY_REQUEST_LIMIT", 100_i64).max(1),
        }
    }
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self { daily_limit: 100 }
    }
}

impl FeedConfig {
    /// Load feed ingestion configuration from environment variables
    pub fn from_env() -> Self {
        let defaults = Self::default();

        Self {
            user_agent: env::var("FEED_USER_AGENT")
                .ok()
                .filter(|ua| !ua.trim().is_empty())
                .unwrap_or(defaults.user_agent),
            fetch_timeout: env::var("FEED_FETCH_TIMEOUT_SECS")
                .ok()
                .and_then(|v| v.parse::<u64>().ok())
                .filter(|secs| *secs > 0)
                .map(Duration::from_secs)
                .unwrap_or(defaults.fetch_timeout),
            max_items_per_source: env_or(
                "FEED_MAX_ITEMS_PER_SOURCE",
                defaults.max_items_per_source,
            ),
            summary_max_chars: env_or("FEED_SUMMARY_MAX_CHARS", defaults.summary_max_chars),
        }
    }
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            user_agent: DEFAULT_FEED_USER_AGENT.to_string(),
            fetch_timeout: Duration::from_secs(15),
            max_items_per_source: 20,
            summary_max_chars: 500,
        }
    }
}

impl AdminConfig {
    pub fn from_env() -> Self {
        Self {
            token: env::var("ADMIN_TOKEN").ok().filter(|t| !t.is_empty()),
        }
    }
}

impl IntegrationsConfig {
    pub fn from_env() -> Self {
        Self {
            marketing_api_key: env::var("MARKETING_API_KEY")
                .ok()
                .filter(|k| !k.trim().is_empty()),
        }
    }

    /// True when the newsletter marketing sync has credentials
    pub fn marketing_sync_enabled(&self) -> bool {
        self.marketing_api_key.is_some()
    }
}

impl DatabaseConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let url = env::var("DATABASE_URL").map_err(|_| ConfigError::MissingDatabaseUrl)?;

        Ok(Self {
            url,
            max_connections: env_or("DATABASE_MAX_CONNECTIONS", 10),
            min_connections: env_or("DATABASE_MIN_CONNECTIONS", 1),
            acquire_timeout: Duration::from_secs(env_or("DATABASE_ACQUIRE_TIMEOUT_SECS", 5)),
            idle_timeout: Duration::from_secs(env_or("DATABASE_IDLE_TIMEOUT_SECS", 600)),
            max_lifetime: Duration::from_secs(env_or("DATABASE_MAX_LIFETIME_SECS", 1800)),
        })
    }
}

/// Parsed value of `name`, or `default` when unset or unparsable
fn env_or<T: FromStr>(name: &str, default: T) -> T {
    env::var(name)
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("PORT must be a valid number")]
    InvalidPort,
    #[error("DATABASE_URL environment variable is required")]
    MissingDatabaseUrl,
}
