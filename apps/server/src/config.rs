use std::env;
use std::time::Duration;

/// Application configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub store: StoreConfig,
    pub gateway: GatewayConfig,
    pub quota: QuotaConfig,
    pub retention: RetentionConfig,
    pub tick: TickConfig,
}

/// Which key-value backend holds configurations, metadata and counters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    Postgres,
    Memory,
}

#[derive(Debug, Clone)]
pub struct StoreConfig {
    pub backend: StoreBackend,
    /// Required when backend is Postgres
    pub database: Option<DatabaseConfig>,
}

/// Database connection pool configuration
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
    pub acquire_timeout: Duration,
    pub idle_timeout: Duration,
    pub max_lifetime: Duration,
    /// Upper bound for any single store statement
    pub statement_timeout: Duration,
}

/// Remote form service connection
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    pub base_url: String,
    pub timeout: Duration,
}

/// New-configuration quota per requester identity
#[derive(Debug, Clone)]
pub struct QuotaConfig {
    /// Max brand-new configurations one identity may create per window
    pub max_new_configs_per_day: i64,
    /// Counter lifetime, counted from the first reservation
    pub window: Duration,
    /// Bumping this resets every counter without touching the store
    pub key_version: String,
}

/// Expiry applied to stored records
#[derive(Debug, Clone)]
pub struct RetentionConfig {
    /// Run metadata lifetime; stale metadata is treated as absent
    pub metadata_ttl: Duration,
    /// Grace period before an inactive configuration disappears
    pub disabled_config_ttl: Duration,
}

/// Driving tick configuration
#[derive(Debug, Clone)]
pub struct TickConfig {
    pub enabled: bool,
    pub interval: Duration,
    /// Configurations processed concurrently within one pass
    pub concurrency: usize,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            host: env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse()
                .map_err(|_| ConfigError::InvalidPort)?,
            store: StoreConfig::from_env()?,
            gateway: GatewayConfig::from_env()?,
            quota: QuotaConfig::from_env(),
            retention: RetentionConfig::from_env(),
            tick: TickConfig::from_env(),
        })
    }
}

/// Reads a numeric variable, falling back to `default` when unset or unparsable
fn env_or<T: std::str::FromStr>(name: &str, default: T) -> T {
    env::var(name)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

impl StoreConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let backend = match env::var("STORE_BACKEND")
            .unwrap_or_else(|_| "postgres".to_string())
            .to_ascii_lowercase()
            .as_str()
        {
            "postgres" | "postgresql" => StoreBackend::Postgres,
            "memory" => StoreBackend::Memory,
            other => return Err(ConfigError::InvalidStoreBackend(other.to_string())),
        };

        let database = match backend {
            StoreBackend::Postgres => Some(DatabaseConfig::from_env()?),
            StoreBackend::Memory => None,
        };

        Ok(Self { backend, database })
    }
}

impl DatabaseConfig {
    /// Load database configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        let url = env::var("DATABASE_URL").map_err(|_| ConfigError::MissingDatabaseUrl)?;

        Ok(Self {
            url,
            max_connections: env_or("DATABASE_MAX_CONNECTIONS", 10),
            min_connections: env_or("DATABASE_MIN_CONNECTIONS", 1),
            acquire_timeout: Duration::from_secs(env_or("DATABASE_ACQUIRE_TIMEOUT_SECS", 5)),
            idle_timeout: Duration::from_secs(env_or("DATABASE_IDLE_TIMEOUT_SECS", 600)),
            max_lifetime: Duration::from_secs(env_or("DATABASE_MAX_LIFETIME_SECS", 1800)),
            statement_timeout: Duration::from_secs(env_or("DATABASE_STATEMENT_TIMEOUT_SECS", 10)),
        })
    }
}

impl GatewayConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let base_url =
            env::var("FORMS_API_BASE_URL").map_err(|_| ConfigError::MissingFormsApiBaseUrl)?;

        let parsed = url::Url::parse(&base_url).map_err(|_| ConfigError::InvalidFormsApiBaseUrl)?;
        if parsed.scheme() != "http" && parsed.scheme() != "https" {
            return Err(ConfigError::InvalidFormsApiBaseUrl);
        }

        Ok(Self {
            base_url,
            timeout: Duration::from_secs(env_or("FORMS_API_TIMEOUT_SECS", 30)),
        })
    }
}

impl QuotaConfig {
    /// Load quota configuration from environment variables
    pub fn from_env() -> Self {
        Self {
            max_new_configs_per_day: env_or("QUOTA_MAX_NEW_CONFIGS_PER_DAY", 5),
            window: Duration::from_secs(env_or("QUOTA_WINDOW_SECS", 86_400)),
            key_version: env::var("QUOTA_KEY_VERSION").unwrap_or_else(|_| "v1".to_string()),
        }
    }
}

impl Default for QuotaConfig {
    fn default() -> Self {
        Self {
            max_new_configs_per_day: 5,
            window: Duration::from_secs(86_400),
            key_version: "v1".to_string(),
        }
    }
}

impl RetentionConfig {
    pub fn from_env() -> Self {
        Self {
            metadata_ttl: Duration::from_secs(env_or("METADATA_TTL_SECS", 86_400)),
            disabled_config_ttl: Duration::from_secs(env_or("DISABLED_CONFIG_TTL_SECS", 259_200)),
        }
    }
}

impl Default for RetentionConfig {
    fn default() -> Self {
        Self {
            metadata_ttl: Duration::from_secs(86_400),
            disabled_config_ttl: Duration::from_secs(259_200),
        }
    }
}

impl TickConfig {
    pub fn from_env() -> Self {
        Self {
            enabled: env::var("TICK_ENABLED")
                .map(|v| v != "false" && v != "0")
                .unwrap_or(true),
            interval: Duration::from_secs(env_or::<u64>("TICK_INTERVAL_SECS", 3600).max(1)),
            concurrency: env_or::<usize>("TICK_CONCURRENCY", 4).max(1),
        }
    }
}

impl Default for TickConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            interval: Duration::from_secs(3600),
            concurrency: 4,
        }
    }
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidPort,
    InvalidStoreBackend(String),
    MissingDatabaseUrl,
    MissingFormsApiBaseUrl,
    InvalidFormsApiBaseUrl,
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::InvalidPort => write!(f, "PORT must be a valid number"),
            ConfigError::InvalidStoreBackend(value) => {
                write!(
                    f,
                    "STORE_BACKEND must be 'postgres' or 'memory', got '{}'",
                    value
                )
            }
            ConfigError::MissingDatabaseUrl => {
                write!(f, "DATABASE_URL environment variable is required")
            }
            ConfigError::MissingFormsApiBaseUrl => {
                write!(f, "FORMS_API_BASE_URL environment variable is required")
            }
            ConfigError::InvalidFormsApiBaseUrl => {
                write!(f, "FORMS_API_BASE_URL must be an http or https URL")
            }
        }
    }
}

impl std::error::Error for ConfigError {}
