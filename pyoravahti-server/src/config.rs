//! Server configuration module
//!
//! Handles loading configuration from environment variables with sensible defaults.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

/// Server configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    /// Server port (default: 3000)
    pub port: u16,
    /// Server host (default: 127.0.0.1)
    pub host: [u8; 4],
    /// Allowed CORS origins, comma-separated (default: allow all in dev)
    pub allowed_origins: Option<Vec<String>>,
    /// Request body limit in MB (default: 50)
    pub body_limit_mb: usize,
    /// Maximum size per uploaded image in MB (default: 5)
    pub max_image_size_mb: usize,
    /// Request timeout in seconds (default: 30)
    pub timeout_secs: u64,
    /// Enable global rate limiting (default: false for tests, true when loaded from env)
    pub rate_limit_enabled: bool,
    /// Global rate limit: requests per second (default: 10)
    pub rate_limit_per_sec: u64,
    /// Global rate limit: burst size (default: 20)
    pub rate_limit_burst: u32,
    /// Reports accepted per client and window (default: 5)
    pub report_rate_limit: u32,
    /// Report rate limit window in seconds (default: 60)
    pub report_rate_window_secs: u64,
    /// PostgreSQL connection string; the in-memory store is used when unset
    pub database_url: Option<String>,
    /// Database connection pool maximum connections (default: 20)
    pub database_max_connections: u32,
    /// Database connection pool minimum connections (default: 2)
    pub database_min_connections: u32,
    /// Whether the Tori.fi listing adapter is active (default: true)
    pub enable_tori_adapter: bool,
    /// Token required in `x-admin-token` for admin routes; open when unset
    pub admin_token: Option<String>,
    /// Directory uploaded images are written to (default: ./uploads)
    pub upload_dir: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: 3000,
            host: [127, 0, 0, 1],
            allowed_origins: None, // None = allow all (dev mode)
            body_limit_mb: 50,
            max_image_size_mb: 5,
            timeout_secs: 30,
            rate_limit_enabled: false, // Disabled by default (for tests)
            rate_limit_per_sec: 10,
            rate_limit_burst: 20,
            report_rate_limit: 5,
            report_rate_window_secs: 60,
            database_url: None,
            database_max_connections: 20,
            database_min_connections: 2,
            enable_tori_adapter: true,
            admin_token: None,
            upload_dir: PathBuf::from("./uploads"),
        }
    }
}

fn env_parse<T: std::str::FromStr>(name: &str, default: T) -> T {
    std::env::var(name)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn env_non_empty(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let host = std::env::var("HOST")
            .ok()
            .map(|h| {
                if h == "0.0.0.0" {
                    [0, 0, 0, 0]
                } else {
                    [127, 0, 0, 1]
                }
            })
            .unwrap_or(defaults.host);

        let allowed_origins = std::env::var("ALLOWED_ORIGINS").ok().map(|origins| {
            origins
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect()
        });

        // Rate limiting enabled by default in production, can be disabled with RATE_LIMIT_ENABLED=false
        let rate_limit_enabled = std::env::var("RATE_LIMIT_ENABLED")
            .map(|v| v.to_lowercase() != "false")
            .unwrap_or(true);

        let enable_tori_adapter = std::env::var("ENABLE_TORI_ADAPTER")
            .map(|v| v.to_lowercase() != "false")
            .unwrap_or(true);

        Self {
            port: env_parse("PORT", defaults.port),
            host,
            allowed_origins,
            body_limit_mb: env_parse("BODY_LIMIT_MB", defaults.body_limit_mb),
            max_image_size_mb: env_parse("MAX_IMAGE_SIZE_MB", defaults.max_image_size_mb),
            timeout_secs: env_parse("REQUEST_TIMEOUT_SECS", defaults.timeout_secs),
            rate_limit_enabled,
            rate_limit_per_sec: env_parse("RATE_LIMIT_PER_SEC", defaults.rate_limit_per_sec),
            rate_limit_burst: env_parse("RATE_LIMIT_BURST", defaults.rate_limit_burst),
            report_rate_limit: env_parse("REPORT_RATE_LIMIT", defaults.report_rate_limit),
            report_rate_window_secs: env_parse(
                "REPORT_RATE_WINDOW_SECS",
                defaults.report_rate_window_secs,
            ),
            database_url: env_non_empty("DATABASE_URL"),
            database_max_connections: env_parse(
                "DATABASE_MAX_CONNECTIONS",
                defaults.database_max_connections,
            ),
            database_min_connections: env_parse(
                "DATABASE_MIN_CONNECTIONS",
                defaults.database_min_connections,
            ),
            enable_tori_adapter,
            admin_token: env_non_empty("ADMIN_TOKEN"),
            upload_dir: env_non_empty("UPLOAD_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.upload_dir),
        }
    }

    /// Get socket address from config
    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::from((self.host, self.port))
    }

    /// Maximum size per uploaded image in bytes
    pub fn max_image_bytes(&self) -> usize {
        self.max_image_size_mb * 1024 * 1024
    }

    pub fn report_rate_window(&self) -> Duration {
        Duration::from_secs(self.report_rate_window_secs)
    }
}
