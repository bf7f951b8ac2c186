//! Application configuration structs
//!
//! Loads configuration from environment variables (and a `.env` file if present).

use serde::Deserialize;
use std::env;
use std::str::FromStr;

/// Main application configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub app: AppSettings,
    pub api: ServerConfig,
    pub database: DatabaseConfig,
    pub redis: RedisConfig,
    pub jwt: JwtConfig,
    pub session: SessionConfig,
    pub login_limit: AttemptLimitConfig,
    pub password_change_limit: AttemptLimitConfig,
    pub otp: OtpConfig,
    pub realtime: RealtimeConfig,
    pub cookie: CookieConfig,
    pub rate_limit: RateLimitConfig,
    pub cors: CorsConfig,
}

/// General application settings
#[derive(Debug, Clone, Deserialize)]
pub struct AppSettings {
    #[serde(default = "default_app_name")]
    pub name: String,
    #[serde(default = "default_env")]
    pub env: Environment,
}

/// Environment type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    Development,
    Staging,
    Production,
}

impl Environment {
    #[must_use]
    pub fn is_production(&self) -> bool {
        matches!(self, Self::Production)
    }
}

/// HTTP server configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_api_port")]
    pub port: u16,
    /// Take the caller address from `X-Forwarded-For` / `X-Real-IP`; only
    /// safe behind a proxy that overwrites them
    #[serde(default)]
    pub trust_proxy_headers: bool,
}

impl ServerConfig {
    #[must_use]
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Database configuration
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    #[serde(default = "default_min_connections")]
    pub min_connections: u32,
    /// Apply pending migrations at startup
    #[serde(default = "default_true")]
    pub run_migrations: bool,
}

/// Redis configuration
#[derive(Debug, Clone, Deserialize)]
pub struct RedisConfig {
    pub url: String,
    #[serde(default = "default_redis_max_connections")]
    pub max_connections: u32,
}

/// Access token configuration
#[derive(Debug, Clone, Deserialize)]
pub struct JwtConfig {
    /// Single secret or `kid=secret` entries separated by `;` or `,`
    pub secret: String,
    #[serde(default = "default_active_kid")]
    pub active_kid: String,
    #[serde(default = "default_issuer")]
    pub issuer: String,
    #[serde(default = "default_audience")]
    pub audience: String,
    #[serde(default = "default_access_token_ttl")]
    pub access_token_ttl_secs: i64,
}

impl Default for JwtConfig {
    fn default() -> Self {
        Self {
            secret: String::new(),
            active_kid: default_active_kid(),
            issuer: default_issuer(),
            audience: default_audience(),
            access_token_ttl_secs: default_access_token_ttl(),
        }
    }
}

/// Session and refresh token lifecycle
#[derive(Debug, Clone, Deserialize)]
pub struct SessionConfig {
    #[serde(default = "default_refresh_ttl_days")]
    pub refresh_ttl_days: i64,
    /// How many recent refresh tokens a presented secret is checked against
    #[serde(default = "default_reuse_lookback")]
    pub reuse_lookback: u32,
    #[serde(default = "default_list_limit")]
    pub list_limit: u32,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            refresh_ttl_days: default_refresh_ttl_days(),
            reuse_lookback: default_reuse_lookback(),
            list_limit: default_list_limit(),
        }
    }
}

/// Fixed-window attempt limit
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct AttemptLimitConfig {
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    #[serde(default = "default_attempt_window")]
    pub window_secs: u64,
}

impl Default for AttemptLimitConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            window_secs: default_attempt_window(),
        }
    }
}

/// One-time password settings
#[derive(Debug, Clone, Deserialize)]
pub struct OtpConfig {
    #[serde(default = "default_otp_issuer")]
    pub issuer: String,
}

impl Default for OtpConfig {
    fn default() -> Self {
        Self {
            issuer: default_otp_issuer(),
        }
    }
}

/// Realtime connection limits
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct RealtimeConfig {
    #[serde(default = "default_max_sockets_per_user")]
    pub max_sockets_per_user: usize,
    /// Delay between telling a rejected socket why and closing it
    #[serde(default = "default_reject_grace_ms")]
    pub reject_grace_ms: u64,
    /// How often the server pings each socket
    #[serde(default = "default_ping_interval_ms")]
    pub ping_interval_ms: u64,
    /// Silence tolerated after a ping before the socket is dropped
    #[serde(default = "default_ping_timeout_ms")]
    pub ping_timeout_ms: u64,
}

impl Default for RealtimeConfig {
    fn default() -> Self {
        Self {
            max_sockets_per_user: default_max_sockets_per_user(),
            reject_grace_ms: default_reject_grace_ms(),
            ping_interval_ms: default_ping_interval_ms(),
            ping_timeout_ms: default_ping_timeout_ms(),
        }
    }
}

/// Refresh token cookie attributes
#[derive(Debug, Clone, Deserialize)]
pub struct CookieConfig {
    #[serde(default = "default_cookie_name")]
    pub name: String,
    /// Frontend on another site: `SameSite=None` and always `Secure`
    #[serde(default)]
    pub cross_site: bool,
    #[serde(default)]
    pub secure: bool,
    #[serde(default)]
    pub domain: Option<String>,
}

impl Default for CookieConfig {
    fn default() -> Self {
        Self {
            name: default_cookie_name(),
            cross_site: false,
            secure: false,
            domain: None,
        }
    }
}

/// Rate limiting configuration
#[derive(Debug, Clone, Deserialize)]
pub struct RateLimitConfig {
    #[serde(default = "default_requests_per_second")]
    pub requests_per_second: u32,
    #[serde(default = "default_burst")]
    pub burst: u32,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            requests_per_second: default_requests_per_second(),
            burst: default_burst(),
        }
    }
}

/// CORS configuration
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CorsConfig {
    #[serde(default)]
    pub allowed_origins: Vec<String>,
}

// Default value functions
fn default_app_name() -> String {
    "depot".to_string()
}

fn default_env() -> Environment {
    Environment::Development
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_api_port() -> u16 {
    3000
}

fn default_true() -> bool {
    true
}

fn default_max_connections() -> u32 {
    20
}

fn default_min_connections() -> u32 {
    5
}

fn default_redis_max_connections() -> u32 {
    10
}

fn default_active_kid() -> String {
    "default".to_string()
}

fn default_issuer() -> String {
    "depot".to_string()
}

fn default_audience() -> String {
    "depot-clients".to_string()
}

fn default_access_token_ttl() -> i64 {
    900 // 15 minutes
}

fn default_refresh_ttl_days() -> i64 {
    7
}

fn default_reuse_lookback() -> u32 {
    10
}

fn default_list_limit() -> u32 {
    50
}

fn default_max_attempts() -> u32 {
    5
}

fn default_attempt_window() -> u64 {
    300
}

fn default_otp_issuer() -> String {
    "Depot".to_string()
}

fn default_max_sockets_per_user() -> usize {
    5
}

fn default_reject_grace_ms() -> u64 {
    10
}

fn default_ping_interval_ms() -> u64 {
    25_000
}

fn default_ping_timeout_ms() -> u64 {
    20_000
}

fn default_cookie_name() -> String {
    "refresh_token".to_string()
}

fn default_requests_per_second() -> u32 {
    10
}

fn default_burst() -> u32 {
    50
}

/// Parse an optional variable, falling back to `default` when unset
fn parse_var<T: FromStr>(name: &'static str, default: fn() -> T) -> Result<T, ConfigError> {
    match env::var(name) {
        Ok(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidValue(name, raw)),
        _ => Ok(default()),
    }
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

fn bool_var(name: &'static str) -> Result<Option<bool>, ConfigError> {
    match env::var(name) {
        Ok(raw) if !raw.trim().is_empty() => parse_bool(&raw)
            .map(Some)
            .ok_or(ConfigError::InvalidValue(name, raw)),
        _ => Ok(None),
    }
}

impl AppConfig {
    /// Load configuration from environment variables
    ///
    /// # Errors
    /// Returns an error if required variables are missing or a value does not parse
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let app_env = env::var("APP_ENV")
            .ok()
            .and_then(|s| match s.to_lowercase().as_str() {
                "production" => Some(Environment::Production),
                "staging" => Some(Environment::Staging),
                "development" => Some(Environment::Development),
                _ => None,
            })
            .unwrap_or_default();

        let cross_site = bool_var("CROSS_SITE_COOKIES")?.unwrap_or(false);
        let secure_cookie =
            bool_var("COOKIE_SECURE")?.unwrap_or(app_env.is_production() || cross_site);

        Ok(Self {
            app: AppSettings {
                name: env::var("APP_NAME").unwrap_or_else(|_| default_app_name()),
                env: app_env,
            },
            api: ServerConfig {
                host: env::var("API_HOST").unwrap_or_else(|_| default_host()),
                port: parse_var("API_PORT", default_api_port)?,
                trust_proxy_headers: bool_var("TRUST_PROXY_HEADERS")?.unwrap_or(false),
            },
            database: DatabaseConfig {
                url: env::var("DATABASE_URL").map_err(|_| ConfigError::MissingVar("DATABASE_URL"))?,
                max_connections: parse_var("DATABASE_MAX_CONNECTIONS", default_max_connections)?,
                min_connections: parse_var("DATABASE_MIN_CONNECTIONS", default_min_connections)?,
                run_migrations: bool_var("DATABASE_RUN_MIGRATIONS")?.unwrap_or(true),
            },
            redis: RedisConfig {
                url: env::var("REDIS_URL").map_err(|_| ConfigError::MissingVar("REDIS_URL"))?,
                max_connections: parse_var("REDIS_MAX_CONNECTIONS", default_redis_max_connections)?,
            },
            jwt: JwtConfig {
                secret: env::var("JWT_SECRET")
                    .ok()
                    .filter(|s| !s.trim().is_empty())
                    .ok_or(ConfigError::MissingVar("JWT_SECRET"))?,
                active_kid: env::var("JWT_ACTIVE_KID").unwrap_or_else(|_| default_active_kid()),
                issuer: env::var("JWT_ISSUER").unwrap_or_else(|_| default_issuer()),
                audience: env::var("JWT_AUDIENCE").unwrap_or_else(|_| default_audience()),
                access_token_ttl_secs: parse_var("ACCESS_TOKEN_TTL", default_access_token_ttl)?,
            },
            session: SessionConfig {
                refresh_ttl_days: parse_var("REFRESH_TOKEN_TTL_DAYS", default_refresh_ttl_days)?,
                reuse_lookback: parse_var("REFRESH_REUSE_LOOKBACK", default_reuse_lookback)?,
                list_limit: parse_var("SESSION_LIST_LIMIT", default_list_limit)?,
            },
            login_limit: AttemptLimitConfig {
                max_attempts: parse_var("LOGIN_MAX_ATTEMPTS", default_max_attempts)?,
                window_secs: parse_var("LOGIN_WINDOW_SECONDS", default_attempt_window)?,
            },
            password_change_limit: AttemptLimitConfig {
                max_attempts: parse_var("PASSWORD_CHANGE_MAX_ATTEMPTS", default_max_attempts)?,
                window_secs: parse_var("PASSWORD_CHANGE_WINDOW_SECONDS", default_attempt_window)?,
            },
            otp: OtpConfig {
                issuer: env::var("OTP_ISSUER").unwrap_or_else(|_| default_otp_issuer()),
            },
            realtime: RealtimeConfig {
                max_sockets_per_user: parse_var(
                    "REALTIME_MAX_SOCKETS_PER_USER",
                    default_max_sockets_per_user,
                )?,
                reject_grace_ms: parse_var("REALTIME_REJECT_GRACE_MS", default_reject_grace_ms)?,
                ping_interval_ms: parse_var("REALTIME_PING_INTERVAL_MS", default_ping_interval_ms)?,
                ping_timeout_ms: parse_var("REALTIME_PING_TIMEOUT_MS", default_ping_timeout_ms)?,
            },
            cookie: CookieConfig {
                name: env::var("REFRESH_COOKIE_NAME").unwrap_or_else(|_| default_cookie_name()),
                cross_site,
                secure: secure_cookie,
                domain: env::var("COOKIE_DOMAIN").ok().filter(|s| !s.trim().is_empty()),
            },
            rate_limit: RateLimitConfig {
                requests_per_second: parse_var(
                    "RATE_LIMIT_REQUESTS_PER_SECOND",
                    default_requests_per_second,
                )?,
                burst: parse_var("RATE_LIMIT_BURST", default_burst)?,
            },
            cors: CorsConfig {
                allowed_origins: env::var("CORS_ALLOWED_ORIGINS")
                    .ok()
                    .map(|s| {
                        s.split(',')
                            .map(str::trim)
                            .filter(|o| !o.is_empty())
                            .map(String::from)
                            .collect()
                    })
                    .unwrap_or_default(),
            },
        })
    }

    /// Configuration with every default applied and the given connection URLs
    #[must_use]
    pub fn with_defaults(database_url: &str, redis_url: &str, jwt_secret: &str) -> Self {
        Self {
            app: AppSettings {
                name: default_app_name(),
                env: default_env(),
            },
            api: ServerConfig {
                host: default_host(),
                port: default_api_port(),
                trust_proxy_headers: false,
            },
            database: DatabaseConfig {
                url: database_url.to_string(),
                max_connections: default_max_connections(),
                min_connections: default_min_connections(),
                run_migrations: true,
            },
            redis: RedisConfig {
                url: redis_url.to_string(),
                max_connections: default_redis_max_connections(),
            },
            jwt: JwtConfig {
                secret: jwt_secret.to_string(),
                ..JwtConfig::default()
            },
            session: SessionConfig::default(),
            login_limit: AttemptLimitConfig::default(),
            password_change_limit: AttemptLimitConfig::default(),
            otp: OtpConfig::default(),
            realtime: RealtimeConfig::default(),
            cookie: CookieConfig::default(),
            rate_limit: RateLimitConfig::default(),
            cors: CorsConfig::default(),
        }
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingVar(&'static str),

    #[error("Invalid value for {0}: {1}")]
    InvalidValue(&'static str, String),
}
