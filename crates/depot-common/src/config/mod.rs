//! Configuration structs

mod app_config;

pub use app_config::{
    AppConfig, AppSettings, AttemptLimitConfig, ConfigError, CookieConfig, CorsConfig,
    DatabaseConfig, Environment, JwtConfig, OtpConfig, RateLimitConfig, RealtimeConfig,
    RedisConfig, ServerConfig, SessionConfig,
};
