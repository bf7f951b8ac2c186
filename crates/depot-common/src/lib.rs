//! # depot-common
//!
//! Shared utilities: configuration, error handling, access token issuing,
//! secret hashing, one-time passwords, and telemetry.

pub mod auth;
pub mod config;
pub mod error;
pub mod telemetry;

// Re-export commonly used types at crate root
pub use auth::{
    generate_recovery_code, hash_password, random_hex, validate_password_strength,
    verify_password, AccessClaims, AccessPayload, Argon2Hasher, KeyRing, OsRandom,
    SignedAccessToken, TokenIssuer, TotpVerifier, RECOVERY_CODE_LEN,
};
pub use config::{
    AppConfig, AppSettings, AttemptLimitConfig, ConfigError, CookieConfig, CorsConfig,
    DatabaseConfig, Environment, JwtConfig, OtpConfig, RateLimitConfig, RealtimeConfig,
    RedisConfig, ServerConfig, SessionConfig,
};
pub use error::{AppError, AppResult, ErrorResponse};
pub use telemetry::{
    try_init_tracing, try_init_tracing_with_config, TracingConfig, TracingError,
};
