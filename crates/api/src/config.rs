//! Server Configuration
//!
//! Layered with the `config` crate: built-in defaults, then an optional TOML
//! file (`heartwise.toml`, or the path in `HEARTWISE_CONFIG`), then
//! `HEARTWISE__SECTION__KEY` environment variables. `DATABASE_URL` wins over
//! everything for the database location.

use crate::rate_limit::RateLimitConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Top-level configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub model: ModelConfig,
    pub auth: AuthConfig,
    pub rate_limit: RateLimitConfig,
    pub validation: ValidationSettings,
    pub logging: LoggingConfig,
}

/// HTTP listener settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Socket address to bind
    pub listen_addr: String,
    /// Origins allowed to call the API cross-site; empty disables CORS
    pub cors_origins: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: "0.0.0.0:5000".to_string(),
            cors_origins: Vec::new(),
        }
    }
}

/// Database settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// SQLite connection string
    pub url: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "sqlite://heart_health.db".to_string(),
        }
    }
}

/// Classifier settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    /// `.json` coefficients or `.onnx` graph; unset uses the built-in model
    pub path: Option<String>,
    /// Decision threshold for a positive diagnosis
    pub threshold: f64,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            path: None,
            threshold: 0.5,
        }
    }
}

/// Session and password hashing settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    /// Session lifetime
    pub session_ttl_hours: i64,
    /// Mark the session cookie `Secure`
    pub cookie_secure: bool,
    /// Argon2 memory cost (KiB)
    pub argon2_memory_kib: u32,
    /// Argon2 iterations
    pub argon2_iterations: u32,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            session_ttl_hours: 24 * 7,
            cookie_secure: false,
            argon2_memory_kib: 19 * 1024,
            argon2_iterations: 2,
        }
    }
}

/// Input validation policy
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidationSettings {
    /// Apply the form's numeric ranges to `/api/predict` as well
    pub enforce_api_ranges: bool,
}

impl Default for ValidationSettings {
    fn default() -> Self {
        Self {
            enforce_api_ranges: true,
        }
    }
}

/// Logging settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Max level: trace, debug, info, warn, error
    pub level: String,
    /// Emit JSON lines instead of human-readable text
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

/// Load configuration.
///
/// An explicit `path` (or `HEARTWISE_CONFIG`) must exist; the default
/// `heartwise.toml` is optional.
pub fn load_config(path: Option<&Path>) -> Result<AppConfig, config::ConfigError> {
    let explicit = path
        .map(Path::to_path_buf)
        .or_else(|| std::env::var("HEARTWISE_CONFIG").ok().map(PathBuf::from));

    let file_source = match explicit {
        Some(path) => config::File::from(path),
        None => config::File::with_name("heartwise").required(false),
    };

    let settings = config::Config::builder()
        .add_source(file_source)
        .add_source(
            config::Environment::with_prefix("HEARTWISE")
                .separator("__")
                .try_parsing(true),
        )
        .set_override_option("database.url", std::env::var("DATABASE_URL").ok())?
        .build()?;

    settings.try_deserialize()
}
