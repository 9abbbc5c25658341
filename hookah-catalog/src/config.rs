//! Configuration management using Figment
//!
//! Configuration is loaded from multiple sources with the following precedence (highest to lowest):
//! 1. Environment variables (prefix: `HOOKAH_`, nested keys separated by `__`,
//!    e.g. `HOOKAH_PAGINATION__MAX_LIMIT=50`)
//! 2. Current working directory: ./config.toml
//! 3. System directory: /etc/hookah-catalog/config.toml
//! 4. Default values

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{Error, Result};

const ENV_PREFIX: &str = "HOOKAH_";
const ENV_SEPARATOR: &str = "__";

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Service configuration
    pub service: ServiceConfig,

    /// List endpoint page sizes
    #[serde(default)]
    pub pagination: PaginationConfig,

    /// Response envelope settings
    #[serde(default)]
    pub envelope: EnvelopeConfig,

    /// JWT verification
    pub jwt: JwtConfig,

    /// Static media serving
    #[serde(default)]
    pub media: MediaConfig,

    /// Middleware configuration
    #[serde(default)]
    pub middleware: MiddlewareConfig,

    /// Fill the store with a small demo catalog on start
    #[serde(default)]
    pub seed_demo_data: bool,
}

/// Service-level configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    /// Service name
    pub name: String,

    /// HTTP port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Log level filter, any `EnvFilter` directive
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Request timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,

    /// Environment (dev, staging, production)
    #[serde(default = "default_environment")]
    pub environment: String,
}

/// Page size bounds shared by every list endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaginationConfig {
    /// Page size when the request names none
    #[serde(default = "default_page_limit")]
    pub default_limit: u64,

    /// Largest page size a client may ask for
    #[serde(default = "default_max_page_limit")]
    pub max_limit: u64,
}

impl Default for PaginationConfig {
    fn default() -> Self {
        Self {
            default_limit: default_page_limit(),
            max_limit: default_max_page_limit(),
        }
    }
}

/// Response envelope configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnvelopeConfig {
    /// Path prefixes whose responses are passed through untouched
    #[serde(default = "default_bypass_prefixes")]
    pub bypass_prefixes: Vec<String>,

    /// Largest response body the envelope will buffer
    #[serde(default = "default_envelope_max_body_bytes")]
    pub max_body_bytes: usize,
}

impl Default for EnvelopeConfig {
    fn default() -> Self {
        Self {
            bypass_prefixes: default_bypass_prefixes(),
            max_body_bytes: default_envelope_max_body_bytes(),
        }
    }
}

/// JWT verification configuration
///
/// Tokens are issued elsewhere; this service only verifies them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JwtConfig {
    /// Shared HMAC secret
    #[serde(default = "default_jwt_secret")]
    pub secret: String,

    /// Algorithm (HS256, HS384, HS512)
    #[serde(default = "default_jwt_algorithm")]
    pub algorithm: String,

    /// Required `iss` claim
    pub issuer: Option<String>,

    /// Required `aud` claim
    pub audience: Option<String>,
}

/// Static media configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediaConfig {
    /// URL prefix media is mounted under
    #[serde(default = "default_media_url_prefix")]
    pub url_prefix: String,

    /// Directory files are served from
    #[serde(default = "default_media_root")]
    pub root: PathBuf,
}

impl Default for MediaConfig {
    fn default() -> Self {
        Self {
            url_prefix: default_media_url_prefix(),
            root: default_media_root(),
        }
    }
}

/// Middleware configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MiddlewareConfig {
    /// Request body size limit in MB
    #[serde(default = "default_body_limit_mb")]
    pub body_limit_mb: usize,

    /// Turn handler panics into 500 responses
    #[serde(default = "default_true")]
    pub catch_panic: bool,

    /// CORS mode: "permissive" or "restrictive"
    #[serde(default = "default_cors_mode")]
    pub cors_mode: String,
}

impl Default for MiddlewareConfig {
    fn default() -> Self {
        Self {
            body_limit_mb: default_body_limit_mb(),
            catch_panic: true,
            cors_mode: default_cors_mode(),
        }
    }
}

// Default value functions
fn default_port() -> u16 {
    8080
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_timeout() -> u64 {
    30
}

fn default_environment() -> String {
    "dev".to_string()
}

fn default_page_limit() -> u64 {
    crate::pagination::DEFAULT_LIMIT
}

fn default_max_page_limit() -> u64 {
    crate::pagination::MAX_LIMIT
}

fn default_bypass_prefixes() -> Vec<String> {
    [
        "/admin",
        "/swagger",
        "/media/",
        "/api/v1/auth/",
        "/api/v1/jwt/",
        "/api/v1/token/refresh",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

fn default_envelope_max_body_bytes() -> usize {
    16 * 1024 * 1024
}

fn default_jwt_secret() -> String {
    "insecure-development-secret".to_string()
}

fn default_jwt_algorithm() -> String {
    "HS256".to_string()
}

fn default_media_url_prefix() -> String {
    "/media".to_string()
}

fn default_media_root() -> PathBuf {
    PathBuf::from("./media")
}

fn default_true() -> bool {
    true
}

fn default_body_limit_mb() -> usize {
    10
}

fn default_cors_mode() -> String {
    "permissive".to_string()
}

impl Config {
    /// Load configuration from all sources
    ///
    /// Searches ./config.toml and /etc/hookah-catalog/config.toml, then
    /// applies `HOOKAH_` environment variables on top.
    pub fn load() -> Result<Self> {
        let mut figment = Figment::new().merge(Serialized::defaults(Config::default()));

        // Lowest priority first so that later files override earlier ones
        for path in Self::config_paths().iter().rev() {
            if path.exists() {
                tracing::info!("Loading configuration from: {}", path.display());
                figment = figment.merge(Toml::file(path));
            }
        }

        Self::finish(figment)
    }

    /// Load configuration from a specific file
    ///
    /// Environment variables still override the file.
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        let figment = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Toml::file(path.as_ref()));

        Self::finish(figment)
    }

    fn finish(figment: Figment) -> Result<Self> {
        let config: Config = figment
            .merge(Env::prefixed(ENV_PREFIX).split(ENV_SEPARATOR))
            .extract()?;
        config.validate()?;
        Ok(config)
    }

    /// Config file paths in priority order (highest first)
    fn config_paths() -> Vec<PathBuf> {
        vec![
            PathBuf::from("config.toml"),
            PathBuf::from("/etc/hookah-catalog/config.toml"),
        ]
    }

    /// Reject settings the service cannot run with
    pub fn validate(&self) -> Result<()> {
        let pagination = &self.pagination;
        if pagination.max_limit == 0 {
            return Err(invalid("pagination.max_limit must be at least 1"));
        }
        if pagination.default_limit == 0 || pagination.default_limit > pagination.max_limit {
            return Err(invalid(format!(
                "pagination.default_limit must be between 1 and {}",
                pagination.max_limit
            )));
        }
        if self.jwt.secret.is_empty() {
            return Err(invalid("jwt.secret must not be empty"));
        }
        let prefix = &self.media.url_prefix;
        if !prefix.starts_with('/') || prefix.len() < 2 || prefix.ends_with('/') {
            return Err(invalid("media.url_prefix must be an absolute path such as /media"));
        }
        Ok(())
    }

    /// Request timeout as a [`Duration`]
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.service.timeout_secs)
    }

    /// Whether the JWT secret is still the built-in development value
    pub fn uses_default_jwt_secret(&self) -> bool {
        self.jwt.secret == default_jwt_secret()
    }
}

fn invalid(message: impl Into<String>) -> Error {
    Error::Config(Box::new(figment::Error::from(message.into())))
}

impl Default for Config {
    fn default() -> Self {
        Self {
            service: ServiceConfig {
                name: "hookah-catalog".to_string(),
                port: default_port(),
                log_level: default_log_level(),
                timeout_secs: default_timeout(),
                environment: default_environment(),
            },
            pagination: PaginationConfig::default(),
            envelope: EnvelopeConfig::default(),
            jwt: JwtConfig {
                secret: default_jwt_secret(),
                algorithm: default_jwt_algorithm(),
                issuer: None,
                audience: None,
            },
            media: MediaConfig::default(),
            middleware: MiddlewareConfig::default(),
            seed_demo_data: false,
        }
    }
}
