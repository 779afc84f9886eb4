//! Storefront configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `STOREFRONT_DATABASE_URL` - `PostgreSQL` connection string (falls back to `DATABASE_URL`)
//! - `STOREFRONT_BASE_URL` - Public URL for the storefront API
//!
//! ## Optional
//! - `STOREFRONT_HOST` - Bind address (default: 127.0.0.1)
//! - `STOREFRONT_PORT` - Listen port (default: 3001)
//! - `STOREFRONT_ALLOWED_ORIGINS` - Comma-separated CORS origins (default: `http://localhost:5173`)
//! - `STOREFRONT_IMAGES_DIR` - Directory scanned for product images (default: `public/images`)
//! - `STOREFRONT_UPLOADS_DIR` - Directory holding uploaded product images (default: `uploads`)
//! - `CART_MAX_SESSIONS` - Maximum number of carts kept in memory (default: 10000)
//! - `CART_IDLE_TTL_SECS` - Drop carts idle for this many seconds (default: never)
//! - `CATALOG_COMPARE_AT_MULTIPLIER` - Show a strikethrough price of `price * multiplier`
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment name
//! - `SENTRY_SAMPLE_RATE` - Error sample rate (default: 1.0)
//! - `SENTRY_TRACES_SAMPLE_RATE` - Performance trace sample rate (default: 0.0)
//! - `LOG_FORMAT` - `text` or `json` (default: text)

use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use rust_decimal::Decimal;
use secrecy::SecretString;
use thiserror::Error;

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

/// Storefront application configuration.
#[derive(Debug, Clone)]
pub struct StorefrontConfig {
    /// `PostgreSQL` database connection URL (contains password)
    pub database_url: SecretString,
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Public base URL for the storefront
    pub base_url: String,
    /// Origins allowed to call the API from a browser
    pub allowed_origins: Vec<String>,
    /// Directory scanned for `{id}(n).ext` product images, served at `/images`
    pub images_dir: PathBuf,
    /// Directory holding uploaded product images, served at `/uploads`
    pub uploads_dir: PathBuf,
    /// In-memory cart store settings
    pub cart: CartConfig,
    /// Catalog display settings
    pub catalog: CatalogConfig,
    /// Log output format
    pub log_format: LogFormat,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    /// Sentry environment (e.g. "production", "staging")
    pub sentry_environment: Option<String>,
    /// Fraction of errors sent to Sentry
    pub sentry_sample_rate: f32,
    /// Fraction of transactions traced
    pub sentry_traces_sample_rate: f32,
}

/// Settings for the session-keyed cart store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CartConfig {
    /// Upper bound on concurrently stored carts; least recently used carts are evicted.
    pub max_sessions: u64,
    /// Carts untouched for this long are dropped. `None` keeps them for the process lifetime.
    pub idle_ttl: Option<Duration>,
}

impl Default for CartConfig {
    fn default() -> Self {
        Self {
            max_sessions: 10_000,
            idle_ttl: None,
        }
    }
}

/// Catalog display settings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CatalogConfig {
    /// When set, products carry a `compare_at_price` of `price * multiplier`.
    /// Display only; never used for cart or order pricing.
    pub compare_at_multiplier: Option<Decimal>,
}

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    /// Human-readable lines.
    #[default]
    Text,
    /// One JSON object per event, for log shippers.
    Json,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "text" | "pretty" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            other => Err(format!("expected `text` or `json`, got `{other}`")),
        }
    }
}

impl StorefrontConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing or a value
    /// cannot be parsed.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let database_url = get_database_url("STOREFRONT_DATABASE_URL")?;
        let host = parse_env("STOREFRONT_HOST", &get_env_or_default("STOREFRONT_HOST", "127.0.0.1"))?;
        let port = parse_env("STOREFRONT_PORT", &get_env_or_default("STOREFRONT_PORT", "3001"))?;
        let base_url = get_required_env("STOREFRONT_BASE_URL")?;
        let allowed_origins = parse_list(&get_env_or_default(
            "STOREFRONT_ALLOWED_ORIGINS",
            "http://localhost:5173",
        ));
        let images_dir = PathBuf::from(get_env_or_default("STOREFRONT_IMAGES_DIR", "public/images"));
        let uploads_dir = PathBuf::from(get_env_or_default("STOREFRONT_UPLOADS_DIR", "uploads"));

        let cart = CartConfig::from_env()?;
        let catalog = CatalogConfig::from_env()?;

        let log_format = get_optional_env("LOG_FORMAT")
            .map(|raw| parse_env("LOG_FORMAT", &raw))
            .transpose()?
            .unwrap_or_default();

        let sentry_dsn = get_optional_env("SENTRY_DSN");
        let sentry_environment = get_optional_env("SENTRY_ENVIRONMENT");
        let sentry_sample_rate = parse_rate(
            "SENTRY_SAMPLE_RATE",
            &get_env_or_default("SENTRY_SAMPLE_RATE", "1.0"),
        )?;
        let sentry_traces_sample_rate = parse_rate(
            "SENTRY_TRACES_SAMPLE_RATE",
            &get_env_or_default("SENTRY_TRACES_SAMPLE_RATE", "0.0"),
        )?;

        Ok(Self {
            database_url,
            host,
            port,
            base_url,
            allowed_origins,
            images_dir,
            uploads_dir,
            cart,
            catalog,
            log_format,
            sentry_dsn,
            sentry_environment,
            sentry_sample_rate,
            sentry_traces_sample_rate,
        })
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    /// Whether session cookies should carry the `Secure` attribute.
    #[must_use]
    pub fn secure_cookies(&self) -> bool {
        self.base_url.starts_with("https://")
    }
}

impl CartConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();
        let max_sessions = get_optional_env("CART_MAX_SESSIONS")
            .map(|raw| parse_env("CART_MAX_SESSIONS", &raw))
            .transpose()?
            .unwrap_or(defaults.max_sessions);
        let idle_ttl = get_optional_env("CART_IDLE_TTL_SECS")
            .map(|raw| parse_env::<u64>("CART_IDLE_TTL_SECS", &raw))
            .transpose()?
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs);

        Ok(Self {
            max_sessions,
            idle_ttl,
        })
    }
}

impl CatalogConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let compare_at_multiplier = get_optional_env("CATALOG_COMPARE_AT_MULTIPLIER")
            .map(|raw| parse_env::<Decimal>("CATALOG_COMPARE_AT_MULTIPLIER", &raw))
            .transpose()?;

        if let Some(multiplier) = compare_at_multiplier
            && multiplier <= Decimal::ONE
        {
            return Err(ConfigError::InvalidEnvVar(
                "CATALOG_COMPARE_AT_MULTIPLIER".to_string(),
                format!("must be greater than 1 (got {multiplier})"),
            ));
        }

        Ok(Self {
            compare_at_multiplier,
        })
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Get a required environment variable.
fn get_required_env(key: &str) -> Result<String, ConfigError> {
    std::env::var(key).map_err(|_| ConfigError::MissingEnvVar(key.to_string()))
}

/// Get database URL with fallback to generic `DATABASE_URL`.
fn get_database_url(primary_key: &str) -> Result<SecretString, ConfigError> {
    if let Ok(value) = std::env::var(primary_key) {
        return Ok(SecretString::from(value));
    }
    if let Ok(value) = std::env::var("DATABASE_URL") {
        return Ok(SecretString::from(value));
    }
    Err(ConfigError::MissingEnvVar(primary_key.to_string()))
}

/// Get an optional environment variable. Blank values count as unset.
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

/// Get an environment variable with a default value.
fn get_env_or_default(key: &str, default: &str) -> String {
    get_optional_env(key).unwrap_or_else(|| default.to_string())
}

/// Parse a raw value, attributing failures to `key`.
fn parse_env<T>(key: &str, raw: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    raw.trim()
        .parse::<T>()
        .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
}

/// Parse a sample rate in `0.0..=1.0`.
fn parse_rate(key: &str, raw: &str) -> Result<f32, ConfigError> {
    let rate: f32 = parse_env(key, raw)?;
    if (0.0..=1.0).contains(&rate) {
        Ok(rate)
    } else {
        Err(ConfigError::InvalidEnvVar(
            key.to_string(),
            format!("must be between 0.0 and 1.0 (got {rate})"),
        ))
    }
}

/// Split a comma-separated list, dropping blanks and trailing slashes.
fn parse_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|item| item.trim().trim_end_matches('/'))
        .filter(|item| !item.is_empty())
        .map(String::from)
        .collect()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn test_config() -> StorefrontConfig {
        StorefrontConfig {
            database_url: SecretString::from("postgres://localhost/paw_test"),
            host: "127.0.0.1".parse().unwrap(),
            port: 3001,
            base_url: "http://localhost:3001".to_string(),
            allowed_origins: vec!["http://localhost:5173".to_string()],
            images_dir: PathBuf::from("public/images"),
            uploads_dir: PathBuf::from("uploads"),
            cart: CartConfig::default(),
            catalog: CatalogConfig::default(),
            log_format: LogFormat::Text,
            sentry_dsn: None,
            sentry_environment: None,
            sentry_sample_rate: 1.0,
            sentry_traces_sample_rate: 0.0,
        }
    }

    #[test]
    fn test_socket_addr() {
        let addr = test_config().socket_addr();
        assert_eq!(addr.ip().to_string(), "127.0.0.1");
        assert_eq!(addr.port(), 3001);
    }

    #[test]
    fn test_secure_cookies_follow_base_url_scheme() {
        let mut config = test_config();
        assert!(!config.secure_cookies());

        config.base_url = "https://api.thepawinternational.com".to_string();
        assert!(config.secure_cookies());
    }

    #[test]
    fn test_parse_list_trims_and_drops_blanks() {
        let origins = parse_list(" http://localhost:5173/ , ,https://thepawinternational.com");
        assert_eq!(
            origins,
            vec![
                "http://localhost:5173".to_string(),
                "https://thepawinternational.com".to_string()
            ]
        );
    }

    #[test]
    fn test_parse_env_reports_key() {
        let err = parse_env::<u16>("STOREFRONT_PORT", "eighty").unwrap_err();
        assert!(matches!(err, ConfigError::InvalidEnvVar(ref key, _) if key == "STOREFRONT_PORT"));
        assert_eq!(parse_env::<u16>("STOREFRONT_PORT", " 8080 ").unwrap(), 8080);
    }

    #[test]
    fn test_parse_rate_bounds() {
        assert!((parse_rate("SENTRY_SAMPLE_RATE", "0.25").unwrap() - 0.25).abs() < f32::EPSILON);
        assert!(parse_rate("SENTRY_SAMPLE_RATE", "1.5").is_err());
        assert!(parse_rate("SENTRY_SAMPLE_RATE", "-0.1").is_err());
    }

    #[test]
    fn test_log_format_parse() {
        assert_eq!("json".parse::<LogFormat>().unwrap(), LogFormat::Json);
        assert_eq!(" TEXT ".parse::<LogFormat>().unwrap(), LogFormat::Text);
        assert!("yaml".parse::<LogFormat>().is_err());
    }

    #[test]
    fn test_cart_config_defaults() {
        let cart = CartConfig::default();
        assert_eq!(cart.max_sessions, 10_000);
        assert!(cart.idle_ttl.is_none());
    }
}
