//! Storefront configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `QKART_BACKEND_URL` - Base endpoint of the QKart REST API
//!   (e.g., `https://qkart.example.com/api/v1`). Must be HTTPS unless it
//!   points at a loopback address.
//!
//! ## Optional
//! - `STOREFRONT_HOST` - Bind address (default: 127.0.0.1)
//! - `STOREFRONT_PORT` - Listen port (default: 3000)
//! - `STOREFRONT_BASE_URL` - Public URL (default: `http://{host}:{port}`)
//! - `SEARCH_DEBOUNCE_MS` - Quiet period before a search is sent (default: 500)
//! - `BACKEND_TIMEOUT_SECS` - Per-request backend timeout (default: 10)
//! - `CATALOG_CACHE_TTL_SECS` - How long the full catalog is cached (default: 60)
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment name
//! - `SENTRY_SAMPLE_RATE` - Error event sample rate (default: 1.0)
//! - `SENTRY_TRACES_SAMPLE_RATE` - Transaction sample rate (default: 0.0)

use std::fmt::Display;
use std::net::{IpAddr, SocketAddr};
use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;
use url::{Host, Url};

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
    #[error("Insecure endpoint in {0}: {1}")]
    InsecureEndpoint(String, String),
}

/// Storefront application configuration.
#[derive(Debug, Clone)]
pub struct StorefrontConfig {
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Public base URL for the storefront
    pub base_url: String,
    /// QKart REST API configuration
    pub backend: BackendConfig,
    /// Quiet period a search term must survive before it is sent
    pub search_debounce: Duration,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    /// Sentry environment (e.g., "production")
    pub sentry_environment: Option<String>,
    /// Fraction of error events sent to Sentry
    pub sentry_sample_rate: f32,
    /// Fraction of transactions sent to Sentry
    pub sentry_traces_sample_rate: f32,
}

/// QKart REST API configuration.
#[derive(Debug, Clone)]
pub struct BackendConfig {
    /// Base endpoint; all API paths are joined onto it
    pub base_url: Url,
    /// Timeout applied to every backend request
    pub timeout: Duration,
    /// Time-to-live of the cached full catalog
    pub catalog_ttl: Duration,
}

impl StorefrontConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing or invalid, or
    /// if the backend endpoint is not HTTPS.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let host: IpAddr = get_parsed_or_default("STOREFRONT_HOST", "127.0.0.1")?;
        let port: u16 = get_parsed_or_default("STOREFRONT_PORT", "3000")?;
        let base_url = get_optional_env("STOREFRONT_BASE_URL")
            .unwrap_or_else(|| format!("http://{}", SocketAddr::new(host, port)));

        let backend = BackendConfig::from_env()?;
        let search_debounce =
            Duration::from_millis(get_parsed_or_default("SEARCH_DEBOUNCE_MS", "500")?);

        Ok(Self {
            host,
            port,
            base_url,
            backend,
            search_debounce,
            sentry_dsn: get_optional_env("SENTRY_DSN"),
            sentry_environment: get_optional_env("SENTRY_ENVIRONMENT"),
            sentry_sample_rate: get_parsed_or_default("SENTRY_SAMPLE_RATE", "1.0")?,
            sentry_traces_sample_rate: get_parsed_or_default("SENTRY_TRACES_SAMPLE_RATE", "0.0")?,
        })
    }

    /// Local configuration around an explicit backend, with every optional
    /// setting at its default and Sentry disabled.
    #[must_use]
    pub fn with_backend(backend: BackendConfig) -> Self {
        let host = IpAddr::from([127, 0, 0, 1]);
        let port = 3000;
        Self {
            host,
            port,
            base_url: format!("http://{}", SocketAddr::new(host, port)),
            backend,
            search_debounce: Duration::from_millis(500),
            sentry_dsn: None,
            sentry_environment: None,
            sentry_sample_rate: 1.0,
            sentry_traces_sample_rate: 0.0,
        }
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    /// Whether the storefront is served over HTTPS (controls `Secure` cookies).
    #[must_use]
    pub fn is_secure(&self) -> bool {
        self.base_url.starts_with("https://")
    }
}

impl BackendConfig {
    /// Configuration for `base_url` with default timeout and cache TTL.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the URL is invalid or insecure.
    pub fn new(base_url: &str) -> Result<Self, ConfigError> {
        Ok(Self {
            base_url: parse_backend_url(base_url, "QKART_BACKEND_URL")?,
            timeout: Duration::from_secs(10),
            catalog_ttl: Duration::from_secs(60),
        })
    }

    fn from_env() -> Result<Self, ConfigError> {
        let raw = get_required_env("QKART_BACKEND_URL")?;
        let base_url = parse_backend_url(&raw, "QKART_BACKEND_URL")?;

        Ok(Self {
            base_url,
            timeout: Duration::from_secs(get_parsed_or_default("BACKEND_TIMEOUT_SECS", "10")?),
            catalog_ttl: Duration::from_secs(get_parsed_or_default(
                "CATALOG_CACHE_TTL_SECS",
                "60",
            )?),
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

/// Get an optional environment variable.
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok()
}

/// Get an environment variable with a default value.
fn get_env_or_default(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Get an environment variable with a default value and parse it.
fn get_parsed_or_default<T>(key: &str, default: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: Display,
{
    get_env_or_default(key, default)
        .parse::<T>()
        .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
}

/// Parse the backend endpoint, requiring HTTPS for anything but loopback.
///
/// A trailing slash is added so relative API paths join under the base path
/// instead of replacing its last segment.
fn parse_backend_url(raw: &str, var_name: &str) -> Result<Url, ConfigError> {
    let mut url =
        Url::parse(raw).map_err(|e| ConfigError::InvalidEnvVar(var_name.to_string(), e.to_string()))?;

    match url.scheme() {
        "https" => {}
        "http" if is_loopback(&url) => {}
        scheme => {
            return Err(ConfigError::InsecureEndpoint(
                var_name.to_string(),
                format!("scheme '{scheme}' is not allowed for non-loopback hosts"),
            ));
        }
    }

    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }

    Ok(url)
}

fn is_loopback(url: &Url) -> bool {
    match url.host() {
        Some(Host::Domain(domain)) => domain == "localhost",
        Some(Host::Ipv4(ip)) => ip.is_loopback(),
        Some(Host::Ipv6(ip)) => ip.is_loopback(),
        None => false,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn test_config() -> StorefrontConfig {
        StorefrontConfig {
            host: "127.0.0.1".parse().unwrap(),
            port: 3000,
            base_url: "http://localhost:3000".to_string(),
            backend: BackendConfig {
                base_url: Url::parse("https://qkart.example.com/api/v1/").unwrap(),
                timeout: Duration::from_secs(10),
                catalog_ttl: Duration::from_secs(60),
            },
            search_debounce: Duration::from_millis(500),
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
        assert_eq!(addr.port(), 3000);
    }

    #[test]
    fn test_is_secure() {
        let mut config = test_config();
        assert!(!config.is_secure());

        config.base_url = "https://shop.example.com".to_string();
        assert!(config.is_secure());
    }

    #[test]
    fn test_backend_url_https_accepted_with_trailing_slash() {
        let url = parse_backend_url("https://qkart.example.com/api/v1", "TEST_VAR").unwrap();
        assert_eq!(url.as_str(), "https://qkart.example.com/api/v1/");
        assert_eq!(
            url.join("products").unwrap().as_str(),
            "https://qkart.example.com/api/v1/products"
        );
    }

    #[test]
    fn test_backend_url_plain_http_loopback_accepted() {
        assert!(parse_backend_url("http://127.0.0.1:8082/api/v1", "TEST_VAR").is_ok());
        assert!(parse_backend_url("http://localhost:8082/api/v1", "TEST_VAR").is_ok());
        assert!(parse_backend_url("http://[::1]:8082/api/v1", "TEST_VAR").is_ok());
    }

    #[test]
    fn test_backend_url_plain_http_remote_rejected() {
        let err = parse_backend_url("http://qkart.example.com/api/v1", "TEST_VAR").unwrap_err();
        assert!(matches!(err, ConfigError::InsecureEndpoint(_, _)));
    }

    #[test]
    fn test_with_backend_defaults() {
        let backend = BackendConfig::new("http://127.0.0.1:8082/api/v1").unwrap();
        let config = StorefrontConfig::with_backend(backend);
        assert_eq!(config.backend.base_url.as_str(), "http://127.0.0.1:8082/api/v1/");
        assert_eq!(config.search_debounce, Duration::from_millis(500));
        assert_eq!(config.backend.timeout, Duration::from_secs(10));
        assert!(config.sentry_dsn.is_none());
    }

    #[test]
    fn test_backend_url_garbage_rejected() {
        let err = parse_backend_url("not a url", "TEST_VAR").unwrap_err();
        assert!(matches!(err, ConfigError::InvalidEnvVar(_, _)));
    }
}
