//! Storefront configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `RINGSIDE_BASE_URL` - Public URL for the storefront
//! - `RINGSIDE_API_URL` - Base URL of the Ringside REST backend
//!
//! ## Optional
//! - `RINGSIDE_HOST` - Bind address (default: 127.0.0.1)
//! - `RINGSIDE_PORT` - Listen port (default: 3000)
//! - `RINGSIDE_TRUST_PROXY_HEADERS` - Rate limit by proxy client-IP headers (default: false)
//! - `RINGSIDE_API_KEY` - Key sent to the backend as `x-api-key`
//! - `RINGSIDE_API_TIMEOUT_SECS` - Backend request timeout (default: 10)
//! - `RINGSIDE_CURRENCY` - Display currency (default: USD)
//! - `RINGSIDE_SHIPPING_FLAT_RATE` - Merch shipping charge (default: 7.99)
//! - `RINGSIDE_FREE_SHIPPING_OVER` - Free shipping threshold (default: 75.00)
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment name
//! - `SENTRY_SAMPLE_RATE` - Error sample rate (default: 1.0)
//! - `SENTRY_TRACES_SAMPLE_RATE` - Transaction sample rate (default: 0.0)

use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr};
use std::str::FromStr;
use std::time::Duration;

use ringside_core::{CurrencyCode, ShippingPolicy};
use rust_decimal::Decimal;
use secrecy::SecretString;
use thiserror::Error;
use url::Url;

const MIN_ENTROPY_BITS_PER_CHAR: f64 = 3.3;

/// Blocklist of common placeholder patterns (case-insensitive)
const PLACEHOLDER_PATTERNS: &[&str] = &[
    "your-",
    "changeme",
    "replace",
    "placeholder",
    "example",
    "xxx",
    "todo",
    "insert",
];

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
    #[error("Insecure secret in {0}: {1}")]
    InsecureSecret(String, String),
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
    /// Identify clients by proxy headers; only safe behind a reverse proxy
    pub trust_proxy_headers: bool,
    /// REST backend configuration
    pub api: ApiConfig,
    /// Merch shop pricing configuration
    pub shop: ShopConfig,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    /// Sentry environment name (e.g. "production")
    pub sentry_environment: Option<String>,
    /// Share of errors reported to Sentry
    pub sentry_sample_rate: f32,
    /// Share of transactions traced to Sentry
    pub sentry_traces_sample_rate: f32,
}

/// REST backend configuration.
///
/// Implements `Debug` manually to redact the API key.
#[derive(Clone)]
pub struct ApiConfig {
    /// Backend base URL, without trailing slash
    pub base_url: Url,
    /// Optional key sent with every request
    pub api_key: Option<SecretString>,
    /// Per-request timeout
    pub timeout: Duration,
}

impl std::fmt::Debug for ApiConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiConfig")
            .field("base_url", &self.base_url.as_str())
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .field("timeout", &self.timeout)
            .finish()
    }
}

/// Merch pricing configuration.
#[derive(Debug, Clone, Copy, Default)]
pub struct ShopConfig {
    /// Currency prices are displayed in
    pub currency: CurrencyCode,
    /// Shipping charges for merch orders
    pub shipping: ShippingPolicy,
}

impl StorefrontConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing, invalid, or
    /// if the API key fails validation (placeholder detection, entropy check).
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let host = parse_env("RINGSIDE_HOST", "127.0.0.1")?;
        let port = parse_env("RINGSIDE_PORT", "3000")?;
        let base_url = get_required_env("RINGSIDE_BASE_URL")?;
        let trust_proxy_headers = parse_env("RINGSIDE_TRUST_PROXY_HEADERS", "false")?;

        let api = ApiConfig::from_env()?;
        let shop = ShopConfig::from_env()?;

        Ok(Self {
            host,
            port,
            base_url,
            trust_proxy_headers,
            api,
            shop,
            sentry_dsn: get_optional_env("SENTRY_DSN"),
            sentry_environment: get_optional_env("SENTRY_ENVIRONMENT"),
            sentry_sample_rate: parse_env("SENTRY_SAMPLE_RATE", "1.0")?,
            sentry_traces_sample_rate: parse_env("SENTRY_TRACES_SAMPLE_RATE", "0.0")?,
        })
    }

    /// Local configuration pointing at the given backend, with Sentry off.
    #[must_use]
    pub fn local(api: ApiConfig) -> Self {
        Self {
            host: IpAddr::from([127, 0, 0, 1]),
            port: 3000,
            base_url: "http://localhost:3000".to_string(),
            trust_proxy_headers: false,
            api,
            shop: ShopConfig::default(),
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

    /// Whether cookies should be marked `Secure`.
    #[must_use]
    pub fn is_secure(&self) -> bool {
        self.base_url.starts_with("https://")
    }
}

impl ApiConfig {
    /// Configuration for a backend at `base_url` with no key and the default timeout.
    #[must_use]
    pub const fn new(base_url: Url) -> Self {
        Self {
            base_url,
            api_key: None,
            timeout: Duration::from_secs(10),
        }
    }

    fn from_env() -> Result<Self, ConfigError> {
        let raw = get_required_env("RINGSIDE_API_URL")?;
        let base_url = parse_base_url("RINGSIDE_API_URL", &raw)?;

        let api_key = match get_optional_env("RINGSIDE_API_KEY") {
            Some(key) => {
                validate_secret_strength(&key, "RINGSIDE_API_KEY")?;
                Some(SecretString::from(key))
            }
            None => None,
        };

        let timeout_secs: u64 = parse_env("RINGSIDE_API_TIMEOUT_SECS", "10")?;
        if timeout_secs == 0 {
            return Err(ConfigError::InvalidEnvVar(
                "RINGSIDE_API_TIMEOUT_SECS".to_string(),
                "must be greater than zero".to_string(),
            ));
        }

        Ok(Self {
            base_url,
            api_key,
            timeout: Duration::from_secs(timeout_secs),
        })
    }
}

impl ShopConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let currency = get_env_or_default("RINGSIDE_CURRENCY", "USD")
            .parse::<CurrencyCode>()
            .map_err(|e| ConfigError::InvalidEnvVar("RINGSIDE_CURRENCY".to_string(), e))?;
        let flat_rate: Decimal = parse_env("RINGSIDE_SHIPPING_FLAT_RATE", "7.99")?;
        let free_over: Decimal = parse_env("RINGSIDE_FREE_SHIPPING_OVER", "75.00")?;

        for (key, value) in [
            ("RINGSIDE_SHIPPING_FLAT_RATE", flat_rate),
            ("RINGSIDE_FREE_SHIPPING_OVER", free_over),
        ] {
            if value.is_sign_negative() {
                return Err(ConfigError::InvalidEnvVar(
                    key.to_string(),
                    "must not be negative".to_string(),
                ));
            }
        }

        Ok(Self {
            currency,
            shipping: ShippingPolicy {
                flat_rate,
                free_over,
            },
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

/// Get an optional environment variable, treating empty values as unset.
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

/// Get an environment variable with a default value.
fn get_env_or_default(key: &str, default: &str) -> String {
    get_optional_env(key).unwrap_or_else(|| default.to_string())
}

/// Parse an environment variable (or its default) into `T`.
fn parse_env<T>(key: &str, default: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    get_env_or_default(key, default)
        .trim()
        .parse::<T>()
        .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
}

/// Parse the backend URL, requiring http(s) and stripping a trailing slash.
fn parse_base_url(key: &str, raw: &str) -> Result<Url, ConfigError> {
    let url = Url::parse(raw.trim().trim_end_matches('/'))
        .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(ConfigError::InvalidEnvVar(
            key.to_string(),
            format!("unsupported scheme '{}'", url.scheme()),
        ));
    }
    Ok(url)
}

/// Calculate Shannon entropy in bits per character.
fn shannon_entropy(s: &str) -> f64 {
    if s.is_empty() {
        return 0.0;
    }

    let mut freq: HashMap<char, usize> = HashMap::new();
    for c in s.chars() {
        *freq.entry(c).or_insert(0) += 1;
    }

    #[allow(clippy::cast_precision_loss)] // String length will never exceed f64 precision
    let len = s.chars().count() as f64;
    freq.values()
        .map(|&count| {
            #[allow(clippy::cast_precision_loss)]
            let p = count as f64 / len;
            -p * p.log2()
        })
        .sum()
}

/// Validate that a secret is not a placeholder and has sufficient entropy.
fn validate_secret_strength(secret: &str, var_name: &str) -> Result<(), ConfigError> {
    let lower = secret.to_lowercase();

    if let Some(pattern) = PLACEHOLDER_PATTERNS.iter().find(|p| lower.contains(**p)) {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!("appears to be a placeholder (contains '{pattern}')"),
        ));
    }

    let entropy = shannon_entropy(secret);
    if entropy < MIN_ENTROPY_BITS_PER_CHAR {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!(
                "entropy too low ({entropy:.2} bits/char, need >= {MIN_ENTROPY_BITS_PER_CHAR:.1})"
            ),
        ));
    }

    Ok(())
}
