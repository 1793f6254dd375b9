//! API server configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `BAZAAR_DATABASE_URL` - `PostgreSQL` connection string (falls back to `DATABASE_URL`)
//! - `BAZAAR_TOKEN_SECRET` - Bearer token signing key (min 32 chars, high entropy)
//!
//! ## Optional
//! - `BAZAAR_HOST` - Bind address (default: 127.0.0.1)
//! - `BAZAAR_PORT` - Listen port (default: 5000)
//! - `BAZAAR_ENV` - `development` or `production` (default: development)
//! - `BAZAAR_TOKEN_TTL_DAYS` - Bearer token lifetime in days (default: 30)
//! - `BAZAAR_UPLOAD_DIR` - Directory for uploaded product images (default: uploads)
//! - `BAZAAR_TRUST_PROXY` - `true` to key rate limits on `X-Forwarded-For` /
//!   `X-Real-IP` instead of the peer address (default: false). Only enable
//!   behind a reverse proxy that overwrites these headers.
//! - `BAZAAR_AUTH_RATE_BURST` - Login/registration attempts allowed per client
//!   IP before throttling (default: 5)
//! - `PAYPAL_CLIENT_ID` - Payment provider client ID handed to the browser
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment tag

use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr};
use std::num::NonZeroU32;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};
use thiserror::Error;

const MIN_TOKEN_SECRET_LENGTH: usize = 32;
const MIN_ENTROPY_BITS_PER_CHAR: f64 = 3.3;
const SECONDS_PER_DAY: u64 = 24 * 60 * 60;

/// Blocklist of common placeholder patterns (case-insensitive)
const PLACEHOLDER_PATTERNS: &[&str] = &[
    "your-",
    "changeme",
    "replace",
    "placeholder",
    "example",
    "secret",
    "password",
    "xxx",
    "todo",
    "fixme",
    "insert",
    "enter-",
    "put-your",
    "add-your",
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

/// Deployment environment.
///
/// Production switches logs to JSON and hides diagnostic detail from error
/// responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Environment {
    #[default]
    Development,
    Production,
}

impl Environment {
    #[must_use]
    pub const fn is_production(self) -> bool {
        matches!(self, Self::Production)
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Development => "development",
            Self::Production => "production",
        }
    }
}

impl FromStr for Environment {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "development" | "dev" => Ok(Self::Development),
            "production" | "prod" => Ok(Self::Production),
            other => Err(format!("expected development or production, got {other:?}")),
        }
    }
}

/// API server configuration.
///
/// Implements `Debug` manually to redact secret fields.
#[derive(Clone)]
pub struct ApiConfig {
    /// `PostgreSQL` database connection URL (contains password)
    pub database_url: SecretString,
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Deployment environment
    pub environment: Environment,
    /// Bearer token signing key
    pub token_secret: SecretString,
    /// Bearer token lifetime
    pub token_ttl: Duration,
    /// Where uploaded images are written and served from
    pub upload_dir: PathBuf,
    /// Whether client IPs are taken from reverse-proxy headers
    pub trust_proxy: bool,
    /// Login/registration burst per client IP
    pub auth_rate_burst: NonZeroU32,
    /// Payment provider client ID (public)
    pub paypal_client_id: Option<String>,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    /// Sentry environment tag
    pub sentry_environment: Option<String>,
}

impl std::fmt::Debug for ApiConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiConfig")
            .field("database_url", &"[REDACTED]")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("environment", &self.environment)
            .field("token_secret", &"[REDACTED]")
            .field("token_ttl", &self.token_ttl)
            .field("upload_dir", &self.upload_dir)
            .field("trust_proxy", &self.trust_proxy)
            .field("auth_rate_burst", &self.auth_rate_burst)
            .field("paypal_client_id", &self.paypal_client_id)
            .field("sentry_dsn", &self.sentry_dsn.as_ref().map(|_| "[REDACTED]"))
            .field("sentry_environment", &self.sentry_environment)
            .finish()
    }
}

impl ApiConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing, invalid, or
    /// if secrets fail validation (placeholder detection, entropy check).
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build configuration from an arbitrary variable source.
    ///
    /// # Errors
    ///
    /// Same as [`ApiConfig::from_env`].
    pub fn from_lookup<F>(get: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let env = Env(get);

        let database_url = env
            .get("BAZAAR_DATABASE_URL")
            .or_else(|| env.get("DATABASE_URL"))
            .map(SecretString::from)
            .ok_or_else(|| ConfigError::MissingEnvVar("BAZAAR_DATABASE_URL".to_string()))?;

        let host = env.parse_or("BAZAAR_HOST", "127.0.0.1")?;
        let port = env.parse_or("BAZAAR_PORT", "5000")?;
        let environment = env.parse_or("BAZAAR_ENV", "development")?;

        let token_secret = SecretString::from(env.required("BAZAAR_TOKEN_SECRET")?);
        validate_token_secret(&token_secret, "BAZAAR_TOKEN_SECRET")?;
        validate_secret_strength(token_secret.expose_secret(), "BAZAAR_TOKEN_SECRET")?;

        let ttl_days: u64 = env.parse_or("BAZAAR_TOKEN_TTL_DAYS", "30")?;
        if ttl_days == 0 {
            return Err(ConfigError::InvalidEnvVar(
                "BAZAAR_TOKEN_TTL_DAYS".to_string(),
                "must be at least 1".to_string(),
            ));
        }

        let trust_proxy = env.parse_or("BAZAAR_TRUST_PROXY", "false")?;
        let auth_rate_burst = env.parse_or("BAZAAR_AUTH_RATE_BURST", "5")?;

        Ok(Self {
            database_url,
            host,
            port,
            environment,
            token_secret,
            token_ttl: Duration::from_secs(ttl_days * SECONDS_PER_DAY),
            upload_dir: PathBuf::from(env.or_default("BAZAAR_UPLOAD_DIR", "uploads")),
            trust_proxy,
            auth_rate_burst,
            paypal_client_id: env.get("PAYPAL_CLIENT_ID"),
            sentry_dsn: env.get("SENTRY_DSN"),
            sentry_environment: env.get("SENTRY_ENVIRONMENT"),
        })
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

struct Env<F>(F);

impl<F> Env<F>
where
    F: Fn(&str) -> Option<String>,
{
    /// Get an optional variable, treating empty values as unset.
    fn get(&self, key: &str) -> Option<String> {
        (self.0)(key).filter(|v| !v.trim().is_empty())
    }

    fn required(&self, key: &str) -> Result<String, ConfigError> {
        self.get(key)
            .ok_or_else(|| ConfigError::MissingEnvVar(key.to_string()))
    }

    fn or_default(&self, key: &str, default: &str) -> String {
        self.get(key).unwrap_or_else(|| default.to_string())
    }

    fn parse_or<T>(&self, key: &str, default: &str) -> Result<T, ConfigError>
    where
        T: FromStr,
        T::Err: std::fmt::Display,
    {
        self.or_default(key, default)
            .trim()
            .parse::<T>()
            .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
    }
}

/// Validate that a token secret meets minimum length requirements.
fn validate_token_secret(secret: &SecretString, var_name: &str) -> Result<(), ConfigError> {
    let value = secret.expose_secret();
    if value.len() < MIN_TOKEN_SECRET_LENGTH {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!(
                "must be at least {} characters (got {})",
                MIN_TOKEN_SECRET_LENGTH,
                value.len()
            ),
        ));
    }
    Ok(())
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
    let len = s.len() as f64;
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

    for pattern in PLACEHOLDER_PATTERNS {
        if lower.contains(pattern) {
            return Err(ConfigError::InsecureSecret(
                var_name.to_string(),
                format!("appears to be a placeholder (contains '{pattern}')"),
            ));
        }
    }

    let entropy = shannon_entropy(secret);
    if entropy < MIN_ENTROPY_BITS_PER_CHAR {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!(
                "entropy too low ({entropy:.2} bits/char, need >= {MIN_ENTROPY_BITS_PER_CHAR:.1}). Use a randomly generated secret."
            ),
        ));
    }

    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    const GOOD_SECRET: &str = "aB3$xY9!mK2@nL5#pQ7&rT0*uW4^zC6%";

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    fn minimal() -> Vec<(&'static str, &'static str)> {
        vec![
            ("BAZAAR_DATABASE_URL", "postgres://localhost/bazaar"),
            ("BAZAAR_TOKEN_SECRET", GOOD_SECRET),
        ]
    }

    #[test]
    fn test_shannon_entropy_empty() {
        assert!((shannon_entropy("") - 0.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_shannon_entropy_two_chars() {
        let entropy = shannon_entropy("ab");
        assert!((entropy - 1.0).abs() < 0.01);
    }

    #[test]
    fn test_validate_secret_strength_placeholder() {
        let err = validate_secret_strength("your-api-key-here", "TEST_VAR").unwrap_err();
        assert!(matches!(err, ConfigError::InsecureSecret(_, _)));
    }

    #[test]
    fn test_validate_secret_strength_low_entropy() {
        let result = validate_secret_strength("aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa", "TEST_VAR");
        assert!(result.is_err());
    }

    #[test]
    fn test_validate_secret_strength_valid() {
        assert!(validate_secret_strength(GOOD_SECRET, "TEST_VAR").is_ok());
    }

    #[test]
    fn test_validate_token_secret_too_short() {
        let secret = SecretString::from("short");
        assert!(validate_token_secret(&secret, "TEST_TOKEN").is_err());
    }

    #[test]
    fn test_defaults() {
        let config = ApiConfig::from_lookup(lookup(&minimal())).unwrap();
        assert_eq!(config.socket_addr().to_string(), "127.0.0.1:5000");
        assert_eq!(config.environment, Environment::Development);
        assert_eq!(config.token_ttl, Duration::from_secs(30 * SECONDS_PER_DAY));
        assert_eq!(config.upload_dir, PathBuf::from("uploads"));
        assert_eq!(config.paypal_client_id, None);
        assert!(!config.trust_proxy);
        assert_eq!(config.auth_rate_burst.get(), 5);
    }

    #[test]
    fn test_database_url_fallback() {
        let config = ApiConfig::from_lookup(lookup(&[
            ("DATABASE_URL", "postgres://fallback/db"),
            ("BAZAAR_TOKEN_SECRET", GOOD_SECRET),
        ]))
        .unwrap();
        assert_eq!(config.database_url.expose_secret(), "postgres://fallback/db");
    }

    #[test]
    fn test_missing_token_secret() {
        let err = ApiConfig::from_lookup(lookup(&[(
            "BAZAAR_DATABASE_URL",
            "postgres://localhost/bazaar",
        )]))
        .unwrap_err();
        assert!(matches!(err, ConfigError::MissingEnvVar(ref k) if k == "BAZAAR_TOKEN_SECRET"));
    }

    #[test]
    fn test_overrides() {
        let mut vars = minimal();
        vars.extend([
            ("BAZAAR_HOST", "0.0.0.0"),
            ("BAZAAR_PORT", "8080"),
            ("BAZAAR_ENV", "production"),
            ("BAZAAR_TOKEN_TTL_DAYS", "7"),
            ("PAYPAL_CLIENT_ID", "sb-client"),
            ("BAZAAR_TRUST_PROXY", "true"),
            ("BAZAAR_AUTH_RATE_BURST", "1000"),
        ]);
        let config = ApiConfig::from_lookup(lookup(&vars)).unwrap();
        assert_eq!(config.socket_addr().to_string(), "0.0.0.0:8080");
        assert!(config.environment.is_production());
        assert_eq!(config.token_ttl, Duration::from_secs(7 * SECONDS_PER_DAY));
        assert_eq!(config.paypal_client_id.as_deref(), Some("sb-client"));
        assert!(config.trust_proxy);
        assert_eq!(config.auth_rate_burst.get(), 1000);
    }

    #[test]
    fn test_invalid_values() {
        for (key, value) in [
            ("BAZAAR_PORT", "not-a-port"),
            ("BAZAAR_ENV", "staging"),
            ("BAZAAR_TOKEN_TTL_DAYS", "0"),
            ("BAZAAR_TRUST_PROXY", "yes"),
            ("BAZAAR_AUTH_RATE_BURST", "0"),
        ] {
            let mut vars = minimal();
            vars.push((key, value));
            let err = ApiConfig::from_lookup(lookup(&vars)).unwrap_err();
            assert!(
                matches!(err, ConfigError::InvalidEnvVar(ref k, _) if k == key),
                "{key}={value}"
            );
        }
    }

    #[test]
    fn test_debug_redacts_secrets() {
        let config = ApiConfig::from_lookup(lookup(&minimal())).unwrap();
        let debug_output = format!("{config:?}");
        assert!(debug_output.contains("[REDACTED]"));
        assert!(!debug_output.contains(GOOD_SECRET));
        assert!(!debug_output.contains("postgres://"));
    }
}
