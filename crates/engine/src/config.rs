//! Engine configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Optional
//! - `CART_API_BASE_URL` - Base URL of the remote cart store (required for HTTP mode)
//! - `CART_API_TOKEN` - Bearer token for the remote cart store (high entropy)
//! - `CART_DELIVERY_FEE` - Flat delivery fee added to every cart (default: 0)
//! - `CART_CURRENCY` - ISO 4217 currency code (default: USD)
//! - `SENTRY_DSN` - Sentry error tracking DSN

use std::collections::HashMap;

use cartsync_core::{CurrencyCode, PricingPolicy};
use rust_decimal::Decimal;
use secrecy::SecretString;
use thiserror::Error;
use url::Url;

const MIN_ENTROPY_BITS_PER_CHAR: f64 = 3.0;

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
    "put-your",
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

/// Engine configuration.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Remote cart store endpoint, when one is configured
    pub api: Option<RemoteApiConfig>,
    /// Flat delivery fee
    pub delivery_fee: Decimal,
    /// Currency for all cart amounts
    pub currency_code: CurrencyCode,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
}

/// Remote cart store endpoint configuration.
///
/// Implements `Debug` manually to redact the token.
#[derive(Clone)]
pub struct RemoteApiConfig {
    /// Base URL (e.g., <https://api.example.com/v1/>)
    pub base_url: Url,
    /// Bearer token sent with every request
    pub token: Option<SecretString>,
}

impl std::fmt::Debug for RemoteApiConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RemoteApiConfig")
            .field("base_url", &self.base_url.as_str())
            .field("token", &self.token.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            api: None,
            delivery_fee: Decimal::ZERO,
            currency_code: CurrencyCode::default(),
            sentry_dsn: None,
        }
    }
}

impl EngineConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a variable is present but invalid, or if the
    /// API token fails validation (placeholder detection, entropy check).
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration from an arbitrary key lookup.
    ///
    /// # Errors
    ///
    /// Same as [`EngineConfig::from_env`].
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let api = match non_empty(lookup("CART_API_BASE_URL")) {
            Some(raw) => Some(RemoteApiConfig {
                base_url: parse_base_url("CART_API_BASE_URL", &raw)?,
                token: non_empty(lookup("CART_API_TOKEN"))
                    .map(|token| validated_secret("CART_API_TOKEN", token))
                    .transpose()?,
            }),
            None => None,
        };

        let delivery_fee = match non_empty(lookup("CART_DELIVERY_FEE")) {
            Some(raw) => parse_fee("CART_DELIVERY_FEE", &raw)?,
            None => Decimal::ZERO,
        };

        let currency_code = match non_empty(lookup("CART_CURRENCY")) {
            Some(raw) => raw.parse::<CurrencyCode>().map_err(|e| {
                ConfigError::InvalidEnvVar("CART_CURRENCY".to_string(), e.to_string())
            })?,
            None => CurrencyCode::default(),
        };

        Ok(Self {
            api,
            delivery_fee,
            currency_code,
            sentry_dsn: non_empty(lookup("SENTRY_DSN")),
        })
    }

    /// Pricing constants derived from this configuration.
    #[must_use]
    pub const fn pricing(&self) -> PricingPolicy {
        PricingPolicy::new(self.delivery_fee, self.currency_code)
    }

    /// The remote endpoint, or an error naming the missing variable.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::MissingEnvVar` when `CART_API_BASE_URL` is unset.
    pub fn require_api(&self) -> Result<&RemoteApiConfig, ConfigError> {
        self.api
            .as_ref()
            .ok_or_else(|| ConfigError::MissingEnvVar("CART_API_BASE_URL".to_string()))
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn parse_base_url(key: &str, raw: &str) -> Result<Url, ConfigError> {
    let url = Url::parse(raw)
        .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(ConfigError::InvalidEnvVar(
            key.to_string(),
            format!("unsupported scheme '{}'", url.scheme()),
        ));
    }
    Ok(url)
}

fn parse_fee(key: &str, raw: &str) -> Result<Decimal, ConfigError> {
    let fee = raw
        .parse::<Decimal>()
        .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))?;
    if fee.is_sign_negative() && !fee.is_zero() {
        return Err(ConfigError::InvalidEnvVar(
            key.to_string(),
            "must not be negative".to_string(),
        ));
    }
    Ok(fee)
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

    #[allow(clippy::cast_precision_loss)] // Token length will never exceed f64 precision
    let len = s.chars().count() as f64;
    freq.values()
        .map(|&count| {
            #[allow(clippy::cast_precision_loss)] // Character count will never exceed f64 precision
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
                "entropy too low ({entropy:.2} bits/char, need >= {MIN_ENTROPY_BITS_PER_CHAR:.1})"
            ),
        ));
    }

    Ok(())
}

fn validated_secret(key: &str, value: String) -> Result<SecretString, ConfigError> {
    validate_secret_strength(&value, key)?;
    Ok(SecretString::from(value))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_when_unset() {
        let config = EngineConfig::from_lookup(lookup(&[])).unwrap();
        assert!(config.api.is_none());
        assert_eq!(config.delivery_fee, Decimal::ZERO);
        assert_eq!(config.currency_code, CurrencyCode::USD);
        assert!(config.require_api().is_err());
    }

    #[test]
    fn test_full_config() {
        let config = EngineConfig::from_lookup(lookup(&[
            ("CART_API_BASE_URL", "https://api.shop.test/v1/"),
            ("CART_API_TOKEN", "aB3$xY9!mK2@nL5#pQ7&rT0*uW4^zC6"),
            ("CART_DELIVERY_FEE", "4.99"),
            ("CART_CURRENCY", "eur"),
        ]))
        .unwrap();
        let api = config.require_api().unwrap();
        assert_eq!(api.base_url.as_str(), "https://api.shop.test/v1/");
        assert!(api.token.is_some());
        assert_eq!(config.pricing().delivery_fee, Decimal::new(499, 2));
        assert_eq!(config.pricing().currency_code, CurrencyCode::EUR);
    }

    #[test]
    fn test_invalid_base_url() {
        let result = EngineConfig::from_lookup(lookup(&[("CART_API_BASE_URL", "not a url")]));
        assert!(matches!(result, Err(ConfigError::InvalidEnvVar(_, _))));
    }

    #[test]
    fn test_rejects_non_http_scheme() {
        let result =
            EngineConfig::from_lookup(lookup(&[("CART_API_BASE_URL", "ftp://files.test/")]));
        assert!(matches!(result, Err(ConfigError::InvalidEnvVar(_, _))));
    }

    #[test]
    fn test_rejects_negative_fee() {
        let result = EngineConfig::from_lookup(lookup(&[("CART_DELIVERY_FEE", "-1")]));
        assert!(matches!(result, Err(ConfigError::InvalidEnvVar(_, _))));
    }

    #[test]
    fn test_rejects_unknown_currency() {
        let result = EngineConfig::from_lookup(lookup(&[("CART_CURRENCY", "XYZ")]));
        assert!(matches!(result, Err(ConfigError::InvalidEnvVar(_, _))));
    }

    #[test]
    fn test_placeholder_token_rejected() {
        let result = EngineConfig::from_lookup(lookup(&[
            ("CART_API_BASE_URL", "https://api.shop.test/"),
            ("CART_API_TOKEN", "your-token-here"),
        ]));
        assert!(matches!(result, Err(ConfigError::InsecureSecret(_, _))));
    }

    #[test]
    fn test_low_entropy_token_rejected() {
        let result = validate_secret_strength("aaaaaaaaaaaaaaaaaaaa", "TEST_VAR");
        assert!(matches!(result, Err(ConfigError::InsecureSecret(_, _))));
    }

    #[test]
    fn test_shannon_entropy() {
        assert!((shannon_entropy("") - 0.0).abs() < f64::EPSILON);
        assert!((shannon_entropy("ab") - 1.0).abs() < 0.01);
    }

    #[test]
    fn test_debug_redacts_token() {
        let api = RemoteApiConfig {
            base_url: Url::parse("https://api.shop.test/").unwrap(),
            token: Some(SecretString::from("aB3$xY9!mK2@nL5#")),
        };
        let debug = format!("{api:?}");
        assert!(debug.contains("[REDACTED]"));
        assert!(!debug.contains("aB3$"));
    }
}
