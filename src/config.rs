//! config.rs - Service configuration
//!
//! Defaults, optionally overridden by a TOML file (`CONFIG_PATH`) and then by
//! environment variables (a `.env` file is honoured).

use log::info;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use crate::error::{ConfigError, FetchError};
use crate::rate_source::{GramPriceSource, MockRateSource, OunceRateSource, QuoteEndpoint, RateSource};

/// Main configuration for the service
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(default)]
pub struct ServiceConfig {
    pub server: ServerConfig,
    pub catalog: CatalogConfig,
    pub rate_source: RateSourceConfig,
    pub cache: CacheConfig,
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

/// Catalog configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct CatalogConfig {
    /// Path to the products JSON file
    pub path: String,
}

/// Which upstream schema to speak
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum ProviderKind {
    /// `{"rates": {"XAU": ounces per currency unit}}`
    OunceRate,
    /// `{"price_gram_24k": price}`
    GramPrice,
    /// Fixed price, no network
    Mock,
}

impl FromStr for ProviderKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "ounce-rate" | "metalpriceapi" => Ok(ProviderKind::OunceRate),
            "gram-price" | "goldapi" => Ok(ProviderKind::GramPrice),
            "mock" => Ok(ProviderKind::Mock),
            _ => Err(ConfigError::InvalidValue {
                key: "RATE_PROVIDER",
                value: s.to_string(),
            }),
        }
    }
}

/// Upstream quote provider configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RateSourceConfig {
    pub provider: ProviderKind,

    /// Overrides the provider's default endpoint
    pub endpoint: Option<String>,

    /// Overrides the provider's default credential header
    pub api_key_header: Option<String>,

    pub api_key: String,

    /// Rate key in the reciprocal schema
    pub symbol: String,

    /// Per-request timeout in seconds
    pub timeout_secs: u64,

    /// Price per gram served by the mock provider
    pub mock_price: Decimal,
}

/// Price cache configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct CacheConfig {
    /// Spot price time-to-live in seconds; 0 disables caching
    pub ttl_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 5000,
        }
    }
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            path: "products.json".to_string(),
        }
    }
}

impl Default for RateSourceConfig {
    fn default() -> Self {
        Self {
            provider: ProviderKind::OunceRate,
            endpoint: None,
            api_key_header: None,
            api_key: String::new(),
            symbol: "XAU".to_string(),
            timeout_secs: 10,
            mock_price: dec!(65.0),
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self { ttl_secs: 600 }
    }
}

impl RateSourceConfig {
    pub fn endpoint(&self) -> &str {
        match (&self.endpoint, self.provider) {
            (Some(url), _) => url.as_str(),
            (None, ProviderKind::GramPrice) => "https://www.goldapi.io/api/XAU/USD",
            (None, _) => "https://api.metalpriceapi.com/v1/latest",
        }
    }

    pub fn api_key_header(&self) -> &str {
        match (&self.api_key_header, self.provider) {
            (Some(header), _) => header.as_str(),
            (None, ProviderKind::GramPrice) => "x-access-token",
            (None, _) => "X-API-KEY",
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Instantiate the configured source
    pub fn build(&self) -> Result<Arc<dyn RateSource>, FetchError> {
        let endpoint = QuoteEndpoint {
            url: self.endpoint().to_string(),
            api_key_header: self.api_key_header().to_string(),
            api_key: self.api_key.clone(),
            timeout: self.timeout(),
        };

        let source: Arc<dyn RateSource> = match self.provider {
            ProviderKind::OunceRate => Arc::new(OunceRateSource::new(endpoint, &self.symbol)?),
            ProviderKind::GramPrice => Arc::new(GramPriceSource::new(endpoint)?),
            ProviderKind::Mock => Arc::new(MockRateSource::new(self.mock_price)),
        };
        Ok(source)
    }
}

impl CacheConfig {
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }
}

impl ServiceConfig {
    /// Defaults, then `CONFIG_PATH` file, then environment
    pub fn load() -> Result<Self, ConfigError> {
        if let Ok(path) = dotenvy::dotenv() {
            info!("Loaded environment from {}", path.display());
        }

        let mut config = match std::env::var("CONFIG_PATH") {
            Ok(path) => Self::load_from_file(&path)?,
            Err(_) => Self::default(),
        };
        config.apply_env(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from file
    pub fn load_from_file(path: &str) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_string(),
            source,
        })?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    /// Apply overrides from an environment lookup
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(host) = lookup("HOST") {
            self.server.host = host;
        }
        if let Some(port) = lookup("PORT") {
            self.server.port = parse_env("PORT", &port)?;
        }
        if let Some(path) = lookup("CATALOG_PATH") {
            self.catalog.path = path;
        }
        if let Some(provider) = lookup("RATE_PROVIDER") {
            self.rate_source.provider = provider.parse()?;
        }
        if let Some(endpoint) = lookup("RATE_ENDPOINT") {
            self.rate_source.endpoint = Some(endpoint);
        }
        if let Some(api_key) = lookup("GOLD_API_KEY") {
            self.rate_source.api_key = api_key;
        }
        if let Some(timeout) = lookup("FETCH_TIMEOUT_SECS") {
            self.rate_source.timeout_secs = parse_env("FETCH_TIMEOUT_SECS", &timeout)?;
        }
        if let Some(ttl) = lookup("PRICE_TTL_SECS") {
            self.cache.ttl_secs = parse_env("PRICE_TTL_SECS", &ttl)?;
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.rate_source.timeout_secs == 0 {
            return Err(ConfigError::InvalidValue {
                key: "rate_source.timeout_secs",
                value: "0".to_string(),
            });
        }
        if self.rate_source.provider == ProviderKind::Mock && self.rate_source.mock_price <= Decimal::ZERO {
            return Err(ConfigError::InvalidValue {
                key: "rate_source.mock_price",
                value: self.rate_source.mock_price.to_string(),
            });
        }
        Ok(())
    }

    /// Get the server address
    pub fn server_addr(&self) -> Result<SocketAddr, ConfigError> {
        let addr = format!("{}:{}", self.server.host, self.server.port);
        addr.parse().map_err(|_| ConfigError::InvalidValue {
            key: "server address",
            value: addr,
        })
    }
}

fn parse_env<T: FromStr>(key: &'static str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::InvalidValue {
        key,
        value: value.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> =
            pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = ServiceConfig::default();

        assert_eq!(config.server.port, 5000);
        assert_eq!(config.cache.ttl(), Duration::from_secs(600));
        assert_eq!(config.rate_source.provider, ProviderKind::OunceRate);
        assert_eq!(config.rate_source.endpoint(), "https://api.metalpriceapi.com/v1/latest");
        assert_eq!(config.rate_source.api_key_header(), "X-API-KEY");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = ServiceConfig::from_toml(
            r#"
            [cache]
            ttl_secs = 3600

            [rate_source]
            provider = "gram-price"
            api_key = "goldapi-key"
            "#,
        )
        .unwrap();

        assert_eq!(config.cache.ttl_secs, 3600);
        assert_eq!(config.server.port, 5000);
        assert_eq!(config.rate_source.provider, ProviderKind::GramPrice);
        assert_eq!(config.rate_source.endpoint(), "https://www.goldapi.io/api/XAU/USD");
        assert_eq!(config.rate_source.api_key_header(), "x-access-token");
    }

    #[test]
    fn test_invalid_toml_is_parse_error() {
        let result = ServiceConfig::from_toml("[cache]\nttl_secs = \"soon\"");
        assert!(matches!(result, Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_env_overrides() {
        let mut config = ServiceConfig::default();
        config
            .apply_env(env(&[
                ("PORT", "8080"),
                ("GOLD_API_KEY", "abc123"),
                ("PRICE_TTL_SECS", "60"),
                ("RATE_PROVIDER", "goldapi"),
                ("CATALOG_PATH", "/data/products.json"),
            ]))
            .unwrap();

        assert_eq!(config.server.port, 8080);
        assert_eq!(config.rate_source.api_key, "abc123");
        assert_eq!(config.cache.ttl_secs, 60);
        assert_eq!(config.rate_source.provider, ProviderKind::GramPrice);
        assert_eq!(config.catalog.path, "/data/products.json");
    }

    #[test]
    fn test_bad_env_value_is_rejected() {
        let mut config = ServiceConfig::default();
        let result = config.apply_env(env(&[("PORT", "eighty")]));
        assert!(matches!(result, Err(ConfigError::InvalidValue { key: "PORT", .. })));

        let result = config.apply_env(env(&[("RATE_PROVIDER", "carrier-pigeon")]));
        assert!(matches!(result, Err(ConfigError::InvalidValue { key: "RATE_PROVIDER", .. })));
    }

    #[test]
    fn test_zero_timeout_is_invalid() {
        let mut config = ServiceConfig::default();
        config.rate_source.timeout_secs = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_server_addr() {
        let mut config = ServiceConfig::default();
        config.server.host = "127.0.0.1".to_string();
        assert_eq!(config.server_addr().unwrap(), "127.0.0.1:5000".parse::<SocketAddr>().unwrap());
    }

    #[tokio::test]
    async fn test_build_mock_source() {
        let mut config = RateSourceConfig::default();
        config.provider = ProviderKind::Mock;

        let source = config.build().unwrap();
        assert_eq!(source.name(), "mock");
        assert_eq!(source.fetch().await.unwrap(), dec!(65.0));
    }
}
