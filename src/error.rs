//! error.rs - Error taxonomy for the pricing service
//!
//! Upstream failures (`FetchError`) are absorbed by the price provider.
//! Everything else maps onto an HTTP status in `api`.

use std::time::Duration;
use thiserror::Error;

/// Failure of a single upstream quote request.
///
/// Cloneable so one outcome can be shared by every caller waiting on the
/// same in-flight fetch.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FetchError {
    #[error("network error: {0}")]
    Network(String),

    #[error("upstream did not answer within {0:?}")]
    Timeout(Duration),

    #[error("upstream returned status {0}")]
    Status(u16),

    #[error("malformed upstream response: {0}")]
    Malformed(String),
}

/// Errors surfaced by the price provider.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PricingError {
    /// No price was ever cached and the refresh attempt failed.
    #[error("no spot price available: {cause}")]
    NoPriceAvailable { cause: FetchError },
}

/// The catalog collaborator could not supply items.
#[derive(Error, Debug)]
pub enum CatalogError {
    #[error("failed to read catalog {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse catalog: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("invalid catalog item '{name}': {reason}")]
    Invalid { name: String, reason: String },
}

/// A filter bound that is present but not a finite number.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FilterError {
    #[error("invalid value '{value}' for filter '{field}'")]
    InvalidFilter { field: &'static str, value: String },
}

/// Errors raised while loading configuration at startup.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid value for {key}: {value}")]
    InvalidValue { key: &'static str, value: String },
}
