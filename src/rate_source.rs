//! rate_source.rs - Spot price sources for the catalog service
//!
//! Each source performs one upstream request and normalizes the quote to a
//! price per gram. Two upstream schemas are supported:
//! - reciprocal ounce rate (`{"rates": {"XAU": 0.000375}}`, metalpriceapi)
//! - direct gram price (`{"price_gram_24k": 85.73}`, goldapi)

use async_trait::async_trait;
use log::{debug, warn};
use reqwest::Client;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use crate::error::FetchError;

/// Grams per troy ounce (exact by definition)
pub const TROY_OUNCE_GRAMS: Decimal = dec!(31.1034768);

/// Trait defining the interface for spot price sources
#[async_trait]
pub trait RateSource: Send + Sync {
    /// Short name used in logs
    fn name(&self) -> &str;

    /// Fetch the current price per gram
    async fn fetch(&self) -> Result<Decimal, FetchError>;
}

/// Convert an "ounces per unit of currency" rate into a price per gram
pub fn ounce_rate_to_gram_price(rate: Decimal) -> Result<Decimal, FetchError> {
    if rate <= Decimal::ZERO {
        return Err(FetchError::Malformed(format!("non-positive rate: {}", rate)));
    }

    Decimal::ONE
        .checked_div(rate)
        .and_then(|per_ounce| per_ounce.checked_div(TROY_OUNCE_GRAMS))
        .ok_or_else(|| FetchError::Malformed(format!("rate out of range: {}", rate)))
}

// ============================================================================
// Upstream Response Structures
// ============================================================================

#[derive(Debug, Deserialize)]
struct RatesResponse {
    rates: Option<HashMap<String, Decimal>>,
}

#[derive(Debug, Deserialize)]
struct GramPriceResponse {
    price_gram_24k: Option<Decimal>,
}

// ============================================================================
// Shared HTTP plumbing
// ============================================================================

/// Upstream endpoint plus credential, shared by the HTTP sources
#[derive(Debug, Clone)]
pub struct QuoteEndpoint {
    pub url: String,
    pub api_key_header: String,
    pub api_key: String,
    pub timeout: Duration,
}

#[derive(Debug, Clone)]
struct QuoteClient {
    client: Client,
    endpoint: QuoteEndpoint,
}

impl QuoteClient {
    fn new(endpoint: QuoteEndpoint) -> Result<Self, FetchError> {
        let client = Client::builder()
            .timeout(endpoint.timeout)
            .build()
            .map_err(|e| FetchError::Network(format!("failed to create HTTP client: {}", e)))?;

        Ok(QuoteClient { client, endpoint })
    }

    async fn get_json<T: DeserializeOwned>(&self) -> Result<T, FetchError> {
        debug!("Fetching spot quote from: {}", self.endpoint.url);

        let mut request = self
            .client
            .get(&self.endpoint.url)
            .header("accept", "application/json");
        if !self.endpoint.api_key.is_empty() {
            request = request.header(
                self.endpoint.api_key_header.as_str(),
                self.endpoint.api_key.as_str(),
            );
        }

        let response = request.send().await.map_err(|e| self.classify(e))?;

        let status = response.status();
        if !status.is_success() {
            warn!("Quote endpoint returned status {}", status);
            return Err(FetchError::Status(status.as_u16()));
        }

        response.json::<T>().await.map_err(|e| self.classify(e))
    }

    fn classify(&self, err: reqwest::Error) -> FetchError {
        if err.is_timeout() {
            FetchError::Timeout(self.endpoint.timeout)
        } else if err.is_decode() {
            FetchError::Malformed(err.to_string())
        } else {
            FetchError::Network(err.to_string())
        }
    }
}

// ============================================================================
// OunceRateSource - reciprocal ounce rate upstream
// ============================================================================

/// Source for providers quoting "ounces of metal per unit of currency"
#[derive(Debug, Clone)]
pub struct OunceRateSource {
    http: QuoteClient,
    symbol: String,
}

impl OunceRateSource {
    pub fn new(endpoint: QuoteEndpoint, symbol: &str) -> Result<Self, FetchError> {
        Ok(OunceRateSource {
            http: QuoteClient::new(endpoint)?,
            symbol: symbol.to_string(),
        })
    }
}

#[async_trait]
impl RateSource for OunceRateSource {
    fn name(&self) -> &str {
        "ounce-rate"
    }

    async fn fetch(&self) -> Result<Decimal, FetchError> {
        let body: RatesResponse = self.http.get_json().await?;

        let rate = body
            .rates
            .and_then(|rates| rates.get(&self.symbol).copied())
            .ok_or_else(|| FetchError::Malformed(format!("missing rate for {}", self.symbol)))?;

        let per_gram = ounce_rate_to_gram_price(rate)?;
        debug!("{} rate {} -> {} per gram", self.symbol, rate, per_gram);
        Ok(per_gram)
    }
}

// ============================================================================
// GramPriceSource - direct gram price upstream
// ============================================================================

/// Source for providers quoting the gram price directly
#[derive(Debug, Clone)]
pub struct GramPriceSource {
    http: QuoteClient,
}

impl GramPriceSource {
    pub fn new(endpoint: QuoteEndpoint) -> Result<Self, FetchError> {
        Ok(GramPriceSource {
            http: QuoteClient::new(endpoint)?,
        })
    }
}

#[async_trait]
impl RateSource for GramPriceSource {
    fn name(&self) -> &str {
        "gram-price"
    }

    async fn fetch(&self) -> Result<Decimal, FetchError> {
        let body: GramPriceResponse = self.http.get_json().await?;

        match body.price_gram_24k {
            Some(price) if price > Decimal::ZERO => Ok(price),
            Some(price) => Err(FetchError::Malformed(format!("non-positive gram price: {}", price))),
            None => Err(FetchError::Malformed("missing price_gram_24k".to_string())),
        }
    }
}

// ============================================================================
// MockRateSource - For testing and offline development
// ============================================================================

/// Scripted source: replays queued outcomes, repeating the last one
#[derive(Debug)]
pub struct MockRateSource {
    outcomes: Mutex<VecDeque<Result<Decimal, FetchError>>>,
    delay: Duration,
    calls: AtomicUsize,
}

impl MockRateSource {
    pub fn new(price: Decimal) -> Self {
        Self::scripted(vec![Ok(price)])
    }

    pub fn failing() -> Self {
        Self::scripted(vec![Err(FetchError::Network("connection refused".to_string()))])
    }

    pub fn scripted(outcomes: Vec<Result<Decimal, FetchError>>) -> Self {
        MockRateSource {
            outcomes: Mutex::new(outcomes.into()),
            delay: Duration::ZERO,
            calls: AtomicUsize::new(0),
        }
    }

    /// Simulated upstream latency
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Number of fetches issued so far
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn next_outcome(&self) -> Result<Decimal, FetchError> {
        let mut outcomes = match self.outcomes.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        if outcomes.len() > 1 {
            if let Some(outcome) = outcomes.pop_front() {
                return outcome;
            }
        }
        outcomes
            .front()
            .cloned()
            .unwrap_or_else(|| Err(FetchError::Malformed("no scripted outcome".to_string())))
    }
}

#[async_trait]
impl RateSource for MockRateSource {
    fn name(&self) -> &str {
        "mock"
    }

    async fn fetch(&self) -> Result<Decimal, FetchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.next_outcome()
    }
}
