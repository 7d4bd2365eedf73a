//! models.rs - Core data structures for the catalog service
//!
//! Defines Item, PricedItem, CachedPrice and the cache state classification

use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// A catalog entry as stored in `products.json`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Item {
    pub name: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub popularity_score: Decimal,
    /// Mass in grams
    #[serde(with = "rust_decimal::serde::float")]
    pub weight: Decimal,
    /// Finish/color key (e.g. "yellow", "rose") -> image URL
    #[serde(default)]
    pub images: BTreeMap<String, String>,
}

impl Item {
    pub fn new(name: &str, popularity_score: Decimal, weight: Decimal) -> Self {
        Item {
            name: name.to_string(),
            popularity_score,
            weight,
            images: BTreeMap::new(),
        }
    }

    pub fn with_image(mut self, finish: &str, url: &str) -> Self {
        self.images.insert(finish.to_string(), url.to_string());
        self
    }
}

impl fmt::Display for Item {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({}g, popularity {})", self.name, self.weight, self.popularity_score)
    }
}

/// An item annotated with its computed price
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct PricedItem {
    #[serde(flatten)]
    pub item: Item,
    /// Rounded to 2 decimal places
    #[serde(with = "rust_decimal::serde::float")]
    pub price: Decimal,
}

impl fmt::Display for PricedItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} @ {}", self.item.name, self.price)
    }
}

/// Last successfully fetched spot price (per gram)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CachedPrice {
    pub value: Decimal,
    pub fetched_at: DateTime<Utc>,
}

impl CachedPrice {
    pub fn new(value: Decimal, fetched_at: DateTime<Utc>) -> Self {
        CachedPrice { value, fetched_at }
    }

    pub fn age(&self, now: DateTime<Utc>) -> Duration {
        now.signed_duration_since(self.fetched_at)
    }

    /// Fresh while `now - fetched_at < ttl`
    pub fn is_fresh(&self, now: DateTime<Utc>, ttl: Duration) -> bool {
        self.age(now) < ttl
    }
}

/// Freshness of the price cache at a given instant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheState {
    Empty,
    Fresh,
    Stale,
}

impl fmt::Display for CacheState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            CacheState::Empty => "empty",
            CacheState::Fresh => "fresh",
            CacheState::Stale => "stale",
        };
        write!(f, "{}", s)
    }
}
