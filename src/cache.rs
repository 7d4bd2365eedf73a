//! cache.rs - In-memory holder for the last known spot price
//!
//! Pure data, no I/O. Synchronisation is the caller's job (see `provider`).

use chrono::{DateTime, Duration, Utc};
use log::debug;
use rust_decimal::Decimal;

use crate::models::{CacheState, CachedPrice};

/// Single-entry price cache with a fixed time-to-live
#[derive(Debug, Clone)]
pub struct PriceCache {
    entry: Option<CachedPrice>,
    ttl: Duration,
}

impl PriceCache {
    pub fn new(ttl: Duration) -> Self {
        PriceCache { entry: None, ttl }
    }

    /// Last cached price, fresh or not
    pub fn read(&self) -> Option<CachedPrice> {
        self.entry
    }

    /// Cached price only if it is still within the TTL at `now`
    pub fn read_fresh(&self, now: DateTime<Utc>) -> Option<CachedPrice> {
        self.entry.filter(|cached| cached.is_fresh(now, self.ttl))
    }

    /// Store a successfully fetched price.
    ///
    /// Writes stamped earlier than the current entry are discarded so that
    /// `fetched_at` never moves backwards. Returns whether the write landed.
    pub fn write(&mut self, value: Decimal, fetched_at: DateTime<Utc>) -> bool {
        if let Some(current) = self.entry {
            if fetched_at < current.fetched_at {
                debug!(
                    "Discarding price {} fetched at {} (cache holds {})",
                    value, fetched_at, current.fetched_at
                );
                return false;
            }
        }

        self.entry = Some(CachedPrice::new(value, fetched_at));
        true
    }

    pub fn state(&self, now: DateTime<Utc>) -> CacheState {
        match self.entry {
            None => CacheState::Empty,
            Some(cached) if cached.is_fresh(now, self.ttl) => CacheState::Fresh,
            Some(_) => CacheState::Stale,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_empty_cache() {
        let cache = PriceCache::new(Duration::minutes(10));
        let now = Utc::now();

        assert!(cache.read().is_none());
        assert!(cache.read_fresh(now).is_none());
        assert_eq!(cache.state(now), CacheState::Empty);
    }

    #[test]
    fn test_write_then_expire() {
        let mut cache = PriceCache::new(Duration::minutes(10));
        let t0 = Utc::now();

        assert!(cache.write(dec!(65.0), t0));
        assert_eq!(cache.state(t0 + Duration::minutes(5)), CacheState::Fresh);
        assert_eq!(cache.read_fresh(t0 + Duration::minutes(5)).unwrap().value, dec!(65.0));

        let later = t0 + Duration::minutes(11);
        assert_eq!(cache.state(later), CacheState::Stale);
        assert!(cache.read_fresh(later).is_none());
        // Stale entries stay readable for fallback
        assert_eq!(cache.read().unwrap().value, dec!(65.0));
    }

    #[test]
    fn test_older_write_is_discarded() {
        let mut cache = PriceCache::new(Duration::minutes(10));
        let t0 = Utc::now();

        assert!(cache.write(dec!(70), t0));
        assert!(!cache.write(dec!(60), t0 - Duration::seconds(1)));

        let cached = cache.read().unwrap();
        assert_eq!(cached.value, dec!(70));
        assert_eq!(cached.fetched_at, t0);
    }

    #[test]
    fn test_newer_write_replaces_entry() {
        let mut cache = PriceCache::new(Duration::minutes(10));
        let t0 = Utc::now();

        cache.write(dec!(70), t0);
        assert!(cache.write(dec!(71.5), t0 + Duration::minutes(1)));
        assert_eq!(cache.read().unwrap().value, dec!(71.5));
    }
}
