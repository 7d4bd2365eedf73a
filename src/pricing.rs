//! pricing.rs - Spot-price based item pricing
//!
//! `price = (popularityScore + 1) * weight * pricePerGram`
//!
//! The product is computed in `Decimal`, so inputs such as 0.85 and 2.1 are
//! exact, and then rounded half away from zero at the second decimal:
//! 252.525 -> 252.53 and -252.525 -> -252.53. Midpoints such as 1.005 are
//! rounded on their decimal value, not on the nearest binary float.

use rust_decimal::{Decimal, RoundingStrategy};

use crate::error::CatalogError;
use crate::models::{Item, PricedItem};

/// Decimal places kept in published prices
pub const PRICE_DECIMALS: u32 = 2;

/// Price a single item against the given spot price per gram.
///
/// A product beyond `Decimal`'s range marks the item as invalid rather than
/// panicking.
pub fn price(item: &Item, price_per_gram: Decimal) -> Result<Decimal, CatalogError> {
    let raw = (item.popularity_score + Decimal::ONE)
        .checked_mul(item.weight)
        .and_then(|scaled| scaled.checked_mul(price_per_gram))
        .ok_or_else(|| CatalogError::Invalid {
            name: item.name.clone(),
            reason: format!("price overflows at {} per gram", price_per_gram),
        })?;
    Ok(round_price(raw))
}

/// Round half away from zero to `PRICE_DECIMALS` places
pub fn round_price(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(PRICE_DECIMALS, RoundingStrategy::MidpointAwayFromZero)
}

/// Attach a computed price to every item, preserving catalog order
pub fn annotate(items: Vec<Item>, price_per_gram: Decimal) -> Result<Vec<PricedItem>, CatalogError> {
    items
        .into_iter()
        .map(|item| {
            let price = price(&item, price_per_gram)?;
            Ok(PricedItem { item, price })
        })
        .collect()
}
