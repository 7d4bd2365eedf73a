//! filter.rs - Inclusive range filters over priced items

use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::str::FromStr;

use crate::error::FilterError;
use crate::models::PricedItem;

/// Optional inclusive bounds; `None` means unconstrained
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FilterCriteria {
    pub min_price: Option<Decimal>,
    pub max_price: Option<Decimal>,
    pub min_popularity: Option<Decimal>,
    pub max_popularity: Option<Decimal>,
}

impl FilterCriteria {
    /// Parse bounds from raw query parameters.
    ///
    /// Missing or blank parameters are unconstrained. Anything else must be a
    /// finite number (plain or scientific notation).
    pub fn from_query(params: &HashMap<String, String>) -> Result<Self, FilterError> {
        Ok(FilterCriteria {
            min_price: parse_bound(params, "minPrice")?,
            max_price: parse_bound(params, "maxPrice")?,
            min_popularity: parse_bound(params, "minPopularity")?,
            max_popularity: parse_bound(params, "maxPopularity")?,
        })
    }

    pub fn is_empty(&self) -> bool {
        *self == FilterCriteria::default()
    }

    pub fn matches(&self, item: &PricedItem) -> bool {
        let popularity = item.item.popularity_score;

        self.min_price.map_or(true, |min| item.price >= min)
            && self.max_price.map_or(true, |max| item.price <= max)
            && self.min_popularity.map_or(true, |min| popularity >= min)
            && self.max_popularity.map_or(true, |max| popularity <= max)
    }
}

fn parse_bound(
    params: &HashMap<String, String>,
    field: &'static str,
) -> Result<Option<Decimal>, FilterError> {
    let raw = match params.get(field).map(|v| v.trim()) {
        None | Some("") => return Ok(None),
        Some(raw) => raw,
    };

    parse_number(raw).map(Some).ok_or_else(|| FilterError::InvalidFilter {
        field,
        value: raw.to_string(),
    })
}

/// Any finite number is a valid bound. Values outside `Decimal`'s range
/// saturate at `Decimal::MAX`/`MIN`, values below its precision become zero.
fn parse_number(raw: &str) -> Option<Decimal> {
    // rust_decimal accepts `_` digit separators
    if raw.contains('_') {
        return None;
    }
    let float = raw.parse::<f64>().ok().filter(|f| f.is_finite())?;

    let exact = Decimal::from_str(raw)
        .or_else(|_| Decimal::from_scientific(raw))
        .ok()
        .or_else(|| Decimal::from_f64(float));

    Some(exact.unwrap_or(if float.abs() < 1.0 {
        Decimal::ZERO
    } else if float.is_sign_negative() {
        Decimal::MIN
    } else {
        Decimal::MAX
    }))
}

/// Keep the items matching every present bound, in their original order
pub fn apply(items: Vec<PricedItem>, criteria: &FilterCriteria) -> Vec<PricedItem> {
    if criteria.is_empty() {
        return items;
    }
    items.into_iter().filter(|item| criteria.matches(item)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Item;
    use rust_decimal_macros::dec;

    fn priced(name: &str, popularity: Decimal, price: Decimal) -> PricedItem {
        PricedItem {
            item: Item::new(name, popularity, dec!(1)),
            price,
        }
    }

    fn query(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    fn catalog() -> Vec<PricedItem> {
        vec![
            priced("low", dec!(0.9), dec!(90.00)),
            priced("mid", dec!(0.5), dec!(150.00)),
            priced("high", dec!(0.2), dec!(210.00)),
        ]
    }

    #[test]
    fn test_price_range_composes_with_and() {
        let criteria = FilterCriteria::from_query(&query(&[("minPrice", "100"), ("maxPrice", "200")])).unwrap();
        let result = apply(catalog(), &criteria);

        assert_eq!(result.len(), 1);
        assert_eq!(result[0].price, dec!(150.00));
    }

    #[test]
    fn test_bounds_are_inclusive() {
        let criteria = FilterCriteria::from_query(&query(&[("minPrice", "90"), ("maxPrice", "210.00")])).unwrap();
        assert_eq!(apply(catalog(), &criteria).len(), 3);
    }

    #[test]
    fn test_popularity_range() {
        let criteria =
            FilterCriteria::from_query(&query(&[("minPopularity", "0.3"), ("maxPopularity", "0.9")])).unwrap();
        let names: Vec<_> = apply(catalog(), &criteria).into_iter().map(|p| p.item.name).collect();

        assert_eq!(names, vec!["low", "mid"]);
    }

    #[test]
    fn test_no_criteria_returns_everything() {
        let criteria = FilterCriteria::from_query(&HashMap::new()).unwrap();
        assert!(criteria.is_empty());
        assert_eq!(apply(catalog(), &criteria).len(), 3);
    }

    #[test]
    fn test_blank_bound_is_unconstrained() {
        let criteria = FilterCriteria::from_query(&query(&[("minPrice", ""), ("maxPrice", "  ")])).unwrap();
        assert!(criteria.is_empty());
    }

    #[test]
    fn test_scientific_notation_is_accepted() {
        let criteria = FilterCriteria::from_query(&query(&[("maxPrice", "1.5e2")])).unwrap();
        assert_eq!(criteria.max_price, Some(dec!(150)));
    }

    #[test]
    fn test_unparsable_bound_is_rejected() {
        for bad in ["abc", "NaN", "inf", "12abc", "1_000", "0x10"] {
            let err = FilterCriteria::from_query(&query(&[("minPopularity", bad)])).unwrap_err();
            assert_eq!(
                err,
                FilterError::InvalidFilter {
                    field: "minPopularity",
                    value: bad.to_string(),
                }
            );
        }
    }

    #[test]
    fn test_out_of_range_bounds_saturate() {
        let criteria = FilterCriteria::from_query(&query(&[
            ("maxPrice", "1e30"),
            ("minPrice", "-1e30"),
            ("maxPopularity", "100000000000000000000000000000"),
            ("minPopularity", "1e-40"),
        ]))
        .unwrap();

        assert_eq!(criteria.max_price, Some(Decimal::MAX));
        assert_eq!(criteria.min_price, Some(Decimal::MIN));
        assert_eq!(criteria.max_popularity, Some(Decimal::MAX));
        assert_eq!(criteria.min_popularity, Some(Decimal::ZERO));
        assert_eq!(apply(catalog(), &criteria).len(), 3);
    }

    #[test]
    fn test_unknown_parameters_are_ignored() {
        let criteria = FilterCriteria::from_query(&query(&[("sort", "price")])).unwrap();
        assert!(criteria.is_empty());
    }
}
