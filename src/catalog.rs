//! catalog.rs - Item catalog sources
//!
//! Items are read fresh on every request and validated before pricing.

use async_trait::async_trait;
use log::{debug, error};
use rust_decimal::Decimal;
use std::collections::HashSet;
use std::path::PathBuf;

use crate::error::CatalogError;
use crate::models::Item;

/// Trait defining the interface for catalog collaborators
#[async_trait]
pub trait Catalog: Send + Sync {
    /// Load all items
    async fn load(&self) -> Result<Vec<Item>, CatalogError>;
}

/// Reject items the pricing formula cannot handle
pub fn validate(items: &[Item]) -> Result<(), CatalogError> {
    let mut seen = HashSet::new();

    for item in items {
        let invalid = |reason: &str| CatalogError::Invalid {
            name: item.name.clone(),
            reason: reason.to_string(),
        };

        if item.name.trim().is_empty() {
            return Err(invalid("empty name"));
        }
        if !seen.insert(item.name.as_str()) {
            return Err(invalid("duplicate name"));
        }
        if item.popularity_score < Decimal::ZERO || item.popularity_score > Decimal::ONE {
            return Err(invalid("popularityScore outside [0, 1]"));
        }
        if item.weight <= Decimal::ZERO {
            return Err(invalid("weight must be positive"));
        }
    }

    Ok(())
}

// ============================================================================
// JsonFileCatalog - products.json on disk
// ============================================================================

/// Catalog backed by a JSON array file
#[derive(Debug, Clone)]
pub struct JsonFileCatalog {
    path: PathBuf,
}

impl JsonFileCatalog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        JsonFileCatalog { path: path.into() }
    }

    pub fn path(&self) -> &PathBuf {
        &self.path
    }
}

#[async_trait]
impl Catalog for JsonFileCatalog {
    async fn load(&self) -> Result<Vec<Item>, CatalogError> {
        let content = tokio::fs::read_to_string(&self.path).await.map_err(|source| {
            error!("Failed to read catalog {}: {}", self.path.display(), source);
            CatalogError::Io {
                path: self.path.display().to_string(),
                source,
            }
        })?;

        let items: Vec<Item> = serde_json::from_str(&content).map_err(|e| {
            error!("Failed to parse catalog {}: {}", self.path.display(), e);
            CatalogError::from(e)
        })?;

        validate(&items)?;
        debug!("Loaded {} items from {}", items.len(), self.path.display());
        Ok(items)
    }
}

// ============================================================================
// StaticCatalog - in-memory items
// ============================================================================

/// Fixed in-memory catalog for tests and demos
#[derive(Debug, Clone, Default)]
pub struct StaticCatalog {
    items: Vec<Item>,
}

impl StaticCatalog {
    pub fn new(items: Vec<Item>) -> Self {
        StaticCatalog { items }
    }
}

#[async_trait]
impl Catalog for StaticCatalog {
    async fn load(&self) -> Result<Vec<Item>, CatalogError> {
        validate(&self.items)?;
        Ok(self.items.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write_catalog(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[tokio::test]
    async fn test_load_products_file() {
        let file = write_catalog(
            r#"[
                {
                    "name": "Engagement Ring 1",
                    "popularityScore": 0.85,
                    "weight": 2.1,
                    "images": {
                        "yellow": "https://cdn.example.com/ring1-y.jpg",
                        "rose": "https://cdn.example.com/ring1-r.jpg",
                        "white": "https://cdn.example.com/ring1-w.jpg"
                    }
                },
                { "name": "Engagement Ring 2", "popularityScore": 0.51, "weight": 3.4, "images": {} }
            ]"#,
        );

        let items = JsonFileCatalog::new(file.path()).load().await.unwrap();

        assert_eq!(items.len(), 2);
        assert_eq!(items[0].popularity_score, dec!(0.85));
        assert_eq!(items[0].images.len(), 3);
        assert_eq!(items[1].weight, dec!(3.4));
    }

    #[tokio::test]
    async fn test_missing_file_is_io_error() {
        let catalog = JsonFileCatalog::new("/nonexistent/products.json");
        assert!(matches!(catalog.load().await, Err(CatalogError::Io { .. })));
    }

    #[tokio::test]
    async fn test_malformed_file_is_parse_error() {
        let file = write_catalog(r#"[{ "name": "Ring", "weight": "heavy" }]"#);
        let result = JsonFileCatalog::new(file.path()).load().await;
        assert!(matches!(result, Err(CatalogError::Parse(_))));
    }

    #[tokio::test]
    async fn test_popularity_out_of_range_is_rejected() {
        let file = write_catalog(r#"[{ "name": "Ring", "popularityScore": 1.2, "weight": 2 }]"#);
        let result = JsonFileCatalog::new(file.path()).load().await;
        assert!(matches!(result, Err(CatalogError::Invalid { .. })));
    }

    #[test]
    fn test_validate_rejects_duplicates_and_bad_weight() {
        let duplicate = vec![
            Item::new("Ring", dec!(0.5), dec!(1)),
            Item::new("Ring", dec!(0.6), dec!(2)),
        ];
        assert!(validate(&duplicate).is_err());

        let weightless = vec![Item::new("Ring", dec!(0.5), dec!(0))];
        assert!(validate(&weightless).is_err());

        let good = vec![Item::new("Ring", dec!(0), dec!(0.1)), Item::new("Band", dec!(1), dec!(4))];
        assert!(validate(&good).is_ok());
    }

    #[tokio::test]
    async fn test_static_catalog() {
        let catalog = StaticCatalog::new(vec![Item::new("Ring", dec!(0.5), dec!(1))]);
        assert_eq!(catalog.load().await.unwrap().len(), 1);
    }
}
