//! Catalog seed loading from catalog.toml
//!
//! The catalog file lists the products, merchant add-ons and extras a fresh database
//! should start with. Seeding is idempotent: entries whose name already exists are skipped,
//! so prices edited at runtime are never overwritten by a restart.

use crate::core::catalog;
use crate::entities::{Extra, Merchant, Product, extra, merchant, product};
use crate::errors::{Error, Result};
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter};
use serde::Deserialize;
use std::path::Path;
use tracing::{debug, info, instrument};

/// Configuration structure representing the entire catalog.toml file
#[derive(Debug, Deserialize, Default)]
pub struct CatalogConfig {
    #[serde(default)]
    pub products: Vec<ProductSeed>,
    #[serde(default)]
    pub merchants: Vec<MerchantSeed>,
    #[serde(default)]
    pub extras: Vec<ExtraSeed>,
}

/// A product to seed; `price` is in cents
#[derive(Debug, Deserialize, Clone)]
pub struct ProductSeed {
    pub name: String,
    #[serde(default)]
    pub category: Option<String>,
    pub price: i64,
}

/// A merchant add-on to seed; `price` is in cents
#[derive(Debug, Deserialize, Clone)]
pub struct MerchantSeed {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub price: i64,
}

/// An extra to seed; `price` is in cents
#[derive(Debug, Deserialize, Clone)]
pub struct ExtraSeed {
    pub name: String,
    pub price: i64,
}

/// Counts of rows inserted by [`seed_catalog`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SeedSummary {
    pub products: usize,
    pub merchants: usize,
    pub extras: usize,
}

/// Loads catalog configuration from a TOML file
///
/// # Errors
/// Returns an error if the file cannot be read or the TOML is invalid.
pub fn load_catalog<P: AsRef<Path>>(path: P) -> Result<CatalogConfig> {
    let contents = std::fs::read_to_string(path.as_ref()).map_err(|e| Error::Config {
        message: format!("Failed to read catalog file {:?}: {e}", path.as_ref()),
    })?;

    toml::from_str(&contents).map_err(|e| Error::Config {
        message: format!("Failed to parse catalog file {:?}: {e}", path.as_ref()),
    })
}

/// Path of the catalog file from `CATALOG_PATH`, defaulting to `./catalog.toml`
#[must_use]
pub fn catalog_path() -> String {
    std::env::var("CATALOG_PATH").unwrap_or_else(|_| "catalog.toml".to_string())
}

/// Inserts every catalog entry whose name is not already present.
#[instrument(skip(db, config))]
pub async fn seed_catalog(db: &DatabaseConnection, config: &CatalogConfig) -> Result<SeedSummary> {
    let mut summary = SeedSummary::default();

    for seed in &config.products {
        let exists = Product::find()
            .filter(product::Column::Name.eq(seed.name.as_str()))
            .one(db)
            .await?
            .is_some();
        if exists {
            debug!("Product {} already present, skipping", seed.name);
            continue;
        }
        catalog::create_product(db, seed.name.clone(), seed.category.clone(), seed.price).await?;
        summary.products += 1;
    }

    for seed in &config.merchants {
        let exists = Merchant::find()
            .filter(merchant::Column::Name.eq(seed.name.as_str()))
            .one(db)
            .await?
            .is_some();
        if exists {
            debug!("Merchant {} already present, skipping", seed.name);
            continue;
        }
        catalog::create_merchant(db, seed.name.clone(), seed.description.clone(), seed.price)
            .await?;
        summary.merchants += 1;
    }

    for seed in &config.extras {
        let exists = Extra::find()
            .filter(extra::Column::Name.eq(seed.name.as_str()))
            .one(db)
            .await?
            .is_some();
        if exists {
            debug!("Extra {} already present, skipping", seed.name);
            continue;
        }
        catalog::create_extra(db, seed.name.clone(), seed.price).await?;
        summary.extras += 1;
    }

    info!(
        products = summary.products,
        merchants = summary.merchants,
        extras = summary.extras,
        "Catalog seeded"
    );
    Ok(summary)
}
