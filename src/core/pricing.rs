//! Price resolution - reads the authoritative unit price of a catalog entry.
//!
//! Checkout calls this once per line and once per extra, inside its own transaction,
//! so every price is the latest committed value at build time. Nothing is cached.

use crate::{
    entities::{Extra, ItemKind, Merchant, Product},
    errors::{Error, Result},
};
use sea_orm::prelude::*;
use std::fmt;

/// A catalog entry that carries a price
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PriceSource {
    Product(i64),
    Merchant(i64),
    Extra(i64),
}

impl PriceSource {
    /// Price source for an order line of the given kind.
    #[must_use]
    pub const fn for_item(kind: ItemKind, catalog_id: i64) -> Self {
        match kind {
            ItemKind::Product => Self::Product(catalog_id),
            ItemKind::Merchant => Self::Merchant(catalog_id),
        }
    }
}

impl fmt::Display for PriceSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Product(id) => write!(f, "product {id}"),
            Self::Merchant(id) => write!(f, "merchant {id}"),
            Self::Extra(id) => write!(f, "extra {id}"),
        }
    }
}

/// Returns the current unit price in cents for `source`.
///
/// # Errors
/// - `ProductNotFound` / `MerchantNotFound` / `ExtraNotFound` if the row does not exist
/// - `InvalidPrice` if the stored price is negative
pub async fn resolve_unit_price<C>(db: &C, source: PriceSource) -> Result<i64>
where
    C: ConnectionTrait,
{
    let price = match source {
        PriceSource::Product(product_id) => {
            Product::find_by_id(product_id)
                .one(db)
                .await?
                .ok_or(Error::ProductNotFound { product_id })?
                .price
        }
        PriceSource::Merchant(merchant_id) => {
            Merchant::find_by_id(merchant_id)
                .one(db)
                .await?
                .ok_or(Error::MerchantNotFound { merchant_id })?
                .price
        }
        PriceSource::Extra(extra_id) => {
            Extra::find_by_id(extra_id)
                .one(db)
                .await?
                .ok_or(Error::ExtraNotFound { extra_id })?
                .price
        }
    };

    if price < 0 {
        return Err(Error::InvalidPrice {
            source_label: source.to_string(),
            price,
        });
    }

    Ok(price)
}
