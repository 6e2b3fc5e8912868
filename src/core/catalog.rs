//! Catalog writes - the minimal product, merchant and extra operations the order core needs.
//!
//! Full catalog management lives outside this crate. These functions exist so a database
//! can be seeded and so prices can change between orders, which is what the price
//! snapshot on order lines protects against.

use crate::{
    entities::{Extra, Merchant, Product, extra, merchant, product},
    errors::{Error, Result},
};
use sea_orm::{Set, prelude::*};

fn validate_name(kind: &str, name: &str) -> Result<String> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(Error::InvalidInput {
            message: format!("{kind} name cannot be empty"),
        });
    }
    Ok(trimmed.to_string())
}

fn validate_price(kind: &str, price: i64) -> Result<()> {
    if price < 0 {
        return Err(Error::InvalidInput {
            message: format!("{kind} price cannot be negative (got {price})"),
        });
    }
    Ok(())
}

/// Creates a product priced in cents.
///
/// # Errors
/// Returns an error if the name is blank, the price is negative, or the insert fails.
pub async fn create_product(
    db: &DatabaseConnection,
    name: String,
    category: Option<String>,
    price: i64,
) -> Result<product::Model> {
    let name = validate_name("Product", &name)?;
    validate_price("Product", price)?;

    let now = chrono::Utc::now();
    let product = product::ActiveModel {
        name: Set(name),
        category: Set(category),
        price: Set(price),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    };
    product.insert(db).await.map_err(Into::into)
}

/// Creates a merchant add-on priced in cents.
pub async fn create_merchant(
    db: &DatabaseConnection,
    name: String,
    description: Option<String>,
    price: i64,
) -> Result<merchant::Model> {
    let name = validate_name("Merchant", &name)?;
    validate_price("Merchant", price)?;

    let now = chrono::Utc::now();
    let merchant = merchant::ActiveModel {
        name: Set(name),
        description: Set(description),
        price: Set(price),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    };
    merchant.insert(db).await.map_err(Into::into)
}

/// Creates an extra priced in cents.
pub async fn create_extra(db: &DatabaseConnection, name: String, price: i64) -> Result<extra::Model> {
    let name = validate_name("Extra", &name)?;
    validate_price("Extra", price)?;

    let now = chrono::Utc::now();
    let extra = extra::ActiveModel {
        name: Set(name),
        price: Set(price),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    };
    extra.insert(db).await.map_err(Into::into)
}

/// Changes a product's current price. Existing order lines keep their snapshot.
pub async fn update_product_price(
    db: &DatabaseConnection,
    product_id: i64,
    new_price: i64,
) -> Result<product::Model> {
    validate_price("Product", new_price)?;

    let mut product: product::ActiveModel = Product::find_by_id(product_id)
        .one(db)
        .await?
        .ok_or(Error::ProductNotFound { product_id })?
        .into();

    product.price = Set(new_price);
    product.updated_at = Set(chrono::Utc::now());
    product.update(db).await.map_err(Into::into)
}

/// Changes a merchant add-on's current price.
pub async fn update_merchant_price(
    db: &DatabaseConnection,
    merchant_id: i64,
    new_price: i64,
) -> Result<merchant::Model> {
    validate_price("Merchant", new_price)?;

    let mut merchant: merchant::ActiveModel = Merchant::find_by_id(merchant_id)
        .one(db)
        .await?
        .ok_or(Error::MerchantNotFound { merchant_id })?
        .into();

    merchant.price = Set(new_price);
    merchant.updated_at = Set(chrono::Utc::now());
    merchant.update(db).await.map_err(Into::into)
}

/// Changes an extra's current price.
pub async fn update_extra_price(
    db: &DatabaseConnection,
    extra_id: i64,
    new_price: i64,
) -> Result<extra::Model> {
    validate_price("Extra", new_price)?;

    let mut extra: extra::ActiveModel = Extra::find_by_id(extra_id)
        .one(db)
        .await?
        .ok_or(Error::ExtraNotFound { extra_id })?
        .into();

    extra.price = Set(new_price);
    extra.updated_at = Set(chrono::Utc::now());
    extra.update(db).await.map_err(Into::into)
}
