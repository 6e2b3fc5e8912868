//! Product entity - a sellable catalog item.
//!
//! Products are the only line kind that can carry extras. Their price is read at
//! checkout time and copied into the order line, so later edits never touch history.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Product database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "product")]
pub struct Model {
    /// Unique identifier for the product
    #[sea_orm(primary_key, column_name = "product_id")]
    pub id: i64,
    /// Name of the product (e.g., "Latte", "Cheese Burger")
    #[sea_orm(column_name = "product_name")]
    pub name: String,
    /// Free-form category label used for display
    #[sea_orm(column_name = "product_category")]
    pub category: Option<String>,
    /// Current unit price in cents
    #[sea_orm(column_name = "product_price")]
    pub price: i64,
    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

/// Defines relationships between Product and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// One product appears on many order lines
    #[sea_orm(has_many = "super::order_item::Entity")]
    OrderItems,
}

impl Related<super::order_item::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::OrderItems.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
