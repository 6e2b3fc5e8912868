//! Order item entity - one catalog line within an order.
//!
//! `product_price` is the unit price snapshot taken at checkout and is never
//! rewritten. Exactly one of `product_id` / `merchant_id` is set, matching `item_type`.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Which catalog a line refers to
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Text")]
#[serde(rename_all = "lowercase")]
pub enum ItemKind {
    #[sea_orm(string_value = "product")]
    Product,
    #[sea_orm(string_value = "merchant")]
    Merchant,
}

/// Order item database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "order_items")]
pub struct Model {
    #[sea_orm(primary_key, column_name = "order_item_id")]
    pub id: i64,
    pub order_id: i64,
    pub product_id: Option<i64>,
    pub merchant_id: Option<i64>,
    pub item_type: ItemKind,
    /// Positive unit count
    pub quantity: i64,
    /// Unit price snapshot in cents
    pub product_price: i64,
    /// `product_price * quantity`, extras excluded
    pub total_price: i64,
}

impl Model {
    /// Catalog id of whichever side of the line is populated.
    #[must_use]
    pub fn catalog_id(&self) -> Option<i64> {
        match self.item_type {
            ItemKind::Product => self.product_id,
            ItemKind::Merchant => self.merchant_id,
        }
    }
}

/// Defines relationships between OrderItem and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::order::Entity",
        from = "Column::OrderId",
        to = "super::order::Column::Id",
        on_delete = "Cascade"
    )]
    Order,
    #[sea_orm(
        belongs_to = "super::product::Entity",
        from = "Column::ProductId",
        to = "super::product::Column::Id"
    )]
    Product,
    #[sea_orm(
        belongs_to = "super::merchant::Entity",
        from = "Column::MerchantId",
        to = "super::merchant::Column::Id"
    )]
    Merchant,
    #[sea_orm(has_many = "super::order_item_extra::Entity")]
    Extras,
}

impl Related<super::order::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Order.def()
    }
}

impl Related<super::product::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Product.def()
    }
}

impl Related<super::merchant::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Merchant.def()
    }
}

impl Related<super::order_item_extra::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Extras.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
