//! Merchant entity - a merchant add-on sold as its own order line.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Merchant database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "merchant")]
pub struct Model {
    #[sea_orm(primary_key, column_name = "merchant_id")]
    pub id: i64,
    #[sea_orm(column_name = "merchant_name")]
    pub name: String,
    #[sea_orm(column_name = "merchant_description")]
    pub description: Option<String>,
    /// Current unit price in cents
    #[sea_orm(column_name = "merchant_price")]
    pub price: i64,
    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::order_item::Entity")]
    OrderItems,
}

impl Related<super::order_item::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::OrderItems.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
