//! Extra entity - an add-on (extra shot, topping) attachable to product lines.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Extra database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "extras")]
pub struct Model {
    #[sea_orm(primary_key, column_name = "extra_id")]
    pub id: i64,
    #[sea_orm(column_name = "extra_name")]
    pub name: String,
    /// Current price in cents
    #[sea_orm(column_name = "extra_price")]
    pub price: i64,
    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::order_item_extra::Entity")]
    OrderItemExtras,
}

impl Related<super::order_item_extra::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::OrderItemExtras.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
