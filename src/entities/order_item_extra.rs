//! Order item extra entity - an extra attached to a product line, with its price snapshot.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "order_item_extras")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub order_item_id: i64,
    pub extra_id: i64,
    /// Extra price snapshot in cents
    pub extra_price: i64,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::order_item::Entity",
        from = "Column::OrderItemId",
        to = "super::order_item::Column::Id",
        on_delete = "Cascade"
    )]
    OrderItem,
    #[sea_orm(
        belongs_to = "super::extra::Entity",
        from = "Column::ExtraId",
        to = "super::extra::Column::Id"
    )]
    Extra,
}

impl Related<super::order_item::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::OrderItem.def()
    }
}

impl Related<super::extra::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Extra.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
