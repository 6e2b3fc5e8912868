//! Discount entity - a reusable discount definition, not tied to a single order.
//!
//! At most one row may have `is_active = true`. Rows are created inactive and an
//! active row can be neither edited nor deleted until another discount is activated.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Discount database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "discounts")]
pub struct Model {
    #[sea_orm(primary_key, column_name = "discount_id")]
    pub id: i64,
    /// User who created the discount
    pub user_id: i64,
    /// Percentage value, validated to `[0, 100000]`
    pub discount_value: f64,
    pub discount_code: Option<String>,
    pub discount_description: Option<String>,
    pub is_active: bool,
    pub expires_at: Option<DateTimeUtc>,
    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::UserId",
        to = "super::user::Column::Id"
    )]
    User,
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::User.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
