//! User entity - the subset of a customer account the order core reads and writes.
//!
//! Identity fields are owned by the authentication layer. The loyalty ledger fields
//! (`total_orders`, `total_spent`, `avg_order_value`, `points`, `points_redeemed`,
//! `last_purchase_at`) are recomputed by the order completion workflow.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// User database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "users")]
pub struct Model {
    /// Unique identifier for the user
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Display name
    pub user_name: String,
    /// Contact email, unique per account
    #[sea_orm(unique)]
    pub user_email: String,
    /// Optional phone number
    pub user_number: Option<String>,
    /// Current loyalty point balance
    pub points: i64,
    /// Cumulative points spent against orders
    pub points_redeemed: i64,
    /// Set once the user has earned points at least once
    pub has_points: bool,
    /// Number of completed orders
    pub total_orders: i64,
    /// Sum of completed order totals, in cents
    pub total_spent: i64,
    /// `total_spent / total_orders`, in cents
    pub avg_order_value: i64,
    /// Time of the most recent completed order
    pub last_purchase_at: Option<DateTimeUtc>,
    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

/// Defines relationships between User and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// One user places many orders
    #[sea_orm(has_many = "super::order::Entity")]
    Orders,
    /// One user authors many discount definitions
    #[sea_orm(has_many = "super::discount::Entity")]
    Discounts,
}

impl Related<super::order::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Orders.def()
    }
}

impl Related<super::discount::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Discounts.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
