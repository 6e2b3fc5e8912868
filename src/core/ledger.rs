//! User loyalty ledger - derived spend totals and point balance.
//!
//! Spend totals (`total_orders`, `total_spent`, `avg_order_value`) are never trusted
//! incrementally: each order transition recomputes them from an aggregate over the
//! user's completed orders. The point balance is moved by an in-database delta
//! (`points = points + delta`) so concurrent writers never lose an update.

use crate::{
    entities::{Order, OrderStatus, User, order, user},
    errors::{Error, Result},
};
use chrono::{DateTime, Utc};
use sea_orm::{QuerySelect, prelude::*, sea_query::Expr};
use tracing::debug;

/// Aggregate of a user's completed orders
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SpendTotals {
    pub total_orders: i64,
    /// Cents
    pub total_spent: i64,
    /// Cents, rounded half up; 0 when there are no completed orders
    pub avg_order_value: i64,
}

impl SpendTotals {
    /// Builds totals from a `COUNT`/`SUM` over completed orders.
    #[must_use]
    pub fn from_aggregate(total_orders: i64, total_spent: i64) -> Self {
        let avg_order_value = if total_orders > 0 {
            (total_spent + total_orders / 2) / total_orders
        } else {
            0
        };
        Self {
            total_orders,
            total_spent,
            avg_order_value,
        }
    }
}

/// Points movement produced by completing one order
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PointsSettlement {
    /// Points the order earns now
    pub earned: i64,
    /// Points already credited for this same order before this completion
    pub previously_attributed: i64,
    /// Points spent against this order
    pub redeemed: i64,
}

impl PointsSettlement {
    /// Net change to apply to the user's point balance.
    #[must_use]
    pub const fn balance_delta(&self) -> i64 {
        self.earned - self.previously_attributed - self.redeemed
    }
}

/// Sums the user's completed orders in a single aggregate query.
pub async fn completed_order_totals<C>(db: &C, user_id: i64) -> Result<SpendTotals>
where
    C: ConnectionTrait,
{
    let row: Option<(i64, Option<i64>)> = Order::find()
        .select_only()
        .column_as(Expr::col(order::Column::Id).count(), "total_orders")
        .column_as(Expr::col(order::Column::TotalPrice).sum(), "total_spent")
        .filter(order::Column::UserId.eq(user_id))
        .filter(order::Column::Status.eq(OrderStatus::Completed))
        .into_tuple()
        .one(db)
        .await?;

    let (total_orders, total_spent) = row.unwrap_or((0, None));
    Ok(SpendTotals::from_aggregate(total_orders, total_spent.unwrap_or(0)))
}

/// Recomputes spend totals only. Used on cancellation, which never moves points.
pub async fn refresh_spend_totals<C>(db: &C, user_id: i64, now: DateTime<Utc>) -> Result<user::Model>
where
    C: ConnectionTrait,
{
    let totals = completed_order_totals(db, user_id).await?;
    debug!(user_id, ?totals, "Recomputed spend totals");

    User::update_many()
        .col_expr(user::Column::TotalOrders, Expr::value(totals.total_orders))
        .col_expr(user::Column::TotalSpent, Expr::value(totals.total_spent))
        .col_expr(user::Column::AvgOrderValue, Expr::value(totals.avg_order_value))
        .col_expr(user::Column::UpdatedAt, Expr::value(now))
        .filter(user::Column::Id.eq(user_id))
        .exec(db)
        .await?;

    reload_user(db, user_id).await
}

/// Recomputes spend totals and settles points for a freshly completed order.
///
/// This function is used inside the completion transaction, after the order row has
/// moved to `completed`, and marks the user as a points holder.
///
/// # Errors
/// Returns `UserNotFound` if the owner is gone, or a database error.
pub async fn record_completion<C>(
    db: &C,
    user_id: i64,
    settlement: PointsSettlement,
    completed_at: DateTime<Utc>,
) -> Result<user::Model>
where
    C: ConnectionTrait,
{
    let totals = completed_order_totals(db, user_id).await?;
    let delta = settlement.balance_delta();
    debug!(user_id, ?totals, ?settlement, delta, "Settling completed order");

    User::update_many()
        .col_expr(user::Column::TotalOrders, Expr::value(totals.total_orders))
        .col_expr(user::Column::TotalSpent, Expr::value(totals.total_spent))
        .col_expr(user::Column::AvgOrderValue, Expr::value(totals.avg_order_value))
        .col_expr(
            user::Column::Points,
            Expr::col(user::Column::Points).add(delta),
        )
        .col_expr(
            user::Column::PointsRedeemed,
            Expr::col(user::Column::PointsRedeemed).add(settlement.redeemed),
        )
        .col_expr(user::Column::HasPoints, Expr::value(true))
        .col_expr(user::Column::LastPurchaseAt, Expr::value(Some(completed_at)))
        .col_expr(user::Column::UpdatedAt, Expr::value(completed_at))
        .filter(user::Column::Id.eq(user_id))
        .exec(db)
        .await?;

    reload_user(db, user_id).await
}

async fn reload_user<C>(db: &C, user_id: i64) -> Result<user::Model>
where
    C: ConnectionTrait,
{
    User::find_by_id(user_id)
        .one(db)
        .await?
        .ok_or(Error::UserNotFound { user_id })
}
