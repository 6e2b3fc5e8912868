//! Order completion - moves a pending order to `completed` or `cancelled`.
//!
//! Completion validates an optional discount, prices the order, grants points and
//! settles the user's loyalty ledger in one transaction. Cancellation only recomputes
//! spend totals; a cancelled order never earned points, so the balance is left alone.
//!
//! Points are computed from the gross (pre-discount) total, including a discount taken
//! earlier through [`apply_discount`].
//!
//! The status transition is a guarded `UPDATE ... WHERE order_status = 'pending'`. If two
//! callers race on the same order, the loser affects zero rows and fails without touching
//! the ledger.

use crate::{
    core::ledger::{self, PointsSettlement},
    entities::{Order, OrderStatus, order},
    errors::{Error, Result},
};
use sea_orm::{TransactionTrait, prelude::*, sea_query::Expr};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};

/// Loyalty points granted per whole currency unit spent.
pub const POINTS_PER_CURRENCY_UNIT: i64 = 10;

/// Ceiling for any discount taken at completion, as a percentage of the order total.
pub const MAX_DISCOUNT_PERCENT: f64 = 60.0;

/// A discount supplied when completing an order
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "lowercase")]
pub enum DiscountRequest {
    /// Percentage of the order total, `0..=60`
    Percentage(f64),
    /// Fixed amount in cents, strictly below 60% of the order total
    Amount(i64),
}

impl DiscountRequest {
    /// Validates the request against `total` (cents) and returns the discount amount in cents.
    ///
    /// # Errors
    /// Returns `InvalidDiscount` if the value falls outside the policy range.
    pub fn amount_for(self, total: i64) -> Result<i64> {
        match self {
            Self::Percentage(percent) => {
                if !percent.is_finite() || !(0.0..=MAX_DISCOUNT_PERCENT).contains(&percent) {
                    return Err(Error::InvalidDiscount {
                        reason: format!(
                            "percentage discount must be between 0 and {MAX_DISCOUNT_PERCENT} (got {percent})"
                        ),
                    });
                }
                Ok(percentage_of(total, percent))
            }
            Self::Amount(amount) => {
                if amount <= 0 {
                    return Err(Error::InvalidDiscount {
                        reason: format!("amount discount must be positive (got {amount})"),
                    });
                }
                // amount < 60% of total, in integer arithmetic
                #[allow(clippy::cast_possible_truncation)]
                let cap_percent = MAX_DISCOUNT_PERCENT as i128;
                if i128::from(amount) * 100 >= i128::from(total) * cap_percent {
                    return Err(Error::InvalidDiscount {
                        reason: format!(
                            "amount discount {amount} must be less than {MAX_DISCOUNT_PERCENT}% of the order total {total}"
                        ),
                    });
                }
                Ok(amount)
            }
        }
    }
}

/// Result of [`apply_discount`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AppliedDiscount {
    /// Amount taken off, in cents
    pub discount_amount: i64,
    pub order: order::Model,
}

/// `percent` of `total` cents, rounded to the nearest cent.
#[must_use]
pub fn percentage_of(total: i64, percent: f64) -> i64 {
    // Cast safety: percent is validated to a small finite range before this is called.
    #[allow(clippy::cast_possible_truncation, clippy::cast_precision_loss)]
    let amount = ((total as f64) * percent / 100.0).round() as i64;
    amount
}

/// Points earned for a gross order total in cents: `floor(total_in_units * 10)`.
#[must_use]
pub const fn points_for(gross_total: i64) -> i64 {
    if gross_total <= 0 {
        return 0;
    }
    gross_total.saturating_mul(POINTS_PER_CURRENCY_UNIT) / 100
}

async fn find_order<C>(db: &C, order_id: i64) -> Result<order::Model>
where
    C: ConnectionTrait,
{
    Order::find_by_id(order_id)
        .one(db)
        .await?
        .ok_or_else(|| Error::OrderNotFound {
            order: order_id.to_string(),
        })
}

fn ensure_transition(order: &order::Model, target: OrderStatus) -> Result<()> {
    if order.status.can_transition_to(target) {
        return Ok(());
    }
    if order.status == OrderStatus::Completed && target == OrderStatus::Completed {
        return Err(Error::OrderAlreadyCompleted { order_id: order.id });
    }
    Err(Error::InvalidTransition {
        order_id: order.id,
        from: order.status,
        to: target,
    })
}

/// Reports the error for a guarded update that matched no row.
async fn lost_transition<C>(db: &C, order_id: i64, target: OrderStatus) -> Error
where
    C: ConnectionTrait,
{
    warn!(order_id, %target, "Order changed state while transitioning");
    match find_order(db, order_id).await {
        Ok(current) => ensure_transition(&current, target).err().unwrap_or(Error::InvalidTransition {
            order_id,
            from: current.status,
            to: target,
        }),
        Err(err) => err,
    }
}

/// Completes a pending order, optionally taking a discount, and settles the user's ledger.
///
/// This function is used when payment for an order has been received. The order's
/// points are credited to its owner and spend totals are recomputed in the same
/// transaction as the status change.
///
/// # Errors
/// - `OrderNotFound` if the order does not exist
/// - `OrderAlreadyCompleted` if it was already completed, `InvalidTransition` for any other non-pending status
/// - `DiscountAlreadyApplied` if a discount is supplied and the order already carries one
/// - `InvalidDiscount` if the discount is outside the policy range
#[instrument(skip(db))]
pub async fn complete_order(
    db: &DatabaseConnection,
    order_id: i64,
    discount: Option<DiscountRequest>,
) -> Result<order::Model> {
    let txn = db.begin().await?;

    let order = find_order(&txn, order_id).await?;
    ensure_transition(&order, OrderStatus::Completed)?;

    let discount_amount = match discount {
        Some(request) => {
            if order.applied_discount > 0 {
                return Err(Error::DiscountAlreadyApplied { order_id });
            }
            request.amount_for(order.total_price)?
        }
        None => 0,
    };

    let gross_total = order.total_price + order.applied_discount;
    let points_earned = points_for(gross_total);
    let final_total = (order.total_price - discount_amount).max(0);
    let applied_discount = order.applied_discount + discount_amount;
    let now = chrono::Utc::now();

    let result = Order::update_many()
        .col_expr(order::Column::Status, Expr::value(OrderStatus::Completed))
        .col_expr(order::Column::TotalPrice, Expr::value(final_total))
        .col_expr(order::Column::AppliedDiscount, Expr::value(applied_discount))
        .col_expr(order::Column::PointsEarned, Expr::value(points_earned))
        .col_expr(order::Column::UpdatedAt, Expr::value(now))
        .filter(order::Column::Id.eq(order_id))
        .filter(order::Column::Status.eq(OrderStatus::Pending))
        .exec(&txn)
        .await?;
    if result.rows_affected == 0 {
        return Err(lost_transition(&txn, order_id, OrderStatus::Completed).await);
    }

    let settlement = PointsSettlement {
        earned: points_earned,
        previously_attributed: order.points_earned,
        redeemed: order.points_redeemed,
    };
    let user = ledger::record_completion(&txn, order.user_id, settlement, now).await?;

    let completed = find_order(&txn, order_id).await?;
    txn.commit().await?;

    info!(
        order_id,
        user_id = user.id,
        total_price = completed.total_price,
        discount_amount,
        points_earned,
        user_points = user.points,
        "Order completed"
    );
    Ok(completed)
}

/// Cancels a pending order and recomputes the owner's spend totals.
///
/// This function is used when a customer abandons an order before paying.
///
/// # Errors
/// - `OrderNotFound` if the order does not exist
/// - `InvalidTransition` if the order is not pending
#[instrument(skip(db))]
pub async fn cancel_order(db: &DatabaseConnection, order_id: i64) -> Result<order::Model> {
    let txn = db.begin().await?;

    let order = find_order(&txn, order_id).await?;
    ensure_transition(&order, OrderStatus::Cancelled)?;

    let now = chrono::Utc::now();
    let result = Order::update_many()
        .col_expr(order::Column::Status, Expr::value(OrderStatus::Cancelled))
        .col_expr(order::Column::UpdatedAt, Expr::value(now))
        .filter(order::Column::Id.eq(order_id))
        .filter(order::Column::Status.eq(OrderStatus::Pending))
        .exec(&txn)
        .await?;
    if result.rows_affected == 0 {
        return Err(lost_transition(&txn, order_id, OrderStatus::Cancelled).await);
    }

    ledger::refresh_spend_totals(&txn, order.user_id, now).await?;

    let cancelled = find_order(&txn, order_id).await?;
    txn.commit().await?;

    info!(order_id, user_id = order.user_id, "Order cancelled");
    Ok(cancelled)
}

/// Stores a discount on `order_id` while it is still pending and undiscounted.
///
/// When nothing matches, the order is read again so a concurrent completion or
/// cancellation reports `OrderNotPending` rather than `DiscountAlreadyApplied`.
async fn write_discount<C>(
    db: &C,
    order_id: i64,
    discount_amount: i64,
    discounted_total: i64,
) -> Result<()>
where
    C: ConnectionTrait,
{
    let result = Order::update_many()
        .col_expr(order::Column::AppliedDiscount, Expr::value(discount_amount))
        .col_expr(order::Column::TotalPrice, Expr::value(discounted_total))
        .col_expr(order::Column::UpdatedAt, Expr::value(chrono::Utc::now()))
        .filter(order::Column::Id.eq(order_id))
        .filter(order::Column::Status.eq(OrderStatus::Pending))
        .filter(order::Column::AppliedDiscount.eq(0))
        .exec(db)
        .await?;
    if result.rows_affected > 0 {
        return Ok(());
    }

    warn!(order_id, "Order changed while applying a discount");
    let current = find_order(db, order_id).await?;
    if current.status != OrderStatus::Pending {
        return Err(Error::OrderNotPending {
            order_id,
            status: current.status,
        });
    }
    Err(Error::DiscountAlreadyApplied { order_id })
}

/// Takes `percent` off a pending order ahead of completion.
///
/// This function is used when a cashier grants a percentage off before the customer
/// pays. The discounted amount is stored on the order and counted again at completion
/// so points are still earned on the gross total.
///
/// # Errors
/// - `InvalidDiscount` unless `0 < percent <= 60`, or if the percentage rounds to zero cents
/// - `OrderNotFound`, `OrderNotPending`, or `DiscountAlreadyApplied`
#[instrument(skip(db))]
pub async fn apply_discount(
    db: &DatabaseConnection,
    order_id: i64,
    percent: f64,
) -> Result<AppliedDiscount> {
    if !percent.is_finite() || percent <= 0.0 {
        return Err(Error::InvalidDiscount {
            reason: format!("discount percentage must be a positive number (got {percent})"),
        });
    }

    let txn = db.begin().await?;

    let order = find_order(&txn, order_id).await?;
    if order.status != OrderStatus::Pending {
        return Err(Error::OrderNotPending {
            order_id,
            status: order.status,
        });
    }
    if order.applied_discount > 0 {
        return Err(Error::DiscountAlreadyApplied { order_id });
    }

    let discount_amount = DiscountRequest::Percentage(percent).amount_for(order.total_price)?;
    if discount_amount == 0 {
        return Err(Error::InvalidDiscount {
            reason: format!(
                "{percent}% of {} cents rounds to no discount",
                order.total_price
            ),
        });
    }
    let discounted_total = (order.total_price - discount_amount).max(0);
    write_discount(&txn, order_id, discount_amount, discounted_total).await?;

    let order = find_order(&txn, order_id).await?;
    txn.commit().await?;

    info!(order_id, percent, discount_amount, "Discount applied to order");
    Ok(AppliedDiscount {
        discount_amount,
        order,
    })
}
