//! Discount definitions and the single-active-discount rule.
//!
//! Discounts are created inactive. Activation deactivates every other row in the
//! same transaction, so there is never more than one active discount. The active
//! discount is frozen: it cannot be edited or deleted until another one replaces it.
//! Edits and deletes are guarded on `is_active = false` in the write itself, so an
//! activation that commits after the check still wins.

use crate::{
    core::user::require_user,
    entities::{Discount, User, discount, user},
    errors::{Error, Result},
};
use chrono::{DateTime, Utc};
use sea_orm::{QueryOrder, Set, TransactionTrait, prelude::*, sea_query::Expr};
use serde::Serialize;
use tracing::{info, instrument, warn};

/// Upper bound accepted for `discount_value`
pub const MAX_DISCOUNT_VALUE: f64 = 100_000.0;

/// Fields for a new discount definition
#[derive(Debug, Clone, PartialEq)]
pub struct NewDiscount {
    pub user_id: i64,
    pub value: f64,
    pub code: Option<String>,
    pub description: Option<String>,
    pub expires_at: Option<DateTime<Utc>>,
}

/// Partial update of a discount. `None` leaves a column untouched; for nullable
/// columns `Some(None)` clears the value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DiscountPatch {
    pub value: Option<f64>,
    pub code: Option<Option<String>>,
    pub description: Option<Option<String>>,
    pub expires_at: Option<Option<DateTime<Utc>>>,
}

impl DiscountPatch {
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.value.is_none()
            && self.code.is_none()
            && self.description.is_none()
            && self.expires_at.is_none()
    }
}

/// Name and email of the user who created a discount
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DiscountCreator {
    pub user_id: i64,
    pub user_name: String,
    pub user_email: String,
}

impl From<user::Model> for DiscountCreator {
    fn from(user: user::Model) -> Self {
        Self {
            user_id: user.id,
            user_name: user.user_name,
            user_email: user.user_email,
        }
    }
}

/// A discount together with its creator, as shown to administrators
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DiscountView {
    pub discount: discount::Model,
    /// `None` if the creating user no longer exists
    pub creator: Option<DiscountCreator>,
}

impl From<(discount::Model, Option<user::Model>)> for DiscountView {
    fn from((discount, creator): (discount::Model, Option<user::Model>)) -> Self {
        Self {
            discount,
            creator: creator.map(Into::into),
        }
    }
}

fn validate_value(value: f64) -> Result<()> {
    if !value.is_finite() || !(0.0..=MAX_DISCOUNT_VALUE).contains(&value) {
        return Err(Error::InvalidValue { value });
    }
    Ok(())
}

async fn find_discount<C>(db: &C, discount_id: i64) -> Result<discount::Model>
where
    C: ConnectionTrait,
{
    Discount::find_by_id(discount_id)
        .one(db)
        .await?
        .ok_or(Error::DiscountNotFound { discount_id })
}

/// Writes `patch` to `discount_id` only while it is inactive. Returns the number of rows changed.
async fn write_patch<C>(db: &C, discount_id: i64, patch: &DiscountPatch) -> Result<u64>
where
    C: ConnectionTrait,
{
    let mut update = Discount::update_many()
        .col_expr(discount::Column::UpdatedAt, Expr::value(Utc::now()))
        .filter(discount::Column::Id.eq(discount_id))
        .filter(discount::Column::IsActive.eq(false));
    if let Some(value) = patch.value {
        update = update.col_expr(discount::Column::DiscountValue, Expr::value(value));
    }
    if let Some(code) = &patch.code {
        update = update.col_expr(discount::Column::DiscountCode, Expr::value(code.clone()));
    }
    if let Some(description) = &patch.description {
        update = update.col_expr(
            discount::Column::DiscountDescription,
            Expr::value(description.clone()),
        );
    }
    if let Some(expires_at) = patch.expires_at {
        update = update.col_expr(discount::Column::ExpiresAt, Expr::value(expires_at));
    }

    Ok(update.exec(db).await?.rows_affected)
}

/// Creates an inactive discount.
///
/// This function is used when an administrator defines a new discount. The discount
/// only takes effect once [`activate_discount`] is called for it.
///
/// # Errors
/// - `InvalidValue` if the value is non-finite or outside `[0, 100000]`
/// - `UserNotFound` if the creating user does not exist
#[instrument(skip(db))]
pub async fn create_discount(db: &DatabaseConnection, new: NewDiscount) -> Result<discount::Model> {
    validate_value(new.value)?;
    require_user(db, new.user_id).await?;

    let now = Utc::now();
    let discount = discount::ActiveModel {
        user_id: Set(new.user_id),
        discount_value: Set(new.value),
        discount_code: Set(new.code),
        discount_description: Set(new.description),
        is_active: Set(false),
        expires_at: Set(new.expires_at),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    };
    let discount = discount.insert(db).await?;

    info!(discount_id = discount.id, value = discount.discount_value, "Discount created");
    Ok(discount)
}

/// Makes `discount_id` the only active discount.
///
/// The existence check, the bulk deactivation and the activation share one transaction,
/// so concurrent activations serialize on the write lock and leave exactly one active row.
///
/// # Errors
/// Returns `DiscountNotFound` if the target does not exist; no other discount is touched.
#[instrument(skip(db))]
pub async fn activate_discount(db: &DatabaseConnection, discount_id: i64) -> Result<discount::Model> {
    let txn = db.begin().await?;

    find_discount(&txn, discount_id).await?;
    let now = Utc::now();

    let deactivated = Discount::update_many()
        .col_expr(discount::Column::IsActive, Expr::value(false))
        .col_expr(discount::Column::UpdatedAt, Expr::value(now))
        .filter(discount::Column::IsActive.eq(true))
        .filter(discount::Column::Id.ne(discount_id))
        .exec(&txn)
        .await?;

    Discount::update_many()
        .col_expr(discount::Column::IsActive, Expr::value(true))
        .col_expr(discount::Column::UpdatedAt, Expr::value(now))
        .filter(discount::Column::Id.eq(discount_id))
        .exec(&txn)
        .await?;

    let active = find_discount(&txn, discount_id).await?;
    txn.commit().await?;

    info!(
        discount_id,
        deactivated = deactivated.rows_affected,
        "Discount activated"
    );
    Ok(active)
}

/// Applies a partial update to an inactive discount.
///
/// Only the fields present in the patch are written. The write is conditional on the
/// discount still being inactive, so an activation that lands after the initial check
/// makes this call fail instead of editing the live discount.
///
/// # Errors
/// - `DiscountNotFound` if the discount does not exist
/// - `DiscountActive` if it is the active discount
/// - `NoFields` if the patch is empty
/// - `InvalidValue` if a new value is out of range
#[instrument(skip(db))]
pub async fn update_discount(
    db: &DatabaseConnection,
    discount_id: i64,
    patch: DiscountPatch,
) -> Result<discount::Model> {
    let existing = find_discount(db, discount_id).await?;
    if existing.is_active {
        return Err(Error::DiscountActive { discount_id });
    }
    if patch.is_empty() {
        return Err(Error::NoFields);
    }
    if let Some(value) = patch.value {
        validate_value(value)?;
    }

    if write_patch(db, discount_id, &patch).await? == 0 {
        warn!(discount_id, "Discount changed state before the update was written");
        // Either activated or deleted since the check
        find_discount(db, discount_id).await?;
        return Err(Error::DiscountActive { discount_id });
    }

    let updated = find_discount(db, discount_id).await?;
    info!(discount_id, "Discount updated");
    Ok(updated)
}

/// Deletes an inactive discount.
///
/// # Errors
/// Returns `DiscountNotFound` if absent or `DiscountActive` if it is the active discount.
#[instrument(skip(db))]
pub async fn delete_discount(db: &DatabaseConnection, discount_id: i64) -> Result<()> {
    let existing = find_discount(db, discount_id).await?;
    if existing.is_active {
        return Err(Error::DiscountActive { discount_id });
    }

    // Guard against an activation landing between the read and the delete.
    let result = Discount::delete_many()
        .filter(discount::Column::Id.eq(discount_id))
        .filter(discount::Column::IsActive.eq(false))
        .exec(db)
        .await?;
    if result.rows_affected == 0 {
        return Err(Error::DiscountActive { discount_id });
    }

    info!(discount_id, "Discount deleted");
    Ok(())
}

/// The currently active discount and its creator, if any discount is active.
///
/// This function is used by callers deciding which discount to offer a customer,
/// and at startup to report the live discount.
pub async fn get_active_discount<C>(db: &C) -> Result<Option<DiscountView>>
where
    C: ConnectionTrait,
{
    let found = Discount::find()
        .filter(discount::Column::IsActive.eq(true))
        .find_also_related(User)
        .one(db)
        .await?;
    Ok(found.map(DiscountView::from))
}

/// Finds a discount and its creator by id.
///
/// This function is used when an administrator opens a single discount for editing.
///
/// # Errors
/// Returns `DiscountNotFound` if no discount has this id.
pub async fn get_discount_by_id(db: &DatabaseConnection, discount_id: i64) -> Result<DiscountView> {
    Discount::find_by_id(discount_id)
        .find_also_related(User)
        .one(db)
        .await?
        .map(DiscountView::from)
        .ok_or(Error::DiscountNotFound { discount_id })
}

/// All discounts with their creators, newest first.
///
/// This function backs the administrative discount list, where the active flag and the
/// creator's name are shown side by side.
pub async fn list_discounts(db: &DatabaseConnection) -> Result<Vec<DiscountView>> {
    let rows = Discount::find()
        .find_also_related(User)
        .order_by_desc(discount::Column::CreatedAt)
        .order_by_desc(discount::Column::Id)
        .all(db)
        .await?;
    Ok(rows.into_iter().map(DiscountView::from).collect())
}
