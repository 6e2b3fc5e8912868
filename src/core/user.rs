//! User lookups and creation for the order core.
//!
//! Authentication and profile management happen elsewhere; the order workflow only needs
//! to know that a user exists and to read its loyalty ledger.

use crate::{
    entities::{User, user},
    errors::{Error, Result},
};
use sea_orm::{Set, prelude::*};

/// Creates a user with an empty loyalty ledger.
///
/// This function is used when a customer registers. Points and spend totals start at zero.
///
/// # Errors
/// Returns an error if the name or email is blank, or the email is already taken.
pub async fn create_user(
    db: &DatabaseConnection,
    user_name: String,
    user_email: String,
    user_number: Option<String>,
) -> Result<user::Model> {
    if user_name.trim().is_empty() {
        return Err(Error::InvalidInput {
            message: "User name cannot be empty".to_string(),
        });
    }
    if user_email.trim().is_empty() {
        return Err(Error::InvalidInput {
            message: "User email cannot be empty".to_string(),
        });
    }

    let now = chrono::Utc::now();
    let user = user::ActiveModel {
        user_name: Set(user_name.trim().to_string()),
        user_email: Set(user_email.trim().to_lowercase()),
        user_number: Set(user_number),
        points: Set(0),
        points_redeemed: Set(0),
        has_points: Set(false),
        total_orders: Set(0),
        total_spent: Set(0),
        avg_order_value: Set(0),
        last_purchase_at: Set(None),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    };
    user.insert(db).await.map_err(Into::into)
}

/// Finds a user by id, returning None if absent.
pub async fn get_user_by_id<C>(db: &C, user_id: i64) -> Result<Option<user::Model>>
where
    C: ConnectionTrait,
{
    User::find_by_id(user_id).one(db).await.map_err(Into::into)
}

/// Finds a user by id, failing with [`Error::UserNotFound`] if absent.
pub async fn require_user<C>(db: &C, user_id: i64) -> Result<user::Model>
where
    C: ConnectionTrait,
{
    get_user_by_id(db, user_id)
        .await?
        .ok_or(Error::UserNotFound { user_id })
}
