//! Shared test utilities for the storefront core.
//!
//! This module provides helpers for setting up in-memory test databases
//! and creating catalog, user and order fixtures with sensible defaults.

use crate::{
    core::{catalog, checkout::generate_order_code, user},
    entities::{self, OrderStatus},
    errors::Result,
};
use sea_orm::{ActiveModelTrait, DatabaseConnection, Set};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Routes `tracing` output through the test harness. Safe to call from every test.
pub fn init_test_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug")),
        )
        .with_test_writer()
        .try_init();
}

/// Creates an in-memory `SQLite` database with all tables initialized.
/// This is the standard setup for all integration tests.
pub async fn setup_test_db() -> Result<DatabaseConnection> {
    init_test_tracing();
    let db = sea_orm::Database::connect("sqlite::memory:").await?;
    crate::config::database::create_tables(&db).await?;
    Ok(db)
}

/// Creates a file-backed `SQLite` database under the system temp directory.
///
/// Unlike `sqlite::memory:`, a file database gives the pool several real connections,
/// so concurrent transactions actually contend. Pass the returned path to
/// [`remove_file_db`] when the test is done.
pub async fn setup_file_db() -> Result<(DatabaseConnection, PathBuf)> {
    init_test_tracing();
    let path = std::env::temp_dir().join(format!("storefront-test-{}.sqlite", uuid::Uuid::new_v4()));
    let url = format!("sqlite://{}?mode=rwc", path.display());
    let db = sea_orm::Database::connect(&url).await?;
    crate::config::database::create_tables(&db).await?;
    Ok((db, path))
}

/// Closes `db` and deletes the database file with its WAL side files.
pub async fn remove_file_db(db: DatabaseConnection, path: PathBuf) -> Result<()> {
    db.close().await?;
    for suffix in ["", "-wal", "-shm"] {
        let mut file = path.clone().into_os_string();
        file.push(suffix);
        let _ = std::fs::remove_file(file);
    }
    Ok(())
}

/// Creates a test user.
///
/// # Defaults
/// * `user_name`: "Test User"
/// * `user_number`: None
pub async fn create_test_user(db: &DatabaseConnection, email: &str) -> Result<entities::user::Model> {
    user::create_user(db, "Test User".to_string(), email.to_string(), None).await
}

/// Creates an uncategorised test product priced in cents.
pub async fn create_test_product(
    db: &DatabaseConnection,
    name: &str,
    price: i64,
) -> Result<entities::product::Model> {
    catalog::create_product(db, name.to_string(), None, price).await
}

/// Creates a test merchant add-on priced in cents.
pub async fn create_test_merchant(
    db: &DatabaseConnection,
    name: &str,
    price: i64,
) -> Result<entities::merchant::Model> {
    catalog::create_merchant(db, name.to_string(), None, price).await
}

/// Creates a test extra priced in cents.
pub async fn create_test_extra(
    db: &DatabaseConnection,
    name: &str,
    price: i64,
) -> Result<entities::extra::Model> {
    catalog::create_extra(db, name.to_string(), price).await
}

/// Inserts an order row directly, bypassing checkout.
/// Use this when a test needs an order in a specific status without line items.
pub async fn insert_test_order(
    db: &DatabaseConnection,
    user_id: i64,
    status: OrderStatus,
    total_price: i64,
) -> Result<entities::order::Model> {
    let now = chrono::Utc::now();
    let order = entities::order::ActiveModel {
        order_code: Set(generate_order_code()),
        user_id: Set(user_id),
        status: Set(status),
        total_price: Set(total_price),
        applied_discount: Set(0),
        points_earned: Set(0),
        points_redeemed: Set(0),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    };
    order.insert(db).await.map_err(Into::into)
}

/// Sets up a test environment with one user.
/// Returns (db, user) for common test scenarios.
pub async fn setup_with_user() -> Result<(DatabaseConnection, entities::user::Model)> {
    let db = setup_test_db().await?;
    let user = create_test_user(&db, "test@example.com").await?;
    Ok((db, user))
}
