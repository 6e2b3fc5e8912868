use dotenvy::dotenv;
use std::path::Path;
use storefront_core::{
    config::{
        catalog::{catalog_path, load_catalog, seed_catalog},
        database::{create_connection, create_tables, get_database_url},
        environment::runtime_mode,
    },
    core::discount::get_active_discount,
    errors::Result,
};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

/// Creates the parent directory of a file-backed `SQLite` URL.
fn ensure_sqlite_dir(database_url: &str) -> Result<()> {
    let Some(rest) = database_url.strip_prefix("sqlite://") else {
        return Ok(());
    };
    let file = rest.split('?').next().unwrap_or_default();
    if file.is_empty() || file.contains(":memory:") {
        return Ok(());
    }
    if let Some(parent) = Path::new(file).parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    // 1. Initialize tracing (as early as possible)
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // 2. Load .env file; env vars can also be set externally
    dotenv().ok();

    let mode = runtime_mode();
    info!(?mode, "Starting storefront core");

    // 3. Connect and ensure the schema
    ensure_sqlite_dir(&get_database_url())?;
    let db = create_connection()
        .await
        .inspect_err(|e| error!("Failed to connect to database: {}", e))?;
    create_tables(&db)
        .await
        .inspect(|()| info!("Database initialized successfully."))
        .inspect_err(|e| error!("Failed to create tables: {}", e))?;

    // 4. Seed the catalog if a catalog file is present
    let path = catalog_path();
    if Path::new(&path).exists() {
        let catalog = load_catalog(&path)?;
        let summary = seed_catalog(&db, &catalog).await?;
        info!(%path, ?summary, "Catalog loaded");
    } else {
        warn!(%path, "No catalog file found, skipping seed");
    }

    match get_active_discount(&db).await? {
        Some(active) => info!(
            discount_id = active.discount.id,
            value = active.discount.discount_value,
            created_by = active.creator.as_ref().map(|c| c.user_name.as_str()),
            "Active discount"
        ),
        None => info!("No active discount"),
    }

    Ok(())
}
