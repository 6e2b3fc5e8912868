/// Catalog seed loading from catalog.toml
pub mod catalog;

/// Database connection and schema management
pub mod database;

/// Runtime mode read from the environment
pub mod environment;
