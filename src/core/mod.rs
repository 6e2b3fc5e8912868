//! Core order workflow - framework-agnostic operations over an injected connection.
//!
//! Every function takes the connection (or an open transaction) explicitly, so callers
//! choose between a live database, an in-memory `SQLite` instance or a `MockDatabase`.

/// Minimal catalog writes used for seeding and price changes
pub mod catalog;
/// Order Builder - validated checkout in one transaction
pub mod checkout;
/// Order Completion Engine - status transitions, discounts and points
pub mod completion;
/// Discount Policy - discount definitions and the single-active rule
pub mod discount;
/// User loyalty ledger recomputation
pub mod ledger;
/// Order Query Service - read-only order views
pub mod order_query;
/// Price Resolver - authoritative unit prices
pub mod pricing;
/// User lookups
pub mod user;
