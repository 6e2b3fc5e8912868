//! Unified error types for the storefront order core.
//!
//! Every failure carries structured fields instead of a pre-rendered message so the
//! boundary layer can pick a transport status from [`Error::kind`] without string matching.

use crate::config::environment::RuntimeMode;
use crate::entities::order::OrderStatus;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Database error: {0}")]
    Database(#[from] sea_orm::DbErr),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("User {user_id} not found")]
    UserNotFound { user_id: i64 },

    #[error("Order {order} not found")]
    OrderNotFound { order: String },

    #[error("Product {product_id} not found")]
    ProductNotFound { product_id: i64 },

    #[error("Merchant {merchant_id} not found")]
    MerchantNotFound { merchant_id: i64 },

    #[error("Extra {extra_id} not found")]
    ExtraNotFound { extra_id: i64 },

    #[error("Discount {discount_id} not found")]
    DiscountNotFound { discount_id: i64 },

    #[error("Invalid item at position {index}: {reason}")]
    InvalidItem { index: usize, reason: String },

    #[error("Invalid stored price {price} for {source_label}")]
    InvalidPrice { source_label: String, price: i64 },

    #[error("Invalid input: {message}")]
    InvalidInput { message: String },

    #[error("Order {order_id} is already completed")]
    OrderAlreadyCompleted { order_id: i64 },

    #[error("Cannot move order {order_id} from {from} to {to}")]
    InvalidTransition {
        order_id: i64,
        from: OrderStatus,
        to: OrderStatus,
    },

    #[error("Order {order_id} is {status}; only pending orders accept a discount")]
    OrderNotPending { order_id: i64, status: OrderStatus },

    #[error("Invalid discount: {reason}")]
    InvalidDiscount { reason: String },

    #[error("A discount has already been applied to order {order_id}")]
    DiscountAlreadyApplied { order_id: i64 },

    #[error("Discount value {value} must be between 0 and 100000")]
    InvalidValue { value: f64 },

    #[error("Discount {discount_id} is active; activate another discount first")]
    DiscountActive { discount_id: i64 },

    #[error("No fields to update")]
    NoFields,
}

/// Outward classification of an [`Error`], stable across message changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    InvalidInput,
    InvalidTransition,
    InvalidDiscount,
    ConstraintConflict,
    Internal,
}

impl ErrorKind {
    /// HTTP-style status class the request layer should answer with.
    #[must_use]
    pub const fn status_code(self) -> u16 {
        match self {
            Self::NotFound => 404,
            Self::InvalidInput | Self::InvalidDiscount => 400,
            Self::InvalidTransition | Self::ConstraintConflict => 409,
            Self::Internal => 500,
        }
    }
}

impl Error {
    /// Classifies the error for the request layer.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::UserNotFound { .. }
            | Self::OrderNotFound { .. }
            | Self::ProductNotFound { .. }
            | Self::MerchantNotFound { .. }
            | Self::ExtraNotFound { .. }
            | Self::DiscountNotFound { .. } => ErrorKind::NotFound,
            Self::InvalidItem { .. }
            | Self::InvalidPrice { .. }
            | Self::InvalidInput { .. }
            | Self::InvalidValue { .. }
            | Self::NoFields => ErrorKind::InvalidInput,
            Self::OrderAlreadyCompleted { .. }
            | Self::InvalidTransition { .. }
            | Self::OrderNotPending { .. }
            | Self::DiscountActive { .. } => ErrorKind::InvalidTransition,
            Self::InvalidDiscount { .. } => ErrorKind::InvalidDiscount,
            Self::DiscountAlreadyApplied { .. } => ErrorKind::ConstraintConflict,
            Self::Database(err) if is_constraint_violation(err) => ErrorKind::ConstraintConflict,
            Self::Config { .. } | Self::Database(_) | Self::Io(_) => ErrorKind::Internal,
        }
    }

    /// Message safe to hand back to a caller.
    ///
    /// Internal failures are masked in production so database and filesystem details stay in the logs.
    #[must_use]
    pub fn public_message(&self, mode: RuntimeMode) -> String {
        if mode == RuntimeMode::Production && self.kind() == ErrorKind::Internal {
            return "Internal server error".to_string();
        }
        self.to_string()
    }
}

fn is_constraint_violation(err: &sea_orm::DbErr) -> bool {
    matches!(
        err.sql_err(),
        Some(sea_orm::SqlErr::UniqueConstraintViolation(_) | sea_orm::SqlErr::ForeignKeyConstraintViolation(_))
    )
}

// Convenience `Result` type
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_kind_status_codes() {
        assert_eq!(Error::OrderNotFound { order: "7".into() }.kind().status_code(), 404);
        assert_eq!(
            Error::InvalidItem {
                index: 0,
                reason: "quantity".into()
            }
            .kind()
            .status_code(),
            400
        );
        assert_eq!(Error::OrderAlreadyCompleted { order_id: 1 }.kind().status_code(), 409);
        assert_eq!(Error::DiscountActive { discount_id: 1 }.kind(), ErrorKind::InvalidTransition);
        assert_eq!(
            Error::InvalidDiscount {
                reason: "too big".into()
            }
            .kind(),
            ErrorKind::InvalidDiscount
        );
        assert_eq!(Error::DiscountAlreadyApplied { order_id: 3 }.kind().status_code(), 409);
        assert_eq!(Error::NoFields.kind(), ErrorKind::InvalidInput);
    }

    #[test]
    fn test_public_message_masks_internal_errors_in_production() {
        let err = Error::Database(sea_orm::DbErr::Custom("disk I/O error at page 42".into()));
        assert_eq!(err.public_message(RuntimeMode::Production), "Internal server error");
        assert!(err.public_message(RuntimeMode::Development).contains("page 42"));

        let not_found = Error::DiscountNotFound { discount_id: 9 };
        assert_eq!(
            not_found.public_message(RuntimeMode::Production),
            "Discount 9 not found"
        );
    }
}
