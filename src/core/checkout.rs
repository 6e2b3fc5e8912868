//! Checkout - builds an order aggregate (order, lines, extras) in one transaction.
//!
//! Every item is structurally validated before the first statement runs. Prices are then
//! resolved one by one inside the transaction and copied onto the new rows as snapshots.
//! Any failure drops the transaction uncommitted, so a partial order is never visible.
//! The user's loyalty ledger is not touched here; that happens on completion.

use crate::{
    core::{
        pricing::{PriceSource, resolve_unit_price},
        user::require_user,
    },
    entities::{ItemKind, OrderStatus, order, order_item, order_item_extra},
    errors::{Error, Result},
};
use sea_orm::{Set, TransactionTrait, prelude::*};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};
use uuid::Uuid;

/// A validated checkout line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckoutItem {
    pub kind: ItemKind,
    pub catalog_id: i64,
    pub quantity: i64,
    /// Extras to attach; only allowed on product lines
    pub extra_ids: Vec<i64>,
}

impl CheckoutItem {
    #[must_use]
    pub const fn product(product_id: i64, quantity: i64) -> Self {
        Self {
            kind: ItemKind::Product,
            catalog_id: product_id,
            quantity,
            extra_ids: Vec::new(),
        }
    }

    #[must_use]
    pub const fn merchant(merchant_id: i64, quantity: i64) -> Self {
        Self {
            kind: ItemKind::Merchant,
            catalog_id: merchant_id,
            quantity,
            extra_ids: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_extras(mut self, extra_ids: Vec<i64>) -> Self {
        self.extra_ids = extra_ids;
        self
    }

    fn validate(&self, index: usize) -> Result<()> {
        if self.quantity <= 0 {
            return Err(Error::InvalidItem {
                index,
                reason: format!("quantity must be a positive integer (got {})", self.quantity),
            });
        }
        if self.kind == ItemKind::Merchant && !self.extra_ids.is_empty() {
            return Err(Error::InvalidItem {
                index,
                reason: "extras can only be attached to product items".to_string(),
            });
        }
        Ok(())
    }
}

/// Checkout line as it arrives from a request body:
/// `{ "type": "product", "product_id": 3, "quantity": 2, "extras": [1] }`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CheckoutItemRequest {
    #[serde(rename = "type")]
    pub item_type: Option<String>,
    pub product_id: Option<i64>,
    pub merchant_id: Option<i64>,
    pub quantity: Option<i64>,
    #[serde(default)]
    pub extras: Vec<i64>,
}

impl CheckoutItemRequest {
    /// Converts a raw request line into a [`CheckoutItem`].
    ///
    /// The declared `type` must name exactly the id that is present.
    pub fn into_item(self, index: usize) -> Result<CheckoutItem> {
        let invalid = |reason: &str| Error::InvalidItem {
            index,
            reason: reason.to_string(),
        };

        let (kind, catalog_id) = match (self.item_type.as_deref(), self.product_id, self.merchant_id) {
            (Some("product"), Some(id), None) => (ItemKind::Product, id),
            (Some("merchant"), None, Some(id)) => (ItemKind::Merchant, id),
            (Some("product" | "merchant"), Some(_), Some(_)) => {
                return Err(invalid("item must reference either a product or a merchant, not both"));
            }
            (Some("product"), _, _) => return Err(invalid("product_id is required for product items")),
            (Some("merchant"), _, _) => {
                return Err(invalid("merchant_id is required for merchant items"));
            }
            (Some(other), _, _) => {
                return Err(invalid(&format!(
                    "unknown item type {other:?}; expected \"product\" or \"merchant\""
                )));
            }
            (None, _, _) => return Err(invalid("item type is required")),
        };

        let quantity = self.quantity.ok_or_else(|| invalid("quantity is required"))?;

        let item = CheckoutItem {
            kind,
            catalog_id,
            quantity,
            extra_ids: self.extras,
        };
        item.validate(index)?;
        Ok(item)
    }
}

/// What the caller gets back from a successful checkout
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CheckoutReceipt {
    pub order_id: i64,
    pub order_code: String,
    /// Total in cents
    pub total_price: i64,
}

/// Generates a short, shareable order code such as `ORD-9F3A61C2`.
#[must_use]
pub fn generate_order_code() -> String {
    let id = Uuid::new_v4().simple().to_string().to_uppercase();
    format!("ORD-{}", &id[..8])
}

/// Validates a whole checkout request without touching the database.
pub fn validate_items(items: &[CheckoutItem]) -> Result<()> {
    if items.is_empty() {
        return Err(Error::InvalidItem {
            index: 0,
            reason: "at least one item is required".to_string(),
        });
    }
    items
        .iter()
        .enumerate()
        .try_for_each(|(index, item)| item.validate(index))
}

/// Creates a pending order for `user_id` from `items`.
///
/// The order total is the sum of every line total (`unit price * quantity`) plus the
/// price of every attached extra.
///
/// # Errors
/// - `InvalidItem` for an empty request, a non-positive quantity or extras on a merchant line
/// - `UserNotFound` if the user does not exist
/// - `ProductNotFound` / `MerchantNotFound` / `ExtraNotFound` / `InvalidPrice` from price resolution
///
/// No rows are left behind on any error.
///
/// This function is used when a customer submits their cart. The returned receipt
/// carries the order code they can later use to look the order up.
#[instrument(skip(db, items), fields(item_count = items.len()))]
pub async fn checkout(
    db: &DatabaseConnection,
    user_id: i64,
    items: &[CheckoutItem],
) -> Result<CheckoutReceipt> {
    validate_items(items)?;

    let txn = db.begin().await?;

    require_user(&txn, user_id).await?;

    let now = chrono::Utc::now();
    let order = order::ActiveModel {
        order_code: Set(generate_order_code()),
        user_id: Set(user_id),
        status: Set(OrderStatus::Pending),
        total_price: Set(0),
        applied_discount: Set(0),
        points_earned: Set(0),
        points_redeemed: Set(0),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(&txn)
    .await?;

    let mut total: i64 = 0;
    for (index, item) in items.iter().enumerate() {
        let unit_price =
            resolve_unit_price(&txn, PriceSource::for_item(item.kind, item.catalog_id)).await?;
        let line_total = unit_price
            .checked_mul(item.quantity)
            .ok_or_else(|| overflow(index))?;

        let line = order_item::ActiveModel {
            order_id: Set(order.id),
            product_id: Set((item.kind == ItemKind::Product).then_some(item.catalog_id)),
            merchant_id: Set((item.kind == ItemKind::Merchant).then_some(item.catalog_id)),
            item_type: Set(item.kind),
            quantity: Set(item.quantity),
            product_price: Set(unit_price),
            total_price: Set(line_total),
            ..Default::default()
        }
        .insert(&txn)
        .await?;
        total = total.checked_add(line_total).ok_or_else(|| overflow(index))?;

        for &extra_id in &item.extra_ids {
            let extra_price = resolve_unit_price(&txn, PriceSource::Extra(extra_id)).await?;
            order_item_extra::ActiveModel {
                order_item_id: Set(line.id),
                extra_id: Set(extra_id),
                extra_price: Set(extra_price),
                ..Default::default()
            }
            .insert(&txn)
            .await?;
            total = total.checked_add(extra_price).ok_or_else(|| overflow(index))?;
        }

        debug!(order_item_id = line.id, unit_price, line_total, "Order line added");
    }

    let mut order: order::ActiveModel = order.into();
    order.total_price = Set(total);
    let order = order.update(&txn).await?;

    txn.commit().await?;

    info!(
        order_id = order.id,
        order_code = %order.order_code,
        total_price = order.total_price,
        "Checkout completed"
    );

    Ok(CheckoutReceipt {
        order_id: order.id,
        order_code: order.order_code,
        total_price: order.total_price,
    })
}

fn overflow(index: usize) -> Error {
    Error::InvalidItem {
        index,
        reason: "order total is too large".to_string(),
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::core::catalog;
    use crate::entities::{Order, OrderItem, OrderItemExtra};
    use crate::test_utils::*;
    use sea_orm::{DatabaseBackend, MockDatabase, PaginatorTrait, QueryOrder};

    #[tokio::test]
    async fn test_checkout_validation() -> Result<()> {
        let db = MockDatabase::new(DatabaseBackend::Sqlite).into_connection();

        let result = checkout(&db, 1, &[]).await;
        assert!(matches!(result.unwrap_err(), Error::InvalidItem { index: 0, .. }));

        let result = checkout(&db, 1, &[CheckoutItem::product(1, 1), CheckoutItem::product(2, 0)]).await;
        assert!(matches!(result.unwrap_err(), Error::InvalidItem { index: 1, .. }));

        let result = checkout(&db, 1, &[CheckoutItem::product(1, -3)]).await;
        assert!(matches!(result.unwrap_err(), Error::InvalidItem { index: 0, .. }));

        let result = checkout(&db, 1, &[CheckoutItem::merchant(1, 1).with_extras(vec![4])]).await;
        assert!(matches!(result.unwrap_err(), Error::InvalidItem { index: 0, .. }));

        Ok(())
    }

    #[tokio::test]
    async fn test_checkout_totals_items_and_extras() -> Result<()> {
        let (db, user) = setup_with_user().await?;
        let burger = create_test_product(&db, "Burger", 1000).await?;
        let fries = create_test_product(&db, "Fries", 500).await?;
        let cheese = create_test_extra(&db, "Cheese", 150).await?;

        let receipt = checkout(
            &db,
            user.id,
            &[
                CheckoutItem::product(burger.id, 2).with_extras(vec![cheese.id]),
                CheckoutItem::product(fries.id, 1),
            ],
        )
        .await?;

        // 2 x 10.00 + 1 x 5.00 + 1.50
        assert_eq!(receipt.total_price, 2650);
        assert!(receipt.order_code.starts_with("ORD-"));

        let order = Order::find_by_id(receipt.order_id).one(&db).await?.unwrap();
        assert_eq!(order.status, OrderStatus::Pending);
        assert_eq!(order.total_price, 2650);
        assert_eq!(order.points_earned, 0);
        assert_eq!(order.applied_discount, 0);

        let lines = OrderItem::find()
            .filter(order_item::Column::OrderId.eq(order.id))
            .order_by_asc(order_item::Column::Id)
            .all(&db)
            .await?;
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0].product_price, 1000);
        assert_eq!(lines[0].total_price, 2000);
        assert_eq!(lines[0].merchant_id, None);
        assert_eq!(lines[1].total_price, 500);

        let extras = OrderItemExtra::find().all(&db).await?;
        assert_eq!(extras.len(), 1);
        assert_eq!(extras[0].order_item_id, lines[0].id);
        assert_eq!(extras[0].extra_price, 150);

        Ok(())
    }

    #[tokio::test]
    async fn test_checkout_merchant_item() -> Result<()> {
        let (db, user) = setup_with_user().await?;
        let wrap = create_test_merchant(&db, "Gift Wrap", 200).await?;

        let receipt = checkout(&db, user.id, &[CheckoutItem::merchant(wrap.id, 3)]).await?;
        assert_eq!(receipt.total_price, 600);

        let line = OrderItem::find().one(&db).await?.unwrap();
        assert_eq!(line.item_type, ItemKind::Merchant);
        assert_eq!(line.merchant_id, Some(wrap.id));
        assert_eq!(line.product_id, None);
        assert_eq!(line.catalog_id(), Some(wrap.id));

        Ok(())
    }

    #[tokio::test]
    async fn test_checkout_price_snapshot_survives_catalog_change() -> Result<()> {
        let (db, user) = setup_with_user().await?;
        let latte = create_test_product(&db, "Latte", 450).await?;
        let shot = create_test_extra(&db, "Extra Shot", 75).await?;

        let receipt = checkout(
            &db,
            user.id,
            &[CheckoutItem::product(latte.id, 1).with_extras(vec![shot.id])],
        )
        .await?;

        catalog::update_product_price(&db, latte.id, 990).await?;
        catalog::update_extra_price(&db, shot.id, 300).await?;

        let line = OrderItem::find().one(&db).await?.unwrap();
        assert_eq!(line.product_price, 450);
        let extra = OrderItemExtra::find().one(&db).await?.unwrap();
        assert_eq!(extra.extra_price, 75);
        let order = Order::find_by_id(receipt.order_id).one(&db).await?.unwrap();
        assert_eq!(order.total_price, 525);

        // A new order sees the new price
        let second = checkout(&db, user.id, &[CheckoutItem::product(latte.id, 1)]).await?;
        assert_eq!(second.total_price, 990);

        Ok(())
    }

    #[tokio::test]
    async fn test_checkout_unknown_product_leaves_no_rows() -> Result<()> {
        let (db, user) = setup_with_user().await?;
        let latte = create_test_product(&db, "Latte", 450).await?;

        let result = checkout(
            &db,
            user.id,
            &[CheckoutItem::product(latte.id, 1), CheckoutItem::product(9999, 1)],
        )
        .await;
        assert!(matches!(result.unwrap_err(), Error::ProductNotFound { product_id: 9999 }));

        assert_eq!(Order::find().count(&db).await?, 0);
        assert_eq!(OrderItem::find().count(&db).await?, 0);

        Ok(())
    }

    #[tokio::test]
    async fn test_checkout_unknown_extra_rolls_back() -> Result<()> {
        let (db, user) = setup_with_user().await?;
        let latte = create_test_product(&db, "Latte", 450).await?;

        let result = checkout(
            &db,
            user.id,
            &[CheckoutItem::product(latte.id, 1).with_extras(vec![42])],
        )
        .await;
        assert!(matches!(result.unwrap_err(), Error::ExtraNotFound { extra_id: 42 }));

        assert_eq!(Order::find().count(&db).await?, 0);
        assert_eq!(OrderItem::find().count(&db).await?, 0);
        assert_eq!(OrderItemExtra::find().count(&db).await?, 0);

        Ok(())
    }

    #[tokio::test]
    async fn test_checkout_unknown_user() -> Result<()> {
        let db = setup_test_db().await?;
        let latte = create_test_product(&db, "Latte", 450).await?;

        let result = checkout(&db, 77, &[CheckoutItem::product(latte.id, 1)]).await;
        assert!(matches!(result.unwrap_err(), Error::UserNotFound { user_id: 77 }));
        assert_eq!(Order::find().count(&db).await?, 0);

        Ok(())
    }

    #[tokio::test]
    async fn test_order_codes_are_unique_per_order() -> Result<()> {
        let (db, user) = setup_with_user().await?;
        let latte = create_test_product(&db, "Latte", 450).await?;

        let first = checkout(&db, user.id, &[CheckoutItem::product(latte.id, 1)]).await?;
        let second = checkout(&db, user.id, &[CheckoutItem::product(latte.id, 1)]).await?;
        assert_ne!(first.order_code, second.order_code);
        assert_ne!(first.order_id, second.order_id);

        Ok(())
    }

    #[test]
    fn test_generate_order_code_format() {
        let code = generate_order_code();
        assert_eq!(code.len(), 12);
        assert!(code.starts_with("ORD-"));
        assert!(code[4..].chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_lowercase()));
    }

    #[test]
    fn test_item_request_conversion() {
        let raw: Vec<CheckoutItemRequest> = serde_json::from_str(
            r#"[
                {"type": "product", "product_id": 3, "quantity": 2, "extras": [1, 2]},
                {"type": "merchant", "merchant_id": 5, "quantity": 1}
            ]"#,
        )
        .unwrap();

        let items: Vec<CheckoutItem> = raw
            .into_iter()
            .enumerate()
            .map(|(index, item)| item.into_item(index))
            .collect::<Result<_>>()
            .unwrap();

        assert_eq!(items[0], CheckoutItem::product(3, 2).with_extras(vec![1, 2]));
        assert_eq!(items[1], CheckoutItem::merchant(5, 1));
    }

    #[test]
    fn test_item_request_rejects_malformed_lines() {
        let cases = [
            r#"{"product_id": 3, "quantity": 1}"#,
            r#"{"type": "product", "quantity": 1}"#,
            r#"{"type": "merchant", "product_id": 3, "quantity": 1}"#,
            r#"{"type": "product", "product_id": 3, "merchant_id": 4, "quantity": 1}"#,
            r#"{"type": "bundle", "product_id": 3, "quantity": 1}"#,
            r#"{"type": "product", "product_id": 3}"#,
            r#"{"type": "product", "product_id": 3, "quantity": 0}"#,
            r#"{"type": "merchant", "merchant_id": 3, "quantity": 1, "extras": [1]}"#,
        ];

        for case in cases {
            let raw: CheckoutItemRequest = serde_json::from_str(case).unwrap();
            let result = raw.into_item(2);
            assert!(
                matches!(result, Err(Error::InvalidItem { index: 2, .. })),
                "expected InvalidItem for {case}"
            );
        }
    }
}
