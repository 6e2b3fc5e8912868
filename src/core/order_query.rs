//! Read-only order views.
//!
//! `items_subtotal` and `extras_subtotal` are recomputed from the snapshot rows and
//! are therefore pre-discount; `total_price` on the order is the binding charge.
//! Item views for many orders are loaded in a fixed number of batched queries.

use crate::{
    core::completion::POINTS_PER_CURRENCY_UNIT,
    entities::{
        Extra, ItemKind, Merchant, Order, OrderItem, OrderItemExtra, Product, User, merchant,
        order, order_item, order_item_extra, product, user,
    },
    errors::{Error, Result},
};
use sea_orm::{
    QueryOrder,
    prelude::*,
    sea_query::{Expr, Func, LikeExpr},
};
use serde::Serialize;
use std::collections::HashMap;

/// How a caller identifies an order
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OrderLookup {
    Id(i64),
    /// Exact public order code
    Code(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExtraView {
    pub extra_id: i64,
    pub name: Option<String>,
    /// Snapshot price in cents
    pub extra_price: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OrderItemView {
    pub order_item_id: i64,
    pub item_type: ItemKind,
    pub catalog_id: Option<i64>,
    /// Current product or merchant name
    pub name: Option<String>,
    pub quantity: i64,
    pub unit_price: i64,
    pub total_price: i64,
    pub extras: Vec<ExtraView>,
}

/// Customer-facing order view
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OrderView {
    pub order: order::Model,
    pub items: Vec<OrderItemView>,
    pub items_subtotal: i64,
    pub extras_subtotal: i64,
    pub user_points: i64,
    pub can_redeem_points: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CustomerSummary {
    pub user_id: i64,
    pub user_name: String,
    pub user_email: String,
    pub user_number: Option<String>,
}

impl From<&user::Model> for CustomerSummary {
    fn from(user: &user::Model) -> Self {
        Self {
            user_id: user.id,
            user_name: user.user_name.clone(),
            user_email: user.user_email.clone(),
            user_number: user.user_number.clone(),
        }
    }
}

/// Administrative order view with the customer's contact details
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OrderDetails {
    pub order: order::Model,
    pub customer: Option<CustomerSummary>,
    pub items: Vec<OrderItemView>,
    pub items_subtotal: i64,
    pub extras_subtotal: i64,
}

/// True when `points` cover `total_cents` at the points-per-currency-unit rate.
#[must_use]
pub fn can_redeem_points(points: i64, total_cents: i64) -> bool {
    i128::from(points) * 100 >= i128::from(total_cents) * i128::from(POINTS_PER_CURRENCY_UNIT)
}

fn subtotals(items: &[OrderItemView]) -> (i64, i64) {
    items.iter().fold((0, 0), |(lines, extras), item| {
        (
            lines + item.total_price,
            extras + item.extras.iter().map(|e| e.extra_price).sum::<i64>(),
        )
    })
}

async fn find_order(db: &DatabaseConnection, lookup: &OrderLookup) -> Result<order::Model> {
    let found = match lookup {
        OrderLookup::Id(id) => Order::find_by_id(*id).one(db).await?,
        OrderLookup::Code(code) => {
            Order::find()
                .filter(order::Column::OrderCode.eq(code.trim()))
                .one(db)
                .await?
        }
    };

    found.ok_or_else(|| Error::OrderNotFound {
        order: match lookup {
            OrderLookup::Id(id) => id.to_string(),
            OrderLookup::Code(code) => code.clone(),
        },
    })
}

/// Loads the item views of every order in `order_ids`, keyed by order id.
async fn load_items(
    db: &DatabaseConnection,
    order_ids: &[i64],
) -> Result<HashMap<i64, Vec<OrderItemView>>> {
    if order_ids.is_empty() {
        return Ok(HashMap::new());
    }

    let lines = OrderItem::find()
        .filter(order_item::Column::OrderId.is_in(order_ids.iter().copied()))
        .order_by_asc(order_item::Column::Id)
        .all(db)
        .await?;

    let product_ids: Vec<i64> = lines.iter().filter_map(|l| l.product_id).collect();
    let merchant_ids: Vec<i64> = lines.iter().filter_map(|l| l.merchant_id).collect();
    let line_ids: Vec<i64> = lines.iter().map(|l| l.id).collect();

    let product_names: HashMap<i64, String> = Product::find()
        .filter(product::Column::Id.is_in(product_ids))
        .all(db)
        .await?
        .into_iter()
        .map(|p| (p.id, p.name))
        .collect();
    let merchant_names: HashMap<i64, String> = Merchant::find()
        .filter(merchant::Column::Id.is_in(merchant_ids))
        .all(db)
        .await?
        .into_iter()
        .map(|m| (m.id, m.name))
        .collect();

    let mut extras_by_line: HashMap<i64, Vec<ExtraView>> = HashMap::new();
    let extras = OrderItemExtra::find()
        .filter(order_item_extra::Column::OrderItemId.is_in(line_ids))
        .order_by_asc(order_item_extra::Column::Id)
        .find_also_related(Extra)
        .all(db)
        .await?;
    for (row, extra) in extras {
        extras_by_line.entry(row.order_item_id).or_default().push(ExtraView {
            extra_id: row.extra_id,
            name: extra.map(|e| e.name),
            extra_price: row.extra_price,
        });
    }

    let mut by_order: HashMap<i64, Vec<OrderItemView>> = HashMap::new();
    for line in lines {
        let name = match line.item_type {
            ItemKind::Product => line.product_id.and_then(|id| product_names.get(&id)),
            ItemKind::Merchant => line.merchant_id.and_then(|id| merchant_names.get(&id)),
        }
        .cloned();
        let view = OrderItemView {
            order_item_id: line.id,
            item_type: line.item_type,
            catalog_id: line.catalog_id(),
            name,
            quantity: line.quantity,
            unit_price: line.product_price,
            total_price: line.total_price,
            extras: extras_by_line.remove(&line.id).unwrap_or_default(),
        };
        by_order.entry(line.order_id).or_default().push(view);
    }

    Ok(by_order)
}

async fn build_views(db: &DatabaseConnection, orders: Vec<order::Model>) -> Result<Vec<OrderView>> {
    let order_ids: Vec<i64> = orders.iter().map(|o| o.id).collect();
    let mut items = load_items(db, &order_ids).await?;

    let user_ids: Vec<i64> = orders.iter().map(|o| o.user_id).collect();
    let points: HashMap<i64, i64> = User::find()
        .filter(user::Column::Id.is_in(user_ids))
        .all(db)
        .await?
        .into_iter()
        .map(|u| (u.id, u.points))
        .collect();

    Ok(orders
        .into_iter()
        .map(|order| {
            let items = items.remove(&order.id).unwrap_or_default();
            let (items_subtotal, extras_subtotal) = subtotals(&items);
            let user_points = points.get(&order.user_id).copied().unwrap_or(0);
            OrderView {
                can_redeem_points: can_redeem_points(user_points, order.total_price),
                order,
                items,
                items_subtotal,
                extras_subtotal,
                user_points,
            }
        })
        .collect())
}

async fn build_details(
    db: &DatabaseConnection,
    orders: Vec<order::Model>,
) -> Result<Vec<OrderDetails>> {
    let order_ids: Vec<i64> = orders.iter().map(|o| o.id).collect();
    let mut items = load_items(db, &order_ids).await?;

    let user_ids: Vec<i64> = orders.iter().map(|o| o.user_id).collect();
    let customers: HashMap<i64, CustomerSummary> = User::find()
        .filter(user::Column::Id.is_in(user_ids))
        .all(db)
        .await?
        .iter()
        .map(|u| (u.id, CustomerSummary::from(u)))
        .collect();

    Ok(orders
        .into_iter()
        .map(|order| {
            let items = items.remove(&order.id).unwrap_or_default();
            let (items_subtotal, extras_subtotal) = subtotals(&items);
            OrderDetails {
                customer: customers.get(&order.user_id).cloned(),
                order,
                items,
                items_subtotal,
                extras_subtotal,
            }
        })
        .collect())
}

/// Fetches one order with its lines, extras and the owner's point balance.
///
/// This function is used when a customer views their receipt. The lookup accepts either
/// the numeric id or the `ORD-` code printed on the receipt.
///
/// # Errors
/// Returns `OrderNotFound` if no order matches.
pub async fn get_order(db: &DatabaseConnection, lookup: OrderLookup) -> Result<OrderView> {
    let order = find_order(db, &lookup).await?;
    build_views(db, vec![order])
        .await?
        .pop()
        .ok_or_else(|| Error::OrderNotFound {
            order: format!("{lookup:?}"),
        })
}

/// Fetches one order with its lines and the customer's contact summary.
///
/// This function is used when staff look up an order on the admin screen.
///
/// # Errors
/// Returns `OrderNotFound` if no order matches.
pub async fn get_order_details(db: &DatabaseConnection, lookup: OrderLookup) -> Result<OrderDetails> {
    let order = find_order(db, &lookup).await?;
    build_details(db, vec![order])
        .await?
        .pop()
        .ok_or_else(|| Error::OrderNotFound {
            order: format!("{lookup:?}"),
        })
}

fn escape_like(term: &str) -> String {
    let mut escaped = String::with_capacity(term.len());
    for c in term.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// Case-insensitive substring search over order codes, newest first.
///
/// # Errors
/// Returns `InvalidInput` if the term is blank.
pub async fn search_orders_by_code(db: &DatabaseConnection, term: &str) -> Result<Vec<OrderView>> {
    let term = term.trim();
    if term.is_empty() {
        return Err(Error::InvalidInput {
            message: "Search term cannot be empty".to_string(),
        });
    }

    let pattern = format!("%{}%", escape_like(&term.to_uppercase()));
    let orders = Order::find()
        .filter(
            Expr::expr(Func::upper(Expr::col(order::Column::OrderCode)))
                .like(LikeExpr::new(pattern).escape('\\')),
        )
        .order_by_desc(order::Column::CreatedAt)
        .order_by_desc(order::Column::Id)
        .all(db)
        .await?;

    build_views(db, orders).await
}

/// Every order placed by `user_id`, newest first.
pub async fn list_orders_for_user(db: &DatabaseConnection, user_id: i64) -> Result<Vec<OrderView>> {
    let orders = Order::find()
        .filter(order::Column::UserId.eq(user_id))
        .order_by_desc(order::Column::CreatedAt)
        .order_by_desc(order::Column::Id)
        .all(db)
        .await?;

    build_views(db, orders).await
}

/// Every order in the system with customer details, newest first.
///
/// # Errors
/// Returns an error if a database query fails.
pub async fn list_orders_for_admin(db: &DatabaseConnection) -> Result<Vec<OrderDetails>> {
    let orders = Order::find()
        .order_by_desc(order::Column::CreatedAt)
        .order_by_desc(order::Column::Id)
        .all(db)
        .await?;

    build_details(db, orders).await
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::core::checkout::{CheckoutItem, checkout};
    use crate::core::completion::{DiscountRequest, complete_order};
    use crate::test_utils::*;
    use sea_orm::{DatabaseBackend, MockDatabase};

    #[test]
    fn test_can_redeem_points() {
        assert!(can_redeem_points(1000, 10000));
        assert!(!can_redeem_points(999, 10000));
        assert!(can_redeem_points(0, 0));
    }

    #[test]
    fn test_escape_like() {
        assert_eq!(escape_like("ORD-1A"), "ORD-1A");
        assert_eq!(escape_like("50%_off\\"), "50\\%\\_off\\\\");
    }

    #[tokio::test]
    async fn test_get_order_not_found() -> Result<()> {
        let db = MockDatabase::new(DatabaseBackend::Sqlite)
            .append_query_results([Vec::<order::Model>::new()])
            .append_query_results([Vec::<order::Model>::new()])
            .into_connection();

        let result = get_order(&db, OrderLookup::Id(5)).await;
        assert!(matches!(result.unwrap_err(), Error::OrderNotFound { order } if order == "5"));

        let result = get_order(&db, OrderLookup::Code("ORD-NOPE".into())).await;
        assert!(matches!(result.unwrap_err(), Error::OrderNotFound { order } if order == "ORD-NOPE"));

        Ok(())
    }

    #[tokio::test]
    async fn test_get_order_view() -> Result<()> {
        let (db, user) = setup_with_user().await?;
        let burger = create_test_product(&db, "Burger", 1000).await?;
        let wrap = create_test_merchant(&db, "Gift Wrap", 200).await?;
        let cheese = create_test_extra(&db, "Cheese", 150).await?;

        let receipt = checkout(
            &db,
            user.id,
            &[
                CheckoutItem::product(burger.id, 2).with_extras(vec![cheese.id]),
                CheckoutItem::merchant(wrap.id, 1),
            ],
        )
        .await?;

        let view = get_order(&db, OrderLookup::Code(receipt.order_code.clone())).await?;
        assert_eq!(view.order.id, receipt.order_id);
        assert_eq!(view.order.total_price, 2350);
        assert_eq!(view.items_subtotal, 2200);
        assert_eq!(view.extras_subtotal, 150);
        assert_eq!(view.user_points, 0);
        assert!(!view.can_redeem_points);

        assert_eq!(view.items.len(), 2);
        let first = &view.items[0];
        assert_eq!(first.name.as_deref(), Some("Burger"));
        assert_eq!(first.item_type, ItemKind::Product);
        assert_eq!(first.unit_price, 1000);
        assert_eq!(first.extras.len(), 1);
        assert_eq!(first.extras[0].name.as_deref(), Some("Cheese"));
        let second = &view.items[1];
        assert_eq!(second.name.as_deref(), Some("Gift Wrap"));
        assert_eq!(second.catalog_id, Some(wrap.id));
        assert!(second.extras.is_empty());

        Ok(())
    }

    #[tokio::test]
    async fn test_subtotals_stay_pre_discount() -> Result<()> {
        let (db, user) = setup_with_user().await?;
        let product = create_test_product(&db, "Blender", 10000).await?;
        let receipt = checkout(&db, user.id, &[CheckoutItem::product(product.id, 1)]).await?;
        complete_order(&db, receipt.order_id, Some(DiscountRequest::Percentage(20.0))).await?;

        let view = get_order(&db, OrderLookup::Id(receipt.order_id)).await?;
        assert_eq!(view.order.total_price, 8000);
        assert_eq!(view.items_subtotal, 10000);
        assert_eq!(view.user_points, 1000);
        assert!(view.can_redeem_points);

        Ok(())
    }

    #[tokio::test]
    async fn test_get_order_details_includes_customer() -> Result<()> {
        let (db, user) = setup_with_user().await?;
        let product = create_test_product(&db, "Tea", 300).await?;
        let receipt = checkout(&db, user.id, &[CheckoutItem::product(product.id, 3)]).await?;

        let details = get_order_details(&db, OrderLookup::Id(receipt.order_id)).await?;
        let customer = details.customer.unwrap();
        assert_eq!(customer.user_id, user.id);
        assert_eq!(customer.user_email, user.user_email);
        assert_eq!(details.items_subtotal, 900);
        assert_eq!(details.items.len(), 1);

        Ok(())
    }

    #[tokio::test]
    async fn test_search_orders_by_code() -> Result<()> {
        let (db, user) = setup_with_user().await?;
        let product = create_test_product(&db, "Tea", 300).await?;
        let receipt = checkout(&db, user.id, &[CheckoutItem::product(product.id, 1)]).await?;
        checkout(&db, user.id, &[CheckoutItem::product(product.id, 2)]).await?;

        let fragment = receipt.order_code[4..10].to_lowercase();
        let found = search_orders_by_code(&db, &format!("  {fragment} ")).await?;
        assert!(found.iter().any(|v| v.order.id == receipt.order_id));
        assert!(found.iter().all(|v| v.order.order_code.contains(&fragment.to_uppercase())));

        let all = search_orders_by_code(&db, "ord-").await?;
        assert_eq!(all.len(), 2);

        let none = search_orders_by_code(&db, "%").await?;
        assert!(none.is_empty());

        let result = search_orders_by_code(&db, "   ").await;
        assert!(matches!(result.unwrap_err(), Error::InvalidInput { .. }));

        Ok(())
    }

    #[tokio::test]
    async fn test_list_orders_newest_first() -> Result<()> {
        let (db, user) = setup_with_user().await?;
        let other = create_test_user(&db, "second@example.com").await?;
        let product = create_test_product(&db, "Tea", 300).await?;

        let first = checkout(&db, user.id, &[CheckoutItem::product(product.id, 1)]).await?;
        let second = checkout(&db, user.id, &[CheckoutItem::product(product.id, 2)]).await?;
        let foreign = checkout(&db, other.id, &[CheckoutItem::product(product.id, 1)]).await?;

        let mine = list_orders_for_user(&db, user.id).await?;
        let ids: Vec<i64> = mine.iter().map(|v| v.order.id).collect();
        assert_eq!(ids, vec![second.order_id, first.order_id]);
        assert_eq!(mine[0].items_subtotal, 600);

        let admin = list_orders_for_admin(&db).await?;
        assert_eq!(admin.len(), 3);
        assert_eq!(admin[0].order.id, foreign.order_id);
        assert_eq!(admin[0].customer.as_ref().unwrap().user_id, other.id);

        assert!(list_orders_for_user(&db, 999).await?.is_empty());

        Ok(())
    }
}
