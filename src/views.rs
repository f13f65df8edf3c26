//! Shop-scoped order projections.
//!
//! A single order aggregates line items from multiple shops; shop-facing
//! reads must only ever see the caller's own items. Every read here goes
//! through [`ShopOrderView::project`], and listing materializes the
//! complete filtered set before slicing so page boundaries stay correct.

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::SqlitePool;

use crate::error::{CheckoutError, StoreError, ValidationError};
use crate::store::{BuyerSnapshot, LineItem, Order, OrderStatus, PaymentStatus, ShippingInfo};

/// Payment linkage visible to shop operators. The buyer's client secret is
/// deliberately absent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ShopPayment {
    pub id: String,
    pub method: String,
}

/// One order as a shop operator is allowed to see it: only that shop's
/// line items, with the order-wide aggregates stripped out.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ShopOrderView {
    pub id: String,
    pub created_at: DateTime<Utc>,
    pub order_status: OrderStatus,
    pub payment_status: PaymentStatus,
    pub buyer: BuyerSnapshot,
    pub shipping_info: ShippingInfo,
    pub tax_fee: f64,
    pub shipping_fee: f64,
    pub payment: ShopPayment,
    pub items: Vec<LineItem>,
}

impl ShopOrderView {
    fn project(order: Order, shop_id: &str) -> Self {
        let items = order
            .items_of_order
            .into_iter()
            .filter(|item| item.shop_id == shop_id)
            .collect();

        Self {
            id: order.id,
            created_at: order.created_at,
            order_status: order.order_status,
            payment_status: order.payment_status,
            buyer: order.buyer,
            shipping_info: order.shipping_info,
            tax_fee: order.tax_fee,
            shipping_fee: order.shipping_fee,
            payment: ShopPayment {
                id: order.payment_info.id,
                method: order.payment_info.method,
            },
            items,
        }
    }
}

/// Paginated shop view over every order containing at least one of the
/// shop's line items.
///
/// Filter, project, then paginate: the slice is taken over the full
/// projected set, never pushed down into the query.
pub async fn list_for_shop(
    pool: &SqlitePool,
    shop_id: &str,
    page: i64,
    limit: i64,
    order_status: Option<OrderStatus>,
) -> Result<Vec<ShopOrderView>, CheckoutError> {
    if page < 1 || limit < 1 {
        return Err(ValidationError::InvalidPagination.into());
    }
    let offset = page
        .checked_sub(1)
        .and_then(|prior_pages| prior_pages.checked_mul(limit))
        .and_then(|offset| usize::try_from(offset).ok())
        .ok_or(ValidationError::InvalidPagination)?;
    let limit = usize::try_from(limit).map_err(|_| ValidationError::InvalidPagination)?;

    let matching = Order::find_with_shop(pool, shop_id, order_status).await?;

    Ok(matching
        .into_iter()
        .map(|order| ShopOrderView::project(order, shop_id))
        .skip(offset)
        .take(limit)
        .collect())
}

/// Single-order shop view. Not-found only when the order itself is absent;
/// an order without any of this shop's items projects to an empty items
/// list rather than a miss.
pub async fn get_one_for_shop(
    pool: &SqlitePool,
    shop_id: &str,
    order_id: &str,
) -> Result<ShopOrderView, CheckoutError> {
    let order = Order::find_by_id(pool, order_id)
        .await?
        .ok_or_else(|| StoreError::OrderNotFound(order_id.to_string()))?;

    Ok(ShopOrderView::project(order, shop_id))
}
