use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::json;
use sqlx::types::Json;
use sqlx::{Row, SqlitePool};

pub mod order;
pub mod status;

pub use order::{
    BuyerSnapshot, LineItem, Order, OrderDraft, PaymentInfo, ShippingInfo, ValidatedDraft,
};
pub use status::{OrderStatus, PaymentStatus};

use crate::error::{CheckoutError, StoreError, ValidationError};

/// Items-only projection of an order, used by completion to adjust the
/// inventory ledger without loading the whole document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemQuantity {
    pub product_id: String,
    pub quantity: u32,
}

#[derive(Debug, sqlx::FromRow)]
struct OrderRow {
    id: String,
    buyer_id: String,
    buyer_email: String,
    buyer_name: String,
    buyer_avatar: Option<String>,
    currency: String,
    shipping_info: Json<ShippingInfo>,
    price_of_items: f64,
    tax_fee: f64,
    shipping_fee: f64,
    total_to_pay: f64,
    order_status: String,
    payment_status: String,
    payment_id: String,
    payment_client_secret: String,
    payment_method: String,
    created_at: DateTime<Utc>,
}

#[derive(Debug, sqlx::FromRow)]
struct ItemRow {
    product_id: String,
    shop_id: String,
    name: String,
    unit_price: f64,
    quantity: i64,
}

#[derive(Debug, sqlx::FromRow)]
struct SummaryRow {
    id: String,
    created_at: DateTime<Utc>,
    order_status: String,
    payment_status: String,
}

fn row_to_item(row: ItemRow) -> Result<LineItem, StoreError> {
    let quantity =
        u32::try_from(row.quantity).map_err(|_| StoreError::InvalidQuantity(row.quantity))?;
    Ok(LineItem {
        product_id: row.product_id,
        shop_id: row.shop_id,
        name: row.name,
        unit_price: row.unit_price,
        quantity,
    })
}

/// Converts database row data to an Order instance with proper validation.
/// Centralizes the status parsing so corrupt rows surface as typed errors.
fn row_to_order(row: OrderRow, items_of_order: Vec<LineItem>) -> Result<Order, StoreError> {
    let order_status = row
        .order_status
        .parse()
        .map_err(StoreError::InvalidOrderStatus)?;
    let payment_status = row
        .payment_status
        .parse()
        .map_err(StoreError::InvalidPaymentStatus)?;

    Ok(Order {
        id: row.id,
        buyer: BuyerSnapshot {
            id: row.buyer_id,
            email: row.buyer_email,
            name: row.buyer_name,
            avatar: row.buyer_avatar,
        },
        currency: row.currency,
        shipping_info: row.shipping_info.0,
        items_of_order,
        price_of_items: row.price_of_items,
        tax_fee: row.tax_fee,
        shipping_fee: row.shipping_fee,
        total_to_pay: row.total_to_pay,
        order_status,
        payment_status,
        payment_info: PaymentInfo {
            id: row.payment_id,
            method: row.payment_method,
            client_secret: row.payment_client_secret,
        },
        created_at: row.created_at,
    })
}

async fn load_items(pool: &SqlitePool, order_id: &str) -> Result<Vec<LineItem>, StoreError> {
    let rows = sqlx::query_as::<_, ItemRow>(
        r"
        SELECT product_id, shop_id, name, unit_price, quantity
        FROM order_items
        WHERE order_id = ?1
        ORDER BY position ASC
        ",
    )
    .bind(order_id)
    .fetch_all(pool)
    .await?;

    rows.into_iter().map(row_to_item).collect()
}

async fn hydrate(pool: &SqlitePool, row: OrderRow) -> Result<Order, StoreError> {
    let items = load_items(pool, &row.id).await?;
    row_to_order(row, items)
}

impl Order {
    pub async fn insert(&self, pool: &SqlitePool) -> Result<(), StoreError> {
        let mut sql_tx = pool.begin().await?;
        self.save_within_transaction(&mut sql_tx).await?;
        sql_tx.commit().await?;
        Ok(())
    }

    pub async fn save_within_transaction(
        &self,
        sql_tx: &mut sqlx::Transaction<'_, sqlx::Sqlite>,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            r"
            INSERT INTO orders (
                id, buyer_id, buyer_email, buyer_name, buyer_avatar,
                currency, shipping_info,
                price_of_items, tax_fee, shipping_fee, total_to_pay,
                order_status, payment_status,
                payment_id, payment_client_secret, payment_method,
                created_at
            )
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17)
            ",
        )
        .bind(&self.id)
        .bind(&self.buyer.id)
        .bind(&self.buyer.email)
        .bind(&self.buyer.name)
        .bind(&self.buyer.avatar)
        .bind(&self.currency)
        .bind(Json(&self.shipping_info))
        .bind(self.price_of_items)
        .bind(self.tax_fee)
        .bind(self.shipping_fee)
        .bind(self.total_to_pay)
        .bind(self.order_status.as_str())
        .bind(self.payment_status.as_str())
        .bind(&self.payment_info.id)
        .bind(&self.payment_info.client_secret)
        .bind(&self.payment_info.method)
        .bind(self.created_at)
        .execute(&mut **sql_tx)
        .await?;

        for (position, item) in self.items_of_order.iter().enumerate() {
            #[allow(clippy::cast_possible_wrap)]
            let position = position as i64;
            sqlx::query(
                r"
                INSERT INTO order_items (order_id, position, product_id, shop_id, name, unit_price, quantity)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
                ",
            )
            .bind(&self.id)
            .bind(position)
            .bind(&item.product_id)
            .bind(&item.shop_id)
            .bind(&item.name)
            .bind(item.unit_price)
            .bind(i64::from(item.quantity))
            .execute(&mut **sql_tx)
            .await?;
        }

        Ok(())
    }

    /// Single atomic status transition, the durable commit point of the
    /// checkout flow. Guarded on the payment still being in flight, so a
    /// repeat call matches zero rows. Returns whether this call applied it.
    pub async fn mark_processing(
        pool: &SqlitePool,
        order_id: &str,
        payment_method: &str,
    ) -> Result<bool, StoreError> {
        let result = sqlx::query(
            r"
            UPDATE orders
            SET payment_status = ?1, order_status = ?2, payment_method = ?3
            WHERE id = ?4 AND payment_status = ?5
            ",
        )
        .bind(PaymentStatus::Succeeded.as_str())
        .bind(OrderStatus::Processing.as_str())
        .bind(payment_method)
        .bind(order_id)
        .bind(PaymentStatus::Processing.as_str())
        .execute(pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    pub async fn find_by_id(pool: &SqlitePool, order_id: &str) -> Result<Option<Self>, StoreError> {
        let row = sqlx::query_as::<_, OrderRow>("SELECT * FROM orders WHERE id = ?1")
            .bind(order_id)
            .fetch_optional(pool)
            .await?;

        match row {
            Some(row) => Ok(Some(hydrate(pool, row).await?)),
            None => Ok(None),
        }
    }

    pub async fn find_by_payment_id(
        pool: &SqlitePool,
        payment_id: &str,
    ) -> Result<Option<Self>, StoreError> {
        let row = sqlx::query_as::<_, OrderRow>("SELECT * FROM orders WHERE payment_id = ?1")
            .bind(payment_id)
            .fetch_optional(pool)
            .await?;

        match row {
            Some(row) => Ok(Some(hydrate(pool, row).await?)),
            None => Ok(None),
        }
    }

    /// Buyer-facing lookup by payment id or order id. The payment id takes
    /// precedence when both are supplied; with neither the request is
    /// invalid rather than not-found.
    pub async fn find_by_selector(
        pool: &SqlitePool,
        payment_id: Option<&str>,
        order_id: Option<&str>,
    ) -> Result<Self, CheckoutError> {
        let payment_id = payment_id.map(str::trim).filter(|s| !s.is_empty());
        let order_id = order_id.map(str::trim).filter(|s| !s.is_empty());

        let found = if let Some(payment_id) = payment_id {
            Self::find_by_payment_id(pool, payment_id).await?
        } else if let Some(order_id) = order_id {
            Self::find_by_id(pool, order_id).await?
        } else {
            return Err(ValidationError::MissingSelector.into());
        };

        found.ok_or_else(|| {
            let selector = payment_id.or(order_id).unwrap_or_default();
            StoreError::OrderNotFound(selector.to_string()).into()
        })
    }

    /// Every order containing at least one line item for the product,
    /// oldest first. Tenant-unrestricted; callers gate access.
    pub async fn find_with_product(
        pool: &SqlitePool,
        product_id: &str,
    ) -> Result<Vec<Self>, StoreError> {
        let rows = sqlx::query_as::<_, OrderRow>(
            r"
            SELECT o.* FROM orders o
            WHERE EXISTS (
                SELECT 1 FROM order_items i
                WHERE i.order_id = o.id AND i.product_id = ?1
            )
            ORDER BY o.created_at ASC, o.id ASC
            ",
        )
        .bind(product_id)
        .fetch_all(pool)
        .await?;

        let mut orders = Vec::with_capacity(rows.len());
        for row in rows {
            orders.push(hydrate(pool, row).await?);
        }
        Ok(orders)
    }

    /// The complete set of orders containing at least one line item for the
    /// shop, insertion order, optionally narrowed by fulfillment status.
    /// The view layer projects and paginates over this full set; slicing
    /// here would corrupt page boundaries.
    pub async fn find_with_shop(
        pool: &SqlitePool,
        shop_id: &str,
        order_status: Option<OrderStatus>,
    ) -> Result<Vec<Self>, StoreError> {
        let rows = if let Some(status) = order_status {
            sqlx::query_as::<_, OrderRow>(
                r"
                SELECT o.* FROM orders o
                WHERE o.order_status = ?2
                AND EXISTS (
                    SELECT 1 FROM order_items i
                    WHERE i.order_id = o.id AND i.shop_id = ?1
                )
                ORDER BY o.created_at ASC, o.id ASC
                ",
            )
            .bind(shop_id)
            .bind(status.as_str())
            .fetch_all(pool)
            .await?
        } else {
            sqlx::query_as::<_, OrderRow>(
                r"
                SELECT o.* FROM orders o
                WHERE EXISTS (
                    SELECT 1 FROM order_items i
                    WHERE i.order_id = o.id AND i.shop_id = ?1
                )
                ORDER BY o.created_at ASC, o.id ASC
                ",
            )
            .bind(shop_id)
            .fetch_all(pool)
            .await?
        };

        let mut orders = Vec::with_capacity(rows.len());
        for row in rows {
            orders.push(hydrate(pool, row).await?);
        }
        Ok(orders)
    }

    /// Items-only projection for completion. `None` when the order row
    /// itself is absent; an existing order with no items yields an empty
    /// list.
    pub async fn load_item_quantities(
        pool: &SqlitePool,
        order_id: &str,
    ) -> Result<Option<Vec<ItemQuantity>>, StoreError> {
        let order_exists =
            sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM orders WHERE id = ?1")
                .bind(order_id)
                .fetch_one(pool)
                .await?;
        if order_exists == 0 {
            return Ok(None);
        }

        let rows = sqlx::query_as::<_, (String, i64)>(
            r"
            SELECT product_id, quantity
            FROM order_items
            WHERE order_id = ?1
            ORDER BY position ASC
            ",
        )
        .bind(order_id)
        .fetch_all(pool)
        .await?;

        let items = rows
            .into_iter()
            .map(|(product_id, quantity)| {
                let quantity =
                    u32::try_from(quantity).map_err(|_| StoreError::InvalidQuantity(quantity))?;
                Ok(ItemQuantity {
                    product_id,
                    quantity,
                })
            })
            .collect::<Result<Vec<_>, StoreError>>()?;

        Ok(Some(items))
    }

    #[cfg(test)]
    pub async fn db_count(pool: &SqlitePool) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM orders")
            .fetch_one(pool)
            .await
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortField {
    #[default]
    CreatedAt,
    TotalToPay,
}

impl SortField {
    pub fn parse(s: &str) -> Result<Self, ValidationError> {
        match s {
            "created_at" => Ok(Self::CreatedAt),
            "total_to_pay" => Ok(Self::TotalToPay),
            _ => Err(ValidationError::UnknownSortField(s.to_string())),
        }
    }

    const fn column(self) -> &'static str {
        match self {
            Self::CreatedAt => "created_at",
            Self::TotalToPay => "total_to_pay",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortDirection {
    Ascending,
    #[default]
    Descending,
}

impl SortDirection {
    pub fn parse(s: &str) -> Result<Self, ValidationError> {
        match s {
            "asc" => Ok(Self::Ascending),
            "desc" => Ok(Self::Descending),
            _ => Err(ValidationError::UnknownSortDirection(s.to_string())),
        }
    }

    const fn keyword(self) -> &'static str {
        match self {
            Self::Ascending => "ASC",
            Self::Descending => "DESC",
        }
    }
}

/// Sort order for buyer listings, defaulting to newest first.
#[derive(Debug, Clone, Copy, Default)]
pub struct SortSpec {
    pub field: SortField,
    pub direction: SortDirection,
}

impl SortSpec {
    /// ORDER BY clause built from allow-listed identifiers only; user input
    /// never reaches the SQL text.
    fn order_by_clause(self) -> String {
        format!(
            "{} {}, id ASC",
            self.field.column(),
            self.direction.keyword()
        )
    }
}

/// One page of a buyer's order history: trimmed summaries plus the total
/// match count for the pager.
#[derive(Debug, Clone, Serialize)]
pub struct OrderSummary {
    pub id: String,
    pub created_at: DateTime<Utc>,
    pub order_status: OrderStatus,
    pub payment_status: PaymentStatus,
    pub items_of_order: Vec<LineItem>,
}

#[derive(Debug)]
pub struct BuyerOrdersPage {
    pub orders: Vec<OrderSummary>,
    pub count_orders: i64,
}

/// Number of line items included in each history summary.
const SUMMARY_ITEM_PREVIEW: i64 = 2;

pub async fn list_for_buyer(
    pool: &SqlitePool,
    buyer_id: &str,
    page: i64,
    limit: i64,
    payment_status: Option<PaymentStatus>,
    sort: SortSpec,
) -> Result<BuyerOrdersPage, CheckoutError> {
    if page < 1 || limit < 1 {
        return Err(ValidationError::InvalidPagination.into());
    }
    let offset = page
        .checked_sub(1)
        .and_then(|prior_pages| prior_pages.checked_mul(limit))
        .ok_or(ValidationError::InvalidPagination)?;

    let (count_orders, rows) = if let Some(status) = payment_status {
        let count = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM orders WHERE buyer_id = ?1 AND payment_status = ?2",
        )
        .bind(buyer_id)
        .bind(status.as_str())
        .fetch_one(pool)
        .await?;

        let rows = sqlx::query_as::<_, SummaryRow>(&format!(
            r"
            SELECT id, created_at, order_status, payment_status
            FROM orders
            WHERE buyer_id = ?1 AND payment_status = ?2
            ORDER BY {}
            LIMIT ?3 OFFSET ?4
            ",
            sort.order_by_clause()
        ))
        .bind(buyer_id)
        .bind(status.as_str())
        .bind(limit)
        .bind(offset)
        .fetch_all(pool)
        .await?;

        (count, rows)
    } else {
        let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM orders WHERE buyer_id = ?1")
            .bind(buyer_id)
            .fetch_one(pool)
            .await?;

        let rows = sqlx::query_as::<_, SummaryRow>(&format!(
            r"
            SELECT id, created_at, order_status, payment_status
            FROM orders
            WHERE buyer_id = ?1
            ORDER BY {}
            LIMIT ?2 OFFSET ?3
            ",
            sort.order_by_clause()
        ))
        .bind(buyer_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(pool)
        .await?;

        (count, rows)
    };

    let mut orders = Vec::with_capacity(rows.len());
    for row in rows {
        let item_rows = sqlx::query_as::<_, ItemRow>(
            r"
            SELECT product_id, shop_id, name, unit_price, quantity
            FROM order_items
            WHERE order_id = ?1
            ORDER BY position ASC
            LIMIT ?2
            ",
        )
        .bind(&row.id)
        .bind(SUMMARY_ITEM_PREVIEW)
        .fetch_all(pool)
        .await?;

        let items_of_order = item_rows
            .into_iter()
            .map(row_to_item)
            .collect::<Result<Vec<_>, _>>()?;

        orders.push(OrderSummary {
            id: row.id,
            created_at: row.created_at,
            order_status: row
                .order_status
                .parse()
                .map_err(StoreError::InvalidOrderStatus)?,
            payment_status: row
                .payment_status
                .parse()
                .map_err(StoreError::InvalidPaymentStatus)?,
            items_of_order,
        });
    }

    Ok(BuyerOrdersPage {
        orders,
        count_orders,
    })
}

#[derive(Debug, Clone, Copy)]
enum FieldKind {
    Text,
    Real,
    Timestamp,
}

struct AdminField {
    external: &'static str,
    column: &'static str,
    kind: FieldKind,
}

/// Admin report columns. External names follow the storefront admin UI;
/// anything not listed here is rejected instead of passed through.
const ADMIN_FIELDS: &[AdminField] = &[
    AdminField {
        external: "id",
        column: "id",
        kind: FieldKind::Text,
    },
    AdminField {
        external: "createdAt",
        column: "created_at",
        kind: FieldKind::Timestamp,
    },
    AdminField {
        external: "orderStatus",
        column: "order_status",
        kind: FieldKind::Text,
    },
    AdminField {
        external: "paymentStatus",
        column: "payment_status",
        kind: FieldKind::Text,
    },
    AdminField {
        external: "totalToPay",
        column: "total_to_pay",
        kind: FieldKind::Real,
    },
    AdminField {
        external: "paymentId",
        column: "payment_id",
        kind: FieldKind::Text,
    },
    AdminField {
        external: "buyerEmail",
        column: "buyer_email",
        kind: FieldKind::Text,
    },
    AdminField {
        external: "currency",
        column: "currency",
        kind: FieldKind::Text,
    },
];

/// Arbitrary-field admin report over all orders, restricted to the
/// allow-list above. Values are keyed by their external names.
pub async fn admin_projection(
    pool: &SqlitePool,
    fields: &[&str],
) -> Result<Vec<serde_json::Value>, CheckoutError> {
    if fields.is_empty() {
        return Err(ValidationError::MissingField("fields").into());
    }

    let mut selected = Vec::with_capacity(fields.len());
    for name in fields {
        let field = ADMIN_FIELDS
            .iter()
            .find(|field| field.external == *name)
            .ok_or_else(|| ValidationError::UnknownProjectionField((*name).to_string()))?;
        selected.push(field);
    }

    let columns = selected
        .iter()
        .map(|field| field.column)
        .collect::<Vec<_>>()
        .join(", ");
    let rows = sqlx::query(&format!(
        "SELECT {columns} FROM orders ORDER BY created_at ASC, id ASC"
    ))
    .fetch_all(pool)
    .await?;

    let mut list = Vec::with_capacity(rows.len());
    for row in rows {
        let mut object = serde_json::Map::new();
        for field in &selected {
            let value = match field.kind {
                FieldKind::Text => json!(row.try_get::<String, _>(field.column)?),
                FieldKind::Real => json!(row.try_get::<f64, _>(field.column)?),
                FieldKind::Timestamp => {
                    json!(row.try_get::<DateTime<Utc>, _>(field.column)?.to_rfc3339())
                }
            };
            object.insert(field.external.to_string(), value);
        }
        list.push(serde_json::Value::Object(object));
    }

    Ok(list)
}
