//! Per-product stock and sales counters, mutated by order completion.
//!
//! The ledger is adjusted as one batched multi-item write: every item gets
//! its own guarded UPDATE inside a single transaction, so partial
//! application is visible and attributable per item instead of hiding
//! behind read-modify-write races. Applied items commit even when siblings
//! fail; the order's status transition is never rolled back from here.

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::SqlitePool;
use tracing::info;

use crate::store::ItemQuantity;

/// Why a single item of a sale batch could not be applied.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum ItemFailureKind {
    /// The guarded decrement would have driven stock below zero.
    InsufficientStock { available: i64, requested: i64 },
    /// No ledger row exists for the product.
    NotTracked,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ItemFailure {
    pub product_id: String,
    #[serde(flatten)]
    pub kind: ItemFailureKind,
}

/// Batched stock update partially or fully failed after the order status
/// was already committed. Surfaced to operators for reconciliation, never
/// rolled back automatically: the payment has succeeded and must not be
/// invalidated by stock bookkeeping.
#[derive(Debug, Clone, thiserror::Error)]
#[error("Inventory adjustment left {} item(s) unapplied", .failures.len())]
pub struct InventoryAdjustmentError {
    pub failures: Vec<ItemFailure>,
}

/// Result of one sale batch: how many items were applied plus the
/// attributed failures for the rest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SaleOutcome {
    pub applied: u32,
    pub failures: Vec<ItemFailure>,
}

impl SaleOutcome {
    pub fn into_error(self) -> Option<InventoryAdjustmentError> {
        if self.failures.is_empty() {
            None
        } else {
            Some(InventoryAdjustmentError {
                failures: self.failures,
            })
        }
    }
}

/// One ledger row.
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct ProductInventory {
    pub product_id: String,
    pub stock: i64,
    pub sold_count: i64,
    pub sold_last_at: Option<DateTime<Utc>>,
}

/// Applies a completed sale to the ledger as one batched transaction.
///
/// Per item: decrement stock by quantity, increment the sold counter by
/// quantity and stamp the last-sale time, guarded on `stock >= quantity`.
/// An item whose guard matches no row is recorded as a failure without
/// aborting the batch.
pub async fn apply_sale(
    pool: &SqlitePool,
    items: &[ItemQuantity],
    sold_at: DateTime<Utc>,
) -> Result<SaleOutcome, sqlx::Error> {
    let mut sql_tx = pool.begin().await?;
    let mut applied = 0u32;
    let mut failures = Vec::new();

    for item in items {
        let quantity = i64::from(item.quantity);
        let result = sqlx::query(
            r"
            UPDATE product_inventory
            SET stock = stock - ?1,
                sold_count = sold_count + ?1,
                sold_last_at = ?2
            WHERE product_id = ?3 AND stock >= ?1
            ",
        )
        .bind(quantity)
        .bind(sold_at)
        .bind(&item.product_id)
        .execute(&mut *sql_tx)
        .await?;

        if result.rows_affected() > 0 {
            applied += 1;
            continue;
        }

        // Attribute the miss: a second read only happens for failed items
        let available =
            sqlx::query_scalar::<_, i64>("SELECT stock FROM product_inventory WHERE product_id = ?1")
                .bind(&item.product_id)
                .fetch_optional(&mut *sql_tx)
                .await?;

        let kind = available.map_or(ItemFailureKind::NotTracked, |available| {
            ItemFailureKind::InsufficientStock {
                available,
                requested: quantity,
            }
        });
        failures.push(ItemFailure {
            product_id: item.product_id.clone(),
            kind,
        });
    }

    sql_tx.commit().await?;

    info!(
        applied,
        failed = failures.len(),
        "Applied sale batch to inventory ledger"
    );

    Ok(SaleOutcome { applied, failures })
}

/// Compensating increment for reconciliation tooling. Returns whether a
/// ledger row was actually adjusted.
pub async fn restock(
    pool: &SqlitePool,
    product_id: &str,
    quantity: u32,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("UPDATE product_inventory SET stock = stock + ?1 WHERE product_id = ?2")
        .bind(i64::from(quantity))
        .bind(product_id)
        .execute(pool)
        .await?;

    Ok(result.rows_affected() > 0)
}

/// Upserts a ledger row for a product, keeping its sales counters intact.
pub async fn track_product(
    pool: &SqlitePool,
    product_id: &str,
    stock: i64,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r"
        INSERT INTO product_inventory (product_id, stock)
        VALUES (?1, ?2)
        ON CONFLICT(product_id) DO UPDATE SET stock = excluded.stock
        ",
    )
    .bind(product_id)
    .bind(stock)
    .execute(pool)
    .await?;

    Ok(())
}

pub async fn stock_of(
    pool: &SqlitePool,
    product_id: &str,
) -> Result<Option<ProductInventory>, sqlx::Error> {
    sqlx::query_as::<_, ProductInventory>(
        "SELECT product_id, stock, sold_count, sold_last_at FROM product_inventory WHERE product_id = ?1",
    )
    .bind(product_id)
    .fetch_optional(pool)
    .await
}
