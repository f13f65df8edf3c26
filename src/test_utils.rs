use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use sqlx::SqlitePool;
use std::sync::{Arc, Mutex};

use crate::notify::{NotifyError, Receipt, ReceiptNotifier};
use crate::store::{
    BuyerSnapshot, LineItem, Order, OrderDraft, OrderStatus, PaymentInfo, PaymentStatus,
    ShippingInfo,
};

/// Centralized test database setup to eliminate duplication across test
/// modules. Creates an in-memory SQLite database with all migrations
/// applied.
pub async fn setup_test_db() -> SqlitePool {
    let pool = SqlitePool::connect(":memory:").await.unwrap();
    sqlx::migrate!().run(&pool).await.unwrap();
    pool
}

/// Seeds an inventory ledger row for a product.
pub async fn seed_product(pool: &SqlitePool, product_id: &str, stock: i64) {
    crate::inventory::track_product(pool, product_id, stock).await.unwrap();
}

pub fn test_buyer() -> BuyerSnapshot {
    BuyerSnapshot {
        id: "buyer_1".to_string(),
        email: "buyer@example.com".to_string(),
        name: "A. Buyer".to_string(),
        avatar: None,
    }
}

pub fn test_shipping() -> ShippingInfo {
    ShippingInfo {
        address: "1 Main St".to_string(),
        city: "Hanoi".to_string(),
        country: "Vietnam".to_string(),
        state: None,
        zip_code: Some("100000".to_string()),
        phone_number: None,
    }
}

pub fn test_items() -> Vec<LineItem> {
    vec![
        LineItem {
            product_id: "prod_a".to_string(),
            shop_id: "shop_1".to_string(),
            name: "Canvas Tote".to_string(),
            unit_price: 19.99,
            quantity: 2,
        },
        LineItem {
            product_id: "prod_b".to_string(),
            shop_id: "shop_2".to_string(),
            name: "Enamel Mug".to_string(),
            unit_price: 15.0,
            quantity: 1,
        },
    ]
}

/// A complete, valid checkout draft matching [`test_items`].
pub fn test_draft() -> OrderDraft {
    OrderDraft {
        currency: Some("USD".to_string()),
        shipping_info: Some(test_shipping()),
        items_of_order: Some(test_items()),
        price_of_items: Some(54.98),
        tax_fee: Some(4.0),
        shipping_fee: Some(2.99),
        total_to_pay: Some(61.97),
    }
}

/// Builder for persisted Order test instances with sensible defaults.
/// Reduces duplication in test data setup. `created_at` defaults to a
/// fixed instant so pagination assertions stay deterministic.
pub struct OrderBuilder {
    id: String,
    buyer_id: String,
    payment_id: String,
    created_at: DateTime<Utc>,
    total_to_pay: f64,
    items: Option<Vec<LineItem>>,
}

impl Default for OrderBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl OrderBuilder {
    pub fn new() -> Self {
        Self {
            id: "order_test".to_string(),
            buyer_id: "buyer_1".to_string(),
            payment_id: "pi_test".to_string(),
            created_at: Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap(),
            total_to_pay: 61.97,
            items: None,
        }
    }

    #[must_use]
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    #[must_use]
    pub fn with_buyer_id(mut self, buyer_id: impl Into<String>) -> Self {
        self.buyer_id = buyer_id.into();
        self
    }

    #[must_use]
    pub fn with_payment_id(mut self, payment_id: impl Into<String>) -> Self {
        self.payment_id = payment_id.into();
        self
    }

    #[must_use]
    pub fn with_created_at(mut self, created_at: DateTime<Utc>) -> Self {
        self.created_at = created_at;
        self
    }

    #[must_use]
    pub fn with_total_to_pay(mut self, total_to_pay: f64) -> Self {
        self.total_to_pay = total_to_pay;
        self
    }

    /// Replaces the default items on first use, then appends.
    #[must_use]
    pub fn with_item(
        mut self,
        product_id: impl Into<String>,
        shop_id: impl Into<String>,
        quantity: u32,
    ) -> Self {
        let product_id = product_id.into();
        self.items.get_or_insert_with(Vec::new).push(LineItem {
            name: format!("{product_id} sample"),
            product_id,
            shop_id: shop_id.into(),
            unit_price: 9.99,
            quantity,
        });
        self
    }

    #[must_use]
    pub fn with_no_items(mut self) -> Self {
        self.items = Some(Vec::new());
        self
    }

    pub fn build(self) -> Order {
        Order {
            id: self.id,
            buyer: BuyerSnapshot {
                id: self.buyer_id,
                email: "buyer@example.com".to_string(),
                name: "A. Buyer".to_string(),
                avatar: None,
            },
            currency: "USD".to_string(),
            shipping_info: test_shipping(),
            items_of_order: self.items.unwrap_or_else(test_items),
            price_of_items: 54.98,
            tax_fee: 4.0,
            shipping_fee: 2.99,
            total_to_pay: self.total_to_pay,
            order_status: OrderStatus::Uncompleted,
            payment_status: PaymentStatus::Processing,
            payment_info: PaymentInfo {
                client_secret: format!("{}_secret", self.payment_id),
                id: self.payment_id,
                method: "none".to_string(),
            },
            created_at: self.created_at,
        }
    }
}

/// Notifier double recording every delivery instead of sending it.
#[derive(Debug, Clone, Default)]
pub struct CapturingNotifier {
    deliveries: Arc<Mutex<Vec<(String, Receipt)>>>,
}

impl CapturingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn deliveries(&self) -> Vec<(String, Receipt)> {
        match self.deliveries.lock() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

#[async_trait]
impl ReceiptNotifier for CapturingNotifier {
    async fn send_receipt(&self, to: &str, receipt: &Receipt) -> Result<(), NotifyError> {
        match self.deliveries.lock() {
            Ok(mut guard) => guard.push((to.to_string(), receipt.clone())),
            Err(poisoned) => poisoned
                .into_inner()
                .push((to.to_string(), receipt.clone())),
        }
        Ok(())
    }
}
