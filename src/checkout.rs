//! Order workflow orchestration: payment authorization, order creation and
//! the completion path that reconciles gateway confirmation with the
//! inventory ledger.
//!
//! Stateless free functions over injected resources. The gateway call in
//! `initiate_order` happens strictly before any database work so no store
//! transaction is ever held across network I/O.

use chrono::Utc;
use serde::Deserialize;
use sqlx::SqlitePool;
use tracing::{error, info};

use vcn_payments::{DynGateway, IntentRequest, minor_units};

use crate::error::{CheckoutError, StoreError, ValidationError};
use crate::inventory::{self, ItemFailure};
use crate::notify::{DynNotifier, Receipt};
use crate::store::{BuyerSnapshot, Order, OrderDraft};

/// Handle returned to the storefront client after a successful initiate:
/// the client completes payment out-of-band with the gateway using the
/// secret, then calls back with the order id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InitiatedOrder {
    pub order_id: String,
    pub client_secret: String,
}

/// Result of a completion call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompleteOutcome {
    /// The transition applied in this call. Per-item inventory failures,
    /// if any, are warnings on an otherwise successful completion.
    Completed { inventory_warnings: Vec<ItemFailure> },
    /// The order had already left `payment_status=processing`; nothing was
    /// changed and no inventory was touched.
    AlreadyCompleted,
}

/// Validates the draft, authorizes payment with the gateway and persists
/// the order snapshot.
///
/// Ordering matters: validation happens before the gateway is called, and
/// the gateway succeeds before any row is written, so a rejected intent
/// never leaves an orphan order behind.
pub async fn initiate_order(
    pool: &SqlitePool,
    gateway: &DynGateway,
    buyer: BuyerSnapshot,
    draft: OrderDraft,
) -> Result<InitiatedOrder, CheckoutError> {
    let validated = draft.validate()?;

    let intent = gateway
        .create_intent(IntentRequest {
            amount_minor: minor_units(validated.total_to_pay),
            currency: validated.currency.to_lowercase(),
            receipt_email: buyer.email.to_lowercase(),
        })
        .await?;

    let order = Order::new(validated, buyer, &intent, Utc::now());
    order.insert(pool).await?;

    info!(
        order_id = %order.id,
        payment_id = %intent.id,
        total_to_pay = order.total_to_pay,
        items = order.items_of_order.len(),
        "Initiated order"
    );

    Ok(InitiatedOrder {
        order_id: order.id,
        client_secret: intent.client_secret,
    })
}

/// Reconciles a gateway confirmation: marks the order as paid and adjusts
/// the inventory ledger for its line items.
///
/// The guarded status UPDATE is the durable commit point. A repeat call
/// finds the guard already consumed and returns `AlreadyCompleted` without
/// touching inventory, so double completion never double-decrements stock.
/// Inventory failures after the commit point are reported as warnings,
/// never rolled back.
pub async fn complete_order(
    pool: &SqlitePool,
    order_id: &str,
    payment_method: &str,
) -> Result<CompleteOutcome, CheckoutError> {
    if order_id.trim().is_empty() {
        return Err(ValidationError::MissingField("orderId").into());
    }
    if payment_method.trim().is_empty() {
        return Err(ValidationError::MissingField("paymentMethod").into());
    }

    let items = Order::load_item_quantities(pool, order_id)
        .await?
        .ok_or_else(|| StoreError::OrderNotFound(order_id.to_string()))?;

    let applied = Order::mark_processing(pool, order_id, payment_method).await?;
    if !applied {
        info!(order_id, "Order already completed; skipping inventory adjustment");
        return Ok(CompleteOutcome::AlreadyCompleted);
    }

    let outcome = inventory::apply_sale(pool, &items, Utc::now())
        .await
        .map_err(StoreError::Database)?;

    info!(
        order_id,
        payment_method,
        items_applied = outcome.applied,
        "Completed order"
    );

    if let Some(adjustment_error) = outcome.clone().into_error() {
        // The order is already committed as paid; this is an operational
        // alert for reconciliation tooling, not a request failure
        error!(order_id, %adjustment_error, "Inventory adjustment incomplete after commit");
    }

    Ok(CompleteOutcome::Completed {
        inventory_warnings: outcome.failures,
    })
}

/// Receipt request as submitted by the storefront client after payment.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReceiptRequest {
    pub payment_id: Option<String>,
    pub delivery_info: Option<serde_json::Value>,
    pub receiver_info: Option<serde_json::Value>,
    pub items: Option<serde_json::Value>,
    pub tax_fee: Option<f64>,
    pub shipping_fee: Option<f64>,
    pub total_to_pay: Option<f64>,
}

fn optional_fee(field: &'static str, value: Option<f64>) -> Result<Option<f64>, ValidationError> {
    match value {
        Some(fee) if !fee.is_finite() => Err(ValidationError::NotFinite(field)),
        other => Ok(other),
    }
}

/// Pure notification side-effect: validates the request and hands the
/// rendered receipt to the delivery collaborator. No state mutation.
pub async fn send_receipt(
    notifier: &DynNotifier,
    payer_email: &str,
    request: ReceiptRequest,
) -> Result<(), CheckoutError> {
    let payment_id = request
        .payment_id
        .filter(|id| !id.trim().is_empty())
        .ok_or(ValidationError::MissingField("paymentId"))?;
    let delivery_info = request
        .delivery_info
        .ok_or(ValidationError::MissingField("deliveryInfo"))?;
    let receiver_info = request
        .receiver_info
        .ok_or(ValidationError::MissingField("receiverInfo"))?;
    let items = request
        .items
        .ok_or(ValidationError::MissingField("items"))?;
    let total_to_pay = request
        .total_to_pay
        .ok_or(ValidationError::MissingField("totalToPay"))?;
    if !total_to_pay.is_finite() {
        return Err(ValidationError::NotFinite("totalToPay").into());
    }
    let tax_fee = optional_fee("taxFee", request.tax_fee)?;
    let shipping_fee = optional_fee("shippingFee", request.shipping_fee)?;

    let receipt = Receipt {
        subject: format!("Receipt Of Payment {payment_id}"),
        payment_id,
        delivery_info,
        receiver_info,
        items,
        tax_fee,
        shipping_fee,
        total_to_pay,
    };

    notifier.send_receipt(payer_email, &receipt).await?;
    Ok(())
}
