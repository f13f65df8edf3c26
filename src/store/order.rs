use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use vcn_payments::PaymentIntent;

use crate::error::ValidationError;
use crate::store::status::{OrderStatus, PaymentStatus};

/// Largest accepted drift between the submitted total and the fee sum,
/// half a minor unit.
const TOTAL_TOLERANCE: f64 = 0.005;

/// Buyer identity snapshot embedded in the order at creation time.
/// Later profile edits must not rewrite order history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuyerSnapshot {
    pub id: String,
    pub email: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
}

/// Destination address snapshot, stored verbatim as a JSON column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShippingInfo {
    pub address: String,
    pub city: String,
    pub country: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub zip_code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone_number: Option<String>,
}

/// One purchased product line as snapshotted at checkout.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineItem {
    pub product_id: String,
    pub shop_id: String,
    pub name: String,
    pub unit_price: f64,
    pub quantity: u32,
}

/// Payment linkage embedded in the order. `client_secret` is buyer-facing
/// material and must never reach shop-scoped projections.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PaymentInfo {
    pub id: String,
    pub method: String,
    pub client_secret: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Order {
    pub id: String,
    pub buyer: BuyerSnapshot,
    pub currency: String,
    pub shipping_info: ShippingInfo,
    pub items_of_order: Vec<LineItem>,
    pub price_of_items: f64,
    pub tax_fee: f64,
    pub shipping_fee: f64,
    pub total_to_pay: f64,
    pub order_status: OrderStatus,
    pub payment_status: PaymentStatus,
    pub payment_info: PaymentInfo,
    pub created_at: DateTime<Utc>,
}

/// Raw checkout payload as supplied by the storefront client. Every field
/// is optional until [`OrderDraft::validate`] has run; absence and NaN are
/// rejected there, not during deserialization.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct OrderDraft {
    pub currency: Option<String>,
    pub shipping_info: Option<ShippingInfo>,
    pub items_of_order: Option<Vec<LineItem>>,
    pub price_of_items: Option<f64>,
    pub tax_fee: Option<f64>,
    pub shipping_fee: Option<f64>,
    pub total_to_pay: Option<f64>,
}

/// Checkout payload that has passed acceptance validation.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedDraft {
    pub currency: String,
    pub shipping_info: ShippingInfo,
    pub items_of_order: Vec<LineItem>,
    pub price_of_items: f64,
    pub tax_fee: f64,
    pub shipping_fee: f64,
    pub total_to_pay: f64,
}

fn require_amount(field: &'static str, value: Option<f64>) -> Result<f64, ValidationError> {
    let value = value.ok_or(ValidationError::MissingField(field))?;
    if !value.is_finite() {
        return Err(ValidationError::NotFinite(field));
    }
    if value < 0.0 {
        return Err(ValidationError::Negative(field));
    }
    Ok(value)
}

impl OrderDraft {
    /// Acceptance validation. Fee fields may be zero but not absent or NaN;
    /// the submitted total has to match the fee sum; every line item needs
    /// real ids and a positive quantity. An empty item list is accepted.
    pub fn validate(self) -> Result<ValidatedDraft, ValidationError> {
        let currency = self
            .currency
            .filter(|currency| !currency.trim().is_empty())
            .ok_or(ValidationError::MissingField("currency"))?;
        let shipping_info = self
            .shipping_info
            .ok_or(ValidationError::MissingField("shipping_info"))?;
        let items_of_order = self
            .items_of_order
            .ok_or(ValidationError::MissingField("items_of_order"))?;
        let price_of_items = require_amount("price_of_items", self.price_of_items)?;
        let tax_fee = require_amount("tax_fee", self.tax_fee)?;
        let shipping_fee = require_amount("shipping_fee", self.shipping_fee)?;
        let total_to_pay = require_amount("total_to_pay", self.total_to_pay)?;

        for (index, item) in items_of_order.iter().enumerate() {
            if item.product_id.trim().is_empty() {
                return Err(ValidationError::InvalidLineItem {
                    index,
                    reason: "product_id is empty".to_string(),
                });
            }
            if item.shop_id.trim().is_empty() {
                return Err(ValidationError::InvalidLineItem {
                    index,
                    reason: "shop_id is empty".to_string(),
                });
            }
            if item.quantity < 1 {
                return Err(ValidationError::InvalidLineItem {
                    index,
                    reason: "quantity must be at least 1".to_string(),
                });
            }
            if !item.unit_price.is_finite() || item.unit_price < 0.0 {
                return Err(ValidationError::InvalidLineItem {
                    index,
                    reason: "unit_price must be a non-negative number".to_string(),
                });
            }
        }

        let expected = price_of_items + tax_fee + shipping_fee;
        if (total_to_pay - expected).abs() > TOTAL_TOLERANCE {
            return Err(ValidationError::TotalMismatch {
                total: total_to_pay,
                expected,
            });
        }

        Ok(ValidatedDraft {
            currency,
            shipping_info,
            items_of_order,
            price_of_items,
            tax_fee,
            shipping_fee,
            total_to_pay,
        })
    }
}

/// Opaque 128-bit hex id. Order ids are internal; the gateway's id lives
/// in `payment_info.id`.
fn generate_order_id() -> String {
    let id: u128 = rand::random();
    format!("{id:032x}")
}

impl Order {
    /// Assembles a new order from a validated draft and the gateway's
    /// intent. Fresh orders always start uncompleted/processing with the
    /// payment method still unknown.
    pub fn new(
        draft: ValidatedDraft,
        buyer: BuyerSnapshot,
        intent: &PaymentIntent,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: generate_order_id(),
            buyer,
            currency: draft.currency,
            shipping_info: draft.shipping_info,
            items_of_order: draft.items_of_order,
            price_of_items: draft.price_of_items,
            tax_fee: draft.tax_fee,
            shipping_fee: draft.shipping_fee,
            total_to_pay: draft.total_to_pay,
            order_status: OrderStatus::Uncompleted,
            payment_status: PaymentStatus::Processing,
            payment_info: PaymentInfo {
                id: intent.id.clone(),
                method: "none".to_string(),
                client_secret: intent.client_secret.clone(),
            },
            created_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{test_buyer, test_draft};

    #[test]
    fn validate_accepts_complete_draft() {
        let validated = test_draft().validate().unwrap();

        assert_eq!(validated.currency, "USD");
        assert_eq!(validated.items_of_order.len(), 2);
        assert!((validated.total_to_pay - 61.97).abs() < f64::EPSILON);
    }

    #[test]
    fn validate_rejects_missing_fields() {
        let missing_currency = OrderDraft {
            currency: None,
            ..test_draft()
        };
        assert!(matches!(
            missing_currency.validate().unwrap_err(),
            ValidationError::MissingField("currency")
        ));

        let missing_shipping = OrderDraft {
            shipping_info: None,
            ..test_draft()
        };
        assert!(matches!(
            missing_shipping.validate().unwrap_err(),
            ValidationError::MissingField("shipping_info")
        ));

        let missing_items = OrderDraft {
            items_of_order: None,
            ..test_draft()
        };
        assert!(matches!(
            missing_items.validate().unwrap_err(),
            ValidationError::MissingField("items_of_order")
        ));

        let missing_total = OrderDraft {
            total_to_pay: None,
            ..test_draft()
        };
        assert!(matches!(
            missing_total.validate().unwrap_err(),
            ValidationError::MissingField("total_to_pay")
        ));
    }

    #[test]
    fn validate_allows_zero_fees() {
        let mut draft = test_draft();
        draft.tax_fee = Some(0.0);
        draft.shipping_fee = Some(0.0);
        draft.total_to_pay = Some(54.98);

        let validated = draft.validate().unwrap();
        assert!((validated.tax_fee - 0.0).abs() < f64::EPSILON);
    }

    #[test]
    fn validate_rejects_non_finite_amounts() {
        let mut draft = test_draft();
        draft.tax_fee = Some(f64::NAN);
        assert!(matches!(
            draft.validate().unwrap_err(),
            ValidationError::NotFinite("tax_fee")
        ));

        let mut draft = test_draft();
        draft.total_to_pay = Some(f64::INFINITY);
        assert!(matches!(
            draft.validate().unwrap_err(),
            ValidationError::NotFinite("total_to_pay")
        ));
    }

    #[test]
    fn validate_rejects_negative_amounts() {
        let mut draft = test_draft();
        draft.shipping_fee = Some(-1.0);
        assert!(matches!(
            draft.validate().unwrap_err(),
            ValidationError::Negative("shipping_fee")
        ));
    }

    #[test]
    fn validate_rejects_total_mismatch() {
        let mut draft = test_draft();
        draft.total_to_pay = Some(99.99);

        assert!(matches!(
            draft.validate().unwrap_err(),
            ValidationError::TotalMismatch { .. }
        ));
    }

    #[test]
    fn validate_rejects_zero_quantity_items() {
        let mut draft = test_draft();
        if let Some(items) = draft.items_of_order.as_mut() {
            items[1].quantity = 0;
        }

        match draft.validate().unwrap_err() {
            ValidationError::InvalidLineItem { index, reason } => {
                assert_eq!(index, 1);
                assert!(reason.contains("quantity"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn validate_rejects_blank_item_ids() {
        let mut draft = test_draft();
        if let Some(items) = draft.items_of_order.as_mut() {
            items[0].product_id = "  ".to_string();
        }
        assert!(matches!(
            draft.validate().unwrap_err(),
            ValidationError::InvalidLineItem { index: 0, .. }
        ));

        let mut draft = test_draft();
        if let Some(items) = draft.items_of_order.as_mut() {
            items[0].shop_id = String::new();
        }
        assert!(matches!(
            draft.validate().unwrap_err(),
            ValidationError::InvalidLineItem { index: 0, .. }
        ));
    }

    #[test]
    fn validate_accepts_empty_item_list() {
        let mut draft = test_draft();
        draft.items_of_order = Some(Vec::new());

        assert!(draft.validate().is_ok());
    }

    #[test]
    fn new_orders_start_uncompleted_and_processing() {
        let intent = PaymentIntent {
            id: "pi_1".to_string(),
            client_secret: "pi_1_secret".to_string(),
        };
        let order = Order::new(
            test_draft().validate().unwrap(),
            test_buyer(),
            &intent,
            Utc::now(),
        );

        assert_eq!(order.order_status, OrderStatus::Uncompleted);
        assert_eq!(order.payment_status, PaymentStatus::Processing);
        assert_eq!(order.payment_info.method, "none");
        assert_eq!(order.payment_info.id, "pi_1");
        assert_eq!(order.payment_info.client_secret, "pi_1_secret");
        assert_eq!(order.id.len(), 32);
    }

    #[test]
    fn generated_ids_are_unique() {
        let a = generate_order_id();
        let b = generate_order_id();
        assert_ne!(a, b);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
    }

    mod properties {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn consistent_totals_always_validate(
                price in 0.0f64..10_000.0,
                tax in 0.0f64..1_000.0,
                shipping in 0.0f64..1_000.0,
            ) {
                let mut draft = test_draft();
                draft.price_of_items = Some(price);
                draft.tax_fee = Some(tax);
                draft.shipping_fee = Some(shipping);
                draft.total_to_pay = Some(price + tax + shipping);
                prop_assert!(draft.validate().is_ok());
            }

            #[test]
            fn drifted_totals_are_rejected(
                price in 0.0f64..10_000.0,
                drift in 0.01f64..100.0,
            ) {
                let mut draft = test_draft();
                draft.price_of_items = Some(price);
                draft.tax_fee = Some(0.0);
                draft.shipping_fee = Some(0.0);
                draft.total_to_pay = Some(price + drift);
                let result = draft.validate();
                prop_assert!(
                    matches!(result, Err(ValidationError::TotalMismatch { .. })),
                    "expected TotalMismatch, got {result:?}"
                );
            }
        }
    }
}
