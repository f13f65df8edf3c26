//! Domain-specific error types following clean error handling architecture.
//! Separates concerns instead of mixing database, business logic, and external API errors.

use vcn_payments::GatewayError;

use crate::notify::NotifyError;

/// Request validation errors for order placement and lookup rules.
#[derive(Debug, thiserror::Error)]
pub enum ValidationError {
    #[error("Missing required field: {0}")]
    MissingField(&'static str),
    #[error("Field {0} must be a finite number")]
    NotFinite(&'static str),
    #[error("Field {0} must not be negative")]
    Negative(&'static str),
    #[error("Line item {index} is invalid: {reason}")]
    InvalidLineItem { index: usize, reason: String },
    #[error(
        "total_to_pay must equal price_of_items + tax_fee + shipping_fee: got {total}, expected {expected}"
    )]
    TotalMismatch { total: f64, expected: f64 },
    #[error("Provide a paymentId or an orderId")]
    MissingSelector,
    #[error("page and limit must be positive integers")]
    InvalidPagination,
    #[error("Unknown sort field: {0}")]
    UnknownSortField(String),
    #[error("Unknown sort direction: {0}")]
    UnknownSortDirection(String),
    #[error("Unknown status filter: {0}")]
    UnknownStatusFilter(String),
    #[error("Unknown projection field: {0}")]
    UnknownProjectionField(String),
}

/// Database persistence and data corruption errors.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("Order not found: {0}")]
    OrderNotFound(String),
    #[error("Invalid order status in database: {0}")]
    InvalidOrderStatus(String),
    #[error("Invalid payment status in database: {0}")]
    InvalidPaymentStatus(String),
    #[error("Invalid item quantity in database: {0}")]
    InvalidQuantity(i64),
}

/// Unified error type for the order workflow with clear domain boundaries.
/// Provides error mapping between layers while maintaining separation of concerns.
#[derive(Debug, thiserror::Error)]
pub enum CheckoutError {
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
    #[error("Store error: {0}")]
    Store(#[from] StoreError),
    #[error("Payment gateway error: {0}")]
    Gateway(#[from] GatewayError),
    #[error("Receipt notification error: {0}")]
    Notify(#[from] NotifyError),
}

impl From<sqlx::Error> for CheckoutError {
    fn from(err: sqlx::Error) -> Self {
        Self::Store(StoreError::Database(err))
    }
}
