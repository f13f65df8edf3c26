use async_trait::async_trait;
use std::sync::Arc;

pub mod stripe;
pub mod test;

pub use stripe::{StripeEnv, StripeGateway};
pub use test::TestGateway;

/// Intent creation request.
///
/// Amounts are integer minor units (cents); convert with [`minor_units`]
/// before building one of these. Currency codes and receipt emails are
/// submitted lowercased.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IntentRequest {
    pub amount_minor: i64,
    pub currency: String,
    pub receipt_email: String,
}

/// Authorization handle returned by the gateway when an intent is created.
///
/// `id` is the gateway's identifier for the payment; `client_secret` is the
/// browser-side token the buyer's client needs to confirm the payment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentIntent {
    pub id: String,
    pub client_secret: String,
}

#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    #[error("Gateway request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Gateway rejected the intent ({status}): {message}")]
    Rejected { status: u16, message: String },

    #[error("Malformed gateway response: {0}")]
    InvalidResponse(String),

    #[error("Invalid gateway configuration: {0}")]
    InvalidConfiguration(String),
}

pub type DynGateway = Arc<dyn PaymentGateway>;

#[async_trait]
pub trait PaymentGateway: Send + Sync + 'static {
    /// Create a payment intent for the given amount.
    ///
    /// Single bounded attempt: implementations must apply a request timeout
    /// and must not retry on their own. Callers decide what a failure means.
    async fn create_intent(&self, request: IntentRequest) -> Result<PaymentIntent, GatewayError>;

    /// Publishable key handed to browser clients so they can confirm
    /// intents created by this gateway.
    fn publishable_key(&self) -> &str;
}

/// Converts a major-unit amount (e.g. dollars) to integer minor units
/// (cents): scale by 100, round half away from zero.
pub fn minor_units(amount: f64) -> i64 {
    #[allow(clippy::cast_possible_truncation)]
    {
        (amount * 100.0).round() as i64 // Safe: round() removes the fractional part
    }
}
