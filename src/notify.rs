//! External Notification Service collaborator. This service renders the
//! receipt payload; actual delivery (email, push) is owned by the endpoint
//! the payload is posted to.

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};
use url::Url;

/// Upper bound in seconds on a single delivery attempt.
const DELIVERY_TIMEOUT_SECS: u64 = 10;

/// Rendered payment receipt, keyed the way the storefront client sends it.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Receipt {
    pub subject: String,
    pub payment_id: String,
    pub delivery_info: serde_json::Value,
    pub receiver_info: serde_json::Value,
    pub items: serde_json::Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tax_fee: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shipping_fee: Option<f64>,
    pub total_to_pay: f64,
}

#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    #[error("Receipt delivery failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Receipt delivery rejected ({status}): {body}")]
    Rejected { status: u16, body: String },
}

pub type DynNotifier = Arc<dyn ReceiptNotifier>;

#[async_trait]
pub trait ReceiptNotifier: Send + Sync + 'static {
    /// Hands the receipt to the delivery service. Single bounded attempt,
    /// no retries; a failure is the caller's to surface.
    async fn send_receipt(&self, to: &str, receipt: &Receipt) -> Result<(), NotifyError>;
}

#[derive(Debug, Serialize)]
struct DeliveryEnvelope<'a> {
    to: &'a str,
    #[serde(flatten)]
    receipt: &'a Receipt,
}

/// Posts receipt envelopes to the configured delivery endpoint.
#[derive(Debug, Clone)]
pub struct WebhookNotifier {
    client: Client,
    endpoint: Url,
}

impl WebhookNotifier {
    pub fn new(endpoint: Url) -> Result<Self, NotifyError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(DELIVERY_TIMEOUT_SECS))
            .build()?;
        Ok(Self { client, endpoint })
    }
}

#[async_trait]
impl ReceiptNotifier for WebhookNotifier {
    async fn send_receipt(&self, to: &str, receipt: &Receipt) -> Result<(), NotifyError> {
        let response = self
            .client
            .post(self.endpoint.clone())
            .json(&DeliveryEnvelope { to, receipt })
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(NotifyError::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        info!(to, payment_id = %receipt.payment_id, "Delivered receipt");
        Ok(())
    }
}

/// Fallback when no delivery endpoint is configured: log the receipt
/// instead of sending it anywhere.
#[derive(Debug, Default, Clone)]
pub struct LogNotifier;

impl LogNotifier {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl ReceiptNotifier for LogNotifier {
    async fn send_receipt(&self, to: &str, receipt: &Receipt) -> Result<(), NotifyError> {
        warn!(
            "[DRY-RUN] Would deliver receipt '{}' to {to} (total {})",
            receipt.subject, receipt.total_to_pay
        );
        Ok(())
    }
}
