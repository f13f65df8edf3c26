use async_trait::async_trait;
use clap::Parser;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use tracing::info;

use crate::{GatewayError, IntentRequest, PaymentGateway, PaymentIntent};

/// Metadata tag attached to every intent so gateway dashboards can
/// attribute charges to the storefront.
pub const INTENT_COMPANY_TAG: &str = "VCN Shop - Fox COR";

#[derive(Parser, Debug, Clone)]
pub struct StripeEnv {
    #[clap(long, env = "STRIPE_SECRET_KEY")]
    pub secret_key: String,
    #[clap(long, env = "STRIPE_PUBLIC_KEY")]
    pub publishable_key: String,
    #[clap(long, env = "STRIPE_BASE_URL", default_value = "https://api.stripe.com")]
    pub base_url: String,
    /// Upper bound in seconds on a single gateway call.
    #[clap(long, env = "STRIPE_TIMEOUT_SECS", default_value = "10")]
    pub timeout_secs: u64,
}

/// Payment-intent client over Stripe's plain REST API (no SDK).
///
/// The HTTP client is built once with the configured timeout, so every
/// `create_intent` call is a single bounded attempt.
#[derive(Debug, Clone)]
pub struct StripeGateway {
    client: Client,
    secret_key: String,
    publishable_key: String,
    base_url: String,
}

impl StripeGateway {
    pub fn try_from_env(env: &StripeEnv) -> Result<Self, GatewayError> {
        if env.secret_key.is_empty() {
            return Err(GatewayError::InvalidConfiguration(
                "STRIPE_SECRET_KEY is empty".to_string(),
            ));
        }
        if env.publishable_key.is_empty() {
            return Err(GatewayError::InvalidConfiguration(
                "STRIPE_PUBLIC_KEY is empty".to_string(),
            ));
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(env.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            secret_key: env.secret_key.clone(),
            publishable_key: env.publishable_key.clone(),
            base_url: env.base_url.trim_end_matches('/').to_string(),
        })
    }
}

#[derive(Debug, Deserialize)]
struct IntentResponse {
    id: String,
    // Stripe omits the secret when the API key lacks permission to read it
    client_secret: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String,
}

#[async_trait]
impl PaymentGateway for StripeGateway {
    async fn create_intent(&self, request: IntentRequest) -> Result<PaymentIntent, GatewayError> {
        let amount = request.amount_minor.to_string();
        let response = self
            .client
            .post(format!("{}/v1/payment_intents", self.base_url))
            .bearer_auth(&self.secret_key)
            .form(&[
                ("amount", amount.as_str()),
                ("currency", request.currency.as_str()),
                ("receipt_email", request.receipt_email.as_str()),
                ("metadata[company]", INTENT_COMPANY_TAG),
            ])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ErrorEnvelope>(&body)
                .map_or(body, |envelope| envelope.error.message);
            return Err(GatewayError::Rejected {
                status: status.as_u16(),
                message,
            });
        }

        let intent: IntentResponse = response.json().await?;
        let client_secret = intent.client_secret.ok_or_else(|| {
            GatewayError::InvalidResponse("intent is missing a client_secret".to_string())
        })?;

        info!(
            intent_id = %intent.id,
            amount_minor = request.amount_minor,
            currency = %request.currency,
            "Created payment intent"
        );

        Ok(PaymentIntent {
            id: intent.id,
            client_secret,
        })
    }

    fn publishable_key(&self) -> &str {
        &self.publishable_key
    }
}
