use async_trait::async_trait;
use std::sync::{
    Arc, Mutex,
    atomic::{AtomicU64, Ordering},
};
use tracing::warn;

use crate::{GatewayError, IntentRequest, PaymentGateway, PaymentIntent};

/// Unified test gateway for dry-run mode and testing that records intents
/// without charging anyone.
#[derive(Debug, Clone)]
pub struct TestGateway {
    intent_counter: Arc<AtomicU64>,
    requests: Arc<Mutex<Vec<IntentRequest>>>,
    should_fail: bool,
    failure_message: String,
}

impl TestGateway {
    pub fn new() -> Self {
        Self {
            intent_counter: Arc::new(AtomicU64::new(1)),
            requests: Arc::new(Mutex::new(Vec::new())),
            should_fail: false,
            failure_message: String::new(),
        }
    }

    pub fn with_failure(message: impl Into<String>) -> Self {
        Self {
            intent_counter: Arc::new(AtomicU64::new(1)),
            requests: Arc::new(Mutex::new(Vec::new())),
            should_fail: true,
            failure_message: message.into(),
        }
    }

    /// Every request this gateway has accepted, in call order.
    pub fn recorded(&self) -> Vec<IntentRequest> {
        match self.requests.lock() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    pub fn calls(&self) -> usize {
        self.recorded().len()
    }

    fn next_intent_id(&self) -> String {
        let id = self.intent_counter.fetch_add(1, Ordering::SeqCst);
        format!("TEST_{id}")
    }
}

impl Default for TestGateway {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PaymentGateway for TestGateway {
    async fn create_intent(&self, request: IntentRequest) -> Result<PaymentIntent, GatewayError> {
        if self.should_fail {
            return Err(GatewayError::Rejected {
                status: 402,
                message: self.failure_message.clone(),
            });
        }

        warn!(
            "[TEST] Would create payment intent: {} {} for {}",
            request.amount_minor, request.currency, request.receipt_email
        );

        match self.requests.lock() {
            Ok(mut guard) => guard.push(request),
            Err(poisoned) => poisoned.into_inner().push(request),
        }

        let id = self.next_intent_id();
        let client_secret = format!("{id}_secret_test");

        Ok(PaymentIntent { id, client_secret })
    }

    fn publishable_key(&self) -> &str {
        "pk_test_gateway"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(amount_minor: i64) -> IntentRequest {
        IntentRequest {
            amount_minor,
            currency: "usd".to_string(),
            receipt_email: "buyer@example.com".to_string(),
        }
    }

    #[tokio::test]
    async fn intents_get_sequential_ids() {
        let gateway = TestGateway::new();

        let first = gateway.create_intent(request(100)).await.unwrap();
        let second = gateway.create_intent(request(200)).await.unwrap();

        assert_eq!(first.id, "TEST_1");
        assert_eq!(first.client_secret, "TEST_1_secret_test");
        assert_eq!(second.id, "TEST_2");
        assert_eq!(gateway.calls(), 2);
    }

    #[tokio::test]
    async fn records_requests_in_order() {
        let gateway = TestGateway::new();

        gateway.create_intent(request(100)).await.unwrap();
        gateway.create_intent(request(250)).await.unwrap();

        let recorded = gateway.recorded();
        assert_eq!(recorded.len(), 2);
        assert_eq!(recorded[0].amount_minor, 100);
        assert_eq!(recorded[1].amount_minor, 250);
    }

    #[tokio::test]
    async fn configured_failure_rejects_without_recording() {
        let gateway = TestGateway::with_failure("card declined");

        let err = gateway.create_intent(request(100)).await.unwrap_err();

        match err {
            GatewayError::Rejected { status, message } => {
                assert_eq!(status, 402);
                assert_eq!(message, "card declined");
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(gateway.calls(), 0);
    }

    #[test]
    fn publishable_key_is_test_key() {
        let gateway = TestGateway::new();
        assert_eq!(gateway.publishable_key(), "pk_test_gateway");
    }
}
