use async_trait::async_trait;
use rust_decimal::Decimal;

use super::{IntentStatus, PaymentIntent, PaymentMetadata, PaymentProcessor};

pub const MOCK_INTENT_PREFIX: &str = "pi_mock_";

/// Offline processor for environments without live payment credentials.
/// Issues well-formed intents and reports a fixed status for them.
pub struct MockPaymentProcessor {
    status: IntentStatus,
}

impl MockPaymentProcessor {
    pub fn new() -> Self {
        Self {
            status: IntentStatus::Succeeded,
        }
    }

    pub fn with_status(status: IntentStatus) -> Self {
        Self { status }
    }
}

impl Default for MockPaymentProcessor {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PaymentProcessor for MockPaymentProcessor {
    fn name(&self) -> &'static str {
        "mock"
    }

    async fn create_payment_intent(
        &self,
        _amount: Decimal,
        _metadata: &PaymentMetadata,
    ) -> anyhow::Result<PaymentIntent> {
        let id = format!("{MOCK_INTENT_PREFIX}{}", uuid::Uuid::new_v4().simple());
        Ok(PaymentIntent {
            client_secret: format!("{id}_secret_mock"),
            id,
            provider: self.name().to_string(),
        })
    }

    async fn retrieve_payment_status(&self, intent_id: &str) -> anyhow::Result<IntentStatus> {
        anyhow::ensure!(
            self.recognizes(intent_id),
            "not a mock payment intent: {intent_id}"
        );
        Ok(self.status)
    }

    fn recognizes(&self, intent_id: &str) -> bool {
        intent_id.starts_with(MOCK_INTENT_PREFIX)
    }
}
