pub mod fallback;
pub mod mock;
pub mod stripe;

use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Context attached to a payment intent so the provider dashboard can be traced back to a booking.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentMetadata {
    pub pnr: String,
    pub schedule_id: i64,
    pub session_id: String,
    pub currency: String,
    pub contact_email: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PaymentIntent {
    pub id: String,
    pub client_secret: String,
    pub provider: String,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum IntentStatus {
    Processing,
    Succeeded,
    Failed,
    Canceled,
}

impl IntentStatus {
    /// Maps a Stripe payment-intent status string.
    pub fn from_provider(s: &str) -> Self {
        match s {
            "succeeded" => IntentStatus::Succeeded,
            "canceled" => IntentStatus::Canceled,
            "requires_payment_method" | "payment_failed" => IntentStatus::Failed,
            _ => IntentStatus::Processing,
        }
    }
}

#[async_trait]
pub trait PaymentProcessor: Send + Sync {
    fn name(&self) -> &'static str;

    async fn create_payment_intent(
        &self,
        amount: Decimal,
        metadata: &PaymentMetadata,
    ) -> anyhow::Result<PaymentIntent>;

    async fn retrieve_payment_status(&self, intent_id: &str) -> anyhow::Result<IntentStatus>;

    /// Whether `intent_id` was issued by this processor.
    fn recognizes(&self, _intent_id: &str) -> bool {
        true
    }
}
