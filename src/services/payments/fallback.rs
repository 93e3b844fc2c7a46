use async_trait::async_trait;
use rust_decimal::Decimal;

use super::{IntentStatus, PaymentIntent, PaymentMetadata, PaymentProcessor};

/// Uses `primary` and falls back to `fallback` when intent creation fails, so a
/// provider outage does not block booking creation. Only meant for environments
/// where taking bookings without a live payment provider is acceptable.
///
/// Intents issued by the fallback never report `Succeeded`: no money moved, so
/// such bookings stay PENDING until they fail, get cancelled or are swept.
pub struct FallbackPaymentProcessor {
    primary: Box<dyn PaymentProcessor>,
    fallback: Box<dyn PaymentProcessor>,
}

impl FallbackPaymentProcessor {
    pub fn new(primary: Box<dyn PaymentProcessor>, fallback: Box<dyn PaymentProcessor>) -> Self {
        Self { primary, fallback }
    }
}

#[async_trait]
impl PaymentProcessor for FallbackPaymentProcessor {
    fn name(&self) -> &'static str {
        self.primary.name()
    }

    async fn create_payment_intent(
        &self,
        amount: Decimal,
        metadata: &PaymentMetadata,
    ) -> anyhow::Result<PaymentIntent> {
        match self.primary.create_payment_intent(amount, metadata).await {
            Ok(intent) => Ok(intent),
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    primary = self.primary.name(),
                    fallback = self.fallback.name(),
                    pnr = %metadata.pnr,
                    "payment provider failed, using fallback processor"
                );
                self.fallback.create_payment_intent(amount, metadata).await
            }
        }
    }

    async fn retrieve_payment_status(&self, intent_id: &str) -> anyhow::Result<IntentStatus> {
        if self.fallback.recognizes(intent_id) {
            match self.fallback.retrieve_payment_status(intent_id).await? {
                IntentStatus::Succeeded => {
                    tracing::warn!(
                        payment_intent_id = %intent_id,
                        fallback = self.fallback.name(),
                        "fallback-issued intent cannot settle, reporting processing"
                    );
                    Ok(IntentStatus::Processing)
                }
                other => Ok(other),
            }
        } else {
            self.primary.retrieve_payment_status(intent_id).await
        }
    }

    fn recognizes(&self, intent_id: &str) -> bool {
        self.primary.recognizes(intent_id) || self.fallback.recognizes(intent_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::payments::mock::{MockPaymentProcessor, MOCK_INTENT_PREFIX};

    struct Down;

    #[async_trait]
    impl PaymentProcessor for Down {
        fn name(&self) -> &'static str {
            "down"
        }

        async fn create_payment_intent(
            &self,
            _amount: Decimal,
            _metadata: &PaymentMetadata,
        ) -> anyhow::Result<PaymentIntent> {
            anyhow::bail!("connection refused")
        }

        async fn retrieve_payment_status(&self, _intent_id: &str) -> anyhow::Result<IntentStatus> {
            anyhow::bail!("connection refused")
        }

        fn recognizes(&self, intent_id: &str) -> bool {
            intent_id.starts_with("pi_") && !intent_id.starts_with(MOCK_INTENT_PREFIX)
        }
    }

    fn metadata() -> PaymentMetadata {
        PaymentMetadata {
            pnr: "BL0000000000AAAA".to_string(),
            schedule_id: 1,
            session_id: "sess".to_string(),
            currency: "usd".to_string(),
            contact_email: "a@example.com".to_string(),
        }
    }

    #[tokio::test]
    async fn test_falls_back_when_primary_is_down() {
        let processor =
            FallbackPaymentProcessor::new(Box::new(Down), Box::new(MockPaymentProcessor::new()));
        let intent = processor
            .create_payment_intent(Decimal::new(2500, 2), &metadata())
            .await
            .unwrap();
        assert_eq!(intent.provider, "mock");

        // A fallback intent never counts as paid, whatever the fallback says.
        let status = processor.retrieve_payment_status(&intent.id).await.unwrap();
        assert_eq!(status, IntentStatus::Processing);

        // Everything else still goes to the primary.
        assert!(processor.retrieve_payment_status("pi_live_1").await.is_err());
    }

    #[tokio::test]
    async fn test_fallback_failures_still_reported() {
        let processor = FallbackPaymentProcessor::new(
            Box::new(Down),
            Box::new(MockPaymentProcessor::with_status(IntentStatus::Canceled)),
        );
        let intent = processor
            .create_payment_intent(Decimal::ONE, &metadata())
            .await
            .unwrap();
        assert_eq!(
            processor.retrieve_payment_status(&intent.id).await.unwrap(),
            IntentStatus::Canceled
        );
    }
}
