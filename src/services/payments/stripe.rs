use anyhow::Context;
use async_trait::async_trait;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;

use super::{IntentStatus, PaymentIntent, PaymentMetadata, PaymentProcessor};

const STRIPE_API: &str = "https://api.stripe.com/v1";

pub struct StripeProcessor {
    secret_key: String,
    client: reqwest::Client,
}

impl StripeProcessor {
    pub fn new(secret_key: String) -> Self {
        Self {
            secret_key,
            client: reqwest::Client::new(),
        }
    }
}

/// Stripe amounts are integers in the currency's minor unit.
pub fn to_minor_units(amount: Decimal) -> anyhow::Result<i64> {
    (amount * Decimal::ONE_HUNDRED)
        .round()
        .to_i64()
        .ok_or_else(|| anyhow::anyhow!("amount out of range: {amount}"))
}

#[async_trait]
impl PaymentProcessor for StripeProcessor {
    fn name(&self) -> &'static str {
        "stripe"
    }

    async fn create_payment_intent(
        &self,
        amount: Decimal,
        metadata: &PaymentMetadata,
    ) -> anyhow::Result<PaymentIntent> {
        anyhow::ensure!(!self.secret_key.is_empty(), "Stripe secret key not configured");

        let minor = to_minor_units(amount)?.to_string();
        let schedule_id = metadata.schedule_id.to_string();
        let form = [
            ("amount", minor.as_str()),
            ("currency", metadata.currency.as_str()),
            ("automatic_payment_methods[enabled]", "true"),
            ("receipt_email", metadata.contact_email.as_str()),
            ("metadata[pnr]", metadata.pnr.as_str()),
            ("metadata[schedule_id]", schedule_id.as_str()),
            ("metadata[session_id]", metadata.session_id.as_str()),
        ];

        let resp = self
            .client
            .post(format!("{STRIPE_API}/payment_intents"))
            .bearer_auth(&self.secret_key)
            .form(&form)
            .send()
            .await
            .context("failed to call Stripe API")?;

        let status = resp.status();
        let data: serde_json::Value = resp
            .json()
            .await
            .context("failed to parse Stripe response")?;

        if !status.is_success() {
            anyhow::bail!("Stripe API error ({}): {}", status, data["error"]["message"]);
        }

        let id = data["id"]
            .as_str()
            .ok_or_else(|| anyhow::anyhow!("missing id in Stripe response"))?;
        let client_secret = data["client_secret"]
            .as_str()
            .ok_or_else(|| anyhow::anyhow!("missing client_secret in Stripe response"))?;

        Ok(PaymentIntent {
            id: id.to_string(),
            client_secret: client_secret.to_string(),
            provider: self.name().to_string(),
        })
    }

    async fn retrieve_payment_status(&self, intent_id: &str) -> anyhow::Result<IntentStatus> {
        let resp = self
            .client
            .get(format!("{STRIPE_API}/payment_intents/{intent_id}"))
            .bearer_auth(&self.secret_key)
            .send()
            .await
            .context("failed to call Stripe API")?;

        let status = resp.status();
        let data: serde_json::Value = resp
            .json()
            .await
            .context("failed to parse Stripe response")?;

        if !status.is_success() {
            anyhow::bail!("Stripe API error ({}): {}", status, data["error"]["message"]);
        }

        data["status"]
            .as_str()
            .map(IntentStatus::from_provider)
            .ok_or_else(|| anyhow::anyhow!("missing status in Stripe response"))
    }

    fn recognizes(&self, intent_id: &str) -> bool {
        intent_id.starts_with("pi_")
    }
}
