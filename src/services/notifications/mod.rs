pub mod dispatcher;
pub mod retry;

use async_trait::async_trait;

use crate::models::BookingSummary;
use crate::services::messaging::MessagingProvider;

pub use dispatcher::NotificationDispatcher;
pub use retry::RetryPolicy;

#[async_trait]
pub trait NotificationService: Send + Sync {
    async fn send_booking_received(&self, summary: &BookingSummary) -> anyhow::Result<()>;
}

/// Texts the booking summary to the contact's phone. Contacts without a phone
/// number are skipped.
pub struct SmsNotifier {
    messaging: Box<dyn MessagingProvider>,
}

impl SmsNotifier {
    pub fn new(messaging: Box<dyn MessagingProvider>) -> Self {
        Self { messaging }
    }
}

#[async_trait]
impl NotificationService for SmsNotifier {
    async fn send_booking_received(&self, summary: &BookingSummary) -> anyhow::Result<()> {
        let Some(phone) = summary.contact.phone.as_deref().filter(|p| !p.trim().is_empty()) else {
            tracing::debug!(pnr = %summary.pnr, "no phone on booking contact, skipping sms");
            return Ok(());
        };

        let message_id = self
            .messaging
            .send_message(phone, &summary.received_message())
            .await?;
        tracing::info!(
            pnr = %summary.pnr,
            provider = self.messaging.name(),
            message_id = %message_id,
            "booking notification sent"
        );
        Ok(())
    }
}

/// Writes the notification to the log instead of delivering it.
pub struct LogNotifier;

#[async_trait]
impl NotificationService for LogNotifier {
    async fn send_booking_received(&self, summary: &BookingSummary) -> anyhow::Result<()> {
        tracing::info!(
            pnr = %summary.pnr,
            email = %summary.contact.email,
            message = %summary.received_message(),
            "booking notification (log only)"
        );
        Ok(())
    }
}
