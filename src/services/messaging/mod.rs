pub mod twilio;

use async_trait::async_trait;

/// Outbound text channel to a passenger's phone.
#[async_trait]
pub trait MessagingProvider: Send + Sync {
    fn name(&self) -> &'static str;

    /// Sends `body` to `to`, returning the provider's message id.
    async fn send_message(&self, to: &str, body: &str) -> anyhow::Result<String>;
}
