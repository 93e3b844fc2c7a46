use std::sync::Arc;

use tokio::sync::mpsc;

use super::{NotificationService, RetryPolicy};
use crate::models::BookingSummary;

/// Queue in front of a [`NotificationService`]. `dispatch` never blocks or
/// fails the caller; a background task drains the queue and retries with
/// backoff, logging whatever still fails.
#[derive(Clone)]
pub struct NotificationDispatcher {
    tx: mpsc::UnboundedSender<BookingSummary>,
}

impl NotificationDispatcher {
    /// Must be called from within a tokio runtime.
    pub fn spawn(service: Arc<dyn NotificationService>, retry: RetryPolicy) -> Self {
        let (tx, mut rx) = mpsc::unbounded_channel::<BookingSummary>();

        tokio::spawn(async move {
            while let Some(summary) = rx.recv().await {
                let service = service.clone();
                let retry = retry.clone();
                tokio::spawn(async move {
                    let (service, target) = (&service, &summary);
                    let result = retry
                        .run(move || service.send_booking_received(target))
                        .await;
                    if let Err(e) = result {
                        tracing::error!(
                            pnr = %summary.pnr,
                            error = %e,
                            "giving up on booking notification"
                        );
                    }
                });
            }
            tracing::debug!("notification queue closed");
        });

        Self { tx }
    }

    pub fn dispatch(&self, summary: BookingSummary) {
        let pnr = summary.pnr.clone();
        if self.tx.send(summary).is_err() {
            tracing::warn!(pnr = %pnr, "notification queue closed, dropping notification");
        }
    }
}
