use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use tracing_subscriber::EnvFilter;

use busline::config::AppConfig;
use busline::db;
use busline::handlers;
use busline::services::messaging::twilio::TwilioSmsProvider;
use busline::services::notifications::{
    LogNotifier, NotificationDispatcher, NotificationService, RetryPolicy, SmsNotifier,
};
use busline::services::payments::fallback::FallbackPaymentProcessor;
use busline::services::payments::mock::MockPaymentProcessor;
use busline::services::payments::stripe::StripeProcessor;
use busline::services::payments::PaymentProcessor;
use busline::services::pricing::NoDiscount;
use busline::services::sweeper;
use busline::state::AppState;

fn build_payments(config: &AppConfig) -> anyhow::Result<Box<dyn PaymentProcessor>> {
    if config.stripe_secret_key.is_empty() {
        anyhow::ensure!(
            config.payment_fallback_enabled,
            "STRIPE_SECRET_KEY must be set when PAYMENT_FALLBACK_ENABLED=false"
        );
        tracing::warn!("no Stripe key configured, using mock payment processor");
        return Ok(Box::new(MockPaymentProcessor::new()));
    }

    let stripe = StripeProcessor::new(config.stripe_secret_key.clone());
    if config.payment_fallback_enabled {
        tracing::info!("using Stripe payments with mock fallback");
        Ok(Box::new(FallbackPaymentProcessor::new(
            Box::new(stripe),
            Box::new(MockPaymentProcessor::new()),
        )))
    } else {
        tracing::info!("using Stripe payments");
        Ok(Box::new(stripe))
    }
}

fn build_notifier(config: &AppConfig) -> Arc<dyn NotificationService> {
    let twilio = TwilioSmsProvider::new(
        config.twilio_account_sid.clone(),
        config.twilio_auth_token.clone(),
        config.twilio_phone_number.clone(),
    );
    if twilio.is_configured() {
        tracing::info!("sending booking notifications over Twilio SMS");
        Arc::new(SmsNotifier::new(Box::new(twilio)))
    } else {
        tracing::info!("Twilio not configured, booking notifications are logged only");
        Arc::new(LogNotifier)
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let config = AppConfig::from_env();

    let conn = db::init_db(&config.database_url)?;
    let payments = build_payments(&config)?;
    let notifier = NotificationDispatcher::spawn(
        build_notifier(&config),
        RetryPolicy::with_max_retries(config.notify_max_retries),
    );

    let state = Arc::new(AppState {
        db: Arc::new(Mutex::new(conn)),
        config: config.clone(),
        payments,
        discounts: Box::new(NoDiscount),
        notifier,
    });

    sweeper::spawn_sweeper(state.clone());

    let app = handlers::router(state);

    let addr = format!("0.0.0.0:{}", config.port);
    tracing::info!("starting server on {addr}");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>()).await?;

    Ok(())
}
