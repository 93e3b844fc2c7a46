use std::env;

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub port: u16,
    pub database_url: String,
    pub admin_token: String,
    pub lock_ttl_minutes: i64,
    /// Upper bound on how long renewals can keep one lock alive, counted from its creation.
    pub lock_max_hold_minutes: i64,
    pub max_seats_per_booking: usize,
    pub pending_booking_ttl_minutes: i64,
    pub sweep_interval_secs: u64,
    pub currency: String,
    pub stripe_secret_key: String,
    pub stripe_webhook_secret: String,
    pub payment_fallback_enabled: bool,
    pub twilio_account_sid: String,
    pub twilio_auth_token: String,
    pub twilio_phone_number: String,
    pub rate_limit_per_minute: i64,
    pub notify_max_retries: usize,
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Self {
        let lock_ttl_minutes = parse_var(&get, "LOCK_TTL_MINUTES", 5);
        let stripe_secret_key = get("STRIPE_SECRET_KEY").unwrap_or_default();
        // With a live key configured, mock intents are opt-in only.
        let fallback_default = stripe_secret_key.is_empty();

        Self {
            port: parse_var(&get, "PORT", 3000),
            database_url: get("DATABASE_URL").unwrap_or_else(|| "busline.db".to_string()),
            admin_token: get("ADMIN_TOKEN").unwrap_or_else(|| "changeme".to_string()),
            lock_ttl_minutes,
            lock_max_hold_minutes: parse_var(&get, "LOCK_MAX_HOLD_MINUTES", lock_ttl_minutes * 2),
            max_seats_per_booking: parse_var(&get, "MAX_SEATS_PER_BOOKING", 4),
            pending_booking_ttl_minutes: parse_var(&get, "PENDING_BOOKING_TTL_MINUTES", 30),
            sweep_interval_secs: parse_var(&get, "SWEEP_INTERVAL_SECS", 60),
            currency: get("CURRENCY").unwrap_or_else(|| "usd".to_string()),
            stripe_secret_key,
            stripe_webhook_secret: get("STRIPE_WEBHOOK_SECRET").unwrap_or_default(),
            payment_fallback_enabled: parse_var(&get, "PAYMENT_FALLBACK_ENABLED", fallback_default),
            twilio_account_sid: get("TWILIO_ACCOUNT_SID").unwrap_or_default(),
            twilio_auth_token: get("TWILIO_AUTH_TOKEN").unwrap_or_default(),
            twilio_phone_number: get("TWILIO_PHONE_NUMBER").unwrap_or_default(),
            rate_limit_per_minute: parse_var(&get, "RATE_LIMIT_PER_MINUTE", 30),
            notify_max_retries: parse_var(&get, "NOTIFY_MAX_RETRIES", 3),
        }
    }

    pub fn lock_ttl(&self) -> chrono::Duration {
        chrono::Duration::minutes(self.lock_ttl_minutes)
    }

    pub fn lock_max_hold(&self) -> chrono::Duration {
        chrono::Duration::minutes(self.lock_max_hold_minutes.max(self.lock_ttl_minutes))
    }

    pub fn pending_booking_ttl(&self) -> chrono::Duration {
        chrono::Duration::minutes(self.pending_booking_ttl_minutes)
    }
}

fn parse_var<T: std::str::FromStr>(get: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> T {
    get(key).and_then(|v| v.parse().ok()).unwrap_or(default)
}
