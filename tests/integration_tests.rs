use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use axum::body::Body;
use axum::extract::ConnectInfo;
use axum::http::{Request, StatusCode};
use axum::Router;
use chrono::NaiveDateTime;
use rust_decimal::Decimal;
use serde_json::{json, Value};
use tower::ServiceExt;

use busline::config::AppConfig;
use busline::db::{self, queries};
use busline::handlers;
use busline::handlers::webhook::sign_payload;
use busline::models::{NewSchedule, SeatType};
use busline::services::messaging::MessagingProvider;
use busline::services::notifications::{NotificationDispatcher, RetryPolicy, SmsNotifier};
use busline::services::payments::fallback::FallbackPaymentProcessor;
use busline::services::payments::mock::{MockPaymentProcessor, MOCK_INTENT_PREFIX};
use busline::services::payments::{IntentStatus, PaymentIntent, PaymentMetadata, PaymentProcessor};
use busline::services::pricing::NoDiscount;
use busline::state::AppState;

// ── Mock Providers ──

struct MockPayments {
    status: Arc<Mutex<IntentStatus>>,
    issued: AtomicUsize,
}

#[async_trait]
impl PaymentProcessor for MockPayments {
    fn name(&self) -> &'static str {
        "test"
    }

    async fn create_payment_intent(
        &self,
        _amount: Decimal,
        metadata: &PaymentMetadata,
    ) -> anyhow::Result<PaymentIntent> {
        let n = self.issued.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(PaymentIntent {
            id: format!("pi_test_{n}"),
            client_secret: format!("pi_test_{n}_secret_{}", metadata.pnr),
            provider: self.name().to_string(),
        })
    }

    async fn retrieve_payment_status(&self, _intent_id: &str) -> anyhow::Result<IntentStatus> {
        Ok(*self.status.lock().unwrap())
    }
}

/// Stands in for a payment provider that is unreachable.
struct DownPayments;

#[async_trait]
impl PaymentProcessor for DownPayments {
    fn name(&self) -> &'static str {
        "stripe"
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

struct MockMessaging {
    sent: Arc<Mutex<Vec<(String, String)>>>,
}

#[async_trait]
impl MessagingProvider for MockMessaging {
    fn name(&self) -> &'static str {
        "mock"
    }

    async fn send_message(&self, to: &str, body: &str) -> anyhow::Result<String> {
        self.sent
            .lock()
            .unwrap()
            .push((to.to_string(), body.to_string()));
        Ok("SM_test".to_string())
    }
}

// ── Helpers ──

fn test_config() -> AppConfig {
    AppConfig {
        port: 3000,
        database_url: ":memory:".to_string(),
        admin_token: "test-token".to_string(),
        lock_ttl_minutes: 5,
        lock_max_hold_minutes: 10,
        max_seats_per_booking: 4,
        pending_booking_ttl_minutes: 30,
        sweep_interval_secs: 60,
        currency: "usd".to_string(),
        stripe_secret_key: "".to_string(),
        stripe_webhook_secret: "".to_string(), // empty = skip signature validation
        payment_fallback_enabled: true,
        twilio_account_sid: "".to_string(),
        twilio_auth_token: "".to_string(),
        twilio_phone_number: "+15551234567".to_string(),
        rate_limit_per_minute: 0,
        notify_max_retries: 0,
    }
}

struct TestEnv {
    state: Arc<AppState>,
    payment_status: Arc<Mutex<IntentStatus>>,
    sent: Arc<Mutex<Vec<(String, String)>>>,
    schedule_id: i64,
    seat_1a: i64,
    seat_1b: i64,
    seat_1c: i64,
}

fn dt(s: &str) -> NaiveDateTime {
    NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S").unwrap()
}

fn test_env_with(config: AppConfig) -> TestEnv {
    test_env_with_payments(config, None)
}

/// `payments` replaces the switchable test processor when given.
fn test_env_with_payments(config: AppConfig, payments: Option<Box<dyn PaymentProcessor>>) -> TestEnv {
    let conn = db::init_db(":memory:").unwrap();
    let bus_id = queries::insert_bus(&conn, "AA-11-BB", "Coach 7").unwrap();
    let schedule_id = queries::insert_schedule(
        &conn,
        &NewSchedule {
            bus_id,
            origin: "Lisbon".to_string(),
            destination: "Porto".to_string(),
            departure_at: dt("2099-06-01 09:00:00"),
            arrival_at: dt("2099-06-01 12:00:00"),
            base_price: Decimal::new(2000, 2),
        },
    )
    .unwrap();
    let seat_1a = queries::insert_seat(&conn, bus_id, "1A", SeatType::Regular).unwrap();
    let seat_1b = queries::insert_seat(&conn, bus_id, "1B", SeatType::Premium).unwrap();
    let seat_1c = queries::insert_seat(&conn, bus_id, "1C", SeatType::Regular).unwrap();
    queries::upsert_price_tier(&conn, schedule_id, SeatType::Premium, Decimal::new(3500, 2)).unwrap();

    let payment_status = Arc::new(Mutex::new(IntentStatus::Succeeded));
    let sent = Arc::new(Mutex::new(vec![]));
    let notifier = SmsNotifier::new(Box::new(MockMessaging {
        sent: Arc::clone(&sent),
    }));

    let state = Arc::new(AppState {
        db: Arc::new(Mutex::new(conn)),
        config,
        payments: payments.unwrap_or_else(|| {
            Box::new(MockPayments {
                status: Arc::clone(&payment_status),
                issued: AtomicUsize::new(0),
            })
        }),
        discounts: Box::new(NoDiscount),
        notifier: NotificationDispatcher::spawn(Arc::new(notifier), RetryPolicy::with_max_retries(0)),
    });

    TestEnv {
        state,
        payment_status,
        sent,
        schedule_id,
        seat_1a,
        seat_1b,
        seat_1c,
    }
}

fn test_env() -> TestEnv {
    test_env_with(test_config())
}

fn test_app(state: Arc<AppState>) -> Router {
    handlers::router(state)
}

fn json_request(method: &str, uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("Content-Type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn empty_request(method: &str, uri: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

async fn send(state: &Arc<AppState>, req: Request<Body>) -> (StatusCode, Value) {
    let res = test_app(state.clone()).oneshot(req).await.unwrap();
    let status = res.status();
    let body = axum::body::to_bytes(res.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = if body.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&body).unwrap()
    };
    (status, json)
}

async fn lock_seats(env: &TestEnv, session_id: &str, seat_ids: &[i64]) -> (StatusCode, Value) {
    send(
        &env.state,
        json_request(
            "POST",
            &format!("/api/schedules/{}/locks", env.schedule_id),
            json!({"session_id": session_id, "seat_ids": seat_ids}),
        ),
    )
    .await
}

async fn create_booking(env: &TestEnv, session_id: &str, seat_ids: &[i64]) -> (StatusCode, Value) {
    send(
        &env.state,
        json_request(
            "POST",
            "/api/bookings",
            json!({
                "schedule_id": env.schedule_id,
                "seat_ids": seat_ids,
                "session_id": session_id,
                "contact": {"name": "Ana Silva", "email": "ana@example.com", "phone": "+351910000000"},
                "passengers": [{"name": "Ana Silva", "age": 34, "seat_id": seat_ids[0]}]
            }),
        ),
    )
    .await
}

async fn webhook(env: &TestEnv, event_type: &str, intent_id: &str) -> (StatusCode, Value) {
    send(
        &env.state,
        json_request(
            "POST",
            "/webhook/payments",
            json!({"id": "evt_1", "type": event_type, "data": {"object": {"id": intent_id}}}),
        ),
    )
    .await
}

async fn seat_states(env: &TestEnv) -> Vec<(i64, String)> {
    let (status, json) = send(
        &env.state,
        empty_request("GET", &format!("/api/schedules/{}/seats", env.schedule_id)),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    json["seats"]
        .as_array()
        .unwrap()
        .iter()
        .map(|s| {
            (
                s["seat_id"].as_i64().unwrap(),
                s["state"].as_str().unwrap().to_string(),
            )
        })
        .collect()
}

async fn wait_for_messages(sent: &Arc<Mutex<Vec<(String, String)>>>, count: usize) {
    for _ in 0..100 {
        if sent.lock().unwrap().len() >= count {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("expected {count} notification(s)");
}

// ── Health & Seat Map ──

#[tokio::test]
async fn test_health() {
    let env = test_env();
    let (status, json) = send(&env.state, empty_request("GET", "/health")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "ok");
}

#[tokio::test]
async fn test_seat_map_lists_prices() {
    let env = test_env();
    let (status, json) = send(
        &env.state,
        empty_request("GET", &format!("/api/schedules/{}/seats", env.schedule_id)),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let seats = json["seats"].as_array().unwrap();
    assert_eq!(seats.len(), 3);
    assert!(seats.iter().all(|s| s["state"] == "available"));
    assert_eq!(seats[1]["label"], "1B");
    assert_eq!(seats[1]["seat_type"], "PREMIUM");
    assert_eq!(seats[1]["price"], "35.00");
}

#[tokio::test]
async fn test_seat_map_unknown_schedule() {
    let env = test_env();
    let (status, json) = send(&env.state, empty_request("GET", "/api/schedules/999/seats")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json["code"], "not_found");
}

// ── Locks ──

#[tokio::test]
async fn test_lock_conflict_names_seats() {
    let env = test_env();
    let (status, json) = lock_seats(&env, "sess-x", &[env.seat_1a, env.seat_1b]).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["seat_ids"], json!([env.seat_1a, env.seat_1b]));
    assert!(json["expires_at"].is_string());

    let (status, json) = lock_seats(&env, "sess-y", &[env.seat_1a, env.seat_1c]).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(json["code"], "seat_unavailable");
    assert_eq!(json["retryable"], true);
    assert_eq!(json["seat_ids"], json!([env.seat_1a]));

    // Nothing was locked for sess-y.
    let states = seat_states(&env).await;
    assert_eq!(states[2], (env.seat_1c, "available".to_string()));
}

#[tokio::test]
async fn test_lock_rejects_invalid_selection() {
    let env = test_env();
    let (status, json) = lock_seats(&env, "sess-x", &[1, 2, 3, 4, 5]).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["code"], "invalid_request");

    let (status, _) = lock_seats(&env, "sess-x", &[]).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_release_and_renew() {
    let env = test_env();
    lock_seats(&env, "sess-x", &[env.seat_1a, env.seat_1b]).await;

    let (status, json) = send(
        &env.state,
        json_request("POST", "/api/locks/sess-x/renew", json!({"extra_minutes": 2})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["renewed"], 2);

    let (status, _) = send(
        &env.state,
        json_request("POST", "/api/locks/sess-x/renew", json!({"extra_minutes": 30})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, json) = send(&env.state, empty_request("DELETE", "/api/locks/sess-x")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["released"], 2);

    let (status, json) = send(&env.state, empty_request("DELETE", "/api/locks/sess-x")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["released"], 0);

    let (status, _) = lock_seats(&env, "sess-y", &[env.seat_1a]).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_lock_rate_limit() {
    let mut config = test_config();
    config.rate_limit_per_minute = 2;
    let env = test_env_with(config);

    for _ in 0..2 {
        let (status, _) = lock_seats(&env, "sess-x", &[env.seat_1a]).await;
        assert_eq!(status, StatusCode::OK);
    }
    let (status, json) = lock_seats(&env, "sess-x", &[env.seat_1a]).await;
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(json["code"], "rate_limited");

    // Other sessions are counted separately.
    let (status, _) = lock_seats(&env, "sess-y", &[env.seat_1b]).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_rate_limit_follows_peer_address() {
    let mut config = test_config();
    config.rate_limit_per_minute = 2;
    let env = test_env_with(config);
    let peer: SocketAddr = "203.0.113.9:40000".parse().unwrap();

    let from_peer = |session: &str, seat: i64| {
        let mut req = json_request(
            "POST",
            &format!("/api/schedules/{}/locks", env.schedule_id),
            json!({"session_id": session, "seat_ids": [seat]}),
        );
        req.extensions_mut().insert(ConnectInfo(peer));
        req
    };

    // A fresh session id per request does not reset the count.
    for (session, seat) in [("sess-1", env.seat_1a), ("sess-2", env.seat_1b)] {
        let (status, _) = send(&env.state, from_peer(session, seat)).await;
        assert_eq!(status, StatusCode::OK);
    }
    let (status, json) = send(&env.state, from_peer("sess-3", env.seat_1c)).await;
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(json["code"], "rate_limited");

    // Renewals count too.
    let mut config = test_config();
    config.rate_limit_per_minute = 1;
    let env = test_env_with(config);
    lock_seats(&env, "sess-x", &[env.seat_1a]).await;
    let renew = || json_request("POST", "/api/locks/sess-x/renew", json!({"extra_minutes": 1}));
    assert_eq!(send(&env.state, renew()).await.0, StatusCode::OK);
    assert_eq!(send(&env.state, renew()).await.0, StatusCode::TOO_MANY_REQUESTS);
}

// ── Booking & Payment ──

#[tokio::test]
async fn test_lock_book_pay_scenario() {
    let env = test_env();
    let (a, b, c) = (env.seat_1a, env.seat_1b, env.seat_1c);

    let (status, _) = lock_seats(&env, "sess-x", &[a, b]).await;
    assert_eq!(status, StatusCode::OK);
    let (status, json) = lock_seats(&env, "sess-y", &[a]).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(json["seat_ids"], json!([a]));

    let (status, receipt) = create_booking(&env, "sess-x", &[a, b]).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(receipt["booking"]["status"], "PENDING");
    assert_eq!(receipt["booking"]["payment_status"], "PENDING");
    assert_eq!(receipt["booking"]["total_amount"], "55.00");
    assert_eq!(receipt["seats"].as_array().unwrap().len(), 2);
    assert_eq!(receipt["seats"][0]["price"], "20.00");
    assert_eq!(receipt["seats"][1]["price"], "35.00");
    assert_eq!(receipt["payment"]["provider"], "test");
    let pnr = receipt["booking"]["pnr"].as_str().unwrap().to_string();
    let intent_id = receipt["payment"]["payment_intent_id"].as_str().unwrap().to_string();
    assert!(pnr.starts_with("BL"));

    wait_for_messages(&env.sent, 1).await;
    {
        let sent = env.sent.lock().unwrap();
        assert_eq!(sent[0].0, "+351910000000");
        assert!(sent[0].1.contains(&pnr));
        assert!(sent[0].1.contains("Lisbon -> Porto"));
    }

    let (status, json) = webhook(&env, "payment_intent.succeeded", &intent_id).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["received"], true);

    // Duplicate delivery is harmless.
    let (status, _) = webhook(&env, "payment_intent.succeeded", &intent_id).await;
    assert_eq!(status, StatusCode::OK);

    let (status, details) = send(&env.state, empty_request("GET", &format!("/api/bookings/{pnr}"))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(details["booking"]["status"], "CONFIRMED");
    assert_eq!(details["booking"]["payment_status"], "COMPLETED");
    assert_eq!(details["payments"][0]["status"], "COMPLETED");
    assert_eq!(details["passengers"][0]["name"], "Ana Silva");

    let (status, json) = lock_seats(&env, "sess-y", &[a]).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(json["seat_ids"], json!([a]));
    let (status, _) = lock_seats(&env, "sess-y", &[c]).await;
    assert_eq!(status, StatusCode::OK);

    let states = seat_states(&env).await;
    assert_eq!(
        states,
        vec![
            (a, "booked".to_string()),
            (b, "booked".to_string()),
            (c, "locked".to_string()),
        ]
    );
}

#[tokio::test]
async fn test_booking_without_lock_is_rejected() {
    let env = test_env();
    lock_seats(&env, "sess-x", &[env.seat_1a]).await;

    let (status, json) = create_booking(&env, "sess-x", &[env.seat_1a, env.seat_1b]).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(json["code"], "lock_expired");
    assert_eq!(json["seat_ids"], json!([env.seat_1b]));

    let (status, _) = create_booking(&env, "sess-y", &[env.seat_1a]).await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_confirm_endpoint_verifies_with_processor() {
    let env = test_env();
    lock_seats(&env, "sess-x", &[env.seat_1a]).await;
    let (_, receipt) = create_booking(&env, "sess-x", &[env.seat_1a]).await;
    let intent_id = receipt["payment"]["payment_intent_id"].as_str().unwrap().to_string();

    *env.payment_status.lock().unwrap() = IntentStatus::Processing;
    let (status, json) = send(
        &env.state,
        empty_request("POST", &format!("/api/payments/{intent_id}/confirm")),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["payment_status"], "processing");
    assert_eq!(json["changed"], false);
    assert_eq!(json["booking"]["status"], "PENDING");

    *env.payment_status.lock().unwrap() = IntentStatus::Failed;
    let (status, json) = send(
        &env.state,
        empty_request("POST", &format!("/api/payments/{intent_id}/confirm")),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["changed"], true);
    assert_eq!(json["booking"]["status"], "CANCELLED");
    assert_eq!(json["booking"]["payment_status"], "FAILED");

    // Seat is free again straight away.
    let (status, _) = lock_seats(&env, "sess-y", &[env.seat_1a]).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_fallback_intent_cannot_confirm_booking() {
    let payments = FallbackPaymentProcessor::new(
        Box::new(DownPayments),
        Box::new(MockPaymentProcessor::new()),
    );
    let env = test_env_with_payments(test_config(), Some(Box::new(payments)));
    lock_seats(&env, "sess-x", &[env.seat_1a]).await;

    // Booking still goes through while the provider is down.
    let (status, receipt) = create_booking(&env, "sess-x", &[env.seat_1a]).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(receipt["payment"]["provider"], "mock");
    let intent_id = receipt["payment"]["payment_intent_id"].as_str().unwrap().to_string();
    assert!(intent_id.starts_with(MOCK_INTENT_PREFIX));

    let (status, json) = send(
        &env.state,
        empty_request("POST", &format!("/api/payments/{intent_id}/confirm")),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["payment_status"], "processing");
    assert_eq!(json["changed"], false);
    assert_eq!(json["booking"]["status"], "PENDING");
    assert_eq!(json["booking"]["payment_status"], "PENDING");

    let states = seat_states(&env).await;
    assert!(states.contains(&(env.seat_1a, "booked".to_string())));
}

#[tokio::test]
async fn test_confirm_unknown_payment() {
    let env = test_env();
    let (status, json) = send(&env.state, empty_request("POST", "/api/payments/pi_nope/confirm")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json["code"], "unknown_payment");
}

#[tokio::test]
async fn test_webhook_unknown_payment_is_acknowledged() {
    let env = test_env();
    let (status, json) = webhook(&env, "payment_intent.succeeded", "pi_nope").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["received"], true);

    let (status, _) = webhook(&env, "charge.refunded", "ch_1").await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_webhook_cancellation_frees_seats() {
    let env = test_env();
    lock_seats(&env, "sess-x", &[env.seat_1b]).await;
    let (_, receipt) = create_booking(&env, "sess-x", &[env.seat_1b]).await;
    let intent_id = receipt["payment"]["payment_intent_id"].as_str().unwrap().to_string();

    let (status, _) = webhook(&env, "payment_intent.canceled", &intent_id).await;
    assert_eq!(status, StatusCode::OK);

    let states = seat_states(&env).await;
    assert_eq!(states[1], (env.seat_1b, "available".to_string()));
}

#[tokio::test]
async fn test_webhook_signature_enforced() {
    let mut config = test_config();
    config.stripe_webhook_secret = "whsec_test".to_string();
    let env = test_env_with(config);

    let payload = json!({"id": "evt_1", "type": "payment_intent.succeeded", "data": {"object": {"id": "pi_nope"}}})
        .to_string();

    let (status, _) = send(&env.state, json_request_raw("/webhook/payments", &payload, None)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let bad = sign_payload("whsec_wrong", payload.as_bytes(), chrono::Utc::now().timestamp());
    let (status, _) = send(&env.state, json_request_raw("/webhook/payments", &payload, Some(&bad))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let good = sign_payload("whsec_test", payload.as_bytes(), chrono::Utc::now().timestamp());
    let (status, json) = send(&env.state, json_request_raw("/webhook/payments", &payload, Some(&good))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["received"], true);
}

fn json_request_raw(uri: &str, payload: &str, signature: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri(uri)
        .header("Content-Type", "application/json");
    if let Some(sig) = signature {
        builder = builder.header("Stripe-Signature", sig);
    }
    builder.body(Body::from(payload.to_string())).unwrap()
}

#[tokio::test]
async fn test_get_unknown_booking() {
    let env = test_env();
    let (status, _) = send(&env.state, empty_request("GET", "/api/bookings/BLNOPE")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

// ── Admin API Tests ──

#[tokio::test]
async fn test_admin_requires_auth() {
    let env = test_env();
    let (status, _) = send(&env.state, empty_request("GET", "/api/admin/bookings")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let req = Request::builder()
        .uri("/api/admin/bookings")
        .header("Authorization", "Bearer wrong-token")
        .body(Body::empty())
        .unwrap();
    let (status, _) = send(&env.state, req).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_admin_lists_bookings() {
    let env = test_env();
    lock_seats(&env, "sess-x", &[env.seat_1a]).await;
    create_booking(&env, "sess-x", &[env.seat_1a]).await;

    let req = Request::builder()
        .uri("/api/admin/bookings?status=pending")
        .header("Authorization", "Bearer test-token")
        .body(Body::empty())
        .unwrap();
    let (status, json) = send(&env.state, req).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json.as_array().unwrap().len(), 1);
    assert_eq!(json[0]["contact"]["email"], "ana@example.com");

    let req = Request::builder()
        .uri("/api/admin/bookings?status=confirmed")
        .header("Authorization", "Bearer test-token")
        .body(Body::empty())
        .unwrap();
    let (_, json) = send(&env.state, req).await;
    assert!(json.as_array().unwrap().is_empty());
}
