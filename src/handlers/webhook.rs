use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use hmac::{Hmac, Mac};
use serde::Deserialize;
use sha2::Sha256;

use crate::errors::AppError;
use crate::services::confirmation;
use crate::state::AppState;

/// Signed payloads older than this are rejected as replays.
const SIGNATURE_TOLERANCE_SECS: i64 = 300;

#[derive(Debug, Deserialize)]
pub struct PaymentEvent {
    #[serde(rename = "type")]
    pub event_type: String,
    pub data: PaymentEventData,
}

#[derive(Debug, Deserialize)]
pub struct PaymentEventData {
    pub object: PaymentEventObject,
}

#[derive(Debug, Deserialize)]
pub struct PaymentEventObject {
    pub id: String,
}

/// Checks a `Stripe-Signature: t=<unix>,v1=<hex>` header against
/// HMAC-SHA256(secret, "<t>.<payload>").
pub fn verify_signature(secret: &str, header: &str, payload: &[u8], now_unix: i64) -> bool {
    let mut timestamp: Option<i64> = None;
    let mut signatures: Vec<&str> = Vec::new();
    for part in header.split(',') {
        match part.trim().split_once('=') {
            Some(("t", v)) => timestamp = v.parse().ok(),
            Some(("v1", v)) => signatures.push(v),
            _ => {}
        }
    }

    let Some(timestamp) = timestamp else {
        return false;
    };
    if (now_unix - timestamp).abs() > SIGNATURE_TOLERANCE_SECS {
        return false;
    }

    signatures.iter().any(|sig| {
        let Ok(expected) = hex::decode(sig) else {
            return false;
        };
        let Ok(mut mac) = Hmac::<Sha256>::new_from_slice(secret.as_bytes()) else {
            return false;
        };
        mac.update(timestamp.to_string().as_bytes());
        mac.update(b".");
        mac.update(payload);
        mac.verify_slice(&expected).is_ok()
    })
}

/// Builds a header value that [`verify_signature`] accepts.
pub fn sign_payload(secret: &str, payload: &[u8], timestamp: i64) -> String {
    let mut mac = match Hmac::<Sha256>::new_from_slice(secret.as_bytes()) {
        Ok(m) => m,
        Err(_) => return String::new(),
    };
    mac.update(timestamp.to_string().as_bytes());
    mac.update(b".");
    mac.update(payload);
    format!("t={},v1={}", timestamp, hex::encode(mac.finalize().into_bytes()))
}

// POST /webhook/payments
pub async fn payment_webhook(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    // Signature check is skipped when no secret is configured (dev mode).
    if !state.config.stripe_webhook_secret.is_empty() {
        let signature = headers
            .get("stripe-signature")
            .and_then(|v| v.to_str().ok())
            .unwrap_or("");

        if !verify_signature(
            &state.config.stripe_webhook_secret,
            signature,
            &body,
            chrono::Utc::now().timestamp(),
        ) {
            tracing::warn!("invalid payment webhook signature");
            return (
                StatusCode::BAD_REQUEST,
                Json(serde_json::json!({"error": "invalid signature"})),
            )
                .into_response();
        }
    }

    let event: PaymentEvent = match serde_json::from_slice(&body) {
        Ok(event) => event,
        Err(e) => {
            tracing::warn!(error = %e, "malformed payment webhook payload");
            return AppError::InvalidRequest(format!("malformed event: {e}")).into_response();
        }
    };

    let intent_id = event.data.object.id.as_str();
    tracing::info!(event_type = %event.event_type, payment_intent_id = %intent_id, "payment webhook received");

    let now = super::now();
    let result = {
        let mut conn = match state.conn() {
            Ok(conn) => conn,
            Err(e) => return e.into_response(),
        };
        match event.event_type.as_str() {
            "payment_intent.succeeded" => {
                confirmation::on_payment_succeeded(&mut conn, intent_id, now).map(|_| ())
            }
            "payment_intent.payment_failed" | "payment_intent.canceled" => {
                confirmation::on_payment_failed_or_cancelled(&mut conn, intent_id, now).map(|_| ())
            }
            other => {
                tracing::debug!(event_type = %other, "ignoring payment webhook event");
                Ok(())
            }
        }
    };

    match result {
        Ok(()) => Json(serde_json::json!({"received": true})).into_response(),
        // Nothing the provider can fix by retrying; leave it for an operator.
        Err(AppError::UnknownPayment(id)) => {
            tracing::warn!(payment_intent_id = %id, "webhook for unknown payment intent");
            Json(serde_json::json!({"received": true})).into_response()
        }
        Err(e) => e.into_response(),
    }
}
