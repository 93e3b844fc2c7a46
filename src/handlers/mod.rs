pub mod admin;
pub mod bookings;
pub mod health;
pub mod locks;
pub mod payments;
pub mod seats;
pub mod webhook;

use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::ConnectInfo;
use axum::routing::{delete, get, post};
use axum::Router;
use chrono::{NaiveDateTime, Utc};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::services::rate_limit;
use crate::state::AppState;

pub(crate) fn now() -> NaiveDateTime {
    Utc::now().naive_utc()
}

/// Peer address, present when served with `into_make_service_with_connect_info`.
pub(crate) type Peer = Option<ConnectInfo<SocketAddr>>;

pub(crate) fn client_identity(peer: &Peer, session_id: &str) -> String {
    rate_limit::client_identity(peer.as_ref().map(|ConnectInfo(addr)| addr.ip()), session_id)
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health::health))
        .route("/api/schedules/:id/seats", get(seats::get_seat_map))
        .route("/api/schedules/:id/locks", post(locks::acquire))
        .route("/api/locks/:session_id", delete(locks::release))
        .route("/api/locks/:session_id/renew", post(locks::renew))
        .route("/api/bookings", post(bookings::create_booking))
        .route("/api/bookings/:pnr", get(bookings::get_booking))
        .route("/api/payments/:intent_id/confirm", post(payments::confirm_payment))
        .route("/webhook/payments", post(webhook::payment_webhook))
        .route("/api/admin/bookings", get(admin::get_bookings))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
