use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;

use super::{client_identity, Peer};
use crate::errors::AppResult;
use crate::models::BookingDetails;
use crate::services::booking::{self, BookingReceipt, CreateBookingRequest};
use crate::services::rate_limit;
use crate::state::AppState;

// POST /api/bookings
pub async fn create_booking(
    State(state): State<Arc<AppState>>,
    peer: Peer,
    Json(req): Json<CreateBookingRequest>,
) -> AppResult<(StatusCode, Json<BookingReceipt>)> {
    let now = super::now();
    {
        let conn = state.conn()?;
        rate_limit::check_rate_limit(
            &conn,
            &client_identity(&peer, &req.session_id),
            "bookings",
            state.config.rate_limit_per_minute,
            now,
        )?;
    }

    let receipt = booking::create_booking(&state, req, now).await?;
    Ok((StatusCode::CREATED, Json(receipt)))
}

// GET /api/bookings/:pnr
pub async fn get_booking(
    State(state): State<Arc<AppState>>,
    Path(pnr): Path<String>,
) -> AppResult<Json<BookingDetails>> {
    let conn = state.conn()?;
    Ok(Json(booking::get_booking_details(&conn, &pnr)?))
}
