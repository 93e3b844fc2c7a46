use std::sync::Arc;

use axum::extract::{Path, State};
use axum::Json;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use super::{client_identity, Peer};
use crate::errors::AppResult;
use crate::services::{locks, rate_limit};
use crate::state::AppState;

// POST /api/schedules/:id/locks
#[derive(Deserialize)]
pub struct AcquireRequest {
    pub session_id: String,
    pub seat_ids: Vec<i64>,
}

#[derive(Serialize)]
pub struct AcquireResponse {
    schedule_id: i64,
    seat_ids: Vec<i64>,
    expires_at: NaiveDateTime,
}

pub async fn acquire(
    State(state): State<Arc<AppState>>,
    peer: Peer,
    Path(schedule_id): Path<i64>,
    Json(req): Json<AcquireRequest>,
) -> AppResult<Json<AcquireResponse>> {
    let now = super::now();
    let policy = state.lock_policy();
    let mut conn = state.conn()?;
    rate_limit::check_rate_limit(
        &conn,
        &client_identity(&peer, &req.session_id),
        "locks",
        state.config.rate_limit_per_minute,
        now,
    )?;

    let grant = locks::acquire_locks(&mut conn, schedule_id, &req.seat_ids, &req.session_id, &policy, now)?;
    Ok(Json(AcquireResponse {
        schedule_id: grant.schedule_id,
        seat_ids: grant.seat_ids,
        expires_at: grant.expires_at,
    }))
}

// DELETE /api/locks/:session_id
pub async fn release(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<String>,
) -> AppResult<Json<serde_json::Value>> {
    let conn = state.conn()?;
    let released = locks::release_locks(&conn, &session_id, super::now())?;
    Ok(Json(serde_json::json!({"released": released})))
}

// POST /api/locks/:session_id/renew
#[derive(Deserialize)]
pub struct RenewRequest {
    pub extra_minutes: i64,
}

pub async fn renew(
    State(state): State<Arc<AppState>>,
    peer: Peer,
    Path(session_id): Path<String>,
    Json(req): Json<RenewRequest>,
) -> AppResult<Json<serde_json::Value>> {
    let now = super::now();
    let policy = state.lock_policy();
    let mut conn = state.conn()?;
    rate_limit::check_rate_limit(
        &conn,
        &client_identity(&peer, &session_id),
        "renew",
        state.config.rate_limit_per_minute,
        now,
    )?;

    let renewed = locks::renew_locks(&mut conn, &session_id, req.extra_minutes, &policy, now)?;
    Ok(Json(serde_json::json!({"renewed": renewed})))
}
