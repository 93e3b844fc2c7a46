use std::sync::Arc;

use axum::extract::{Path, State};
use axum::Json;

use crate::errors::AppResult;
use crate::models::SeatMap;
use crate::services::availability;
use crate::state::AppState;

// GET /api/schedules/:id/seats
pub async fn get_seat_map(
    State(state): State<Arc<AppState>>,
    Path(schedule_id): Path<i64>,
) -> AppResult<Json<SeatMap>> {
    let conn = state.conn()?;
    let map = availability::get_seat_map(&conn, schedule_id, super::now())?;
    Ok(Json(map))
}
