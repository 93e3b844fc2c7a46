use std::collections::HashSet;

use chrono::NaiveDateTime;
use rusqlite::Connection;

use crate::db::queries;
use crate::errors::{AppError, AppResult};
use crate::models::{SeatMap, SeatState, SeatView};
use crate::services::pricing;

/// Point-in-time seat map for a schedule. Display only: every write path
/// re-checks availability inside its own transaction.
pub fn get_seat_map(conn: &Connection, schedule_id: i64, now: NaiveDateTime) -> AppResult<SeatMap> {
    let schedule = queries::get_schedule(conn, schedule_id)?
        .ok_or_else(|| AppError::NotFound(format!("schedule {schedule_id}")))?;

    queries::delete_expired_locks(conn, &now)?;

    let seats = queries::get_seats_for_bus(conn, schedule.bus_id)?;
    let booked = queries::held_seat_ids_for_schedule(conn, schedule_id)?;
    let locked: HashSet<i64> = queries::get_live_locks_for_schedule(conn, schedule_id, &now)?
        .into_iter()
        .map(|lock| lock.seat_id)
        .collect();
    let tiers = queries::get_active_price_tiers(conn, schedule_id)?;

    let seats = seats
        .into_iter()
        .map(|seat| {
            let state = if booked.contains(&seat.id) {
                SeatState::Booked
            } else if locked.contains(&seat.id) {
                SeatState::Locked
            } else if seat.is_available {
                SeatState::Available
            } else {
                SeatState::Unavailable
            };
            SeatView {
                price: pricing::resolve_seat_price(seat.seat_type, &tiers, schedule.base_price),
                seat_id: seat.id,
                label: seat.label,
                seat_type: seat.seat_type,
                state,
            }
        })
        .collect();

    Ok(SeatMap { schedule_id, seats })
}
