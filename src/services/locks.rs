use std::collections::{BTreeSet, HashSet};

use chrono::{Duration, NaiveDateTime};
use rusqlite::{Connection, ErrorCode};

use crate::config::AppConfig;
use crate::db::{self, queries};
use crate::errors::{AppError, AppResult};
use crate::models::{LockGrant, Schedule};

#[derive(Debug, Clone)]
pub struct LockPolicy {
    pub ttl: Duration,
    /// Renewals never push a lock past `created_at + max_hold`.
    pub max_hold: Duration,
    pub max_seats: usize,
}

impl LockPolicy {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            ttl: config.lock_ttl(),
            max_hold: config.lock_max_hold(),
            max_seats: config.max_seats_per_booking,
        }
    }
}

impl Default for LockPolicy {
    fn default() -> Self {
        Self {
            ttl: Duration::minutes(5),
            max_hold: Duration::minutes(10),
            max_seats: 4,
        }
    }
}

/// Rejects empty, oversized or duplicated seat selections before the store is touched.
pub fn validate_seat_selection(seat_ids: &[i64], max_seats: usize) -> AppResult<()> {
    if seat_ids.is_empty() {
        return Err(AppError::InvalidRequest("at least one seat is required".into()));
    }
    if seat_ids.len() > max_seats {
        return Err(AppError::InvalidRequest(format!(
            "at most {max_seats} seats may be selected"
        )));
    }
    let unique: HashSet<i64> = seat_ids.iter().copied().collect();
    if unique.len() != seat_ids.len() {
        return Err(AppError::InvalidRequest("duplicate seat ids".into()));
    }
    Ok(())
}

pub(crate) fn validate_session(session_id: &str) -> AppResult<()> {
    if session_id.trim().is_empty() {
        return Err(AppError::InvalidRequest("session id is required".into()));
    }
    Ok(())
}

/// Loads the schedule and checks it is still open for sale.
pub(crate) fn load_bookable_schedule(
    conn: &Connection,
    schedule_id: i64,
    now: &NaiveDateTime,
) -> AppResult<Schedule> {
    let schedule = queries::get_schedule(conn, schedule_id)?
        .ok_or_else(|| AppError::NotFound(format!("schedule {schedule_id}")))?;

    if !schedule.is_active {
        return Err(AppError::ScheduleUnavailable(format!(
            "schedule {schedule_id} is not active"
        )));
    }
    if !schedule.is_bookable(*now) {
        return Err(AppError::ScheduleUnavailable(format!(
            "schedule {schedule_id} has already departed"
        )));
    }
    Ok(schedule)
}

/// Locks every requested seat to `session_id`, or none of them.
///
/// Runs as one transaction: sweep expired locks, drop the session's previous
/// selection, re-check each seat against held bookings, other sessions' live
/// locks and the administrative flag, then insert. Any conflict aborts the
/// whole transaction and names the conflicting seats.
pub fn acquire_locks(
    conn: &mut Connection,
    schedule_id: i64,
    seat_ids: &[i64],
    session_id: &str,
    policy: &LockPolicy,
    now: NaiveDateTime,
) -> AppResult<LockGrant> {
    validate_session(session_id)?;
    validate_seat_selection(seat_ids, policy.max_seats)?;

    let expires_at = now + policy.ttl;

    let grant = db::run_in_transaction(conn, |tx| {
        let schedule = load_bookable_schedule(tx, schedule_id, &now)?;

        let swept = queries::delete_expired_locks(tx, &now)?;
        if swept > 0 {
            tracing::debug!(swept, "swept expired seat locks");
        }
        queries::delete_locks_for_session(tx, session_id)?;

        let seats = queries::get_seats_by_ids(tx, seat_ids)?;
        let foreign: Vec<i64> = seat_ids
            .iter()
            .copied()
            .filter(|id| !seats.iter().any(|s| s.id == *id && s.bus_id == schedule.bus_id))
            .collect();
        if !foreign.is_empty() {
            return Err(AppError::InvalidRequest(format!(
                "seats {foreign:?} do not belong to schedule {schedule_id}"
            )));
        }

        let mut conflicts: BTreeSet<i64> = seats
            .iter()
            .filter(|s| !s.is_available)
            .map(|s| s.id)
            .collect();
        conflicts.extend(queries::held_seat_ids(tx, schedule_id, seat_ids)?);
        conflicts.extend(
            queries::get_live_locks_for_schedule(tx, schedule_id, &now)?
                .into_iter()
                .filter(|lock| seat_ids.contains(&lock.seat_id))
                .map(|lock| lock.seat_id),
        );

        if !conflicts.is_empty() {
            return Err(AppError::SeatUnavailable {
                seat_ids: conflicts.into_iter().collect(),
            });
        }

        for seat_id in seat_ids {
            match queries::insert_lock(tx, schedule_id, *seat_id, session_id, &expires_at, &now) {
                Ok(_) => {}
                Err(rusqlite::Error::SqliteFailure(e, _)) if e.code == ErrorCode::ConstraintViolation => {
                    return Err(AppError::SeatUnavailable {
                        seat_ids: vec![*seat_id],
                    });
                }
                Err(e) => return Err(e.into()),
            }
        }

        let mut locked = seat_ids.to_vec();
        locked.sort_unstable();
        Ok(LockGrant {
            schedule_id,
            seat_ids: locked,
            expires_at,
        })
    });

    match &grant {
        Ok(g) => tracing::info!(
            session_id = %session_id,
            schedule_id,
            seats = ?g.seat_ids,
            expires_at = %g.expires_at,
            "seat locks acquired"
        ),
        Err(AppError::SeatUnavailable { seat_ids }) => tracing::info!(
            session_id = %session_id,
            schedule_id,
            conflicts = ?seat_ids,
            "seat lock contention"
        ),
        Err(_) => {}
    }

    grant
}

/// Drops every live lock held by the session. Releasing nothing is not an error.
pub fn release_locks(conn: &Connection, session_id: &str, now: NaiveDateTime) -> AppResult<usize> {
    validate_session(session_id)?;
    let released = queries::delete_live_locks_for_session(conn, session_id, &now)?;
    tracing::info!(session_id = %session_id, released, "seat locks released");
    Ok(released)
}

/// Pushes out expiry of the session's live locks, returning how many were renewed.
///
/// Expiry is clamped to the lock's creation time plus `policy.max_hold`, so a
/// session cannot keep a seat from other shoppers by renewing forever. Once a
/// lock has reached that bound it is counted but not extended.
pub fn renew_locks(
    conn: &mut Connection,
    session_id: &str,
    extra_minutes: i64,
    policy: &LockPolicy,
    now: NaiveDateTime,
) -> AppResult<usize> {
    validate_session(session_id)?;
    let max = policy.ttl.num_minutes();
    if extra_minutes < 1 || extra_minutes > max {
        return Err(AppError::InvalidRequest(format!(
            "extra minutes must be between 1 and {max}"
        )));
    }

    let renewed = db::run_in_transaction(conn, |tx| {
        queries::delete_expired_locks(tx, &now)?;
        queries::extend_live_locks(tx, session_id, extra_minutes, policy.max_hold.num_minutes(), &now)
    })?;

    tracing::info!(session_id = %session_id, renewed, extra_minutes, "seat locks renewed");
    Ok(renewed)
}

/// Fails with `LockExpired` naming every seat the session does not hold a live lock on.
pub fn verify_session_locks(
    conn: &Connection,
    schedule_id: i64,
    seat_ids: &[i64],
    session_id: &str,
    now: &NaiveDateTime,
) -> AppResult<()> {
    let held: HashSet<i64> = queries::get_live_locks_for_session(conn, session_id, now)?
        .into_iter()
        .filter(|lock| lock.schedule_id == schedule_id)
        .map(|lock| lock.seat_id)
        .collect();

    let mut missing: Vec<i64> = seat_ids
        .iter()
        .copied()
        .filter(|id| !held.contains(id))
        .collect();

    if missing.is_empty() {
        Ok(())
    } else {
        missing.sort_unstable();
        Err(AppError::LockExpired { seat_ids: missing })
    }
}
