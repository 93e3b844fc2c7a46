use std::sync::Arc;
use std::time::Duration;

use chrono::{NaiveDateTime, Utc};
use serde::Serialize;

use crate::db::queries;
use crate::errors::AppResult;
use crate::services::{confirmation, rate_limit};
use crate::state::AppState;

#[derive(Debug, Default, Clone, Serialize, PartialEq, Eq)]
pub struct SweepReport {
    pub expired_locks: usize,
    pub abandoned_bookings: usize,
    pub rate_limit_windows: usize,
}

/// One housekeeping pass. Lock expiry is also enforced lazily on every read
/// and write, so this only keeps the tables small and frees seats held by
/// bookings whose payment never arrived.
pub fn sweep_once(state: &AppState, now: NaiveDateTime) -> AppResult<SweepReport> {
    let mut conn = state.conn()?;
    let expired_locks = queries::delete_expired_locks(&conn, &now)?;
    let abandoned_bookings =
        confirmation::cancel_abandoned_bookings(&mut conn, state.config.pending_booking_ttl(), now)?;
    let rate_limit_windows = rate_limit::prune_windows(&conn, now)?;

    Ok(SweepReport {
        expired_locks,
        abandoned_bookings,
        rate_limit_windows,
    })
}

pub fn spawn_sweeper(state: Arc<AppState>) -> tokio::task::JoinHandle<()> {
    let period = Duration::from_secs(state.config.sweep_interval_secs.max(1));
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(period);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            interval.tick().await;
            match sweep_once(&state, Utc::now().naive_utc()) {
                Ok(report) if report != SweepReport::default() => {
                    tracing::info!(
                        expired_locks = report.expired_locks,
                        abandoned_bookings = report.abandoned_bookings,
                        rate_limit_windows = report.rate_limit_windows,
                        "sweep completed"
                    );
                }
                Ok(_) => {}
                Err(e) => tracing::error!(error = %e, "sweep failed"),
            }
        }
    })
}
