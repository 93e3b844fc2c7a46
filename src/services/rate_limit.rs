use std::net::IpAddr;

use chrono::{Duration, NaiveDateTime, Timelike};
use rusqlite::Connection;

use crate::db::queries;
use crate::errors::{AppError, AppResult};

/// Start of the one-minute window containing `now`.
pub fn window_start(now: &NaiveDateTime) -> NaiveDateTime {
    now.with_second(0)
        .and_then(|t| t.with_nanosecond(0))
        .unwrap_or(*now)
}

/// Rate-limit key for a request. The peer address wins when the connection
/// exposes one, since session ids are chosen by the client.
pub fn client_identity(peer: Option<IpAddr>, session_id: &str) -> String {
    match peer {
        Some(ip) => format!("ip:{ip}"),
        None => format!("session:{session_id}"),
    }
}

/// Fixed-window counter per identity and endpoint, kept in the shared store.
/// A limit of zero or less disables the check.
pub fn check_rate_limit(
    conn: &Connection,
    identity: &str,
    endpoint: &str,
    limit_per_minute: i64,
    now: NaiveDateTime,
) -> AppResult<()> {
    if limit_per_minute <= 0 {
        return Ok(());
    }

    let count = queries::increment_request_count(conn, identity, endpoint, &window_start(&now))?;
    if count > limit_per_minute {
        tracing::warn!(identity = %identity, endpoint, count, "rate limit exceeded");
        return Err(AppError::RateLimited(format!(
            "too many {endpoint} requests, try again in a minute"
        )));
    }
    Ok(())
}

/// Drops windows that can no longer affect a decision.
pub fn prune_windows(conn: &Connection, now: NaiveDateTime) -> AppResult<usize> {
    Ok(queries::cleanup_old_windows(
        conn,
        &(window_start(&now) - Duration::minutes(1)),
    )?)
}
