use std::collections::HashSet;
use std::str::FromStr;

use chrono::NaiveDateTime;
use rusqlite::types::Type;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension};
use rust_decimal::Decimal;

use crate::models::{
    Booking, BookingSeat, BookingStatus, NewSchedule, Passenger, PassengerContact, Payment,
    PaymentStatus, PriceTier, Schedule, Seat, SeatLock, SeatType,
};

pub const TS_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

pub fn fmt_ts(ts: &NaiveDateTime) -> String {
    ts.format(TS_FORMAT).to_string()
}

fn parse_ts(idx: usize, s: &str) -> rusqlite::Result<NaiveDateTime> {
    NaiveDateTime::parse_from_str(s, TS_FORMAT)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

fn parse_decimal(idx: usize, s: &str) -> rusqlite::Result<Decimal> {
    Decimal::from_str(s)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

/// `?N, ?N+1, ...` placeholders for an `IN (...)` list.
fn placeholders(count: usize, first: usize) -> String {
    (first..first + count)
        .map(|i| format!("?{i}"))
        .collect::<Vec<_>>()
        .join(", ")
}

// ── Inventory ──

pub fn insert_bus(conn: &Connection, registration: &str, name: &str) -> rusqlite::Result<i64> {
    conn.execute(
        "INSERT INTO buses (registration, name) VALUES (?1, ?2)",
        params![registration, name],
    )?;
    Ok(conn.last_insert_rowid())
}

pub fn insert_schedule(conn: &Connection, schedule: &NewSchedule) -> rusqlite::Result<i64> {
    conn.execute(
        "INSERT INTO schedules (bus_id, origin, destination, departure_at, arrival_at, base_price, is_active)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, 1)",
        params![
            schedule.bus_id,
            schedule.origin,
            schedule.destination,
            fmt_ts(&schedule.departure_at),
            fmt_ts(&schedule.arrival_at),
            schedule.base_price.to_string(),
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

pub fn insert_seat(
    conn: &Connection,
    bus_id: i64,
    label: &str,
    seat_type: SeatType,
) -> rusqlite::Result<i64> {
    conn.execute(
        "INSERT INTO seats (bus_id, label, seat_type, is_available) VALUES (?1, ?2, ?3, 1)",
        params![bus_id, label, seat_type.as_str()],
    )?;
    Ok(conn.last_insert_rowid())
}

pub fn set_seat_available(conn: &Connection, seat_id: i64, available: bool) -> rusqlite::Result<bool> {
    let count = conn.execute(
        "UPDATE seats SET is_available = ?1 WHERE id = ?2",
        params![available as i32, seat_id],
    )?;
    Ok(count > 0)
}

pub fn upsert_price_tier(
    conn: &Connection,
    schedule_id: i64,
    seat_type: SeatType,
    price: Decimal,
) -> rusqlite::Result<()> {
    conn.execute(
        "INSERT INTO price_tiers (schedule_id, seat_type, price, is_active) VALUES (?1, ?2, ?3, 1)
         ON CONFLICT(schedule_id, seat_type) DO UPDATE SET price = excluded.price, is_active = 1",
        params![schedule_id, seat_type.as_str(), price.to_string()],
    )?;
    Ok(())
}

pub fn update_schedule_base_price(
    conn: &Connection,
    schedule_id: i64,
    price: Decimal,
) -> rusqlite::Result<bool> {
    let count = conn.execute(
        "UPDATE schedules SET base_price = ?1 WHERE id = ?2",
        params![price.to_string(), schedule_id],
    )?;
    Ok(count > 0)
}

pub fn set_schedule_active(conn: &Connection, schedule_id: i64, active: bool) -> rusqlite::Result<bool> {
    let count = conn.execute(
        "UPDATE schedules SET is_active = ?1 WHERE id = ?2",
        params![active as i32, schedule_id],
    )?;
    Ok(count > 0)
}

pub fn get_schedule(conn: &Connection, id: i64) -> rusqlite::Result<Option<Schedule>> {
    conn.query_row(
        "SELECT id, bus_id, origin, destination, departure_at, arrival_at, base_price, is_active
         FROM schedules WHERE id = ?1",
        params![id],
        |row| {
            let departure_at: String = row.get(4)?;
            let arrival_at: String = row.get(5)?;
            let base_price: String = row.get(6)?;
            Ok(Schedule {
                id: row.get(0)?,
                bus_id: row.get(1)?,
                origin: row.get(2)?,
                destination: row.get(3)?,
                departure_at: parse_ts(4, &departure_at)?,
                arrival_at: parse_ts(5, &arrival_at)?,
                base_price: parse_decimal(6, &base_price)?,
                is_active: row.get::<_, i32>(7)? != 0,
            })
        },
    )
    .optional()
}

fn parse_seat_row(row: &rusqlite::Row) -> rusqlite::Result<Seat> {
    let seat_type: String = row.get(3)?;
    Ok(Seat {
        id: row.get(0)?,
        bus_id: row.get(1)?,
        label: row.get(2)?,
        seat_type: SeatType::parse(&seat_type),
        is_available: row.get::<_, i32>(4)? != 0,
    })
}

pub fn get_seats_for_bus(conn: &Connection, bus_id: i64) -> rusqlite::Result<Vec<Seat>> {
    let mut stmt = conn.prepare(
        "SELECT id, bus_id, label, seat_type, is_available FROM seats WHERE bus_id = ?1 ORDER BY id ASC",
    )?;
    let rows = stmt.query_map(params![bus_id], parse_seat_row)?;
    rows.collect()
}

pub fn get_seats_by_ids(conn: &Connection, seat_ids: &[i64]) -> rusqlite::Result<Vec<Seat>> {
    if seat_ids.is_empty() {
        return Ok(vec![]);
    }
    let sql = format!(
        "SELECT id, bus_id, label, seat_type, is_available FROM seats WHERE id IN ({}) ORDER BY id ASC",
        placeholders(seat_ids.len(), 1)
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(params_from_iter(seat_ids.iter()), parse_seat_row)?;
    rows.collect()
}

pub fn get_active_price_tiers(conn: &Connection, schedule_id: i64) -> rusqlite::Result<Vec<PriceTier>> {
    let mut stmt = conn.prepare(
        "SELECT schedule_id, seat_type, price, is_active FROM price_tiers
         WHERE schedule_id = ?1 AND is_active = 1",
    )?;
    let rows = stmt.query_map(params![schedule_id], |row| {
        let seat_type: String = row.get(1)?;
        let price: String = row.get(2)?;
        Ok(PriceTier {
            schedule_id: row.get(0)?,
            seat_type: SeatType::parse(&seat_type),
            price: parse_decimal(2, &price)?,
            is_active: row.get::<_, i32>(3)? != 0,
        })
    })?;
    rows.collect()
}

// ── Seat Locks ──

fn parse_lock_row(row: &rusqlite::Row) -> rusqlite::Result<SeatLock> {
    let expires_at: String = row.get(4)?;
    let created_at: String = row.get(5)?;
    Ok(SeatLock {
        id: row.get(0)?,
        schedule_id: row.get(1)?,
        seat_id: row.get(2)?,
        session_id: row.get(3)?,
        expires_at: parse_ts(4, &expires_at)?,
        created_at: parse_ts(5, &created_at)?,
    })
}

pub fn delete_expired_locks(conn: &Connection, now: &NaiveDateTime) -> rusqlite::Result<usize> {
    conn.execute(
        "DELETE FROM seat_locks WHERE expires_at <= ?1",
        params![fmt_ts(now)],
    )
}

pub fn delete_locks_for_session(conn: &Connection, session_id: &str) -> rusqlite::Result<usize> {
    conn.execute(
        "DELETE FROM seat_locks WHERE session_id = ?1",
        params![session_id],
    )
}

pub fn delete_live_locks_for_session(
    conn: &Connection,
    session_id: &str,
    now: &NaiveDateTime,
) -> rusqlite::Result<usize> {
    conn.execute(
        "DELETE FROM seat_locks WHERE session_id = ?1 AND expires_at > ?2",
        params![session_id, fmt_ts(now)],
    )
}

pub fn delete_locks_for_seats(
    conn: &Connection,
    schedule_id: i64,
    seat_ids: &[i64],
) -> rusqlite::Result<usize> {
    if seat_ids.is_empty() {
        return Ok(0);
    }
    let sql = format!(
        "DELETE FROM seat_locks WHERE schedule_id = ?1 AND seat_id IN ({})",
        placeholders(seat_ids.len(), 2)
    );
    let mut values: Vec<i64> = Vec::with_capacity(seat_ids.len() + 1);
    values.push(schedule_id);
    values.extend_from_slice(seat_ids);
    conn.execute(&sql, params_from_iter(values.iter()))
}

pub fn insert_lock(
    conn: &Connection,
    schedule_id: i64,
    seat_id: i64,
    session_id: &str,
    expires_at: &NaiveDateTime,
    now: &NaiveDateTime,
) -> rusqlite::Result<i64> {
    conn.execute(
        "INSERT INTO seat_locks (schedule_id, seat_id, session_id, expires_at, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![schedule_id, seat_id, session_id, fmt_ts(expires_at), fmt_ts(now)],
    )?;
    Ok(conn.last_insert_rowid())
}

pub fn get_live_locks_for_schedule(
    conn: &Connection,
    schedule_id: i64,
    now: &NaiveDateTime,
) -> rusqlite::Result<Vec<SeatLock>> {
    let mut stmt = conn.prepare(
        "SELECT id, schedule_id, seat_id, session_id, expires_at, created_at
         FROM seat_locks WHERE schedule_id = ?1 AND expires_at > ?2 ORDER BY seat_id ASC",
    )?;
    let rows = stmt.query_map(params![schedule_id, fmt_ts(now)], parse_lock_row)?;
    rows.collect()
}

pub fn get_live_locks_for_session(
    conn: &Connection,
    session_id: &str,
    now: &NaiveDateTime,
) -> rusqlite::Result<Vec<SeatLock>> {
    let mut stmt = conn.prepare(
        "SELECT id, schedule_id, seat_id, session_id, expires_at, created_at
         FROM seat_locks WHERE session_id = ?1 AND expires_at > ?2 ORDER BY seat_id ASC",
    )?;
    let rows = stmt.query_map(params![session_id, fmt_ts(now)], parse_lock_row)?;
    rows.collect()
}

/// Pushes every live lock of the session out by `extra_minutes`, but never past
/// `created_at + max_hold_minutes`.
pub fn extend_live_locks(
    conn: &Connection,
    session_id: &str,
    extra_minutes: i64,
    max_hold_minutes: i64,
    now: &NaiveDateTime,
) -> rusqlite::Result<usize> {
    conn.execute(
        "UPDATE seat_locks
         SET expires_at = MAX(expires_at, MIN(datetime(expires_at, ?1), datetime(created_at, ?2)))
         WHERE session_id = ?3 AND expires_at > ?4",
        params![
            format!("+{extra_minutes} minutes"),
            format!("+{max_hold_minutes} minutes"),
            session_id,
            fmt_ts(now)
        ],
    )
}

// ── Bookings ──

const BOOKING_COLUMNS: &str = "id, pnr, schedule_id, session_id, status, payment_status, total_amount, \
     discount_amount, discount_code, contact_name, contact_email, contact_phone, created_at, updated_at";

fn parse_booking_row(row: &rusqlite::Row) -> rusqlite::Result<Booking> {
    let status: String = row.get(4)?;
    let payment_status: String = row.get(5)?;
    let total_amount: String = row.get(6)?;
    let discount_amount: String = row.get(7)?;
    let created_at: String = row.get(12)?;
    let updated_at: String = row.get(13)?;

    Ok(Booking {
        id: row.get(0)?,
        pnr: row.get(1)?,
        schedule_id: row.get(2)?,
        session_id: row.get(3)?,
        status: BookingStatus::parse(&status),
        payment_status: PaymentStatus::parse(&payment_status),
        total_amount: parse_decimal(6, &total_amount)?,
        discount_amount: parse_decimal(7, &discount_amount)?,
        discount_code: row.get(8)?,
        contact: PassengerContact {
            name: row.get(9)?,
            email: row.get(10)?,
            phone: row.get(11)?,
        },
        created_at: parse_ts(12, &created_at)?,
        updated_at: parse_ts(13, &updated_at)?,
    })
}

/// Seats among `seat_ids` already held by a pending or confirmed booking on the schedule.
pub fn held_seat_ids(
    conn: &Connection,
    schedule_id: i64,
    seat_ids: &[i64],
) -> rusqlite::Result<Vec<i64>> {
    if seat_ids.is_empty() {
        return Ok(vec![]);
    }
    let sql = format!(
        "SELECT DISTINCT bs.seat_id FROM booking_seats bs
         INNER JOIN bookings b ON b.id = bs.booking_id
         WHERE bs.schedule_id = ?1 AND b.status IN ('PENDING', 'CONFIRMED')
           AND bs.seat_id IN ({})
         ORDER BY bs.seat_id ASC",
        placeholders(seat_ids.len(), 2)
    );
    let mut values: Vec<i64> = Vec::with_capacity(seat_ids.len() + 1);
    values.push(schedule_id);
    values.extend_from_slice(seat_ids);
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(params_from_iter(values.iter()), |row| row.get(0))?;
    rows.collect()
}

pub fn held_seat_ids_for_schedule(conn: &Connection, schedule_id: i64) -> rusqlite::Result<HashSet<i64>> {
    let mut stmt = conn.prepare(
        "SELECT DISTINCT bs.seat_id FROM booking_seats bs
         INNER JOIN bookings b ON b.id = bs.booking_id
         WHERE bs.schedule_id = ?1 AND b.status IN ('PENDING', 'CONFIRMED')",
    )?;
    let rows = stmt.query_map(params![schedule_id], |row| row.get(0))?;
    rows.collect()
}

/// Seats of `booking_id` that some other confirmed booking on the same schedule also holds.
pub fn confirmed_conflicts(conn: &Connection, booking_id: &str) -> rusqlite::Result<Vec<i64>> {
    let mut stmt = conn.prepare(
        "SELECT DISTINCT mine.seat_id FROM booking_seats mine
         INNER JOIN booking_seats other
            ON other.schedule_id = mine.schedule_id AND other.seat_id = mine.seat_id
         INNER JOIN bookings ob ON ob.id = other.booking_id
         WHERE mine.booking_id = ?1 AND other.booking_id != ?1 AND ob.status = 'CONFIRMED'
         ORDER BY mine.seat_id ASC",
    )?;
    let rows = stmt.query_map(params![booking_id], |row| row.get(0))?;
    rows.collect()
}

pub fn insert_booking(conn: &Connection, booking: &Booking) -> rusqlite::Result<()> {
    conn.execute(
        "INSERT INTO bookings (id, pnr, schedule_id, session_id, status, payment_status, total_amount,
            discount_amount, discount_code, contact_name, contact_email, contact_phone, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)",
        params![
            booking.id,
            booking.pnr,
            booking.schedule_id,
            booking.session_id,
            booking.status.as_str(),
            booking.payment_status.as_str(),
            booking.total_amount.to_string(),
            booking.discount_amount.to_string(),
            booking.discount_code,
            booking.contact.name,
            booking.contact.email,
            booking.contact.phone,
            fmt_ts(&booking.created_at),
            fmt_ts(&booking.updated_at),
        ],
    )?;
    Ok(())
}

pub fn insert_booking_seat(
    conn: &Connection,
    schedule_id: i64,
    seat: &BookingSeat,
) -> rusqlite::Result<()> {
    conn.execute(
        "INSERT INTO booking_seats (booking_id, schedule_id, seat_id, price) VALUES (?1, ?2, ?3, ?4)",
        params![seat.booking_id, schedule_id, seat.seat_id, seat.price.to_string()],
    )?;
    Ok(())
}

pub fn insert_passenger(conn: &Connection, booking_id: &str, passenger: &Passenger) -> rusqlite::Result<i64> {
    conn.execute(
        "INSERT INTO passengers (booking_id, name, age, gender, seat_id) VALUES (?1, ?2, ?3, ?4, ?5)",
        params![
            booking_id,
            passenger.name,
            passenger.age,
            passenger.gender,
            passenger.seat_id
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

pub fn get_booking_by_id(conn: &Connection, id: &str) -> rusqlite::Result<Option<Booking>> {
    let sql = format!("SELECT {BOOKING_COLUMNS} FROM bookings WHERE id = ?1");
    conn.query_row(&sql, params![id], parse_booking_row).optional()
}

pub fn get_booking_by_pnr(conn: &Connection, pnr: &str) -> rusqlite::Result<Option<Booking>> {
    let sql = format!("SELECT {BOOKING_COLUMNS} FROM bookings WHERE pnr = ?1");
    conn.query_row(&sql, params![pnr], parse_booking_row).optional()
}

pub fn find_booking_by_transaction_id(
    conn: &Connection,
    transaction_id: &str,
) -> rusqlite::Result<Option<Booking>> {
    let sql = format!(
        "SELECT {BOOKING_COLUMNS} FROM bookings
         WHERE id = (SELECT booking_id FROM payments WHERE transaction_id = ?1)"
    );
    conn.query_row(&sql, params![transaction_id], parse_booking_row)
        .optional()
}

pub fn update_booking_status(
    conn: &Connection,
    id: &str,
    status: BookingStatus,
    payment_status: PaymentStatus,
    now: &NaiveDateTime,
) -> rusqlite::Result<bool> {
    let count = conn.execute(
        "UPDATE bookings SET status = ?1, payment_status = ?2, updated_at = ?3 WHERE id = ?4",
        params![status.as_str(), payment_status.as_str(), fmt_ts(now), id],
    )?;
    Ok(count > 0)
}

pub fn get_booking_seats(conn: &Connection, booking_id: &str) -> rusqlite::Result<Vec<BookingSeat>> {
    let mut stmt = conn.prepare(
        "SELECT booking_id, seat_id, price FROM booking_seats WHERE booking_id = ?1 ORDER BY seat_id ASC",
    )?;
    let rows = stmt.query_map(params![booking_id], |row| {
        let price: String = row.get(2)?;
        Ok(BookingSeat {
            booking_id: row.get(0)?,
            seat_id: row.get(1)?,
            price: parse_decimal(2, &price)?,
        })
    })?;
    rows.collect()
}

pub fn get_passengers(conn: &Connection, booking_id: &str) -> rusqlite::Result<Vec<Passenger>> {
    let mut stmt = conn.prepare(
        "SELECT name, age, gender, seat_id FROM passengers WHERE booking_id = ?1 ORDER BY id ASC",
    )?;
    let rows = stmt.query_map(params![booking_id], |row| {
        Ok(Passenger {
            name: row.get(0)?,
            age: row.get(1)?,
            gender: row.get(2)?,
            seat_id: row.get(3)?,
        })
    })?;
    rows.collect()
}

/// Pending bookings created before `cutoff`, oldest first.
pub fn get_stale_pending_bookings(
    conn: &Connection,
    cutoff: &NaiveDateTime,
) -> rusqlite::Result<Vec<Booking>> {
    let sql = format!(
        "SELECT {BOOKING_COLUMNS} FROM bookings
         WHERE status = 'PENDING' AND created_at < ?1 ORDER BY created_at ASC"
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(params![fmt_ts(cutoff)], parse_booking_row)?;
    rows.collect()
}

pub fn get_recent_bookings(
    conn: &Connection,
    status_filter: Option<BookingStatus>,
    limit: i64,
) -> rusqlite::Result<Vec<Booking>> {
    match status_filter {
        Some(status) => {
            let sql = format!(
                "SELECT {BOOKING_COLUMNS} FROM bookings WHERE status = ?1 ORDER BY created_at DESC LIMIT ?2"
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt.query_map(params![status.as_str(), limit], parse_booking_row)?;
            rows.collect()
        }
        None => {
            let sql = format!("SELECT {BOOKING_COLUMNS} FROM bookings ORDER BY created_at DESC LIMIT ?1");
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt.query_map(params![limit], parse_booking_row)?;
            rows.collect()
        }
    }
}

// ── Payments ──

pub fn insert_payment(
    conn: &Connection,
    booking_id: &str,
    transaction_id: &str,
    provider: &str,
    amount: Decimal,
    now: &NaiveDateTime,
) -> rusqlite::Result<i64> {
    conn.execute(
        "INSERT INTO payments (booking_id, transaction_id, provider, amount, status, created_at)
         VALUES (?1, ?2, ?3, ?4, 'PENDING', ?5)",
        params![booking_id, transaction_id, provider, amount.to_string(), fmt_ts(now)],
    )?;
    Ok(conn.last_insert_rowid())
}

pub fn update_payment_status(
    conn: &Connection,
    transaction_id: &str,
    status: PaymentStatus,
    processed_at: &NaiveDateTime,
) -> rusqlite::Result<usize> {
    conn.execute(
        "UPDATE payments SET status = ?1, processed_at = ?2 WHERE transaction_id = ?3",
        params![status.as_str(), fmt_ts(processed_at), transaction_id],
    )
}

/// Fails every still-pending payment attempt of a booking.
pub fn fail_pending_payments(
    conn: &Connection,
    booking_id: &str,
    processed_at: &NaiveDateTime,
) -> rusqlite::Result<usize> {
    conn.execute(
        "UPDATE payments SET status = 'FAILED', processed_at = ?1
         WHERE booking_id = ?2 AND status = 'PENDING'",
        params![fmt_ts(processed_at), booking_id],
    )
}

pub fn get_payments(conn: &Connection, booking_id: &str) -> rusqlite::Result<Vec<Payment>> {
    let mut stmt = conn.prepare(
        "SELECT id, booking_id, transaction_id, provider, amount, status, processed_at, created_at
         FROM payments WHERE booking_id = ?1 ORDER BY id ASC",
    )?;
    let rows = stmt.query_map(params![booking_id], |row| {
        let amount: String = row.get(4)?;
        let status: String = row.get(5)?;
        let processed_at: Option<String> = row.get(6)?;
        let created_at: String = row.get(7)?;
        Ok(Payment {
            id: row.get(0)?,
            booking_id: row.get(1)?,
            transaction_id: row.get(2)?,
            provider: row.get(3)?,
            amount: parse_decimal(4, &amount)?,
            status: PaymentStatus::parse(&status),
            processed_at: processed_at.as_deref().map(|s| parse_ts(6, s)).transpose()?,
            created_at: parse_ts(7, &created_at)?,
        })
    })?;
    rows.collect()
}

// ── Rate Limits ──

/// Atomically bumps the counter for the window and returns its new value.
pub fn increment_request_count(
    conn: &Connection,
    identity: &str,
    endpoint: &str,
    window_start: &NaiveDateTime,
) -> rusqlite::Result<i64> {
    conn.query_row(
        "INSERT INTO rate_limits (identity, endpoint, window_start, request_count)
         VALUES (?1, ?2, ?3, 1)
         ON CONFLICT(identity, endpoint, window_start) DO UPDATE SET request_count = request_count + 1
         RETURNING request_count",
        params![identity, endpoint, fmt_ts(window_start)],
        |row| row.get(0),
    )
}

pub fn cleanup_old_windows(conn: &Connection, cutoff: &NaiveDateTime) -> rusqlite::Result<usize> {
    conn.execute(
        "DELETE FROM rate_limits WHERE window_start < ?1",
        params![fmt_ts(cutoff)],
    )
}
