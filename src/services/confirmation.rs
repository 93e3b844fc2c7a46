use chrono::{Duration, NaiveDateTime};
use rusqlite::{Connection, Transaction};
use serde::Serialize;

use crate::db::{self, queries};
use crate::errors::{AppError, AppResult};
use crate::models::{Booking, BookingStatus, PaymentStatus};

#[derive(Debug, Clone, Serialize)]
pub struct ConfirmationResult {
    pub booking: Booking,
    /// False when the event was a duplicate or arrived for a settled booking.
    pub changed: bool,
}

fn find_booking(tx: &Transaction<'_>, intent_id: &str) -> AppResult<Booking> {
    queries::find_booking_by_transaction_id(tx, intent_id)?
        .ok_or_else(|| AppError::UnknownPayment(intent_id.to_string()))
}

fn release_booking_locks(tx: &Transaction<'_>, booking: &Booking) -> AppResult<usize> {
    let seat_ids: Vec<i64> = queries::get_booking_seats(tx, &booking.id)?
        .into_iter()
        .map(|s| s.seat_id)
        .collect();
    Ok(queries::delete_locks_for_seats(tx, booking.schedule_id, &seat_ids)?)
}

fn reload(tx: &Transaction<'_>, booking_id: &str) -> AppResult<Booking> {
    queries::get_booking_by_id(tx, booking_id)?
        .ok_or_else(|| AppError::Storage(format!("booking {booking_id} vanished mid-transaction")))
}

/// PENDING -> CONFIRMED / COMPLETED, and the booking's seat locks are dropped.
///
/// Duplicate deliveries for an already confirmed booking change nothing.
pub fn on_payment_succeeded(
    conn: &mut Connection,
    intent_id: &str,
    now: NaiveDateTime,
) -> AppResult<ConfirmationResult> {
    let result = db::run_in_transaction(conn, |tx| {
        let booking = find_booking(tx, intent_id)?;

        match booking.status {
            BookingStatus::Confirmed => {
                return Ok(ConfirmationResult {
                    booking,
                    changed: false,
                });
            }
            BookingStatus::Cancelled => {
                queries::update_payment_status(tx, intent_id, PaymentStatus::Completed, &now)?;
                tracing::error!(
                    pnr = %booking.pnr,
                    payment_intent_id = %intent_id,
                    "payment succeeded for a cancelled booking, refund required"
                );
                return Ok(ConfirmationResult {
                    booking,
                    changed: false,
                });
            }
            BookingStatus::Pending => {}
        }

        let conflicts = queries::confirmed_conflicts(tx, &booking.id)?;
        if !conflicts.is_empty() {
            return Err(AppError::SeatUnavailable { seat_ids: conflicts });
        }

        queries::update_booking_status(
            tx,
            &booking.id,
            BookingStatus::Confirmed,
            PaymentStatus::Completed,
            &now,
        )?;
        queries::update_payment_status(tx, intent_id, PaymentStatus::Completed, &now)?;
        let released = release_booking_locks(tx, &booking)?;
        tracing::debug!(pnr = %booking.pnr, released, "released locks of confirmed booking");

        Ok(ConfirmationResult {
            booking: reload(tx, &booking.id)?,
            changed: true,
        })
    });

    match &result {
        Ok(r) if r.changed => {
            tracing::info!(pnr = %r.booking.pnr, payment_intent_id = %intent_id, "booking confirmed")
        }
        Ok(r) => tracing::info!(
            pnr = %r.booking.pnr,
            status = r.booking.status.as_str(),
            "payment success ignored, booking already settled"
        ),
        Err(AppError::SeatUnavailable { seat_ids }) => tracing::error!(
            payment_intent_id = %intent_id,
            conflicts = ?seat_ids,
            "paid booking overlaps a confirmed booking, left pending"
        ),
        Err(_) => {}
    }
    result
}

/// PENDING -> CANCELLED / FAILED, freeing the seats straight away.
pub fn on_payment_failed_or_cancelled(
    conn: &mut Connection,
    intent_id: &str,
    now: NaiveDateTime,
) -> AppResult<ConfirmationResult> {
    let result: ConfirmationResult = db::run_in_transaction::<_, AppError, _>(conn, |tx| {
        let booking = find_booking(tx, intent_id)?;
        if booking.status != BookingStatus::Pending {
            return Ok(ConfirmationResult {
                booking,
                changed: false,
            });
        }

        queries::update_booking_status(
            tx,
            &booking.id,
            BookingStatus::Cancelled,
            PaymentStatus::Failed,
            &now,
        )?;
        queries::update_payment_status(tx, intent_id, PaymentStatus::Failed, &now)?;
        release_booking_locks(tx, &booking)?;

        Ok(ConfirmationResult {
            booking: reload(tx, &booking.id)?,
            changed: true,
        })
    })?;

    if result.changed {
        tracing::info!(pnr = %result.booking.pnr, payment_intent_id = %intent_id, "booking cancelled after failed payment");
    }
    Ok(result)
}

/// Cancels PENDING bookings older than `ttl` whose payment never settled.
pub fn cancel_abandoned_bookings(
    conn: &mut Connection,
    ttl: Duration,
    now: NaiveDateTime,
) -> AppResult<usize> {
    let cutoff = now - ttl;
    db::run_in_transaction(conn, |tx| {
        let stale = queries::get_stale_pending_bookings(tx, &cutoff)?;
        for booking in &stale {
            queries::update_booking_status(
                tx,
                &booking.id,
                BookingStatus::Cancelled,
                PaymentStatus::Failed,
                &now,
            )?;
            queries::fail_pending_payments(tx, &booking.id, &now)?;
            release_booking_locks(tx, booking)?;
            tracing::info!(pnr = %booking.pnr, created_at = %booking.created_at, "abandoned booking cancelled");
        }
        Ok(stale.len())
    })
}
