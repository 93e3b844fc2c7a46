use std::sync::Arc;

use chrono::NaiveDateTime;
use rusqlite::Connection;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::db::{self, queries};
use crate::errors::{AppError, AppResult};
use crate::models::{
    Booking, BookingDetails, BookingSeat, BookingStatus, BookingSummary, Passenger,
    PassengerContact, PaymentStatus, Schedule, Seat,
};
use crate::services::locks::{self, load_bookable_schedule, validate_seat_selection, validate_session};
use crate::services::payments::{PaymentIntent, PaymentMetadata};
use crate::services::pnr::{self, MAX_PNR_ATTEMPTS};
use crate::services::pricing::{self, DiscountPolicy};
use crate::state::AppState;

#[derive(Debug, Clone, Deserialize)]
pub struct CreateBookingRequest {
    pub schedule_id: i64,
    pub seat_ids: Vec<i64>,
    pub session_id: String,
    pub contact: PassengerContact,
    #[serde(default)]
    pub passengers: Vec<Passenger>,
    #[serde(default)]
    pub discount_code: Option<String>,
}

/// What the client needs to complete payment with the provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentHandshake {
    pub payment_intent_id: String,
    pub client_secret: String,
    pub provider: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct BookingReceipt {
    pub booking: Booking,
    pub seats: Vec<BookingSeat>,
    pub payment: PaymentHandshake,
}

/// A validated and priced selection, ready to be written.
#[derive(Debug, Clone)]
pub struct BookingDraft {
    pub request: CreateBookingRequest,
    pub schedule: Schedule,
    pub seats: Vec<Seat>,
    pub seat_prices: Vec<(i64, Decimal)>,
    pub discount_amount: Decimal,
    pub amount_due: Decimal,
}

impl BookingDraft {
    fn summary(&self, pnr: &str) -> BookingSummary {
        BookingSummary {
            pnr: pnr.to_string(),
            contact: self.request.contact.clone(),
            origin: self.schedule.origin.clone(),
            destination: self.schedule.destination.clone(),
            departure_at: self.schedule.departure_at,
            seat_labels: self.seats.iter().map(|s| s.label.clone()).collect(),
            total_amount: self.amount_due,
        }
    }
}

fn validate_request(req: &CreateBookingRequest, max_seats: usize) -> AppResult<()> {
    validate_session(&req.session_id)?;
    validate_seat_selection(&req.seat_ids, max_seats)?;

    if req.contact.name.trim().is_empty() {
        return Err(AppError::InvalidRequest("contact name is required".into()));
    }
    if !req.contact.email.contains('@') {
        return Err(AppError::InvalidRequest("a valid contact email is required".into()));
    }
    if req.passengers.len() > req.seat_ids.len() {
        return Err(AppError::InvalidRequest(
            "more passengers than selected seats".into(),
        ));
    }
    for passenger in &req.passengers {
        if passenger.name.trim().is_empty() {
            return Err(AppError::InvalidRequest("passenger name is required".into()));
        }
        if let Some(seat_id) = passenger.seat_id {
            if !req.seat_ids.contains(&seat_id) {
                return Err(AppError::InvalidRequest(format!(
                    "passenger seat {seat_id} is not part of the booking"
                )));
            }
        }
    }
    Ok(())
}

/// Validates the request against the live locks and prices every seat.
pub fn prepare_booking(
    conn: &Connection,
    req: CreateBookingRequest,
    discounts: &dyn DiscountPolicy,
    max_seats: usize,
    now: NaiveDateTime,
) -> AppResult<BookingDraft> {
    validate_request(&req, max_seats)?;

    let schedule = load_bookable_schedule(conn, req.schedule_id, &now)?;
    locks::verify_session_locks(conn, req.schedule_id, &req.seat_ids, &req.session_id, &now)?;

    let seats = queries::get_seats_by_ids(conn, &req.seat_ids)?;
    if seats.len() != req.seat_ids.len() || seats.iter().any(|s| s.bus_id != schedule.bus_id) {
        return Err(AppError::InvalidRequest(format!(
            "seats do not belong to schedule {}",
            schedule.id
        )));
    }

    let tiers = queries::get_active_price_tiers(conn, schedule.id)?;
    let seat_prices = pricing::price_seats(&schedule, &seats, &tiers);
    let cart_total: Decimal = seat_prices.iter().map(|(_, price)| *price).sum();
    let (discount_amount, amount_due) =
        pricing::apply_discount(discounts, req.discount_code.as_deref(), cart_total);

    Ok(BookingDraft {
        request: req,
        schedule,
        seats,
        seat_prices,
        discount_amount,
        amount_due,
    })
}

/// Writes booking, seats, passengers and the pending payment in one transaction.
///
/// Locks and held seats are checked again inside the transaction since the
/// payment provider call happened outside it. `next_pnr` is asked for a new
/// code whenever the previous one collides with an existing booking.
pub fn persist_booking(
    conn: &mut Connection,
    draft: &BookingDraft,
    intent: &PaymentIntent,
    mut next_pnr: impl FnMut() -> String,
    now: NaiveDateTime,
) -> AppResult<(Booking, Vec<BookingSeat>)> {
    let req = &draft.request;

    db::run_in_transaction(conn, |tx| {
        locks::verify_session_locks(tx, req.schedule_id, &req.seat_ids, &req.session_id, &now)?;
        let held = queries::held_seat_ids(tx, req.schedule_id, &req.seat_ids)?;
        if !held.is_empty() {
            return Err(AppError::SeatUnavailable { seat_ids: held });
        }

        let mut booking = Booking {
            id: uuid::Uuid::new_v4().to_string(),
            pnr: String::new(),
            schedule_id: req.schedule_id,
            session_id: req.session_id.clone(),
            status: BookingStatus::Pending,
            payment_status: PaymentStatus::Pending,
            total_amount: draft.amount_due,
            discount_amount: draft.discount_amount,
            discount_code: req.discount_code.clone(),
            contact: req.contact.clone(),
            created_at: now,
            updated_at: now,
        };

        let mut attempt = 0;
        loop {
            attempt += 1;
            booking.pnr = next_pnr();
            match queries::insert_booking(tx, &booking) {
                Ok(()) => break,
                Err(e) if pnr::is_pnr_collision(&e) && attempt < MAX_PNR_ATTEMPTS => {
                    tracing::warn!(pnr = %booking.pnr, attempt, "pnr collision, regenerating");
                }
                Err(e) => return Err(e.into()),
            }
        }

        let seats: Vec<BookingSeat> = draft
            .seat_prices
            .iter()
            .map(|(seat_id, price)| BookingSeat {
                booking_id: booking.id.clone(),
                seat_id: *seat_id,
                price: *price,
            })
            .collect();
        for seat in &seats {
            queries::insert_booking_seat(tx, req.schedule_id, seat)?;
        }
        for passenger in &req.passengers {
            queries::insert_passenger(tx, &booking.id, passenger)?;
        }
        queries::insert_payment(
            tx,
            &booking.id,
            &intent.id,
            &intent.provider,
            draft.amount_due,
            &now,
        )?;

        Ok((booking, seats))
    })
}

/// Turns a locked seat selection into a pending booking with a payment intent.
///
/// The database is not held while the payment provider is called.
pub async fn create_booking(
    state: &Arc<AppState>,
    req: CreateBookingRequest,
    now: NaiveDateTime,
) -> AppResult<BookingReceipt> {
    let draft = {
        let conn = state.conn()?;
        prepare_booking(
            &conn,
            req,
            state.discounts.as_ref(),
            state.config.max_seats_per_booking,
            now,
        )?
    };

    let first_pnr = pnr::generate_pnr(&now);
    let metadata = PaymentMetadata {
        pnr: first_pnr.clone(),
        schedule_id: draft.schedule.id,
        session_id: draft.request.session_id.clone(),
        currency: state.config.currency.clone(),
        contact_email: draft.request.contact.email.clone(),
    };

    let intent = state
        .payments
        .create_payment_intent(draft.amount_due, &metadata)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, session_id = %draft.request.session_id, "payment intent creation failed");
            AppError::Payment(e.to_string())
        })?;

    let mut first = Some(first_pnr);
    let persisted = {
        let mut conn = state.conn()?;
        persist_booking(
            &mut conn,
            &draft,
            &intent,
            || first.take().unwrap_or_else(|| pnr::generate_pnr(&now)),
            now,
        )
    };

    let (booking, seats) = match persisted {
        Ok(created) => created,
        Err(e) => {
            tracing::warn!(
                error = %e,
                payment_intent_id = %intent.id,
                session_id = %draft.request.session_id,
                "booking not persisted, payment intent left unused"
            );
            return Err(e);
        }
    };

    tracing::info!(
        pnr = %booking.pnr,
        booking_id = %booking.id,
        schedule_id = booking.schedule_id,
        seats = ?draft.request.seat_ids,
        total = %booking.total_amount,
        provider = %intent.provider,
        "booking created"
    );

    state.notifier.dispatch(draft.summary(&booking.pnr));

    Ok(BookingReceipt {
        booking,
        seats,
        payment: PaymentHandshake {
            payment_intent_id: intent.id,
            client_secret: intent.client_secret,
            provider: intent.provider,
        },
    })
}

pub fn get_booking_details(conn: &Connection, pnr: &str) -> AppResult<BookingDetails> {
    let booking = queries::get_booking_by_pnr(conn, pnr)?
        .ok_or_else(|| AppError::NotFound(format!("booking {pnr}")))?;
    let seats = queries::get_booking_seats(conn, &booking.id)?;
    let passengers = queries::get_passengers(conn, &booking.id)?;
    let payments = queries::get_payments(conn, &booking.id)?;
    Ok(BookingDetails {
        booking,
        seats,
        passengers,
        payments,
    })
}
