use chrono::NaiveDateTime;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::payment::{Payment, PaymentStatus};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BookingStatus {
    Pending,
    Confirmed,
    Cancelled,
}

impl BookingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BookingStatus::Pending => "PENDING",
            BookingStatus::Confirmed => "CONFIRMED",
            BookingStatus::Cancelled => "CANCELLED",
        }
    }

    pub fn parse(s: &str) -> Self {
        match s {
            "CONFIRMED" => BookingStatus::Confirmed,
            "CANCELLED" => BookingStatus::Cancelled,
            _ => BookingStatus::Pending,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PassengerContact {
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Passenger {
    pub name: String,
    pub age: Option<i32>,
    pub gender: Option<String>,
    pub seat_id: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Booking {
    pub id: String,
    pub pnr: String,
    pub schedule_id: i64,
    pub session_id: String,
    pub status: BookingStatus,
    pub payment_status: PaymentStatus,
    pub total_amount: Decimal,
    pub discount_amount: Decimal,
    pub discount_code: Option<String>,
    pub contact: PassengerContact,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

/// Price charged for one seat, fixed when the booking was created.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BookingSeat {
    pub booking_id: String,
    pub seat_id: i64,
    pub price: Decimal,
}

#[derive(Debug, Clone, Serialize)]
pub struct BookingDetails {
    pub booking: Booking,
    pub seats: Vec<BookingSeat>,
    pub passengers: Vec<Passenger>,
    pub payments: Vec<Payment>,
}

/// What the notification channel needs to tell a passenger about their booking.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookingSummary {
    pub pnr: String,
    pub contact: PassengerContact,
    pub origin: String,
    pub destination: String,
    pub departure_at: NaiveDateTime,
    pub seat_labels: Vec<String>,
    pub total_amount: Decimal,
}

impl BookingSummary {
    pub fn received_message(&self) -> String {
        format!(
            "Booking {} received: {} -> {} departing {}, seats {}, total {}. Complete payment to confirm.",
            self.pnr,
            self.origin,
            self.destination,
            self.departure_at.format("%Y-%m-%d %H:%M"),
            self.seat_labels.join(", "),
            self.total_amount,
        )
    }
}
