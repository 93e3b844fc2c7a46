use chrono::NaiveDateTime;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// One dated trip of a route, operated by a specific bus.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Schedule {
    pub id: i64,
    pub bus_id: i64,
    pub origin: String,
    pub destination: String,
    pub departure_at: NaiveDateTime,
    pub arrival_at: NaiveDateTime,
    pub base_price: Decimal,
    pub is_active: bool,
}

impl Schedule {
    /// A schedule accepts new locks and bookings only while active and not yet departed.
    pub fn is_bookable(&self, now: NaiveDateTime) -> bool {
        self.is_active && self.departure_at > now
    }
}

/// Admin-side input for creating a schedule.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewSchedule {
    pub bus_id: i64,
    pub origin: String,
    pub destination: String,
    pub departure_at: NaiveDateTime,
    pub arrival_at: NaiveDateTime,
    pub base_price: Decimal,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SeatType {
    Regular,
    Premium,
    Sleeper,
}

impl SeatType {
    pub fn as_str(&self) -> &'static str {
        match self {
            SeatType::Regular => "REGULAR",
            SeatType::Premium => "PREMIUM",
            SeatType::Sleeper => "SLEEPER",
        }
    }

    pub fn parse(s: &str) -> Self {
        match s {
            "PREMIUM" => SeatType::Premium,
            "SLEEPER" => SeatType::Sleeper,
            _ => SeatType::Regular,
        }
    }
}

/// A physical seat on a bus. `is_available` is the administrative flag only;
/// per-trip availability is always derived from bookings and locks.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Seat {
    pub id: i64,
    pub bus_id: i64,
    pub label: String,
    pub seat_type: SeatType,
    pub is_available: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PriceTier {
    pub schedule_id: i64,
    pub seat_type: SeatType,
    pub price: Decimal,
    pub is_active: bool,
}
