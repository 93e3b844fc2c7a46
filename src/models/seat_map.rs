use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::schedule::SeatType;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SeatState {
    Booked,
    Locked,
    Available,
    Unavailable,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeatView {
    pub seat_id: i64,
    pub label: String,
    pub seat_type: SeatType,
    pub price: Decimal,
    pub state: SeatState,
}

/// Point-in-time, non-authoritative seat map for one schedule.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeatMap {
    pub schedule_id: i64,
    pub seats: Vec<SeatView>,
}

impl SeatMap {
    pub fn seat_ids_in(&self, state: SeatState) -> Vec<i64> {
        self.seats
            .iter()
            .filter(|s| s.state == state)
            .map(|s| s.seat_id)
            .collect()
    }
}
