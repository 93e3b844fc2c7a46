use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// Time-bounded soft reservation of one seat on one schedule for one session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeatLock {
    pub id: i64,
    pub schedule_id: i64,
    pub seat_id: i64,
    pub session_id: String,
    pub expires_at: NaiveDateTime,
    pub created_at: NaiveDateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LockGrant {
    pub schedule_id: i64,
    pub seat_ids: Vec<i64>,
    pub expires_at: NaiveDateTime,
}
