use chrono::NaiveDateTime;
use rand::Rng;
use rusqlite::ErrorCode;

/// Attempts before a run of PNR collisions is surfaced as a storage error.
pub const MAX_PNR_ATTEMPTS: usize = 3;

// No 0/O or 1/I, so codes read back unambiguously over the phone.
const SUFFIX_CHARSET: &[u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZ23456789";
const SUFFIX_LEN: usize = 4;

/// `BL` + minute timestamp + random suffix. Unique with high probability only;
/// the store's unique key on `bookings.pnr` is what actually guarantees it.
pub fn generate_pnr(now: &NaiveDateTime) -> String {
    let mut rng = rand::thread_rng();
    let suffix: String = (0..SUFFIX_LEN)
        .map(|_| SUFFIX_CHARSET[rng.gen_range(0..SUFFIX_CHARSET.len())] as char)
        .collect();
    format!("BL{}{}", now.format("%y%m%d%H%M"), suffix)
}

pub fn is_pnr_collision(err: &rusqlite::Error) -> bool {
    match err {
        rusqlite::Error::SqliteFailure(e, Some(msg)) => {
            e.code == ErrorCode::ConstraintViolation && msg.contains("bookings.pnr")
        }
        _ => false,
    }
}
