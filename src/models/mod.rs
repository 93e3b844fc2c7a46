pub mod booking;
pub mod lock;
pub mod payment;
pub mod schedule;
pub mod seat_map;

pub use booking::{Booking, BookingDetails, BookingSeat, BookingStatus, BookingSummary, Passenger, PassengerContact};
pub use lock::{LockGrant, SeatLock};
pub use payment::{Payment, PaymentStatus};
pub use schedule::{NewSchedule, PriceTier, Schedule, Seat, SeatType};
pub use seat_map::{SeatMap, SeatState, SeatView};
