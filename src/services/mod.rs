pub mod availability;
pub mod booking;
pub mod confirmation;
pub mod locks;
pub mod messaging;
pub mod notifications;
pub mod payments;
pub mod pnr;
pub mod pricing;
pub mod rate_limit;
pub mod sweeper;
