use rust_decimal::Decimal;

use crate::models::{PriceTier, Schedule, Seat, SeatType};

/// Price of one seat: the schedule's active tier for its type, else the base price.
pub fn resolve_seat_price(seat_type: SeatType, tiers: &[PriceTier], base_price: Decimal) -> Decimal {
    tiers
        .iter()
        .find(|t| t.is_active && t.seat_type == seat_type)
        .map(|t| t.price)
        .unwrap_or(base_price)
}

pub fn price_seats(schedule: &Schedule, seats: &[Seat], tiers: &[PriceTier]) -> Vec<(i64, Decimal)> {
    seats
        .iter()
        .map(|seat| {
            (
                seat.id,
                resolve_seat_price(seat.seat_type, tiers, schedule.base_price),
            )
        })
        .collect()
}

/// Extension point for promotional codes.
pub trait DiscountPolicy: Send + Sync {
    fn compute_discount(&self, code: &str, cart_total: Decimal) -> Decimal;
}

/// No promotions configured: every code is worth zero.
pub struct NoDiscount;

impl DiscountPolicy for NoDiscount {
    fn compute_discount(&self, _code: &str, _cart_total: Decimal) -> Decimal {
        Decimal::ZERO
    }
}

/// Returns `(discount, amount_due)`, with the discount clamped to `[0, cart_total]`.
pub fn apply_discount(
    policy: &dyn DiscountPolicy,
    code: Option<&str>,
    cart_total: Decimal,
) -> (Decimal, Decimal) {
    let discount = match code.map(str::trim).filter(|c| !c.is_empty()) {
        Some(code) => policy
            .compute_discount(code, cart_total)
            .max(Decimal::ZERO)
            .min(cart_total),
        None => Decimal::ZERO,
    };
    (discount, cart_total - discount)
}
