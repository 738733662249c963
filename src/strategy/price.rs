//! Deterministic price arithmetic.
//!
//! All currency math goes through [`round_to`], which rounds half-up the
//! way the exchange settles, never through binary-float truncation.

use rust_decimal::{Decimal, RoundingStrategy};
use rust_decimal_macros::dec;

use crate::exchange::types::Side;

/// Minimum price increment used to outbid/undercut the top of book.
pub const TICK: Decimal = dec!(0.01);

/// Fractional digits of a quoted price.
pub const PRICE_DECIMALS: u32 = 2;

/// Fractional digits of a base-asset amount.
pub const AMOUNT_DECIMALS: u32 = 8;

/// Round half-up to `decimals` fractional digits.
pub fn round_to(value: Decimal, decimals: u32) -> Decimal {
    value.round_dp_with_strategy(decimals, RoundingStrategy::MidpointAwayFromZero)
}

/// Move a reference price one tick in the profit-favoring direction:
/// a buyer outbids the best bid, a seller undercuts the best ask.
pub fn tick_adjust(price: Decimal, side: Side) -> Decimal {
    let adjusted = match side {
        Side::Buy => price + TICK,
        Side::Sell => price - TICK,
    };
    round_to(adjusted, PRICE_DECIMALS)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_to_is_half_up() {
        assert_eq!(round_to(dec!(2.675), 2), dec!(2.68));
        assert_eq!(round_to(dec!(2.674), 2), dec!(2.67));
        assert_eq!(round_to(dec!(2.665), 2), dec!(2.67));
        assert_eq!(round_to(dec!(-2.675), 2), dec!(-2.68));
    }

    #[test]
    fn round_to_is_idempotent() {
        for value in [dec!(0.005), dec!(1.2349), dec!(99.999), dec!(-3.14159)] {
            let once = round_to(value, 2);
            assert_eq!(round_to(once, 2), once);
        }
    }

    #[test]
    fn round_to_eight_decimals_for_amounts() {
        assert_eq!(
            round_to(dec!(0.123456785), AMOUNT_DECIMALS),
            dec!(0.12345679)
        );
        assert_eq!(
            round_to(dec!(0.123456784), AMOUNT_DECIMALS),
            dec!(0.12345678)
        );
    }

    #[test]
    fn tick_adjust_moves_one_tick_by_side() {
        assert_eq!(tick_adjust(dec!(100.00), Side::Buy), dec!(100.01));
        assert_eq!(tick_adjust(dec!(100.00), Side::Sell), dec!(99.99));
    }

    #[test]
    fn tick_adjust_rounds_to_price_precision() {
        assert_eq!(tick_adjust(dec!(100.005), Side::Buy), dec!(100.02));
        assert_eq!(tick_adjust(dec!(100.005), Side::Sell), dec!(100.00));
    }
}
