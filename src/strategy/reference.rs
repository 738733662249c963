//! Reference price tracking and the profitability spread.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use tracing::debug;

use crate::error::ExchangeError;
use crate::exchange::types::Side;
use crate::exchange::ExchangeClient;

use super::price::{round_to, PRICE_DECIMALS};

/// Fixed profitability spread threshold, in currency units.
///
/// A fee-and-tax-derived threshold exists as an alternative design; the
/// constant path is the one in effect. Swap the value assigned in
/// `ensure_fresh` to change the formula without touching callers.
pub const SPREAD_THRESHOLD: Decimal = dec!(200);

/// Number of tracker calls after which the reference is considered stale.
pub const REFRESH_PERIOD: u32 = 60;

/// Last known reference price and spread threshold, refreshed from the
/// ticker when unset or stale.
#[derive(Debug, Clone, Copy)]
pub struct ReferencePriceTracker {
    /// Average price from the ticker; zero means unset.
    average_price: Decimal,
    /// Spread threshold; zero means unset.
    threshold: Decimal,
    /// Calls since the last refresh.
    stale_for: u32,
}

impl Default for ReferencePriceTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl ReferencePriceTracker {
    /// Create an unset tracker; the first `ensure_fresh` call refreshes.
    pub fn new() -> Self {
        Self {
            average_price: Decimal::ZERO,
            threshold: Decimal::ZERO,
            stale_for: 0,
        }
    }

    /// Whether the next `ensure_fresh` call will hit the ticker.
    pub fn needs_refresh(&self) -> bool {
        self.average_price.is_zero() || self.threshold.is_zero() || self.stale_for > REFRESH_PERIOD
    }

    /// Refresh the reference from the ticker if unset or stale.
    ///
    /// On failure nothing is updated and the staleness counter is left
    /// untouched, so the next call retries the refresh.
    pub async fn ensure_fresh<C: ExchangeClient + ?Sized>(
        &mut self,
        client: &C,
    ) -> Result<(), ExchangeError> {
        if self.needs_refresh() {
            let ticker = client.ticker().await?;

            self.average_price = ticker.average;
            self.threshold = SPREAD_THRESHOLD;
            self.stale_for = 0;

            debug!(
                average = %self.average_price,
                threshold = %self.threshold,
                "reference price refreshed"
            );
        }

        self.stale_for += 1;
        Ok(())
    }

    /// Last known average price.
    pub fn average_price(&self) -> Decimal {
        self.average_price
    }

    /// Current spread threshold.
    pub fn threshold(&self) -> Decimal {
        self.threshold
    }

    /// Spread between the reference and the best execution price for the
    /// given side: a seller measures how far above the average the best
    /// ask sits, a buyer how far below it the best bid sits.
    pub fn spread(&self, side: Side, best_bid: Decimal, best_ask: Decimal) -> Decimal {
        let raw = match side {
            Side::Sell => best_ask - self.average_price,
            Side::Buy => self.average_price - best_bid,
        };
        round_to(raw, PRICE_DECIMALS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exchange::mock::{MockConfig, MockExchange};

    #[tokio::test]
    async fn first_call_refreshes_from_ticker() {
        let mock = MockExchange::new();
        mock.set_ticker(dec!(10100), dec!(10000));

        let mut tracker = ReferencePriceTracker::new();
        assert!(tracker.needs_refresh());

        tracker.ensure_fresh(&mock).await.unwrap();

        assert_eq!(tracker.average_price(), dec!(10000));
        assert_eq!(tracker.threshold(), SPREAD_THRESHOLD);
        assert!(!tracker.needs_refresh());
    }

    #[tokio::test]
    async fn refreshes_again_after_period_expires() {
        let mock = MockExchange::new();
        mock.set_ticker(dec!(10100), dec!(10000));

        let mut tracker = ReferencePriceTracker::new();
        tracker.ensure_fresh(&mock).await.unwrap();

        // Stays fresh up to the period boundary.
        for _ in 0..(REFRESH_PERIOD - 1) {
            tracker.ensure_fresh(&mock).await.unwrap();
        }
        assert!(!tracker.needs_refresh());

        tracker.ensure_fresh(&mock).await.unwrap();
        assert!(tracker.needs_refresh());

        mock.set_ticker(dec!(10300), dec!(10200));
        tracker.ensure_fresh(&mock).await.unwrap();
        assert_eq!(tracker.average_price(), dec!(10200));
    }

    #[tokio::test]
    async fn ticker_failure_propagates_and_leaves_state() {
        let mock = MockExchange::with_config(MockConfig {
            fail_ticker: true,
            ..Default::default()
        });

        let mut tracker = ReferencePriceTracker::new();
        assert!(tracker.ensure_fresh(&mock).await.is_err());
        assert!(tracker.needs_refresh());
        assert_eq!(tracker.average_price(), Decimal::ZERO);
    }

    #[test]
    fn spread_is_signed_per_side() {
        let tracker = ReferencePriceTracker {
            average_price: dec!(10000),
            threshold: SPREAD_THRESHOLD,
            stale_for: 1,
        };

        // Buy side: average 10000, best bid 9750 -> 250 of headroom.
        assert_eq!(tracker.spread(Side::Buy, dec!(9750), dec!(9800)), dec!(250));
        // Sell side: best ask 10150 -> only 150 above the average.
        assert_eq!(
            tracker.spread(Side::Sell, dec!(10100), dec!(10150)),
            dec!(150)
        );
        // Negative spread: market is on the wrong side of the reference.
        assert_eq!(
            tracker.spread(Side::Buy, dec!(10050), dec!(10100)),
            dec!(-50)
        );
    }
}
