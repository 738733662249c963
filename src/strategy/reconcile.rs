//! Order reconciliation: decide whether to place, replace, or hold the
//! resting order against the current top of book, and apply the decision
//! behind the price-limit and balance gates.

use std::time::Duration;

use rust_decimal::Decimal;
use tracing::{info, warn};

use crate::config::StrategyConfig;
use crate::exchange::types::{Order, Side};
use crate::exchange::ExchangeClient;
use crate::metrics;

use super::price::{round_to, tick_adjust, PRICE_DECIMALS, TICK};
use super::sizing::order_amount;

/// Retries after the initial cancel attempt.
pub const CANCEL_RETRIES: u32 = 5;

/// Pause between cancel attempts.
pub const CANCEL_RETRY_PAUSE: Duration = Duration::from_secs(1);

/// The worker's resting-order state. At most one order per worker;
/// transitions happen only in the reconciler and the worker's cleanup.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum OrderSlot {
    /// No order resting on the exchange.
    #[default]
    Empty,
    /// An order was placed; it is confirmed once it carries an id.
    Resting(Order),
}

impl OrderSlot {
    /// The resting order, if the exchange acknowledged it.
    pub fn confirmed(&self) -> Option<&Order> {
        match self {
            OrderSlot::Resting(order) if order.id.is_some() => Some(order),
            _ => None,
        }
    }

    /// Take the order out, leaving the slot empty.
    pub fn take(&mut self) -> Option<Order> {
        match std::mem::take(self) {
            OrderSlot::Resting(order) => Some(order),
            OrderSlot::Empty => None,
        }
    }

    /// Drop any order reference.
    pub fn clear(&mut self) {
        *self = OrderSlot::Empty;
    }

    /// Whether the slot holds no order.
    pub fn is_empty(&self) -> bool {
        matches!(self, OrderSlot::Empty)
    }
}

/// Outcome of comparing the book against the resting order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderAction {
    /// No confirmed resting order: place at the tick-adjusted best level.
    Place {
        /// Target price.
        price: Decimal,
    },
    /// Cancel the resting order, then place at the given price: either
    /// chasing a moved best level or stepping back toward the second.
    Replace {
        /// Target price.
        price: Decimal,
    },
    /// Hold position: re-submit at the unchanged raw best level so the
    /// size can track the balance.
    Resubmit {
        /// Target price.
        price: Decimal,
    },
}

impl OrderAction {
    /// The price this action quotes at.
    pub fn price(&self) -> Decimal {
        match self {
            OrderAction::Place { price }
            | OrderAction::Replace { price }
            | OrderAction::Resubmit { price } => *price,
        }
    }
}

/// Decide the next action from the best two levels on the worker's side
/// and the currently resting order.
///
/// The comparison against the resting order uses the raw best level, not
/// the tick-adjusted one; placement targets are tick-adjusted.
pub fn decide(side: Side, best: Decimal, second: Decimal, resting: Option<&Order>) -> OrderAction {
    let near = tick_adjust(best, side);

    let Some(order) = resting else {
        return OrderAction::Place { price: near };
    };

    if best != order.price {
        // The top of book moved away from us: chase it.
        return OrderAction::Replace { price: near };
    }

    let gap = match side {
        Side::Buy => round_to(order.price - second, PRICE_DECIMALS),
        Side::Sell => round_to(second - order.price, PRICE_DECIMALS),
    };

    if gap > TICK {
        // We are more than a tick inside the second level: step back and
        // keep the queue position cheaper.
        OrderAction::Replace {
            price: tick_adjust(second, side),
        }
    } else {
        OrderAction::Resubmit { price: best }
    }
}

/// Whether a candidate price respects the hard boundary for the side.
pub fn price_within_limit(side: Side, price: Decimal, limit: Decimal) -> bool {
    match side {
        Side::Buy => price <= limit,
        Side::Sell => price >= limit,
    }
}

/// Cancel an order, retrying up to [`CANCEL_RETRIES`] times with a pause
/// between attempts. Returns whether the exchange confirmed the
/// cancellation; the caller clears its local reference either way.
pub async fn cancel_with_retry<C: ExchangeClient + ?Sized>(client: &C, order_id: &str) -> bool {
    let mut confirmed = matches!(client.cancel_order(order_id).await, Ok(true));
    let mut retries = 0;

    while !confirmed && retries < CANCEL_RETRIES {
        retries += 1;
        warn!(order_id, retry = retries, "cancellation not confirmed, retrying");
        metrics::inc_cancel_retries();

        tokio::time::sleep(CANCEL_RETRY_PAUSE).await;
        confirmed = matches!(client.cancel_order(order_id).await, Ok(true));
    }

    if confirmed {
        metrics::inc_orders_cancelled();
    }
    confirmed
}

/// Applies [`decide`] outcomes for one worker.
#[derive(Debug, Clone, Copy)]
pub struct OrderReconciler {
    config: StrategyConfig,
}

impl OrderReconciler {
    /// Create a reconciler for one side.
    pub fn new(config: StrategyConfig) -> Self {
        Self { config }
    }

    /// Reconcile the resting order against the best two levels on the
    /// worker's side.
    pub async fn reconcile<C: ExchangeClient + ?Sized>(
        &self,
        client: &C,
        slot: &mut OrderSlot,
        best: Decimal,
        second: Decimal,
    ) {
        let action = decide(self.config.side, best, second, slot.confirmed());

        match action {
            OrderAction::Place { price } | OrderAction::Resubmit { price } => {
                self.try_place(client, slot, price).await;
            }
            OrderAction::Replace { price } => {
                if let Some(order) = slot.take() {
                    if let Some(id) = order.confirmed_id() {
                        if !cancel_with_retry(client, id).await {
                            // The exchange-side order may survive; the
                            // periodic cleanup reconciles the divergence.
                            warn!(
                                order_id = id,
                                side = %self.config.side,
                                "clearing local order despite unconfirmed cancel"
                            );
                        }
                    }
                }
                self.try_place(client, slot, price).await;
            }
        }
    }

    /// Place an order at `price` if both gates pass. A failed gate
    /// returns without side effects; a failed placement leaves the slot
    /// unchanged so the next iteration re-attempts.
    async fn try_place<C: ExchangeClient + ?Sized>(
        &self,
        client: &C,
        slot: &mut OrderSlot,
        price: Decimal,
    ) {
        let side = self.config.side;

        if !price_within_limit(side, price, self.config.price_limit) {
            info!(
                side = %side,
                price = %price,
                limit = %self.config.price_limit,
                "target price outside limit, skipping placement"
            );
            metrics::inc_gate_skips("price_limit");
            return;
        }

        let amount = match client.balance().await {
            Ok(balance) => order_amount(side, &balance, price),
            Err(e) => {
                warn!(error = %e, "balance unavailable while sizing, skipping placement");
                Decimal::ZERO
            }
        };

        if amount.is_zero() {
            info!(side = %side, price = %price, "insufficient balance for placement");
            metrics::inc_gate_skips("balance");
            return;
        }

        match client.place_order(side, price, amount, Decimal::ZERO).await {
            Ok(order) => {
                info!(
                    side = %side,
                    price = %price,
                    amount = %amount,
                    order_id = order.confirmed_id().unwrap_or("?"),
                    "order placed"
                );
                metrics::inc_orders_placed();
                *slot = OrderSlot::Resting(order);
            }
            Err(e) => {
                // Retry by re-attempt: the next iteration sees no
                // confirmed order (or the stale one) and places again.
                warn!(side = %side, price = %price, error = %e, "placement failed");
                metrics::inc_orders_failed();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exchange::mock::{MockConfig, MockExchange};
    use rust_decimal_macros::dec;

    fn resting(side: Side, price: Decimal) -> Order {
        Order {
            id: Some("7".to_string()),
            side,
            price,
            amount: dec!(0.5),
        }
    }

    fn buy_config() -> StrategyConfig {
        StrategyConfig {
            side: Side::Buy,
            price_limit: dec!(20000),
            tax_rate: dec!(0.18),
        }
    }

    #[test]
    fn no_resting_order_places_at_near_price() {
        let action = decide(Side::Buy, dec!(100.00), dec!(99.50), None);
        assert_eq!(action, OrderAction::Place { price: dec!(100.01) });

        let action = decide(Side::Sell, dec!(200.00), dec!(200.50), None);
        assert_eq!(action, OrderAction::Place { price: dec!(199.99) });
    }

    #[test]
    fn unchanged_best_resubmits_at_raw_price() {
        // Scenario A: resting buy at 100.00, best bid still 100.00.
        let order = resting(Side::Buy, dec!(100.00));
        let action = decide(Side::Buy, dec!(100.00), dec!(99.99), Some(&order));
        assert_eq!(action, OrderAction::Resubmit { price: dec!(100.00) });
    }

    #[test]
    fn moved_best_chases_the_book() {
        // Scenario B: resting buy at 100.00, best bid moved to 101.00.
        let order = resting(Side::Buy, dec!(100.00));
        let action = decide(Side::Buy, dec!(101.00), dec!(100.00), Some(&order));
        assert_eq!(action, OrderAction::Replace { price: dec!(101.01) });
    }

    #[test]
    fn sell_gap_within_tick_holds_position() {
        // Scenario C: resting sell at 200.00; the second level is not
        // more than a tick behind, so no step-back.
        let order = resting(Side::Sell, dec!(200.00));
        let action = decide(Side::Sell, dec!(200.00), dec!(199.00), Some(&order));
        assert_eq!(action, OrderAction::Resubmit { price: dec!(200.00) });
    }

    #[test]
    fn oversized_gap_steps_back_to_second_level() {
        // Buy resting a full unit above the second bid: pay less while
        // staying ahead of it.
        let order = resting(Side::Buy, dec!(100.00));
        let action = decide(Side::Buy, dec!(100.00), dec!(99.00), Some(&order));
        assert_eq!(action, OrderAction::Replace { price: dec!(99.01) });

        let order = resting(Side::Sell, dec!(200.00));
        let action = decide(Side::Sell, dec!(200.00), dec!(201.50), Some(&order));
        assert_eq!(action, OrderAction::Replace { price: dec!(201.49) });
    }

    #[test]
    fn gap_of_exactly_one_tick_is_not_stepped_back() {
        let order = resting(Side::Buy, dec!(100.00));
        let action = decide(Side::Buy, dec!(100.00), dec!(99.99), Some(&order));
        assert_eq!(action, OrderAction::Resubmit { price: dec!(100.00) });
    }

    #[test]
    fn price_limit_gate_per_side() {
        assert!(price_within_limit(Side::Buy, dec!(19999.99), dec!(20000)));
        assert!(price_within_limit(Side::Buy, dec!(20000), dec!(20000)));
        assert!(!price_within_limit(Side::Buy, dec!(20000.01), dec!(20000)));

        assert!(price_within_limit(Side::Sell, dec!(5000.01), dec!(5000)));
        assert!(price_within_limit(Side::Sell, dec!(5000), dec!(5000)));
        assert!(!price_within_limit(Side::Sell, dec!(4999.99), dec!(5000)));
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_retries_five_times_then_gives_up() {
        let mock = MockExchange::new();
        mock.script_cancel_results(vec![
            Ok(false),
            Err(()),
            Ok(false),
            Err(()),
            Ok(false),
            Ok(false),
        ]);

        let confirmed = cancel_with_retry(&mock, "7").await;

        assert!(!confirmed);
        // Initial attempt plus exactly five retries.
        assert_eq!(mock.cancelled().len(), 6);
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_stops_retrying_once_confirmed() {
        let mock = MockExchange::new();
        mock.script_cancel_results(vec![Ok(false), Ok(true)]);

        let confirmed = cancel_with_retry(&mock, "7").await;

        assert!(confirmed);
        assert_eq!(mock.cancelled().len(), 2);
    }

    #[tokio::test]
    async fn price_limit_gate_blocks_placement_without_side_effects() {
        let mock = MockExchange::new();
        mock.set_balance(dec!(10000), dec!(0), dec!(0.0025));

        let reconciler = OrderReconciler::new(buy_config());
        let mut slot = OrderSlot::Empty;

        // Best bid at the limit: near price is one tick above it.
        reconciler
            .reconcile(&mock, &mut slot, dec!(20000.00), dec!(19999.00))
            .await;

        assert!(mock.placed().is_empty());
        assert!(slot.is_empty());
    }

    #[tokio::test]
    async fn balance_gate_blocks_placement() {
        // Scenario E: post-fee balance below one currency unit.
        let mock = MockExchange::new();
        mock.set_balance(dec!(0.50), dec!(0), dec!(0.0025));

        let reconciler = OrderReconciler::new(buy_config());
        let mut slot = OrderSlot::Empty;

        reconciler
            .reconcile(&mock, &mut slot, dec!(100.00), dec!(99.50))
            .await;

        assert!(mock.placed().is_empty());
        assert!(slot.is_empty());
    }

    #[tokio::test]
    async fn replace_cancels_then_places_with_zero_trigger() {
        let mock = MockExchange::new();
        mock.set_balance(dec!(1000), dec!(0), dec!(0.0025));

        let reconciler = OrderReconciler::new(buy_config());
        let mut slot = OrderSlot::Resting(resting(Side::Buy, dec!(100.00)));

        reconciler
            .reconcile(&mock, &mut slot, dec!(101.00), dec!(100.00))
            .await;

        assert_eq!(mock.cancelled(), vec!["7".to_string()]);
        let placed = mock.placed();
        assert_eq!(placed.len(), 1);
        assert_eq!(placed[0].price, dec!(101.01));
        assert_eq!(placed[0].trigger_price, Decimal::ZERO);
        assert!(slot.confirmed().is_some());
    }

    #[tokio::test]
    async fn failed_placement_leaves_slot_for_reattempt() {
        let mock = MockExchange::with_config(MockConfig {
            fail_place: true,
            ..Default::default()
        });
        mock.set_balance(dec!(1000), dec!(0), dec!(0.0025));

        let reconciler = OrderReconciler::new(buy_config());
        let mut slot = OrderSlot::Empty;

        reconciler
            .reconcile(&mock, &mut slot, dec!(100.00), dec!(99.50))
            .await;

        assert_eq!(mock.placed().len(), 1);
        assert!(slot.is_empty());
    }

    #[test]
    fn slot_confirmed_requires_an_id() {
        let mut slot = OrderSlot::Resting(Order {
            id: None,
            side: Side::Buy,
            price: dec!(100.00),
            amount: dec!(1),
        });
        assert!(slot.confirmed().is_none());

        slot = OrderSlot::Resting(resting(Side::Buy, dec!(100.00)));
        assert!(slot.confirmed().is_some());

        assert!(slot.take().is_some());
        assert!(slot.is_empty());
    }
}
