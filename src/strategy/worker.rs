//! The per-side strategy worker: fetch market state, gate, reconcile,
//! pace. Two instances run concurrently, one per side, sharing nothing
//! but the exchange account behind the client contract.

use std::time::Duration;

use rust_decimal::Decimal;
use tokio::sync::watch;
use tracing::{error, info, warn};

use crate::config::StrategyConfig;
use crate::error::BotError;
use crate::exchange::types::{BalanceSnapshot, Side};
use crate::exchange::ExchangeClient;
use crate::metrics;

use super::reconcile::{OrderReconciler, OrderSlot};
use super::reference::ReferencePriceTracker;
use super::sizing::{spendable_quote, MIN_QUOTE_BALANCE};

/// Iterations between full own-side order cleanups.
pub const CLEANUP_PERIOD: u32 = 60;

/// How long the worker yields control before the next iteration.
///
/// Expected outcomes of an iteration (gates, transient data
/// unavailability) are paces, not errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pace {
    /// Re-loop without waiting (balance fetch failed in the coarse gate).
    Immediate,
    /// Normal operation: 1s between iterations.
    Normal,
    /// Spread near the threshold, worth rechecking soon: 5s.
    NearMiss,
    /// Book or ticker unavailable: 10s.
    DataRetry,
    /// Spread negative, clearly unprofitable: 60s.
    Unprofitable,
    /// Not enough funds to trade at all: 10min.
    Depleted,
}

impl Pace {
    /// Suspension duration for this pace.
    pub fn delay(&self) -> Duration {
        match self {
            Pace::Immediate => Duration::ZERO,
            Pace::Normal => Duration::from_secs(1),
            Pace::NearMiss => Duration::from_secs(5),
            Pace::DataRetry => Duration::from_secs(10),
            Pace::Unprofitable => Duration::from_secs(60),
            Pace::Depleted => Duration::from_secs(600),
        }
    }
}

/// One side's trading loop and its mutable state.
pub struct StrategyWorker<C> {
    client: C,
    config: StrategyConfig,
    reconciler: OrderReconciler,
    slot: OrderSlot,
    reference: ReferencePriceTracker,
    cleanup_count: u32,
}

impl<C: ExchangeClient> StrategyWorker<C> {
    /// Create a worker for one side.
    pub fn new(client: C, config: StrategyConfig) -> Self {
        Self {
            client,
            config,
            reconciler: OrderReconciler::new(config),
            slot: OrderSlot::Empty,
            reference: ReferencePriceTracker::new(),
            cleanup_count: 0,
        }
    }

    /// The current resting-order state.
    pub fn slot(&self) -> &OrderSlot {
        &self.slot
    }

    /// Run until the shutdown signal fires. The loop never terminates on
    /// its own: unexpected faults are logged and the worker resumes.
    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) {
        info!(side = %self.config.side, "strategy worker starting");

        if let Err(e) = self.clear_side_orders().await {
            warn!(side = %self.config.side, error = %e, "startup cleanup failed");
        }

        loop {
            metrics::inc_iterations(self.config.side);

            let pace = match self.iterate().await {
                Ok(pace) => pace,
                Err(e) => {
                    // Last-resort guard for unclassified faults.
                    error!(side = %self.config.side, error = %e, "iteration failed unexpectedly");
                    Pace::Normal
                }
            };

            // Every suspension is also a shutdown point.
            tokio::select! {
                _ = shutdown.changed() => break,
                _ = tokio::time::sleep(pace.delay()) => {}
            }
        }

        info!(side = %self.config.side, "strategy worker stopped");
    }

    /// One pass of the decision loop. Expected skips come back as `Ok`
    /// paces; only unclassified faults (currently: cleanup listing
    /// failures) surface as `Err` for the caller's last-resort guard.
    pub async fn iterate(&mut self) -> Result<Pace, BotError> {
        self.cleanup_if_due().await?;

        // Coarse funds circuit breaker, distinct from per-order sizing.
        let balance = match self.client.balance().await {
            Ok(balance) => balance,
            Err(e) => {
                warn!(side = %self.config.side, error = %e, "balance unavailable");
                return Ok(Pace::Immediate);
            }
        };

        if !self.balance_sufficient(&balance) {
            info!(side = %self.config.side, "insufficient funds, standing down");
            metrics::inc_gate_skips("funds");
            return Ok(Pace::Depleted);
        }

        if let Err(e) = self.reference.ensure_fresh(&self.client).await {
            warn!(side = %self.config.side, error = %e, "ticker unavailable");
            return Ok(Pace::DataRetry);
        }

        let book = match self.client.order_book().await {
            Ok(book) => book,
            Err(e) => {
                warn!(side = %self.config.side, error = %e, "order book unavailable");
                return Ok(Pace::DataRetry);
            }
        };

        let (Some(best_bid), Some(best_ask)) = (book.best_bid(), book.best_ask()) else {
            warn!(side = %self.config.side, "order book empty on one side");
            return Ok(Pace::DataRetry);
        };

        let spread = self.reference.spread(self.config.side, best_bid, best_ask);
        let threshold = self.reference.threshold();

        if spread < threshold {
            info!(
                side = %self.config.side,
                spread = %spread,
                threshold = %threshold,
                "spread below threshold, standing down"
            );
            metrics::inc_gate_skips("spread");
            self.clear_side_orders().await?;

            return Ok(if spread < Decimal::ZERO {
                Pace::Unprofitable
            } else {
                Pace::NearMiss
            });
        }

        let Some((best, second)) = book.best_two(self.config.side) else {
            warn!(side = %self.config.side, "order book too shallow");
            return Ok(Pace::DataRetry);
        };

        self.reconciler
            .reconcile(&self.client, &mut self.slot, best, second)
            .await;

        Ok(Pace::Normal)
    }

    fn balance_sufficient(&self, balance: &BalanceSnapshot) -> bool {
        match self.config.side {
            Side::Buy => spendable_quote(balance) >= MIN_QUOTE_BALANCE,
            Side::Sell => balance.bitcoin_available > Decimal::ZERO,
        }
    }

    /// Every [`CLEANUP_PERIOD`] iterations, reconcile local state with
    /// the exchange by cancelling all own-side open orders.
    async fn cleanup_if_due(&mut self) -> Result<(), BotError> {
        if self.cleanup_count > CLEANUP_PERIOD {
            self.clear_side_orders().await?;
            self.cleanup_count = 0;
        }
        self.cleanup_count += 1;
        Ok(())
    }

    /// Cancel every open order on this worker's side and drop the local
    /// order reference.
    async fn clear_side_orders(&mut self) -> Result<(), BotError> {
        let open = self.client.open_orders().await?;

        for order in open.iter().filter(|o| o.side == self.config.side) {
            let Some(id) = order.confirmed_id() else {
                continue;
            };
            match self.client.cancel_order(id).await {
                Ok(true) => metrics::inc_orders_cancelled(),
                Ok(false) => warn!(order_id = id, "exchange refused cleanup cancel"),
                Err(e) => warn!(order_id = id, error = %e, "cleanup cancel failed"),
            }
        }

        self.slot.clear();
        info!(side = %self.config.side, "open orders cleared");
        Ok(())
    }
}
