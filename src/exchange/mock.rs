//! Mock exchange client for unit and scenario testing.
//!
//! Scriptable snapshots and failure modes, with recorded placement and
//! cancellation calls so tests can assert on side effects.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use rust_decimal::Decimal;

use crate::error::ExchangeError;

use super::types::{BalanceSnapshot, Order, OrderBookSnapshot, PriceLevel, Side, Ticker};
use super::ExchangeClient;

/// One recorded `place_order` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlacedCall {
    /// Requested side.
    pub side: Side,
    /// Requested price.
    pub price: Decimal,
    /// Requested amount.
    pub amount: Decimal,
    /// Trigger price forwarded by the caller.
    pub trigger_price: Decimal,
}

/// Configuration for mock failure behavior.
#[derive(Debug, Clone, Default)]
pub struct MockConfig {
    /// Fail order book fetches.
    pub fail_book: bool,
    /// Fail ticker fetches.
    pub fail_ticker: bool,
    /// Fail balance fetches.
    pub fail_balance: bool,
    /// Reject placements.
    pub fail_place: bool,
    /// Fail open-order listings.
    pub fail_open_orders: bool,
}

#[derive(Debug, Default)]
struct MockState {
    config: MockConfig,
    book: Option<OrderBookSnapshot>,
    ticker: Option<Ticker>,
    balance: Option<BalanceSnapshot>,
    open_orders: Vec<Order>,
    placed: Vec<PlacedCall>,
    cancelled: Vec<String>,
    /// Scripted outcomes for upcoming cancels; `Ok(true)` when empty.
    cancel_script: VecDeque<Result<bool, ()>>,
    next_order_id: u64,
}

/// Mock exchange client for testing.
#[derive(Debug, Clone, Default)]
pub struct MockExchange {
    state: Arc<Mutex<MockState>>,
}

impl MockExchange {
    /// Create a new mock with default (empty, always-succeeding) state.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a mock with custom failure configuration.
    pub fn with_config(config: MockConfig) -> Self {
        let mock = Self::new();
        mock.state.lock().unwrap().config = config;
        mock
    }

    /// Set the order book snapshot returned by `order_book`.
    pub fn set_book(&self, bids: Vec<(Decimal, Decimal)>, asks: Vec<(Decimal, Decimal)>) {
        let to_levels = |pairs: Vec<(Decimal, Decimal)>| {
            pairs
                .into_iter()
                .map(|(price, amount)| PriceLevel::new(price, amount))
                .collect()
        };

        self.state.lock().unwrap().book =
            Some(OrderBookSnapshot::new(to_levels(bids), to_levels(asks)));
    }

    /// Set the ticker returned by `ticker`.
    pub fn set_ticker(&self, last: Decimal, average: Decimal) {
        self.state.lock().unwrap().ticker = Some(Ticker { last, average });
    }

    /// Set the balance returned by `balance`.
    pub fn set_balance(&self, money: Decimal, bitcoin: Decimal, maker_fee_rate: Decimal) {
        self.state.lock().unwrap().balance = Some(BalanceSnapshot {
            money_available: money,
            bitcoin_available: bitcoin,
            maker_fee_rate,
        });
    }

    /// Set the open orders returned by `open_orders`.
    pub fn set_open_orders(&self, orders: Vec<Order>) {
        self.state.lock().unwrap().open_orders = orders;
    }

    /// Update a failure flag after construction.
    pub fn set_config(&self, config: MockConfig) {
        self.state.lock().unwrap().config = config;
    }

    /// Script the outcome of the next cancel calls, in order.
    /// `Ok(false)` = exchange reports failure; `Err(())` = unreachable.
    pub fn script_cancel_results(&self, results: Vec<Result<bool, ()>>) {
        self.state.lock().unwrap().cancel_script = results.into();
    }

    /// All recorded placement calls.
    pub fn placed(&self) -> Vec<PlacedCall> {
        self.state.lock().unwrap().placed.clone()
    }

    /// All recorded cancellation calls (order ids).
    pub fn cancelled(&self) -> Vec<String> {
        self.state.lock().unwrap().cancelled.clone()
    }

    /// Drop recorded calls, keeping snapshots and scripts.
    pub fn clear_recorded(&self) {
        let mut state = self.state.lock().unwrap();
        state.placed.clear();
        state.cancelled.clear();
    }

    fn unavailable(what: &str) -> ExchangeError {
        ExchangeError::Api {
            endpoint: what.to_string(),
            status: 503,
            body: "mock unavailable".to_string(),
        }
    }
}

#[async_trait]
impl ExchangeClient for MockExchange {
    async fn order_book(&self) -> Result<OrderBookSnapshot, ExchangeError> {
        let state = self.state.lock().unwrap();
        if state.config.fail_book {
            return Err(Self::unavailable("orderbook"));
        }
        state
            .book
            .clone()
            .ok_or_else(|| Self::unavailable("orderbook"))
    }

    async fn ticker(&self) -> Result<Ticker, ExchangeError> {
        let state = self.state.lock().unwrap();
        if state.config.fail_ticker {
            return Err(Self::unavailable("ticker"));
        }
        state.ticker.ok_or_else(|| Self::unavailable("ticker"))
    }

    async fn balance(&self) -> Result<BalanceSnapshot, ExchangeError> {
        let state = self.state.lock().unwrap();
        if state.config.fail_balance {
            return Err(Self::unavailable("balance"));
        }
        state.balance.ok_or_else(|| Self::unavailable("balance"))
    }

    async fn place_order(
        &self,
        side: Side,
        price: Decimal,
        amount: Decimal,
        trigger_price: Decimal,
    ) -> Result<Order, ExchangeError> {
        let mut state = self.state.lock().unwrap();

        state.placed.push(PlacedCall {
            side,
            price,
            amount,
            trigger_price,
        });

        if state.config.fail_place {
            return Err(ExchangeError::NotPlaced("mock rejection".to_string()));
        }

        state.next_order_id += 1;
        Ok(Order {
            id: Some(state.next_order_id.to_string()),
            side,
            price,
            amount,
        })
    }

    async fn cancel_order(&self, order_id: &str) -> Result<bool, ExchangeError> {
        let mut state = self.state.lock().unwrap();
        state.cancelled.push(order_id.to_string());

        match state.cancel_script.pop_front() {
            Some(Ok(result)) => Ok(result),
            Some(Err(())) => Err(Self::unavailable("cancelOrder")),
            None => Ok(true),
        }
    }

    async fn open_orders(&self) -> Result<Vec<Order>, ExchangeError> {
        let state = self.state.lock().unwrap();
        if state.config.fail_open_orders {
            return Err(Self::unavailable("openOrders"));
        }
        Ok(state.open_orders.clone())
    }
}
