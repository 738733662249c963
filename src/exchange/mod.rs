//! Exchange collaborator: the client contract, the BTCTurk REST
//! implementation, and a scriptable mock for tests.

pub mod auth;
pub mod mock;
pub mod rest;
pub mod types;

use async_trait::async_trait;
use rust_decimal::Decimal;

use crate::error::ExchangeError;
use self::types::{BalanceSnapshot, Order, OrderBookSnapshot, Side, Ticker};

/// Contract between the strategy workers and the exchange.
///
/// Both per-side workers hold handles to one implementation. The
/// implementation must be safe for concurrent use, but no cross-call
/// atomicity is assumed: a balance check and a subsequent placement are
/// not transactional, and the exchange may process other activity in
/// between.
#[async_trait]
pub trait ExchangeClient: Send + Sync {
    /// Fetch the current order book for the traded pair.
    async fn order_book(&self) -> Result<OrderBookSnapshot, ExchangeError>;

    /// Fetch the current ticker.
    async fn ticker(&self) -> Result<Ticker, ExchangeError>;

    /// Fetch the account balance.
    async fn balance(&self) -> Result<BalanceSnapshot, ExchangeError>;

    /// Place a limit order. The core always passes `trigger_price = 0`
    /// (plain limit order); the value is forwarded unchanged.
    async fn place_order(
        &self,
        side: Side,
        price: Decimal,
        amount: Decimal,
        trigger_price: Decimal,
    ) -> Result<Order, ExchangeError>;

    /// Cancel an order by identifier. `Ok(false)` means the exchange
    /// reported the cancellation as failed; `Err` means it was
    /// unreachable.
    async fn cancel_order(&self, order_id: &str) -> Result<bool, ExchangeError>;

    /// List all open orders for the account, both sides.
    async fn open_orders(&self) -> Result<Vec<Order>, ExchangeError>;
}
