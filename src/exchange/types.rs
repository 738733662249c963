//! Exchange data model: sides, book snapshots, balances, orders.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use time::OffsetDateTime;

/// Order side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "UPPERCASE")]
pub enum Side {
    /// Buy order.
    #[strum(serialize = "BUY", serialize = "buy")]
    Buy,
    /// Sell order.
    #[strum(serialize = "SELL", serialize = "sell")]
    Sell,
}

impl Side {
    /// The opposite side.
    pub fn opposite(&self) -> Side {
        match self {
            Side::Buy => Side::Sell,
            Side::Sell => Side::Buy,
        }
    }
}

/// Single price level in an order book.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct PriceLevel {
    /// Price at this level.
    pub price: Decimal,
    /// Amount available at this price.
    pub amount: Decimal,
}

impl PriceLevel {
    /// Create a new price level.
    pub fn new(price: Decimal, amount: Decimal) -> Self {
        Self { price, amount }
    }
}

/// L2 order book snapshot for the traded pair.
#[derive(Debug, Clone)]
pub struct OrderBookSnapshot {
    /// Bid levels sorted by price descending.
    pub bids: Vec<PriceLevel>,
    /// Ask levels sorted by price ascending.
    pub asks: Vec<PriceLevel>,
    /// When this snapshot was taken.
    pub updated_at: OffsetDateTime,
}

impl OrderBookSnapshot {
    /// Create a snapshot, normalising level order.
    pub fn new(mut bids: Vec<PriceLevel>, mut asks: Vec<PriceLevel>) -> Self {
        bids.sort_by(|a, b| b.price.cmp(&a.price));
        asks.sort_by(|a, b| a.price.cmp(&b.price));

        Self {
            bids,
            asks,
            updated_at: OffsetDateTime::now_utc(),
        }
    }

    /// Levels on the side a worker quotes into: bids for a buyer,
    /// asks for a seller.
    pub fn levels(&self, side: Side) -> &[PriceLevel] {
        match side {
            Side::Buy => &self.bids,
            Side::Sell => &self.asks,
        }
    }

    /// Best price on the given side.
    pub fn best(&self, side: Side) -> Option<Decimal> {
        self.levels(side).first().map(|l| l.price)
    }

    /// Best and second-best prices on the given side.
    ///
    /// `None` when the book is too shallow; callers treat that as
    /// transient data unavailability, not as an empty-result success.
    pub fn best_two(&self, side: Side) -> Option<(Decimal, Decimal)> {
        let levels = self.levels(side);
        match levels {
            [first, second, ..] => Some((first.price, second.price)),
            _ => None,
        }
    }

    /// Get the best bid price.
    pub fn best_bid(&self) -> Option<Decimal> {
        self.best(Side::Buy)
    }

    /// Get the best ask price.
    pub fn best_ask(&self) -> Option<Decimal> {
        self.best(Side::Sell)
    }
}

/// Ticker summary for the traded pair.
#[derive(Debug, Clone, Copy)]
pub struct Ticker {
    /// Last trade price.
    pub last: Decimal,
    /// Slow-moving average price, the profitability baseline.
    pub average: Decimal,
}

/// Account balance snapshot.
#[derive(Debug, Clone, Copy)]
pub struct BalanceSnapshot {
    /// Available quote-currency amount.
    pub money_available: Decimal,
    /// Available base-asset amount.
    pub bitcoin_available: Decimal,
    /// Maker fee rate as a fraction, in [0, 1).
    pub maker_fee_rate: Decimal,
}

/// A limit order owned by one worker.
///
/// `id` is present once the exchange has acknowledged the order and
/// absent while in flight or after cancellation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Order {
    /// Exchange-assigned identifier.
    pub id: Option<String>,
    /// Order side.
    pub side: Side,
    /// Limit price, two-decimal precision.
    pub price: Decimal,
    /// Base-asset amount, eight-decimal precision.
    pub amount: Decimal,
}

impl Order {
    /// Identifier of an acknowledged order.
    pub fn confirmed_id(&self) -> Option<&str> {
        self.id.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn test_book() -> OrderBookSnapshot {
        OrderBookSnapshot::new(
            vec![
                PriceLevel::new(dec!(99.50), dec!(0.4)),
                PriceLevel::new(dec!(100.00), dec!(1.2)),
            ],
            vec![
                PriceLevel::new(dec!(100.70), dec!(2.0)),
                PriceLevel::new(dec!(100.50), dec!(0.8)),
            ],
        )
    }

    #[test]
    fn snapshot_normalises_level_order() {
        let book = test_book();

        assert_eq!(book.bids[0].price, dec!(100.00)); // highest bid first
        assert_eq!(book.asks[0].price, dec!(100.50)); // lowest ask first
        assert_eq!(book.best_bid(), Some(dec!(100.00)));
        assert_eq!(book.best_ask(), Some(dec!(100.50)));
    }

    #[test]
    fn best_two_per_side() {
        let book = test_book();

        assert_eq!(book.best_two(Side::Buy), Some((dec!(100.00), dec!(99.50))));
        assert_eq!(
            book.best_two(Side::Sell),
            Some((dec!(100.50), dec!(100.70)))
        );
    }

    #[test]
    fn best_two_requires_depth() {
        let shallow = OrderBookSnapshot::new(
            vec![PriceLevel::new(dec!(100.00), dec!(1))],
            vec![],
        );

        assert_eq!(shallow.best_two(Side::Buy), None);
        assert_eq!(shallow.best_two(Side::Sell), None);
        assert_eq!(shallow.best_bid(), Some(dec!(100.00)));
    }

    #[test]
    fn side_round_trips_through_strings() {
        use std::str::FromStr;

        assert_eq!(Side::from_str("BUY").unwrap(), Side::Buy);
        assert_eq!(Side::from_str("sell").unwrap(), Side::Sell);
        assert_eq!(Side::Buy.to_string().to_uppercase(), "BUY");
        assert_eq!(Side::Buy.opposite(), Side::Sell);
    }

    #[test]
    fn order_confirmed_id() {
        let order = Order {
            id: Some("42".to_string()),
            side: Side::Buy,
            price: dec!(100.00),
            amount: dec!(0.5),
        };
        assert_eq!(order.confirmed_id(), Some("42"));

        let in_flight = Order { id: None, ..order };
        assert_eq!(in_flight.confirmed_id(), None);
    }
}
