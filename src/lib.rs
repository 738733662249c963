//! Unattended top-of-book limit-order repositioning bot.
//!
//! Two structurally identical workers run concurrently, one per side.
//! Each keeps at most one limit order resting at (or just inside) the
//! top of the order book, sized from the available balance net of fee
//! and tax, and only while the spread over a slow-moving reference
//! price clears a profitability threshold:
//!
//! ```text
//! reference average: 10000.00
//! best bid:           9750.00   spread 250 >= 200 -> trade
//! quote at:           9750.01   (one tick inside the best bid)
//! ```
//!
//! # Modules
//!
//! - [`config`]: Configuration loading from environment
//! - [`error`]: Unified error types
//! - [`exchange`]: Client contract, BTCTurk REST client, test mock
//! - [`strategy`]: Decision engine and the per-side worker loop
//! - [`metrics`]: Prometheus metrics
//! - [`utils`]: Utility functions

pub mod config;
pub mod error;
pub mod exchange;
pub mod metrics;
pub mod strategy;
pub mod utils;

pub use config::{Config, StrategyConfig};
pub use error::{BotError, ExchangeError, Result};
pub use exchange::types::Side;
pub use exchange::ExchangeClient;
pub use strategy::{Pace, StrategyWorker};
