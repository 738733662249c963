//! Unified error types for the trading bot.

use thiserror::Error;

/// Unified error type for the trading bot.
#[derive(Error, Debug)]
pub enum BotError {
    /// Configuration loading error.
    #[error("configuration error: {0}")]
    Config(#[from] envy::Error),

    /// Exchange collaborator error.
    #[error("exchange error: {0}")]
    Exchange(#[from] ExchangeError),

    /// JSON parsing error.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// IO error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors surfaced by the exchange client.
///
/// Every variant is treated as transient by the strategy loop: data
/// fetches are retried after a fixed wait and placements are retried by
/// re-attempting on the next iteration. Gate outcomes (price limit,
/// balance, spread) are deliberately not errors.
#[derive(Error, Debug)]
pub enum ExchangeError {
    /// HTTP transport failure (timeout, connection refused, proxy down).
    #[error("http request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The exchange answered with a non-success status.
    #[error("exchange returned HTTP {status} for {endpoint}: {body}")]
    Api {
        /// Endpoint that failed.
        endpoint: String,
        /// HTTP status code.
        status: u16,
        /// Response body, truncated by the caller.
        body: String,
    },

    /// Response body could not be decoded into the expected shape.
    #[error("failed to parse exchange response: {0}")]
    Parse(String),

    /// Request authentication could not be produced.
    #[error("authentication error: {0}")]
    Auth(String),

    /// The exchange acknowledged the request but did not place the order.
    #[error("order not placed: {0}")]
    NotPlaced(String),
}

/// Convenient Result type alias.
pub type Result<T> = std::result::Result<T, BotError>;
