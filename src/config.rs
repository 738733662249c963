//! Application configuration loaded from environment variables.

use rust_decimal::Decimal;
use serde::Deserialize;

use crate::exchange::types::Side;
use crate::strategy::sizing::TAX_RATE;

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    // === Exchange Credentials ===
    /// API public key (X-PCK header).
    pub btcturk_public_key: String,

    /// API private key (base64-encoded HMAC secret).
    pub btcturk_private_key: String,

    /// Exchange API base URL.
    #[serde(default = "default_api_url")]
    pub btcturk_api_url: String,

    // === Proxy ===
    /// Optional HTTP proxy host.
    #[serde(default)]
    pub proxy_host: Option<String>,

    /// Optional HTTP proxy port.
    #[serde(default)]
    pub proxy_port: Option<u16>,

    // === Trading Parameters ===
    /// Highest acceptable price for the buy worker.
    #[serde(default = "default_buy_price_limit")]
    pub buy_price_limit: Decimal,

    /// Lowest acceptable price for the sell worker.
    #[serde(default = "default_sell_price_limit")]
    pub sell_price_limit: Decimal,

    // === HTTP Tuning ===
    /// Request timeout in milliseconds.
    #[serde(default = "default_http_timeout_ms")]
    pub http_timeout_ms: u64,

    /// Connection pool size per host.
    #[serde(default = "default_http_pool_size")]
    pub http_pool_size: usize,

    // === Observability ===
    /// Serve Prometheus metrics.
    #[serde(default = "default_true")]
    pub metrics_enabled: bool,

    /// Prometheus exporter port.
    #[serde(default = "default_metrics_port")]
    pub metrics_port: u16,

    /// Log level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub rust_log: String,
}

fn default_api_url() -> String {
    "https://btcturk.com/api".to_string()
}

fn default_buy_price_limit() -> Decimal {
    Decimal::new(20_000, 0)
}

fn default_sell_price_limit() -> Decimal {
    Decimal::new(5_000, 0)
}

fn default_http_timeout_ms() -> u64 {
    5_000
}

fn default_http_pool_size() -> usize {
    10
}

fn default_true() -> bool {
    true
}

fn default_metrics_port() -> u16 {
    9090
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Config {
    /// Load configuration from environment, reading .env file first.
    pub fn load() -> Result<Self, envy::Error> {
        dotenvy::dotenv().ok();
        envy::from_env()
    }

    /// Check if the configuration is valid.
    pub fn validate(&self) -> Result<(), String> {
        if self.btcturk_public_key.is_empty() {
            return Err("BTCTURK_PUBLIC_KEY is required".to_string());
        }

        if self.btcturk_private_key.is_empty() {
            return Err("BTCTURK_PRIVATE_KEY is required".to_string());
        }

        if self.buy_price_limit <= Decimal::ZERO {
            return Err("BUY_PRICE_LIMIT must be positive".to_string());
        }

        if self.sell_price_limit <= Decimal::ZERO {
            return Err("SELL_PRICE_LIMIT must be positive".to_string());
        }

        if self.proxy_host.is_some() != self.proxy_port.is_some() {
            return Err("PROXY_HOST and PROXY_PORT must be set together".to_string());
        }

        Ok(())
    }

    /// Derive the per-worker strategy configuration for one side.
    pub fn strategy_for(&self, side: Side) -> StrategyConfig {
        let price_limit = match side {
            Side::Buy => self.buy_price_limit,
            Side::Sell => self.sell_price_limit,
        };

        StrategyConfig {
            side,
            price_limit,
            tax_rate: TAX_RATE,
        }
    }
}

/// Per-worker strategy parameters.
///
/// `price_limit` is a hard boundary: the maximum acceptable price for a
/// buy worker, the minimum acceptable price for a sell worker.
#[derive(Debug, Clone, Copy)]
pub struct StrategyConfig {
    /// Which side this worker trades.
    pub side: Side,
    /// Hard price boundary for placements.
    pub price_limit: Decimal,
    /// Tax rate applied on top of the maker fee.
    pub tax_rate: Decimal,
}
