//! BTCTurk REST client implementing the [`ExchangeClient`] contract.

use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::Deserialize;
use tracing::{debug, instrument, warn};

use crate::config::Config;
use crate::error::ExchangeError;
use crate::metrics;

use super::auth;
use super::types::{BalanceSnapshot, Order, OrderBookSnapshot, PriceLevel, Side, Ticker};
use super::ExchangeClient;

/// Order type strings used by the exchange API.
const API_TYPE_BUY: &str = "BuyBtc";
const API_TYPE_SELL: &str = "SellBtc";

/// BTCTurk REST API client.
#[derive(Debug, Clone)]
pub struct BtcTurkClient {
    /// HTTP client for API requests.
    http: reqwest::Client,
    /// API base URL.
    base_url: String,
    /// API public key.
    public_key: String,
    /// API private key (base64 HMAC secret).
    private_key: String,
}

/// Order book response from the API: levels as `[price, amount]` pairs.
#[derive(Debug, Clone, Deserialize)]
struct OrderBookResponse {
    bids: Option<Vec<[Decimal; 2]>>,
    asks: Option<Vec<[Decimal; 2]>>,
}

/// Ticker response from the API.
#[derive(Debug, Clone, Deserialize)]
struct TickerResponse {
    last: Option<Decimal>,
    average: Option<Decimal>,
}

/// Balance response from the API.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BalanceResponse {
    money_available: Option<Decimal>,
    bitcoin_available: Option<Decimal>,
    maker_fee_percentage: Option<Decimal>,
}

/// Open order entry from the API.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct OpenOrderResponse {
    id: Option<serde_json::Value>,
    price: Option<Decimal>,
    amount: Option<Decimal>,
    #[serde(rename = "type")]
    order_type: Option<String>,
}

/// Placement response from the API.
#[derive(Debug, Clone, Deserialize)]
struct PlaceOrderResponse {
    id: Option<serde_json::Value>,
    result: Option<bool>,
    message: Option<String>,
}

/// Cancellation response from the API.
#[derive(Debug, Clone, Deserialize)]
struct CancelOrderResponse {
    result: Option<bool>,
}

impl BtcTurkClient {
    /// Create a new client from config with tuned HTTP settings.
    pub fn new(config: &Config) -> Result<Self, ExchangeError> {
        let mut builder = reqwest::Client::builder()
            .timeout(std::time::Duration::from_millis(config.http_timeout_ms))
            .connect_timeout(std::time::Duration::from_millis(500))
            .tcp_nodelay(true)
            .tcp_keepalive(std::time::Duration::from_secs(30))
            .pool_max_idle_per_host(config.http_pool_size)
            .pool_idle_timeout(std::time::Duration::from_secs(90));

        if let (Some(host), Some(port)) = (&config.proxy_host, config.proxy_port) {
            let proxy = reqwest::Proxy::all(format!("http://{host}:{port}"))?;
            builder = builder.proxy(proxy);
        }

        let http = builder.build()?;

        Ok(Self {
            http,
            base_url: config.btcturk_api_url.trim_end_matches('/').to_string(),
            public_key: config.btcturk_public_key.clone(),
            private_key: config.btcturk_private_key.clone(),
        })
    }

    /// Get the API base URL.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }

    fn auth_headers(&self) -> Result<auth::AuthHeaders, ExchangeError> {
        auth::sign(&self.public_key, &self.private_key)
    }

    async fn check_status(
        endpoint: &str,
        response: reqwest::Response,
    ) -> Result<reqwest::Response, ExchangeError> {
        if response.status().is_success() {
            return Ok(response);
        }

        let status = response.status().as_u16();
        let mut body = response.text().await.unwrap_or_default();
        body.truncate(256);

        Err(ExchangeError::Api {
            endpoint: endpoint.to_string(),
            status,
            body,
        })
    }

    fn parse_levels(levels: Option<Vec<[Decimal; 2]>>) -> Vec<PriceLevel> {
        levels
            .unwrap_or_default()
            .into_iter()
            .filter(|[_, amount]| *amount > Decimal::ZERO)
            .map(|[price, amount]| PriceLevel::new(price, amount))
            .collect()
    }

    fn parse_id(id: Option<serde_json::Value>) -> Option<String> {
        match id? {
            serde_json::Value::String(s) if !s.is_empty() => Some(s),
            serde_json::Value::Number(n) => Some(n.to_string()),
            _ => None,
        }
    }

    fn parse_side(order_type: Option<&str>) -> Option<Side> {
        match order_type? {
            API_TYPE_BUY => Some(Side::Buy),
            API_TYPE_SELL => Some(Side::Sell),
            other => {
                warn!(order_type = other, "unknown order type in open orders");
                None
            }
        }
    }

    fn api_type(side: Side) -> &'static str {
        match side {
            Side::Buy => API_TYPE_BUY,
            Side::Sell => API_TYPE_SELL,
        }
    }
}

#[async_trait]
impl ExchangeClient for BtcTurkClient {
    #[instrument(skip(self))]
    async fn order_book(&self) -> Result<OrderBookSnapshot, ExchangeError> {
        let start = std::time::Instant::now();
        let url = self.endpoint("orderbook");

        let response = self.http.get(&url).send().await?;
        let response = Self::check_status("orderbook", response).await?;

        let book: OrderBookResponse = response
            .json()
            .await
            .map_err(|e| ExchangeError::Parse(format!("order book: {e}")))?;

        metrics::record_book_fetch_latency(start);

        Ok(OrderBookSnapshot::new(
            Self::parse_levels(book.bids),
            Self::parse_levels(book.asks),
        ))
    }

    #[instrument(skip(self))]
    async fn ticker(&self) -> Result<Ticker, ExchangeError> {
        let url = self.endpoint("ticker");

        let response = self.http.get(&url).send().await?;
        let response = Self::check_status("ticker", response).await?;

        let ticker: TickerResponse = response
            .json()
            .await
            .map_err(|e| ExchangeError::Parse(format!("ticker: {e}")))?;

        let last = ticker
            .last
            .ok_or_else(|| ExchangeError::Parse("ticker missing last price".to_string()))?;
        let average = ticker
            .average
            .ok_or_else(|| ExchangeError::Parse("ticker missing average price".to_string()))?;

        Ok(Ticker { last, average })
    }

    #[instrument(skip(self))]
    async fn balance(&self) -> Result<BalanceSnapshot, ExchangeError> {
        let url = self.endpoint("balance");
        let headers = self.auth_headers()?;

        let mut request = self.http.get(&url);
        for (key, value) in headers.pairs() {
            request = request.header(key, value);
        }

        let response = request.send().await?;
        let response = Self::check_status("balance", response).await?;

        let balance: BalanceResponse = response
            .json()
            .await
            .map_err(|e| ExchangeError::Parse(format!("balance: {e}")))?;

        let snapshot = BalanceSnapshot {
            money_available: balance.money_available.unwrap_or(Decimal::ZERO),
            bitcoin_available: balance.bitcoin_available.unwrap_or(Decimal::ZERO),
            maker_fee_rate: balance.maker_fee_percentage.unwrap_or(Decimal::ZERO),
        };

        debug!(
            money = %snapshot.money_available,
            bitcoin = %snapshot.bitcoin_available,
            maker_fee = %snapshot.maker_fee_rate,
            "retrieved balance"
        );

        Ok(snapshot)
    }

    #[instrument(skip(self), fields(side = %side, price = %price, amount = %amount))]
    async fn place_order(
        &self,
        side: Side,
        price: Decimal,
        amount: Decimal,
        trigger_price: Decimal,
    ) -> Result<Order, ExchangeError> {
        let url = self.endpoint(match side {
            Side::Buy => "buy",
            Side::Sell => "sell",
        });
        let headers = self.auth_headers()?;

        let params = [
            ("Type", Self::api_type(side).to_string()),
            ("Price", price.to_string()),
            ("Amount", amount.to_string()),
            ("TriggerPrice", trigger_price.to_string()),
        ];

        let mut request = self.http.post(&url).form(&params);
        for (key, value) in headers.pairs() {
            request = request.header(key, value);
        }

        let response = request.send().await?;
        let response = Self::check_status("place", response).await?;

        let placed: PlaceOrderResponse = response
            .json()
            .await
            .map_err(|e| ExchangeError::Parse(format!("place order: {e}")))?;

        if placed.result == Some(false) {
            return Err(ExchangeError::NotPlaced(
                placed.message.unwrap_or_else(|| "rejected".to_string()),
            ));
        }

        let id = Self::parse_id(placed.id)
            .ok_or_else(|| ExchangeError::NotPlaced("no order id in response".to_string()))?;

        debug!(order_id = %id, "order placed");

        Ok(Order {
            id: Some(id),
            side,
            price,
            amount,
        })
    }

    #[instrument(skip(self), fields(order_id = %order_id))]
    async fn cancel_order(&self, order_id: &str) -> Result<bool, ExchangeError> {
        let url = self.endpoint("cancelOrder");
        let headers = self.auth_headers()?;

        let params = [("id", order_id)];

        let mut request = self.http.post(&url).form(&params);
        for (key, value) in headers.pairs() {
            request = request.header(key, value);
        }

        let response = request.send().await?;
        let response = Self::check_status("cancel", response).await?;

        let cancelled: CancelOrderResponse = response
            .json()
            .await
            .map_err(|e| ExchangeError::Parse(format!("cancel order: {e}")))?;

        Ok(cancelled.result.unwrap_or(false))
    }

    #[instrument(skip(self))]
    async fn open_orders(&self) -> Result<Vec<Order>, ExchangeError> {
        let url = self.endpoint("openOrders");
        let headers = self.auth_headers()?;

        let mut request = self.http.get(&url);
        for (key, value) in headers.pairs() {
            request = request.header(key, value);
        }

        let response = request.send().await?;
        let response = Self::check_status("openOrders", response).await?;

        let entries: Vec<OpenOrderResponse> = response
            .json()
            .await
            .map_err(|e| ExchangeError::Parse(format!("open orders: {e}")))?;

        let orders = entries
            .into_iter()
            .filter_map(|entry| {
                let side = Self::parse_side(entry.order_type.as_deref())?;
                Some(Order {
                    id: Self::parse_id(entry.id),
                    side,
                    price: entry.price.unwrap_or(Decimal::ZERO),
                    amount: entry.amount.unwrap_or(Decimal::ZERO),
                })
            })
            .collect();

        Ok(orders)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn test_config() -> Config {
        Config {
            btcturk_public_key: "pk".to_string(),
            btcturk_private_key: "c2VjcmV0".to_string(),
            btcturk_api_url: "https://btcturk.com/api/".to_string(),
            proxy_host: None,
            proxy_port: None,
            buy_price_limit: dec!(20000),
            sell_price_limit: dec!(5000),
            http_timeout_ms: 5000,
            http_pool_size: 10,
            metrics_enabled: false,
            metrics_port: 9090,
            rust_log: "info".to_string(),
        }
    }

    #[test]
    fn client_creation_trims_trailing_slash() {
        let client = BtcTurkClient::new(&test_config()).unwrap();
        assert_eq!(client.base_url(), "https://btcturk.com/api");
    }

    #[test]
    fn parse_levels_drops_empty_amounts() {
        let levels = BtcTurkClient::parse_levels(Some(vec![
            [dec!(100.00), dec!(1.5)],
            [dec!(99.00), dec!(0)],
        ]));

        assert_eq!(levels.len(), 1);
        assert_eq!(levels[0].price, dec!(100.00));
    }

    #[test]
    fn parse_id_accepts_numbers_and_strings() {
        assert_eq!(
            BtcTurkClient::parse_id(Some(serde_json::json!(12345))),
            Some("12345".to_string())
        );
        assert_eq!(
            BtcTurkClient::parse_id(Some(serde_json::json!("abc"))),
            Some("abc".to_string())
        );
        assert_eq!(BtcTurkClient::parse_id(Some(serde_json::json!(""))), None);
        assert_eq!(BtcTurkClient::parse_id(Some(serde_json::Value::Null)), None);
        assert_eq!(BtcTurkClient::parse_id(None), None);
    }

    #[test]
    fn parse_side_maps_api_types() {
        assert_eq!(BtcTurkClient::parse_side(Some("BuyBtc")), Some(Side::Buy));
        assert_eq!(BtcTurkClient::parse_side(Some("SellBtc")), Some(Side::Sell));
        assert_eq!(BtcTurkClient::parse_side(Some("Other")), None);
        assert_eq!(BtcTurkClient::parse_side(None), None);
    }

    #[test]
    fn order_book_response_deserialises_pairs() {
        let json = r#"{"bids": [["100.00", "1.2"], ["99.50", "0.4"]], "asks": [["100.50", "0.8"]]}"#;
        let response: OrderBookResponse = serde_json::from_str(json).unwrap();

        let bids = BtcTurkClient::parse_levels(response.bids);
        assert_eq!(bids.len(), 2);
        assert_eq!(bids[0].amount, dec!(1.2));
    }
}
