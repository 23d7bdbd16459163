//! HTTP reference price feed.
//!
//! Queries a public ticker endpoint of the form
//! `GET {base_url}/api/v3/ticker/price?symbol=BTCUSDT`, which answers
//! `{"symbol": "BTCUSDT", "price": "43250.10"}`. Unlisted symbols come back
//! as an error body `{"code": -1121, "msg": "Invalid symbol."}`.

use std::time::Duration;

use mm_core::{CurrencyPair, Price};
use reqwest::Client;
use serde::Deserialize;
use tracing::debug;

use crate::error::{GatewayError, GatewayResult, ReferenceError, ReferenceResult};
use crate::gateway::BoxFuture;
use crate::reference::ReferencePriceSource;

/// Default timeout for feed requests.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// Error code the feed uses for unlisted symbols.
const INVALID_SYMBOL_CODE: i64 = -1121;
const INVALID_SYMBOL_MSG: &str = "Invalid symbol.";

#[derive(Debug, Deserialize)]
struct TickerPriceResponse {
    symbol: String,
    price: Price,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    #[serde(default)]
    code: Option<i64>,
    #[serde(default)]
    msg: Option<String>,
}

impl ApiErrorBody {
    fn is_invalid_symbol(&self) -> bool {
        self.code == Some(INVALID_SYMBOL_CODE) || self.msg.as_deref() == Some(INVALID_SYMBOL_MSG)
    }
}

/// Reference price source backed by an HTTP ticker endpoint.
pub struct HttpPriceFeed {
    /// HTTP client.
    client: Client,
    /// Feed base URL, without trailing slash.
    base_url: String,
}

impl HttpPriceFeed {
    /// Create a new feed client.
    ///
    /// # Arguments
    /// * `base_url` - Feed root, e.g. `https://api.binance.com`
    /// * `timeout` - Per-request timeout
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> GatewayResult<Self> {
        let client = Client::builder().timeout(timeout).build().map_err(|e| {
            GatewayError::Transport(format!("Failed to create HTTP client: {e}"))
        })?;

        let base_url: String = base_url.into();
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn ticker_url(&self, symbol: &str) -> String {
        format!("{}/api/v3/ticker/price?symbol={symbol}", self.base_url)
    }

    /// Fetch the price for one pair.
    pub async fn fetch_price(&self, pair: &CurrencyPair) -> ReferenceResult<Price> {
        let symbol = pair.normalized();
        let url = self.ticker_url(&symbol);
        debug!(%url, "Fetching reference price");

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| ReferenceError::Transport(format!("HTTP request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            if let Ok(api_error) = serde_json::from_str::<ApiErrorBody>(&body) {
                if api_error.is_invalid_symbol() {
                    return Err(ReferenceError::UnknownSymbol(symbol));
                }
            }
            return Err(ReferenceError::Transport(format!("HTTP {status}: {body}")));
        }

        let ticker: TickerPriceResponse = response
            .json()
            .await
            .map_err(|e| ReferenceError::Malformed(format!("Failed to parse response: {e}")))?;

        if ticker.symbol != symbol {
            return Err(ReferenceError::Malformed(format!(
                "asked for {symbol}, got {}",
                ticker.symbol
            )));
        }
        if !ticker.price.is_positive() {
            return Err(ReferenceError::Malformed(format!(
                "non-positive price {} for {symbol}",
                ticker.price
            )));
        }

        Ok(ticker.price)
    }
}

impl ReferencePriceSource for HttpPriceFeed {
    fn price<'a>(&'a self, pair: &'a CurrencyPair) -> BoxFuture<'a, ReferenceResult<Price>> {
        Box::pin(self.fetch_price(pair))
    }

    fn name(&self) -> &str {
        "http"
    }
}
