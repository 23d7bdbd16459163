//! HTTP reference feed integration tests.
//!
//! Runs a local ticker endpoint and checks how each response shape maps to
//! a price or a reference error.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::time::Duration;

use axum::extract::Query;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use mm_core::{CurrencyPair, Price};
use mm_gateway::{HttpPriceFeed, ReferenceError, ReferencePriceSource};
use rust_decimal_macros::dec;
use serde_json::json;
use tokio::net::TcpListener;
use tokio::sync::oneshot;

/// Local stand-in for the public ticker endpoint.
struct MockTickerServer {
    addr: SocketAddr,
    shutdown_tx: oneshot::Sender<()>,
}

impl MockTickerServer {
    async fn start() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();

        let app = Router::new().route("/api/v3/ticker/price", get(ticker_price));
        tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async {
                    let _ = shutdown_rx.await;
                })
                .await
                .unwrap();
        });

        Self { addr, shutdown_tx }
    }

    fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    fn shutdown(self) {
        let _ = self.shutdown_tx.send(());
    }
}

async fn ticker_price(Query(params): Query<HashMap<String, String>>) -> Response {
    let symbol = params.get("symbol").cloned().unwrap_or_default();
    match symbol.as_str() {
        "BTCUSDT" => Json(json!({"symbol": "BTCUSDT", "price": "43250.10000000"})).into_response(),
        "ETHUSDT" => Json(json!({"symbol": "ETHUSDT"})).into_response(),
        "DOGEUSDT" => Json(json!({"symbol": "DOGEUSDT", "price": "0.00000000"})).into_response(),
        "SOLUSDT" => (StatusCode::INTERNAL_SERVER_ERROR, "upstream unavailable").into_response(),
        _ => (
            StatusCode::BAD_REQUEST,
            Json(json!({"code": -1121, "msg": "Invalid symbol."})),
        )
            .into_response(),
    }
}

fn pair(base: &str) -> CurrencyPair {
    CurrencyPair::new(base, "USDT").unwrap()
}

fn feed(server: &MockTickerServer) -> HttpPriceFeed {
    HttpPriceFeed::new(server.url(), Duration::from_secs(2)).unwrap()
}

#[tokio::test]
async fn test_listed_symbol_returns_price() {
    let server = MockTickerServer::start().await;
    let price = feed(&server).price(&pair("BTC")).await.unwrap();
    assert_eq!(price, Price::new(dec!(43250.1)));
    server.shutdown();
}

#[tokio::test]
async fn test_unlisted_symbol_is_permanent() {
    let server = MockTickerServer::start().await;
    let err = feed(&server).price(&pair("XYZ")).await.unwrap_err();
    assert!(matches!(err, ReferenceError::UnknownSymbol(ref s) if s == "XYZUSDT"));
    assert!(err.is_permanent());
    server.shutdown();
}

#[tokio::test]
async fn test_missing_price_is_malformed() {
    let server = MockTickerServer::start().await;
    let err = feed(&server).price(&pair("ETH")).await.unwrap_err();
    assert!(matches!(err, ReferenceError::Malformed(_)));
    assert!(!err.is_permanent());
    server.shutdown();
}

#[tokio::test]
async fn test_zero_price_is_malformed() {
    let server = MockTickerServer::start().await;
    let err = feed(&server).price(&pair("DOGE")).await.unwrap_err();
    assert!(matches!(err, ReferenceError::Malformed(_)));
    server.shutdown();
}

#[tokio::test]
async fn test_server_error_is_transient() {
    let server = MockTickerServer::start().await;
    let err = feed(&server).price(&pair("SOL")).await.unwrap_err();
    assert!(matches!(err, ReferenceError::Transport(_)));
    assert!(!err.is_permanent());
    server.shutdown();
}

#[tokio::test]
async fn test_unreachable_feed_is_transient() {
    // Bind then drop to get a port nobody listens on.
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let feed = HttpPriceFeed::new(format!("http://{addr}"), Duration::from_millis(500)).unwrap();
    let err = feed.price(&pair("BTC")).await.unwrap_err();
    assert!(matches!(err, ReferenceError::Transport(_)));
}
