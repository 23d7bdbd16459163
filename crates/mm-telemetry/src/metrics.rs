//! Prometheus metrics for the market-making bot.
//!
//! Covers both control loops:
//! - Orders placed, rejected and cancelled
//! - Tick failures and tick duration per loop
//! - Trade circuit breaker trips
//! - Reference price source fallbacks
//!
//! # Panics
//!
//! Metric registration uses `unwrap()`. A registration failure means a
//! duplicate metric name, which must crash at startup. These panics only
//! occur during static initialization, never at runtime.

use once_cell::sync::Lazy;
use prometheus::{
    register_counter_vec, register_gauge_vec, register_histogram_vec, register_int_counter_vec,
    register_int_gauge, CounterVec, Encoder, GaugeVec, HistogramVec, IntCounterVec, IntGauge,
    TextEncoder,
};

use crate::error::{TelemetryError, TelemetryResult};

/// Orders accepted by the exchange.
/// Labels: pair, loop (spread/depth/trade), side (buy/sell)
pub static ORDERS_PLACED_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "mm_orders_placed_total",
        "Total orders accepted by the exchange",
        &["pair", "loop", "side"]
    )
    .unwrap()
});

/// Orders refused by the exchange.
pub static ORDERS_REJECTED_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "mm_orders_rejected_total",
        "Total orders rejected by the exchange",
        &["pair", "reason"]
    )
    .unwrap()
});

/// Orders cancelled by the bot.
/// Labels: pair, reason (excess_depth/volume_cap)
pub static ORDERS_CANCELLED_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "mm_orders_cancelled_total",
        "Total resting orders cancelled by the bot",
        &["pair", "reason"]
    )
    .unwrap()
});

/// Base currency volume sent as immediate-or-cancel trades.
pub static TRADE_VOLUME_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "mm_trade_volume_total",
        "Base currency amount submitted by the trade generator",
        &["pair", "side"]
    )
    .unwrap()
});

/// Ticks that ended in an error.
pub static TICK_FAILURES_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "mm_tick_failures_total",
        "Total control loop ticks that failed",
        &["loop"]
    )
    .unwrap()
});

/// Tick duration in milliseconds.
pub static TICK_DURATION_MS: Lazy<HistogramVec> = Lazy::new(|| {
    register_histogram_vec!(
        "mm_tick_duration_ms",
        "Control loop tick duration in milliseconds",
        &["loop"],
        vec![1.0, 5.0, 10.0, 50.0, 100.0, 250.0, 500.0, 1000.0, 5000.0]
    )
    .unwrap()
});

/// Trades skipped because the price left the allowed band.
pub static CIRCUIT_BREAKER_TRIPS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "mm_circuit_breaker_trips_total",
        "Total trades skipped by the price circuit breaker",
        &["pair", "side"]
    )
    .unwrap()
});

/// Reference price lookups answered by a fallback.
/// Labels: source (ticker/start_price)
pub static REFERENCE_FALLBACK_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "mm_reference_fallback_total",
        "Total reference price lookups served by a fallback source",
        &["source"]
    )
    .unwrap()
});

/// External reference source state (1 = disabled for the process lifetime).
pub static REFERENCE_SOURCE_DISABLED: Lazy<IntGauge> = Lazy::new(|| {
    register_int_gauge!(
        "mm_reference_source_disabled",
        "External reference source disabled (1=disabled)"
    )
    .unwrap()
});

/// Last resolved reference price.
pub static REFERENCE_PRICE: Lazy<GaugeVec> = Lazy::new(|| {
    register_gauge_vec!(
        "mm_reference_price",
        "Last resolved reference price",
        &["pair"]
    )
    .unwrap()
});

/// Metrics facade for easy access.
pub struct Metrics;

impl Metrics {
    /// Record an order accepted by the exchange.
    pub fn order_placed(pair: &str, loop_name: &str, side: &str) {
        ORDERS_PLACED_TOTAL
            .with_label_values(&[pair, loop_name, side])
            .inc();
    }

    /// Record an order rejected by the exchange.
    pub fn order_rejected(pair: &str, reason: &str) {
        ORDERS_REJECTED_TOTAL
            .with_label_values(&[pair, reason])
            .inc();
    }

    pub fn order_cancelled(pair: &str, reason: &str) {
        ORDERS_CANCELLED_TOTAL
            .with_label_values(&[pair, reason])
            .inc();
    }

    pub fn trade_volume(pair: &str, side: &str, amount: f64) {
        TRADE_VOLUME_TOTAL
            .with_label_values(&[pair, side])
            .inc_by(amount);
    }

    /// Record a failed tick.
    pub fn tick_failed(loop_name: &str) {
        TICK_FAILURES_TOTAL.with_label_values(&[loop_name]).inc();
    }

    pub fn tick_duration(loop_name: &str, duration_ms: f64) {
        TICK_DURATION_MS
            .with_label_values(&[loop_name])
            .observe(duration_ms);
    }

    /// Record a circuit breaker trip.
    pub fn circuit_breaker_tripped(pair: &str, side: &str) {
        CIRCUIT_BREAKER_TRIPS_TOTAL
            .with_label_values(&[pair, side])
            .inc();
    }

    pub fn reference_fallback(source: &str) {
        REFERENCE_FALLBACK_TOTAL.with_label_values(&[source]).inc();
    }

    pub fn reference_source_disabled() {
        REFERENCE_SOURCE_DISABLED.set(1);
    }

    pub fn reference_price(pair: &str, price: f64) {
        REFERENCE_PRICE.with_label_values(&[pair]).set(price);
    }

    /// Render every registered metric in the Prometheus text format.
    pub fn render() -> TelemetryResult<String> {
        let encoder = TextEncoder::new();
        let mut buffer = Vec::new();
        encoder
            .encode(&prometheus::gather(), &mut buffer)
            .map_err(|e| TelemetryError::Metrics(e.to_string()))?;
        String::from_utf8(buffer).map_err(|e| TelemetryError::Metrics(e.to_string()))
    }
}
