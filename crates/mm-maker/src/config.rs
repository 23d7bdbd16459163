//! Market making configuration.
//!
//! Loaded once at startup and validated before either loop starts. All
//! prices and amounts are exact decimals; write them as quoted strings in
//! TOML (`price_step = "0.01"`).

use std::time::Duration;

use mm_core::{Price, Size};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::error::{MakerError, MakerResult};

/// Optional pull of liquidity bands toward the reference price.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TractionConfig {
    /// Strength of the upward push on the ask band when it sits below the
    /// reference price.
    #[serde(default = "default_traction_rate")]
    pub rate_up: Decimal,

    /// Strength of the downward pull on the bid band when it sits above the
    /// reference price.
    #[serde(default = "default_traction_rate")]
    pub rate_down: Decimal,
}

impl Default for TractionConfig {
    fn default() -> Self {
        Self {
            rate_up: default_traction_rate(),
            rate_down: default_traction_rate(),
        }
    }
}

/// Orderbook loop configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OrderbookConfig {
    /// Fixed interval between ticks in milliseconds.
    #[serde(default = "default_orderbook_interval_ms")]
    pub interval_ms: u64,

    /// Levels requested for the deep snapshot (snapped by the gateway).
    #[serde(default = "default_depth_limit")]
    pub depth_limit: u32,

    /// Lower bound of the random per-side volume target.
    #[serde(default = "default_min_volume")]
    pub min_volume: Size,

    /// Upper bound of the per-side volume target. Also the hard cap on our
    /// own resting volume per side.
    #[serde(default = "default_max_volume")]
    pub max_volume: Size,

    /// Relative width of the band liquidity orders are placed in.
    #[serde(default = "default_price_range")]
    pub price_range: Decimal,

    /// Price tick.
    #[serde(default = "default_price_step")]
    pub price_step: Price,

    /// Smallest amount of a single liquidity order.
    #[serde(default = "default_min_order_amount")]
    pub min_order_amount: Size,

    /// Amount lot.
    #[serde(default = "default_amount_step")]
    pub amount_step: Size,
}

impl Default for OrderbookConfig {
    fn default() -> Self {
        Self {
            interval_ms: default_orderbook_interval_ms(),
            depth_limit: default_depth_limit(),
            min_volume: default_min_volume(),
            max_volume: default_max_volume(),
            price_range: default_price_range(),
            price_step: default_price_step(),
            min_order_amount: default_min_order_amount(),
            amount_step: default_amount_step(),
        }
    }
}

impl OrderbookConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }
}

/// Trade loop configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TradeConfig {
    /// Lower bound of the jittered interval in milliseconds.
    #[serde(default = "default_trade_min_interval_ms")]
    pub min_interval_ms: u64,

    /// Upper bound of the jittered interval in milliseconds.
    #[serde(default = "default_trade_max_interval_ms")]
    pub max_interval_ms: u64,

    #[serde(default = "default_trade_min_amount")]
    pub min_amount: Size,

    #[serde(default = "default_trade_max_amount")]
    pub max_amount: Size,

    /// Circuit breaker: no trade below this price.
    #[serde(default = "default_trade_min_price")]
    pub min_price: Price,

    /// Circuit breaker: no trade above this price.
    #[serde(default = "default_trade_max_price")]
    pub max_price: Price,

    /// Base currency volume to trade per 24 hours.
    #[serde(default = "default_target_daily_volume")]
    pub target_daily_volume: Size,

    /// Standard deviation of the trade amount as a fraction of its mean.
    #[serde(default = "default_amount_deviation")]
    pub amount_deviation: Decimal,
}

impl Default for TradeConfig {
    fn default() -> Self {
        Self {
            min_interval_ms: default_trade_min_interval_ms(),
            max_interval_ms: default_trade_max_interval_ms(),
            min_amount: default_trade_min_amount(),
            max_amount: default_trade_max_amount(),
            min_price: default_trade_min_price(),
            max_price: default_trade_max_price(),
            target_daily_volume: default_target_daily_volume(),
            amount_deviation: default_amount_deviation(),
        }
    }
}

impl TradeConfig {
    pub fn min_interval(&self) -> Duration {
        Duration::from_millis(self.min_interval_ms)
    }

    pub fn max_interval(&self) -> Duration {
        Duration::from_millis(self.max_interval_ms)
    }

    /// Expected trade amount: daily target scaled to the mean interval.
    pub fn expected_amount(&self) -> Decimal {
        let mean_interval_secs =
            Decimal::from(self.min_interval_ms + self.max_interval_ms) / dec!(2) / dec!(1000);
        self.target_daily_volume.inner() * mean_interval_secs / dec!(86400)
    }
}

/// Market making configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MakerConfig {
    /// Reference price of last resort.
    #[serde(default = "default_start_price")]
    pub start_price: Price,

    /// Delay between starting the orderbook loop and the trade loop.
    #[serde(default = "default_start_delay_ms")]
    pub start_delay_ms: u64,

    /// Bounded wait for each loop to stop on shutdown.
    #[serde(default = "default_shutdown_grace_ms")]
    pub shutdown_grace_ms: u64,

    /// Exchange minimum order value in quote currency.
    #[serde(default = "default_min_order_notional")]
    pub min_order_notional: Decimal,

    /// Distance between our quoted bid and ask.
    #[serde(default = "default_max_spread")]
    pub max_spread: Price,

    /// Band traction; disabled when absent.
    #[serde(default)]
    pub traction: Option<TractionConfig>,

    #[serde(default)]
    pub orderbook: OrderbookConfig,

    #[serde(default)]
    pub trades: TradeConfig,
}

impl Default for MakerConfig {
    fn default() -> Self {
        Self {
            start_price: default_start_price(),
            start_delay_ms: default_start_delay_ms(),
            shutdown_grace_ms: default_shutdown_grace_ms(),
            min_order_notional: default_min_order_notional(),
            max_spread: default_max_spread(),
            traction: None,
            orderbook: OrderbookConfig::default(),
            trades: TradeConfig::default(),
        }
    }
}

impl MakerConfig {
    pub fn start_delay(&self) -> Duration {
        Duration::from_millis(self.start_delay_ms)
    }

    pub fn shutdown_grace(&self) -> Duration {
        Duration::from_millis(self.shutdown_grace_ms)
    }

    /// Check every numeric invariant once, before the loops start.
    pub fn validate(&self) -> MakerResult<()> {
        let ob = &self.orderbook;
        let tr = &self.trades;

        if !self.start_price.is_positive() {
            return Err(MakerError::invalid("start_price", "must be > 0"));
        }
        if self.max_spread.inner().is_sign_negative() {
            return Err(MakerError::invalid("max_spread", "must be >= 0"));
        }
        if self.min_order_notional.is_sign_negative() {
            return Err(MakerError::invalid("min_order_notional", "must be >= 0"));
        }
        if let Some(traction) = &self.traction {
            if traction.rate_up.is_sign_negative() {
                return Err(MakerError::invalid("traction.rate_up", "must be >= 0"));
            }
            if traction.rate_down.is_sign_negative() {
                return Err(MakerError::invalid("traction.rate_down", "must be >= 0"));
            }
        }

        if ob.interval_ms == 0 {
            return Err(MakerError::invalid("orderbook.interval_ms", "must be > 0"));
        }
        if ob.depth_limit == 0 {
            return Err(MakerError::invalid("orderbook.depth_limit", "must be > 0"));
        }
        if !ob.price_step.is_positive() {
            return Err(MakerError::invalid("orderbook.price_step", "must be > 0"));
        }
        if !(self.max_spread.inner() / ob.price_step.inner()).fract().is_zero() {
            return Err(MakerError::invalid(
                "max_spread",
                format!(
                    "{} is not a multiple of price_step {}",
                    self.max_spread, ob.price_step
                ),
            ));
        }
        if !ob.amount_step.is_positive() {
            return Err(MakerError::invalid("orderbook.amount_step", "must be > 0"));
        }
        if !ob.min_order_amount.is_positive() {
            return Err(MakerError::invalid("orderbook.min_order_amount", "must be > 0"));
        }
        if ob.min_volume.is_negative() {
            return Err(MakerError::invalid("orderbook.min_volume", "must be >= 0"));
        }
        if ob.min_volume > ob.max_volume {
            return Err(MakerError::invalid(
                "orderbook.min_volume",
                format!("{} exceeds max_volume {}", ob.min_volume, ob.max_volume),
            ));
        }
        if ob.price_range.is_sign_negative() {
            return Err(MakerError::invalid("orderbook.price_range", "must be >= 0"));
        }

        if tr.min_interval_ms == 0 {
            return Err(MakerError::invalid("trades.min_interval_ms", "must be > 0"));
        }
        if tr.min_interval_ms > tr.max_interval_ms {
            return Err(MakerError::invalid(
                "trades.min_interval_ms",
                format!(
                    "{} exceeds max_interval_ms {}",
                    tr.min_interval_ms, tr.max_interval_ms
                ),
            ));
        }
        if !tr.min_amount.is_positive() {
            return Err(MakerError::invalid("trades.min_amount", "must be > 0"));
        }
        if tr.min_amount > tr.max_amount {
            return Err(MakerError::invalid(
                "trades.min_amount",
                format!("{} exceeds max_amount {}", tr.min_amount, tr.max_amount),
            ));
        }
        if tr.min_amount.ceil_to_lot(ob.amount_step) > tr.max_amount {
            return Err(MakerError::invalid(
                "trades.max_amount",
                format!(
                    "no multiple of amount_step {} in [{}, {}]",
                    ob.amount_step, tr.min_amount, tr.max_amount
                ),
            ));
        }
        if tr.min_price > tr.max_price {
            return Err(MakerError::invalid(
                "trades.min_price",
                format!("{} exceeds max_price {}", tr.min_price, tr.max_price),
            ));
        }
        if tr.target_daily_volume.is_negative() {
            return Err(MakerError::invalid("trades.target_daily_volume", "must be >= 0"));
        }
        if tr.amount_deviation.is_sign_negative() {
            return Err(MakerError::invalid("trades.amount_deviation", "must be >= 0"));
        }

        Ok(())
    }
}

fn default_traction_rate() -> Decimal {
    dec!(0.01)
}
fn default_orderbook_interval_ms() -> u64 {
    5_000
}
fn default_depth_limit() -> u32 {
    100
}
fn default_min_volume() -> Size {
    Size::new(dec!(10))
}
fn default_max_volume() -> Size {
    Size::new(dec!(20))
}
fn default_price_range() -> Decimal {
    dec!(0.05)
}
fn default_price_step() -> Price {
    Price::new(dec!(0.01))
}
fn default_min_order_amount() -> Size {
    Size::new(dec!(0.1))
}
fn default_amount_step() -> Size {
    Size::new(dec!(0.01))
}
fn default_trade_min_interval_ms() -> u64 {
    10_000
}
fn default_trade_max_interval_ms() -> u64 {
    60_000
}
fn default_trade_min_amount() -> Size {
    Size::new(dec!(0.01))
}
fn default_trade_max_amount() -> Size {
    Size::new(dec!(1))
}
fn default_trade_min_price() -> Price {
    Price::new(dec!(1))
}
fn default_trade_max_price() -> Price {
    Price::new(dec!(1000000))
}
fn default_target_daily_volume() -> Size {
    Size::new(dec!(500))
}
fn default_amount_deviation() -> Decimal {
    dec!(0.3)
}
fn default_start_price() -> Price {
    Price::new(dec!(100))
}
fn default_start_delay_ms() -> u64 {
    10_000
}
fn default_shutdown_grace_ms() -> u64 {
    5_000
}
fn default_min_order_notional() -> Decimal {
    dec!(10)
}
fn default_max_spread() -> Price {
    Price::new(dec!(2))
}
