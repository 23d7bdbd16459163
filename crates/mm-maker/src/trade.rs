//! Randomized trade generation.
//!
//! Each tick sends one small immediate-or-cancel order against the best
//! opposing price, sized so that the configured daily volume is reached on
//! average. A best price outside the configured bounds trips the circuit
//! breaker and nothing is sent.

use std::sync::Arc;
use std::time::Instant;

use mm_core::{CurrencyPair, OrderRequest, OrderSide, Price, Size};
use mm_gateway::{DynGateway, OrderOutcome};
use mm_telemetry::Metrics;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rust_decimal::prelude::ToPrimitive;
use tracing::{debug, error, warn};

use crate::config::{MakerConfig, TradeConfig};
use crate::error::MakerResult;
use crate::orders::{self, SOURCE_TRADE};
use crate::random::sample_normal;
use crate::spread::ensure_minimum_notional;

/// Loop label for logs and metrics.
pub const TRADE_LOOP: &str = "trade";

/// Levels needed to read the best opposing price.
const EXECUTION_DEPTH: u32 = 5;

/// Result of one trade tick.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TradeOutcome {
    /// IOC order sent; `placed` is false when the exchange rejected it.
    Submitted {
        side: OrderSide,
        price: Price,
        amount: Size,
        placed: bool,
    },
    /// Nothing to trade against on the opposing side.
    NoLiquidity { side: OrderSide },
    /// Best price outside `[min_price, max_price]`.
    CircuitBreaker { side: OrderSide, price: Price },
}

/// Draw a trade amount around the expected amount per tick.
///
/// Normal with standard deviation `amount_deviation * expected`, clamped to
/// `[min_amount, max_amount]` and quantized to `amount_step` without leaving
/// the bounds. Never exceeds `max_amount`, even when no lot fits the range.
pub fn sample_trade_amount<R: Rng + ?Sized>(
    rng: &mut R,
    trades: &TradeConfig,
    amount_step: Size,
) -> MakerResult<Size> {
    let expected = trades.expected_amount();
    let raw = sample_normal(rng, expected, expected * trades.amount_deviation)?;
    let clamped = Size::new(raw).clamp(trades.min_amount, trades.max_amount);

    let ceiling = trades.max_amount.round_to_lot(amount_step);
    let floor = trades.min_amount.ceil_to_lot(amount_step).min(ceiling);
    Ok(clamped.quantize(amount_step).clamp(floor, ceiling))
}

/// Trade loop body.
pub struct TradeGenerator {
    gateway: DynGateway,
    pair: CurrencyPair,
    config: Arc<MakerConfig>,
    rng: StdRng,
}

impl TradeGenerator {
    pub fn new(gateway: DynGateway, pair: CurrencyPair, config: Arc<MakerConfig>) -> Self {
        Self::with_rng(gateway, pair, config, StdRng::from_entropy())
    }

    /// Deterministic generator for tests and replays.
    pub fn with_rng(
        gateway: DynGateway,
        pair: CurrencyPair,
        config: Arc<MakerConfig>,
        rng: StdRng,
    ) -> Self {
        Self {
            gateway,
            pair,
            config,
            rng,
        }
    }

    pub fn pair(&self) -> &CurrencyPair {
        &self.pair
    }

    /// One trade attempt. Gateway faults propagate.
    pub async fn run_tick(&mut self) -> MakerResult<TradeOutcome> {
        let trades = &self.config.trades;
        let amount =
            sample_trade_amount(&mut self.rng, trades, self.config.orderbook.amount_step)?;
        let side = if self.rng.gen_bool(0.5) {
            OrderSide::Buy
        } else {
            OrderSide::Sell
        };

        let book = self.gateway.depth(&self.pair, EXECUTION_DEPTH).await?;
        let Some(price) = book.best(side.execution_side()) else {
            warn!(pair = %self.pair, %side, "No opposing liquidity, skipping trade");
            return Ok(TradeOutcome::NoLiquidity { side });
        };

        if price < trades.min_price || price > trades.max_price {
            error!(
                pair = %self.pair,
                %side,
                %price,
                min_price = %trades.min_price,
                max_price = %trades.max_price,
                "Circuit breaker: best price out of bounds, trade aborted"
            );
            Metrics::circuit_breaker_tripped(&self.pair.symbol(), &side.to_string());
            return Ok(TradeOutcome::CircuitBreaker { side, price });
        }

        let amount = ensure_minimum_notional(
            amount,
            price,
            self.config.min_order_notional,
            self.config.orderbook.amount_step,
        );
        debug!(pair = %self.pair, %side, %price, %amount, "Random trade");

        let request =
            OrderRequest::limit(self.pair.clone(), side, amount, price).immediate_or_cancel();
        let outcome = orders::submit(&*self.gateway, request, SOURCE_TRADE).await?;
        let placed = matches!(outcome, OrderOutcome::Placed(_));
        if placed {
            Metrics::trade_volume(
                &self.pair.symbol(),
                &side.to_string(),
                amount.inner().to_f64().unwrap_or(0.0),
            );
        }

        Ok(TradeOutcome::Submitted {
            side,
            price,
            amount,
            placed,
        })
    }

    /// Run one tick, trapping every failure at the tick boundary.
    pub async fn tick(&mut self) {
        let started = Instant::now();
        match self.run_tick().await {
            Ok(outcome) => debug!(pair = %self.pair, ?outcome, "Trade tick done"),
            Err(e) => {
                error!(pair = %self.pair, error = %e, "Trade tick failed");
                Metrics::tick_failed(TRADE_LOOP);
            }
        }
        Metrics::tick_duration(TRADE_LOOP, started.elapsed().as_secs_f64() * 1000.0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mm_core::BookLevel;
    use mm_gateway::{GatewayError, GatewayOp, PaperGateway, RejectReason};
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    fn px(d: Decimal) -> Price {
        Price::new(d)
    }

    fn sz(d: Decimal) -> Size {
        Size::new(d)
    }

    fn pair() -> CurrencyPair {
        CurrencyPair::new("BTC", "USDT").unwrap()
    }

    fn book_at(gateway: &PaperGateway, bid: Decimal, ask: Decimal) {
        gateway.set_external_book(
            &pair(),
            vec![BookLevel::new(px(bid), sz(dec!(5)))],
            vec![BookLevel::new(px(ask), sz(dec!(5)))],
        );
    }

    fn generator(gateway: Arc<PaperGateway>, config: MakerConfig, seed: u64) -> TradeGenerator {
        TradeGenerator::with_rng(
            gateway,
            pair(),
            Arc::new(config),
            StdRng::seed_from_u64(seed),
        )
    }

    #[test]
    fn test_sample_trade_amount_within_bounds_on_grid() {
        let trades = TradeConfig {
            min_amount: sz(dec!(0.05)),
            max_amount: sz(dec!(0.4)),
            amount_deviation: dec!(2),
            ..TradeConfig::default()
        };
        let step = sz(dec!(0.01));
        let mut rng = StdRng::seed_from_u64(11);
        for _ in 0..500 {
            let amount = sample_trade_amount(&mut rng, &trades, step).unwrap();
            assert!(amount >= trades.min_amount && amount <= trades.max_amount, "{amount}");
            assert!((amount.inner() / step.inner()).fract().is_zero());
        }
    }

    #[test]
    fn test_sample_trade_amount_off_grid_bounds() {
        // Bounds between lots: results are pulled inside.
        let trades = TradeConfig {
            min_amount: sz(dec!(0.015)),
            max_amount: sz(dec!(0.025)),
            ..TradeConfig::default()
        };
        let mut rng = StdRng::seed_from_u64(3);
        for _ in 0..100 {
            let amount = sample_trade_amount(&mut rng, &trades, sz(dec!(0.01))).unwrap();
            assert_eq!(amount, sz(dec!(0.02)));
        }
    }

    #[test]
    fn test_sample_trade_amount_never_exceeds_max_between_lots() {
        let trades = TradeConfig {
            min_amount: sz(dec!(0.015)),
            max_amount: sz(dec!(0.019)),
            ..TradeConfig::default()
        };
        let mut rng = StdRng::seed_from_u64(5);
        for _ in 0..100 {
            let amount = sample_trade_amount(&mut rng, &trades, sz(dec!(0.01))).unwrap();
            assert_eq!(amount, sz(dec!(0.01)));
        }
    }

    #[tokio::test]
    async fn test_trades_against_opposing_best() {
        let gateway = Arc::new(PaperGateway::new().with_pair(pair(), px(dec!(100))));
        book_at(&gateway, dec!(99), dec!(101));
        let mut generator = generator(gateway.clone(), MakerConfig::default(), 21);

        let outcome = generator.run_tick().await.unwrap();
        let TradeOutcome::Submitted {
            side,
            price,
            amount,
            placed,
        } = outcome
        else {
            panic!("expected a submitted trade, got {outcome:?}");
        };
        assert!(placed);
        match side {
            OrderSide::Buy => assert_eq!(price, px(dec!(101))),
            OrderSide::Sell => assert_eq!(price, px(dec!(99))),
        }
        // 10 quote minimum at ~100 needs at least 0.1.
        assert!(amount >= sz(dec!(0.1)));

        let created = gateway.created_orders();
        assert_eq!(created.len(), 1);
        assert!(created[0].is_ioc());
        assert_eq!(gateway.trades().len(), 1);
        assert_eq!(gateway.depth_requests(), vec![5]);
    }

    #[tokio::test]
    async fn test_circuit_breaker_blocks_order() {
        let gateway = Arc::new(PaperGateway::new().with_pair(pair(), px(dec!(50))));
        book_at(&gateway, dec!(50), dec!(50));
        let config = MakerConfig {
            trades: TradeConfig {
                min_price: px(dec!(60)),
                max_price: px(dec!(100)),
                ..TradeConfig::default()
            },
            ..MakerConfig::default()
        };
        let mut generator = generator(gateway.clone(), config, 4);

        for _ in 0..10 {
            let outcome = generator.run_tick().await.unwrap();
            assert!(matches!(
                outcome,
                TradeOutcome::CircuitBreaker { price, .. } if price == px(dec!(50))
            ));
        }
        assert!(gateway.created_orders().is_empty());
    }

    #[tokio::test]
    async fn test_empty_book_skips_trade() {
        let gateway = Arc::new(PaperGateway::new().with_pair(pair(), px(dec!(100))));
        let mut generator = generator(gateway.clone(), MakerConfig::default(), 8);

        let outcome = generator.run_tick().await.unwrap();
        assert!(matches!(outcome, TradeOutcome::NoLiquidity { .. }));
        assert!(gateway.created_orders().is_empty());
    }

    #[tokio::test]
    async fn test_rejection_is_reported_not_raised() {
        let gateway = Arc::new(PaperGateway::new().with_pair(pair(), px(dec!(100))));
        book_at(&gateway, dec!(99), dec!(101));
        gateway.reject_next_order(RejectReason::InsufficientFunds);
        let mut generator = generator(gateway.clone(), MakerConfig::default(), 9);

        let outcome = generator.run_tick().await.unwrap();
        assert!(matches!(outcome, TradeOutcome::Submitted { placed: false, .. }));
        assert!(gateway.trades().is_empty());
    }

    #[tokio::test]
    async fn test_tick_survives_gateway_fault() {
        let gateway = Arc::new(PaperGateway::new().with_pair(pair(), px(dec!(100))));
        book_at(&gateway, dec!(99), dec!(101));
        gateway.fail_next(GatewayOp::Depth, GatewayError::Transport("reset".into()));
        let mut generator = generator(gateway.clone(), MakerConfig::default(), 10);

        generator.tick().await;
        assert!(gateway.created_orders().is_empty());

        // Next tick starts from scratch.
        generator.tick().await;
        assert_eq!(gateway.created_orders().len(), 1);
    }
}
