//! Orderbook loop body.
//!
//! One tick resolves the reference price, keeps the spread quoted, moves
//! resting liquidity toward a random target and enforces the volume cap,
//! in that order. A gateway fault abandons the rest of the tick.

use std::sync::Arc;
use std::time::Instant;

use mm_core::{CurrencyPair, OrderId, Price};
use mm_gateway::DynGateway;
use mm_telemetry::Metrics;
use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::{debug, error};

use crate::config::MakerConfig;
use crate::error::MakerResult;
use crate::rebalance::rebalance;
use crate::reference::ReferencePriceResolver;
use crate::replenish::{maintain_depth, DepthReport};
use crate::spread::{compute_spread_levels, maintain_spread, SpreadLevels, SpreadReport};

/// Loop label for logs and metrics.
pub const ORDERBOOK_LOOP: &str = "orderbook";

/// What one orderbook tick did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderbookReport {
    pub reference: Price,
    pub levels: SpreadLevels,
    pub spread: SpreadReport,
    pub depth: DepthReport,
    pub rebalanced: Vec<OrderId>,
}

/// Orderbook loop body.
pub struct OrderbookCycle {
    gateway: DynGateway,
    pair: CurrencyPair,
    config: Arc<MakerConfig>,
    resolver: Arc<ReferencePriceResolver>,
    rng: StdRng,
}

impl OrderbookCycle {
    pub fn new(
        gateway: DynGateway,
        pair: CurrencyPair,
        config: Arc<MakerConfig>,
        resolver: Arc<ReferencePriceResolver>,
    ) -> Self {
        Self::with_rng(gateway, pair, config, resolver, StdRng::from_entropy())
    }

    pub fn with_rng(
        gateway: DynGateway,
        pair: CurrencyPair,
        config: Arc<MakerConfig>,
        resolver: Arc<ReferencePriceResolver>,
        rng: StdRng,
    ) -> Self {
        Self {
            gateway,
            pair,
            config,
            resolver,
            rng,
        }
    }

    pub fn pair(&self) -> &CurrencyPair {
        &self.pair
    }

    pub async fn run_tick(&mut self) -> MakerResult<OrderbookReport> {
        let config = &*self.config;
        let gateway = &*self.gateway;

        let reference = self.resolver.reference_price().await?;
        let levels = compute_spread_levels(
            reference,
            config.max_spread,
            config.orderbook.price_step,
        );
        debug!(
            pair = %self.pair,
            %reference,
            bid = %levels.bid,
            ask = %levels.ask,
            "Spread levels"
        );

        let spread = maintain_spread(gateway, &self.pair, levels, config, &mut self.rng).await?;
        let depth = maintain_depth(
            gateway,
            &self.pair,
            config,
            &levels,
            reference,
            &mut self.rng,
        )
        .await?;
        let rebalanced = rebalance(gateway, &self.pair, config.orderbook.max_volume).await?;

        Ok(OrderbookReport {
            reference,
            levels,
            spread,
            depth,
            rebalanced,
        })
    }

    /// Run one tick, trapping every failure at the tick boundary.
    pub async fn tick(&mut self) {
        let started = Instant::now();
        match self.run_tick().await {
            Ok(report) => debug!(
                pair = %self.pair,
                placed = report.depth.placed,
                cancelled = report.depth.cancelled + report.rebalanced.len(),
                "Orderbook tick done"
            ),
            Err(e) => {
                error!(pair = %self.pair, error = %e, "Orderbook tick failed");
                Metrics::tick_failed(ORDERBOOK_LOOP);
            }
        }
        Metrics::tick_duration(ORDERBOOK_LOOP, started.elapsed().as_secs_f64() * 1000.0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::OrderbookConfig;
    use mm_core::{OrderSide, Size};
    use mm_gateway::{GatewayError, GatewayOp, PaperGateway};
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

    fn cycle(gateway: Arc<PaperGateway>, config: MakerConfig, seed: u64) -> OrderbookCycle {
        let resolver = Arc::new(ReferencePriceResolver::new(
            pair(),
            gateway.clone(),
            None,
            config.start_price,
        ));
        OrderbookCycle::with_rng(
            gateway,
            pair(),
            Arc::new(config),
            resolver,
            StdRng::seed_from_u64(seed),
        )
    }

    fn small_book_config() -> MakerConfig {
        MakerConfig {
            orderbook: OrderbookConfig {
                min_volume: sz(dec!(2)),
                max_volume: sz(dec!(4)),
                ..OrderbookConfig::default()
            },
            ..MakerConfig::default()
        }
    }

    #[tokio::test]
    async fn test_first_tick_quotes_and_fills_both_sides() {
        let gateway = Arc::new(PaperGateway::new().with_pair(pair(), Price::ZERO));
        let mut cycle = cycle(gateway.clone(), small_book_config(), 1);

        let report = cycle.run_tick().await.unwrap();

        // No last price: start price 100 is the reference.
        assert_eq!(report.reference, px(dec!(100)));
        assert_eq!(report.levels.bid, px(dec!(99)));
        assert_eq!(report.levels.ask, px(dec!(101)));
        assert!(report.spread.bid_quoted && report.spread.ask_quoted);

        let bids = gateway.resting(&pair(), OrderSide::Buy);
        let asks = gateway.resting(&pair(), OrderSide::Sell);
        assert!(bids.iter().any(|o| o.price == px(dec!(99))));
        assert!(asks.iter().any(|o| o.price == px(dec!(101))));
        assert!(bids.iter().all(|o| o.price <= px(dec!(99))));
        assert!(asks.iter().all(|o| o.price >= px(dec!(101))));
    }

    #[tokio::test]
    async fn test_repeated_ticks_respect_volume_cap() {
        let gateway = Arc::new(PaperGateway::new().with_pair(pair(), px(dec!(100))));
        let mut cycle = cycle(gateway.clone(), small_book_config(), 2);

        for _ in 0..20 {
            cycle.run_tick().await.unwrap();
        }

        // Cap plus at most one spread quote.
        for side in [OrderSide::Buy, OrderSide::Sell] {
            let volume = gateway.resting_volume(&pair(), side);
            assert!(volume <= sz(dec!(5)), "{side} volume {volume}");
        }
    }

    #[tokio::test]
    async fn test_depth_fault_abandons_tick() {
        let gateway = Arc::new(PaperGateway::new().with_pair(pair(), px(dec!(100))));
        gateway.fail_next(
            GatewayOp::Depth,
            GatewayError::Timeout(std::time::Duration::from_secs(5)),
        );
        let mut cycle = cycle(gateway.clone(), small_book_config(), 3);

        assert!(cycle.run_tick().await.is_err());
        assert!(gateway.created_orders().is_empty());

        cycle.tick().await;
        assert!(!gateway.created_orders().is_empty());
    }

    #[tokio::test]
    async fn test_ticker_fault_abandons_tick() {
        let gateway = Arc::new(PaperGateway::new().with_pair(pair(), px(dec!(43000))));
        gateway.set_external_book(
            &pair(),
            vec![mm_core::BookLevel::new(px(dec!(42990)), sz(dec!(1)))],
            vec![mm_core::BookLevel::new(px(dec!(43010)), sz(dec!(1)))],
        );
        gateway.fail_next(GatewayOp::Ticker, GatewayError::Transport("reset".into()));
        let mut cycle = cycle(gateway.clone(), small_book_config(), 4);

        assert!(cycle.run_tick().await.is_err());
        assert!(gateway.created_orders().is_empty());

        // Next tick quotes around the live market, not the start price.
        let report = cycle.run_tick().await.unwrap();
        assert_eq!(report.reference, px(dec!(43000)));
        assert!(gateway
            .created_orders()
            .iter()
            .filter(|o| o.side == OrderSide::Sell)
            .all(|o| o.price >= Some(px(dec!(43000)))));
    }
}
