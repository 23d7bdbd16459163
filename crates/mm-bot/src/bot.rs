//! Bot lifecycle.
//!
//! Owns the orderbook loop and the trade loop. The orderbook loop starts at
//! once; the trade loop waits `start_delay` so the book has liquidity to
//! trade against. `stop` cancels both and joins each with a bounded wait.

use std::sync::Arc;
use std::time::Duration;

use mm_core::CurrencyPair;
use mm_gateway::{DynGateway, DynReferenceSource};
use mm_maker::{MakerConfig, OrderbookCycle, ReferencePriceResolver, TradeGenerator};
use tracing::{info, warn};

use crate::scheduler::{spawn_periodic, JoinOutcome, Schedule, TaskHandle};

/// How one loop ended on shutdown.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoopShutdown {
    pub name: &'static str,
    pub outcome: JoinOutcome,
}

/// Result of [`MarketMakerBot::stop`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ShutdownReport {
    pub loops: Vec<LoopShutdown>,
}

impl ShutdownReport {
    /// Every loop stopped within the grace period without panicking.
    pub fn all_stopped(&self) -> bool {
        self.loops.iter().all(|l| l.outcome == JoinOutcome::Stopped)
    }

    pub fn outcome(&self, name: &str) -> Option<JoinOutcome> {
        self.loops.iter().find(|l| l.name == name).map(|l| l.outcome)
    }
}

/// Running market maker for one pair.
#[derive(Debug)]
pub struct MarketMakerBot {
    pair: CurrencyPair,
    orderbook: TaskHandle,
    trades: TaskHandle,
    shutdown_grace: Duration,
}

impl MarketMakerBot {
    /// Build both loop bodies and start them. Must run inside a tokio runtime.
    pub fn start(
        pair: CurrencyPair,
        config: MakerConfig,
        gateway: DynGateway,
        external: Option<DynReferenceSource>,
    ) -> Self {
        let config = Arc::new(config);
        let resolver = Arc::new(ReferencePriceResolver::new(
            pair.clone(),
            gateway.clone(),
            external,
            config.start_price,
        ));
        let orderbook =
            OrderbookCycle::new(gateway.clone(), pair.clone(), config.clone(), resolver);
        let trades = TradeGenerator::new(gateway, pair, config.clone());
        Self::start_with(orderbook, trades, &config)
    }

    /// Start prebuilt loop bodies.
    pub fn start_with(
        orderbook: OrderbookCycle,
        trades: TradeGenerator,
        config: &MakerConfig,
    ) -> Self {
        let pair = orderbook.pair().clone();
        info!(
            %pair,
            orderbook_interval_ms = config.orderbook.interval_ms,
            trade_min_interval_ms = config.trades.min_interval_ms,
            trade_max_interval_ms = config.trades.max_interval_ms,
            start_delay_ms = config.start_delay_ms,
            "Starting market maker"
        );

        let orderbook = spawn_periodic(
            orderbook,
            Schedule::Fixed(config.orderbook.interval()),
            Duration::ZERO,
        );
        let trades = spawn_periodic(
            trades,
            Schedule::Jittered {
                min: config.trades.min_interval(),
                max: config.trades.max_interval(),
            },
            config.start_delay(),
        );

        Self {
            pair,
            orderbook,
            trades,
            shutdown_grace: config.shutdown_grace(),
        }
    }

    pub fn pair(&self) -> &CurrencyPair {
        &self.pair
    }

    /// Cancel both loops and wait for each, up to the shutdown grace.
    pub async fn stop(self) -> ShutdownReport {
        info!(pair = %self.pair, "Stopping market maker");
        self.orderbook.cancel();
        self.trades.cancel();

        let mut report = ShutdownReport::default();
        for handle in [self.orderbook, self.trades] {
            let name = handle.name();
            let outcome = handle.join(self.shutdown_grace).await;
            report.loops.push(LoopShutdown { name, outcome });
        }

        if report.all_stopped() {
            info!(pair = %self.pair, "Market maker stopped");
        } else {
            warn!(pair = %self.pair, loops = ?report.loops, "Market maker stopped uncleanly");
        }
        report
    }
}
