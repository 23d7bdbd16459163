//! Orderbook replenishment.
//!
//! Each tick draws a random volume target per side and moves resting
//! liquidity toward it: new limit orders inside the price band when the
//! side is short, cancellations of small orders when it is long. Sides
//! already at the volume cap are left alone.

use std::collections::HashSet;

use mm_core::{CurrencyPair, OrderId, OrderRequest, OrderSide, Price, Size};
use mm_gateway::{ExchangeGateway, OrderOutcome};
use rand::Rng;
use tracing::debug;

use crate::band::{compute_price_band, BandAnchors, PriceBand, Traction};
use crate::config::MakerConfig;
use crate::error::MakerResult;
use crate::orders::{self, CANCEL_EXCESS_DEPTH, SOURCE_DEPTH};
use crate::random::random_decimal;
use crate::spread::{ensure_minimum_notional, SpreadLevels};

/// What one replenishment pass did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DepthReport {
    pub placed: usize,
    pub rejected: usize,
    pub cancelled: usize,
}

/// Move resting liquidity on both sides toward a fresh random target.
pub async fn maintain_depth<R: Rng + Send + ?Sized>(
    gateway: &dyn ExchangeGateway,
    pair: &CurrencyPair,
    config: &MakerConfig,
    spread: &SpreadLevels,
    reference: Price,
    rng: &mut R,
) -> MakerResult<DepthReport> {
    let ob = &config.orderbook;
    let book = gateway.depth(pair, ob.depth_limit).await?;
    debug!(%pair, age_ms = book.age_ms(), "Depth snapshot");
    let quoting = Quoting {
        gateway,
        pair,
        config,
        spread,
        traction: config.traction.as_ref().map(|t| Traction {
            rate_up: t.rate_up,
            rate_down: t.rate_down,
            attractor: reference,
        }),
    };

    let mut sides = [OrderSide::Buy, OrderSide::Sell];
    if rng.gen_bool(0.5) {
        sides.reverse();
    }

    let mut report = DepthReport::default();

    for side in sides {
        let current = book.total_amount(side.resting_side());
        if current >= ob.max_volume {
            debug!(%side, %current, max = %ob.max_volume, "Side at volume cap, skipping");
            continue;
        }

        let target = Size::new(random_decimal(
            rng,
            ob.min_volume.inner(),
            ob.max_volume.inner(),
            ob.amount_step.inner(),
        ));
        let deficit = target - current;
        debug!(%side, %current, %target, %deficit, "Depth target");

        if deficit > ob.min_order_amount {
            quoting.add_liquidity(side, deficit, rng, &mut report).await?;
        } else if deficit.is_negative() {
            report.cancelled += trim_liquidity(gateway, pair, side, deficit).await?;
        }
    }

    Ok(report)
}

/// Inputs shared by every liquidity order in one pass.
struct Quoting<'a> {
    gateway: &'a dyn ExchangeGateway,
    pair: &'a CurrencyPair,
    config: &'a MakerConfig,
    spread: &'a SpreadLevels,
    traction: Option<Traction>,
}

impl Quoting<'_> {
    /// Band for the next order on `side`, from a fresh book and last price.
    ///
    /// Our own previous orders count as anchors, so with an empty opposing
    /// side the band steps away from the market as orders stack up.
    async fn band(&self, side: OrderSide) -> MakerResult<PriceBand> {
        let ob = &self.config.orderbook;
        let book = self.gateway.depth(self.pair, ob.depth_limit).await?;
        let last = self.gateway.ticker(self.pair).await?.last;
        let band = compute_price_band(
            side,
            &BandAnchors::from_snapshot(&book, last),
            ob.price_range,
            ob.price_step,
            self.traction.as_ref(),
        )
        .within_spread(side, self.spread);
        debug!(%side, min = %band.min, max = %band.max, "Price band");
        Ok(band)
    }

    async fn add_liquidity<R: Rng + Send + ?Sized>(
        &self,
        side: OrderSide,
        mut deficit: Size,
        rng: &mut R,
        report: &mut DepthReport,
    ) -> MakerResult<()> {
        let ob = &self.config.orderbook;

        while deficit > ob.min_order_amount {
            let price = self.band(side).await?.sample(rng, ob.price_step);
            let min_amount = ensure_minimum_notional(
                ob.min_order_amount,
                price,
                self.config.min_order_notional,
                ob.amount_step,
            );
            let amount = Size::new(random_decimal(
                rng,
                min_amount.inner(),
                deficit.inner(),
                ob.amount_step.inner(),
            ));

            let request = OrderRequest::limit(self.pair.clone(), side, amount, price);
            match orders::submit(self.gateway, request, SOURCE_DEPTH).await? {
                OrderOutcome::Placed(_) => report.placed += 1,
                // Counted anyway, or a persistent rejection would spin forever.
                OrderOutcome::Rejected(_) => report.rejected += 1,
            }
            deficit -= amount;
        }
        Ok(())
    }
}

/// Cancel orders smaller than the excess until the side is back under its
/// target. Returns how many orders were cancelled.
async fn trim_liquidity(
    gateway: &dyn ExchangeGateway,
    pair: &CurrencyPair,
    side: OrderSide,
    mut deficit: Size,
) -> MakerResult<usize> {
    let mut cancelled: HashSet<OrderId> = HashSet::new();

    while deficit.is_negative() {
        let open = gateway.open_orders().await?;
        let mut found = false;

        for order in open.iter().filter(|o| &o.pair == pair && o.side == side) {
            if !deficit.is_negative() {
                break;
            }
            if cancelled.contains(&order.id) {
                continue;
            }
            if order.amount < -deficit {
                orders::cancel(gateway, order, CANCEL_EXCESS_DEPTH).await?;
                cancelled.insert(order.id.clone());
                deficit += order.amount;
                found = true;
            }
        }

        if !found {
            break;
        }
    }

    Ok(cancelled.len())
}
