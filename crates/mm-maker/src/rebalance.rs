//! Inventory rebalancing.
//!
//! Hard cap on our own resting volume per side, independent of the random
//! depth target. When a side is over the cap, the order furthest from the
//! market is cancelled: the lowest bid or the highest ask.

use mm_core::{CurrencyPair, OpenOrder, OrderId, OrderSide, Size};
use mm_gateway::ExchangeGateway;
use tracing::debug;

use crate::error::MakerResult;
use crate::orders::{self, CANCEL_VOLUME_CAP};

/// Our resting volume on one pair.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InventorySummary {
    pub buy_volume: Size,
    pub sell_volume: Size,
    pub lowest_buy: Option<OpenOrder>,
    pub highest_sell: Option<OpenOrder>,
}

/// Sum resting volume per side for `pair`, ignoring other pairs.
pub fn summarize(orders: &[OpenOrder], pair: &CurrencyPair) -> InventorySummary {
    let mut summary = InventorySummary::default();

    for order in orders.iter().filter(|o| &o.pair == pair) {
        match order.side {
            OrderSide::Buy => {
                summary.buy_volume += order.amount;
                if summary
                    .lowest_buy
                    .as_ref()
                    .map_or(true, |lowest| order.price < lowest.price)
                {
                    summary.lowest_buy = Some(order.clone());
                }
            }
            OrderSide::Sell => {
                summary.sell_volume += order.amount;
                if summary
                    .highest_sell
                    .as_ref()
                    .map_or(true, |highest| order.price > highest.price)
                {
                    summary.highest_sell = Some(order.clone());
                }
            }
        }
    }

    summary
}

/// Cancel at most one order per side when that side exceeds `max_volume`.
/// Returns the cancelled order ids.
pub async fn rebalance(
    gateway: &dyn ExchangeGateway,
    pair: &CurrencyPair,
    max_volume: Size,
) -> MakerResult<Vec<OrderId>> {
    let open = gateway.open_orders().await?;
    let summary = summarize(&open, pair);
    debug!(
        buy_volume = %summary.buy_volume,
        sell_volume = %summary.sell_volume,
        max = %max_volume,
        "Own inventory"
    );

    let mut cancelled = Vec::new();
    let over_cap = [
        (summary.buy_volume, summary.lowest_buy),
        (summary.sell_volume, summary.highest_sell),
    ];
    for (volume, furthest) in over_cap {
        if volume <= max_volume {
            continue;
        }
        if let Some(order) = furthest {
            orders::cancel(gateway, &order, CANCEL_VOLUME_CAP).await?;
            cancelled.push(order.id);
        }
    }

    Ok(cancelled)
}
