//! Order submission and cancellation with logging and metrics.

use mm_core::{OpenOrder, OrderRequest};
use mm_gateway::{ExchangeGateway, OrderOutcome};
use mm_telemetry::Metrics;
use tracing::{info, warn};

use crate::error::MakerResult;

/// Metric and log label of the spread quotes.
pub const SOURCE_SPREAD: &str = "spread";
/// Metric and log label of liquidity orders.
pub const SOURCE_DEPTH: &str = "depth";
/// Metric and log label of generated trades.
pub const SOURCE_TRADE: &str = "trade";

/// Cancel reason: side above its random volume target.
pub const CANCEL_EXCESS_DEPTH: &str = "excess_depth";
/// Cancel reason: side above the hard volume cap.
pub const CANCEL_VOLUME_CAP: &str = "volume_cap";

/// Submit an order. Rejections are logged and returned, faults propagate.
pub(crate) async fn submit(
    gateway: &dyn ExchangeGateway,
    request: OrderRequest,
    source: &'static str,
) -> MakerResult<OrderOutcome> {
    let pair = request.pair.symbol();
    let side = request.side;
    info!(source, order = %request, "Creating order");

    let outcome = gateway.create_order(request).await?;
    match &outcome {
        OrderOutcome::Placed(placed) => {
            info!(source, order_id = %placed.id, "Order placed");
            Metrics::order_placed(&pair, source, &side.to_string());
        }
        OrderOutcome::Rejected(reason) => {
            warn!(source, %pair, %side, %reason, "Order rejected by exchange");
            Metrics::order_rejected(&pair, reason.as_label());
        }
    }
    Ok(outcome)
}

/// Cancel one of our resting orders.
pub(crate) async fn cancel(
    gateway: &dyn ExchangeGateway,
    order: &OpenOrder,
    reason: &'static str,
) -> MakerResult<()> {
    info!(
        reason,
        order_id = %order.id,
        side = %order.side,
        amount = %order.amount,
        price = %order.price,
        "Removing order"
    );
    gateway
        .cancel_order(&order.pair, &order.id, order.side)
        .await?;
    Metrics::order_cancelled(&order.pair.symbol(), reason);
    Ok(())
}
