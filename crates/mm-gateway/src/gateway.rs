//! Exchange gateway capability.
//!
//! Provides a trait-based abstraction over one exchange account. The
//! decision logic depends only on this trait, which allows for:
//! - Paper trading and unit testing with the in-memory [`crate::PaperGateway`]
//! - One adapter per exchange, none of which leak exchange types inward
//!
//! Implementations must be safe to call concurrently from both control
//! loops and must bound every call with their own timeout.

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use mm_core::{
    CurrencyPair, OpenOrder, OrderBookSnapshot, OrderId, OrderRequest, OrderSide, Ticker,
};

use crate::error::GatewayResult;

/// Boxed future for dyn-compatible async trait methods.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Depth limits accepted by the exchange API.
pub const SUPPORTED_DEPTH_LIMITS: [u32; 7] = [5, 10, 20, 50, 100, 500, 1000];

/// Snap a requested depth to the nearest supported limit.
///
/// Ties resolve to the smaller limit.
pub fn snap_depth_limit(limit: u32) -> u32 {
    SUPPORTED_DEPTH_LIMITS
        .iter()
        .copied()
        .min_by_key(|allowed| allowed.abs_diff(limit))
        .unwrap_or(100)
}

/// Why the exchange refused an order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RejectReason {
    /// Notional below the exchange minimum.
    BelowMinimum,
    InsufficientFunds,
    InvalidPrice,
    InvalidAmount,
    Other(String),
}

impl RejectReason {
    /// Short label for metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            Self::BelowMinimum => "below_minimum",
            Self::InsufficientFunds => "insufficient_funds",
            Self::InvalidPrice => "invalid_price",
            Self::InvalidAmount => "invalid_amount",
            Self::Other(_) => "other",
        }
    }
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::BelowMinimum => write!(f, "order value below exchange minimum"),
            Self::InsufficientFunds => write!(f, "insufficient funds"),
            Self::InvalidPrice => write!(f, "invalid price"),
            Self::InvalidAmount => write!(f, "invalid amount"),
            Self::Other(msg) => write!(f, "{msg}"),
        }
    }
}

/// Order accepted by the exchange.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlacedOrder {
    pub id: OrderId,
    pub request: OrderRequest,
}

/// Result of an order submission that reached the exchange.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OrderOutcome {
    Placed(PlacedOrder),
    Rejected(RejectReason),
}

impl OrderOutcome {
    #[must_use]
    pub fn is_placed(&self) -> bool {
        matches!(self, Self::Placed(_))
    }

    pub fn order_id(&self) -> Option<&OrderId> {
        match self {
            Self::Placed(order) => Some(&order.id),
            Self::Rejected(_) => None,
        }
    }
}

/// Exchange gateway used by the control loops.
pub trait ExchangeGateway: Send + Sync {
    /// Latest ticker for `pair`.
    fn ticker<'a>(&'a self, pair: &'a CurrencyPair) -> BoxFuture<'a, GatewayResult<Ticker>>;

    /// Order book snapshot for `pair`, at most `limit` levels per side.
    ///
    /// Implementations snap `limit` with [`snap_depth_limit`].
    fn depth<'a>(
        &'a self,
        pair: &'a CurrencyPair,
        limit: u32,
    ) -> BoxFuture<'a, GatewayResult<OrderBookSnapshot>>;

    /// Submit an order. Exchange rejections are `Ok(OrderOutcome::Rejected)`.
    fn create_order(&self, request: OrderRequest) -> BoxFuture<'_, GatewayResult<OrderOutcome>>;

    /// Cancel one of our resting orders.
    fn cancel_order<'a>(
        &'a self,
        pair: &'a CurrencyPair,
        order_id: &'a OrderId,
        side: OrderSide,
    ) -> BoxFuture<'a, GatewayResult<()>>;

    /// All of our open orders, across every pair.
    fn open_orders(&self) -> BoxFuture<'_, GatewayResult<Vec<OpenOrder>>>;
}

/// Arc wrapper for gateway trait objects.
pub type DynGateway = Arc<dyn ExchangeGateway>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snap_depth_limit() {
        assert_eq!(snap_depth_limit(100), 100);
        assert_eq!(snap_depth_limit(1), 5);
        assert_eq!(snap_depth_limit(7), 5); // |5-7| < |10-7|
        assert_eq!(snap_depth_limit(15), 10); // tie -> smaller
        assert_eq!(snap_depth_limit(80), 100);
        assert_eq!(snap_depth_limit(5000), 1000);
    }

    #[test]
    fn test_reject_reason_labels() {
        assert_eq!(RejectReason::BelowMinimum.as_label(), "below_minimum");
        assert_eq!(RejectReason::Other("x".into()).as_label(), "other");
        assert_eq!(RejectReason::Other("boom".into()).to_string(), "boom");
    }
}
