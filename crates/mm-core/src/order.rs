//! Order-related types and identifiers.
//!
//! Provides order side, type, time-in-force, exchange order IDs, the open
//! order view and the order request submitted to a gateway.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::book::BookSide;
use crate::market::CurrencyPair;
use crate::{Price, Size};

/// Order side: buy or sell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderSide {
    Buy,
    Sell,
}

impl OrderSide {
    /// Returns the opposite side.
    pub fn opposite(&self) -> Self {
        match self {
            Self::Buy => Self::Sell,
            Self::Sell => Self::Buy,
        }
    }

    /// Book side where a resting order of this side lives.
    pub fn resting_side(&self) -> BookSide {
        match self {
            Self::Buy => BookSide::Bids,
            Self::Sell => BookSide::Asks,
        }
    }

    /// Book side an aggressive order of this side executes against.
    ///
    /// A buy lifts the best ask, a sell hits the best bid.
    pub fn execution_side(&self) -> BookSide {
        self.resting_side().opposite()
    }
}

impl fmt::Display for OrderSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Buy => write!(f, "buy"),
            Self::Sell => write!(f, "sell"),
        }
    }
}

/// Order type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderType {
    Limit,
    Market,
}

impl fmt::Display for OrderType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Limit => write!(f, "limit"),
            Self::Market => write!(f, "market"),
        }
    }
}

/// Time-in-force for orders.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum TimeInForce {
    /// Good-til-cancelled (resting liquidity).
    #[default]
    #[serde(rename = "Gtc")]
    GoodTilCancelled,
    /// Immediate-or-cancel (volume trades).
    #[serde(rename = "Ioc")]
    ImmediateOrCancel,
}

impl fmt::Display for TimeInForce {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::GoodTilCancelled => write!(f, "Gtc"),
            Self::ImmediateOrCancel => write!(f, "Ioc"),
        }
    }
}

/// Exchange-assigned order identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OrderId(String);

impl OrderId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for OrderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for OrderId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for OrderId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Snapshot of one of our resting orders, as reported by the gateway.
///
/// Read fresh on every tick and never cached across ticks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OpenOrder {
    pub id: OrderId,
    pub pair: CurrencyPair,
    pub side: OrderSide,
    pub price: Price,
    /// Remaining (unfilled) amount.
    pub amount: Size,
}

impl OpenOrder {
    pub fn new(
        id: impl Into<OrderId>,
        pair: CurrencyPair,
        side: OrderSide,
        price: Price,
        amount: Size,
    ) -> Self {
        Self {
            id: id.into(),
            pair,
            side,
            price,
            amount,
        }
    }
}

/// Order submission request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderRequest {
    pub pair: CurrencyPair,
    pub order_type: OrderType,
    pub side: OrderSide,
    pub amount: Size,
    /// Limit price; `None` for market orders.
    pub price: Option<Price>,
    pub time_in_force: TimeInForce,
}

impl OrderRequest {
    /// Resting GTC limit order.
    pub fn limit(pair: CurrencyPair, side: OrderSide, amount: Size, price: Price) -> Self {
        Self {
            pair,
            order_type: OrderType::Limit,
            side,
            amount,
            price: Some(price),
            time_in_force: TimeInForce::GoodTilCancelled,
        }
    }

    /// Market order (no price).
    pub fn market(pair: CurrencyPair, side: OrderSide, amount: Size) -> Self {
        Self {
            pair,
            order_type: OrderType::Market,
            side,
            amount,
            price: None,
            time_in_force: TimeInForce::ImmediateOrCancel,
        }
    }

    /// Mark this order immediate-or-cancel.
    #[must_use]
    pub fn immediate_or_cancel(mut self) -> Self {
        self.time_in_force = TimeInForce::ImmediateOrCancel;
        self
    }

    pub fn is_ioc(&self) -> bool {
        self.time_in_force == TimeInForce::ImmediateOrCancel
    }

    /// Notional value at the limit price, if any.
    pub fn notional(&self) -> Option<rust_decimal::Decimal> {
        self.price.map(|p| self.amount.notional(p))
    }
}

impl fmt::Display for OrderRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.price {
            Some(price) => write!(
                f,
                "{} {} {} {} @ {} ({})",
                self.order_type, self.side, self.amount, self.pair, price, self.time_in_force
            ),
            None => write!(
                f,
                "{} {} {} {}",
                self.order_type, self.side, self.amount, self.pair
            ),
        }
    }
}
