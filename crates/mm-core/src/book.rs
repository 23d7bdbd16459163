//! Order book snapshot and ticker types.
//!
//! A snapshot is a one-shot read of market depth: bids sorted by price
//! descending, asks ascending. An empty side is a valid state and simply
//! has no best price.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::CoreError;
use crate::{Price, Size};

/// Side of the order book.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BookSide {
    Bids,
    Asks,
}

impl BookSide {
    pub fn opposite(&self) -> Self {
        match self {
            Self::Bids => Self::Asks,
            Self::Asks => Self::Bids,
        }
    }

    /// Order side whose resting orders populate this book side.
    pub fn order_side(&self) -> crate::OrderSide {
        match self {
            Self::Bids => crate::OrderSide::Buy,
            Self::Asks => crate::OrderSide::Sell,
        }
    }
}

impl fmt::Display for BookSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bids => write!(f, "bids"),
            Self::Asks => write!(f, "asks"),
        }
    }
}

/// One aggregated price level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookLevel {
    pub price: Price,
    pub amount: Size,
}

impl BookLevel {
    pub fn new(price: Price, amount: Size) -> Self {
        Self { price, amount }
    }
}

/// Order book snapshot for one pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderBookSnapshot {
    /// Bid levels, best (highest) first.
    bids: Vec<BookLevel>,
    /// Ask levels, best (lowest) first.
    asks: Vec<BookLevel>,
    /// When this snapshot was taken.
    pub fetched_at: DateTime<Utc>,
}

impl OrderBookSnapshot {
    /// Build a snapshot, checking that both sides are correctly ordered.
    pub fn new(bids: Vec<BookLevel>, asks: Vec<BookLevel>) -> Result<Self, CoreError> {
        if bids.windows(2).any(|w| w[0].price < w[1].price) {
            return Err(CoreError::InvalidBook(
                "bids must be sorted by price descending".to_string(),
            ));
        }
        if asks.windows(2).any(|w| w[0].price > w[1].price) {
            return Err(CoreError::InvalidBook(
                "asks must be sorted by price ascending".to_string(),
            ));
        }
        Ok(Self {
            bids,
            asks,
            fetched_at: Utc::now(),
        })
    }

    /// Build a snapshot from unsorted levels, sorting each side.
    pub fn from_unsorted(mut bids: Vec<BookLevel>, mut asks: Vec<BookLevel>) -> Self {
        bids.sort_by(|a, b| b.price.cmp(&a.price));
        asks.sort_by(|a, b| a.price.cmp(&b.price));
        Self {
            bids,
            asks,
            fetched_at: Utc::now(),
        }
    }

    pub fn empty() -> Self {
        Self::from_unsorted(Vec::new(), Vec::new())
    }

    pub fn bids(&self) -> &[BookLevel] {
        &self.bids
    }

    pub fn asks(&self) -> &[BookLevel] {
        &self.asks
    }

    pub fn levels(&self, side: BookSide) -> &[BookLevel] {
        match side {
            BookSide::Bids => &self.bids,
            BookSide::Asks => &self.asks,
        }
    }

    pub fn best_bid(&self) -> Option<Price> {
        self.bids.first().map(|l| l.price)
    }

    pub fn best_ask(&self) -> Option<Price> {
        self.asks.first().map(|l| l.price)
    }

    pub fn best(&self, side: BookSide) -> Option<Price> {
        match side {
            BookSide::Bids => self.best_bid(),
            BookSide::Asks => self.best_ask(),
        }
    }

    /// Total resting amount across all levels of one side.
    pub fn total_amount(&self, side: BookSide) -> Size {
        self.levels(side).iter().map(|l| l.amount).sum()
    }

    /// Milliseconds elapsed since the snapshot was taken.
    pub fn age_ms(&self) -> i64 {
        (Utc::now() - self.fetched_at).num_milliseconds()
    }

    /// Keep only the best `depth` levels per side.
    #[must_use]
    pub fn truncated(mut self, depth: usize) -> Self {
        self.bids.truncate(depth);
        self.asks.truncate(depth);
        self
    }
}

/// Ticker data; only the last traded price is used.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ticker {
    /// Last traded price. Zero when the pair has never traded.
    pub last: Price,
}

impl Ticker {
    pub fn new(last: Price) -> Self {
        Self { last }
    }
}
