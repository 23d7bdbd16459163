//! Market making decision logic for a single currency pair.
//!
//! Two loop bodies drive everything:
//!
//! ```text
//! OrderbookCycle (fixed interval)
//!   ├─ ReferencePriceResolver: external feed → last trade → start price
//!   ├─ maintain_spread: quote bid/ask around the reference
//!   ├─ maintain_depth: add or trim liquidity toward a random target
//!   └─ rebalance: hard cap on own resting volume per side
//!
//! TradeGenerator (jittered interval)
//!   └─ one IOC order against the best opposing price, behind a circuit breaker
//! ```
//!
//! Every exchange call goes through [`mm_gateway::ExchangeGateway`].

pub mod band;
pub mod config;
pub mod error;
pub mod orderbook;
pub mod orders;
pub mod random;
pub mod rebalance;
pub mod reference;
pub mod replenish;
pub mod spread;
pub mod trade;

pub use band::{compute_price_band, BandAnchors, PriceBand, Traction};
pub use config::{MakerConfig, OrderbookConfig, TradeConfig, TractionConfig};
pub use error::{MakerError, MakerResult};
pub use orderbook::{OrderbookCycle, OrderbookReport, ORDERBOOK_LOOP};
pub use random::{random_decimal, sample_normal};
pub use rebalance::{rebalance, summarize, InventorySummary};
pub use reference::ReferencePriceResolver;
pub use replenish::{maintain_depth, DepthReport};
pub use spread::{
    compute_spread_levels, ensure_minimum_notional, maintain_spread, SpreadLevels, SpreadReport,
};
pub use trade::{sample_trade_amount, TradeGenerator, TradeOutcome, TRADE_LOOP};
