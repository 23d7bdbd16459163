//! Exchange access for the market-making bot.
//!
//! Everything the control loops know about the outside world goes through
//! two capabilities defined here:
//! - [`ExchangeGateway`]: market data and order management for one account
//! - [`ReferencePriceSource`]: an independent fair-price feed
//!
//! Ships with [`PaperGateway`], an in-memory exchange, and [`HttpPriceFeed`],
//! a ticker-endpoint price feed.

pub mod error;
pub mod gateway;
pub mod http_feed;
pub mod paper;
pub mod reference;

pub use error::{GatewayError, GatewayResult, ReferenceError, ReferenceResult};
pub use gateway::{
    snap_depth_limit, BoxFuture, DynGateway, ExchangeGateway, OrderOutcome, PlacedOrder,
    RejectReason, SUPPORTED_DEPTH_LIMITS,
};
pub use http_feed::HttpPriceFeed;
pub use paper::{GatewayOp, PaperGateway, PaperTrade};
pub use reference::{DynReferenceSource, ReferencePriceSource};
