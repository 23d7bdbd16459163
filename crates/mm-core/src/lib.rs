//! Core domain types for the market-making bot.
//!
//! This crate provides the value types shared by every other crate:
//! - `Price`, `Size`: precision-safe numeric types with step rounding
//! - `CurrencyPair`: the single pair a bot instance trades
//! - `OrderBookSnapshot`, `Ticker`: market data read once per tick
//! - `OpenOrder`, `OrderRequest`, `OrderSide`: order views and submissions

pub mod book;
pub mod decimal;
pub mod error;
pub mod market;
pub mod order;

pub use book::{BookLevel, BookSide, OrderBookSnapshot, Ticker};
pub use decimal::{Price, Size};
pub use error::{CoreError, Result};
pub use market::CurrencyPair;
pub use order::{OpenOrder, OrderId, OrderRequest, OrderSide, OrderType, TimeInForce};
