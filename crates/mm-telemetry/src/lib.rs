//! Prometheus metrics and structured logging for the market-making bot.
//!
//! - Structured logging with tracing (JSON in production, pretty otherwise)
//! - Prometheus counters for orders, cancellations, tick failures and the
//!   trade circuit breaker
//! - Reference price source health

pub mod error;
pub mod logging;
pub mod metrics;

pub use error::{TelemetryError, TelemetryResult};
pub use logging::{init_logging, DEFAULT_FILTER};
pub use metrics::Metrics;
