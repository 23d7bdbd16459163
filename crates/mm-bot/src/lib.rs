//! Market-making bot for a single currency pair.
//!
//! Runs two periodic loops against an exchange gateway:
//! - Orderbook loop (fixed interval): spread, depth and volume cap
//! - Trade loop (jittered interval): small randomized IOC trades

pub mod bot;
pub mod config;
pub mod error;
pub mod scheduler;

pub use bot::{LoopShutdown, MarketMakerBot, ShutdownReport};
pub use config::{AppConfig, PaperConfig, ReferenceConfig, TelemetryConfig};
pub use error::{AppError, AppResult};
pub use scheduler::{
    run_fixed, run_jittered, spawn_periodic, JoinOutcome, PeriodicTask, Schedule, TaskHandle,
};
