//! Application error types.

use mm_gateway::GatewayError;
use mm_maker::MakerError;
use mm_telemetry::TelemetryError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Maker error: {0}")]
    Maker(#[from] MakerError),

    #[error("Gateway error: {0}")]
    Gateway(#[from] GatewayError),

    #[error("Telemetry error: {0}")]
    Telemetry(#[from] TelemetryError),
}

impl From<config::ConfigError> for AppError {
    fn from(e: config::ConfigError) -> Self {
        Self::Config(e.to_string())
    }
}

pub type AppResult<T> = Result<T, AppError>;
