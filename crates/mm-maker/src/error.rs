//! Maker error types.

use mm_gateway::GatewayError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum MakerError {
    #[error("Invalid config `{field}`: {reason}")]
    InvalidConfig { field: &'static str, reason: String },

    #[error("Gateway error: {0}")]
    Gateway(#[from] GatewayError),

    #[error("Sampling error: {0}")]
    Sampling(String),
}

impl MakerError {
    pub(crate) fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidConfig {
            field,
            reason: reason.into(),
        }
    }
}

pub type MakerResult<T> = Result<T, MakerError>;
