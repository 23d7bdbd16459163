//! Gateway and reference feed error types.

use mm_core::OrderId;
use std::time::Duration;
use thiserror::Error;

/// Fault raised by an exchange gateway call.
///
/// Exchange-level order rejections are not faults; they come back as
/// [`crate::OrderOutcome::Rejected`].
#[derive(Debug, Clone, Error)]
pub enum GatewayError {
    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Request timed out after {0:?}")]
    Timeout(Duration),

    #[error("Unknown pair: {0}")]
    UnknownPair(String),

    #[error("Unknown order: {0}")]
    UnknownOrder(OrderId),
}

pub type GatewayResult<T> = Result<T, GatewayError>;

/// Failure of an external reference price lookup.
#[derive(Debug, Clone, Error)]
pub enum ReferenceError {
    /// The feed does not list this symbol. Permanent for the pair.
    #[error("Unknown symbol: {0}")]
    UnknownSymbol(String),

    #[error("Reference feed transport error: {0}")]
    Transport(String),

    #[error("Malformed reference feed response: {0}")]
    Malformed(String),
}

impl ReferenceError {
    /// Whether retrying the same symbol can never succeed.
    pub fn is_permanent(&self) -> bool {
        matches!(self, Self::UnknownSymbol(_))
    }
}

pub type ReferenceResult<T> = Result<T, ReferenceError>;
