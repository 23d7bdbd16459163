//! External reference price source.
//!
//! An independent price feed, separate from the exchange gateway, that
//! quotes a fair price for a pair by its normalized symbol.

use std::sync::Arc;

use mm_core::{CurrencyPair, Price};

use crate::error::ReferenceResult;
use crate::gateway::BoxFuture;

/// Source of an external fair price.
pub trait ReferencePriceSource: Send + Sync {
    /// Current price for `pair`, or why it could not be obtained.
    fn price<'a>(&'a self, pair: &'a CurrencyPair) -> BoxFuture<'a, ReferenceResult<Price>>;

    /// Name used in logs and metrics.
    fn name(&self) -> &str;
}

/// Arc wrapper for reference source trait objects.
pub type DynReferenceSource = Arc<dyn ReferencePriceSource>;
