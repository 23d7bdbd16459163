//! Reference price resolution.
//!
//! Resolution order:
//! 1. External reference source, while it is still enabled for the pair
//! 2. Last traded price from the exchange, when strictly positive
//! 3. Configured start price
//!
//! The external source is disabled for the lifetime of the resolver the
//! first time it reports the symbol as unknown. Transient failures are
//! retried on every call. A gateway fault while reading the last price is
//! returned to the caller, which abandons its tick.

use std::sync::atomic::{AtomicBool, Ordering};

use mm_core::{CurrencyPair, Price};
use mm_gateway::{DynGateway, DynReferenceSource, ReferenceError};
use mm_telemetry::Metrics;
use rust_decimal::prelude::ToPrimitive;
use tracing::{debug, error, warn};

use crate::error::MakerResult;

/// Best-effort fair price for one pair.
pub struct ReferencePriceResolver {
    pair: CurrencyPair,
    gateway: DynGateway,
    external: Option<DynReferenceSource>,
    /// One-way flag: only ever goes from true to false.
    external_enabled: AtomicBool,
    start_price: Price,
}

impl ReferencePriceResolver {
    pub fn new(
        pair: CurrencyPair,
        gateway: DynGateway,
        external: Option<DynReferenceSource>,
        start_price: Price,
    ) -> Self {
        let external_enabled = AtomicBool::new(external.is_some());
        Self {
            pair,
            gateway,
            external,
            external_enabled,
            start_price,
        }
    }

    /// Whether the external source is still consulted.
    pub fn is_external_enabled(&self) -> bool {
        self.external_enabled.load(Ordering::Acquire)
    }

    /// Resolve the reference price.
    ///
    /// Only a gateway fault on the ticker fails; reference source errors and
    /// a missing last price fall through to the next candidate.
    pub async fn reference_price(&self) -> MakerResult<Price> {
        let price = self.resolve().await?;
        Metrics::reference_price(&self.pair.symbol(), price.inner().to_f64().unwrap_or(0.0));
        Ok(price)
    }

    async fn resolve(&self) -> MakerResult<Price> {
        if let Some(price) = self.external_price().await {
            return Ok(price);
        }

        let last = self.gateway.ticker(&self.pair).await?.last;
        if last.is_positive() {
            debug!(pair = %self.pair, price = %last, "Reference price from last trade");
            Metrics::reference_fallback("ticker");
            return Ok(last);
        }

        debug!(pair = %self.pair, "No positive last price, using start price");
        Metrics::reference_fallback("start_price");
        Ok(self.start_price)
    }

    async fn external_price(&self) -> Option<Price> {
        if !self.is_external_enabled() {
            return None;
        }
        let source = self.external.as_ref()?;

        match source.price(&self.pair).await {
            Ok(price) => {
                debug!(
                    pair = %self.pair,
                    %price,
                    source = source.name(),
                    "External reference price"
                );
                Some(price)
            }
            Err(e @ ReferenceError::UnknownSymbol(_)) => {
                self.external_enabled.store(false, Ordering::Release);
                Metrics::reference_source_disabled();
                error!(
                    pair = %self.pair,
                    source = source.name(),
                    error = %e,
                    "External reference source does not list pair, disabling it"
                );
                None
            }
            Err(e) => {
                warn!(
                    pair = %self.pair,
                    source = source.name(),
                    error = %e,
                    "External reference lookup failed, falling back"
                );
                None
            }
        }
    }
}
