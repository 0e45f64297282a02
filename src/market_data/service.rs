use std::sync::Arc;

use rust_decimal::Decimal;
use tracing::{debug, warn};

use super::{NoopPriceSource, PriceSource};
use crate::models::AssetClass;

/// Resolves current prices, hiding source failures from callers.
pub struct QuoteService {
    source: Arc<dyn PriceSource>,
}

impl Default for QuoteService {
    fn default() -> Self {
        Self::new(Arc::new(NoopPriceSource))
    }
}

impl QuoteService {
    pub fn new(source: Arc<dyn PriceSource>) -> Self {
        Self { source }
    }

    pub fn source_name(&self) -> &str {
        self.source.name()
    }

    /// Current unit price, or `None` when no usable price is available.
    ///
    /// Cash is always worth 1 in the base currency and never hits the source.
    /// Zero or negative quotes count as unavailable.
    pub async fn current_price(&self, asset_class: AssetClass, symbol: &str) -> Option<Decimal> {
        if asset_class == AssetClass::Cash {
            return Some(Decimal::ONE);
        }

        match self.source.fetch_price(asset_class, symbol).await {
            Ok(Some(price)) if price > Decimal::ZERO => {
                debug!(symbol, price = %price, source = self.source.name(), "price found");
                Some(price)
            }
            Ok(Some(price)) => {
                warn!(
                    symbol,
                    price = %price,
                    source = self.source.name(),
                    "ignoring non-positive price"
                );
                None
            }
            Ok(None) => {
                debug!(symbol, source = self.source.name(), "no price available");
                None
            }
            Err(e) => {
                warn!(symbol, source = self.source.name(), error = %e, "price lookup failed");
                None
            }
        }
    }
}
