use std::collections::HashMap;

use anyhow::Result;
use rust_decimal::Decimal;

use crate::models::AssetClass;

/// A source of current unit prices.
///
/// `Ok(None)` means the source has no price for the symbol; `Err` means the
/// lookup itself failed. Callers treat both as "price unavailable".
#[async_trait::async_trait]
pub trait PriceSource: Send + Sync {
    async fn fetch_price(&self, asset_class: AssetClass, symbol: &str) -> Result<Option<Decimal>>;

    fn name(&self) -> &str;
}

pub struct NoopPriceSource;

#[async_trait::async_trait]
impl PriceSource for NoopPriceSource {
    async fn fetch_price(
        &self,
        _asset_class: AssetClass,
        _symbol: &str,
    ) -> Result<Option<Decimal>> {
        Ok(None)
    }

    fn name(&self) -> &str {
        "noop"
    }
}

/// Fixed price table keyed by symbol (case-insensitive).
#[derive(Debug, Clone, Default)]
pub struct StaticPriceSource {
    prices: HashMap<String, Decimal>,
}

impl StaticPriceSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_price(mut self, symbol: impl AsRef<str>, price: Decimal) -> Self {
        self.prices
            .insert(symbol.as_ref().to_ascii_uppercase(), price);
        self
    }
}

impl<S: AsRef<str>> FromIterator<(S, Decimal)> for StaticPriceSource {
    fn from_iter<T: IntoIterator<Item = (S, Decimal)>>(iter: T) -> Self {
        iter.into_iter()
            .fold(Self::new(), |source, (symbol, price)| source.with_price(symbol, price))
    }
}

#[async_trait::async_trait]
impl PriceSource for StaticPriceSource {
    async fn fetch_price(&self, _asset_class: AssetClass, symbol: &str) -> Result<Option<Decimal>> {
        Ok(self.prices.get(&symbol.to_ascii_uppercase()).copied())
    }

    fn name(&self) -> &str {
        "static"
    }
}
