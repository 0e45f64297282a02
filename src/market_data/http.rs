//! Price source backed by a quote HTTP endpoint.
//!
//! The endpoint is called as `GET {base_url}?symbol=..&asset_type=..` and must
//! answer `{"price": <number>}`. A 404 or a `null` price means the symbol is
//! unknown to the endpoint.

use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::{Client, StatusCode};
use rust_decimal::Decimal;
use serde::Deserialize;
use tracing::debug;

use super::PriceSource;
use crate::models::AssetClass;
use crate::rebalancing::decimal_from_upstream;

#[derive(Debug, Deserialize)]
struct QuoteResponse {
    price: Option<f64>,
}

#[derive(Debug, Clone)]
pub struct HttpPriceSource {
    client: Client,
    base_url: String,
}

impl HttpPriceSource {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build quote HTTP client")?;
        Ok(Self {
            client,
            base_url: base_url.into(),
        })
    }

    pub fn with_client(client: Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into(),
        }
    }
}

#[async_trait::async_trait]
impl PriceSource for HttpPriceSource {
    async fn fetch_price(&self, asset_class: AssetClass, symbol: &str) -> Result<Option<Decimal>> {
        debug!(symbol, asset_class = %asset_class, url = %self.base_url, "fetching quote");

        let response = self
            .client
            .get(&self.base_url)
            .query(&[("symbol", symbol), ("asset_type", asset_class.as_str())])
            .send()
            .await
            .with_context(|| format!("Quote request for {symbol} failed"))?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }

        let quote = response
            .error_for_status()
            .with_context(|| format!("Quote endpoint rejected {symbol}"))?
            .json::<QuoteResponse>()
            .await
            .with_context(|| format!("Invalid quote response for {symbol}"))?;

        Ok(decimal_from_upstream(quote.price))
    }

    fn name(&self) -> &str {
        "http"
    }
}
