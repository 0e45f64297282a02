#[cfg(feature = "market_data")]
mod http;
mod provider;
mod service;

#[cfg(feature = "market_data")]
pub use http::HttpPriceSource;
pub use provider::{NoopPriceSource, PriceSource, StaticPriceSource};
pub use service::QuoteService;
