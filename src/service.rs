use std::sync::Arc;

use rust_decimal::Decimal;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::allocation::AssetOverview;
use crate::clock::{Clock, SystemClock};
use crate::error::ValidationError;
use crate::market_data::QuoteService;
use crate::models::{Holding, HoldingPatch, Id, NewHolding};
use crate::rebalancing::{RebalanceEngine, RebalancingResult};
use crate::report::DailyReport;
use crate::storage::Storage;
#[cfg(feature = "market_data")]
use crate::{
    config::ResolvedConfig,
    market_data::{HttpPriceSource, PriceSource},
    storage::JsonFileStorage,
};
#[cfg(feature = "market_data")]
use anyhow::Context;

#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("Holding not found: {0}")]
    NotFound(Id),

    #[error("No current price available for {symbol}")]
    PriceUnavailable { symbol: String },

    #[error(transparent)]
    Storage(#[from] anyhow::Error),
}

pub type ServiceResult<T> = Result<T, ServiceError>;

/// Holdings, valuation and rebalancing for one data directory.
pub struct PortfolioService {
    storage: Arc<dyn Storage>,
    quotes: Arc<QuoteService>,
    engine: RebalanceEngine,
    expected_return: Option<f64>,
    clock: Arc<dyn Clock>,
    /// Held across every read-modify-write of stored holdings.
    writes: Mutex<()>,
}

impl PortfolioService {
    pub fn new(storage: Arc<dyn Storage>, quotes: Arc<QuoteService>) -> Self {
        Self {
            storage,
            quotes,
            engine: RebalanceEngine::default(),
            expected_return: None,
            clock: Arc::new(SystemClock),
            writes: Mutex::new(()),
        }
    }

    /// Build the service a config describes: JSON file storage under
    /// `data_dir`, the HTTP quote source when `quote_url` is set and the
    /// configured rebalancing policy.
    #[cfg(feature = "market_data")]
    pub fn from_config(config: &ResolvedConfig) -> anyhow::Result<Self> {
        let storage: Arc<dyn Storage> = Arc::new(JsonFileStorage::new(&config.data_dir));

        let quotes = match &config.market_data.quote_url {
            Some(url) => {
                let source: Arc<dyn PriceSource> =
                    Arc::new(HttpPriceSource::new(url, config.market_data.timeout)?);
                QuoteService::new(source)
            }
            None => QuoteService::default(),
        };

        let engine = config
            .rebalancing
            .build_engine()
            .context("Invalid rebalancing configuration")?;

        Ok(Self::new(storage, Arc::new(quotes))
            .with_engine(engine)
            .with_expected_return(config.rebalancing.expected_return))
    }

    pub fn with_engine(mut self, engine: RebalanceEngine) -> Self {
        self.engine = engine;
        self
    }

    /// Expected-return estimate attached to rebalancing results.
    pub fn with_expected_return(mut self, expected_return: Option<f64>) -> Self {
        self.expected_return = expected_return;
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn engine(&self) -> &RebalanceEngine {
        &self.engine
    }

    pub async fn list_holdings(&self, user_id: &Id) -> ServiceResult<Vec<Holding>> {
        Ok(self.storage.list_holdings(user_id).await?)
    }

    async fn require_holding(&self, user_id: &Id, id: &Id) -> ServiceResult<Holding> {
        self.storage
            .get_holding(user_id, id)
            .await?
            .ok_or_else(|| ServiceError::NotFound(id.clone()))
    }

    /// Create a holding, pricing it from the quote source.
    ///
    /// Without a quote the purchase price stands in, and without that the
    /// holding is stored at price zero.
    pub async fn create_holding(
        &self,
        user_id: &Id,
        input: NewHolding,
    ) -> ServiceResult<Holding> {
        let now = self.clock.now();
        let mut holding =
            Holding::new(input.asset_type, input.symbol, input.quantity, Decimal::ZERO, now)?;
        holding.name = input.name.filter(|n| !n.trim().is_empty());
        holding.purchase_price = input.purchase_price;
        holding.purchase_date = input.purchase_date;
        holding.validate()?;

        let price = match self.quotes.current_price(holding.asset_class, &holding.symbol).await {
            Some(price) => price,
            None => {
                let fallback = holding
                    .purchase_price
                    .filter(|p| *p > Decimal::ZERO)
                    .unwrap_or(Decimal::ZERO);
                warn!(symbol = %holding.symbol, fallback = %fallback, "no quote for new holding");
                fallback
            }
        };
        holding.reprice(price, now)?;

        let _guard = self.writes.lock().await;
        self.storage.save_holding(user_id, &holding).await?;
        info!(user = %user_id, holding = %holding.id, symbol = %holding.symbol, "created holding");
        Ok(holding)
    }

    /// Apply a partial update. Changing the symbol re-prices the holding when a
    /// quote is available and drops a name that is not resupplied.
    pub async fn update_holding(
        &self,
        user_id: &Id,
        id: &Id,
        patch: HoldingPatch,
    ) -> ServiceResult<Holding> {
        let _guard = self.writes.lock().await;
        let mut holding = self.require_holding(user_id, id).await?;
        if patch.is_empty() {
            return Ok(holding);
        }

        let now = self.clock.now();
        let mut value_changed = false;

        if patch.symbol.as_ref().is_some_and(|s| *s != holding.symbol) {
            holding.name = None;
        }
        if let Some(name) = patch.name {
            holding.name = Some(name);
        }
        if let Some(purchase_price) = patch.purchase_price {
            holding.purchase_price = Some(purchase_price);
        }
        if let Some(purchase_date) = patch.purchase_date {
            holding.purchase_date = Some(purchase_date);
        }
        if let Some(quantity) = patch.quantity {
            holding.quantity = quantity;
            value_changed = true;
        }
        if let Some(symbol) = patch.symbol {
            if let Some(price) = self.quotes.current_price(holding.asset_class, &symbol).await {
                holding.current_price = price;
            }
            holding.symbol = symbol;
            value_changed = true;
        }
        if value_changed {
            holding.last_updated = now;
        }
        holding.validate()?;

        self.storage.save_holding(user_id, &holding).await?;
        info!(user = %user_id, holding = %holding.id, "updated holding");
        Ok(holding)
    }

    pub async fn delete_holding(&self, user_id: &Id, id: &Id) -> ServiceResult<()> {
        let _guard = self.writes.lock().await;
        if !self.storage.delete_holding(user_id, id).await? {
            return Err(ServiceError::NotFound(id.clone()));
        }
        info!(user = %user_id, holding = %id, "deleted holding");
        Ok(())
    }

    /// Delete several holdings, ignoring ids that do not exist. Returns how
    /// many were removed.
    pub async fn delete_holdings(&self, user_id: &Id, ids: &[Id]) -> ServiceResult<usize> {
        let _guard = self.writes.lock().await;
        let mut deleted = 0;
        for id in ids {
            if self.storage.delete_holding(user_id, id).await? {
                deleted += 1;
            }
        }
        info!(user = %user_id, requested = ids.len(), deleted, "batch deleted holdings");
        Ok(deleted)
    }

    /// Re-price one holding; fails when no price can be obtained.
    pub async fn refresh_holding(&self, user_id: &Id, id: &Id) -> ServiceResult<Holding> {
        let _guard = self.writes.lock().await;
        let mut holding = self.require_holding(user_id, id).await?;
        let price = self
            .quotes
            .current_price(holding.asset_class, &holding.symbol)
            .await
            .ok_or_else(|| ServiceError::PriceUnavailable {
                symbol: holding.symbol.clone(),
            })?;
        holding.reprice(price, self.clock.now())?;
        self.storage.save_holding(user_id, &holding).await?;
        Ok(holding)
    }

    /// Re-price every holding. Holdings without a quote keep their last price.
    pub async fn refresh_all(&self, user_id: &Id) -> ServiceResult<Vec<Holding>> {
        let _guard = self.writes.lock().await;
        let mut holdings = self.storage.list_holdings(user_id).await?;
        let now = self.clock.now();
        let mut refreshed = 0;

        for holding in &mut holdings {
            match self.quotes.current_price(holding.asset_class, &holding.symbol).await {
                Some(price) => {
                    holding.reprice(price, now)?;
                    self.storage.save_holding(user_id, holding).await?;
                    refreshed += 1;
                }
                None => {
                    debug!(symbol = %holding.symbol, "keeping stored price");
                }
            }
        }

        info!(user = %user_id, total = holdings.len(), refreshed, "refreshed prices");
        Ok(holdings)
    }

    pub async fn overview(&self, user_id: &Id) -> ServiceResult<AssetOverview> {
        let holdings = self.storage.list_holdings(user_id).await?;
        Ok(AssetOverview::from_holdings(&holdings)?)
    }

    pub async fn rebalancing(&self, user_id: &Id) -> ServiceResult<RebalancingResult> {
        let overview = self.overview(user_id).await?;
        let result = self
            .engine
            .evaluate_overview(&overview, self.expected_return)?;
        debug!(
            user = %user_id,
            policy = self.engine.policy_name(),
            suggestions = result.suggestions.len(),
            "evaluated rebalancing"
        );
        Ok(result)
    }

    pub async fn daily_report(&self, user_id: &Id) -> ServiceResult<DailyReport> {
        let overview = self.overview(user_id).await?;
        Ok(DailyReport::build(&overview, self.clock.today()))
    }

    pub async fn check_storage(&self) -> ServiceResult<()> {
        Ok(self.storage.ping().await?)
    }
}
