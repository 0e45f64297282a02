//! HTTP API over the permafolio service.

pub mod api;
pub mod error;

use std::sync::Arc;

use anyhow::{Context, Result};
use permafolio::config::ResolvedConfig;
use permafolio::models::Id;
use permafolio::service::PortfolioService;

pub use api::app_router;

pub struct AppState {
    pub service: PortfolioService,
    /// User served when a request carries no `X-User-Id` header.
    pub default_user: Id,
}

impl AppState {
    pub fn new(service: PortfolioService, default_user: Id) -> Self {
        Self {
            service,
            default_user,
        }
    }
}

pub fn build_state(config: &ResolvedConfig) -> Result<Arc<AppState>> {
    let default_user = Id::from_string_checked(config.default_user.as_str())
        .context("Invalid default_user in config")?;
    let service = PortfolioService::from_config(config)?;
    tracing::info!(
        data_dir = %config.data_dir.display(),
        policy = service.engine().policy_name(),
        "built server state"
    );
    Ok(Arc::new(AppState::new(service, default_user)))
}
