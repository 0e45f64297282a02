use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::duration::{deserialize_duration, serialize_duration};
use crate::rebalancing::{
    CustomPolicy, RebalanceConfig, RebalanceEngine, TargetAllocation, TargetPolicy,
    PERMANENT_PORTFOLIO,
};

/// Default base currency.
fn default_base_currency() -> String {
    "CNY".to_string()
}

fn default_user() -> String {
    "local".to_string()
}

/// Display/output formatting configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplayConfig {
    /// If set, base-currency values are rounded to this many decimal places
    /// before being rendered in `*_display` fields.
    pub currency_decimals: Option<u32>,

    /// When true, render base-currency values with thousands separators.
    pub currency_grouping: bool,

    /// Optional currency symbol (e.g. "¥", "$") for display rendering.
    pub currency_symbol: Option<String>,

    /// When true and `currency_decimals` is set, pad to exactly that many
    /// decimal places.
    pub currency_fixed_decimals: bool,
}

fn default_expected_return() -> Option<f64> {
    Some(0.06)
}

/// Rebalancing configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RebalancingConfig {
    /// Engine tuning (`threshold`, `inclusive_boundary`).
    #[serde(flatten)]
    pub engine: RebalanceConfig,

    /// Annualized expected return reported alongside suggestions. Passed
    /// through untouched; a missing or non-finite value is reported as 0.
    #[serde(default = "default_expected_return")]
    pub expected_return: Option<f64>,

    /// Custom target weights keyed by bucket. When absent the permanent
    /// portfolio (25/25/25/25) is used.
    pub target: Option<BTreeMap<String, Decimal>>,
}

impl Default for RebalancingConfig {
    fn default() -> Self {
        Self {
            engine: RebalanceConfig::default(),
            expected_return: default_expected_return(),
            target: None,
        }
    }
}

impl RebalancingConfig {
    pub fn policy(&self) -> Result<Arc<dyn TargetPolicy>> {
        match &self.target {
            Some(weights) => {
                let target = TargetAllocation::from_named(weights.iter().map(|(k, v)| (k, *v)))
                    .context("Invalid [rebalancing.target] table")?;
                Ok(Arc::new(CustomPolicy::new("custom", target)))
            }
            None => Ok(Arc::new(PERMANENT_PORTFOLIO)),
        }
    }

    pub fn build_engine(&self) -> Result<RebalanceEngine> {
        Ok(RebalanceEngine::new(self.policy()?, self.engine.clone()))
    }
}

fn default_timeout() -> Duration {
    Duration::from_secs(5)
}

/// Price lookup configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MarketDataConfig {
    /// Quote endpoint. When unset, no prices are looked up and holdings keep
    /// the price they were stored with.
    pub quote_url: Option<String>,

    #[serde(
        default = "default_timeout",
        deserialize_with = "deserialize_duration",
        serialize_with = "serialize_duration"
    )]
    pub timeout: Duration,
}

impl Default for MarketDataConfig {
    fn default() -> Self {
        Self {
            quote_url: None,
            timeout: default_timeout(),
        }
    }
}

fn default_listen_addr() -> String {
    "127.0.0.1:8000".to_string()
}

/// HTTP server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    #[serde(default = "default_listen_addr")]
    pub listen_addr: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: default_listen_addr(),
        }
    }
}

/// Application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Path to data directory. If relative, resolved from config file location.
    /// If not specified, defaults to the config file's directory.
    pub data_dir: Option<PathBuf>,

    /// Currency all values are expressed in.
    #[serde(default = "default_base_currency")]
    pub base_currency: String,

    /// User whose holdings are used when a request names none.
    #[serde(default = "default_user")]
    pub default_user: String,

    #[serde(default)]
    pub display: DisplayConfig,

    #[serde(default)]
    pub rebalancing: RebalancingConfig,

    #[serde(default)]
    pub market_data: MarketDataConfig,

    #[serde(default)]
    pub server: ServerConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: None,
            base_currency: default_base_currency(),
            default_user: default_user(),
            display: DisplayConfig::default(),
            rebalancing: RebalancingConfig::default(),
            market_data: MarketDataConfig::default(),
            server: ServerConfig::default(),
        }
    }
}

impl Config {
    /// Load config from a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Resolve the data directory path.
    ///
    /// If `data_dir` is set and relative, it's resolved relative to `config_dir`.
    /// If `data_dir` is not set, returns `config_dir`.
    pub fn resolve_data_dir(&self, config_dir: &Path) -> PathBuf {
        match &self.data_dir {
            Some(data_dir) if data_dir.is_absolute() => data_dir.clone(),
            Some(data_dir) => config_dir.join(data_dir),
            None => config_dir.to_path_buf(),
        }
    }

    fn resolve(self, config_dir: &Path) -> ResolvedConfig {
        ResolvedConfig {
            data_dir: self.resolve_data_dir(config_dir),
            base_currency: self.base_currency,
            default_user: self.default_user,
            display: self.display,
            rebalancing: self.rebalancing,
            market_data: self.market_data,
            server: self.server,
        }
    }
}

/// Loaded configuration with resolved paths.
#[derive(Debug, Clone, Serialize)]
pub struct ResolvedConfig {
    pub data_dir: PathBuf,
    pub base_currency: String,
    pub default_user: String,
    pub display: DisplayConfig,
    pub rebalancing: RebalancingConfig,
    pub market_data: MarketDataConfig,
    pub server: ServerConfig,
}

/// Returns the default config file path.
///
/// Resolution order:
/// 1. `./permafolio.toml` if it exists in current directory
/// 2. `~/.local/share/permafolio/permafolio.toml` (XDG data directory)
pub fn default_config_path() -> PathBuf {
    let local_config = PathBuf::from("permafolio.toml");
    if local_config.exists() {
        return local_config;
    }

    if let Some(data_dir) = dirs::data_dir() {
        return data_dir.join("permafolio").join("permafolio.toml");
    }

    local_config
}

impl ResolvedConfig {
    /// Load and resolve config from a file path.
    ///
    /// The data directory is resolved relative to the config file's parent directory.
    pub fn load(config_path: &Path) -> Result<Self> {
        let config_path = config_path
            .canonicalize()
            .with_context(|| format!("Config file not found: {}", config_path.display()))?;

        let config_dir = config_path
            .parent()
            .context("Config file has no parent directory")?;

        let config = Config::load(&config_path)?;
        Ok(config.resolve(config_dir))
    }

    /// Load config, falling back to defaults if the file doesn't exist.
    ///
    /// Without a file, the config file's intended parent directory becomes
    /// the data directory.
    pub fn load_or_default(config_path: &Path) -> Result<Self> {
        if config_path.exists() {
            return Self::load(config_path);
        }

        let config_path = if config_path.is_relative() {
            std::env::current_dir()
                .context("Failed to get current directory")?
                .join(config_path)
        } else {
            config_path.to_path_buf()
        };

        let config_dir = config_path
            .parent()
            .context("Config path has no parent directory")?;

        Ok(Config::default().resolve(config_dir))
    }
}
