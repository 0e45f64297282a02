use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use permafolio::config::{default_config_path, ResolvedConfig};
use permafolio::format::{format_money, format_percent};
use permafolio::models::{AssetClass, Holding, HoldingPatch, HoldingView, Id, NewHolding};
use permafolio::service::PortfolioService;
use permafolio::view::ViewState;
use rust_decimal::Decimal;
use serde_json::{json, Value};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

const VERSION: &str = concat!(env!("CARGO_PKG_VERSION"), " (", env!("GIT_COMMIT_HASH"), ")");

#[derive(Parser)]
#[command(name = "permafolio")]
#[command(about = "Permanent-portfolio wealth tracker")]
#[command(version = VERSION)]
struct Cli {
    /// Path to config file
    #[arg(short, long, default_value_os_t = default_config_path())]
    config: PathBuf,

    /// User whose holdings to operate on (defaults to `default_user`)
    #[arg(short, long, global = true)]
    user: Option<String>,

    /// Emit logs as JSON
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Show current configuration
    Config,

    /// Manage holdings
    #[command(subcommand)]
    Holdings(HoldingsCommand),

    /// Refresh current prices from the quote source
    #[command(subcommand)]
    Prices(PricesCommand),

    /// Show portfolio value per asset class
    Overview,

    /// Suggest trades that restore the target allocation
    Rebalance {
        /// Wrap the result in a view state (ready / empty / failed)
        #[arg(long)]
        view: bool,
    },

    /// Show the daily health report
    Report,
}

#[derive(Subcommand)]
enum HoldingsCommand {
    /// List holdings
    List,

    /// Add a holding
    Add {
        /// Asset type: cash, stock, fund, bond or gold
        #[arg(long = "type")]
        asset_type: AssetClass,

        #[arg(long)]
        symbol: String,

        #[arg(long)]
        quantity: Decimal,

        #[arg(long)]
        name: Option<String>,

        #[arg(long)]
        purchase_price: Option<Decimal>,

        /// Purchase date (YYYY-MM-DD)
        #[arg(long)]
        purchase_date: Option<NaiveDate>,
    },

    /// Update fields of a holding
    Update {
        id: String,

        #[arg(long)]
        symbol: Option<String>,

        #[arg(long)]
        quantity: Option<Decimal>,

        #[arg(long)]
        name: Option<String>,

        #[arg(long)]
        purchase_price: Option<Decimal>,

        #[arg(long)]
        purchase_date: Option<NaiveDate>,
    },

    /// Remove one or more holdings
    Remove {
        #[arg(required = true)]
        ids: Vec<String>,
    },
}

#[derive(Subcommand)]
enum PricesCommand {
    /// Refresh all holdings, or one with --id
    Refresh {
        #[arg(long)]
        id: Option<String>,
    },
}

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry
            .with(fmt::layer().with_writer(std::io::stderr).json())
            .init();
    } else {
        registry
            .with(fmt::layer().with_writer(std::io::stderr).with_target(false))
            .init();
    }
}

fn parse_id(value: &str) -> Result<Id> {
    Ok(Id::from_string_checked(value)?)
}

/// Attach `<field>_display` strings for the given money fields.
fn with_money_display(mut value: Value, fields: &[&str], config: &ResolvedConfig) -> Value {
    if let Value::Object(map) = &mut value {
        for field in fields {
            let amount = map
                .get(*field)
                .and_then(|v| serde_json::from_value::<Decimal>(v.clone()).ok());
            if let Some(amount) = amount {
                map.insert(
                    format!("{field}_display"),
                    Value::String(format_money(amount, &config.display)),
                );
            }
        }
    }
    value
}

/// Render holdings with numeric amounts, their total value and its display string.
fn holding_rows(holdings: Vec<Holding>, config: &ResolvedConfig) -> Result<Value> {
    let rows = holdings
        .into_iter()
        .map(|h| holding_row(h, config))
        .collect::<Result<Vec<_>>>()?;
    Ok(Value::Array(rows))
}

fn holding_row(holding: Holding, config: &ResolvedConfig) -> Result<Value> {
    let view = serde_json::to_value(HoldingView::try_from(holding)?)?;
    Ok(with_money_display(view, &["total_value"], config))
}

fn print_json(value: &Value) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.log_json);

    let config = ResolvedConfig::load_or_default(&cli.config)
        .with_context(|| format!("Failed to load config: {}", cli.config.display()))?;
    let user = parse_id(cli.user.as_deref().unwrap_or(&config.default_user))?;

    let Some(command) = cli.command else {
        println!("Permafolio - Permanent Portfolio Tracker");
        println!("========================================\n");
        println!("Config: {}", cli.config.display());
        println!("Data directory: {}\n", config.data_dir.display());
        println!("Run 'permafolio --help' for commands.");
        return Ok(());
    };

    let service = PortfolioService::from_config(&config)?;

    match command {
        Command::Config => {
            let mut value = serde_json::to_value(&config)?;
            if let Value::Object(map) = &mut value {
                map.insert(
                    "config_file".to_string(),
                    Value::String(cli.config.display().to_string()),
                );
            }
            print_json(&value)?;
        }
        Command::Holdings(HoldingsCommand::List) => {
            let holdings = service.list_holdings(&user).await?;
            print_json(&holding_rows(holdings, &config)?)?;
        }
        Command::Holdings(HoldingsCommand::Add {
            asset_type,
            symbol,
            quantity,
            name,
            purchase_price,
            purchase_date,
        }) => {
            let holding = service
                .create_holding(
                    &user,
                    NewHolding {
                        asset_type,
                        symbol,
                        name,
                        quantity,
                        purchase_price,
                        purchase_date,
                    },
                )
                .await?;
            print_json(&holding_row(holding, &config)?)?;
        }
        Command::Holdings(HoldingsCommand::Update {
            id,
            symbol,
            quantity,
            name,
            purchase_price,
            purchase_date,
        }) => {
            let patch = HoldingPatch {
                symbol,
                name,
                quantity,
                purchase_price,
                purchase_date,
            };
            let holding = service.update_holding(&user, &parse_id(&id)?, patch).await?;
            print_json(&holding_row(holding, &config)?)?;
        }
        Command::Holdings(HoldingsCommand::Remove { ids }) => {
            let ids = ids.iter().map(|id| parse_id(id)).collect::<Result<Vec<_>>>()?;
            let deleted = service.delete_holdings(&user, &ids).await?;
            print_json(&json!({ "deleted": deleted }))?;
        }
        Command::Prices(PricesCommand::Refresh { id: Some(id) }) => {
            let holding = service.refresh_holding(&user, &parse_id(&id)?).await?;
            print_json(&holding_row(holding, &config)?)?;
        }
        Command::Prices(PricesCommand::Refresh { id: None }) => {
            let holdings = service.refresh_all(&user).await?;
            print_json(&holding_rows(holdings, &config)?)?;
        }
        Command::Overview => {
            let overview = service.overview(&user).await?;
            let value = with_money_display(
                serde_json::to_value(&overview)?,
                &[
                    "total_value",
                    "cash_value",
                    "stock_value",
                    "fund_value",
                    "bond_value",
                    "gold_value",
                ],
                &config,
            );
            print_json(&value)?;
        }
        Command::Rebalance { view: true } => {
            let state = ViewState::from_rebalancing(service.rebalancing(&user).await);
            print_json(&serde_json::to_value(&state)?)?;
        }
        Command::Rebalance { view: false } => {
            let result = service.rebalancing(&user).await?;
            let mut value = serde_json::to_value(&result)?;
            if let Some(Value::Array(suggestions)) = value.get_mut("suggestions") {
                for suggestion in suggestions.iter_mut() {
                    *suggestion = with_money_display(suggestion.take(), &["amount"], &config);
                }
            }
            if let Value::Object(map) = &mut value {
                let current = result
                    .current_allocation
                    .iter()
                    .map(|(bucket, weight)| {
                        (bucket.to_string(), Value::String(format_percent(weight)))
                    })
                    .collect();
                map.insert(
                    "current_allocation_display".to_string(),
                    Value::Object(current),
                );
                map.insert(
                    "policy".to_string(),
                    Value::String(service.engine().policy_name().to_string()),
                );
            }
            print_json(&value)?;
        }
        Command::Report => {
            let report = service.daily_report(&user).await?;
            let value =
                with_money_display(serde_json::to_value(&report)?, &["total_assets"], &config);
            print_json(&value)?;
        }
    }

    Ok(())
}
