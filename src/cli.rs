//! CLI definition and dispatch.

use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::info;

use crate::adapters::csv_ledger::CsvLedgerWriter;
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::domain::backtest::BacktestConfig;
use crate::domain::config_validation::{validate_backtest_config, validate_strategy_config};
use crate::domain::contract::{ContractResolver, RolloverRule};
use crate::domain::engine::{BacktestEngine, RunSummary};
use crate::domain::error::ContangoError;
use crate::domain::instrument::normalize_key;
use crate::domain::ma_cross::{MaCrossConfig, MaCrossStrategy};
use crate::ports::config_port::ConfigPort;
use crate::ports::data_port::DataPort;
use crate::ports::report_port::ReportPort;

#[derive(Parser, Debug)]
#[command(name = "contango", about = "Event-driven futures backtester")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run a backtest
    Backtest {
        #[arg(short, long)]
        config: PathBuf,
        /// Write the order/fill ledger to this CSV file
        #[arg(short, long)]
        ledger: Option<PathBuf>,
        #[arg(long)]
        dry_run: bool,
    },
    /// Resolve a product to a concrete contract on one trading day
    Resolve {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(long)]
        product: String,
        #[arg(long)]
        day: String,
        /// Rollover rule; every rule when omitted
        #[arg(long)]
        rule: Option<String>,
    },
    /// Show what was published for a trading day
    Info {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(long)]
        day: String,
        #[arg(long)]
        product: Option<String>,
    },
    /// Validate a configuration file
    Validate {
        #[arg(short, long)]
        config: PathBuf,
    },
}

pub fn run(cli: Cli) -> ExitCode {
    let result = match cli.command {
        Command::Backtest {
            config,
            ledger,
            dry_run,
        } => run_backtest(&config, ledger.as_deref(), dry_run),
        Command::Resolve {
            config,
            product,
            day,
            rule,
        } => run_resolve(&config, &product, &day, rule.as_deref()),
        Command::Info {
            config,
            day,
            product,
        } => run_info(&config, &day, product.as_deref()),
        Command::Validate { config } => run_validate(&config),
    };
    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            (&e).into()
        }
    }
}

pub fn load_config(path: &Path) -> Result<FileConfigAdapter, ContangoError> {
    eprintln!("Loading config from {}", path.display());
    FileConfigAdapter::from_file(path)
}

pub fn parse_day(raw: &str) -> Result<NaiveDate, ContangoError> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d").map_err(|_| ContangoError::ConfigInvalid {
        section: "cli".into(),
        key: "day".into(),
        reason: format!("invalid day {raw:?} (expected YYYY-MM-DD)"),
    })
}

/// Open the configured data source, memoized unless `[backtest] cache` is off.
pub fn open_data_port(config: &dyn ConfigPort) -> Result<Box<dyn DataPort>, ContangoError> {
    #[cfg(feature = "sqlite")]
    {
        use crate::adapters::cached_adapter::CachedDataPort;
        use crate::adapters::sqlite_adapter::SqliteAdapter;

        let adapter = SqliteAdapter::from_config(config)?;
        adapter.initialize_schema()?;
        if config.get_bool("backtest", "cache", true) {
            Ok(Box::new(CachedDataPort::new(adapter)))
        } else {
            Ok(Box::new(adapter))
        }
    }

    #[cfg(not(feature = "sqlite"))]
    {
        let _ = config;
        Err(ContangoError::ConfigInvalid {
            section: "sqlite".into(),
            key: "path".into(),
            reason: "built without the sqlite feature".into(),
        })
    }
}

fn run_backtest(config_path: &Path, ledger: Option<&Path>, dry_run: bool) -> Result<(), ContangoError> {
    let adapter = load_config(config_path)?;
    validate_backtest_config(&adapter)?;
    validate_strategy_config(&adapter)?;

    if dry_run {
        let bt_config = BacktestConfig::from_config(&adapter)?;
        let strategy = MaCrossConfig::from_config(&adapter, &bt_config.price_field)?;
        eprintln!(
            "Dry run: strategy {} on {} from {} to {}",
            strategy.name, strategy.interest.target, bt_config.begin_day, bt_config.end_day
        );
        return Ok(());
    }

    let data_port = open_data_port(&adapter)?;
    let summary = run_backtest_pipeline(data_port.as_ref(), &adapter, ledger)?;
    print_summary(&summary);
    Ok(())
}

/// Build the engine from `config`, run it and optionally write the ledger.
pub fn run_backtest_pipeline(
    data_port: &dyn DataPort,
    config: &dyn ConfigPort,
    ledger: Option<&Path>,
) -> Result<RunSummary, ContangoError> {
    let bt_config = BacktestConfig::from_config(config)?;
    let strategy_config = MaCrossConfig::from_config(config, &bt_config.price_field)?;
    let strategy_name = strategy_config.name.clone();

    eprintln!(
        "Running backtest: {} from {} to {}",
        strategy_name, bt_config.begin_day, bt_config.end_day
    );

    let mut engine = BacktestEngine::new(data_port, &bt_config)?;
    engine.add_strategy(Box::new(MaCrossStrategy::new(strategy_config)))?;
    let summary = engine.run()?;

    if let Some(path) = ledger {
        let entries = engine.ledger(&strategy_name);
        let output = path.display().to_string();
        CsvLedgerWriter::new().write_ledger(&strategy_name, entries, &output)?;
        info!(path = %output, rows = entries.len(), "ledger written");
        eprintln!("Ledger written to: {output}");
    }

    for (symbol, position) in engine.portfolio().positions_of(&strategy_name) {
        eprintln!(
            "  {symbol}: long {} short {} commission {:.2}",
            position.long, position.short, position.commission
        );
    }
    Ok(summary)
}

fn print_summary(summary: &RunSummary) {
    eprintln!("\n=== Run Summary ===");
    eprintln!("Trading days:     {}", summary.trading_days);
    eprintln!("Market events:    {}", summary.market_events);
    eprintln!("Signals:          {}", summary.signals);
    eprintln!("Orders:           {}", summary.orders);
    eprintln!("Fills:            {}", summary.fills);
    if let Some(last) = summary.last_datetime {
        eprintln!("Last event:       {last}");
    }
}

/// Resolve `product` on `day` under one rule, or under every rule.
pub fn resolve_contracts(
    data_port: &dyn DataPort,
    product: &str,
    day: NaiveDate,
    rule: Option<&str>,
) -> Result<Vec<(RolloverRule, Option<String>)>, ContangoError> {
    let rules: Vec<RolloverRule> = match rule {
        Some(raw) => vec![raw.parse()?],
        None => RolloverRule::ALL.to_vec(),
    };
    let resolver = ContractResolver::new(data_port);
    rules
        .into_iter()
        .map(|rule| Ok((rule, resolver.resolve(product, day, rule)?)))
        .collect()
}

fn run_resolve(
    config_path: &Path,
    product: &str,
    day: &str,
    rule: Option<&str>,
) -> Result<(), ContangoError> {
    let adapter = load_config(config_path)?;
    let day = parse_day(day)?;
    let data_port = open_data_port(&adapter)?;
    for (rule, symbol) in resolve_contracts(data_port.as_ref(), product, day, rule)? {
        println!("{rule}: {}", symbol.as_deref().unwrap_or("-"));
    }
    Ok(())
}

/// Human-readable description of a trading day, optionally narrowed to one
/// product.
pub fn describe_day(
    data_port: &dyn DataPort,
    day: NaiveDate,
    product: Option<&str>,
) -> Result<Vec<String>, ContangoError> {
    let resolver = ContractResolver::new(data_port);
    let Some(info) = data_port.query_trading_day_info(day)? else {
        return Ok(vec![format!("{day}: not a trading day")]);
    };

    let mut lines = Vec::new();
    let products: Vec<String> = match product {
        Some(p) => vec![normalize_key(p)],
        None => {
            lines.push(format!("{day}: {} products", info.products.len()));
            info.products.clone()
        }
    };

    for name in &products {
        let Some(p) = data_port.query_product_info(name, day)? else {
            lines.push(format!("{name}: no data on {day}"));
            continue;
        };
        lines.push(format!(
            "{name}: dominant {} sub-dominant {}",
            p.dominant.as_deref().unwrap_or("-"),
            p.sub_dominant.as_deref().unwrap_or("-")
        ));
        if product.is_none() {
            continue;
        }
        for instrument in resolver.available_instruments(name, day)? {
            match data_port.query_instrument_info(&instrument, day)? {
                Some(i) => lines.push(format!(
                    "  {instrument}: delivery {} open interest {} volume {}",
                    i.delivery_month, i.open_interest, i.volume
                )),
                None => lines.push(format!("  {instrument}: no metrics")),
            }
        }
        let prev = resolver.product_last_trading_day(name, day)?;
        let next = resolver.product_next_trading_day(name, day)?;
        lines.push(format!(
            "  previous {} next {}",
            prev.map(|d| d.to_string()).unwrap_or_else(|| "-".into()),
            next.map(|d| d.to_string()).unwrap_or_else(|| "-".into())
        ));
    }
    Ok(lines)
}

fn run_info(config_path: &Path, day: &str, product: Option<&str>) -> Result<(), ContangoError> {
    let adapter = load_config(config_path)?;
    let day = parse_day(day)?;
    let data_port = open_data_port(&adapter)?;
    for line in describe_day(data_port.as_ref(), day, product)? {
        println!("{line}");
    }
    Ok(())
}

fn run_validate(config_path: &Path) -> Result<(), ContangoError> {
    let adapter = load_config(config_path)?;
    validate_backtest_config(&adapter)?;
    validate_strategy_config(&adapter)?;

    let bt_config = BacktestConfig::from_config(&adapter)?;
    let strategy = MaCrossConfig::from_config(&adapter, &bt_config.price_field)?;
    eprintln!("\nBacktest: {} to {}", bt_config.begin_day, bt_config.end_day);
    eprintln!("  Price field: {}", bt_config.price_field);
    eprintln!("Strategy: {}", strategy.name);
    eprintln!("  Interest: {}", strategy.interest.target);
    eprintln!("  Fast/slow: {}/{}", strategy.fast, strategy.slow);
    if bt_config.begin_day > bt_config.end_day {
        eprintln!("warning: begin_day is after end_day, the run will be empty");
    }
    eprintln!("\nConfiguration is valid.");
    Ok(())
}
