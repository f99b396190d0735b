//! CLI definition and dispatch.

use clap::{Parser, Subcommand};
use log::info;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use crate::adapters::csv_adapter::{CsvAdapter, DataType};
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::domain::backtest::{Backtest, BacktestConfig, Phase, Progress, DEFAULT_CAPITAL};
use crate::domain::config_validation::{
    parse_date, parse_seed, validate_backtest_config, validate_data_config,
    validate_strategy_config,
};
use crate::domain::error::BacktestError;
use crate::domain::metrics::RunSummary;
use crate::domain::observation::parse_timestamp;
use crate::domain::strategy::Strategy;
use crate::domain::trade::TradeRecord;
use crate::ports::config_port::ConfigPort;
use crate::ports::data_port::{check_range, DataPort};
use crate::strategies::drunk_monkey::DEFAULT_BUY_PROBABILITY;
use crate::strategies::{build_strategy, StrategyKind, StrategySettings};

pub const TRADE_LOG_HEADER: [&str; 5] = ["timestamp", "action", "ticker", "amount", "price"];

#[derive(Parser, Debug)]
#[command(name = "backtester", about = "Replay trading strategies over historical market data")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run a backtest
    Backtest {
        #[arg(short, long)]
        config: Option<PathBuf>,
        #[command(flatten)]
        overrides: Overrides,
        /// Write every executed trade to this CSV file
        #[arg(long)]
        trades: Option<PathBuf>,
        /// Only print the final summary
        #[arg(short, long)]
        quiet: bool,
    },
    /// List the tickers present in a dataset
    Tickers {
        #[arg(long)]
        data: PathBuf,
        #[arg(long, default_value = "cryptodatadownload")]
        data_type: String,
    },
    /// Show the time span covered by a dataset
    Info {
        #[arg(long)]
        data: PathBuf,
        #[arg(long, default_value = "cryptodatadownload")]
        data_type: String,
    },
    /// Validate a backtest configuration without loading data
    Validate {
        #[arg(short, long)]
        config: PathBuf,
    },
}

/// Command-line values taking precedence over the config file.
#[derive(clap::Args, Debug, Clone, Default)]
pub struct Overrides {
    #[arg(long)]
    pub data: Option<PathBuf>,
    #[arg(long)]
    pub data_type: Option<String>,
    #[arg(long)]
    pub capital: Option<f64>,
    #[arg(long)]
    pub start: Option<String>,
    #[arg(long)]
    pub end: Option<String>,
    #[arg(long)]
    pub strategy: Option<String>,
    #[arg(long)]
    pub seed: Option<u64>,
}

#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    pub quiet: bool,
    pub trades_path: Option<PathBuf>,
}

pub fn run(cli: Cli) -> ExitCode {
    let result = match cli.command {
        Command::Backtest {
            config,
            overrides,
            trades,
            quiet,
        } => {
            let options = RunOptions {
                quiet,
                trades_path: trades,
            };
            run_backtest(config.as_deref(), &overrides, &options)
        }
        Command::Tickers { data, data_type } => run_tickers(&data, &data_type),
        Command::Info { data, data_type } => run_info(&data, &data_type),
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

pub fn load_config(path: Option<&Path>) -> Result<FileConfigAdapter, BacktestError> {
    match path {
        Some(path) => {
            eprintln!("Loading config from {}", path.display());
            FileConfigAdapter::from_file(path)
        }
        None => FileConfigAdapter::from_string(""),
    }
}

fn run_backtest(
    config_path: Option<&Path>,
    overrides: &Overrides,
    options: &RunOptions,
) -> Result<(), BacktestError> {
    // Stage 1: configuration
    let config = load_config(config_path)?;
    let bt_config = build_backtest_config(&config, overrides)?;
    let settings = build_strategy_settings(&config, overrides)?;
    let (data_path, data_type) = resolve_data(&config, overrides)?;

    // Stage 2: data source, loaded once
    eprintln!("Loading {} data from {}", data_type, data_path.display());
    let source = CsvAdapter::open(&data_path, data_type)?;
    if source.is_empty() {
        return Err(BacktestError::NoData {
            source_name: data_path.display().to_string(),
        });
    }

    // Stage 3: strategy and replay
    let strategy = build_strategy(&settings)?;
    eprintln!("Running strategy: {}", strategy.name());
    run_backtest_pipeline(&source, strategy, &bt_config, options)?;
    Ok(())
}

/// Replay `strategy` over `source`, printing progress and the final summary.
pub fn run_backtest_pipeline<S: Strategy>(
    source: &dyn DataPort,
    strategy: S,
    config: &BacktestConfig,
    options: &RunOptions,
) -> Result<RunSummary, BacktestError> {
    let execution = Backtest::from_config(strategy, source, config)?;
    eprintln!(
        "Replaying {} observations with capital {:.2}",
        execution.total(),
        config.capital
    );

    let mut summary = RunSummary::new(config.capital);
    let mut trade_log: Vec<TradeRecord> = Vec::new();
    for progress in execution {
        let progress = progress?;
        if !options.quiet {
            eprintln!("{}", format_progress(&progress));
        }
        summary.record(&progress);
        trade_log.extend(progress.trades);
    }

    print_summary(&summary);

    if let Some(path) = &options.trades_path {
        write_trade_log(path, &trade_log)?;
        eprintln!("Trade log written to: {}", path.display());
    }
    Ok(summary)
}

pub fn format_progress(progress: &Progress) -> String {
    let label = match progress.phase {
        Phase::Step => format!("{}/{}", progress.index + 1, progress.total),
        Phase::Liquidation => "liquidation".to_string(),
    };
    let mut line = format!(
        "[{}] {}  net worth {:.2}",
        label, progress.timestamp, progress.net_worth
    );
    for trade in &progress.trades {
        line.push_str("\n    ");
        line.push_str(&trade.to_string());
    }
    line
}

fn print_summary(summary: &RunSummary) {
    let sign = if summary.total_return() >= 0.0 { "+" } else { "" };
    eprintln!("\n=== Backtest Summary ===");
    eprintln!("Initial Capital:  {:.2}", summary.initial_capital);
    eprintln!("Final Net Worth:  {:.2}", summary.final_net_worth);
    eprintln!("Total Return:     {}{:.2}%", sign, summary.total_return() * 100.0);
    eprintln!("Max Drawdown:     -{:.1}%", summary.max_drawdown * 100.0);
    eprintln!("Steps:            {}", summary.steps);
    eprintln!(
        "Trades:           {} ({} buys, {} sells, {} liquidation)",
        summary.total_trades(),
        summary.buys,
        summary.sells,
        summary.liquidation_sells
    );
}

pub fn write_trade_log(path: &Path, trades: &[TradeRecord]) -> Result<(), BacktestError> {
    let to_io = |e: csv::Error| BacktestError::Io(std::io::Error::other(e));
    let mut writer = csv::Writer::from_path(path).map_err(to_io)?;
    writer.write_record(TRADE_LOG_HEADER).map_err(to_io)?;
    for trade in trades {
        writer.write_record(trade.to_row()).map_err(to_io)?;
    }
    writer.flush()?;
    info!("wrote {} trades to {}", trades.len(), path.display());
    Ok(())
}

/// Merge `[backtest]` with command-line overrides and validate the result.
/// Keys replaced by an override are never read from the file.
pub fn build_backtest_config(
    config: &dyn ConfigPort,
    overrides: &Overrides,
) -> Result<BacktestConfig, BacktestError> {
    let capital = match overrides.capital {
        Some(c) => c,
        None if config.get_value("backtest", "capital").is_some() => {
            config.get_double("backtest", "capital", f64::NAN)
        }
        None => DEFAULT_CAPITAL,
    };
    if !capital.is_finite() || capital <= 0.0 {
        return Err(BacktestError::ConfigInvalid {
            section: "backtest".into(),
            key: "capital".into(),
            reason: "capital must be a positive number".into(),
        });
    }

    let start = match &overrides.start {
        Some(s) => Some(parse_override(s, "start_date")?),
        None => parse_date(config, "start_date")?,
    };
    let end = match &overrides.end {
        Some(s) => Some(parse_override(s, "end_date")?),
        None => parse_date(config, "end_date")?,
    };
    check_range(start, end)?;

    Ok(BacktestConfig {
        capital,
        start,
        end,
    })
}

fn parse_override(value: &str, key: &str) -> Result<chrono::NaiveDateTime, BacktestError> {
    parse_timestamp(value).ok_or_else(|| BacktestError::ConfigInvalid {
        section: "backtest".into(),
        key: key.into(),
        reason: format!("invalid date `{value}`, expected YYYY-MM-DD [HH:MM[:SS]]"),
    })
}

pub fn build_strategy_settings(
    config: &dyn ConfigPort,
    overrides: &Overrides,
) -> Result<StrategySettings, BacktestError> {
    let kind = match overrides
        .strategy
        .clone()
        .or_else(|| config.get_value("strategy", "name"))
    {
        Some(name) => name.parse::<StrategyKind>()?,
        None => StrategyKind::default(),
    };
    let seed = match overrides.seed {
        Some(seed) => Some(seed),
        None => parse_seed(config)?,
    };
    let buy_probability = match config.get_value("strategy", "buy_probability") {
        Some(_) => config.get_double("strategy", "buy_probability", f64::NAN),
        None => DEFAULT_BUY_PROBABILITY,
    };
    if !(0.0..=1.0).contains(&buy_probability) {
        return Err(BacktestError::ConfigInvalid {
            section: "strategy".into(),
            key: "buy_probability".into(),
            reason: "buy_probability must be between 0 and 1".into(),
        });
    }
    Ok(StrategySettings {
        kind,
        buy_probability,
        seed,
    })
}

pub fn resolve_data(
    config: &dyn ConfigPort,
    overrides: &Overrides,
) -> Result<(PathBuf, DataType), BacktestError> {
    let path = match &overrides.data {
        Some(p) => p.clone(),
        None => {
            validate_data_config(config)?;
            PathBuf::from(config.get_value("data", "path").unwrap_or_default())
        }
    };
    let data_type = match overrides
        .data_type
        .clone()
        .or_else(|| config.get_value("data", "type"))
    {
        Some(t) => t.parse::<DataType>()?,
        None => DataType::default(),
    };
    Ok((path, data_type))
}

fn run_tickers(data: &Path, data_type: &str) -> Result<(), BacktestError> {
    let source = CsvAdapter::open(data, data_type.parse()?)?;
    let tickers = source.tickers();
    if tickers.is_empty() {
        eprintln!("No tickers found in {}", data.display());
    } else {
        for ticker in &tickers {
            println!("{ticker}");
        }
        eprintln!("{} tickers found", tickers.len());
    }
    Ok(())
}

fn run_info(data: &Path, data_type: &str) -> Result<(), BacktestError> {
    let source = CsvAdapter::open(data, data_type.parse()?)?;
    match source.span() {
        Some((first, last, count)) => {
            println!(
                "{}: {} observations, {} tickers, {} to {}",
                data.display(),
                count,
                source.tickers().len(),
                first,
                last
            );
        }
        None => eprintln!("{}: no data found", data.display()),
    }
    Ok(())
}

fn run_validate(config_path: &Path) -> Result<(), BacktestError> {
    let config = load_config(Some(config_path))?;
    let overrides = Overrides::default();

    validate_data_config(&config)?;
    validate_backtest_config(&config)?;
    validate_strategy_config(&config)?;

    let (path, data_type) = resolve_data(&config, &overrides)?;
    let bt_config = build_backtest_config(&config, &overrides)?;
    let settings = build_strategy_settings(&config, &overrides)?;

    let bound = |b: Option<chrono::NaiveDateTime>| {
        b.map(|t| t.to_string()).unwrap_or_else(|| "(full span)".to_string())
    };
    eprintln!("\nData:");
    eprintln!("  path: {}", path.display());
    eprintln!("  type: {}", data_type);
    eprintln!("\nBacktest:");
    eprintln!("  capital: {:.2}", bt_config.capital);
    eprintln!("  start:   {}", bound(bt_config.start));
    eprintln!("  end:     {}", bound(bt_config.end));
    eprintln!("\nStrategy:");
    eprintln!("  name:            {:?}", settings.kind);
    eprintln!("  buy_probability: {}", settings.buy_probability);
    match settings.seed {
        Some(seed) => eprintln!("  seed:            {seed}"),
        None => eprintln!("  seed:            (random)"),
    }

    eprintln!("\nConfiguration is valid.");
    Ok(())
}
