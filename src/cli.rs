//! CLI definition and dispatch.

use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use crate::adapters::csv_adapter::CsvAdapter;
use crate::adapters::csv_report_adapter::CsvReportAdapter;
use crate::adapters::csv_schedule_adapter::CsvScheduleAdapter;
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::domain::config_validation::{
    DEFAULT_INITIAL_CASH, parse_optional_date, schedule_kind, validate_schedule_config,
    validate_simulation_config,
};
use crate::domain::error::TradesimError;
use crate::domain::metrics::Metrics;
use crate::domain::result::SimOutput;
use crate::domain::simulation::{SimConfig, backtest_from_positions, backtest_from_trades};
use crate::domain::source::ScheduleKind;
use crate::domain::universe::{load_price_table, parse_symbols};
use crate::ports::config_port::ConfigPort;
use crate::ports::data_port::DataPort;
use crate::ports::report_port::ReportPort;
use crate::ports::schedule_port::SchedulePort;

pub const DEFAULT_OUTPUT_DIR: &str = "./out";

#[derive(Parser, Debug)]
#[command(name = "tradesim", about = "Portfolio accounting and trade schedule simulator")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run a simulation from a trade or target-position schedule
    Run {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(short, long)]
        schedule: Option<PathBuf>,
        /// Schedule kind: trades or positions
        #[arg(short, long)]
        kind: Option<String>,
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Comma-separated instrument list
        #[arg(long)]
        symbols: Option<String>,
    },
    /// Validate a configuration file and its schedule
    Validate {
        #[arg(short, long)]
        config: PathBuf,
    },
    /// Show price data range for symbol(s)
    Info {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(long)]
        symbol: Option<String>,
    },
}

/// Values given on the command line that take precedence over the config.
#[derive(Debug, Clone, Default)]
pub struct RunOverrides {
    pub schedule: Option<PathBuf>,
    pub kind: Option<String>,
    pub output: Option<PathBuf>,
    pub symbols: Option<String>,
}

/// Everything a run needs, resolved from config and overrides.
#[derive(Debug, Clone, PartialEq)]
pub struct RunPlan {
    pub sim: SimConfig,
    pub risk_free_rate: f64,
    pub symbols: Vec<String>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub schedule_path: PathBuf,
    pub kind: ScheduleKind,
    pub output_dir: PathBuf,
}

pub fn run(cli: Cli) -> ExitCode {
    let result = match cli.command {
        Command::Run {
            config,
            schedule,
            kind,
            output,
            symbols,
        } => run_simulate(
            &config,
            &RunOverrides {
                schedule,
                kind,
                output,
                symbols,
            },
        ),
        Command::Validate { config } => run_validate(&config),
        Command::Info { config, symbol } => run_info(&config, symbol.as_deref()),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            (&e).into()
        }
    }
}

pub fn load_config(path: &Path) -> Result<FileConfigAdapter, TradesimError> {
    eprintln!("Loading config from {}", path.display());
    FileConfigAdapter::from_file(path)
}

pub fn build_sim_config(config: &dyn ConfigPort) -> Result<SimConfig, TradesimError> {
    validate_simulation_config(config)?;
    Ok(SimConfig {
        initial_cash: config.get_double("simulation", "initial_cash", DEFAULT_INITIAL_CASH),
        commission_bps: config.get_double("simulation", "commission_bps", 0.0),
    })
}

pub fn price_dir(config: &dyn ConfigPort) -> Result<PathBuf, TradesimError> {
    config
        .get_string("data", "price_dir")
        .map(PathBuf::from)
        .ok_or_else(|| TradesimError::ConfigMissing {
            section: "data".to_string(),
            key: "price_dir".to_string(),
        })
}

/// Instrument universe: override, then `[data] symbols`, then every symbol
/// the data source knows about.
pub fn resolve_symbols(
    symbols_override: Option<&str>,
    config: &dyn ConfigPort,
    data_port: &dyn DataPort,
) -> Result<Vec<String>, TradesimError> {
    if let Some(raw) = symbols_override {
        return Ok(parse_symbols(raw)?);
    }
    if let Some(raw) = config.get_string("data", "symbols") {
        return Ok(parse_symbols(&raw)?);
    }

    let symbols = data_port.list_symbols()?;
    if symbols.is_empty() {
        return Err(TradesimError::ConfigMissing {
            section: "data".to_string(),
            key: "symbols".to_string(),
        });
    }
    Ok(symbols)
}

pub fn resolve_schedule(
    schedule_override: Option<&Path>,
    kind_override: Option<&str>,
    config: &dyn ConfigPort,
) -> Result<(PathBuf, ScheduleKind), TradesimError> {
    let kind = match kind_override {
        Some(raw) => raw.parse().map_err(|reason| TradesimError::ConfigInvalid {
            section: "schedule".to_string(),
            key: "kind".to_string(),
            reason,
        })?,
        None => schedule_kind(config)?,
    };

    let path = match schedule_override {
        Some(p) => p.to_path_buf(),
        None => config
            .get_string("schedule", "path")
            .map(PathBuf::from)
            .ok_or_else(|| TradesimError::ConfigMissing {
                section: "schedule".to_string(),
                key: "path".to_string(),
            })?,
    };

    Ok((path, kind))
}

pub fn build_run_plan(
    config: &dyn ConfigPort,
    overrides: &RunOverrides,
    data_port: &dyn DataPort,
) -> Result<RunPlan, TradesimError> {
    let sim = build_sim_config(config)?;
    let symbols = resolve_symbols(overrides.symbols.as_deref(), config, data_port)?;
    let (schedule_path, kind) =
        resolve_schedule(overrides.schedule.as_deref(), overrides.kind.as_deref(), config)?;

    let output_dir = overrides
        .output
        .clone()
        .or_else(|| config.get_string("output", "dir").map(PathBuf::from))
        .unwrap_or_else(|| PathBuf::from(DEFAULT_OUTPUT_DIR));

    Ok(RunPlan {
        sim,
        risk_free_rate: config.get_double("simulation", "risk_free_rate", 0.0),
        symbols,
        start_date: parse_optional_date(config, "simulation", "start_date")?,
        end_date: parse_optional_date(config, "simulation", "end_date")?,
        schedule_path,
        kind,
        output_dir,
    })
}

/// Load prices and schedule, simulate, print the summary and write the
/// output tables.
pub fn run_pipeline(
    plan: &RunPlan,
    data_port: &dyn DataPort,
    schedule_port: &dyn SchedulePort,
    report_port: &dyn ReportPort,
) -> Result<SimOutput, TradesimError> {
    let prices = load_price_table(data_port, &plan.symbols, plan.start_date, plan.end_date)?;

    eprintln!(
        "Running {} schedule: {} instruments, {} dates",
        plan.kind,
        prices.symbols().len(),
        prices.len()
    );

    let output = match plan.kind {
        ScheduleKind::Trades => {
            let trades = schedule_port.load_trades()?;
            backtest_from_trades(&prices, &plan.sim, &trades)?
        }
        ScheduleKind::Positions => {
            let targets = schedule_port.load_positions()?;
            backtest_from_positions(&prices, &plan.sim, &targets)?
        }
    };

    let metrics = Metrics::compute(&output.returns, &output.transactions, plan.risk_free_rate);
    print_summary(&metrics, &output);

    let written = report_port.write(&output, &plan.output_dir)?;
    eprintln!();
    for path in &written {
        eprintln!("Wrote {}", path.display());
    }

    Ok(output)
}

fn print_summary(metrics: &Metrics, output: &SimOutput) {
    eprintln!("\n=== Results ===");
    eprintln!("Periods:          {}", metrics.periods);
    eprintln!("Total Return:     {:.2}%", metrics.total_return * 100.0);
    eprintln!("Annualized:       {:.2}%", metrics.annualized_return * 100.0);
    eprintln!("Volatility:       {:.2}%", metrics.volatility * 100.0);
    eprintln!("Sharpe Ratio:     {:.2}", metrics.sharpe_ratio);
    eprintln!("Sortino Ratio:    {:.2}", metrics.sortino_ratio);
    eprintln!(
        "Max Drawdown:     -{:.1}% ({} periods)",
        metrics.max_drawdown * 100.0,
        metrics.max_drawdown_duration
    );
    eprintln!("Transactions:     {}", metrics.transactions);
    eprintln!("Traded Notional:  {:.2}", metrics.traded_notional);
    if let Some(cash) = output.positions.cash().last() {
        eprintln!("Final Cash:       {:.2}", cash);
    }

    if !output.diagnostics.is_empty() {
        eprintln!("\n=== Diagnostics ({}) ===", output.diagnostics.len());
        for diagnostic in &output.diagnostics {
            eprintln!("  {diagnostic}");
        }
    }
}

fn run_simulate(config_path: &Path, overrides: &RunOverrides) -> Result<(), TradesimError> {
    let config = load_config(config_path)?;
    let data_port = CsvAdapter::new(price_dir(&config)?);
    let plan = build_run_plan(&config, overrides, &data_port)?;

    eprintln!("Loading schedule from {}", plan.schedule_path.display());
    let schedule_port = CsvScheduleAdapter::new(plan.schedule_path.clone());

    run_pipeline(&plan, &data_port, &schedule_port, &CsvReportAdapter::new())?;
    Ok(())
}

/// Symbols referenced anywhere in the schedule.
pub fn schedule_symbols(
    kind: ScheduleKind,
    schedule_port: &dyn SchedulePort,
) -> Result<BTreeSet<String>, TradesimError> {
    Ok(match kind {
        ScheduleKind::Trades => schedule_port
            .load_trades()?
            .values()
            .flatten()
            .map(|tx| tx.symbol().to_string())
            .collect(),
        ScheduleKind::Positions => schedule_port
            .load_positions()?
            .values()
            .flat_map(|targets| targets.keys().cloned())
            .collect(),
    })
}

fn run_validate(config_path: &Path) -> Result<(), TradesimError> {
    let config = load_config(config_path)?;
    validate_simulation_config(&config)?;
    validate_schedule_config(&config)?;
    eprintln!("Config validated successfully");

    let data_port = CsvAdapter::new(price_dir(&config)?);
    let universe = resolve_symbols(None, &config, &data_port)?;
    let (path, kind) = resolve_schedule(None, None, &config)?;

    let referenced = schedule_symbols(kind, &CsvScheduleAdapter::new(path.clone()))?;
    if let Some(unknown) = referenced.iter().find(|s| !universe.contains(s)) {
        return Err(TradesimError::UnknownSymbol {
            symbol: unknown.clone(),
        });
    }

    eprintln!("\nUniverse: {}", universe.join(", "));
    eprintln!(
        "Schedule: {} ({}), {} instruments referenced",
        path.display(),
        kind,
        referenced.len()
    );
    eprintln!("\nConfiguration is valid.");
    Ok(())
}

fn run_info(config_path: &Path, symbol: Option<&str>) -> Result<(), TradesimError> {
    let config = load_config(config_path)?;
    let data_port = CsvAdapter::new(price_dir(&config)?);
    let symbols = resolve_symbols(symbol, &config, &data_port)?;

    for s in &symbols {
        match data_port.get_data_range(s) {
            Ok(Some((min_date, max_date, count))) => {
                println!("{}: {} bars, {} to {}", s, count, min_date, max_date);
            }
            Ok(None) => eprintln!("{}: no data found", s),
            Err(e) => eprintln!("error querying {}: {}", s, e),
        }
    }
    Ok(())
}
