//! Simulation loop and entry points.
//!
//! One pass over the price table in date order. At each step the portfolio
//! is marked to the step's closes first (so the return reflects the prior
//! step's holdings), then the source is asked for transactions, which are
//! executed at the same closes in the order given.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use tracing::info;

use super::error::TradesimError;
use super::portfolio::Portfolio;
use super::price_table::PriceTable;
use super::result::{SimOutput, SimResult};
use super::source::{
    PositionSchedule, PositionScheduleSource, StepContext, Strategy, StrategySource,
    TradeSchedule, TradeScheduleSource, TransactionSource,
};
use super::transaction::Transaction;

#[derive(Debug, Clone, PartialEq)]
pub struct SimConfig {
    pub initial_cash: f64,
    /// Commission in basis points, charged on both buys and sells.
    pub commission_bps: f64,
}

impl Default for SimConfig {
    fn default() -> Self {
        SimConfig {
            initial_cash: 100_000.0,
            commission_bps: 0.0,
        }
    }
}

/// Run the shared loop against any transaction source.
///
/// Portfolio and result state are created here and dropped with the call,
/// so separate runs never share state.
pub fn run_simulation(
    prices: &PriceTable,
    config: &SimConfig,
    source: &mut dyn TransactionSource,
) -> Result<SimOutput, TradesimError> {
    let mut portfolio = Portfolio::new(prices.symbols(), config.initial_cash, config.commission_bps);
    let mut result = SimResult::new(prices.dates().to_vec(), prices.symbols().to_vec());

    info!(
        steps = prices.len(),
        instruments = prices.symbols().len(),
        initial_cash = config.initial_cash,
        commission_bps = config.commission_bps,
        "starting simulation"
    );

    for (step, &date) in prices.dates().iter().enumerate() {
        let close = prices.close_row(step);
        let period_return = portfolio.compute_return(close);

        let txns = {
            let ctx = StepContext {
                step,
                date,
                history: prices.history(step),
                portfolio: &portfolio,
            };
            source.transactions(&ctx)?
        };

        result.update(date, period_return, close, txns, &mut portfolio)?;
    }

    let diagnostics = portfolio.take_diagnostics();
    let output = result.finalize(diagnostics);

    info!(
        transactions = output.transactions.len(),
        diagnostics = output.diagnostics.len(),
        "simulation complete"
    );
    Ok(output)
}

/// Drive the run with a strategy invoked once per step.
pub fn backtest_from_strategy<S: Strategy>(
    prices: &PriceTable,
    config: &SimConfig,
    strategy: S,
) -> Result<SimOutput, TradesimError> {
    let mut source = StrategySource::new(strategy);
    run_simulation(prices, config, &mut source)
}

/// Replay a fixed schedule of trades.
pub fn backtest_from_trades(
    prices: &PriceTable,
    config: &SimConfig,
    trades: &BTreeMap<NaiveDate, Vec<Transaction>>,
) -> Result<SimOutput, TradesimError> {
    let schedule: &TradeSchedule = trades;
    let mut source = TradeScheduleSource::new(schedule);
    run_simulation(prices, config, &mut source)
}

/// Trade toward a fixed schedule of target positions.
pub fn backtest_from_positions(
    prices: &PriceTable,
    config: &SimConfig,
    targets: &BTreeMap<NaiveDate, BTreeMap<String, f64>>,
) -> Result<SimOutput, TradesimError> {
    let schedule: &PositionSchedule = targets;
    let mut source = PositionScheduleSource::new(schedule);
    run_simulation(prices, config, &mut source)
}
