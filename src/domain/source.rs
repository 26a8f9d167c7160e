//! Transaction sources: strategy callbacks, trade schedules and target
//! position schedules.
//!
//! Every source reduces to "given the current step and a read-only view of
//! the portfolio, produce this step's transactions".

use chrono::NaiveDate;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use super::error::TradesimError;
use super::portfolio::PortfolioView;
use super::price_table::PriceHistory;
use super::transaction::{Side, Transaction};

/// Trades to execute, keyed by date.
pub type TradeSchedule = BTreeMap<NaiveDate, Vec<Transaction>>;

/// Target signed positions per instrument, keyed by date.
pub type PositionSchedule = BTreeMap<NaiveDate, BTreeMap<String, f64>>;

/// Which kind of schedule file drives a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScheduleKind {
    Trades,
    Positions,
}

impl fmt::Display for ScheduleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScheduleKind::Trades => write!(f, "trades"),
            ScheduleKind::Positions => write!(f, "positions"),
        }
    }
}

impl FromStr for ScheduleKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "trades" => Ok(ScheduleKind::Trades),
            "positions" => Ok(ScheduleKind::Positions),
            other => Err(format!(
                "unknown schedule kind '{other}', expected trades or positions"
            )),
        }
    }
}

/// What a source can see at one step.
pub struct StepContext<'a> {
    pub step: usize,
    pub date: NaiveDate,
    /// Price rows strictly before `date`.
    pub history: PriceHistory<'a>,
    pub portfolio: &'a dyn PortfolioView,
}

pub trait TransactionSource {
    fn transactions(&mut self, ctx: &StepContext<'_>) -> Result<Vec<Transaction>, TradesimError>;
}

/// A user trading strategy, invoked once per step.
///
/// Returning `None` breaks the contract and aborts the run; return an empty
/// list to do nothing.
pub trait Strategy {
    fn on_step(&mut self, ctx: &StepContext<'_>) -> Option<Vec<Transaction>>;
}

/// Strategy backed by a closure. Extra arguments are bound by capture.
pub struct FnStrategy<F>(F);

pub fn strategy_fn<F>(f: F) -> FnStrategy<F>
where
    F: FnMut(&StepContext<'_>) -> Option<Vec<Transaction>>,
{
    FnStrategy(f)
}

impl<F> Strategy for FnStrategy<F>
where
    F: FnMut(&StepContext<'_>) -> Option<Vec<Transaction>>,
{
    fn on_step(&mut self, ctx: &StepContext<'_>) -> Option<Vec<Transaction>> {
        (self.0)(ctx)
    }
}

pub struct StrategySource<S> {
    strategy: S,
}

impl<S: Strategy> StrategySource<S> {
    pub fn new(strategy: S) -> Self {
        Self { strategy }
    }

    pub fn into_inner(self) -> S {
        self.strategy
    }
}

impl<S: Strategy> TransactionSource for StrategySource<S> {
    fn transactions(&mut self, ctx: &StepContext<'_>) -> Result<Vec<Transaction>, TradesimError> {
        self.strategy
            .on_step(ctx)
            .ok_or(TradesimError::StrategyReturnedNothing { date: ctx.date })
    }
}

pub struct TradeScheduleSource<'a> {
    schedule: &'a TradeSchedule,
}

impl<'a> TradeScheduleSource<'a> {
    pub fn new(schedule: &'a TradeSchedule) -> Self {
        Self { schedule }
    }
}

impl TransactionSource for TradeScheduleSource<'_> {
    fn transactions(&mut self, ctx: &StepContext<'_>) -> Result<Vec<Transaction>, TradesimError> {
        Ok(self.schedule.get(&ctx.date).cloned().unwrap_or_default())
    }
}

/// Trades toward target positions.
///
/// For each instrument with a target on the date, trades the difference
/// against the current position. A target equal to the current position
/// still yields a zero-quantity buy.
pub struct PositionScheduleSource<'a> {
    schedule: &'a PositionSchedule,
}

impl<'a> PositionScheduleSource<'a> {
    pub fn new(schedule: &'a PositionSchedule) -> Self {
        Self { schedule }
    }
}

impl TransactionSource for PositionScheduleSource<'_> {
    fn transactions(&mut self, ctx: &StepContext<'_>) -> Result<Vec<Transaction>, TradesimError> {
        let Some(targets) = self.schedule.get(&ctx.date) else {
            return Ok(Vec::new());
        };

        targets
            .iter()
            .map(|(symbol, &target)| -> Result<Transaction, TradesimError> {
                let delta = target - ctx.portfolio.position(symbol)?;
                Ok(Transaction::new(
                    ctx.date,
                    symbol.clone(),
                    delta.abs(),
                    Side::for_delta(delta),
                ))
            })
            .collect()
    }
}
