//! CSV schedule adapter.
//!
//! Trade schedules use the header `date,symbol,quantity,side`; rows sharing
//! a date keep file order. Position schedules use `date,symbol,target`, at
//! most one target per instrument per date. Symbols are normalized the same
//! way as the configured universe.

use crate::domain::error::TradesimError;
use crate::domain::source::{PositionSchedule, TradeSchedule};
use crate::domain::transaction::{Side, Transaction};
use crate::domain::universe::normalize_symbol;
use crate::ports::schedule_port::SchedulePort;
use chrono::NaiveDate;
use serde::Deserialize;
use std::fs;
use std::path::PathBuf;

#[derive(Debug, Deserialize)]
struct TradeRecord {
    date: String,
    symbol: String,
    quantity: f64,
    side: String,
}

#[derive(Debug, Deserialize)]
struct TargetRecord {
    date: String,
    symbol: String,
    target: f64,
}

pub struct CsvScheduleAdapter {
    path: PathBuf,
}

impl CsvScheduleAdapter {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    fn error(&self, line: u64, reason: impl std::fmt::Display) -> TradesimError {
        TradesimError::Schedule {
            file: self.path.display().to_string(),
            reason: format!("line {line}: {reason}"),
        }
    }

    /// Deserialized rows paired with the file line each record starts on.
    fn read_records<T: for<'de> Deserialize<'de>>(&self) -> Result<Vec<(u64, T)>, TradesimError> {
        let content = fs::read_to_string(&self.path).map_err(|e| TradesimError::Schedule {
            file: self.path.display().to_string(),
            reason: e.to_string(),
        })?;

        let mut rdr = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(content.as_bytes());

        let headers = rdr
            .headers()
            .map_err(|e| self.error(1, e))?
            .clone();

        let mut rows = Vec::new();
        for result in rdr.records() {
            let record = result.map_err(|e| {
                let line = e.position().map_or(0, |p| p.line());
                self.error(line, e)
            })?;
            let line = record.position().map_or(0, |p| p.line());
            let row = record
                .deserialize(Some(&headers))
                .map_err(|e| self.error(line, e))?;
            rows.push((line, row));
        }
        Ok(rows)
    }

    fn parse_date(&self, line: u64, raw: &str) -> Result<NaiveDate, TradesimError> {
        NaiveDate::parse_from_str(raw, "%Y-%m-%d")
            .map_err(|_| self.error(line, format!("invalid date '{raw}', expected YYYY-MM-DD")))
    }
}

impl SchedulePort for CsvScheduleAdapter {
    fn load_trades(&self) -> Result<TradeSchedule, TradesimError> {
        let mut schedule = TradeSchedule::new();

        for (line, record) in self.read_records::<TradeRecord>()? {
            let date = self.parse_date(line, &record.date)?;
            let side: Side = record.side.parse().map_err(|e| self.error(line, e))?;
            if record.quantity < 0.0 || !record.quantity.is_finite() {
                return Err(self.error(
                    line,
                    format!("quantity must be a non-negative number, got {}", record.quantity),
                ));
            }

            schedule
                .entry(date)
                .or_default()
                .push(Transaction::new(
                    date,
                    normalize_symbol(&record.symbol),
                    record.quantity,
                    side,
                ));
        }

        Ok(schedule)
    }

    fn load_positions(&self) -> Result<PositionSchedule, TradesimError> {
        let mut schedule = PositionSchedule::new();

        for (line, record) in self.read_records::<TargetRecord>()? {
            let date = self.parse_date(line, &record.date)?;
            if !record.target.is_finite() {
                return Err(self.error(line, format!("target must be finite, got {}", record.target)));
            }

            let symbol = normalize_symbol(&record.symbol);
            let targets = schedule.entry(date).or_default();
            if targets.insert(symbol.clone(), record.target).is_some() {
                return Err(self.error(
                    line,
                    format!("duplicate target for {symbol} on {date}"),
                ));
            }
        }

        Ok(schedule)
    }
}
