//! CSV report adapter.
//!
//! Writes the three output tables of a run as `transactions.csv`,
//! `positions.csv` and `returns.csv` under the output directory.

use crate::domain::error::TradesimError;
use crate::domain::result::{PositionTable, ReturnSeries, SimOutput, TransactionLedger};
use crate::ports::report_port::ReportPort;
use std::fs;
use std::path::{Path, PathBuf};

pub const TRANSACTIONS_FILE: &str = "transactions.csv";
pub const POSITIONS_FILE: &str = "positions.csv";
pub const RETURNS_FILE: &str = "returns.csv";

const DATE_FORMAT: &str = "%Y-%m-%d";

#[derive(Debug, Default)]
pub struct CsvReportAdapter;

impl CsvReportAdapter {
    pub fn new() -> Self {
        Self
    }
}

fn csv_error(path: &Path, e: csv::Error) -> TradesimError {
    TradesimError::Io(std::io::Error::other(format!(
        "failed to write {}: {}",
        path.display(),
        e
    )))
}

fn write_transactions(ledger: &TransactionLedger, path: &Path) -> Result<(), TradesimError> {
    let mut wtr = csv::Writer::from_path(path).map_err(|e| csv_error(path, e))?;

    let mut header = vec!["date"];
    header.extend(TransactionLedger::COLUMNS);
    wtr.write_record(&header).map_err(|e| csv_error(path, e))?;

    for entry in ledger.entries() {
        wtr.write_record([
            entry.date.format(DATE_FORMAT).to_string(),
            entry.amount.to_string(),
            entry.price.to_string(),
            entry.sid.to_string(),
            entry.symbol.clone(),
            entry.txn_dollars.to_string(),
        ])
        .map_err(|e| csv_error(path, e))?;
    }

    wtr.flush()?;
    Ok(())
}

fn write_positions(positions: &PositionTable, path: &Path) -> Result<(), TradesimError> {
    let mut wtr = csv::Writer::from_path(path).map_err(|e| csv_error(path, e))?;

    let mut header = vec!["date".to_string()];
    header.extend(positions.columns().iter().cloned());
    wtr.write_record(&header).map_err(|e| csv_error(path, e))?;

    for (date, row) in positions.index().iter().zip(positions.rows()) {
        let mut record = Vec::with_capacity(row.len() + 1);
        record.push(date.format(DATE_FORMAT).to_string());
        record.extend(row.iter().map(f64::to_string));
        wtr.write_record(&record).map_err(|e| csv_error(path, e))?;
    }

    wtr.flush()?;
    Ok(())
}

fn write_returns(returns: &ReturnSeries, path: &Path) -> Result<(), TradesimError> {
    let mut wtr = csv::Writer::from_path(path).map_err(|e| csv_error(path, e))?;
    wtr.write_record(["date", "return"])
        .map_err(|e| csv_error(path, e))?;

    for (date, value) in returns.iter() {
        wtr.write_record([date.format(DATE_FORMAT).to_string(), value.to_string()])
            .map_err(|e| csv_error(path, e))?;
    }

    wtr.flush()?;
    Ok(())
}

impl ReportPort for CsvReportAdapter {
    fn write(&self, output: &SimOutput, dir: &Path) -> Result<Vec<PathBuf>, TradesimError> {
        fs::create_dir_all(dir)?;

        let transactions = dir.join(TRANSACTIONS_FILE);
        write_transactions(&output.transactions, &transactions)?;

        let positions = dir.join(POSITIONS_FILE);
        write_positions(&output.positions, &positions)?;

        let returns = dir.join(RETURNS_FILE);
        write_returns(&output.returns, &returns)?;

        Ok(vec![transactions, positions, returns])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::price_table::PriceTable;
    use crate::domain::simulation::{SimConfig, backtest_from_trades};
    use crate::domain::transaction::Transaction;
    use chrono::NaiveDate;
    use std::collections::BTreeMap;
    use tempfile::TempDir;

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, day).unwrap()
    }

    fn sample_output() -> SimOutput {
        let prices = PriceTable::new(
            vec![d(1), d(2)],
            vec!["AAA".into(), "BBB".into()],
            vec![vec![10.0, 20.0], vec![15.0, 20.0]],
        )
        .unwrap();
        let mut trades = BTreeMap::new();
        trades.insert(d(1), vec![Transaction::buy(d(1), "AAA", 5.0)]);
        let config = SimConfig {
            initial_cash: 100.0,
            commission_bps: 0.0,
        };
        backtest_from_trades(&prices, &config, &trades).unwrap()
    }

    #[test]
    fn writes_all_three_tables() {
        let dir = TempDir::new().unwrap();
        let out_dir = dir.path().join("nested").join("out");

        let written = CsvReportAdapter::new()
            .write(&sample_output(), &out_dir)
            .unwrap();
        assert_eq!(written.len(), 3);
        assert!(written.iter().all(|p| p.exists()));

        let txns = fs::read_to_string(out_dir.join(TRANSACTIONS_FILE)).unwrap();
        assert_eq!(
            txns,
            "date,amount,price,sid,symbol,txn_dollars\n2024-01-01,5,10,0,AAA,-50\n"
        );

        let positions = fs::read_to_string(out_dir.join(POSITIONS_FILE)).unwrap();
        assert_eq!(
            positions,
            "date,AAA,BBB,cash\n2024-01-01,5,0,50\n2024-01-02,5,0,50\n"
        );

        let returns = fs::read_to_string(out_dir.join(RETURNS_FILE)).unwrap();
        assert_eq!(returns, "date,return\n2024-01-01,0\n2024-01-02,0.25\n");
    }

    #[test]
    fn empty_ledger_still_writes_header() {
        let dir = TempDir::new().unwrap();
        let prices = PriceTable::new(vec![d(1)], vec!["AAA".into()], vec![vec![1.0]]).unwrap();
        let out = backtest_from_trades(&prices, &SimConfig::default(), &BTreeMap::new()).unwrap();

        CsvReportAdapter::new().write(&out, dir.path()).unwrap();
        let txns = fs::read_to_string(dir.path().join(TRANSACTIONS_FILE)).unwrap();
        assert_eq!(txns, "date,amount,price,sid,symbol,txn_dollars\n");
    }
}
