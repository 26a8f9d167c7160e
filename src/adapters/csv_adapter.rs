//! CSV price data adapter.
//!
//! One file per instrument, `<base_path>/<SYMBOL>.csv`, with header
//! `date,open,high,low,close,volume` and dates as `YYYY-MM-DD`. File stems
//! match symbols case-insensitively.

use crate::domain::error::TradesimError;
use crate::domain::ohlcv::OhlcvBar;
use crate::domain::universe::normalize_symbol;
use crate::ports::data_port::DataPort;
use chrono::NaiveDate;
use serde::Deserialize;
use std::fs;
use std::path::PathBuf;

const EXTENSION: &str = "csv";

#[derive(Debug, Deserialize)]
struct BarRecord {
    date: String,
    open: f64,
    high: f64,
    low: f64,
    close: f64,
    #[serde(default)]
    volume: i64,
}

pub struct CsvAdapter {
    base_path: PathBuf,
}

impl CsvAdapter {
    pub fn new(base_path: PathBuf) -> Self {
        Self { base_path }
    }

    fn csv_path(&self, symbol: &str) -> PathBuf {
        let exact = self.base_path.join(format!("{symbol}.{EXTENSION}"));
        if exact.is_file() {
            return exact;
        }
        fs::read_dir(&self.base_path)
            .into_iter()
            .flatten()
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .find(|path| {
                path.extension().and_then(|ext| ext.to_str()) == Some(EXTENSION)
                    && path
                        .file_stem()
                        .and_then(|s| s.to_str())
                        .is_some_and(|stem| stem.eq_ignore_ascii_case(symbol))
            })
            .unwrap_or(exact)
    }
}

impl DataPort for CsvAdapter {
    fn fetch_bars(
        &self,
        symbol: &str,
        start_date: Option<NaiveDate>,
        end_date: Option<NaiveDate>,
    ) -> Result<Vec<OhlcvBar>, TradesimError> {
        let path = self.csv_path(symbol);
        let content = fs::read_to_string(&path).map_err(|e| TradesimError::Data {
            reason: format!("failed to read {}: {}", path.display(), e),
        })?;

        let mut rdr = csv::Reader::from_reader(content.as_bytes());
        let mut bars = Vec::new();

        for result in rdr.deserialize::<BarRecord>() {
            let record = result.map_err(|e| TradesimError::Data {
                reason: format!("CSV parse error in {}: {}", path.display(), e),
            })?;

            let date = NaiveDate::parse_from_str(record.date.trim(), "%Y-%m-%d").map_err(|e| {
                TradesimError::Data {
                    reason: format!("invalid date '{}' in {}: {}", record.date, path.display(), e),
                }
            })?;

            if start_date.is_some_and(|start| date < start) || end_date.is_some_and(|end| date > end)
            {
                continue;
            }

            bars.push(OhlcvBar {
                symbol: symbol.to_string(),
                date,
                open: record.open,
                high: record.high,
                low: record.low,
                close: record.close,
                volume: record.volume,
            });
        }

        bars.sort_by_key(|b| b.date);
        Ok(bars)
    }

    fn list_symbols(&self) -> Result<Vec<String>, TradesimError> {
        let entries = fs::read_dir(&self.base_path).map_err(|e| TradesimError::Data {
            reason: format!(
                "failed to read directory {}: {}",
                self.base_path.display(),
                e
            ),
        })?;

        let mut symbols = Vec::new();

        for entry in entries {
            let entry = entry.map_err(|e| TradesimError::Data {
                reason: format!("directory entry error: {}", e),
            })?;

            let path = entry.path();
            if path.extension().and_then(|ext| ext.to_str()) != Some(EXTENSION) {
                continue;
            }
            if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                symbols.push(normalize_symbol(stem));
            }
        }

        symbols.sort();
        symbols.dedup();
        Ok(symbols)
    }
}
