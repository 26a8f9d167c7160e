#![allow(dead_code)]

use chrono::NaiveDate;
use std::collections::HashMap;
use tradesim::domain::error::TradesimError;
pub use tradesim::domain::ohlcv::OhlcvBar;
use tradesim::domain::price_table::PriceTable;
use tradesim::domain::simulation::SimConfig;
use tradesim::ports::data_port::DataPort;

pub struct MockDataPort {
    pub data: HashMap<String, Vec<OhlcvBar>>,
    pub errors: HashMap<String, String>,
}

impl MockDataPort {
    pub fn new() -> Self {
        Self {
            data: HashMap::new(),
            errors: HashMap::new(),
        }
    }

    pub fn with_bars(mut self, symbol: &str, bars: Vec<OhlcvBar>) -> Self {
        self.data.insert(symbol.to_string(), bars);
        self
    }

    pub fn with_error(mut self, symbol: &str, reason: &str) -> Self {
        self.errors.insert(symbol.to_string(), reason.to_string());
        self
    }
}

impl DataPort for MockDataPort {
    fn fetch_bars(
        &self,
        symbol: &str,
        start_date: Option<NaiveDate>,
        end_date: Option<NaiveDate>,
    ) -> Result<Vec<OhlcvBar>, TradesimError> {
        if let Some(reason) = self.errors.get(symbol) {
            return Err(TradesimError::Data {
                reason: reason.clone(),
            });
        }
        Ok(self
            .data
            .get(symbol)
            .map(|bars| {
                bars.iter()
                    .filter(|b| start_date.is_none_or(|s| b.date >= s))
                    .filter(|b| end_date.is_none_or(|e| b.date <= e))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }

    fn list_symbols(&self) -> Result<Vec<String>, TradesimError> {
        let mut symbols: Vec<String> = self.data.keys().cloned().collect();
        symbols.sort();
        Ok(symbols)
    }
}

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

pub fn make_bar(symbol: &str, date: &str, close: f64) -> OhlcvBar {
    OhlcvBar {
        symbol: symbol.to_string(),
        date: NaiveDate::parse_from_str(date, "%Y-%m-%d").unwrap(),
        open: close - 1.0,
        high: close + 1.0,
        low: close - 2.0,
        close,
        volume: 1000,
    }
}

/// Consecutive daily bars with closes from `closes`.
pub fn generate_bars(symbol: &str, start_date: &str, closes: &[f64]) -> Vec<OhlcvBar> {
    let start = NaiveDate::parse_from_str(start_date, "%Y-%m-%d").unwrap();
    closes
        .iter()
        .enumerate()
        .map(|(i, &close)| OhlcvBar {
            symbol: symbol.to_string(),
            date: start + chrono::Duration::days(i as i64),
            open: close,
            high: close + 1.0,
            low: close - 1.0,
            close,
            volume: 1000,
        })
        .collect()
}

/// Table with daily dates starting 2024-01-01, one row of closes per date.
pub fn price_table(symbols: &[&str], rows: Vec<Vec<f64>>) -> PriceTable {
    let dates = (0..rows.len())
        .map(|i| date(2024, 1, 1) + chrono::Duration::days(i as i64))
        .collect();
    PriceTable::new(
        dates,
        symbols.iter().map(|s| s.to_string()).collect(),
        rows,
    )
    .unwrap()
}

pub fn sim_config(initial_cash: f64, commission_bps: f64) -> SimConfig {
    SimConfig {
        initial_cash,
        commission_bps,
    }
}
