//! Instrument universe: symbol list parsing and price loading.

use crate::domain::error::TradesimError;
use crate::domain::price_table::{PriceTable, SymbolBars};
use crate::ports::data_port::DataPort;
use chrono::NaiveDate;
use std::collections::HashSet;
use tracing::info;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum UniverseError {
    #[error("empty token in symbol list")]
    EmptyToken,

    #[error("duplicate symbol: {0}")]
    DuplicateSymbol(String),
}

impl From<UniverseError> for TradesimError {
    fn from(err: UniverseError) -> Self {
        TradesimError::ConfigInvalid {
            section: "data".to_string(),
            key: "symbols".to_string(),
            reason: err.to_string(),
        }
    }
}

/// Canonical form of a symbol: trimmed and uppercased.
pub fn normalize_symbol(raw: &str) -> String {
    raw.trim().to_uppercase()
}

/// Parse a comma-separated symbol list, preserving order.
pub fn parse_symbols(input: &str) -> Result<Vec<String>, UniverseError> {
    let mut symbols = Vec::new();
    let mut seen = HashSet::new();

    for token in input.split(',') {
        let symbol = normalize_symbol(token);
        if symbol.is_empty() {
            return Err(UniverseError::EmptyToken);
        }
        if !seen.insert(symbol.clone()) {
            return Err(UniverseError::DuplicateSymbol(symbol));
        }
        symbols.push(symbol);
    }

    Ok(symbols)
}

/// Fetch bars for every symbol in the date range.
///
/// A symbol with no bars in range fails the whole load; the universe is
/// fixed, so there is no partial fallback.
pub fn load_universe(
    data_port: &dyn DataPort,
    symbols: &[String],
    start_date: Option<NaiveDate>,
    end_date: Option<NaiveDate>,
) -> Result<Vec<SymbolBars>, TradesimError> {
    let mut series = Vec::with_capacity(symbols.len());

    for symbol in symbols {
        let bars = data_port.fetch_bars(symbol, start_date, end_date)?;
        if bars.is_empty() {
            return Err(TradesimError::NoData {
                symbol: symbol.clone(),
            });
        }
        info!(symbol = %symbol, bars = bars.len(), "loaded prices");
        series.push(SymbolBars::new(symbol.clone(), bars));
    }

    Ok(series)
}

/// Load the universe and align it into a close-price table.
pub fn load_price_table(
    data_port: &dyn DataPort,
    symbols: &[String],
    start_date: Option<NaiveDate>,
    end_date: Option<NaiveDate>,
) -> Result<PriceTable, TradesimError> {
    let series = load_universe(data_port, symbols, start_date, end_date)?;
    PriceTable::from_bars(&series)
}
