//! Close-price table over a fixed instrument universe.
//!
//! Rows are dates in strictly ascending order; columns are instruments in
//! universe order. The universe is fixed when the table is built and every
//! instrument has a close on every date.

use crate::domain::error::TradesimError;
use crate::domain::ohlcv::OhlcvBar;
use chrono::NaiveDate;
use std::collections::{BTreeSet, HashMap, HashSet};

/// Bars for one instrument with a date lookup.
#[derive(Debug, Clone)]
pub struct SymbolBars {
    pub symbol: String,
    pub bars: Vec<OhlcvBar>,
    pub date_index: HashMap<NaiveDate, usize>,
}

impl SymbolBars {
    pub fn new(symbol: String, bars: Vec<OhlcvBar>) -> Self {
        let date_index = bars
            .iter()
            .enumerate()
            .map(|(i, bar)| (bar.date, i))
            .collect();
        Self {
            symbol,
            bars,
            date_index,
        }
    }

    pub fn bar_count(&self) -> usize {
        self.bars.len()
    }

    pub fn get_bar(&self, date: NaiveDate) -> Option<&OhlcvBar> {
        self.date_index.get(&date).map(|&i| &self.bars[i])
    }
}

/// Sorted union of all dates across instruments.
pub fn build_unified_timeline(series: &[SymbolBars]) -> Vec<NaiveDate> {
    let unique_dates: BTreeSet<NaiveDate> = series
        .iter()
        .flat_map(|s| s.bars.iter().map(|bar| bar.date))
        .collect();
    unique_dates.into_iter().collect()
}

#[derive(Debug, Clone, PartialEq)]
pub struct PriceTable {
    dates: Vec<NaiveDate>,
    symbols: Vec<String>,
    closes: Vec<Vec<f64>>,
    symbol_index: HashMap<String, usize>,
}

impl PriceTable {
    /// Build a table from a date index, the universe and one close row per date.
    pub fn new(
        dates: Vec<NaiveDate>,
        symbols: Vec<String>,
        closes: Vec<Vec<f64>>,
    ) -> Result<Self, TradesimError> {
        if dates.len() != closes.len() {
            return Err(TradesimError::PriceTable {
                reason: format!("{} dates but {} close rows", dates.len(), closes.len()),
            });
        }
        if let Some(w) = dates.windows(2).find(|w| w[0] >= w[1]) {
            return Err(TradesimError::PriceTable {
                reason: format!("dates not strictly ascending at {}", w[1]),
            });
        }
        if let Some((date, row)) = dates
            .iter()
            .zip(&closes)
            .find(|(_, row)| row.len() != symbols.len())
        {
            return Err(TradesimError::PriceTable {
                reason: format!(
                    "row for {date} has {} closes, universe has {} instruments",
                    row.len(),
                    symbols.len()
                ),
            });
        }

        let mut seen = HashSet::new();
        for symbol in &symbols {
            if !seen.insert(symbol.as_str()) {
                return Err(TradesimError::PriceTable {
                    reason: format!("duplicate instrument {symbol}"),
                });
            }
        }

        let symbol_index = symbols
            .iter()
            .enumerate()
            .map(|(i, s)| (s.clone(), i))
            .collect();

        Ok(Self {
            dates,
            symbols,
            closes,
            symbol_index,
        })
    }

    /// Align per-instrument bars on the unified timeline.
    ///
    /// Every instrument must have a bar on every date of the timeline.
    pub fn from_bars(series: &[SymbolBars]) -> Result<Self, TradesimError> {
        let timeline = build_unified_timeline(series);
        let symbols: Vec<String> = series.iter().map(|s| s.symbol.clone()).collect();

        let mut closes = Vec::with_capacity(timeline.len());
        for &date in &timeline {
            let row = series
                .iter()
                .map(|s| {
                    s.get_bar(date)
                        .map(|bar| bar.close)
                        .ok_or_else(|| TradesimError::MissingPrice {
                            symbol: s.symbol.clone(),
                            date,
                        })
                })
                .collect::<Result<Vec<f64>, _>>()?;
            closes.push(row);
        }

        Self::new(timeline, symbols, closes)
    }

    pub fn len(&self) -> usize {
        self.dates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dates.is_empty()
    }

    pub fn dates(&self) -> &[NaiveDate] {
        &self.dates
    }

    /// Instrument universe in slot order.
    pub fn symbols(&self) -> &[String] {
        &self.symbols
    }

    pub fn slot(&self, symbol: &str) -> Option<usize> {
        self.symbol_index.get(symbol).copied()
    }

    /// Closes for one step, aligned to [`Self::symbols`].
    pub fn close_row(&self, step: usize) -> &[f64] {
        &self.closes[step]
    }

    pub fn close(&self, step: usize, symbol: &str) -> Option<f64> {
        self.slot(symbol).map(|slot| self.closes[step][slot])
    }

    /// Rows strictly before `step`.
    pub fn history(&self, step: usize) -> PriceHistory<'_> {
        let end = step.min(self.dates.len());
        PriceHistory {
            table: self,
            end,
        }
    }
}

/// Read-only window over the rows preceding the current step.
#[derive(Debug, Clone, Copy)]
pub struct PriceHistory<'a> {
    table: &'a PriceTable,
    end: usize,
}

impl<'a> PriceHistory<'a> {
    pub fn len(&self) -> usize {
        self.end
    }

    pub fn is_empty(&self) -> bool {
        self.end == 0
    }

    pub fn symbols(&self) -> &'a [String] {
        self.table.symbols()
    }

    pub fn dates(&self) -> &'a [NaiveDate] {
        &self.table.dates[..self.end]
    }

    pub fn row(&self, i: usize) -> Option<&'a [f64]> {
        if i < self.end {
            Some(self.table.close_row(i))
        } else {
            None
        }
    }

    /// Close series for one instrument.
    pub fn closes(&self, symbol: &str) -> Option<Vec<f64>> {
        let slot = self.table.slot(symbol)?;
        Some(
            self.table.closes[..self.end]
                .iter()
                .map(|row| row[slot])
                .collect(),
        )
    }

    pub fn last_close(&self, symbol: &str) -> Option<f64> {
        let slot = self.table.slot(symbol)?;
        self.end
            .checked_sub(1)
            .map(|last| self.table.closes[last][slot])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_bar(symbol: &str, date: &str, close: f64) -> OhlcvBar {
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

    fn d(date: &str) -> NaiveDate {
        NaiveDate::parse_from_str(date, "%Y-%m-%d").unwrap()
    }

    fn sample_table() -> PriceTable {
        PriceTable::new(
            vec![d("2024-01-01"), d("2024-01-02"), d("2024-01-03")],
            vec!["AAA".into(), "BBB".into()],
            vec![vec![10.0, 20.0], vec![11.0, 21.0], vec![12.0, 22.0]],
        )
        .unwrap()
    }

    #[test]
    fn symbol_bars_builds_date_index() {
        let bars = vec![
            make_bar("AAA", "2024-01-01", 100.0),
            make_bar("AAA", "2024-01-02", 101.0),
        ];
        let sb = SymbolBars::new("AAA".into(), bars);

        assert_eq!(sb.bar_count(), 2);
        assert_eq!(sb.date_index.get(&d("2024-01-02")), Some(&1));
        assert!(sb.get_bar(d("2024-01-05")).is_none());
    }

    #[test]
    fn unified_timeline_merges_and_sorts() {
        let aaa = SymbolBars::new(
            "AAA".into(),
            vec![
                make_bar("AAA", "2024-01-02", 100.0),
                make_bar("AAA", "2024-01-05", 101.0),
            ],
        );
        let bbb = SymbolBars::new(
            "BBB".into(),
            vec![
                make_bar("BBB", "2024-01-01", 50.0),
                make_bar("BBB", "2024-01-02", 51.0),
            ],
        );

        let timeline = build_unified_timeline(&[aaa, bbb]);
        assert_eq!(
            timeline,
            vec![d("2024-01-01"), d("2024-01-02"), d("2024-01-05")]
        );
    }

    #[test]
    fn unified_timeline_empty() {
        assert!(build_unified_timeline(&[]).is_empty());
    }

    #[test]
    fn from_bars_aligns_closes_to_universe() {
        let aaa = SymbolBars::new(
            "AAA".into(),
            vec![
                make_bar("AAA", "2024-01-02", 11.0),
                make_bar("AAA", "2024-01-01", 10.0),
            ],
        );
        let bbb = SymbolBars::new(
            "BBB".into(),
            vec![
                make_bar("BBB", "2024-01-01", 20.0),
                make_bar("BBB", "2024-01-02", 21.0),
            ],
        );

        let table = PriceTable::from_bars(&[aaa, bbb]).unwrap();
        assert_eq!(table.len(), 2);
        assert_eq!(table.symbols(), &["AAA".to_string(), "BBB".to_string()]);
        assert_eq!(table.close_row(0), &[10.0, 20.0]);
        assert_eq!(table.close(1, "BBB"), Some(21.0));
    }

    #[test]
    fn from_bars_rejects_gap() {
        let aaa = SymbolBars::new(
            "AAA".into(),
            vec![
                make_bar("AAA", "2024-01-01", 10.0),
                make_bar("AAA", "2024-01-02", 11.0),
            ],
        );
        let bbb = SymbolBars::new("BBB".into(), vec![make_bar("BBB", "2024-01-01", 20.0)]);

        let err = PriceTable::from_bars(&[aaa, bbb]).unwrap_err();
        assert!(matches!(
            err,
            TradesimError::MissingPrice { ref symbol, date } if symbol == "BBB" && date == d("2024-01-02")
        ));
    }

    #[test]
    fn new_rejects_unsorted_dates() {
        let err = PriceTable::new(
            vec![d("2024-01-02"), d("2024-01-01")],
            vec!["AAA".into()],
            vec![vec![1.0], vec![2.0]],
        )
        .unwrap_err();
        assert!(matches!(err, TradesimError::PriceTable { .. }));
    }

    #[test]
    fn new_rejects_duplicate_dates() {
        let err = PriceTable::new(
            vec![d("2024-01-01"), d("2024-01-01")],
            vec!["AAA".into()],
            vec![vec![1.0], vec![2.0]],
        )
        .unwrap_err();
        assert!(matches!(err, TradesimError::PriceTable { .. }));
    }

    #[test]
    fn new_rejects_ragged_rows() {
        let err = PriceTable::new(
            vec![d("2024-01-01")],
            vec!["AAA".into(), "BBB".into()],
            vec![vec![1.0]],
        )
        .unwrap_err();
        assert!(matches!(err, TradesimError::PriceTable { .. }));
    }

    #[test]
    fn new_rejects_duplicate_symbols() {
        let err = PriceTable::new(
            vec![d("2024-01-01")],
            vec!["AAA".into(), "AAA".into()],
            vec![vec![1.0, 2.0]],
        )
        .unwrap_err();
        assert!(matches!(err, TradesimError::PriceTable { .. }));
    }

    #[test]
    fn close_unknown_symbol_is_none() {
        let table = sample_table();
        assert_eq!(table.close(0, "ZZZ"), None);
        assert_eq!(table.slot("ZZZ"), None);
    }

    #[test]
    fn history_excludes_current_step() {
        let table = sample_table();

        let first = table.history(0);
        assert!(first.is_empty());
        assert_eq!(first.last_close("AAA"), None);

        let hist = table.history(2);
        assert_eq!(hist.len(), 2);
        assert_eq!(hist.dates(), &[d("2024-01-01"), d("2024-01-02")]);
        assert_eq!(hist.closes("BBB"), Some(vec![20.0, 21.0]));
        assert_eq!(hist.last_close("AAA"), Some(11.0));
        assert_eq!(hist.row(1), Some(&[11.0, 21.0][..]));
        assert_eq!(hist.row(2), None);
    }
}
