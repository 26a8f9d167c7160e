//! Price data access port trait.

use crate::domain::error::TradesimError;
use crate::domain::ohlcv::OhlcvBar;
use chrono::NaiveDate;

pub trait DataPort {
    /// Bars for `symbol` sorted by date, limited to the inclusive range when
    /// bounds are given.
    fn fetch_bars(
        &self,
        symbol: &str,
        start_date: Option<NaiveDate>,
        end_date: Option<NaiveDate>,
    ) -> Result<Vec<OhlcvBar>, TradesimError>;

    fn list_symbols(&self) -> Result<Vec<String>, TradesimError>;

    /// First date, last date and bar count, or `None` when there is no data.
    fn get_data_range(
        &self,
        symbol: &str,
    ) -> Result<Option<(NaiveDate, NaiveDate, usize)>, TradesimError> {
        let bars = self.fetch_bars(symbol, None, None)?;
        Ok(match (bars.first(), bars.last()) {
            (Some(first), Some(last)) => Some((first.date, last.date, bars.len())),
            _ => None,
        })
    }
}
