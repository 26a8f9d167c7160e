//! Per-step recording of executions, holdings and returns.

use chrono::NaiveDate;

use super::diagnostics::{Diagnostic, Diagnostics};
use super::error::TradesimError;
use super::portfolio::Portfolio;
use super::transaction::Transaction;

/// One executed transaction.
///
/// `amount` is the signed share count; `txn_dollars` is the signed cash flow
/// before commission (negative for buys).
#[derive(Debug, Clone, PartialEq)]
pub struct LedgerEntry {
    pub date: NaiveDate,
    pub amount: f64,
    pub price: f64,
    pub sid: usize,
    pub symbol: String,
    pub txn_dollars: f64,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct TransactionLedger {
    entries: Vec<LedgerEntry>,
}

impl TransactionLedger {
    pub const COLUMNS: [&'static str; 5] = ["amount", "price", "sid", "symbol", "txn_dollars"];

    pub fn entries(&self) -> &[LedgerEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn for_symbol<'a>(&'a self, symbol: &'a str) -> impl Iterator<Item = &'a LedgerEntry> + 'a {
        self.entries.iter().filter(move |e| e.symbol == symbol)
    }
}

/// Holdings after each step: one column per instrument, then `cash`.
#[derive(Debug, Clone, PartialEq)]
pub struct PositionTable {
    index: Vec<NaiveDate>,
    columns: Vec<String>,
    rows: Vec<Vec<f64>>,
}

impl PositionTable {
    pub const CASH_COLUMN: &'static str = "cash";

    pub fn index(&self) -> &[NaiveDate] {
        &self.index
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<f64>] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column(&self, name: &str) -> Option<Vec<f64>> {
        let col = self.columns.iter().position(|c| c == name)?;
        Some(self.rows.iter().map(|row| row[col]).collect())
    }

    pub fn cash(&self) -> Vec<f64> {
        self.rows
            .iter()
            .map(|row| row.last().copied().unwrap_or_default())
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ReturnSeries {
    index: Vec<NaiveDate>,
    values: Vec<f64>,
}

impl ReturnSeries {
    pub fn new(index: Vec<NaiveDate>, values: Vec<f64>) -> Self {
        Self { index, values }
    }

    pub fn index(&self) -> &[NaiveDate] {
        &self.index
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (NaiveDate, f64)> + '_ {
        self.index.iter().copied().zip(self.values.iter().copied())
    }
}

/// Finished run: ledger, holdings and returns, plus non-fatal diagnostics.
#[derive(Debug, Clone, PartialEq)]
pub struct SimOutput {
    pub transactions: TransactionLedger,
    pub positions: PositionTable,
    pub returns: ReturnSeries,
    pub diagnostics: Vec<Diagnostic>,
}

/// Append-only accumulator, one per run.
#[derive(Debug, Clone)]
pub struct SimResult {
    index: Vec<NaiveDate>,
    symbols: Vec<String>,
    txns: Vec<LedgerEntry>,
    positions: Vec<Vec<f64>>,
    returns: Vec<f64>,
}

impl SimResult {
    /// `index` is the date sequence of the price table; one `update` call
    /// is expected per date.
    pub fn new(index: Vec<NaiveDate>, symbols: Vec<String>) -> Self {
        let steps = index.len();
        Self {
            index,
            symbols,
            txns: Vec::new(),
            positions: Vec::with_capacity(steps),
            returns: Vec::with_capacity(steps),
        }
    }

    /// Record one step.
    ///
    /// `period_return` must already have been computed for this step; the
    /// transactions are then executed in order at this step's closes and the
    /// resulting holdings snapshotted.
    pub fn update(
        &mut self,
        date: NaiveDate,
        period_return: f64,
        close: &[f64],
        txns: Vec<Transaction>,
        portfolio: &mut Portfolio,
    ) -> Result<(), TradesimError> {
        self.returns.push(period_return);
        for tx in txns {
            let sid = portfolio.slot(tx.symbol())?;
            let price = close.get(sid).copied().ok_or_else(|| TradesimError::PriceTable {
                reason: format!(
                    "close row has {} prices, no slot {} for {}",
                    close.len(),
                    sid,
                    tx.symbol()
                ),
            })?;
            portfolio.execute(&tx, price)?;

            let amount = tx.signed_quantity();
            self.txns.push(LedgerEntry {
                date,
                amount,
                price,
                sid,
                symbol: tx.symbol().to_string(),
                txn_dollars: -amount * price,
            });
        }
        self.positions.push(portfolio.pos());
        Ok(())
    }

    pub fn steps_recorded(&self) -> usize {
        self.returns.len()
    }

    pub fn finalize(self, diagnostics: Diagnostics) -> SimOutput {
        let mut columns = self.symbols;
        columns.push(PositionTable::CASH_COLUMN.to_string());

        SimOutput {
            transactions: TransactionLedger { entries: self.txns },
            positions: PositionTable {
                index: self.index.clone(),
                columns,
                rows: self.positions,
            },
            returns: ReturnSeries::new(self.index, self.returns),
            diagnostics: diagnostics.into_vec(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, day).unwrap()
    }

    fn symbols() -> Vec<String> {
        vec!["AAA".into(), "BBB".into()]
    }

    #[test]
    fn update_records_return_execution_and_snapshot() {
        let mut pf = Portfolio::new(&symbols(), 1_000.0, 0.0);
        let mut result = SimResult::new(vec![d(1)], symbols());

        let close = [10.0, 20.0];
        let r = pf.compute_return(&close);
        result
            .update(
                d(1),
                r,
                &close,
                vec![
                    Transaction::buy(d(1), "BBB", 2.0),
                    Transaction::sell(d(1), "AAA", 1.0),
                ],
                &mut pf,
            )
            .unwrap();
        assert_eq!(result.steps_recorded(), 1);

        let out = result.finalize(pf.take_diagnostics());
        assert_eq!(out.returns.values(), &[0.0]);
        assert_eq!(out.transactions.len(), 2);

        let first = &out.transactions.entries()[0];
        assert_eq!(first.symbol, "BBB");
        assert_eq!(first.sid, 1);
        assert_eq!(first.amount, 2.0);
        assert_eq!(first.price, 20.0);
        assert_eq!(first.txn_dollars, -40.0);
        assert_eq!(first.date, d(1));

        let second = &out.transactions.entries()[1];
        assert_eq!(second.amount, -1.0);
        assert_eq!(second.txn_dollars, 10.0);

        assert_eq!(out.positions.rows(), &[vec![-1.0, 2.0, 970.0]]);
    }

    #[test]
    fn update_rejects_unknown_symbol() {
        let mut pf = Portfolio::new(&symbols(), 1_000.0, 0.0);
        let mut result = SimResult::new(vec![d(1)], symbols());
        let err = result
            .update(
                d(1),
                0.0,
                &[1.0, 1.0],
                vec![Transaction::buy(d(1), "ZZZ", 1.0)],
                &mut pf,
            )
            .unwrap_err();
        assert!(matches!(err, TradesimError::UnknownSymbol { .. }));
    }

    #[test]
    fn update_rejects_short_close_row() {
        let mut pf = Portfolio::new(&symbols(), 1_000.0, 0.0);
        let mut result = SimResult::new(vec![d(1)], symbols());
        let err = result
            .update(
                d(1),
                0.0,
                &[1.0],
                vec![Transaction::buy(d(1), "BBB", 1.0)],
                &mut pf,
            )
            .unwrap_err();
        assert!(matches!(err, TradesimError::PriceTable { .. }));
        assert_eq!(pf.inst_pos("BBB").unwrap(), 0.0);
    }

    #[test]
    fn finalize_names_cash_column_last() {
        let mut pf = Portfolio::new(&symbols(), 50.0, 0.0);
        let mut result = SimResult::new(vec![d(1), d(2)], symbols());
        result.update(d(1), 0.0, &[1.0, 1.0], vec![], &mut pf).unwrap();
        result.update(d(2), 0.0, &[1.0, 1.0], vec![], &mut pf).unwrap();

        let out = result.finalize(Diagnostics::new());
        assert_eq!(out.positions.columns(), &["AAA", "BBB", "cash"]);
        assert_eq!(out.positions.index(), &[d(1), d(2)]);
        assert_eq!(out.positions.cash(), vec![50.0, 50.0]);
        assert_eq!(out.positions.column("AAA"), Some(vec![0.0, 0.0]));
        assert_eq!(out.positions.column("ZZZ"), None);
        assert_eq!(out.returns.index(), &[d(1), d(2)]);
    }

    #[test]
    fn empty_ledger_keeps_fixed_columns() {
        let result = SimResult::new(vec![], symbols());
        let out = result.finalize(Diagnostics::new());
        assert!(out.transactions.is_empty());
        assert_eq!(
            TransactionLedger::COLUMNS,
            ["amount", "price", "sid", "symbol", "txn_dollars"]
        );
        assert!(out.positions.is_empty());
        assert!(out.returns.is_empty());
    }

    #[test]
    fn ledger_filters_by_symbol() {
        let mut pf = Portfolio::new(&symbols(), 1_000.0, 0.0);
        let mut result = SimResult::new(vec![d(1)], symbols());
        result
            .update(
                d(1),
                0.0,
                &[1.0, 2.0],
                vec![
                    Transaction::buy(d(1), "AAA", 1.0),
                    Transaction::buy(d(1), "BBB", 1.0),
                    Transaction::buy(d(1), "AAA", 3.0),
                ],
                &mut pf,
            )
            .unwrap();
        let out = result.finalize(Diagnostics::new());
        let amounts: Vec<f64> = out.transactions.for_symbol("AAA").map(|e| e.amount).collect();
        assert_eq!(amounts, vec![1.0, 3.0]);
    }
}
