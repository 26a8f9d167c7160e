//! Portfolio state and accounting.
//!
//! Positions are signed share counts held in slots fixed at construction
//! from the instrument universe. Cash moves by the transaction notional
//! scaled by a symmetric basis-point fee: buys pay `1 + bps/10000` times the
//! notional, sells receive `1 - bps/10000` times it.

use std::collections::HashMap;

use super::diagnostics::{Diagnostic, Diagnostics};
use super::error::TradesimError;
use super::transaction::Transaction;

const BPS_PER_UNIT: f64 = 10_000.0;

/// Read-only queries over portfolio state.
///
/// Transaction sources see the portfolio through this trait only; the
/// simulation loop is the sole owner of mutation.
pub trait PortfolioView {
    fn cash(&self) -> f64;

    /// Universe in slot order.
    fn symbols(&self) -> &[String];

    /// Signed positions in slot order.
    fn positions(&self) -> &[f64];

    fn position(&self, symbol: &str) -> Result<f64, TradesimError>;

    fn avg_cost(&self, symbol: &str) -> Result<f64, TradesimError>;
}

#[derive(Debug, Clone, PartialEq)]
pub struct Portfolio {
    cash: f64,
    commission_bps: f64,
    v_last: f64,
    symbols: Vec<String>,
    symbol_to_slot: HashMap<String, usize>,
    positions: Vec<f64>,
    avg_cost: Vec<f64>,
    diagnostics: Diagnostics,
}

fn sign(x: f64) -> i8 {
    if x > 0.0 {
        1
    } else if x < 0.0 {
        -1
    } else {
        0
    }
}

impl Portfolio {
    pub fn new(symbols: &[String], cash: f64, commission_bps: f64) -> Self {
        let symbol_to_slot = symbols
            .iter()
            .enumerate()
            .map(|(slot, symbol)| (symbol.clone(), slot))
            .collect();
        Portfolio {
            cash,
            commission_bps,
            v_last: cash,
            symbols: symbols.to_vec(),
            symbol_to_slot,
            positions: vec![0.0; symbols.len()],
            avg_cost: vec![0.0; symbols.len()],
            diagnostics: Diagnostics::new(),
        }
    }

    pub fn slot(&self, symbol: &str) -> Result<usize, TradesimError> {
        self.symbol_to_slot
            .get(symbol)
            .copied()
            .ok_or_else(|| TradesimError::UnknownSymbol {
                symbol: symbol.to_string(),
            })
    }

    pub fn commission_bps(&self) -> f64 {
        self.commission_bps
    }

    /// Valuation recorded by the last [`Self::compute_return`] call.
    pub fn last_valuation(&self) -> f64 {
        self.v_last
    }

    pub fn diagnostics(&self) -> &Diagnostics {
        &self.diagnostics
    }

    pub fn take_diagnostics(&mut self) -> Diagnostics {
        std::mem::take(&mut self.diagnostics)
    }

    /// Apply one transaction at `price`.
    ///
    /// Average cost after the trade:
    /// - position closed out exactly: 0
    /// - sign changed (including opening from flat): the notional of this
    ///   transaction, not divided by the new position
    /// - otherwise: `(old_pos * old_avg + notional) / new_pos`
    pub fn execute(&mut self, tx: &Transaction, price: f64) -> Result<(), TradesimError> {
        let slot = self.slot(tx.symbol())?;
        let multiplier = tx.side().multiplier();
        let signed_qty = tx.signed_quantity();
        let notional = price * signed_qty;
        let fee_rate = 1.0 + multiplier * (self.commission_bps / BPS_PER_UNIT);

        self.cash -= notional * fee_rate;
        if self.cash < 0.0 {
            self.diagnostics.record(Diagnostic::NegativeCash {
                date: tx.date(),
                symbol: tx.symbol().to_string(),
                cash: self.cash,
            });
        }

        let old_pos = self.positions[slot];
        let new_pos = old_pos + signed_qty;

        self.avg_cost[slot] = if sign(new_pos) == 0 {
            0.0
        } else if sign(old_pos) != sign(new_pos) {
            notional
        } else {
            (old_pos * self.avg_cost[slot] + notional) / new_pos
        };
        self.positions[slot] = new_pos;

        tracing::debug!(
            symbol = tx.symbol(),
            price,
            signed_qty,
            position = new_pos,
            cash = self.cash,
            "executed {tx}"
        );
        Ok(())
    }

    pub fn inst_pos(&self, symbol: &str) -> Result<f64, TradesimError> {
        Ok(self.positions[self.slot(symbol)?])
    }

    /// All positions in slot order followed by cash.
    pub fn pos(&self) -> Vec<f64> {
        let mut snapshot = Vec::with_capacity(self.positions.len() + 1);
        snapshot.extend_from_slice(&self.positions);
        snapshot.push(self.cash);
        snapshot
    }

    /// Mark to `close` (aligned to slots) and return `v / v_last - 1`.
    ///
    /// Must be called once per step, before that step's transactions.
    /// A zero previous valuation yields a non-finite return, which is
    /// returned as-is and recorded as a diagnostic.
    pub fn compute_return(&mut self, close: &[f64]) -> f64 {
        let v = self.valuation(close);
        let r = v / self.v_last - 1.0;
        if !r.is_finite() {
            self.diagnostics.record(Diagnostic::NonFiniteReturn {
                value: r,
                previous_valuation: self.v_last,
            });
        }
        self.v_last = v;
        r
    }

    /// `dot(positions, close) + cash`
    pub fn valuation(&self, close: &[f64]) -> f64 {
        let holdings: f64 = self
            .positions
            .iter()
            .zip(close)
            .map(|(pos, price)| pos * price)
            .sum();
        holdings + self.cash
    }
}

impl PortfolioView for Portfolio {
    fn cash(&self) -> f64 {
        self.cash
    }

    fn symbols(&self) -> &[String] {
        &self.symbols
    }

    fn positions(&self) -> &[f64] {
        &self.positions
    }

    fn position(&self, symbol: &str) -> Result<f64, TradesimError> {
        self.inst_pos(symbol)
    }

    fn avg_cost(&self, symbol: &str) -> Result<f64, TradesimError> {
        Ok(self.avg_cost[self.slot(symbol)?])
    }
}
