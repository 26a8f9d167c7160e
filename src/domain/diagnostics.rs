//! Non-fatal events raised during a run.
//!
//! Diagnostics are collected per run and returned with the output tables so
//! callers can inspect them without capturing log output. Each one is also
//! mirrored to `tracing` at warn level when recorded.

use chrono::NaiveDate;
use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub enum Diagnostic {
    /// A transaction left the cash balance below zero.
    NegativeCash {
        date: NaiveDate,
        symbol: String,
        cash: f64,
    },
    /// The prior valuation was zero so the period return is not finite.
    NonFiniteReturn { value: f64, previous_valuation: f64 },
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Diagnostic::NegativeCash { date, symbol, cash } => write!(
                f,
                "transaction in {symbol} on {date} dropped portfolio cash to ${cash:.2}"
            ),
            Diagnostic::NonFiniteReturn {
                value,
                previous_valuation,
            } => write!(
                f,
                "period return is {value} (previous valuation {previous_valuation})"
            ),
        }
    }
}

/// Run-scoped collector.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Diagnostics {
    events: Vec<Diagnostic>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, event: Diagnostic) {
        tracing::warn!("{event}");
        self.events.push(event);
    }

    pub fn events(&self) -> &[Diagnostic] {
        &self.events
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn negative_cash_count(&self) -> usize {
        self.events
            .iter()
            .filter(|e| matches!(e, Diagnostic::NegativeCash { .. }))
            .count()
    }

    pub fn into_vec(self) -> Vec<Diagnostic> {
        self.events
    }
}
