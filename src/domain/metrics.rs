//! Performance metrics over a finished run.
//!
//! Computed from the period return series; non-finite returns (from a zero
//! prior valuation) are skipped.

use super::result::{ReturnSeries, TransactionLedger};

const TRADING_DAYS_PER_YEAR: f64 = 252.0;

#[derive(Debug, Clone, PartialEq)]
pub struct Metrics {
    pub periods: usize,
    pub total_return: f64,
    pub annualized_return: f64,
    pub volatility: f64,
    pub sharpe_ratio: f64,
    pub sortino_ratio: f64,
    pub max_drawdown: f64,
    pub max_drawdown_duration: i64,
    pub best_period: f64,
    pub worst_period: f64,
    pub transactions: usize,
    pub traded_notional: f64,
}

impl Metrics {
    pub fn compute(returns: &ReturnSeries, ledger: &TransactionLedger, risk_free_rate: f64) -> Self {
        let finite: Vec<f64> = returns
            .values()
            .iter()
            .copied()
            .filter(|r| r.is_finite())
            .collect();

        let growth = growth_curve(&finite);
        let total_return = growth.last().copied().unwrap_or(1.0) - 1.0;

        let years = finite.len() as f64 / TRADING_DAYS_PER_YEAR;
        let annualized_return = if years > 0.0 && total_return > -1.0 {
            (1.0 + total_return).powf(1.0 / years) - 1.0
        } else {
            0.0
        };

        let (max_drawdown, max_drawdown_duration) = compute_drawdown(&growth);

        let daily_rf = risk_free_rate / TRADING_DAYS_PER_YEAR;
        let (volatility, sharpe_ratio, sortino_ratio) = compute_risk_adjusted(&finite, daily_rf);

        let best_period = finite.iter().copied().reduce(f64::max).unwrap_or(0.0);
        let worst_period = finite.iter().copied().reduce(f64::min).unwrap_or(0.0);

        let traded_notional = ledger.entries().iter().map(|e| e.txn_dollars.abs()).sum();

        Metrics {
            periods: returns.len(),
            total_return,
            annualized_return,
            volatility,
            sharpe_ratio,
            sortino_ratio,
            max_drawdown,
            max_drawdown_duration,
            best_period,
            worst_period,
            transactions: ledger.len(),
            traded_notional,
        }
    }
}

/// Compounded growth of one unit, starting at 1.0 before the first period.
fn growth_curve(returns: &[f64]) -> Vec<f64> {
    let mut curve = Vec::with_capacity(returns.len() + 1);
    let mut value = 1.0;
    curve.push(value);
    for r in returns {
        value *= 1.0 + r;
        curve.push(value);
    }
    curve
}

fn compute_drawdown(curve: &[f64]) -> (f64, i64) {
    let Some(&first) = curve.first() else {
        return (0.0, 0);
    };

    let mut peak = first;
    let mut max_dd = 0.0_f64;
    let mut max_dd_duration = 0i64;
    let mut current_dd_duration = 0i64;

    for &value in curve {
        if value > peak {
            peak = value;
            current_dd_duration = 0;
        } else if peak > 0.0 && value < peak {
            let dd = (peak - value) / peak;
            if dd > max_dd {
                max_dd = dd;
            }
            current_dd_duration += 1;
            if current_dd_duration > max_dd_duration {
                max_dd_duration = current_dd_duration;
            }
        }
    }

    (max_dd, max_dd_duration)
}

/// (annualized volatility, sharpe, sortino)
fn compute_risk_adjusted(returns: &[f64], daily_rf: f64) -> (f64, f64, f64) {
    if returns.len() < 2 {
        return (0.0, 0.0, 0.0);
    }

    let n = returns.len() as f64;
    let mean: f64 = returns.iter().sum::<f64>() / n;

    let variance: f64 = returns.iter().map(|r| (r - mean).powi(2)).sum::<f64>() / n;
    let stddev = variance.sqrt();
    let annual_factor = TRADING_DAYS_PER_YEAR.sqrt();

    let excess_return = mean - daily_rf;

    let sharpe = if stddev > 0.0 {
        (excess_return / stddev) * annual_factor
    } else {
        0.0
    };

    let downside: f64 = returns
        .iter()
        .filter(|&&r| r < daily_rf)
        .map(|&r| (r - daily_rf).powi(2))
        .sum();
    let downside_stddev = (downside / n).sqrt();

    let sortino = if downside_stddev > 0.0 {
        (excess_return / downside_stddev) * annual_factor
    } else {
        0.0
    };

    (stddev * annual_factor, sharpe, sortino)
}
