//! Trade instructions.

use chrono::NaiveDate;
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Side {
    Buy,
    Sell,
}

impl Side {
    /// +1 for buys, -1 for sells.
    pub const fn multiplier(self) -> f64 {
        match self {
            Side::Buy => 1.0,
            Side::Sell => -1.0,
        }
    }

    /// Side that moves a position by `delta`; zero counts as a buy.
    pub fn for_delta(delta: f64) -> Self {
        if delta >= 0.0 { Side::Buy } else { Side::Sell }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Buy => write!(f, "BUY"),
            Side::Sell => write!(f, "SELL"),
        }
    }
}

impl FromStr for Side {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "buy" | "b" => Ok(Side::Buy),
            "sell" | "s" => Ok(Side::Sell),
            other => Err(format!("unknown side '{other}', expected buy or sell")),
        }
    }
}

/// An intended trade. Quantity is an unsigned magnitude; direction comes
/// from the side.
#[derive(Debug, Clone, PartialEq)]
pub struct Transaction {
    date: NaiveDate,
    symbol: String,
    quantity: f64,
    side: Side,
}

impl Transaction {
    pub fn new(date: NaiveDate, symbol: impl Into<String>, quantity: f64, side: Side) -> Self {
        Transaction {
            date,
            symbol: symbol.into(),
            quantity: quantity.abs(),
            side,
        }
    }

    pub fn buy(date: NaiveDate, symbol: impl Into<String>, quantity: f64) -> Self {
        Self::new(date, symbol, quantity, Side::Buy)
    }

    pub fn sell(date: NaiveDate, symbol: impl Into<String>, quantity: f64) -> Self {
        Self::new(date, symbol, quantity, Side::Sell)
    }

    pub fn date(&self) -> NaiveDate {
        self.date
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn quantity(&self) -> f64 {
        self.quantity
    }

    pub fn side(&self) -> Side {
        self.side
    }

    /// quantity * side multiplier
    pub fn signed_quantity(&self) -> f64 {
        self.quantity * self.side.multiplier()
    }
}

impl fmt::Display for Transaction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} {} on {}",
            self.side, self.quantity, self.symbol, self.date
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, 15).unwrap()
    }

    #[test]
    fn side_multipliers() {
        assert_eq!(Side::Buy.multiplier(), 1.0);
        assert_eq!(Side::Sell.multiplier(), -1.0);
    }

    #[test]
    fn side_for_delta() {
        assert_eq!(Side::for_delta(5.0), Side::Buy);
        assert_eq!(Side::for_delta(0.0), Side::Buy);
        assert_eq!(Side::for_delta(-0.5), Side::Sell);
    }

    #[test]
    fn side_parses_case_insensitive() {
        assert_eq!("BUY".parse::<Side>().unwrap(), Side::Buy);
        assert_eq!(" sell ".parse::<Side>().unwrap(), Side::Sell);
        assert!("hold".parse::<Side>().is_err());
    }

    #[test]
    fn signed_quantity_buy() {
        let tx = Transaction::buy(date(), "AAA", 10.0);
        assert_eq!(tx.signed_quantity(), 10.0);
    }

    #[test]
    fn signed_quantity_sell() {
        let tx = Transaction::sell(date(), "AAA", 10.0);
        assert_eq!(tx.signed_quantity(), -10.0);
    }

    #[test]
    fn quantity_is_stored_as_magnitude() {
        let tx = Transaction::new(date(), "AAA", -3.0, Side::Sell);
        assert_eq!(tx.quantity(), 3.0);
        assert_eq!(tx.signed_quantity(), -3.0);
    }

    #[test]
    fn display() {
        let tx = Transaction::buy(date(), "AAA", 10.0);
        assert_eq!(tx.to_string(), "BUY 10 AAA on 2024-01-15");
    }
}
