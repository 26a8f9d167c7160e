//! Domain error types.

use chrono::NaiveDate;

/// Top-level error type for tradesim.
#[derive(Debug, thiserror::Error)]
pub enum TradesimError {
    #[error("config parse error in {file}: {reason}")]
    ConfigParse { file: String, reason: String },

    #[error("missing config key [{section}] {key}")]
    ConfigMissing { section: String, key: String },

    #[error("invalid config value [{section}] {key}: {reason}")]
    ConfigInvalid {
        section: String,
        key: String,
        reason: String,
    },

    #[error("price data error: {reason}")]
    Data { reason: String },

    #[error("no price data for {symbol}")]
    NoData { symbol: String },

    #[error("missing close price for {symbol} on {date}")]
    MissingPrice { symbol: String, date: NaiveDate },

    #[error("malformed price table: {reason}")]
    PriceTable { reason: String },

    #[error("schedule error in {file}: {reason}")]
    Schedule { file: String, reason: String },

    #[error("symbol {symbol} is not part of the instrument universe")]
    UnknownSymbol { symbol: String },

    #[error("strategy returned no transaction list on {date}")]
    StrategyReturnedNothing { date: NaiveDate },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl TradesimError {
    /// Process exit status for this error family.
    pub fn exit_status(&self) -> u8 {
        match self {
            TradesimError::Io(_) => 1,
            TradesimError::ConfigParse { .. }
            | TradesimError::ConfigMissing { .. }
            | TradesimError::ConfigInvalid { .. } => 2,
            TradesimError::Data { .. }
            | TradesimError::NoData { .. }
            | TradesimError::MissingPrice { .. }
            | TradesimError::PriceTable { .. } => 3,
            TradesimError::Schedule { .. } => 4,
            TradesimError::UnknownSymbol { .. }
            | TradesimError::StrategyReturnedNothing { .. } => 5,
        }
    }
}

impl From<&TradesimError> for std::process::ExitCode {
    fn from(err: &TradesimError) -> Self {
        std::process::ExitCode::from(err.exit_status())
    }
}
