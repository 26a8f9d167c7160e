//! Core domain types and simulation logic.

pub mod config_validation;
pub mod diagnostics;
pub mod error;
pub mod metrics;
pub mod ohlcv;
pub mod portfolio;
pub mod price_table;
pub mod result;
pub mod simulation;
pub mod source;
pub mod transaction;
pub mod universe;
