//! Configuration validation.
//!
//! Checks every config field before a run so that bad input fails with a
//! config error instead of partway through the simulation.

use crate::domain::error::TradesimError;
use crate::domain::source::ScheduleKind;
use crate::domain::universe::parse_symbols;
use crate::ports::config_port::ConfigPort;
use chrono::NaiveDate;

pub const DEFAULT_INITIAL_CASH: f64 = 100_000.0;

pub fn validate_simulation_config(config: &dyn ConfigPort) -> Result<(), TradesimError> {
    validate_initial_cash(config)?;
    validate_commission(config)?;
    validate_risk_free_rate(config)?;
    validate_dates(config)?;
    validate_price_dir(config)?;
    validate_symbols(config)?;
    Ok(())
}

/// Schedule settings are only required when a run has no CLI overrides.
pub fn validate_schedule_config(config: &dyn ConfigPort) -> Result<(), TradesimError> {
    schedule_kind(config)?;
    match config.get_string("schedule", "path") {
        Some(_) => Ok(()),
        None => Err(TradesimError::ConfigMissing {
            section: "schedule".to_string(),
            key: "path".to_string(),
        }),
    }
}

pub fn schedule_kind(config: &dyn ConfigPort) -> Result<ScheduleKind, TradesimError> {
    let raw = config
        .get_string("schedule", "kind")
        .ok_or_else(|| TradesimError::ConfigMissing {
            section: "schedule".to_string(),
            key: "kind".to_string(),
        })?;
    raw.parse().map_err(|reason| TradesimError::ConfigInvalid {
        section: "schedule".to_string(),
        key: "kind".to_string(),
        reason,
    })
}

/// Parse an optional `YYYY-MM-DD` value.
pub fn parse_optional_date(
    config: &dyn ConfigPort,
    section: &str,
    key: &str,
) -> Result<Option<NaiveDate>, TradesimError> {
    config
        .get_string(section, key)
        .map(|s| {
            NaiveDate::parse_from_str(&s, "%Y-%m-%d").map_err(|_| TradesimError::ConfigInvalid {
                section: section.to_string(),
                key: key.to_string(),
                reason: format!("invalid {key} format, expected YYYY-MM-DD"),
            })
        })
        .transpose()
}

fn validate_initial_cash(config: &dyn ConfigPort) -> Result<(), TradesimError> {
    let value = config.get_double("simulation", "initial_cash", DEFAULT_INITIAL_CASH);
    if value <= 0.0 || !value.is_finite() {
        return Err(TradesimError::ConfigInvalid {
            section: "simulation".to_string(),
            key: "initial_cash".to_string(),
            reason: "initial_cash must be positive".to_string(),
        });
    }
    Ok(())
}

fn validate_commission(config: &dyn ConfigPort) -> Result<(), TradesimError> {
    let value = config.get_double("simulation", "commission_bps", 0.0);
    if value < 0.0 || !value.is_finite() {
        return Err(TradesimError::ConfigInvalid {
            section: "simulation".to_string(),
            key: "commission_bps".to_string(),
            reason: "commission_bps must be non-negative".to_string(),
        });
    }
    Ok(())
}

fn validate_risk_free_rate(config: &dyn ConfigPort) -> Result<(), TradesimError> {
    let value = config.get_double("simulation", "risk_free_rate", 0.0);
    if !(0.0..1.0).contains(&value) {
        return Err(TradesimError::ConfigInvalid {
            section: "simulation".to_string(),
            key: "risk_free_rate".to_string(),
            reason: "risk_free_rate must be between 0 and 1".to_string(),
        });
    }
    Ok(())
}

fn validate_dates(config: &dyn ConfigPort) -> Result<(), TradesimError> {
    let start = parse_optional_date(config, "simulation", "start_date")?;
    let end = parse_optional_date(config, "simulation", "end_date")?;

    if matches!((start, end), (Some(start), Some(end)) if start >= end) {
        return Err(TradesimError::ConfigInvalid {
            section: "simulation".to_string(),
            key: "start_date".to_string(),
            reason: "start_date must be before end_date".to_string(),
        });
    }
    Ok(())
}

fn validate_price_dir(config: &dyn ConfigPort) -> Result<(), TradesimError> {
    match config.get_string("data", "price_dir") {
        Some(_) => Ok(()),
        None => Err(TradesimError::ConfigMissing {
            section: "data".to_string(),
            key: "price_dir".to_string(),
        }),
    }
}

fn validate_symbols(config: &dyn ConfigPort) -> Result<(), TradesimError> {
    if let Some(raw) = config.get_string("data", "symbols") {
        parse_symbols(&raw)?;
    }
    Ok(())
}
