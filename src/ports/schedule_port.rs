//! Precomputed schedule port trait.

use crate::domain::error::TradesimError;
use crate::domain::source::{PositionSchedule, TradeSchedule};

pub trait SchedulePort {
    fn load_trades(&self) -> Result<TradeSchedule, TradesimError>;
    fn load_positions(&self) -> Result<PositionSchedule, TradesimError>;
}
