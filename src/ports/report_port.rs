//! Output writing port trait.

use crate::domain::error::TradesimError;
use crate::domain::result::SimOutput;
use std::path::{Path, PathBuf};

/// Port for persisting the output tables of a run.
pub trait ReportPort {
    /// Write every table under `dir`, returning the files written.
    fn write(&self, output: &SimOutput, dir: &Path) -> Result<Vec<PathBuf>, TradesimError>;
}
