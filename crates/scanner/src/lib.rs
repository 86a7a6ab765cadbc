pub mod presets;
pub mod rules;
pub mod scan;
pub mod summary;

use thiserror::Error;
use trendscan_core::DataError;

pub use rules::{AsOfView, CmpOp, Condition, Field, Frame, Operand, RuleSet};
pub use scan::{scan_as_of, scan_range, ForwardReturn, ScanMatch};
pub use summary::{HorizonStats, ScanSummary};

#[derive(Error, Debug)]
pub enum ScanError {
    #[error("invalid rule set: {0}")]
    InvalidRules(String),

    #[error("unknown preset '{0}'")]
    UnknownPreset(String),

    #[error("invalid scan range: {from} is after {to}")]
    InvalidRange { from: chrono::NaiveDate, to: chrono::NaiveDate },

    #[error(transparent)]
    Data(#[from] DataError),
}

/// Resolve a built-in scanner by name.
pub fn preset(name: &str) -> Result<RuleSet, ScanError> {
    presets::preset(name).ok_or_else(|| ScanError::UnknownPreset(name.to_string()))
}
