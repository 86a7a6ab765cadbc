use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::EngineError;
use crate::refresh::{RefreshConfig, RefreshMode};

/// Trailing bars loaded ahead of the last persisted row on an incremental
/// refresh. Exceeds the SMA-200 window with margin.
pub const DEFAULT_LOOKBACK: usize = 210;

/// Engine settings, read from TOML. Every field has a default so an empty
/// file is a valid configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EngineConfig {
    pub lookback: usize,
    pub include_weekly: bool,
    pub include_monthly: bool,
    pub scanner: ScannerSettings,
}

/// Horizons, in daily bars, for the forward returns attached to scan matches.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ScannerSettings {
    pub forward_days: Vec<usize>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            lookback: DEFAULT_LOOKBACK,
            include_weekly: true,
            include_monthly: true,
            scanner: ScannerSettings::default(),
        }
    }
}

impl Default for ScannerSettings {
    fn default() -> Self {
        Self { forward_days: vec![5, 10] }
    }
}

impl EngineConfig {
    pub fn from_toml_str(s: &str) -> Result<Self, EngineError> {
        let config: Self = toml::from_str(s).map_err(|e| EngineError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self, EngineError> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| EngineError::Config(format!("{}: {}", path.display(), e)))?;
        Self::from_toml_str(&text)
    }

    pub fn validate(&self) -> Result<(), EngineError> {
        if self.lookback == 0 {
            return Err(EngineError::Config("lookback must be at least 1".into()));
        }
        if self.scanner.forward_days.contains(&0) {
            return Err(EngineError::Config("forward_days entries must be positive".into()));
        }
        Ok(())
    }

    pub fn refresh_config(&self, mode: RefreshMode) -> RefreshConfig {
        RefreshConfig {
            mode,
            lookback: self.lookback,
            include_weekly: self.include_weekly,
            include_monthly: self.include_monthly,
        }
    }
}
