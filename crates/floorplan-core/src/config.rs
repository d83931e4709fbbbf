//! Engine configuration.
//!
//! Every tunable lives here with its canonical default. Configuration is
//! validated up front; an invalid value is a programming mistake, not a
//! runtime condition.

use crate::area::AreaConfig;
use crate::grid::{DEFAULT_VIEWPORT_DEBOUNCE_MS, GridConfig};
use crate::history::DEFAULT_MAX_HISTORY_STATES;
use crate::straighten::StraightenOptions;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{field} must be positive, got {value}")]
    NonPositive { field: &'static str, value: f64 },
    #[error("{field} must not be negative, got {value}")]
    Negative { field: &'static str, value: f64 },
    #[error("{field} must be greater than zero")]
    Zero { field: &'static str },
    #[error("Invalid configuration: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("Failed to read configuration: {0}")]
    Io(#[from] std::io::Error),
}

/// History settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HistoryConfig {
    /// Maximum entries kept on each of the undo and redo stacks.
    pub max_states: usize,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            max_states: DEFAULT_MAX_HISTORY_STATES,
        }
    }
}

impl HistoryConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_states == 0 {
            return Err(ConfigError::Zero {
                field: "history.max_states",
            });
        }
        Ok(())
    }
}

/// Complete engine configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub grid: GridConfig,
    pub area: AreaConfig,
    pub history: HistoryConfig,
    pub straighten: StraightenOptions,
    /// Quiet period before a viewport change regenerates the grid.
    pub viewport_debounce_ms: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            grid: GridConfig::default(),
            area: AreaConfig::default(),
            history: HistoryConfig::default(),
            straighten: StraightenOptions::default(),
            viewport_debounce_ms: DEFAULT_VIEWPORT_DEBOUNCE_MS,
        }
    }
}

impl EngineConfig {
    /// Check every section.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.grid.validate()?;
        self.area.validate()?;
        self.history.validate()?;
        let threshold = self.straighten.threshold_degrees;
        if !(threshold.is_finite() && threshold >= 0.0) {
            return Err(ConfigError::Negative {
                field: "straighten.threshold_degrees",
                value: threshold,
            });
        }
        Ok(())
    }

    pub fn viewport_debounce(&self) -> Duration {
        Duration::from_millis(self.viewport_debounce_ms)
    }

    /// Parse and validate a JSON configuration. Missing fields use defaults.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Load a JSON configuration file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }
}
