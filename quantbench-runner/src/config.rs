//! Runner configuration — engine, optimizer and simulator settings in one
//! TOML document.
//!
//! Every section and field is optional; omitted values take their defaults.
//!
//! ```toml
//! [engine]
//! initial_capital = 25000.0
//! commission = 0.0005
//!
//! [optimizer]
//! objective = "sortino_ratio"
//! failure_policy = "skip"
//! max_threads = 4
//!
//! [simulation]
//! n_trials = 500
//! seed = 42
//! ```

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

use quantbench_core::engine::EngineConfig;

use crate::monte_carlo::SimulationConfig;
use crate::optimizer::OptimizerSettings;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunnerConfig {
    pub engine: EngineConfig,
    pub optimizer: OptimizerSettings,
    pub simulation: SimulationConfig,
}

impl RunnerConfig {
    /// Load and validate a config file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&content)
    }

    /// Parse and validate a TOML document.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.engine.validate().map_err(ConfigError::Invalid)?;
        if self.optimizer.max_threads == Some(0) || self.simulation.max_threads == Some(0) {
            return Err(ConfigError::Invalid("max_threads must be at least 1".into()));
        }
        if self.simulation.n_trials == 0 {
            return Err(ConfigError::Invalid("simulation.n_trials must be at least 1".into()));
        }
        self.simulation
            .perturbation
            .validate()
            .map_err(|e| ConfigError::Invalid(e.to_string()))
    }
}
