//! Engine configuration.

use serde::{Deserialize, Serialize};

use crate::domain::Timeframe;

/// Capital, friction and annualization for a backtest run.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub initial_capital: f64,
    /// Fraction of traded notional charged per fill, e.g. 0.001 = 10 bps.
    pub commission: f64,
    /// Bars per year used to annualize Sharpe and Sortino.
    pub bars_per_year: f64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            initial_capital: 10_000.0,
            commission: 0.001,
            bars_per_year: 252.0,
        }
    }
}

impl EngineConfig {
    pub fn new(initial_capital: f64, commission: f64) -> Self {
        Self {
            initial_capital,
            commission,
            ..Self::default()
        }
    }

    /// Annualize for bars of `timeframe`.
    pub fn for_timeframe(mut self, timeframe: Timeframe) -> Self {
        self.bars_per_year = timeframe.bars_per_year();
        self
    }

    pub fn validate(&self) -> Result<(), String> {
        if !(self.initial_capital.is_finite() && self.initial_capital > 0.0) {
            return Err(format!(
                "initial_capital must be positive, got {}",
                self.initial_capital
            ));
        }
        if !(0.0..1.0).contains(&self.commission) {
            return Err(format!(
                "commission must be in [0, 1), got {}",
                self.commission
            ));
        }
        if !(self.bars_per_year.is_finite() && self.bars_per_year > 0.0) {
            return Err(format!(
                "bars_per_year must be positive, got {}",
                self.bars_per_year
            ));
        }
        Ok(())
    }
}
