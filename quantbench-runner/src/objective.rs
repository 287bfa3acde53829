//! Objective — which metric a grid search maximizes.

use quantbench_core::metrics::Metrics;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown objective '{0}' (expected one of: sharpe_ratio, sortino_ratio, max_drawdown, win_rate, profit_factor, avg_trade)")]
pub struct UnknownObjective(pub String);

/// Metric to optimize. Named after the [`Metrics`] field it reads.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Objective {
    #[default]
    #[serde(rename = "sharpe_ratio")]
    Sharpe,
    #[serde(rename = "sortino_ratio")]
    Sortino,
    MaxDrawdown,
    WinRate,
    ProfitFactor,
    AvgTrade,
}

impl Objective {
    pub const ALL: [Objective; 6] = [
        Objective::Sharpe,
        Objective::Sortino,
        Objective::MaxDrawdown,
        Objective::WinRate,
        Objective::ProfitFactor,
        Objective::AvgTrade,
    ];

    pub fn extract(&self, metrics: &Metrics) -> f64 {
        match self {
            Self::Sharpe => metrics.sharpe_ratio,
            Self::Sortino => metrics.sortino_ratio,
            Self::MaxDrawdown => metrics.max_drawdown,
            Self::WinRate => metrics.win_rate,
            Self::ProfitFactor => metrics.profit_factor,
            Self::AvgTrade => metrics.avg_trade,
        }
    }

    pub fn field_name(&self) -> &'static str {
        match self {
            Self::Sharpe => "sharpe_ratio",
            Self::Sortino => "sortino_ratio",
            Self::MaxDrawdown => "max_drawdown",
            Self::WinRate => "win_rate",
            Self::ProfitFactor => "profit_factor",
            Self::AvgTrade => "avg_trade",
        }
    }

    /// Returns true if `a` is strictly better than `b`.
    ///
    /// Higher is better for every objective; for MaxDrawdown, -0.05 > -0.20
    /// means the shallower drawdown wins. NaN is never better than anything.
    pub fn is_better(&self, a: f64, b: f64) -> bool {
        a > b
    }
}

impl fmt::Display for Objective {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.field_name())
    }
}

impl FromStr for Objective {
    type Err = UnknownObjective;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|o| o.field_name() == s.trim())
            .ok_or_else(|| UnknownObjective(s.to_string()))
    }
}
