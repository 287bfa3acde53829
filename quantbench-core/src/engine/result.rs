//! Backtest result record.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use super::summary::Summary;
use crate::domain::{round_trips, RoundTrip, Side, Timeframe, Trade};
use crate::metrics::Metrics;
use crate::strategy::StrategyParams;

/// Everything one backtest produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BacktestResult {
    pub strategy: String,
    pub params: StrategyParams,
    pub symbol: String,
    pub timeframe: Timeframe,
    /// Timestamp of the first bar processed.
    pub start: NaiveDateTime,
    /// Timestamp of the last bar processed.
    pub end: NaiveDateTime,
    pub initial_capital: f64,
    /// Last equity value (position marked at the final close).
    pub final_capital: f64,
    pub total_return: f64,
    pub commission: f64,
    pub trades: Vec<Trade>,
    /// One entry per bar.
    pub equity_curve: Vec<f64>,
    /// Per-bar percentage change of the equity curve; one shorter than it.
    pub returns: Vec<f64>,
    pub metrics: Metrics,
}

impl BacktestResult {
    pub fn round_trips(&self) -> Vec<RoundTrip> {
        round_trips(&self.trades)
    }

    /// Number of sells, i.e. positions closed.
    pub fn closing_trades(&self) -> usize {
        self.trades.iter().filter(|t| t.side == Side::Sell).count()
    }

    pub fn total_fees(&self) -> f64 {
        self.trades.iter().map(|t| t.fee).sum()
    }

    pub fn summary(&self) -> Summary {
        Summary::from_result(self)
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}
