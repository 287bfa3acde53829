//! Performance metrics — pure functions that compute strategy statistics.
//!
//! Every metric is a pure function: equity curve and/or round trips in,
//! scalar out. Annualization takes the bars-per-year of the series so the
//! same code serves daily and intraday runs.

use serde::{Deserialize, Serialize};

use crate::domain::{round_trips, RoundTrip, Trade};

/// Risk/return summary of one backtest.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Metrics {
    pub sharpe_ratio: f64,
    pub sortino_ratio: f64,
    /// Non-positive fraction, e.g. -0.15 for a 15% peak-to-trough loss.
    pub max_drawdown: f64,
    pub win_rate: f64,
    /// `f64::INFINITY` when there are gains and no losses.
    pub profit_factor: f64,
    /// Mean round-trip P/L in currency units.
    pub avg_trade: f64,
}

impl Metrics {
    /// All-zero metrics, reported when fewer than two trades were executed.
    pub fn zero() -> Self {
        Self::default()
    }

    pub fn compute(equity_curve: &[f64], trades: &[Trade], bars_per_year: f64) -> Self {
        if trades.len() < 2 {
            return Self::zero();
        }
        let returns = period_returns(equity_curve);
        let trips = round_trips(trades);
        Self {
            sharpe_ratio: sharpe_ratio(&returns, bars_per_year),
            sortino_ratio: sortino_ratio(&returns, bars_per_year),
            max_drawdown: max_drawdown(equity_curve),
            win_rate: win_rate(&trips),
            profit_factor: profit_factor(&trips),
            avg_trade: avg_trade(&trips),
        }
    }
}

// ─── Individual metric functions ────────────────────────────────────

/// Annualized Sharpe ratio with zero risk-free rate.
///
/// Sharpe = mean(returns) / std(returns) * sqrt(bars_per_year), sample std.
/// Returns 0.0 if variance is zero or there are fewer than 2 returns.
pub fn sharpe_ratio(returns: &[f64], bars_per_year: f64) -> f64 {
    if returns.len() < 2 {
        return 0.0;
    }
    let std = std_dev(returns);
    if std < 1e-15 {
        return 0.0;
    }
    mean_f64(returns) / std * bars_per_year.sqrt()
}

/// Annualized Sortino ratio: mean over the sample std of negative returns.
///
/// Returns 0.0 with fewer than two negative returns or zero downside spread.
pub fn sortino_ratio(returns: &[f64], bars_per_year: f64) -> f64 {
    let downside: Vec<f64> = returns.iter().copied().filter(|r| *r < 0.0).collect();
    if downside.len() < 2 {
        return 0.0;
    }
    let downside_std = std_dev(&downside);
    if downside_std < 1e-15 {
        return 0.0;
    }
    mean_f64(returns) / downside_std * bars_per_year.sqrt()
}

/// Maximum drawdown as a negative fraction of the running peak.
///
/// Returns 0.0 if equity is constant or monotonically increasing.
pub fn max_drawdown(equity_curve: &[f64]) -> f64 {
    let mut peak = f64::NEG_INFINITY;
    let mut max_dd = 0.0_f64;
    for &eq in equity_curve {
        peak = peak.max(eq);
        if peak > 0.0 {
            max_dd = max_dd.min((eq - peak) / peak);
        }
    }
    max_dd
}

/// Fraction of closed round trips with positive P/L.
pub fn win_rate(trips: &[RoundTrip]) -> f64 {
    if trips.is_empty() {
        return 0.0;
    }
    trips.iter().filter(|t| t.is_winner()).count() as f64 / trips.len() as f64
}

/// Gross profit over gross loss.
///
/// Infinite with gains and no losses; 0.0 with neither.
pub fn profit_factor(trips: &[RoundTrip]) -> f64 {
    let gross_profit: f64 = trips.iter().filter(|t| t.pnl > 0.0).map(|t| t.pnl).sum();
    let gross_loss: f64 = trips
        .iter()
        .filter(|t| t.pnl < 0.0)
        .map(|t| t.pnl.abs())
        .sum();

    if gross_loss < 1e-10 {
        return if gross_profit > 0.0 { f64::INFINITY } else { 0.0 };
    }
    gross_profit / gross_loss
}

pub fn avg_trade(trips: &[RoundTrip]) -> f64 {
    mean_f64(&trips.iter().map(|t| t.pnl).collect::<Vec<_>>())
}

/// (last - first) / first; 0.0 for short or non-positive curves.
pub fn total_return(equity_curve: &[f64]) -> f64 {
    match (equity_curve.first(), equity_curve.last()) {
        (Some(&first), Some(&last)) if equity_curve.len() >= 2 && first > 0.0 => {
            (last - first) / first
        }
        _ => 0.0,
    }
}

// ─── Helpers ────────────────────────────────────────────────────────

/// Per-bar percentage change of an equity curve; one shorter than the input.
pub fn period_returns(equity_curve: &[f64]) -> Vec<f64> {
    equity_curve
        .windows(2)
        .map(|w| {
            if w[0] > 0.0 {
                (w[1] - w[0]) / w[0]
            } else {
                0.0
            }
        })
        .collect()
}

pub fn mean_f64(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Sample standard deviation (n - 1 denominator).
pub fn std_dev(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let mean = mean_f64(values);
    let variance =
        values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (values.len() - 1) as f64;
    variance.sqrt()
}

/// Population standard deviation (n denominator).
pub fn population_std_dev(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let mean = mean_f64(values);
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / values.len() as f64;
    variance.sqrt()
}

/// Linear-interpolated percentile (`p` in 0..=100) of an ascending slice.
pub fn percentile_sorted(sorted: &[f64], p: f64) -> f64 {
    let n = sorted.len();
    if n == 0 {
        return 0.0;
    }
    if n == 1 {
        return sorted[0];
    }
    let rank = (p.clamp(0.0, 100.0) / 100.0) * (n - 1) as f64;
    let lo = rank.floor() as usize;
    let hi = (lo + 1).min(n - 1);
    let frac = rank - lo as f64;
    sorted[lo] * (1.0 - frac) + sorted[hi] * frac
}
