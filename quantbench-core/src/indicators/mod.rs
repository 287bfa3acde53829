//! Price indicators used by the bundled strategies.
//!
//! Indicators are pure functions of a bar window: the value at index `t`
//! depends only on bars `0..=t`, so computing over a truncated window gives
//! the same prefix as computing over the full series.

pub mod atr;
pub mod sma;

pub use atr::Atr;
pub use sma::Sma;

use crate::domain::Bar;

/// Trait for single-series indicators.
///
/// Output has the same length as the input; the first `lookback()` values
/// are `f64::NAN` (warmup).
pub trait Indicator: Send + Sync {
    /// Human-readable name (e.g., "sma_20", "atr_14").
    fn name(&self) -> &str;

    /// Number of bars needed before the indicator produces valid output.
    fn lookback(&self) -> usize;

    fn compute(&self, bars: &[Bar]) -> Vec<f64>;
}

/// Rolling mean over `period` values; NaN while the window is short or holds a NaN.
pub(crate) fn rolling_mean(values: &[f64], period: usize) -> Vec<f64> {
    let mut out = vec![f64::NAN; values.len()];
    if period == 0 {
        return out;
    }
    let mut sum = 0.0;
    let mut nans = 0usize;
    for (i, &v) in values.iter().enumerate() {
        if v.is_nan() {
            nans += 1;
        } else {
            sum += v;
        }
        if i >= period {
            let leaving = values[i - period];
            if leaving.is_nan() {
                nans -= 1;
            } else {
                sum -= leaving;
            }
        }
        if i + 1 >= period && nans == 0 {
            out[i] = sum / period as f64;
        }
    }
    out
}

/// Bars from close prices: open = previous close, ±1.0 wicks, volume 1000.
#[cfg(test)]
pub fn make_bars(closes: &[f64]) -> Vec<Bar> {
    let base = chrono::NaiveDate::from_ymd_opt(2024, 1, 2)
        .unwrap()
        .and_hms_opt(0, 0, 0)
        .unwrap();
    closes
        .iter()
        .enumerate()
        .map(|(i, &close)| {
            let open = if i == 0 { close } else { closes[i - 1] };
            Bar::new(
                base + chrono::Duration::days(i as i64),
                open,
                open.max(close) + 1.0,
                open.min(close) - 1.0,
                close,
                1000.0,
            )
        })
        .collect()
}

#[cfg(test)]
pub fn assert_approx(actual: f64, expected: f64, epsilon: f64) {
    assert!(
        (actual - expected).abs() < epsilon,
        "assert_approx failed: actual={actual}, expected={expected}, diff={}, epsilon={epsilon}",
        (actual - expected).abs()
    );
}

#[cfg(test)]
pub const DEFAULT_EPSILON: f64 = 1e-10;
