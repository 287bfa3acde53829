//! Average True Range: rolling mean of the true range.

use super::{rolling_mean, Indicator};
use crate::domain::Bar;

#[derive(Debug, Clone)]
pub struct Atr {
    period: usize,
    name: String,
}

impl Atr {
    pub fn new(period: usize) -> Self {
        let period = period.max(1);
        Self {
            period,
            name: format!("atr_{period}"),
        }
    }
}

/// True range; the first bar has no previous close and uses high - low.
pub fn true_range(bars: &[Bar]) -> Vec<f64> {
    bars.iter()
        .enumerate()
        .map(|(i, b)| {
            let hl = b.high - b.low;
            match i.checked_sub(1).map(|p| bars[p].close) {
                Some(prev) => hl.max((b.high - prev).abs()).max((b.low - prev).abs()),
                None => hl,
            }
        })
        .collect()
}

impl Indicator for Atr {
    fn name(&self) -> &str {
        &self.name
    }

    fn lookback(&self) -> usize {
        self.period - 1
    }

    fn compute(&self, bars: &[Bar]) -> Vec<f64> {
        rolling_mean(&true_range(bars), self.period)
    }
}
