//! Moving-average crossover with ATR-scaled stops.
//!
//! Crossovers of the fast SMA over the slow SMA emit 0.8-confidence signals.
//! Between crossovers, a close above both averages and more than
//! `trend_threshold` above the slow one emits a 0.6-confidence trend
//! continuation signal (mirrored for downtrends).

use super::params::{ParamError, StrategyParams};
use super::registry::StrategyFactory;
use super::{Analysis, Strategy};
use crate::domain::{Bar, Side, Signal};
use crate::indicators::{Atr, Indicator, Sma};

const CROSSOVER_CONFIDENCE: f64 = 0.8;
const TREND_CONFIDENCE: f64 = 0.6;

#[derive(Debug, Clone)]
pub struct SmaCrossover {
    fast: Sma,
    slow: Sma,
    atr: Atr,
    stop_loss_multiplier: f64,
    take_profit_multiplier: f64,
    trend_threshold: f64,
    params: StrategyParams,
}

impl SmaCrossover {
    pub const NAME: &'static str = "sma_crossover";

    pub fn defaults() -> StrategyParams {
        StrategyParams::new()
            .with("fast_period", 20)
            .with("slow_period", 50)
            .with("atr_period", 14)
            .with("stop_loss_multiplier", 2.0)
            .with("take_profit_multiplier", 3.0)
            .with("trend_threshold", 0.02)
    }

    /// Build from `params`, falling back to [`defaults`](Self::defaults) per key.
    pub fn from_params(params: &StrategyParams) -> Result<Self, ParamError> {
        let params = params.merged_over(&Self::defaults());
        let fast = params.get_usize("fast_period")?;
        let slow = params.get_usize("slow_period")?;
        let atr = params.get_usize("atr_period")?;
        if fast == 0 || atr == 0 {
            return Err(ParamError::Invalid {
                name: if fast == 0 { "fast_period" } else { "atr_period" }.into(),
                reason: "must be at least 1".into(),
            });
        }
        if slow <= fast {
            return Err(ParamError::Invalid {
                name: "slow_period".into(),
                reason: format!("must exceed fast_period ({fast}), got {slow}"),
            });
        }
        Ok(Self {
            fast: Sma::new(fast),
            slow: Sma::new(slow),
            atr: Atr::new(atr),
            stop_loss_multiplier: params.get_f64("stop_loss_multiplier")?,
            take_profit_multiplier: params.get_f64("take_profit_multiplier")?,
            trend_threshold: params.get_f64("trend_threshold")?,
            params,
        })
    }

    pub fn new(fast_period: usize, slow_period: usize) -> Result<Self, ParamError> {
        Self::from_params(
            &StrategyParams::new()
                .with("fast_period", fast_period as i64)
                .with("slow_period", slow_period as i64),
        )
    }

    fn signal(
        &self,
        bars: &[Bar],
        i: usize,
        side: Side,
        confidence: f64,
        atr: f64,
        kind: &str,
    ) -> Signal {
        let close = bars[i].close;
        let (stop, target) = match side {
            Side::Buy => (
                close - atr * self.stop_loss_multiplier,
                close + atr * self.take_profit_multiplier,
            ),
            Side::Sell => (
                close + atr * self.stop_loss_multiplier,
                close - atr * self.take_profit_multiplier,
            ),
        };
        Signal::new(i, bars[i].timestamp, side, confidence, close, kind)
            .with_stops(Some(stop), Some(target))
    }
}

impl Strategy for SmaCrossover {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn params(&self) -> &StrategyParams {
        &self.params
    }

    fn min_bars(&self) -> usize {
        // One extra bar so a crossover has a previous value to compare with.
        self.slow.period().max(self.atr.lookback() + 1) + 1
    }

    fn analyze_window(&self, bars: &[Bar]) -> Analysis {
        let fast = self.fast.compute(bars);
        let slow = self.slow.compute(bars);
        let atr = self.atr.compute(bars);

        let mut bullish = Vec::new();
        let mut bearish = Vec::new();
        for i in 1..bars.len() {
            let defined = [fast[i - 1], slow[i - 1], fast[i], slow[i]]
                .iter()
                .all(|v| !v.is_nan());
            if !defined {
                continue;
            }
            let was_above = fast[i - 1] > slow[i - 1];
            let is_above = fast[i] > slow[i];
            match (was_above, is_above) {
                (false, true) => bullish.push(i),
                (true, false) => bearish.push(i),
                _ => {}
            }
        }

        let mut analysis = Analysis::default();
        analysis.series.insert("fast_ma".into(), fast);
        analysis.series.insert("slow_ma".into(), slow);
        analysis.series.insert("atr".into(), atr);
        analysis.events.insert("bullish_crossover".into(), bullish);
        analysis.events.insert("bearish_crossover".into(), bearish);
        analysis
    }

    fn signals_in_window(&self, bars: &[Bar]) -> Vec<Signal> {
        let analysis = self.analyze_window(bars);
        let (Some(fast), Some(slow), Some(atr)) = (
            analysis.series("fast_ma"),
            analysis.series("slow_ma"),
            analysis.series("atr"),
        ) else {
            return Vec::new();
        };
        let bullish = analysis.events("bullish_crossover");
        let bearish = analysis.events("bearish_crossover");

        let mut signals = Vec::new();
        for i in 1..bars.len() {
            if atr[i].is_nan() || fast[i].is_nan() || slow[i].is_nan() {
                continue;
            }
            let close = bars[i].close;
            let above = fast[i] > slow[i];
            let vs_slow_pct = (close - slow[i]) / close;

            let candidate = if bullish.binary_search(&i).is_ok() {
                Some((Side::Buy, CROSSOVER_CONFIDENCE, "ma_bullish_crossover"))
            } else if bearish.binary_search(&i).is_ok() {
                Some((Side::Sell, CROSSOVER_CONFIDENCE, "ma_bearish_crossover"))
            } else if above && close > fast[i] && vs_slow_pct > self.trend_threshold {
                Some((Side::Buy, TREND_CONFIDENCE, "strong_uptrend"))
            } else if !above && close < fast[i] && vs_slow_pct < -self.trend_threshold {
                Some((Side::Sell, TREND_CONFIDENCE, "strong_downtrend"))
            } else {
                None
            };
            if let Some((side, confidence, kind)) = candidate {
                signals.push(self.signal(bars, i, side, confidence, atr[i], kind));
            }
        }
        signals
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SmaCrossoverFactory;

impl StrategyFactory for SmaCrossoverFactory {
    fn name(&self) -> &str {
        SmaCrossover::NAME
    }

    fn build(&self, params: &StrategyParams) -> Result<Box<dyn Strategy>, ParamError> {
        Ok(Box::new(SmaCrossover::from_params(params)?))
    }
}
