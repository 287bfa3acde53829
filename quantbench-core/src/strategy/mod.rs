//! Strategy contract: analysis, signal generation and recommendation.
//!
//! A strategy sees only a bar window ending at the current bar. It never
//! sees portfolio state, so a recommendation is a pure function of the
//! window and the strategy's parameters.

pub mod params;
pub mod registry;
pub mod scripted;
pub mod sma_crossover;

pub use params::{ParamError, ParamValue, StrategyParams};
pub use registry::{RegistryError, StrategyFactory, StrategyRegistry};
pub use scripted::{Scripted, ScriptedFactory};
pub use sma_crossover::{SmaCrossover, SmaCrossoverFactory};

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::data::{validate_bars, DataFormatError};
use crate::domain::{Bar, Recommendation, Signal};

/// Indicator series and detected events over a bar window.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Analysis {
    /// Named series aligned with the analyzed window.
    pub series: BTreeMap<String, Vec<f64>>,
    /// Event bar indices keyed by event kind, e.g. "bullish_crossover".
    pub events: BTreeMap<String, Vec<usize>>,
}

impl Analysis {
    pub fn series(&self, name: &str) -> Option<&[f64]> {
        self.series.get(name).map(Vec::as_slice)
    }

    pub fn events(&self, kind: &str) -> &[usize] {
        self.events.get(kind).map(Vec::as_slice).unwrap_or(&[])
    }
}

pub trait Strategy: Send + Sync {
    fn name(&self) -> &str;

    fn params(&self) -> &StrategyParams;

    /// Bars required before the strategy can say anything.
    fn min_bars(&self) -> usize {
        1
    }

    /// A signal counts for the current bar only if it sits within the last
    /// `recency_window()` bars of the window.
    fn recency_window(&self) -> usize {
        2
    }

    fn validate(&self, bars: &[Bar]) -> Result<(), DataFormatError> {
        validate_bars(bars)
    }

    /// Indicator series and events for a window that already passed
    /// [`Strategy::validate`].
    fn analyze_window(&self, bars: &[Bar]) -> Analysis;

    /// Signals in ascending bar order for a window that already passed
    /// [`Strategy::validate`].
    fn signals_in_window(&self, bars: &[Bar]) -> Vec<Signal>;

    fn analyze(&self, bars: &[Bar]) -> Result<Analysis, DataFormatError> {
        self.validate(bars)?;
        Ok(self.analyze_window(bars))
    }

    /// Signals in ascending bar order.
    fn generate_signals(&self, bars: &[Bar]) -> Result<Vec<Signal>, DataFormatError> {
        self.validate(bars)?;
        Ok(self.signals_in_window(bars))
    }

    /// Never fails: every error path collapses to a zero-confidence hold.
    fn get_recommendation(&self, bars: &[Bar]) -> Recommendation {
        recommend_from_signals(self, bars)
    }

    /// Recommendation for a prefix of a [`MarketData`](crate::data::MarketData)
    /// table. The table was validated when it was built, so the window is
    /// not rescanned.
    fn recommend_on_prefix(&self, bars: &[Bar]) -> Recommendation {
        match insufficient(self, bars) {
            Some(hold) => hold,
            None => latest_recommendation(self, bars, &self.signals_in_window(bars)),
        }
    }
}

/// Reduce a strategy's signals to one recommendation for the last bar.
pub fn recommend_from_signals<S: Strategy + ?Sized>(strategy: &S, bars: &[Bar]) -> Recommendation {
    if let Some(hold) = insufficient(strategy, bars) {
        return hold;
    }
    let signals = match strategy.generate_signals(bars) {
        Ok(s) => s,
        Err(e) => {
            tracing::debug!(strategy = strategy.name(), error = %e, "signal generation failed");
            return Recommendation::hold(format!("analysis failed: {e}"));
        }
    };
    latest_recommendation(strategy, bars, &signals)
}

fn insufficient<S: Strategy + ?Sized>(strategy: &S, bars: &[Bar]) -> Option<Recommendation> {
    let needed = strategy.min_bars().max(1);
    (bars.len() < needed).then(|| {
        Recommendation::hold(format!(
            "insufficient data: {} of {needed} bars",
            bars.len()
        ))
    })
}

fn latest_recommendation<S: Strategy + ?Sized>(
    strategy: &S,
    bars: &[Bar],
    signals: &[Signal],
) -> Recommendation {
    let Some(latest) = signals.last() else {
        return Recommendation::hold("no signals");
    };
    let window = strategy.recency_window().max(1);
    if latest.bar_index + window >= bars.len() {
        Recommendation::from_signal(latest)
    } else {
        Recommendation::hold(format!(
            "latest signal at bar {} is stale",
            latest.bar_index
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Action, Side};
    use crate::indicators::make_bars;

    /// Emits a buy at a fixed bar, or fails analysis on demand.
    struct Fixed {
        at: usize,
        fail: bool,
        params: StrategyParams,
    }

    impl Strategy for Fixed {
        fn name(&self) -> &str {
            "fixed"
        }
        fn params(&self) -> &StrategyParams {
            &self.params
        }
        fn min_bars(&self) -> usize {
            3
        }
        fn validate(&self, _bars: &[Bar]) -> Result<(), DataFormatError> {
            if self.fail {
                return Err(DataFormatError::MissingColumns {
                    missing: vec!["volume".into()],
                });
            }
            Ok(())
        }
        fn analyze_window(&self, _bars: &[Bar]) -> Analysis {
            Analysis::default()
        }
        fn signals_in_window(&self, bars: &[Bar]) -> Vec<Signal> {
            bars.get(self.at)
                .map(|b| Signal::new(self.at, b.timestamp, Side::Buy, 0.9, b.close, "fixed"))
                .into_iter()
                .collect()
        }
    }

    fn fixed(at: usize, fail: bool) -> Fixed {
        Fixed {
            at,
            fail,
            params: StrategyParams::new(),
        }
    }

    #[test]
    fn short_window_holds() {
        let rec = fixed(0, false).get_recommendation(&make_bars(&[1.0, 2.0]));
        assert_eq!(rec.action, Action::Hold);
        assert_eq!(rec.confidence, 0.0);
    }

    #[test]
    fn recent_signal_is_acted_on() {
        let bars = make_bars(&[1.0, 2.0, 3.0, 4.0, 5.0]);
        // Last bar and the one before it are both recent.
        assert_eq!(fixed(4, false).get_recommendation(&bars).action, Action::Buy);
        assert_eq!(fixed(3, false).get_recommendation(&bars).action, Action::Buy);
        assert_eq!(fixed(2, false).get_recommendation(&bars).action, Action::Hold);
    }

    #[test]
    fn failure_collapses_to_hold() {
        let bars = make_bars(&[1.0, 2.0, 3.0, 4.0]);
        let rec = fixed(3, true).get_recommendation(&bars);
        assert!(rec.is_hold());
        assert_eq!(rec.confidence, 0.0);
        assert!(rec.reason.contains("volume"));
    }

    #[test]
    fn prefix_path_skips_validation() {
        let bars = make_bars(&[1.0, 2.0, 3.0, 4.0]);
        let rec = fixed(3, true).recommend_on_prefix(&bars);
        assert_eq!(rec.action, Action::Buy);
        assert!(fixed(3, true).analyze(&bars).is_err());
    }

    #[test]
    fn prefix_path_matches_checked_path_on_valid_bars() {
        let bars = make_bars(&[1.0, 2.0, 3.0, 4.0, 5.0]);
        for at in 0..6 {
            for end in 1..=bars.len() {
                let s = fixed(at, false);
                assert_eq!(
                    s.recommend_on_prefix(&bars[..end]),
                    s.get_recommendation(&bars[..end])
                );
            }
        }
    }

    #[test]
    fn no_signals_holds() {
        let bars = make_bars(&[1.0, 2.0, 3.0]);
        assert!(fixed(10, false).get_recommendation(&bars).is_hold());
    }
}
