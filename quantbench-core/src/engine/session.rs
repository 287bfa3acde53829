//! Stateful wrapper that remembers the most recent backtest.

use chrono::NaiveDate;

use super::summary::Summary;
use super::{BacktestEngine, BacktestError, BacktestResult};
use crate::data::HistoricalDataProvider;
use crate::domain::Timeframe;
use crate::strategy::Strategy;

/// Runs backtests through an engine and keeps the latest result.
///
/// Each successful run overwrites the previous result; a failed run leaves
/// it untouched.
pub struct BacktestSession<'e, P: HistoricalDataProvider> {
    engine: &'e BacktestEngine<P>,
    last: Option<BacktestResult>,
}

impl<'e, P: HistoricalDataProvider> BacktestSession<'e, P> {
    pub fn new(engine: &'e BacktestEngine<P>) -> Self {
        Self { engine, last: None }
    }

    pub fn run(
        &mut self,
        strategy: &dyn Strategy,
        symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
        timeframe: Timeframe,
    ) -> Result<&BacktestResult, BacktestError> {
        let result = self
            .engine
            .run_backtest(strategy, symbol, start, end, timeframe)?;
        Ok(self.last.insert(result))
    }

    pub fn last(&self) -> Option<&BacktestResult> {
        self.last.as_ref()
    }

    /// Move the latest result out, leaving the session empty.
    pub fn take_last(&mut self) -> Option<BacktestResult> {
        self.last.take()
    }

    pub fn summary(&self) -> Option<Summary> {
        self.last.as_ref().map(BacktestResult::summary)
    }
}
