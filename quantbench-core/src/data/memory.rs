//! In-memory provider for fixtures, synthetic series and tests.

use chrono::NaiveDate;
use std::collections::HashMap;

use super::provider::{within, DataError, HistoricalDataProvider};
use crate::domain::{Bar, Timeframe};

#[derive(Debug, Clone, Default)]
pub struct InMemoryProvider {
    series: HashMap<(String, Timeframe), Vec<Bar>>,
}

impl InMemoryProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_series(mut self, symbol: &str, timeframe: Timeframe, bars: Vec<Bar>) -> Self {
        self.insert(symbol, timeframe, bars);
        self
    }

    /// Replace the series for `(symbol, timeframe)`.
    pub fn insert(&mut self, symbol: &str, timeframe: Timeframe, bars: Vec<Bar>) {
        self.series.insert((symbol.to_string(), timeframe), bars);
    }

    pub fn contains(&self, symbol: &str, timeframe: Timeframe) -> bool {
        self.series.contains_key(&(symbol.to_string(), timeframe))
    }
}

impl HistoricalDataProvider for InMemoryProvider {
    fn name(&self) -> &str {
        "memory"
    }

    fn load(
        &self,
        symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
        timeframe: Timeframe,
    ) -> Result<Vec<Bar>, DataError> {
        let bars = self
            .series
            .get(&(symbol.to_string(), timeframe))
            .ok_or_else(|| DataError::Unavailable {
                symbol: symbol.to_string(),
                timeframe,
                start,
                end,
            })?;
        Ok(within(bars.iter().copied(), start, end))
    }
}
