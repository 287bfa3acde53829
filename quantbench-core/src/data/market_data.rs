//! Market Data Table: a validated, time-ordered bar series plus derived returns.

use chrono::NaiveDateTime;

use super::validate::{validate_bars, DataFormatError};
use crate::domain::{Bar, Timeframe};

/// Validated bars for one symbol and timeframe.
///
/// `returns[0]` and `log_returns[0]` are NaN; every later entry is the
/// simple (resp. log) change from the previous close.
#[derive(Debug, Clone, PartialEq)]
pub struct MarketData {
    symbol: String,
    timeframe: Timeframe,
    bars: Vec<Bar>,
    returns: Vec<f64>,
    log_returns: Vec<f64>,
}

impl MarketData {
    /// Wrap an already-clean series. Fails if the bars are unsorted or malformed.
    pub fn from_bars(
        symbol: impl Into<String>,
        timeframe: Timeframe,
        bars: Vec<Bar>,
    ) -> Result<Self, DataFormatError> {
        validate_bars(&bars)?;
        let (returns, log_returns) = derive_returns(&bars);
        Ok(Self {
            symbol: symbol.into(),
            timeframe,
            bars,
            returns,
            log_returns,
        })
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn timeframe(&self) -> Timeframe {
        self.timeframe
    }

    pub fn bars(&self) -> &[Bar] {
        &self.bars
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    pub fn closes(&self) -> Vec<f64> {
        self.bars.iter().map(|b| b.close).collect()
    }

    pub fn returns(&self) -> &[f64] {
        &self.returns
    }

    pub fn log_returns(&self) -> &[f64] {
        &self.log_returns
    }

    /// Returns with the undefined first entry dropped.
    pub fn sample_returns(&self) -> &[f64] {
        self.returns.get(1..).unwrap_or(&[])
    }

    pub fn first_timestamp(&self) -> Option<NaiveDateTime> {
        self.bars.first().map(|b| b.timestamp)
    }

    pub fn last_timestamp(&self) -> Option<NaiveDateTime> {
        self.bars.last().map(|b| b.timestamp)
    }

    /// The first `len` bars as a standalone table.
    pub fn truncated(&self, len: usize) -> MarketData {
        let len = len.min(self.bars.len());
        MarketData {
            symbol: self.symbol.clone(),
            timeframe: self.timeframe,
            bars: self.bars[..len].to_vec(),
            returns: self.returns[..len].to_vec(),
            log_returns: self.log_returns[..len].to_vec(),
        }
    }
}

/// Normalize raw provider output into a [`MarketData`].
///
/// Sorts by timestamp, keeps the first of any duplicate timestamps, and
/// forward-fills NaN fields from the previous bar. Leading NaNs have nothing
/// to fill from and fail validation.
pub fn preprocess(
    symbol: &str,
    timeframe: Timeframe,
    mut bars: Vec<Bar>,
) -> Result<MarketData, DataFormatError> {
    let raw_len = bars.len();
    bars.sort_by_key(|b| b.timestamp);
    bars.dedup_by_key(|b| b.timestamp);
    forward_fill(&mut bars);
    if bars.len() != raw_len {
        tracing::debug!(
            symbol,
            dropped = raw_len - bars.len(),
            "dropped duplicate timestamps"
        );
    }
    MarketData::from_bars(symbol, timeframe, bars)
}

fn forward_fill(bars: &mut [Bar]) {
    for i in 1..bars.len() {
        let prev = bars[i - 1];
        let bar = &mut bars[i];
        fill(&mut bar.open, prev.open);
        fill(&mut bar.high, prev.high);
        fill(&mut bar.low, prev.low);
        fill(&mut bar.close, prev.close);
        fill(&mut bar.volume, prev.volume);
    }
}

fn fill(slot: &mut f64, prev: f64) {
    if slot.is_nan() {
        *slot = prev;
    }
}

fn derive_returns(bars: &[Bar]) -> (Vec<f64>, Vec<f64>) {
    let mut returns = Vec::with_capacity(bars.len());
    let mut log_returns = Vec::with_capacity(bars.len());
    if !bars.is_empty() {
        returns.push(f64::NAN);
        log_returns.push(f64::NAN);
    }
    for w in bars.windows(2) {
        let ratio = w[1].close / w[0].close;
        returns.push(ratio - 1.0);
        log_returns.push(ratio.ln());
    }
    (returns, log_returns)
}
