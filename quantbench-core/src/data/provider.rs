//! Historical data provider trait and structured error types.
//!
//! The provider trait abstracts over data sources (CSV files, in-memory
//! fixtures, remote feeds) so the engine can swap implementations and tests
//! can inject deterministic series.

use chrono::NaiveDate;
use std::path::PathBuf;
use thiserror::Error;

use super::market_data::{self, MarketData};
use super::validate::DataFormatError;
use crate::domain::{Bar, Timeframe};

#[derive(Debug, Error)]
pub enum DataError {
    #[error("no data for {symbol} ({timeframe}) between {start} and {end}")]
    Unavailable {
        symbol: String,
        timeframe: Timeframe,
        start: NaiveDate,
        end: NaiveDate,
    },

    #[error(transparent)]
    Format(#[from] DataFormatError),

    #[error("failed to read {path}: {message}")]
    Io { path: PathBuf, message: String },

    #[error("malformed record in {path} at line {line}: {message}")]
    Parse {
        path: PathBuf,
        line: u64,
        message: String,
    },
}

/// Source of raw OHLCV bars.
///
/// `load` returns bars for the inclusive date range in whatever order the
/// source holds them; `preprocess` turns them into a clean table. Both must
/// be deterministic for the same inputs.
pub trait HistoricalDataProvider: Send + Sync {
    /// Human-readable name of this provider.
    fn name(&self) -> &str;

    fn load(
        &self,
        symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
        timeframe: Timeframe,
    ) -> Result<Vec<Bar>, DataError>;

    fn preprocess(
        &self,
        symbol: &str,
        timeframe: Timeframe,
        bars: Vec<Bar>,
    ) -> Result<MarketData, DataError> {
        Ok(market_data::preprocess(symbol, timeframe, bars)?)
    }
}

/// Keep bars whose calendar date falls in `[start, end]`.
pub(crate) fn within(
    bars: impl IntoIterator<Item = Bar>,
    start: NaiveDate,
    end: NaiveDate,
) -> Vec<Bar> {
    bars.into_iter()
        .filter(|b| {
            let d = b.timestamp.date();
            d >= start && d <= end
        })
        .collect()
}
