//! CSV-backed provider: one `{symbol}_{timeframe}.csv` file per series.
//!
//! The header must name a time column (`timestamp`, `datetime`, `date` or
//! `time`) plus the five OHLCV columns, in any order and case. Empty numeric
//! cells load as NaN and are forward-filled by preprocessing.

use chrono::{NaiveDate, NaiveDateTime};
use std::path::{Path, PathBuf};

use super::provider::{within, DataError, HistoricalDataProvider};
use super::validate::{missing_columns, DataFormatError, REQUIRED_COLUMNS};
use crate::domain::{Bar, Timeframe};

const TIME_COLUMNS: [&str; 4] = ["timestamp", "datetime", "date", "time"];
const DATETIME_FORMATS: [&str; 3] = ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M"];

#[derive(Debug, Clone)]
pub struct CsvProvider {
    dir: PathBuf,
}

impl CsvProvider {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// File holding `symbol` at `timeframe`. Slashes in pair symbols become dashes.
    pub fn path_for(&self, symbol: &str, timeframe: Timeframe) -> PathBuf {
        self.dir
            .join(format!("{}_{}.csv", symbol.replace('/', "-"), timeframe))
    }

    fn read_all(&self, path: &Path) -> Result<Vec<Bar>, DataError> {
        let io_err = |e: csv::Error| DataError::Io {
            path: path.to_path_buf(),
            message: e.to_string(),
        };
        let mut reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_path(path)
            .map_err(io_err)?;

        let header: Vec<String> = reader
            .headers()
            .map_err(io_err)?
            .iter()
            .map(|h| h.to_ascii_lowercase())
            .collect();
        let layout = ColumnLayout::resolve(&header)?;

        let mut bars = Vec::new();
        for record in reader.records() {
            let record = record.map_err(io_err)?;
            let line = record.position().map(|p| p.line()).unwrap_or(0);
            let parse_err = |message: String| DataError::Parse {
                path: path.to_path_buf(),
                line,
                message,
            };
            let field = |idx: usize| record.get(idx).unwrap_or("");
            let timestamp = parse_timestamp(field(layout.time)).map_err(parse_err)?;
            let mut values = [0.0; 5];
            for (slot, (&idx, name)) in values
                .iter_mut()
                .zip(layout.ohlcv.iter().zip(REQUIRED_COLUMNS))
            {
                *slot = parse_number(field(idx)).map_err(|m| parse_err(format!("{name}: {m}")))?;
            }
            let [open, high, low, close, volume] = values;
            bars.push(Bar::new(timestamp, open, high, low, close, volume));
        }
        Ok(bars)
    }
}

impl HistoricalDataProvider for CsvProvider {
    fn name(&self) -> &str {
        "csv"
    }

    fn load(
        &self,
        symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
        timeframe: Timeframe,
    ) -> Result<Vec<Bar>, DataError> {
        let path = self.path_for(symbol, timeframe);
        if !path.exists() {
            return Err(DataError::Unavailable {
                symbol: symbol.to_string(),
                timeframe,
                start,
                end,
            });
        }
        let bars = self.read_all(&path)?;
        tracing::debug!(symbol, path = %path.display(), rows = bars.len(), "loaded csv");
        Ok(within(bars, start, end))
    }
}

struct ColumnLayout {
    time: usize,
    ohlcv: [usize; 5],
}

impl ColumnLayout {
    fn resolve(header: &[String]) -> Result<Self, DataFormatError> {
        let position = |name: &str| header.iter().position(|h| h == name);
        let time = TIME_COLUMNS.iter().find_map(|c| position(c));

        let mut missing = missing_columns(header.iter().map(String::as_str));
        if time.is_none() {
            missing.insert(0, "timestamp".to_string());
        }
        let (Some(time), true) = (time, missing.is_empty()) else {
            return Err(DataFormatError::MissingColumns { missing });
        };

        let mut ohlcv = [0usize; 5];
        for (slot, name) in ohlcv.iter_mut().zip(REQUIRED_COLUMNS) {
            // Presence was checked above.
            *slot = position(name).unwrap_or_default();
        }
        Ok(Self { time, ohlcv })
    }
}

fn parse_timestamp(raw: &str) -> Result<NaiveDateTime, String> {
    for fmt in DATETIME_FORMATS {
        if let Ok(ts) = NaiveDateTime::parse_from_str(raw, fmt) {
            return Ok(ts);
        }
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .ok_or_else(|| format!("unrecognized timestamp '{raw}'"))
}

fn parse_number(raw: &str) -> Result<f64, String> {
    if raw.is_empty() {
        return Ok(f64::NAN);
    }
    raw.parse::<f64>()
        .map_err(|e| format!("'{raw}' is not a number ({e})"))
}
