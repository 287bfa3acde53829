//! Structural checks on bar series before they reach a strategy or the engine.

use thiserror::Error;

use crate::domain::Bar;

/// Columns every OHLCV source must carry.
pub const REQUIRED_COLUMNS: [&str; 5] = ["open", "high", "low", "close", "volume"];

#[derive(Debug, Clone, PartialEq, Error)]
pub enum DataFormatError {
    #[error("missing required columns: {}", .missing.join(", "))]
    MissingColumns { missing: Vec<String> },

    #[error("invalid bar at index {index}: {reason}")]
    InvalidBar { index: usize, reason: String },

    #[error("bars out of order at index {index}: timestamps must be strictly ascending")]
    Unsorted { index: usize },
}

/// Required columns absent from `header`, compared case-insensitively.
pub fn missing_columns<'a>(header: impl IntoIterator<Item = &'a str>) -> Vec<String> {
    let present: Vec<String> = header
        .into_iter()
        .map(|h| h.trim().to_ascii_lowercase())
        .collect();
    REQUIRED_COLUMNS
        .iter()
        .filter(|col| !present.iter().any(|p| p == *col))
        .map(|col| col.to_string())
        .collect()
}

pub fn check_columns<'a>(header: impl IntoIterator<Item = &'a str>) -> Result<(), DataFormatError> {
    let missing = missing_columns(header);
    if missing.is_empty() {
        Ok(())
    } else {
        Err(DataFormatError::MissingColumns { missing })
    }
}

/// Validate a bar series: no void fields, sane OHLC, ascending timestamps.
///
/// A series where every bar is void in the same field is reported as a
/// missing column, matching what a header check on the source would say.
pub fn validate_bars(bars: &[Bar]) -> Result<(), DataFormatError> {
    if let Some(missing) = entirely_void_columns(bars) {
        return Err(DataFormatError::MissingColumns { missing });
    }

    for (index, bar) in bars.iter().enumerate() {
        if bar.is_void() {
            return Err(DataFormatError::InvalidBar {
                index,
                reason: "missing value".into(),
            });
        }
        if !bar.is_sane() {
            return Err(DataFormatError::InvalidBar {
                index,
                reason: format!(
                    "inconsistent OHLCV (o={}, h={}, l={}, c={}, v={})",
                    bar.open, bar.high, bar.low, bar.close, bar.volume
                ),
            });
        }
        if index > 0 && bars[index - 1].timestamp >= bar.timestamp {
            return Err(DataFormatError::Unsorted { index });
        }
    }
    Ok(())
}

fn entirely_void_columns(bars: &[Bar]) -> Option<Vec<String>> {
    if bars.is_empty() {
        return None;
    }
    let fields: [(&str, fn(&Bar) -> f64); 5] = [
        ("open", |b| b.open),
        ("high", |b| b.high),
        ("low", |b| b.low),
        ("close", |b| b.close),
        ("volume", |b| b.volume),
    ];
    let missing: Vec<String> = fields
        .iter()
        .filter(|(_, get)| bars.iter().all(|b| get(b).is_nan()))
        .map(|(name, _)| name.to_string())
        .collect();
    if missing.is_empty() {
        None
    } else {
        Some(missing)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, NaiveDateTime};

    fn ts(day: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 1, day)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap()
    }

    fn bars() -> Vec<Bar> {
        (1..=5)
            .map(|d| Bar::new(ts(d), 100.0, 101.0, 99.0, 100.5, 1_000.0))
            .collect()
    }

    #[test]
    fn accepts_clean_series() {
        assert!(validate_bars(&bars()).is_ok());
        assert!(validate_bars(&[]).is_ok());
    }

    #[test]
    fn header_check_reports_every_missing_column() {
        let err = check_columns(["Date", "Open", "Close"]).unwrap_err();
        assert_eq!(
            err,
            DataFormatError::MissingColumns {
                missing: vec!["high".into(), "low".into(), "volume".into()]
            }
        );
        assert!(err.to_string().contains("high, low, volume"));
        assert!(check_columns(["open", "HIGH", " low", "close", "volume"]).is_ok());
    }

    #[test]
    fn all_nan_field_is_a_missing_column() {
        let mut b = bars();
        for bar in &mut b {
            bar.volume = f64::NAN;
        }
        assert_eq!(
            validate_bars(&b),
            Err(DataFormatError::MissingColumns {
                missing: vec!["volume".into()]
            })
        );
    }

    #[test]
    fn single_void_bar_is_invalid() {
        let mut b = bars();
        b[2].close = f64::NAN;
        assert!(matches!(
            validate_bars(&b),
            Err(DataFormatError::InvalidBar { index: 2, .. })
        ));
    }

    #[test]
    fn rejects_non_positive_low() {
        let mut b = bars();
        b[3] = Bar::new(ts(4), 100.0, 101.0, -5.0, 100.0, 1.0);
        assert!(matches!(
            validate_bars(&b),
            Err(DataFormatError::InvalidBar { index: 3, .. })
        ));
    }

    #[test]
    fn rejects_infinite_prices() {
        let mut b = bars();
        b[1].high = f64::INFINITY;
        assert!(matches!(
            validate_bars(&b),
            Err(DataFormatError::InvalidBar { index: 1, .. })
        ));

        let mut c = bars();
        c[4].close = f64::INFINITY;
        c[4].high = f64::INFINITY;
        assert!(matches!(
            validate_bars(&c),
            Err(DataFormatError::InvalidBar { index: 4, .. })
        ));
    }

    #[test]
    fn rejects_unsorted_and_duplicate_timestamps() {
        let mut b = bars();
        // [d1, d4, d3, d2, d5]: d4 >= d3 is the first violation.
        b.swap(1, 3);
        assert_eq!(validate_bars(&b), Err(DataFormatError::Unsorted { index: 2 }));

        let mut a = bars();
        a.swap(0, 1);
        assert_eq!(validate_bars(&a), Err(DataFormatError::Unsorted { index: 1 }));

        let mut d = bars();
        d[2].timestamp = d[1].timestamp;
        assert_eq!(validate_bars(&d), Err(DataFormatError::Unsorted { index: 2 }));
    }
}
