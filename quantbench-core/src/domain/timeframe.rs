//! Bar interval identifiers ("1d", "4h", "15m", "1w").

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

const TRADING_DAYS_PER_YEAR: f64 = 252.0;
const TRADING_HOURS_PER_DAY: f64 = 6.5;
const WEEKS_PER_YEAR: f64 = 52.0;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid timeframe '{0}': expected <count><m|h|d|w>, e.g. \"1d\" or \"15m\"")]
pub struct TimeframeError(pub String);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TimeUnit {
    Minute,
    Hour,
    Day,
    Week,
}

impl TimeUnit {
    fn suffix(self) -> char {
        match self {
            TimeUnit::Minute => 'm',
            TimeUnit::Hour => 'h',
            TimeUnit::Day => 'd',
            TimeUnit::Week => 'w',
        }
    }
}

/// Interval covered by one bar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Timeframe {
    count: u32,
    unit: TimeUnit,
}

impl Timeframe {
    pub const DAILY: Timeframe = Timeframe {
        count: 1,
        unit: TimeUnit::Day,
    };

    pub fn new(count: u32, unit: TimeUnit) -> Result<Self, TimeframeError> {
        if count == 0 {
            return Err(TimeframeError(format!("0{}", unit.suffix())));
        }
        Ok(Self { count, unit })
    }

    pub fn count(&self) -> u32 {
        self.count
    }

    pub fn unit(&self) -> TimeUnit {
        self.unit
    }

    /// Wall-clock length of one bar.
    pub fn duration(&self) -> chrono::Duration {
        let n = i64::from(self.count);
        match self.unit {
            TimeUnit::Minute => chrono::Duration::minutes(n),
            TimeUnit::Hour => chrono::Duration::hours(n),
            TimeUnit::Day => chrono::Duration::days(n),
            TimeUnit::Week => chrono::Duration::weeks(n),
        }
    }

    /// Trading bars per year, used to annualize per-bar ratios.
    ///
    /// Intraday counts assume a 6.5 hour session on 252 trading days.
    pub fn bars_per_year(&self) -> f64 {
        let per_unit = match self.unit {
            TimeUnit::Minute => TRADING_DAYS_PER_YEAR * TRADING_HOURS_PER_DAY * 60.0,
            TimeUnit::Hour => TRADING_DAYS_PER_YEAR * TRADING_HOURS_PER_DAY,
            TimeUnit::Day => TRADING_DAYS_PER_YEAR,
            TimeUnit::Week => WEEKS_PER_YEAR,
        };
        per_unit / f64::from(self.count)
    }
}

impl Default for Timeframe {
    fn default() -> Self {
        Self::DAILY
    }
}

impl fmt::Display for Timeframe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.count, self.unit.suffix())
    }
}

impl FromStr for Timeframe {
    type Err = TimeframeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let invalid = || TimeframeError(s.to_string());
        let suffix = trimmed.chars().last().ok_or_else(invalid)?;
        let unit = match suffix.to_ascii_lowercase() {
            'm' => TimeUnit::Minute,
            'h' => TimeUnit::Hour,
            'd' => TimeUnit::Day,
            'w' => TimeUnit::Week,
            _ => return Err(invalid()),
        };
        let digits = &trimmed[..trimmed.len() - suffix.len_utf8()];
        // A bare unit ("d") means one of it.
        let count = if digits.is_empty() {
            1
        } else {
            digits.parse::<u32>().map_err(|_| invalid())?
        };
        Timeframe::new(count, unit).map_err(|_| invalid())
    }
}

impl TryFrom<String> for Timeframe {
    type Error = TimeframeError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Timeframe> for String {
    fn from(tf: Timeframe) -> Self {
        tf.to_string()
    }
}
