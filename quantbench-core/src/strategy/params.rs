//! Named strategy parameters.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ParamError {
    #[error("missing parameter '{name}'")]
    Missing { name: String },

    #[error("parameter '{name}' must be {expected}, got {found}")]
    WrongType {
        name: String,
        expected: &'static str,
        found: String,
    },

    #[error("invalid parameter '{name}': {reason}")]
    Invalid { name: String, reason: String },
}

/// One parameter value. Untagged so TOML/JSON literals map directly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

impl ParamValue {
    /// Numeric view; integers widen to f64.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            ParamValue::Int(i) => Some(*i as f64),
            ParamValue::Float(f) => Some(*f),
            _ => None,
        }
    }

    /// Integer view; floats qualify only when they are whole numbers.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            ParamValue::Int(i) => Some(*i),
            ParamValue::Float(f) if f.fract() == 0.0 && f.is_finite() => Some(*f as i64),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            ParamValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            ParamValue::Text(s) => Some(s),
            _ => None,
        }
    }
}

impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamValue::Bool(b) => write!(f, "{b}"),
            ParamValue::Int(i) => write!(f, "{i}"),
            ParamValue::Float(x) => write!(f, "{x}"),
            ParamValue::Text(s) => write!(f, "{s}"),
        }
    }
}

impl From<bool> for ParamValue {
    fn from(v: bool) -> Self {
        ParamValue::Bool(v)
    }
}

impl From<i64> for ParamValue {
    fn from(v: i64) -> Self {
        ParamValue::Int(v)
    }
}

impl From<i32> for ParamValue {
    fn from(v: i32) -> Self {
        ParamValue::Int(i64::from(v))
    }
}

impl From<f64> for ParamValue {
    fn from(v: f64) -> Self {
        ParamValue::Float(v)
    }
}

impl From<&str> for ParamValue {
    fn from(v: &str) -> Self {
        ParamValue::Text(v.to_string())
    }
}

impl From<String> for ParamValue {
    fn from(v: String) -> Self {
        ParamValue::Text(v)
    }
}

/// Name → value map, fixed once a strategy is built from it.
///
/// Keys iterate in sorted order, so `Display` and serialization are stable.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StrategyParams(BTreeMap<String, ParamValue>);

impl StrategyParams {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: impl Into<String>, value: impl Into<ParamValue>) -> Self {
        self.0.insert(name.into(), value.into());
        self
    }

    pub fn get(&self, name: &str) -> Option<&ParamValue> {
        self.0.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.0.contains_key(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ParamValue)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Entries of `self` overriding those of `defaults`.
    pub fn merged_over(&self, defaults: &StrategyParams) -> StrategyParams {
        let mut out = defaults.0.clone();
        out.extend(self.0.iter().map(|(k, v)| (k.clone(), v.clone())));
        StrategyParams(out)
    }

    pub fn get_f64(&self, name: &str) -> Result<f64, ParamError> {
        let v = self.require(name)?;
        v.as_f64().ok_or_else(|| wrong_type(name, "a number", v))
    }

    pub fn get_usize(&self, name: &str) -> Result<usize, ParamError> {
        let v = self.require(name)?;
        v.as_i64()
            .and_then(|i| usize::try_from(i).ok())
            .ok_or_else(|| wrong_type(name, "a non-negative integer", v))
    }

    pub fn get_str(&self, name: &str) -> Result<&str, ParamError> {
        let v = self.require(name)?;
        v.as_str().ok_or_else(|| wrong_type(name, "text", v))
    }

    pub fn get_f64_or(&self, name: &str, default: f64) -> Result<f64, ParamError> {
        if self.contains(name) {
            self.get_f64(name)
        } else {
            Ok(default)
        }
    }

    pub fn get_usize_or(&self, name: &str, default: usize) -> Result<usize, ParamError> {
        if self.contains(name) {
            self.get_usize(name)
        } else {
            Ok(default)
        }
    }

    fn require(&self, name: &str) -> Result<&ParamValue, ParamError> {
        self.0.get(name).ok_or_else(|| ParamError::Missing {
            name: name.to_string(),
        })
    }
}

fn wrong_type(name: &str, expected: &'static str, found: &ParamValue) -> ParamError {
    ParamError::WrongType {
        name: name.to_string(),
        expected,
        found: found.to_string(),
    }
}

impl fmt::Display for StrategyParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, (k, v)) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{k}={v}")?;
        }
        Ok(())
    }
}

impl<K: Into<String>, V: Into<ParamValue>> FromIterator<(K, V)> for StrategyParams {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        StrategyParams(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}
