//! Signals and recommendations emitted by strategies.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Direction of a signal or an executed trade.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Buy,
    Sell,
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Buy => write!(f, "buy"),
            Side::Sell => write!(f, "sell"),
        }
    }
}

/// What a strategy recommends doing on the current bar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    #[default]
    Hold,
    Buy,
    Sell,
}

impl From<Side> for Action {
    fn from(side: Side) -> Self {
        match side {
            Side::Buy => Action::Buy,
            Side::Sell => Action::Sell,
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Action::Hold => write!(f, "hold"),
            Action::Buy => write!(f, "buy"),
            Action::Sell => write!(f, "sell"),
        }
    }
}

/// A directional event detected at a specific bar.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Signal {
    pub bar_index: usize,
    pub timestamp: NaiveDateTime,
    pub side: Side,
    /// Clamped to [0, 1].
    pub confidence: f64,
    pub price: f64,
    pub stop_loss: Option<f64>,
    pub take_profit: Option<f64>,
    /// Strategy-specific label, e.g. "golden_cross".
    pub kind: String,
}

impl Signal {
    pub fn new(
        bar_index: usize,
        timestamp: NaiveDateTime,
        side: Side,
        confidence: f64,
        price: f64,
        kind: impl Into<String>,
    ) -> Self {
        Self {
            bar_index,
            timestamp,
            side,
            confidence: clamp_confidence(confidence),
            price,
            stop_loss: None,
            take_profit: None,
            kind: kind.into(),
        }
    }

    pub fn with_stops(mut self, stop_loss: Option<f64>, take_profit: Option<f64>) -> Self {
        self.stop_loss = stop_loss;
        self.take_profit = take_profit;
        self
    }
}

/// Single actionable output of a strategy for the latest bar of a window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recommendation {
    pub action: Action,
    pub confidence: f64,
    pub target_price: Option<f64>,
    pub stop_loss: Option<f64>,
    pub take_profit: Option<f64>,
    pub reason: String,
}

impl Recommendation {
    /// A zero-confidence hold.
    pub fn hold(reason: impl Into<String>) -> Self {
        Self {
            action: Action::Hold,
            confidence: 0.0,
            target_price: None,
            stop_loss: None,
            take_profit: None,
            reason: reason.into(),
        }
    }

    pub fn from_signal(signal: &Signal) -> Self {
        Self {
            action: signal.side.into(),
            confidence: signal.confidence,
            target_price: Some(signal.price),
            stop_loss: signal.stop_loss,
            take_profit: signal.take_profit,
            reason: format!("{} at bar {}", signal.kind, signal.bar_index),
        }
    }

    pub fn is_hold(&self) -> bool {
        self.action == Action::Hold
    }
}

fn clamp_confidence(c: f64) -> f64 {
    if c.is_nan() {
        0.0
    } else {
        c.clamp(0.0, 1.0)
    }
}
