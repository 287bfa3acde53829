//! Strategy that emits signals at fixed bar indices.
//!
//! Useful for pinning engine behavior in tests and for replaying an externally
//! decided trade list. The script is a comma-separated list of
//! `<bar>:<buy|sell>` entries, e.g. `"10:buy,20:sell"`.

use std::collections::BTreeMap;

use super::params::{ParamError, StrategyParams};
use super::registry::StrategyFactory;
use super::{Analysis, Strategy};
use crate::domain::{Bar, Side, Signal};

#[derive(Debug, Clone)]
pub struct Scripted {
    script: BTreeMap<usize, Side>,
    params: StrategyParams,
}

impl Scripted {
    pub const NAME: &'static str = "scripted";

    pub fn new(entries: impl IntoIterator<Item = (usize, Side)>) -> Self {
        let script: BTreeMap<usize, Side> = entries.into_iter().collect();
        let params = StrategyParams::new().with("script", render(&script));
        Self { script, params }
    }

    pub fn from_params(params: &StrategyParams) -> Result<Self, ParamError> {
        let raw = params.get_str("script")?;
        Ok(Self::new(parse(raw)?))
    }
}

fn render(script: &BTreeMap<usize, Side>) -> String {
    script
        .iter()
        .map(|(bar, side)| format!("{bar}:{side}"))
        .collect::<Vec<_>>()
        .join(",")
}

fn parse(raw: &str) -> Result<Vec<(usize, Side)>, ParamError> {
    let invalid = |reason: String| ParamError::Invalid {
        name: "script".into(),
        reason,
    };
    raw.split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(|entry| {
            let (bar, side) = entry
                .split_once(':')
                .ok_or_else(|| invalid(format!("'{entry}' is not <bar>:<side>")))?;
            let bar = bar
                .trim()
                .parse::<usize>()
                .map_err(|e| invalid(format!("bad bar index in '{entry}': {e}")))?;
            let side = match side.trim().to_ascii_lowercase().as_str() {
                "buy" => Side::Buy,
                "sell" => Side::Sell,
                other => return Err(invalid(format!("unknown side '{other}'"))),
            };
            Ok((bar, side))
        })
        .collect()
}

impl Strategy for Scripted {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn params(&self) -> &StrategyParams {
        &self.params
    }

    /// Scripted signals fire on exactly their bar.
    fn recency_window(&self) -> usize {
        1
    }

    fn analyze_window(&self, bars: &[Bar]) -> Analysis {
        let mut analysis = Analysis::default();
        for (&bar, side) in self.script.range(..bars.len()) {
            analysis
                .events
                .entry(side.to_string())
                .or_default()
                .push(bar);
        }
        analysis
    }

    fn signals_in_window(&self, bars: &[Bar]) -> Vec<Signal> {
        self.script
            .range(..bars.len())
            .map(|(&i, &side)| {
                Signal::new(i, bars[i].timestamp, side, 1.0, bars[i].close, "scripted")
            })
            .collect()
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ScriptedFactory;

impl StrategyFactory for ScriptedFactory {
    fn name(&self) -> &str {
        Scripted::NAME
    }

    fn build(&self, params: &StrategyParams) -> Result<Box<dyn Strategy>, ParamError> {
        Ok(Box::new(Scripted::from_params(params)?))
    }
}
