//! Flat, human-readable view of a backtest result.

use std::fmt;

use super::BacktestResult;

/// Ordered label → formatted value pairs, for printing and reports.
#[derive(Debug, Clone, PartialEq)]
pub struct Summary {
    entries: Vec<(&'static str, String)>,
}

impl Summary {
    pub fn from_result(r: &BacktestResult) -> Self {
        let m = &r.metrics;
        let entries = vec![
            ("Strategy", r.strategy.clone()),
            ("Symbol", r.symbol.clone()),
            ("Timeframe", r.timeframe.to_string()),
            ("Period", format!("{} to {}", r.start.date(), r.end.date())),
            ("Initial Capital", money(r.initial_capital)),
            ("Final Capital", money(r.final_capital)),
            ("Total Return", pct(r.total_return)),
            ("Sharpe Ratio", format!("{:.2}", m.sharpe_ratio)),
            ("Sortino Ratio", format!("{:.2}", m.sortino_ratio)),
            ("Max Drawdown", pct(m.max_drawdown)),
            ("Win Rate", pct(m.win_rate)),
            ("Profit Factor", format!("{:.2}", m.profit_factor)),
            ("Average Trade", money(m.avg_trade)),
            ("Total Trades", r.closing_trades().to_string()),
        ];
        Self { entries }
    }

    pub fn get(&self, label: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(l, _)| *l == label)
            .map(|(_, v)| v.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&'static str, &str)> {
        self.entries.iter().map(|(l, v)| (*l, v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl fmt::Display for Summary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let width = self.entries.iter().map(|(l, _)| l.len()).max().unwrap_or(0);
        for (label, value) in &self.entries {
            writeln!(f, "{label:<width$}  {value}")?;
        }
        Ok(())
    }
}

fn pct(x: f64) -> String {
    format!("{:.2}%", x * 100.0)
}

/// `$1,234.56`, with a leading minus for negatives.
fn money(x: f64) -> String {
    if !x.is_finite() {
        return format!("${x}");
    }
    let cents = (x.abs() * 100.0).round() as u128;
    let whole = (cents / 100).to_string();
    let mut grouped = String::with_capacity(whole.len() + whole.len() / 3);
    for (i, ch) in whole.chars().enumerate() {
        if i > 0 && (whole.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    let sign = if x < 0.0 && cents > 0 { "-" } else { "" };
    format!("{sign}${grouped}.{:02}", cents % 100)
}
