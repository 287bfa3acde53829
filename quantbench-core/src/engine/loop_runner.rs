//! The bar loop: one recommendation per bar, filled at that bar's close.

use std::sync::atomic::{AtomicBool, Ordering};

use super::ledger::Ledger;
use super::{BacktestError, EngineConfig};
use crate::data::MarketData;
use crate::domain::Trade;
use crate::strategy::Strategy;

/// Raw output of the bar loop, before metrics.
#[derive(Debug, Clone)]
pub struct LoopOutput {
    pub trades: Vec<Trade>,
    /// One mark-to-market equity value per bar.
    pub equity_curve: Vec<f64>,
}

/// Walk the table's bars in order. At bar `i` the strategy sees only
/// `bars[..=i]`.
///
/// `cancel` is polled before every bar; a raised flag stops the run with
/// [`BacktestError::Cancelled`].
pub fn run_loop(
    strategy: &dyn Strategy,
    data: &MarketData,
    config: &EngineConfig,
    cancel: Option<&AtomicBool>,
) -> Result<LoopOutput, BacktestError> {
    let bars = data.bars();
    let mut ledger = Ledger::new(config.initial_capital, config.commission);
    let mut equity_curve = Vec::with_capacity(bars.len());

    for (i, bar) in bars.iter().enumerate() {
        if cancel.is_some_and(|f| f.load(Ordering::Relaxed)) {
            return Err(BacktestError::Cancelled { bar_index: i });
        }

        let recommendation = strategy.recommend_on_prefix(&bars[..=i]);
        if let Some(trade) = ledger.apply(recommendation.action, i, bar) {
            tracing::debug!(
                bar = i,
                side = %trade.side,
                price = trade.price,
                size = trade.size,
                capital = trade.capital,
                "trade executed"
            );
        }
        equity_curve.push(ledger.equity(bar.close));
    }

    Ok(LoopOutput {
        trades: ledger.into_trades(),
        equity_curve,
    })
}
