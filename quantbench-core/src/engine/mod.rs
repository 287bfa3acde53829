//! Backtesting engine — replays a strategy over historical bars.
//!
//! For each bar in time order the engine asks the strategy for a
//! recommendation on the window ending at that bar, applies it to an
//! all-in long-only ledger at the bar's close, and marks equity. Metrics are
//! computed once the loop finishes.

pub mod config;
pub mod ledger;
pub mod loop_runner;
pub mod result;
pub mod session;
pub mod summary;

pub use config::EngineConfig;
pub use ledger::{Ledger, PositionState};
pub use loop_runner::{run_loop, LoopOutput};
pub use result::BacktestResult;
pub use session::BacktestSession;
pub use summary::Summary;

use chrono::NaiveDate;
use std::sync::atomic::AtomicBool;
use thiserror::Error;

use crate::data::{DataError, DataFormatError, HistoricalDataProvider, MarketData};
use crate::domain::Timeframe;
use crate::metrics::{self, Metrics};
use crate::strategy::Strategy;

#[derive(Debug, Error)]
pub enum BacktestError {
    #[error("no data available for {symbol} ({timeframe})")]
    DataUnavailable {
        symbol: String,
        timeframe: Timeframe,
        start: Option<NaiveDate>,
        end: Option<NaiveDate>,
    },

    #[error("malformed market data: {0}")]
    DataFormat(#[from] DataFormatError),

    #[error("data provider failed: {0}")]
    Provider(#[source] DataError),

    #[error("backtest cancelled at bar {bar_index}")]
    Cancelled { bar_index: usize },

    #[error("invalid engine config: {0}")]
    InvalidConfig(String),
}

impl From<DataError> for BacktestError {
    fn from(e: DataError) -> Self {
        match e {
            DataError::Unavailable {
                symbol,
                timeframe,
                start,
                end,
            } => BacktestError::DataUnavailable {
                symbol,
                timeframe,
                start: Some(start),
                end: Some(end),
            },
            DataError::Format(f) => BacktestError::DataFormat(f),
            other => BacktestError::Provider(other),
        }
    }
}

/// Stateless backtest driver over a data provider.
///
/// Shared by reference across optimizer and simulator workers; every run
/// builds its own ledger, so concurrent runs never interact.
#[derive(Debug)]
pub struct BacktestEngine<P: HistoricalDataProvider> {
    provider: P,
    config: EngineConfig,
}

impl<P: HistoricalDataProvider> BacktestEngine<P> {
    pub fn new(provider: P, config: EngineConfig) -> Self {
        Self { provider, config }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    /// Load and preprocess a series. Empty results are `DataUnavailable`.
    pub fn load(
        &self,
        symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
        timeframe: Timeframe,
    ) -> Result<MarketData, BacktestError> {
        let raw = self.provider.load(symbol, start, end, timeframe)?;
        let data = self.provider.preprocess(symbol, timeframe, raw)?;
        if data.is_empty() {
            return Err(BacktestError::DataUnavailable {
                symbol: symbol.to_string(),
                timeframe,
                start: Some(start),
                end: Some(end),
            });
        }
        tracing::debug!(
            provider = self.provider.name(),
            symbol,
            %timeframe,
            bars = data.len(),
            "market data loaded"
        );
        Ok(data)
    }

    pub fn run_backtest(
        &self,
        strategy: &dyn Strategy,
        symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
        timeframe: Timeframe,
    ) -> Result<BacktestResult, BacktestError> {
        let data = self.load(symbol, start, end, timeframe)?;
        self.run_on_data(strategy, &data, None)
    }

    /// Run over an already-prepared table (loaded once, or synthetic).
    pub fn run_on_data(
        &self,
        strategy: &dyn Strategy,
        data: &MarketData,
        cancel: Option<&AtomicBool>,
    ) -> Result<BacktestResult, BacktestError> {
        self.config.validate().map_err(BacktestError::InvalidConfig)?;
        let (Some(start), Some(end)) = (data.first_timestamp(), data.last_timestamp()) else {
            return Err(BacktestError::DataUnavailable {
                symbol: data.symbol().to_string(),
                timeframe: data.timeframe(),
                start: None,
                end: None,
            });
        };

        tracing::info!(
            strategy = strategy.name(),
            symbol = data.symbol(),
            bars = data.len(),
            "backtest started"
        );

        let out = run_loop(strategy, data, &self.config, cancel)?;
        let returns = metrics::period_returns(&out.equity_curve);
        let metrics = Metrics::compute(&out.equity_curve, &out.trades, self.config.bars_per_year);
        let final_capital = out
            .equity_curve
            .last()
            .copied()
            .unwrap_or(self.config.initial_capital);
        let total_return = final_capital / self.config.initial_capital - 1.0;

        tracing::info!(
            strategy = strategy.name(),
            symbol = data.symbol(),
            trades = out.trades.len(),
            final_capital,
            total_return,
            sharpe = metrics.sharpe_ratio,
            "backtest finished"
        );

        Ok(BacktestResult {
            strategy: strategy.name().to_string(),
            params: strategy.params().clone(),
            symbol: data.symbol().to_string(),
            timeframe: data.timeframe(),
            start,
            end,
            initial_capital: self.config.initial_capital,
            final_capital,
            total_return,
            commission: self.config.commission,
            trades: out.trades,
            equity_curve: out.equity_curve,
            returns,
            metrics,
        })
    }
}
