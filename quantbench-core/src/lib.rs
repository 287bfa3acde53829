//! QuantBench Core — market data, strategies and the backtest engine.
//!
//! This crate holds everything needed to replay one strategy over one
//! symbol's history:
//! - Domain types (bars, timeframes, signals, recommendations, trades)
//! - Historical data providers, preprocessing and validation
//! - The strategy contract, parameter sets and a name → factory registry
//! - Pure performance metrics
//! - The bar-by-bar backtest engine
//!
//! Drivers that run many backtests (grid search, Monte Carlo) live in
//! `quantbench-runner`.

pub mod data;
pub mod domain;
pub mod engine;
pub mod indicators;
pub mod metrics;
pub mod strategy;

pub use data::{HistoricalDataProvider, MarketData};
pub use domain::{Action, Bar, Recommendation, Side, Signal, Timeframe, Trade};
pub use engine::{BacktestEngine, BacktestError, BacktestResult, EngineConfig};
pub use metrics::Metrics;
pub use strategy::{Strategy, StrategyFactory, StrategyParams};
