//! QuantBench Runner — drivers that issue many backtests.
//!
//! This crate builds on `quantbench-core` to provide:
//! - Objective selection over backtest metrics
//! - Exhaustive parallel grid search over strategy parameters
//! - Bootstrap Monte Carlo robustness simulation
//! - Deterministic per-trial RNG streams
//! - TOML runner configuration

pub mod config;
pub mod grid;
pub mod monte_carlo;
pub mod objective;
pub mod optimizer;
pub mod parallel;
pub mod rng;

pub use config::{ConfigError, RunnerConfig};
pub use grid::ParamGrid;
pub use monte_carlo::{
    synthesize_bars, MonteCarloSimulator, Perturbation, SimulationConfig, SimulationError,
    SimulationResult, SimulationStats,
};
pub use objective::{Objective, UnknownObjective};
pub use optimizer::{
    FailurePolicy, GridEvaluation, OptimizationResult, OptimizeError, OptimizerSettings,
    PointError, PointOutcome, StrategyOptimizer,
};
pub use parallel::Parallelism;
pub use rng::RngHierarchy;

#[cfg(test)]
mod send_sync_checks {
    use super::*;
    use quantbench_core::data::InMemoryProvider;

    fn assert_send<T: Send>() {}
    fn assert_sync<T: Sync>() {}

    #[test]
    fn results_are_send_sync() {
        assert_send::<OptimizationResult>();
        assert_sync::<OptimizationResult>();
        assert_send::<SimulationResult>();
        assert_sync::<SimulationResult>();
    }

    #[test]
    fn drivers_are_sync() {
        assert_sync::<StrategyOptimizer<'static, InMemoryProvider>>();
        assert_sync::<MonteCarloSimulator<'static, InMemoryProvider>>();
        assert_sync::<ParamGrid>();
        assert_send::<RngHierarchy>();
    }

    #[test]
    fn errors_are_send_sync() {
        assert_send::<OptimizeError>();
        assert_sync::<OptimizeError>();
        assert_send::<SimulationError>();
        assert_sync::<ConfigError>();
    }
}
