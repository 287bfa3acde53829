//! Monte Carlo simulator — bootstrap robustness of a strategy's edge.
//!
//! Each trial resamples the historical per-bar returns with replacement,
//! compounds them into a synthetic close path starting from the real first
//! close, perturbs open/high/low/volume around it, and runs a full backtest
//! on the result. Trials draw from per-trial RNG streams derived from one
//! master seed, so the whole run is reproducible and independent of how
//! trials are scheduled across threads.

use chrono::NaiveDate;
use rand::Rng;
use rand_distr::{Distribution, Normal};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use thiserror::Error;

use quantbench_core::data::{HistoricalDataProvider, MarketData};
use quantbench_core::domain::{Bar, Timeframe};
use quantbench_core::engine::{BacktestEngine, BacktestError, BacktestResult};
use quantbench_core::metrics::{mean_f64, percentile_sorted, population_std_dev, Metrics};
use quantbench_core::strategy::{Strategy, StrategyParams};

use crate::parallel::Parallelism;
use crate::rng::RngHierarchy;

const TRIAL_STREAM: &str = "monte_carlo_trial";

#[derive(Debug, Error)]
pub enum SimulationError {
    #[error("n_trials must be at least 1")]
    NoTrials,

    #[error("need at least 2 bars to resample returns, got {bars}")]
    InsufficientData { bars: usize },

    #[error("invalid perturbation: {0}")]
    InvalidPerturbation(String),

    #[error("failed to load market data: {0}")]
    Load(#[source] BacktestError),

    #[error("trial {trial} failed: {source}")]
    TrialFailed {
        trial: usize,
        #[source]
        source: BacktestError,
    },

    #[error("simulation cancelled")]
    Cancelled,

    #[error("failed to build worker pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
}

/// Relative noise applied around each synthetic close.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Perturbation {
    /// Std of `open / close - 1`.
    pub open_sigma: f64,
    /// Std of the distance from close to high and to low.
    pub range_sigma: f64,
    /// Std of the multiplicative volume noise.
    pub volume_sigma: f64,
}

impl Default for Perturbation {
    fn default() -> Self {
        Self {
            open_sigma: 0.001,
            range_sigma: 0.002,
            volume_sigma: 0.1,
        }
    }
}

impl Perturbation {
    pub fn validate(&self) -> Result<(), SimulationError> {
        for (name, sigma) in [
            ("open_sigma", self.open_sigma),
            ("range_sigma", self.range_sigma),
            ("volume_sigma", self.volume_sigma),
        ] {
            if !sigma.is_finite() || sigma < 0.0 {
                return Err(SimulationError::InvalidPerturbation(format!(
                    "{name} must be finite and >= 0, got {sigma}"
                )));
            }
        }
        if self.open_sigma >= 0.5 || self.range_sigma >= 0.5 {
            return Err(SimulationError::InvalidPerturbation(
                "open_sigma and range_sigma must be below 0.5".into(),
            ));
        }
        Ok(())
    }
}

/// `[simulation]` section of the runner config.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    pub n_trials: usize,
    /// Master seed; drawn from entropy and recorded when absent.
    pub seed: Option<u64>,
    pub parallel: bool,
    pub max_threads: Option<usize>,
    pub perturbation: Perturbation,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            n_trials: 1000,
            seed: None,
            parallel: true,
            max_threads: None,
            perturbation: Perturbation::default(),
        }
    }
}

impl SimulationConfig {
    pub fn parallelism(&self) -> Parallelism {
        Parallelism {
            parallel: self.parallel,
            max_threads: self.max_threads,
        }
    }
}

/// Cross-trial aggregates. Stds are population stds over trials.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SimulationStats {
    pub mean_final_equity: f64,
    pub std_final_equity: f64,
    pub min_final_equity: f64,
    pub max_final_equity: f64,
    pub p5_final_equity: f64,
    pub p50_final_equity: f64,
    pub p95_final_equity: f64,
    /// Fraction of trials ending below the initial capital.
    pub probability_of_loss: f64,
    pub mean_sharpe: f64,
    pub mean_max_drawdown: f64,
    pub mean_win_rate: f64,
}

impl SimulationStats {
    pub fn from_trials(initial_capital: f64, final_equities: &[f64], metrics: &[Metrics]) -> Self {
        let mut sorted = final_equities.to_vec();
        sorted.sort_by(|a, b| a.total_cmp(b));

        let losses = final_equities.iter().filter(|&&e| e < initial_capital).count();
        let probability_of_loss = if final_equities.is_empty() {
            0.0
        } else {
            losses as f64 / final_equities.len() as f64
        };

        let field = |f: fn(&Metrics) -> f64| -> f64 {
            let values: Vec<f64> = metrics.iter().map(f).collect();
            mean_f64(&values)
        };

        Self {
            mean_final_equity: mean_f64(final_equities),
            std_final_equity: population_std_dev(final_equities),
            min_final_equity: sorted.first().copied().unwrap_or(0.0),
            max_final_equity: sorted.last().copied().unwrap_or(0.0),
            p5_final_equity: percentile_sorted(&sorted, 5.0),
            p50_final_equity: percentile_sorted(&sorted, 50.0),
            p95_final_equity: percentile_sorted(&sorted, 95.0),
            probability_of_loss,
            mean_sharpe: field(|m| m.sharpe_ratio),
            mean_max_drawdown: field(|m| m.max_drawdown),
            mean_win_rate: field(|m| m.win_rate),
        }
    }
}

/// Outcome of one `run_simulation` call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationResult {
    pub strategy: String,
    pub params: StrategyParams,
    pub symbol: String,
    pub timeframe: Timeframe,
    pub n_trials: usize,
    /// Master seed actually used; replaying with it reproduces the run.
    pub seed: u64,
    pub initial_capital: f64,
    /// One equity curve per trial, in trial order.
    pub equity_curves: Vec<Vec<f64>>,
    pub final_equities: Vec<f64>,
    pub metrics: Vec<Metrics>,
    pub statistics: SimulationStats,
}

/// Build one synthetic series from `data`'s return distribution.
///
/// Keeps the real timestamps and the real first close. High and low are
/// widened to contain open and close; volume never goes negative.
pub fn synthesize_bars<R: Rng>(
    data: &MarketData,
    rng: &mut R,
    perturbation: &Perturbation,
) -> Result<Vec<Bar>, SimulationError> {
    let returns = data.sample_returns();
    let bars = data.bars();
    let (Some(first), false) = (bars.first(), returns.is_empty()) else {
        return Err(SimulationError::InsufficientData { bars: bars.len() });
    };

    let noise = |sigma: f64| {
        Normal::new(0.0, sigma).map_err(|e| SimulationError::InvalidPerturbation(e.to_string()))
    };
    let open_noise = noise(perturbation.open_sigma)?;
    let range_noise = noise(perturbation.range_sigma)?;
    let volume_noise = noise(perturbation.volume_sigma)?;

    let mut synthetic = Vec::with_capacity(bars.len());
    let mut close = first.close;
    for (i, bar) in bars.iter().enumerate() {
        if i > 0 {
            let r = returns[rng.gen_range(0..returns.len())];
            close *= 1.0 + r;
        }
        let open = close * (1.0 + open_noise.sample(rng));
        let high = (close * (1.0 + range_noise.sample(rng).abs())).max(open).max(close);
        let low = (close * (1.0 - range_noise.sample(rng).abs())).min(open).min(close);
        let volume = (bar.volume * (1.0 + volume_noise.sample(rng))).max(0.0);
        synthetic.push(Bar::new(bar.timestamp, open, high, low, close, volume));
    }
    Ok(synthetic)
}

/// Runs bootstrap trials against a shared engine and keeps every result.
pub struct MonteCarloSimulator<'e, P: HistoricalDataProvider> {
    engine: &'e BacktestEngine<P>,
    config: SimulationConfig,
    cancel: Option<&'e AtomicBool>,
    history: Vec<SimulationResult>,
}

impl<'e, P: HistoricalDataProvider> MonteCarloSimulator<'e, P> {
    pub fn new(engine: &'e BacktestEngine<P>) -> Self {
        Self::with_config(engine, SimulationConfig::default())
    }

    pub fn with_config(engine: &'e BacktestEngine<P>, config: SimulationConfig) -> Self {
        Self {
            engine,
            config,
            cancel: None,
            history: Vec::new(),
        }
    }

    pub fn with_cancel(mut self, flag: &'e AtomicBool) -> Self {
        self.cancel = Some(flag);
        self
    }

    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    /// Every completed simulation, oldest first.
    pub fn history(&self) -> &[SimulationResult] {
        &self.history
    }

    #[allow(clippy::too_many_arguments)]
    pub fn run_simulation(
        &mut self,
        strategy: &dyn Strategy,
        symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
        timeframe: Timeframe,
        n_trials: usize,
        seed: Option<u64>,
    ) -> Result<&SimulationResult, SimulationError> {
        let data = self
            .engine
            .load(symbol, start, end, timeframe)
            .map_err(SimulationError::Load)?;
        self.run_simulation_on_data(strategy, &data, n_trials, seed)
    }

    /// Run with `n_trials` and `seed` taken from the simulator's config.
    pub fn run_configured(
        &mut self,
        strategy: &dyn Strategy,
        data: &MarketData,
    ) -> Result<&SimulationResult, SimulationError> {
        let SimulationConfig { n_trials, seed, .. } = self.config;
        self.run_simulation_on_data(strategy, data, n_trials, seed)
    }

    pub fn run_simulation_on_data(
        &mut self,
        strategy: &dyn Strategy,
        data: &MarketData,
        n_trials: usize,
        seed: Option<u64>,
    ) -> Result<&SimulationResult, SimulationError> {
        let result = self.simulate(strategy, data, n_trials, seed)?;
        let slot = self.history.len();
        self.history.push(result);
        Ok(&self.history[slot])
    }

    fn simulate(
        &self,
        strategy: &dyn Strategy,
        data: &MarketData,
        n_trials: usize,
        seed: Option<u64>,
    ) -> Result<SimulationResult, SimulationError> {
        if n_trials == 0 {
            return Err(SimulationError::NoTrials);
        }
        if data.len() < 2 {
            return Err(SimulationError::InsufficientData { bars: data.len() });
        }
        let perturbation = self.config.perturbation;
        perturbation.validate()?;

        let rngs = match seed {
            Some(seed) => RngHierarchy::new(seed),
            None => RngHierarchy::from_entropy(),
        };
        tracing::info!(
            strategy = strategy.name(),
            symbol = data.symbol(),
            bars = data.len(),
            n_trials,
            seed = rngs.master_seed(),
            "monte carlo simulation started"
        );

        let parallelism = self.config.parallelism();
        let outcomes = parallelism.map_indexed(n_trials, |trial| {
            self.run_trial(strategy, data, &rngs, trial, &perturbation)
        })?;

        if self.is_cancelled() {
            return Err(SimulationError::Cancelled);
        }

        let mut equity_curves = Vec::with_capacity(n_trials);
        let mut final_equities = Vec::with_capacity(n_trials);
        let mut metrics = Vec::with_capacity(n_trials);
        for outcome in outcomes {
            let result = outcome?;
            final_equities.push(result.final_capital);
            metrics.push(result.metrics);
            equity_curves.push(result.equity_curve);
        }

        let initial_capital = self.engine.config().initial_capital;
        let statistics = SimulationStats::from_trials(initial_capital, &final_equities, &metrics);
        tracing::info!(
            strategy = strategy.name(),
            n_trials,
            mean_final_equity = statistics.mean_final_equity,
            probability_of_loss = statistics.probability_of_loss,
            "monte carlo simulation finished"
        );

        Ok(SimulationResult {
            strategy: strategy.name().to_string(),
            params: strategy.params().clone(),
            symbol: data.symbol().to_string(),
            timeframe: data.timeframe(),
            n_trials,
            seed: rngs.master_seed(),
            initial_capital,
            equity_curves,
            final_equities,
            metrics,
            statistics,
        })
    }

    fn run_trial(
        &self,
        strategy: &dyn Strategy,
        data: &MarketData,
        rngs: &RngHierarchy,
        trial: usize,
        perturbation: &Perturbation,
    ) -> Result<BacktestResult, SimulationError> {
        if self.is_cancelled() {
            return Err(SimulationError::Cancelled);
        }
        let mut rng = rngs.rng_for(TRIAL_STREAM, trial as u64);
        let bars = synthesize_bars(data, &mut rng, perturbation)?;
        let failed = |source: BacktestError| match source {
            BacktestError::Cancelled { .. } => SimulationError::Cancelled,
            source => SimulationError::TrialFailed { trial, source },
        };
        let synthetic = MarketData::from_bars(data.symbol(), data.timeframe(), bars)
            .map_err(|e| failed(e.into()))?;
        self.engine
            .run_on_data(strategy, &synthetic, self.cancel)
            .map_err(failed)
    }

    fn is_cancelled(&self) -> bool {
        self.cancel.is_some_and(|f| f.load(Ordering::Relaxed))
    }
}
