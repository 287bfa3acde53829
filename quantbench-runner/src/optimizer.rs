//! Strategy optimizer — exhaustive grid search over strategy parameters.
//!
//! Every grid point is an independent backtest over the same immutable
//! market data, so points fan out across rayon workers with no shared
//! mutable state. Results are always exposed in grid order, so output is
//! identical for any thread count.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering as CmpOrdering;
use std::sync::atomic::{AtomicBool, Ordering};
use thiserror::Error;

use quantbench_core::data::{HistoricalDataProvider, MarketData};
use quantbench_core::domain::Timeframe;
use quantbench_core::engine::{BacktestEngine, BacktestError, BacktestResult};
use quantbench_core::strategy::{ParamError, StrategyFactory, StrategyParams};

use crate::grid::ParamGrid;
use crate::objective::Objective;
use crate::parallel::Parallelism;

/// What a sweep does when one grid point fails.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FailurePolicy {
    /// The first failing point in grid order aborts the sweep.
    #[default]
    Abort,
    /// Failures are recorded in the results and the sweep continues.
    Skip,
}

/// `[optimizer]` section of the runner config.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OptimizerSettings {
    pub objective: Objective,
    pub failure_policy: FailurePolicy,
    pub parallel: bool,
    pub max_threads: Option<usize>,
}

impl Default for OptimizerSettings {
    fn default() -> Self {
        Self {
            objective: Objective::default(),
            failure_policy: FailurePolicy::default(),
            parallel: true,
            max_threads: None,
        }
    }
}

impl OptimizerSettings {
    pub fn parallelism(&self) -> Parallelism {
        Parallelism {
            parallel: self.parallel,
            max_threads: self.max_threads,
        }
    }
}

/// Why a single grid point could not be scored.
#[derive(Debug, Error)]
pub enum PointError {
    #[error("could not build strategy: {0}")]
    Params(#[from] ParamError),

    #[error(transparent)]
    Backtest(#[from] BacktestError),
}

#[derive(Debug, Error)]
pub enum OptimizeError {
    #[error("failed to load market data: {0}")]
    Load(#[source] BacktestError),

    #[error("grid point {index} ({params}) failed: {source}")]
    PointFailed {
        index: usize,
        params: StrategyParams,
        #[source]
        source: PointError,
    },

    #[error("grid search cancelled")]
    Cancelled,

    #[error("failed to build worker pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum PointOutcome {
    Completed {
        score: f64,
        result: Box<BacktestResult>,
    },
    Failed {
        error: String,
    },
}

/// One evaluated grid point.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GridEvaluation {
    /// Position in grid enumeration order.
    pub index: usize,
    pub params: StrategyParams,
    pub outcome: PointOutcome,
}

impl GridEvaluation {
    pub fn score(&self) -> Option<f64> {
        match &self.outcome {
            PointOutcome::Completed { score, .. } => Some(*score),
            PointOutcome::Failed { .. } => None,
        }
    }

    pub fn result(&self) -> Option<&BacktestResult> {
        match &self.outcome {
            PointOutcome::Completed { result, .. } => Some(result),
            PointOutcome::Failed { .. } => None,
        }
    }

    pub fn error(&self) -> Option<&str> {
        match &self.outcome {
            PointOutcome::Failed { error } => Some(error),
            PointOutcome::Completed { .. } => None,
        }
    }

    pub fn is_completed(&self) -> bool {
        matches!(self.outcome, PointOutcome::Completed { .. })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptimizationResult {
    pub strategy: String,
    pub symbol: String,
    pub timeframe: Timeframe,
    pub objective: Objective,
    /// `None` when no grid point completed with a comparable score.
    pub best_params: Option<StrategyParams>,
    /// `-inf` when `best_params` is `None`.
    pub best_score: f64,
    pub best_index: Option<usize>,
    /// Every evaluated point, in grid order.
    pub all_results: Vec<GridEvaluation>,
}

impl OptimizationResult {
    pub fn best(&self) -> Option<&GridEvaluation> {
        self.best_index.and_then(|i| self.all_results.get(i))
    }

    pub fn completed(&self) -> impl Iterator<Item = &GridEvaluation> {
        self.all_results.iter().filter(|e| e.is_completed())
    }

    pub fn failures(&self) -> impl Iterator<Item = &GridEvaluation> {
        self.all_results.iter().filter(|e| !e.is_completed())
    }

    /// Completed points, best first. Ties keep grid order; NaN scores sort last.
    pub fn ranked(&self) -> Vec<&GridEvaluation> {
        let mut ranked: Vec<&GridEvaluation> = self.completed().collect();
        ranked.sort_by(|a, b| descending(a.score(), b.score()));
        ranked
    }

    pub fn top_n(&self, n: usize) -> Vec<&GridEvaluation> {
        let mut ranked = self.ranked();
        ranked.truncate(n);
        ranked
    }
}

fn descending(a: Option<f64>, b: Option<f64>) -> CmpOrdering {
    let a = a.unwrap_or(f64::NAN);
    let b = b.unwrap_or(f64::NAN);
    match (a.is_nan(), b.is_nan()) {
        (true, true) => CmpOrdering::Equal,
        (true, false) => CmpOrdering::Greater,
        (false, true) => CmpOrdering::Less,
        (false, false) => b.partial_cmp(&a).unwrap_or(CmpOrdering::Equal),
    }
}

/// Grid-search driver over a shared backtest engine.
pub struct StrategyOptimizer<'e, P: HistoricalDataProvider> {
    engine: &'e BacktestEngine<P>,
    objective: Objective,
    policy: FailurePolicy,
    parallelism: Parallelism,
    cancel: Option<&'e AtomicBool>,
}

impl<'e, P: HistoricalDataProvider> StrategyOptimizer<'e, P> {
    pub fn new(engine: &'e BacktestEngine<P>) -> Self {
        Self {
            engine,
            objective: Objective::default(),
            policy: FailurePolicy::default(),
            parallelism: Parallelism::default(),
            cancel: None,
        }
    }

    pub fn with_settings(self, settings: &OptimizerSettings) -> Self {
        self.with_objective(settings.objective)
            .with_failure_policy(settings.failure_policy)
            .with_parallelism(settings.parallelism())
    }

    pub fn with_objective(mut self, objective: Objective) -> Self {
        self.objective = objective;
        self
    }

    pub fn with_failure_policy(mut self, policy: FailurePolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_parallelism(mut self, parallelism: Parallelism) -> Self {
        self.parallelism = parallelism;
        self
    }

    /// Poll `flag` between points and inside every backtest.
    pub fn with_cancel(mut self, flag: &'e AtomicBool) -> Self {
        self.cancel = Some(flag);
        self
    }

    pub fn objective(&self) -> Objective {
        self.objective
    }

    /// Load the series once, then evaluate every grid point against it.
    ///
    /// Points are scored with the optimizer's objective, set through
    /// [`with_objective`](Self::with_objective) or
    /// [`with_settings`](Self::with_settings). Use
    /// [`grid_search_with`](Self::grid_search_with) to pass it per call.
    pub fn grid_search(
        &self,
        factory: &dyn StrategyFactory,
        grid: &ParamGrid,
        symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
        timeframe: Timeframe,
    ) -> Result<OptimizationResult, OptimizeError> {
        let data = self
            .engine
            .load(symbol, start, end, timeframe)
            .map_err(OptimizeError::Load)?;
        self.grid_search_on_data(factory, grid, &data)
    }

    /// [`grid_search`](Self::grid_search) scored with `objective` instead of
    /// the configured one.
    #[allow(clippy::too_many_arguments)]
    pub fn grid_search_with(
        &self,
        objective: Objective,
        factory: &dyn StrategyFactory,
        grid: &ParamGrid,
        symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
        timeframe: Timeframe,
    ) -> Result<OptimizationResult, OptimizeError> {
        let optimizer = StrategyOptimizer { objective, ..*self };
        optimizer.grid_search(factory, grid, symbol, start, end, timeframe)
    }

    pub fn grid_search_on_data(
        &self,
        factory: &dyn StrategyFactory,
        grid: &ParamGrid,
        data: &MarketData,
    ) -> Result<OptimizationResult, OptimizeError> {
        let points = grid.size();
        tracing::info!(
            strategy = factory.name(),
            symbol = data.symbol(),
            points,
            objective = %self.objective,
            parallel = self.parallelism.parallel,
            "grid search started"
        );

        let outcomes = self.parallelism.map_indexed(points, |index| {
            let params = grid.combination(index).unwrap_or_default();
            let outcome = self.evaluate(factory, &params, data);
            (params, outcome)
        })?;

        if self.is_cancelled() {
            return Err(OptimizeError::Cancelled);
        }

        let mut all_results = Vec::with_capacity(points);
        let mut best: Option<(usize, f64)> = None;
        for (index, (params, outcome)) in outcomes.into_iter().enumerate() {
            match outcome {
                Ok(result) => {
                    let score = self.objective.extract(&result.metrics);
                    tracing::debug!(index, params = %params, score, "grid point evaluated");
                    let improves = match best {
                        None => !score.is_nan(),
                        Some((_, best_score)) => self.objective.is_better(score, best_score),
                    };
                    if improves {
                        best = Some((index, score));
                    }
                    all_results.push(GridEvaluation {
                        index,
                        params,
                        outcome: PointOutcome::Completed {
                            score,
                            result: Box::new(result),
                        },
                    });
                }
                Err(source) => match self.policy {
                    FailurePolicy::Abort => {
                        return Err(OptimizeError::PointFailed {
                            index,
                            params,
                            source,
                        });
                    }
                    FailurePolicy::Skip => {
                        tracing::warn!(
                            index,
                            params = %params,
                            error = %source,
                            "grid point failed, skipping"
                        );
                        all_results.push(GridEvaluation {
                            index,
                            params,
                            outcome: PointOutcome::Failed {
                                error: source.to_string(),
                            },
                        });
                    }
                },
            }
        }

        let best_index = best.map(|(i, _)| i);
        let best_score = best.map_or(f64::NEG_INFINITY, |(_, s)| s);
        let best_params = best_index.map(|i| all_results[i].params.clone());

        tracing::info!(
            strategy = factory.name(),
            points,
            failed = all_results.iter().filter(|e| !e.is_completed()).count(),
            best_score,
            best_index,
            "grid search finished"
        );

        Ok(OptimizationResult {
            strategy: factory.name().to_string(),
            symbol: data.symbol().to_string(),
            timeframe: data.timeframe(),
            objective: self.objective,
            best_params,
            best_score,
            best_index,
            all_results,
        })
    }

    fn evaluate(
        &self,
        factory: &dyn StrategyFactory,
        params: &StrategyParams,
        data: &MarketData,
    ) -> Result<BacktestResult, PointError> {
        if self.is_cancelled() {
            return Err(BacktestError::Cancelled { bar_index: 0 }.into());
        }
        let strategy = factory.build(params)?;
        Ok(self.engine.run_on_data(strategy.as_ref(), data, self.cancel)?)
    }

    fn is_cancelled(&self) -> bool {
        self.cancel.is_some_and(|f| f.load(Ordering::Relaxed))
    }
}
