//! Index-ordered fan-out over rayon, with a sequential mode and an optional
//! thread cap.

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

/// How a driver spreads independent work items over threads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Parallelism {
    pub parallel: bool,
    /// Dedicated pool size; `None` uses the global rayon pool.
    pub max_threads: Option<usize>,
}

impl Default for Parallelism {
    fn default() -> Self {
        Self {
            parallel: true,
            max_threads: None,
        }
    }
}

impl Parallelism {
    pub fn sequential() -> Self {
        Self {
            parallel: false,
            max_threads: None,
        }
    }

    pub fn with_max_threads(threads: usize) -> Self {
        Self {
            parallel: true,
            max_threads: Some(threads),
        }
    }

    /// Evaluate `f(0..len)` and return the outputs in index order.
    pub fn map_indexed<T, F>(&self, len: usize, f: F) -> Result<Vec<T>, rayon::ThreadPoolBuildError>
    where
        T: Send,
        F: Fn(usize) -> T + Send + Sync,
    {
        if !self.parallel || len <= 1 {
            return Ok((0..len).map(f).collect());
        }
        match self.max_threads {
            Some(threads) => {
                let pool = rayon::ThreadPoolBuilder::new()
                    .num_threads(threads.max(1))
                    .build()?;
                Ok(pool.install(|| (0..len).into_par_iter().map(&f).collect()))
            }
            None => Ok((0..len).into_par_iter().map(f).collect()),
        }
    }
}
