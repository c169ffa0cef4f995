//! Engine constants and run configuration.
//!
//! Constants describe the rules of combat the engine enforces; [`SimOptions`]
//! and [`StatWeightsRequest`](crate::driver::StatWeightsRequest) describe one
//! request and carry their own defaults.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::time::SimTime;

/// Global cooldown of spells using [`GcdPolicy::Default`](crate::spell::GcdPolicy::Default).
pub const DEFAULT_GCD: SimTime = SimTime::from_millis(1500);

/// Haste never pushes a GCD below this.
pub const MIN_GCD: SimTime = SimTime::from_millis(1000);

/// Delay before an actor with nothing to wait for re-evaluates its rotation.
pub const REACTION_DELAY: SimTime = SimTime::from_millis(100);

/// Shortest encounter after duration variation.
pub const MIN_ENCOUNTER: SimTime = SimTime::from_secs(1);

/// Actions allowed at a single instant before the loop is declared stalled.
pub const MAX_ACTIONS_PER_INSTANT: u32 = 10_000;

/// Armor constant `K` in `armor / (armor + K)`.
pub const DEFAULT_ARMOR_CONSTANT: f64 = 10_557.5;

/// Iterations of a DPS request when none are given.
pub const DEFAULT_ITERATIONS: u32 = 1_000;

/// Iterations of a stat-weight request when none are given.
pub const DEFAULT_STAT_WEIGHT_ITERATIONS: u32 = 5_000;

/// Base seed when none is given.
pub const DEFAULT_SEED: u64 = 101;

/// Iterations handed to the worker pool at a time; cancellation and the
/// wall-clock budget are checked between batches.
pub const DEFAULT_BATCH_SIZE: u32 = 64;

/// Default bucket width of DPS histograms.
pub const DPS_HISTOGRAM_BUCKET: f64 = 10.0;

/// Default relative 95% half-width under which raid DPS counts as converged.
pub const DEFAULT_CONVERGENCE_TOLERANCE: f64 = 0.01;

/// Options of a multi-iteration run.
///
/// # Example
///
/// ```
/// use raidsim_core::config::SimOptions;
///
/// let options = SimOptions::default().with_iterations(200).with_seed(7).sequential();
/// assert_eq!(options.iterations, 200);
/// assert!(!options.parallel);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimOptions {
    /// Number of iterations.
    pub iterations: u32,
    /// Base seed; iteration seeds are derived from it.
    pub seed: u64,
    /// Run batches on the rayon pool.
    pub parallel: bool,
    /// Keep the execution log of iteration 0.
    pub record_log: bool,
    /// Iterations per batch.
    pub batch_size: u32,
    /// Stop starting new batches after this much wall-clock time.
    pub max_wall_time: Option<Duration>,
    /// Bucket width of DPS histograms.
    pub histogram_bucket: f64,
    /// Relative 95% half-width of raid DPS at which a run reports converged.
    pub convergence_tolerance: f64,
}

impl Default for SimOptions {
    fn default() -> Self {
        Self {
            iterations: DEFAULT_ITERATIONS,
            seed: DEFAULT_SEED,
            parallel: true,
            record_log: false,
            batch_size: DEFAULT_BATCH_SIZE,
            max_wall_time: None,
            histogram_bucket: DPS_HISTOGRAM_BUCKET,
            convergence_tolerance: DEFAULT_CONVERGENCE_TOLERANCE,
        }
    }
}

impl SimOptions {
    /// Sets the iteration count.
    #[must_use]
    pub fn with_iterations(mut self, iterations: u32) -> Self {
        self.iterations = iterations;
        self
    }

    /// Sets the base seed.
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Runs on the calling thread.
    #[must_use]
    pub fn sequential(mut self) -> Self {
        self.parallel = false;
        self
    }

    /// Keeps the log of iteration 0.
    #[must_use]
    pub fn with_log(mut self) -> Self {
        self.record_log = true;
        self
    }

    /// Sets the batch size (at least one).
    #[must_use]
    pub fn with_batch_size(mut self, batch_size: u32) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    /// Sets the DPS histogram bucket width.
    #[must_use]
    pub fn with_histogram_bucket(mut self, width: f64) -> Self {
        self.histogram_bucket = width;
        self
    }

    /// Sets the convergence tolerance, as a fraction of mean raid DPS.
    #[must_use]
    pub fn with_convergence_tolerance(mut self, tolerance: f64) -> Self {
        self.convergence_tolerance = tolerance;
        self
    }

    /// Sets a wall-clock budget.
    #[must_use]
    pub fn with_max_wall_time(mut self, budget: Duration) -> Self {
        self.max_wall_time = Some(budget);
        self
    }
}
