//! Monte-Carlo driver and stat weights.
//!
//! Iterations are independent: each builds its own [`Simulation`] from the
//! shared [`SimSpec`] with a seed derived from the base seed and its index.
//! Batches run on the rayon pool, but results are always folded in
//! iteration-index order, so a parallel run and a sequential run with the
//! same seed produce identical aggregates and digests.
//!
//! # Example
//!
//! ```
//! use raidsim_core::actor::DefenseStats;
//! use raidsim_core::config::SimOptions;
//! use raidsim_core::driver::run_iterations;
//! use raidsim_core::kit::Kit;
//! use raidsim_core::rotation::PriorityRotation;
//! use raidsim_core::spec::{EncounterSpec, PlayerSpec, RotationSpec, SimSpec};
//! use raidsim_core::spell::{DamageFormula, SpellDefinition};
//! use raidsim_core::time::SimTime;
//!
//! let mut kit = Kit::new();
//! let bolt = kit.add_spell(SpellDefinition::new("Bolt").with_formula(DamageFormula::flat(90.0, 110.0)));
//! let rotation = RotationSpec::Priority(PriorityRotation::new("spam").then_cast(bolt));
//! let spec = SimSpec::new(
//!     EncounterSpec::single_target(SimTime::from_secs(30), DefenseStats::default()),
//!     vec![PlayerSpec::new("mage", kit, rotation)],
//! );
//!
//! let result = run_iterations(&spec, &SimOptions::default().with_iterations(20)).unwrap();
//! assert_eq!(result.completed, 20);
//! assert!(result.raid_dps.mean() > 0.0);
//! ```

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use rayon::prelude::*;
use raidsim_stats::{DistributionStats, Histogram, Z_95};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::config::{SimOptions, DEFAULT_SEED, DEFAULT_STAT_WEIGHT_ITERATIONS};
use crate::error::{RunError, SimError, SimResult};
use crate::log::{combine_digests, EventLog};
use crate::metrics::{AbilityMetrics, IterationResult};
use crate::resource::{ResourceKind, ResourceMetrics};
use crate::rng::iteration_seed;
use crate::simulation::Simulation;
use crate::spec::SimSpec;
use crate::stat::Stat;

// =============================================================================
// Cancellation
// =============================================================================

/// Cooperative cancellation flag shared with a running request.
///
/// Checked between batches; a batch in flight always finishes.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    /// A fresh, uncancelled token.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests cancellation.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    /// Whether cancellation was requested.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

// =============================================================================
// Results
// =============================================================================

/// Aggregates of one player over a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerSummary {
    /// Player name.
    pub name: String,
    /// Damage per second per iteration.
    pub dps: DistributionStats,
    /// Healing per second per iteration.
    pub hps: DistributionStats,
    /// Shape of the DPS distribution.
    pub dps_histogram: Histogram,
    /// Ability counters summed over all completed iterations.
    pub abilities: BTreeMap<String, AbilityMetrics>,
    /// Pool bookkeeping summed over all completed iterations.
    pub resources: BTreeMap<ResourceKind, ResourceMetrics>,
    /// Fraction of the encounter each aura was active, per iteration.
    pub aura_uptime: BTreeMap<String, DistributionStats>,
}

impl PlayerSummary {
    /// Mean counters of one ability per iteration, as `(casts, damage)`.
    #[must_use]
    pub fn ability_per_iteration(&self, label: &str, iterations: u32) -> Option<(f64, f64)> {
        let ability = self.abilities.get(label)?;
        let n = f64::from(iterations.max(1));
        #[allow(clippy::cast_precision_loss)]
        let casts = ability.casts as f64 / n;
        Some((casts, ability.damage / n))
    }
}

/// How well a run pinned down mean raid DPS.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Convergence {
    /// Standard error of mean raid DPS.
    pub std_error: f64,
    /// Half-width of the 95% confidence interval.
    pub half_width_95: f64,
    /// `half_width_95` relative to mean raid DPS.
    pub relative_error: f64,
    /// Tolerance the run was judged against.
    pub tolerance: f64,
    /// Whether `relative_error <= tolerance` with at least two samples.
    pub converged: bool,
}

impl Convergence {
    fn of(stats: &DistributionStats, tolerance: f64) -> Self {
        Self {
            std_error: stats.std_error(),
            half_width_95: stats.confidence_half_width(Z_95),
            relative_error: stats.relative_error(),
            tolerance,
            converged: stats.is_converged(tolerance),
        }
    }
}

/// Aggregated outcome of a multi-iteration run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunResult {
    /// Iterations requested.
    pub requested: u32,
    /// Iterations that completed and were aggregated.
    pub completed: u32,
    /// Whether cancellation or the wall-clock budget cut the run short.
    pub stopped_early: bool,
    /// Encounter length in seconds.
    pub duration: DistributionStats,
    /// Sum of all players' DPS.
    pub raid_dps: DistributionStats,
    /// Shape of the raid DPS distribution.
    pub raid_dps_histogram: Histogram,
    /// Convergence of mean raid DPS.
    pub convergence: Convergence,
    /// Per-player aggregates in raid order.
    pub players: Vec<PlayerSummary>,
    /// Digest over the per-iteration digests, in index order.
    pub trace_digest: u64,
    /// Execution log of iteration 0, when requested.
    pub log: Option<EventLog>,
}

impl RunResult {
    /// A player's summary by name.
    #[must_use]
    pub fn player(&self, name: &str) -> Option<&PlayerSummary> {
        self.players.iter().find(|p| p.name == name)
    }
}

/// Folds iteration results in index order.
struct Accumulator {
    duration: DistributionStats,
    raid_dps: DistributionStats,
    raid_dps_histogram: Histogram,
    players: Vec<PlayerSummary>,
    digests: Vec<u64>,
    log: Option<EventLog>,
}

impl Accumulator {
    fn new(spec: &SimSpec, bucket: f64) -> SimResult<Self> {
        let histogram = || Histogram::new(bucket).map_err(|e| SimError::InvalidOptions(e.to_string()));
        let players = spec
            .raid
            .iter()
            .map(|p| {
                Ok(PlayerSummary {
                    name: p.name.clone(),
                    dps: DistributionStats::empty(),
                    hps: DistributionStats::empty(),
                    dps_histogram: histogram()?,
                    abilities: BTreeMap::new(),
                    resources: BTreeMap::new(),
                    aura_uptime: BTreeMap::new(),
                })
            })
            .collect::<SimResult<Vec<_>>>()?;
        Ok(Self {
            duration: DistributionStats::empty(),
            raid_dps: DistributionStats::empty(),
            raid_dps_histogram: histogram()?,
            players,
            digests: Vec::new(),
            log: None,
        })
    }

    fn push(&mut self, mut result: IterationResult) {
        let raid_dps = result.raid_dps();
        self.duration.push(result.duration.as_secs_f64());
        self.raid_dps.push(raid_dps);
        self.raid_dps_histogram.record(raid_dps);
        self.digests.push(result.trace_digest);
        if self.log.is_none() {
            self.log = result.log.take();
        }

        let secs = result.duration.as_secs_f64();
        for (summary, metrics) in self.players.iter_mut().zip(&result.players) {
            let dps = metrics.dps(result.duration);
            summary.dps.push(dps);
            summary.hps.push(metrics.hps(result.duration));
            summary.dps_histogram.record(dps);
            for (label, ability) in &metrics.abilities {
                summary.abilities.entry(label.clone()).or_default().accumulate(ability);
            }
            for (kind, pool) in &metrics.resources {
                summary.resources.entry(*kind).or_default().accumulate(pool);
            }
            for (label, uptime) in &metrics.aura_uptime {
                let fraction = if secs > 0.0 { uptime.as_secs_f64() / secs } else { 0.0 };
                summary
                    .aura_uptime
                    .entry(label.clone())
                    .or_insert_with(DistributionStats::empty)
                    .push(fraction);
            }
        }
    }

    fn finish(self, requested: u32, stopped_early: bool, tolerance: f64) -> RunResult {
        #[allow(clippy::cast_possible_truncation)]
        let completed = self.digests.len() as u32;
        RunResult {
            requested,
            completed,
            stopped_early,
            duration: self.duration,
            convergence: Convergence::of(&self.raid_dps, tolerance),
            raid_dps: self.raid_dps,
            raid_dps_histogram: self.raid_dps_histogram,
            players: self.players,
            trace_digest: combine_digests(self.digests),
            log: self.log,
        }
    }
}

// =============================================================================
// Runs
// =============================================================================

/// Runs `options.iterations` independent iterations and aggregates them.
///
/// # Errors
///
/// - [`RunError::InvalidRequest`] for zero iterations, bad options or an
///   invalid spec
/// - [`RunError::SimulationFailed`] with the lowest failing iteration index
/// - [`RunError::NoValidSamples`] if nothing completed
pub fn run_iterations(spec: &SimSpec, options: &SimOptions) -> Result<RunResult, RunError> {
    run_iterations_with_cancel(spec, options, &CancelToken::new())
}

/// [`run_iterations`] with cooperative cancellation.
///
/// A cancelled or timed-out run returns the iterations completed so far with
/// `stopped_early` set.
///
/// # Errors
///
/// Same as [`run_iterations`].
pub fn run_iterations_with_cancel(
    spec: &SimSpec,
    options: &SimOptions,
    cancel: &CancelToken,
) -> Result<RunResult, RunError> {
    if options.iterations == 0 {
        return Err(RunError::InvalidRequest(SimError::ZeroIterations));
    }
    spec.validate().map_err(RunError::InvalidRequest)?;
    let tolerance = options.convergence_tolerance;
    if !tolerance.is_finite() || tolerance <= 0.0 {
        return Err(RunError::InvalidRequest(SimError::InvalidOptions(format!(
            "convergence tolerance must be positive, got {tolerance}"
        ))));
    }
    let mut acc = Accumulator::new(spec, options.histogram_bucket).map_err(RunError::InvalidRequest)?;

    info!(
        iterations = options.iterations,
        seed = options.seed,
        parallel = options.parallel,
        "starting run"
    );
    let started = Instant::now();
    let batch = options.batch_size.max(1);
    let mut stopped_early = false;
    let mut start = 0;

    while start < options.iterations {
        if cancel.is_cancelled() || options.max_wall_time.is_some_and(|budget| started.elapsed() >= budget) {
            stopped_early = true;
            break;
        }
        let end = start.saturating_add(batch).min(options.iterations);
        let run = |index: u32| {
            let seed = iteration_seed(options.seed, u64::from(index));
            Simulation::new(spec, seed, options.record_log && index == 0).and_then(Simulation::run)
        };
        let results: Vec<SimResult<IterationResult>> = if options.parallel {
            (start..end).into_par_iter().map(run).collect()
        } else {
            (start..end).map(run).collect()
        };

        for (index, result) in (start..end).zip(results) {
            let result = result.map_err(|source| RunError::SimulationFailed {
                iteration: index,
                source,
            })?;
            acc.push(result);
        }
        debug!(completed = end, "batch done");
        start = end;
    }

    let result = acc.finish(options.iterations, stopped_early, tolerance);
    if result.completed == 0 {
        return Err(RunError::NoValidSamples {
            requested: options.iterations,
        });
    }
    if stopped_early {
        warn!(
            completed = result.completed,
            requested = result.requested,
            "run stopped early"
        );
    }
    info!(
        completed = result.completed,
        raid_dps = result.raid_dps.mean(),
        std_error = result.convergence.std_error,
        relative_error = result.convergence.relative_error,
        converged = result.convergence.converged,
        elapsed_ms = started.elapsed().as_millis(),
        "run finished"
    );
    Ok(result)
}

// =============================================================================
// Stat weights
// =============================================================================

/// Which number a stat weight is measured against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WeightMetric {
    /// The perturbed player's DPS.
    Dps,
    /// The perturbed player's HPS.
    Hps,
    /// Summed raid DPS.
    RaidDps,
}

/// Request for stat weights of one player.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatWeightsRequest {
    /// Raid index of the player whose stats are perturbed.
    pub player: usize,
    /// Stats to weigh.
    pub stats: Vec<Stat>,
    /// Perturbation size; `None` uses each stat's default increment.
    pub increment: Option<f64>,
    /// Iterations per run (baseline and each perturbed run).
    pub iterations: u32,
    /// Base seed shared by every run.
    pub seed: u64,
    /// Measured number.
    pub metric: WeightMetric,
    /// Stat whose weight normalizes the equivalence points.
    pub reference_stat: Option<Stat>,
    /// Run batches on the rayon pool.
    pub parallel: bool,
}

impl StatWeightsRequest {
    /// DPS weights of `stats` for the player at `player`.
    #[must_use]
    pub fn new(player: usize, stats: Vec<Stat>) -> Self {
        Self {
            player,
            stats,
            increment: None,
            iterations: DEFAULT_STAT_WEIGHT_ITERATIONS,
            seed: DEFAULT_SEED,
            metric: WeightMetric::Dps,
            reference_stat: None,
            parallel: true,
        }
    }

    /// Sets one increment for every stat.
    #[must_use]
    pub fn with_increment(mut self, increment: f64) -> Self {
        self.increment = Some(increment);
        self
    }

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

    /// Sets the measured number.
    #[must_use]
    pub fn with_metric(mut self, metric: WeightMetric) -> Self {
        self.metric = metric;
        self
    }

    /// Normalizes equivalence points to `stat`.
    #[must_use]
    pub fn with_reference(mut self, stat: Stat) -> Self {
        self.reference_stat = Some(stat);
        self
    }

    /// Runs on the calling thread.
    #[must_use]
    pub fn sequential(mut self) -> Self {
        self.parallel = false;
        self
    }

    fn options(&self) -> SimOptions {
        SimOptions {
            iterations: self.iterations,
            seed: self.seed,
            parallel: self.parallel,
            ..SimOptions::default()
        }
    }

    fn increment_for(&self, stat: Stat) -> f64 {
        self.increment.unwrap_or_else(|| stat.default_increment())
    }

    fn validate(&self, spec: &SimSpec) -> SimResult<()> {
        if self.iterations == 0 {
            return Err(SimError::ZeroIterations);
        }
        if self.player >= spec.raid.len() {
            return Err(SimError::UnknownPlayer(self.player));
        }
        for stat in &self.stats {
            let increment = self.increment_for(*stat);
            if !increment.is_finite() || increment <= 0.0 {
                return Err(SimError::InvalidIncrement {
                    stat: *stat,
                    increment,
                });
            }
        }
        Ok(())
    }
}

/// Marginal value of one stat.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatWeight {
    /// Stat that was perturbed.
    pub stat: Stat,
    /// Perturbation size.
    pub increment: f64,
    /// Metric gained per point of the stat.
    pub weight: f64,
    /// Standard error of `weight`.
    pub std_error: f64,
    /// Metric distribution of the perturbed run.
    pub perturbed: DistributionStats,
    /// Weight relative to the reference stat's weight.
    pub ep: Option<f64>,
}

/// Result of a stat-weight request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatWeights {
    /// Measured number.
    pub metric: WeightMetric,
    /// Metric distribution of the unperturbed run.
    pub baseline: DistributionStats,
    /// One entry per requested stat, in request order.
    pub weights: Vec<StatWeight>,
}

impl StatWeights {
    /// The weight of one stat.
    #[must_use]
    pub fn weight(&self, stat: Stat) -> Option<&StatWeight> {
        self.weights.iter().find(|w| w.stat == stat)
    }
}

/// Estimates how much each stat is worth to one player.
///
/// Every run reuses the request seed, so baseline and perturbed iterations
/// see the same random streams and most of the noise cancels in the
/// difference. The reported standard error treats the runs as independent
/// and is therefore conservative.
///
/// # Errors
///
/// [`RunError::InvalidRequest`] for an invalid request or spec, otherwise any
/// error of [`run_iterations`].
pub fn compute_stat_weights(spec: &SimSpec, request: &StatWeightsRequest) -> Result<StatWeights, RunError> {
    request.validate(spec).map_err(RunError::InvalidRequest)?;
    let options = request.options();
    let measure = |result: &RunResult| -> DistributionStats {
        match request.metric {
            WeightMetric::RaidDps => result.raid_dps,
            WeightMetric::Dps => result.players.get(request.player).map_or_else(DistributionStats::empty, |p| p.dps),
            WeightMetric::Hps => result.players.get(request.player).map_or_else(DistributionStats::empty, |p| p.hps),
        }
    };

    let baseline = measure(&run_iterations(spec, &options)?);
    let mut weights = Vec::with_capacity(request.stats.len());
    for stat in &request.stats {
        let increment = request.increment_for(*stat);
        let perturbed_spec = spec
            .with_stat_delta(request.player, *stat, increment)
            .map_err(RunError::InvalidRequest)?;
        let perturbed = measure(&run_iterations(&perturbed_spec, &options)?);
        let weight = (perturbed.mean() - baseline.mean()) / increment;
        let std_error = baseline.std_error().hypot(perturbed.std_error()) / increment;
        debug!(?stat, weight, std_error, "stat weight");
        weights.push(StatWeight {
            stat: *stat,
            increment,
            weight,
            std_error,
            perturbed,
            ep: None,
        });
    }

    if let Some(reference) = request.reference_stat {
        let base = weights.iter().find(|w| w.stat == reference).map(|w| w.weight);
        if let Some(base) = base.filter(|b| *b != 0.0) {
            for weight in &mut weights {
                weight.ep = Some(weight.weight / base);
            }
        }
    }

    Ok(StatWeights {
        metric: request.metric,
        baseline,
        weights,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actor::DefenseStats;
    use crate::config::DEFAULT_CONVERGENCE_TOLERANCE;
    use crate::kit::Kit;
    use crate::rotation::PriorityRotation;
    use crate::spec::{EncounterSpec, PlayerSpec, RotationSpec};
    use crate::spell::{DamageFormula, PowerSource, SpellDefinition};
    use crate::time::SimTime;
    use std::time::Duration;

    fn spec() -> SimSpec {
        let mut kit = Kit::new();
        let bolt = kit.add_spell(
            SpellDefinition::new("Bolt")
                .with_formula(DamageFormula::flat(90.0, 110.0).with_power(PowerSource::SpellPower, 1.0)),
        );
        let rotation = RotationSpec::Priority(PriorityRotation::new("spam").then_cast(bolt));
        SimSpec::new(
            EncounterSpec::single_target(SimTime::from_secs(30), DefenseStats::default())
                .with_variation(SimTime::from_secs(3)),
            vec![PlayerSpec::new("mage", kit, rotation)],
        )
    }

    mod run_tests {
        use super::*;

        #[test]
        fn zero_iterations_is_rejected() {
            let err = run_iterations(&spec(), &SimOptions::default().with_iterations(0)).unwrap_err();
            assert_eq!(err, RunError::InvalidRequest(SimError::ZeroIterations));
        }

        #[test]
        fn bad_histogram_bucket_is_rejected() {
            let options = SimOptions::default().with_iterations(1).with_histogram_bucket(0.0);
            let err = run_iterations(&spec(), &options).unwrap_err();
            assert!(matches!(err, RunError::InvalidRequest(SimError::InvalidOptions(_))));
        }

        #[test]
        fn parallel_and_sequential_agree() {
            let options = SimOptions::default().with_iterations(50).with_batch_size(7);
            let parallel = run_iterations(&spec(), &options).unwrap();
            let sequential = run_iterations(&spec(), &options.clone().sequential()).unwrap();
            assert_eq!(parallel.trace_digest, sequential.trace_digest);
            assert_eq!(parallel.raid_dps, sequential.raid_dps);
            assert_eq!(parallel.players, sequential.players);
        }

        #[test]
        fn log_is_kept_only_on_request() {
            let options = SimOptions::default().with_iterations(3).sequential();
            assert!(run_iterations(&spec(), &options).unwrap().log.is_none());
            let logged = run_iterations(&spec(), &options.with_log()).unwrap();
            assert!(!logged.log.unwrap().is_empty());
        }

        #[test]
        fn cancelled_run_has_no_samples() {
            let cancel = CancelToken::new();
            cancel.cancel();
            let err = run_iterations_with_cancel(&spec(), &SimOptions::default(), &cancel).unwrap_err();
            assert_eq!(err, RunError::NoValidSamples { requested: 1_000 });
        }

        #[test]
        fn exhausted_budget_stops_after_first_batch_check() {
            let options = SimOptions::default()
                .with_iterations(10)
                .with_max_wall_time(Duration::ZERO);
            let err = run_iterations(&spec(), &options).unwrap_err();
            assert!(matches!(err, RunError::NoValidSamples { .. }));
        }

        #[test]
        fn convergence_is_reported_against_the_tolerance() {
            let options = SimOptions::default().with_iterations(200).sequential();
            let result = run_iterations(&spec(), &options).unwrap();
            let convergence = result.convergence;
            assert_eq!(convergence.tolerance, DEFAULT_CONVERGENCE_TOLERANCE);
            assert_eq!(convergence.std_error, result.raid_dps.std_error());
            assert!((convergence.half_width_95 - Z_95 * convergence.std_error).abs() < 1e-12);
            assert!(convergence.relative_error > 0.0);
            assert_eq!(convergence.converged, convergence.relative_error <= convergence.tolerance);

            let loose = run_iterations(&spec(), &options.clone().with_convergence_tolerance(0.5)).unwrap();
            assert!(loose.convergence.converged);
            let single = run_iterations(&spec(), &options.with_iterations(1).with_convergence_tolerance(0.5)).unwrap();
            assert!(!single.convergence.converged);
        }

        #[test]
        fn non_positive_tolerance_is_rejected() {
            let options = SimOptions::default().with_iterations(1).with_convergence_tolerance(0.0);
            let err = run_iterations(&spec(), &options).unwrap_err();
            assert!(matches!(err, RunError::InvalidRequest(SimError::InvalidOptions(_))));
        }

        #[test]
        fn summaries_track_abilities() {
            let options = SimOptions::default().with_iterations(10).sequential();
            let result = run_iterations(&spec(), &options).unwrap();
            let mage = result.player("mage").unwrap();
            assert_eq!(mage.dps.count(), 10);
            let (casts, damage) = mage.ability_per_iteration("Bolt", result.completed).unwrap();
            assert!(casts >= 18.0);
            assert!(damage > 0.0);
            assert_eq!(mage.dps_histogram.total(), 10);
        }
    }

    mod weight_tests {
        use super::*;

        #[test]
        fn invalid_requests_are_rejected() {
            let spec = spec();
            let unknown = StatWeightsRequest::new(4, vec![Stat::SpellPower]);
            assert_eq!(
                compute_stat_weights(&spec, &unknown).unwrap_err(),
                RunError::InvalidRequest(SimError::UnknownPlayer(4))
            );
            let negative = StatWeightsRequest::new(0, vec![Stat::SpellPower]).with_increment(-1.0);
            assert!(matches!(
                compute_stat_weights(&spec, &negative).unwrap_err(),
                RunError::InvalidRequest(SimError::InvalidIncrement { .. })
            ));
        }

        #[test]
        fn power_weight_matches_cast_rate() {
            let request = StatWeightsRequest::new(0, vec![Stat::SpellPower, Stat::Strength])
                .with_increment(10.0)
                .with_iterations(40)
                .with_reference(Stat::SpellPower);
            let weights = compute_stat_weights(&spec(), &request).unwrap();

            // one point of spell power adds one damage per 1.5 s cast
            let power = weights.weight(Stat::SpellPower).unwrap();
            assert!((power.weight - 1.0 / 1.5).abs() < 0.05, "weight {}", power.weight);
            assert_eq!(power.ep, Some(1.0));

            // common random numbers: an unused stat changes nothing
            let strength = weights.weight(Stat::Strength).unwrap();
            assert_eq!(strength.weight, 0.0);
            assert_eq!(strength.ep, Some(0.0));
        }

        #[test]
        fn doubling_iterations_halves_weight_variance() {
            let spec = spec();
            let variance = |iterations: u32, seed: u64| {
                let request = StatWeightsRequest::new(0, vec![Stat::SpellPower])
                    .with_increment(10.0)
                    .with_iterations(iterations)
                    .with_seed(seed)
                    .sequential();
                let weights = compute_stat_weights(&spec, &request).unwrap();
                weights.weight(Stat::SpellPower).unwrap().std_error.powi(2)
            };

            let seeds = 1..=6;
            let base: f64 = seeds.clone().map(|seed| variance(100, seed)).sum();
            let doubled: f64 = seeds.map(|seed| variance(200, seed)).sum();
            assert!(base > 0.0);
            let ratio = doubled / base;
            assert!((0.35..0.65).contains(&ratio), "variance ratio {ratio}");
        }
    }
}
