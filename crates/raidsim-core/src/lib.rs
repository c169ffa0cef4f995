//! # Raidsim Core
//!
//! Deterministic discrete-event combat simulation for raid encounters.
//!
//! One iteration plays a whole encounter: players cast spells and swing
//! weapons at targets, auras and periodic effects come and go, resources
//! drain and refill. A Monte-Carlo driver repeats iterations with derived
//! seeds and folds the results into convergent DPS estimates and stat
//! weights.
//!
//! ## Architecture
//!
//! - **Definitions** ([`kit`], [`spell`], [`aura`], [`dot`], [`effect`]):
//!   immutable tables per actor, addressed by typed handles
//! - **State** ([`actor`], [`resource`], [`stat`]): per-iteration mutable
//!   state, owned by the [`simulation::Simulation`]
//! - **Clock** ([`queue`], [`time`]): a time-ordered action queue; the clock
//!   only moves when an action is dequeued
//! - **Policy** ([`rotation`], [`view`]): rotations see a read-only view
//!   and answer with a [`rotation::Decision`]
//! - **Aggregation** ([`driver`], [`metrics`]): per-iteration results and
//!   run-level statistics from `raidsim-stats`
//!
//! ## Determinism
//!
//! Same spec and same seed give bit-identical results. Every random draw
//! goes through one [`rng::SimRng`] per iteration, ties in the action queue
//! break by scheduling order, and all per-actor maps are `BTreeMap`s.
//!
//! ## Usage
//!
//! ```
//! use raidsim_core::actor::DefenseStats;
//! use raidsim_core::kit::Kit;
//! use raidsim_core::rotation::PriorityRotation;
//! use raidsim_core::simulation::run_one_iteration;
//! use raidsim_core::spec::{EncounterSpec, PlayerSpec, RotationSpec, SimSpec};
//! use raidsim_core::spell::{DamageFormula, GcdPolicy, SpellDefinition};
//! use raidsim_core::time::SimTime;
//!
//! let mut kit = Kit::new();
//! let strike = kit.add_spell(
//!     SpellDefinition::new("Strike")
//!         .with_formula(DamageFormula::flat(50.0, 50.0))
//!         .with_cooldown(SimTime::from_secs(1))
//!         .with_gcd(GcdPolicy::None),
//! );
//! let rotation = RotationSpec::Priority(PriorityRotation::new("strike").then_cast(strike));
//! let spec = SimSpec::new(
//!     EncounterSpec::single_target(SimTime::from_secs(10), DefenseStats::default()),
//!     vec![PlayerSpec::new("warrior", kit, rotation)],
//! );
//!
//! let result = run_one_iteration(&spec, 42).unwrap();
//! assert_eq!(result.players[0].ability("Strike").unwrap().casts, 11);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod actor;
pub mod aura;
pub mod config;
pub mod dot;
pub mod driver;
pub mod effect;
pub mod error;
pub mod kit;
pub mod log;
pub mod metrics;
pub mod outcome;
pub mod queue;
pub mod resource;
pub mod rng;
pub mod rotation;
pub mod simulation;
pub mod spec;
pub mod spell;
pub mod stat;
pub mod time;
pub mod view;

#[cfg(test)]
mod tests;

pub use config::SimOptions;
pub use driver::{
    compute_stat_weights, run_iterations, run_iterations_with_cancel, CancelToken, Convergence,
    RunResult, StatWeights, StatWeightsRequest,
};
pub use error::{CastFailure, RunError, SimError, SimResult};
pub use metrics::IterationResult;
pub use simulation::{run_one_iteration, Simulation};
pub use spec::{EncounterSpec, PlayerSpec, RotationSpec, SimSpec};
pub use time::SimTime;
