//! Error taxonomy for the simulation core.
//!
//! Three classes of failure exist and each has its own representation:
//!
//! - **Local conditions** (on cooldown, not enough rage): not errors at all.
//!   The cast pipeline returns a [`CastFailure`] value and the rotation picks
//!   something else.
//! - **Configuration errors** (malformed definitions, scheduling into the past,
//!   a stalled event loop): [`SimError`]. These abort the iteration and the
//!   whole run.
//! - **Run-level failures** reported by the driver: [`RunError`], which
//!   separates "could not run" from "ran but produced no samples".

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::actor::ActorId;
use crate::resource::ResourceKind;
use crate::stat::Stat;
use crate::time::SimTime;

/// Crate-wide result alias for fatal configuration errors.
pub type SimResult<T> = Result<T, SimError>;

/// Fatal configuration or programming error inside a simulation.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SimError {
    /// An action was scheduled before the current clock value.
    #[error("cannot schedule action at {at} before current time {now}")]
    ScheduledInPast {
        /// Clock value when scheduling was attempted.
        now: SimTime,
        /// Requested trigger time.
        at: SimTime,
    },

    /// A definition in an actor's kit failed validation.
    #[error("invalid definition `{label}` for actor `{actor}`: {reason}")]
    InvalidDefinition {
        /// Actor whose kit holds the definition.
        actor: String,
        /// Label of the offending definition.
        label: String,
        /// What is wrong with it.
        reason: String,
    },

    /// The encounter description is unusable.
    #[error("invalid encounter: {0}")]
    InvalidEncounter(String),

    /// A handle pointed outside the owning actor's tables.
    #[error("actor {actor} has no {kind} with index {index}")]
    UnknownHandle {
        /// Actor whose kit was searched.
        actor: ActorId,
        /// `"spell"`, `"aura"` or `"dot"`.
        kind: &'static str,
        /// Offending index.
        index: u16,
    },

    /// An actor id did not resolve.
    #[error("unknown actor {0}")]
    UnknownActor(ActorId),

    /// A resource referenced by a definition is missing from the actor.
    #[error("actor {actor} has no {kind} pool")]
    MissingResource {
        /// Actor lacking the pool.
        actor: ActorId,
        /// Resource kind that was required.
        kind: ResourceKind,
    },

    /// Run options are unusable.
    #[error("invalid options: {0}")]
    InvalidOptions(String),

    /// A multi-iteration request asked for zero iterations.
    #[error("iteration count must be at least 1")]
    ZeroIterations,

    /// A stat-weight increment was zero, negative or not finite.
    #[error("stat weight increment for {stat:?} must be positive and finite, got {increment}")]
    InvalidIncrement {
        /// Stat being perturbed.
        stat: Stat,
        /// Offending increment.
        increment: f64,
    },

    /// A stat-weight request referenced a player index that does not exist.
    #[error("no player at index {0}")]
    UnknownPlayer(usize),

    /// Too many actions executed without the clock advancing.
    #[error("event loop stalled at {at}: {events} actions without time advancing")]
    Stalled {
        /// Time at which the loop stopped making progress.
        at: SimTime,
        /// Actions executed at that instant.
        events: u32,
    },
}

/// A pool could not cover a cost.
#[derive(Debug, Clone, Copy, PartialEq, Error, Serialize, Deserialize)]
#[error("insufficient {kind}: need {required}, have {available}")]
pub struct InsufficientResource {
    /// Pool that was asked.
    pub kind: ResourceKind,
    /// Amount requested.
    pub required: f64,
    /// Amount available at the time.
    pub available: f64,
}

/// Why a spell could not be cast right now.
///
/// This is an expected, local condition: the rotation layer reacts to it by
/// choosing another action. It never aborts a simulation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum CastFailure {
    /// The actor is in the middle of another cast.
    Busy {
        /// When the current cast completes.
        until: SimTime,
    },
    /// The global cooldown is still running.
    OnGcd {
        /// When the GCD ends.
        ready_at: SimTime,
    },
    /// The spell's own cooldown is still running.
    OnCooldown {
        /// When the spell is ready again.
        ready_at: SimTime,
    },
    /// Not enough of the cost resource.
    Insufficient(InsufficientResource),
    /// An extra cast condition evaluated to false.
    ConditionFailed {
        /// Index of the failing condition in the spell definition.
        index: usize,
    },
    /// The spell needs an enemy target and the caster has none.
    NoTarget,
}

impl CastFailure {
    /// Earliest time this failure could resolve by waiting, when known.
    #[must_use]
    pub fn retry_at(&self) -> Option<SimTime> {
        match self {
            Self::Busy { until } => Some(*until),
            Self::OnGcd { ready_at } | Self::OnCooldown { ready_at } => Some(*ready_at),
            Self::Insufficient(_) | Self::ConditionFailed { .. } | Self::NoTarget => None,
        }
    }
}

/// Failure of a multi-iteration run, as reported by the driver.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RunError {
    /// The request was rejected before any iteration ran.
    #[error("invalid request: {0}")]
    InvalidRequest(#[source] SimError),

    /// An iteration hit a fatal configuration error; the run stopped.
    #[error("simulation failed in iteration {iteration}: {source}")]
    SimulationFailed {
        /// Index of the failing iteration.
        iteration: u32,
        /// Underlying error.
        #[source]
        source: SimError,
    },

    /// The run was cancelled or timed out before any iteration completed.
    #[error("simulation ran but produced no valid samples ({requested} requested)")]
    NoValidSamples {
        /// Iterations that were requested.
        requested: u32,
    },
}
