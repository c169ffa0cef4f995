//! Resource pools: mana, energy, rage, combo points and runic power.
//!
//! A pool always satisfies `0 <= current <= max`. Costs are rejected when the
//! pool cannot cover them unless the caller explicitly allows overdraw, in
//! which case the deduction is clamped at zero.
//!
//! Regeneration comes in two shapes:
//!
//! - [`Regen::PerTick`]: a discrete gain applied by a scheduled resource tick
//!   (energy +20 every 2 s).
//! - [`Regen::Continuous`]: a rate that is settled lazily whenever the pool is
//!   read or written, so no events are needed.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::InsufficientResource;
use crate::time::SimTime;

/// Kind of resource a pool holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ResourceKind {
    /// Caster mana.
    Mana,
    /// Rogue/feral energy.
    Energy,
    /// Warrior/bear rage.
    Rage,
    /// Combo points on the current target.
    ComboPoints,
    /// Runic power.
    RunicPower,
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Mana => "mana",
            Self::Energy => "energy",
            Self::Rage => "rage",
            Self::ComboPoints => "combo points",
            Self::RunicPower => "runic power",
        };
        f.write_str(name)
    }
}

/// Regeneration rule of a pool.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Regen {
    /// No passive regeneration.
    None,
    /// Gain `amount` every `interval`, driven by scheduled resource ticks.
    PerTick {
        /// Gain per tick.
        amount: f64,
        /// Time between ticks.
        interval: SimTime,
    },
    /// Gain `per_second` continuously, settled at read time.
    Continuous {
        /// Regeneration rate.
        per_second: f64,
    },
}

/// Whether a spend may exceed the current amount.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Overdraw {
    /// Reject the spend with [`InsufficientResource`].
    Deny,
    /// Deduct what is available and clamp at zero.
    Allow,
}

/// Declarative description of a pool, part of a player spec.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ResourcePoolSpec {
    /// Resource kind.
    pub kind: ResourceKind,
    /// Capacity.
    pub max: f64,
    /// Amount at encounter start (clamped into `[0, max]`).
    pub initial: f64,
    /// Regeneration rule.
    pub regen: Regen,
}

impl ResourcePoolSpec {
    /// A pool that starts full and does not regenerate.
    #[must_use]
    pub const fn full(kind: ResourceKind, max: f64) -> Self {
        Self {
            kind,
            max,
            initial: max,
            regen: Regen::None,
        }
    }

    /// A pool that starts empty and does not regenerate.
    #[must_use]
    pub const fn empty(kind: ResourceKind, max: f64) -> Self {
        Self {
            kind,
            max,
            initial: 0.0,
            regen: Regen::None,
        }
    }

    /// Builder-style regeneration rule.
    #[must_use]
    pub const fn with_regen(mut self, regen: Regen) -> Self {
        self.regen = regen;
        self
    }

    /// Checks capacity and regeneration values.
    ///
    /// # Errors
    ///
    /// Returns a human-readable reason when the pool is malformed.
    pub fn validate(&self) -> Result<(), String> {
        if !self.max.is_finite() || self.max <= 0.0 {
            return Err(format!("{} pool max must be positive, got {}", self.kind, self.max));
        }
        if !self.initial.is_finite() {
            return Err(format!("{} pool initial value is not finite", self.kind));
        }
        match self.regen {
            Regen::PerTick { amount, interval } => {
                if interval == SimTime::ZERO {
                    return Err(format!("{} regen interval must be non-zero", self.kind));
                }
                if !amount.is_finite() {
                    return Err(format!("{} regen amount is not finite", self.kind));
                }
            }
            Regen::Continuous { per_second } if !per_second.is_finite() => {
                return Err(format!("{} regen rate is not finite", self.kind));
            }
            _ => {}
        }
        Ok(())
    }
}

/// Per-pool bookkeeping for one iteration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ResourceMetrics {
    /// Total gained, including refunds and regeneration, excluding waste.
    pub gained: f64,
    /// Gains lost to the cap.
    pub wasted: f64,
    /// Total spent.
    pub spent: f64,
    /// Portion of `gained` that came from refunds.
    pub refunded: f64,
}

impl ResourceMetrics {
    /// Adds another iteration's bookkeeping into this one.
    pub fn accumulate(&mut self, other: &Self) {
        self.gained += other.gained;
        self.wasted += other.wasted;
        self.spent += other.spent;
        self.refunded += other.refunded;
    }
}

/// A typed resource meter owned by one actor.
///
/// # Example
///
/// ```
/// use raidsim_core::resource::{Overdraw, ResourceKind, ResourcePool, ResourcePoolSpec};
/// use raidsim_core::time::SimTime;
///
/// let mut rage = ResourcePool::from_spec(&ResourcePoolSpec::empty(ResourceKind::Rage, 100.0));
/// let now = SimTime::ZERO;
/// assert_eq!(rage.gain(now, 120.0), 100.0);
/// assert!(rage.spend(now, 30.0, Overdraw::Deny).is_ok());
/// assert_eq!(rage.current(now), 70.0);
/// assert!(rage.spend(now, 80.0, Overdraw::Deny).is_err());
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct ResourcePool {
    kind: ResourceKind,
    max: f64,
    current: f64,
    regen: Regen,
    /// Time up to which continuous regeneration has been applied.
    settled_at: SimTime,
    /// Time of the next scheduled per-tick gain, if any.
    next_tick_at: Option<SimTime>,
    metrics: ResourceMetrics,
}

impl ResourcePool {
    /// Builds a pool from its declarative spec.
    #[must_use]
    pub fn from_spec(spec: &ResourcePoolSpec) -> Self {
        Self {
            kind: spec.kind,
            max: spec.max,
            current: spec.initial.clamp(0.0, spec.max),
            regen: spec.regen,
            settled_at: SimTime::ZERO,
            next_tick_at: None,
            metrics: ResourceMetrics::default(),
        }
    }

    /// Resource kind.
    #[must_use]
    pub fn kind(&self) -> ResourceKind {
        self.kind
    }

    /// Capacity.
    #[must_use]
    pub fn max(&self) -> f64 {
        self.max
    }

    /// Regeneration rule.
    #[must_use]
    pub fn regen(&self) -> Regen {
        self.regen
    }

    /// Current amount as of `now`, including unsettled continuous regen.
    #[must_use]
    pub fn current(&self, now: SimTime) -> f64 {
        match self.regen {
            Regen::Continuous { per_second } => {
                let elapsed = (now - self.settled_at).as_secs_f64();
                (self.current + per_second * elapsed).clamp(0.0, self.max)
            }
            _ => self.current,
        }
    }

    /// Bookkeeping so far.
    #[must_use]
    pub fn metrics(&self) -> &ResourceMetrics {
        &self.metrics
    }

    /// Next scheduled per-tick gain.
    #[must_use]
    pub fn next_tick_at(&self) -> Option<SimTime> {
        self.next_tick_at
    }

    pub(crate) fn set_next_tick_at(&mut self, at: Option<SimTime>) {
        self.next_tick_at = at;
    }

    /// Applies continuous regeneration up to `now`.
    pub fn settle(&mut self, now: SimTime) {
        if now <= self.settled_at {
            return;
        }
        if let Regen::Continuous { per_second } = self.regen {
            let amount = per_second * (now - self.settled_at).as_secs_f64();
            self.settled_at = now;
            self.apply_gain(amount);
        } else {
            self.settled_at = now;
        }
    }

    /// Deducts `amount`.
    ///
    /// Returns the amount actually deducted, which is less than `amount` only
    /// when overdraw was allowed and the pool ran dry.
    ///
    /// # Errors
    ///
    /// Returns [`InsufficientResource`] when `amount` exceeds the current
    /// amount and overdraw is denied. The pool is unchanged in that case.
    pub fn spend(
        &mut self,
        now: SimTime,
        amount: f64,
        overdraw: Overdraw,
    ) -> Result<f64, InsufficientResource> {
        self.settle(now);
        if amount <= 0.0 {
            return Ok(0.0);
        }
        if amount > self.current {
            if overdraw == Overdraw::Deny {
                return Err(InsufficientResource {
                    kind: self.kind,
                    required: amount,
                    available: self.current,
                });
            }
            debug!(
                kind = %self.kind,
                requested = amount,
                available = self.current,
                "overdraw clamped at zero"
            );
        }
        let spent = amount.min(self.current);
        self.current -= spent;
        self.metrics.spent += spent;
        Ok(spent)
    }

    /// Deducts everything in the pool and returns how much that was.
    pub fn drain(&mut self, now: SimTime) -> f64 {
        self.settle(now);
        let spent = self.current;
        self.current = 0.0;
        self.metrics.spent += spent;
        spent
    }

    /// Adds `amount`, clamped to the cap. Returns the amount actually gained;
    /// the rest is recorded as waste.
    pub fn gain(&mut self, now: SimTime, amount: f64) -> f64 {
        self.settle(now);
        self.apply_gain(amount)
    }

    /// A gain booked as a refund.
    pub fn refund(&mut self, now: SimTime, amount: f64) -> f64 {
        let gained = self.gain(now, amount);
        self.metrics.refunded += gained;
        gained
    }

    /// Sets the pool to zero without booking a spend, as combo points do
    /// when they are consumed by a reset trigger.
    pub fn reset(&mut self, now: SimTime) {
        self.settle(now);
        self.current = 0.0;
    }

    fn apply_gain(&mut self, amount: f64) -> f64 {
        if amount <= 0.0 {
            return 0.0;
        }
        let room = self.max - self.current;
        let gained = amount.min(room);
        self.current += gained;
        self.metrics.gained += gained;
        self.metrics.wasted += amount - gained;
        gained
    }
}

/// An actor's pools, keyed by kind.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResourceSet {
    pools: BTreeMap<ResourceKind, ResourcePool>,
}

impl ResourceSet {
    /// Builds the pools declared by a player spec.
    #[must_use]
    pub fn from_specs(specs: &[ResourcePoolSpec]) -> Self {
        Self {
            pools: specs
                .iter()
                .map(|spec| (spec.kind, ResourcePool::from_spec(spec)))
                .collect(),
        }
    }

    /// Looks up a pool.
    #[must_use]
    pub fn get(&self, kind: ResourceKind) -> Option<&ResourcePool> {
        self.pools.get(&kind)
    }

    /// Looks up a pool mutably.
    pub fn get_mut(&mut self, kind: ResourceKind) -> Option<&mut ResourcePool> {
        self.pools.get_mut(&kind)
    }

    /// Pools in kind order.
    pub fn iter(&self) -> impl Iterator<Item = &ResourcePool> {
        self.pools.values()
    }

    /// Pools in kind order, mutably.
    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut ResourcePool> {
        self.pools.values_mut()
    }
}
