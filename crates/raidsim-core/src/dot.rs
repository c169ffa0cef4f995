//! Periodic effects (dots and hots).
//!
//! A dot is an aura plus a tick schedule. Adding a dot to a kit registers a
//! backing aura automatically; the aura carries the active/stacks state and
//! the [`DotState`] on the bearer carries the tick counter and snapshot.
//!
//! Ticks are `number_of_ticks` events `tick_length` apart, the first one a
//! full interval after application. The final tick expires the dot, so the
//! backing aura never needs an expiration check of its own.

use serde::{Deserialize, Serialize};

use crate::actor::ActorId;
use crate::aura::{AuraDefinition, RefreshPolicy};
use crate::kit::DotId;
use crate::spell::PowerSource;
use crate::stat::School;
use crate::time::SimTime;

/// Whether tick magnitude is captured once or recomputed every tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SnapshotMode {
    /// Reuse the values captured at apply/refresh.
    Snapshot,
    /// Recompute from the caster's live state on every tick.
    Dynamic,
}

/// How a tick's outcome is decided.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TickOutcome {
    /// Every tick lands for its base magnitude.
    AlwaysHit,
    /// Every tick rolls against the snapshotted crit chance.
    RollCrit,
}

/// What re-applying an active dot does.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DotApplyPolicy {
    /// Reset the tick counter and re-snapshot.
    Refresh,
    /// Reset the tick counter, add a stack and re-snapshot.
    RefreshAndStack,
}

/// Immutable description of a periodic effect.
///
/// # Example
///
/// ```
/// use raidsim_core::dot::DotDefinition;
/// use raidsim_core::time::SimTime;
///
/// let dot = DotDefinition::new("Corruption", 5, SimTime::from_secs(3), 20.0);
/// assert_eq!(dot.duration(), SimTime::from_secs(15));
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DotDefinition {
    /// Display label; also the label of the backing aura.
    pub label: String,
    /// Ticks per application.
    pub number_of_ticks: u32,
    /// Interval between ticks.
    pub tick_length: SimTime,
    /// Maximum stacks of the backing aura; zero for a non-stacking dot.
    pub max_stacks: u32,
    /// Snapshot or dynamic magnitude.
    pub mode: SnapshotMode,
    /// Base magnitude per tick (per stack when stacking).
    pub base_tick: f64,
    /// Scaling with the caster's power, per tick.
    pub coefficient: f64,
    /// Power stat the coefficient scales with.
    pub power: PowerSource,
    /// Damage school.
    pub school: School,
    /// Outcome policy of each tick.
    pub outcome: TickOutcome,
    /// Critical tick multiplier.
    pub crit_multiplier: f64,
    /// Heals the target instead of damaging it.
    pub healing: bool,
    /// Re-application behaviour.
    pub apply: DotApplyPolicy,
}

impl DotDefinition {
    /// Creates a non-stacking snapshot dot that always hits.
    #[must_use]
    pub fn new(
        label: impl Into<String>,
        number_of_ticks: u32,
        tick_length: SimTime,
        base_tick: f64,
    ) -> Self {
        Self {
            label: label.into(),
            number_of_ticks,
            tick_length,
            max_stacks: 0,
            mode: SnapshotMode::Snapshot,
            base_tick,
            coefficient: 0.0,
            power: PowerSource::SpellPower,
            school: School::Shadow,
            outcome: TickOutcome::AlwaysHit,
            crit_multiplier: 1.5,
            healing: false,
            apply: DotApplyPolicy::Refresh,
        }
    }

    /// Sets the snapshot mode.
    #[must_use]
    pub fn with_mode(mut self, mode: SnapshotMode) -> Self {
        self.mode = mode;
        self
    }

    /// Sets the school.
    #[must_use]
    pub fn with_school(mut self, school: School) -> Self {
        self.school = school;
        self
    }

    /// Scales each tick with the caster's `power`.
    #[must_use]
    pub fn with_coefficient(mut self, power: PowerSource, coefficient: f64) -> Self {
        self.power = power;
        self.coefficient = coefficient;
        self
    }

    /// Sets the tick outcome policy.
    #[must_use]
    pub fn with_outcome(mut self, outcome: TickOutcome) -> Self {
        self.outcome = outcome;
        self
    }

    /// Makes the dot a stack-building bleed with `max_stacks` stacks.
    #[must_use]
    pub fn stacking(mut self, max_stacks: u32) -> Self {
        self.max_stacks = max_stacks;
        self.apply = DotApplyPolicy::RefreshAndStack;
        self
    }

    /// Turns the dot into a hot.
    #[must_use]
    pub fn healing(mut self) -> Self {
        self.healing = true;
        self.power = PowerSource::HealingPower;
        self
    }

    /// Full duration of one application.
    #[must_use]
    pub fn duration(&self) -> SimTime {
        self.tick_length.times(self.number_of_ticks)
    }

    /// The backing aura registered alongside this dot.
    ///
    /// It has no duration of its own: the dot machinery moves its expiration
    /// and expires it on the final tick.
    #[must_use]
    pub fn backing_aura(&self) -> AuraDefinition {
        AuraDefinition::new(self.label.clone(), None)
            .stacking(self.max_stacks)
            .with_refresh(RefreshPolicy::Reset)
    }

    /// Checks the definition.
    ///
    /// # Errors
    ///
    /// Returns a human-readable reason.
    pub fn validate(&self) -> Result<(), String> {
        if self.number_of_ticks == 0 {
            return Err("dot needs at least one tick".into());
        }
        if self.tick_length == SimTime::ZERO {
            return Err("tick length must be non-zero".into());
        }
        if !self.base_tick.is_finite() || !self.coefficient.is_finite() {
            return Err("tick magnitude is not finite".into());
        }
        if self.crit_multiplier < 1.0 {
            return Err("crit multiplier below 1".into());
        }
        Ok(())
    }
}

/// Values captured when a dot is applied or refreshed.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DotSnapshot {
    /// Magnitude per tick before multipliers, including stacks.
    pub base: f64,
    /// Caster-side multiplier (damage-dealt auras).
    pub attacker_multiplier: f64,
    /// Crit chance of each tick.
    pub crit_chance: f64,
}

/// Key of a dot instance on its bearer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct DotKey {
    /// Caster whose kit defines the dot.
    pub owner: ActorId,
    /// Handle into the owner's kit.
    pub dot: DotId,
}

impl DotKey {
    /// Creates a key.
    #[must_use]
    pub const fn new(owner: ActorId, dot: DotId) -> Self {
        Self { owner, dot }
    }
}

/// Per-iteration state of one dot instance on its bearer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DotState {
    /// Ticks left in the current application.
    pub ticks_remaining: u32,
    /// Time of the next pending tick.
    pub next_tick_at: SimTime,
    /// Captured magnitude.
    pub snapshot: DotSnapshot,
    /// Generation of the pending tick chain.
    pub generation: u64,
}

impl DotState {
    /// Whether the dot has ticks left.
    #[must_use]
    pub fn is_ticking(&self) -> bool {
        self.ticks_remaining > 0
    }

    /// Time of the final tick of the current application.
    #[must_use]
    pub fn last_tick_at(&self, def: &DotDefinition) -> SimTime {
        self.next_tick_at + def.tick_length.times(self.ticks_remaining.saturating_sub(1))
    }

    /// Starts a fresh tick chain at `now`.
    pub fn start(&mut self, def: &DotDefinition, now: SimTime, snapshot: DotSnapshot) {
        self.ticks_remaining = def.number_of_ticks;
        self.next_tick_at = now + def.tick_length;
        self.snapshot = snapshot;
        self.generation += 1;
    }

    /// Refreshes an active dot, keeping the pending tick in place.
    pub fn refresh(&mut self, def: &DotDefinition, snapshot: DotSnapshot) {
        self.ticks_remaining = def.number_of_ticks;
        self.snapshot = snapshot;
    }

    /// Stops the tick chain; any pending tick becomes stale.
    pub fn stop(&mut self) {
        self.ticks_remaining = 0;
        self.generation += 1;
    }
}

impl Default for DotState {
    fn default() -> Self {
        Self {
            ticks_remaining: 0,
            next_tick_at: SimTime::ZERO,
            snapshot: DotSnapshot {
                base: 0.0,
                attacker_multiplier: 1.0,
                crit_chance: 0.0,
            },
            generation: 0,
        }
    }
}
