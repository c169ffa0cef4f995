//! Per-iteration metrics.
//!
//! Actors tally counters under internal [`AbilityKey`]s while the loop runs;
//! when the iteration finishes the tallies are converted into label-keyed
//! [`ActorMetrics`] inside an immutable [`IterationResult`].

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::kit::{DotId, SpellId};
use crate::log::EventLog;
use crate::outcome::{HitOutcome, RollResult};
use crate::resource::{ResourceKind, ResourceMetrics};
use crate::time::SimTime;

/// Label used for white swings.
pub const MELEE_LABEL: &str = "Melee";

/// Internal key of an ability tally.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum AbilityKey {
    /// A spell from the actor's kit.
    Spell(SpellId),
    /// A dot from the actor's kit.
    Dot(DotId),
    /// Auto-attack swings.
    Melee,
}

/// Counters for one ability in one iteration (or summed over many).
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct AbilityMetrics {
    /// Casts started (or swings taken).
    pub casts: u64,
    /// Normal hits.
    pub hits: u64,
    /// Critical hits.
    pub crits: u64,
    /// Misses.
    pub misses: u64,
    /// Dodges.
    pub dodges: u64,
    /// Parries.
    pub parries: u64,
    /// Blocked hits.
    pub blocks: u64,
    /// Full resists.
    pub resists: u64,
    /// Landed hits that were partially resisted.
    pub partial_resists: u64,
    /// Periodic ticks.
    pub ticks: u64,
    /// Critical periodic ticks.
    pub tick_crits: u64,
    /// Damage dealt.
    pub damage: f64,
    /// Healing done.
    pub healing: f64,
    /// Resource spent on casts.
    pub resource_spent: f64,
    /// Resource refunded after misses.
    pub refunded: f64,
}

impl AbilityMetrics {
    /// Counts one rolled outcome.
    pub fn record_outcome(&mut self, roll: &RollResult) {
        let counter = match roll.outcome {
            HitOutcome::Hit => &mut self.hits,
            HitOutcome::Crit => &mut self.crits,
            HitOutcome::Miss => &mut self.misses,
            HitOutcome::Dodge => &mut self.dodges,
            HitOutcome::Parry => &mut self.parries,
            HitOutcome::Block => &mut self.blocks,
            HitOutcome::Resist => &mut self.resists,
        };
        *counter += 1;
        if roll.is_partial_resist() {
            self.partial_resists += 1;
        }
    }

    /// Outcomes that reached the target.
    #[must_use]
    pub fn landed(&self) -> u64 {
        self.hits + self.crits + self.blocks
    }

    /// Adds another tally into this one.
    pub fn accumulate(&mut self, other: &Self) {
        self.casts += other.casts;
        self.hits += other.hits;
        self.crits += other.crits;
        self.misses += other.misses;
        self.dodges += other.dodges;
        self.parries += other.parries;
        self.blocks += other.blocks;
        self.resists += other.resists;
        self.partial_resists += other.partial_resists;
        self.ticks += other.ticks;
        self.tick_crits += other.tick_crits;
        self.damage += other.damage;
        self.healing += other.healing;
        self.resource_spent += other.resource_spent;
        self.refunded += other.refunded;
    }
}

/// Everything recorded about one actor in one iteration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ActorMetrics {
    /// Actor name.
    pub name: String,
    /// Total damage dealt.
    pub damage_done: f64,
    /// Total healing done.
    pub healing_done: f64,
    /// Total damage taken.
    pub damage_taken: f64,
    /// Per-ability counters keyed by label.
    pub abilities: BTreeMap<String, AbilityMetrics>,
    /// Per-pool bookkeeping.
    pub resources: BTreeMap<ResourceKind, ResourceMetrics>,
    /// Aura uptime keyed by aura label.
    pub aura_uptime: BTreeMap<String, SimTime>,
}

impl ActorMetrics {
    /// Damage per second over `duration`.
    #[must_use]
    pub fn dps(&self, duration: SimTime) -> f64 {
        per_second(self.damage_done, duration)
    }

    /// Healing per second over `duration`.
    #[must_use]
    pub fn hps(&self, duration: SimTime) -> f64 {
        per_second(self.healing_done, duration)
    }

    /// Counters of one ability.
    #[must_use]
    pub fn ability(&self, label: &str) -> Option<&AbilityMetrics> {
        self.abilities.get(label)
    }
}

fn per_second(amount: f64, duration: SimTime) -> f64 {
    let secs = duration.as_secs_f64();
    if secs > 0.0 {
        amount / secs
    } else {
        0.0
    }
}

/// Immutable outcome of one simulated encounter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IterationResult {
    /// Seed of this iteration's RNG.
    pub seed: u64,
    /// Encounter length after variation.
    pub duration: SimTime,
    /// Players in raid order.
    pub players: Vec<ActorMetrics>,
    /// Targets in encounter order.
    pub targets: Vec<ActorMetrics>,
    /// Digest over every executed action.
    pub trace_digest: u64,
    /// Number of actions executed.
    pub actions_executed: u64,
    /// Execution log, when recording was requested.
    pub log: Option<EventLog>,
}

impl IterationResult {
    /// Sum of all players' damage per second.
    #[must_use]
    pub fn raid_dps(&self) -> f64 {
        self.players.iter().map(|p| p.dps(self.duration)).sum()
    }

    /// Damage per second of one player.
    #[must_use]
    pub fn player_dps(&self, index: usize) -> Option<f64> {
        self.players.get(index).map(|p| p.dps(self.duration))
    }

    /// Healing per second of one player.
    #[must_use]
    pub fn player_hps(&self, index: usize) -> Option<f64> {
        self.players.get(index).map(|p| p.hps(self.duration))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn outcome_counters() {
        let mut m = AbilityMetrics::default();
        m.record_outcome(&RollResult::of(HitOutcome::Crit));
        m.record_outcome(&RollResult::of(HitOutcome::Dodge));
        m.record_outcome(&RollResult {
            outcome: HitOutcome::Hit,
            resisted: 0.25,
        });
        assert_eq!(m.crits, 1);
        assert_eq!(m.dodges, 1);
        assert_eq!(m.landed(), 2);
        assert_eq!(m.partial_resists, 1);
    }

    #[test]
    fn dps_divides_by_duration() {
        let metrics = ActorMetrics {
            damage_done: 15_000.0,
            ..ActorMetrics::default()
        };
        assert_eq!(metrics.dps(SimTime::from_secs(300)), 50.0);
        assert_eq!(metrics.dps(SimTime::ZERO), 0.0);
    }
}
