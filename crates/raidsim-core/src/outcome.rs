//! Outcome rolls.
//!
//! An [`AttackTable`] is derived from both sides' stats at roll time; the
//! [`OutcomePolicy`] of the spell decides how it is consulted. All draws come
//! from the iteration's [`SimRng`], and certain outcomes never draw.

use serde::{Deserialize, Serialize};

use crate::actor::DefenseStats;
use crate::rng::SimRng;
use crate::stat::{Stat, Stats};

/// Width of one partial-resist bucket.
const RESIST_BUCKET: f64 = 0.25;
/// Largest fraction a partial resist can remove.
const MAX_PARTIAL_RESIST: f64 = 0.75;

/// Categorical result of an outcome roll.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum HitOutcome {
    /// Landed normally.
    Hit,
    /// Landed as a critical strike.
    Crit,
    /// Missed.
    Miss,
    /// Dodged.
    Dodge,
    /// Parried.
    Parry,
    /// Landed but partially blocked.
    Block,
    /// Fully resisted (spell miss).
    Resist,
}

impl HitOutcome {
    /// Whether the effect reached the target.
    #[must_use]
    pub const fn landed(self) -> bool {
        matches!(self, Self::Hit | Self::Crit | Self::Block)
    }
}

/// A rolled outcome plus the fraction removed by a partial resist.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RollResult {
    /// Categorical result.
    pub outcome: HitOutcome,
    /// Fraction of the magnitude resisted, in `{0, 0.25, 0.5, 0.75}`.
    pub resisted: f64,
}

impl RollResult {
    /// A plain result without partial resist.
    #[must_use]
    pub const fn of(outcome: HitOutcome) -> Self {
        Self {
            outcome,
            resisted: 0.0,
        }
    }

    /// Whether part of the magnitude was resisted.
    #[must_use]
    pub fn is_partial_resist(&self) -> bool {
        self.resisted > 0.0
    }
}

/// How a spell's outcome is decided.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OutcomePolicy {
    /// Always lands, never crits.
    AlwaysHit,
    /// One avoidance roll (miss, dodge, parry, block), then a crit roll for
    /// unblocked hits.
    MeleeSpecial,
    /// One roll over the whole melee table including crit, as white swings
    /// use.
    MeleeWhite,
    /// Miss roll, crit roll, then partial resist.
    Magic,
    /// Crit roll only.
    Healing,
}

/// Chances derived from attacker stats and target defenses.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AttackTable {
    /// Miss chance.
    pub miss: f64,
    /// Dodge chance.
    pub dodge: f64,
    /// Parry chance.
    pub parry: f64,
    /// Block chance.
    pub block: f64,
    /// Crit chance.
    pub crit: f64,
    /// Average resistance for partial resists.
    pub resistance: f64,
}

impl AttackTable {
    /// Melee table: hit reduces miss, expertise reduces dodge and parry,
    /// crit is suppressed by the target.
    #[must_use]
    pub fn melee(attacker: &Stats, target: &DefenseStats, bonus_hit: f64, bonus_crit: f64) -> Self {
        let expertise = attacker[Stat::Expertise];
        Self {
            miss: (target.miss - attacker[Stat::MeleeHit] - bonus_hit).max(0.0),
            dodge: (target.dodge - expertise).max(0.0),
            parry: (target.parry - expertise).max(0.0),
            block: target.block.max(0.0),
            crit: (attacker[Stat::MeleeCrit] + bonus_crit - target.crit_suppression).max(0.0),
            resistance: 0.0,
        }
    }

    /// Spell table: hit reduces spell miss; resistance feeds partial resists.
    #[must_use]
    pub fn spell(attacker: &Stats, target: &DefenseStats, bonus_hit: f64, bonus_crit: f64) -> Self {
        Self {
            miss: (target.spell_miss - attacker[Stat::SpellHit] - bonus_hit).max(0.0),
            dodge: 0.0,
            parry: 0.0,
            block: 0.0,
            crit: (attacker[Stat::SpellCrit] + bonus_crit).max(0.0),
            resistance: target.resistance.clamp(0.0, MAX_PARTIAL_RESIST),
        }
    }

    /// Healing table: crit only.
    #[must_use]
    pub fn healing(attacker: &Stats, bonus_crit: f64) -> Self {
        Self {
            miss: 0.0,
            dodge: 0.0,
            parry: 0.0,
            block: 0.0,
            crit: (attacker[Stat::SpellCrit] + bonus_crit).max(0.0),
            resistance: 0.0,
        }
    }

    /// Rolls an outcome under `policy`.
    pub fn roll(&self, policy: OutcomePolicy, rng: &mut SimRng) -> RollResult {
        match policy {
            OutcomePolicy::AlwaysHit => RollResult::of(HitOutcome::Hit),
            OutcomePolicy::MeleeSpecial => self.roll_special(rng),
            OutcomePolicy::MeleeWhite => self.roll_white(rng),
            OutcomePolicy::Magic => self.roll_magic(rng),
            OutcomePolicy::Healing => RollResult::of(self.roll_crit(rng)),
        }
    }

    fn roll_crit(&self, rng: &mut SimRng) -> HitOutcome {
        if rng.proc(self.crit) {
            HitOutcome::Crit
        } else {
            HitOutcome::Hit
        }
    }

    /// Walks cumulative chances; the first bucket containing the roll wins.
    fn avoidance(&self, roll: f64) -> Option<HitOutcome> {
        let mut ceiling = 0.0;
        for (chance, outcome) in [
            (self.miss, HitOutcome::Miss),
            (self.dodge, HitOutcome::Dodge),
            (self.parry, HitOutcome::Parry),
            (self.block, HitOutcome::Block),
        ] {
            ceiling += chance;
            if roll < ceiling {
                return Some(outcome);
            }
        }
        None
    }

    fn avoidance_total(&self) -> f64 {
        self.miss + self.dodge + self.parry + self.block
    }

    fn roll_special(&self, rng: &mut SimRng) -> RollResult {
        if self.avoidance_total() > 0.0 {
            if let Some(avoided) = self.avoidance(rng.next_f64()) {
                return RollResult::of(avoided);
            }
        }
        RollResult::of(self.roll_crit(rng))
    }

    fn roll_white(&self, rng: &mut SimRng) -> RollResult {
        if self.avoidance_total() + self.crit <= 0.0 {
            return RollResult::of(HitOutcome::Hit);
        }
        let roll = rng.next_f64();
        if let Some(avoided) = self.avoidance(roll) {
            return RollResult::of(avoided);
        }
        if roll < self.avoidance_total() + self.crit {
            RollResult::of(HitOutcome::Crit)
        } else {
            RollResult::of(HitOutcome::Hit)
        }
    }

    fn roll_magic(&self, rng: &mut SimRng) -> RollResult {
        if rng.proc(self.miss) {
            return RollResult::of(HitOutcome::Resist);
        }
        let outcome = self.roll_crit(rng);
        RollResult {
            outcome,
            resisted: self.roll_partial_resist(rng),
        }
    }

    /// Picks a quarter bucket so that the expected resisted fraction equals
    /// the average resistance.
    #[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation)]
    fn roll_partial_resist(&self, rng: &mut SimRng) -> f64 {
        if self.resistance <= 0.0 {
            return 0.0;
        }
        let lower = (self.resistance / RESIST_BUCKET).floor();
        let round_up = (self.resistance - lower * RESIST_BUCKET) / RESIST_BUCKET;
        let buckets = if rng.proc(round_up) { lower + 1.0 } else { lower };
        (buckets * RESIST_BUCKET).min(MAX_PARTIAL_RESIST)
    }
}
