//! Character statistics and stat dependencies.
//!
//! Stats are a fixed-size vector indexed by [`Stat`]. Chances and haste are
//! stored as fractions (`0.05` is 5%). Effective stats are derived from base
//! stats plus aura bonuses, then run through the actor's
//! [`StatDependency`] list in declaration order.

use std::fmt;
use std::ops::{Add, AddAssign, Index, IndexMut};

use serde::{Deserialize, Serialize};

// =============================================================================
// Stat
// =============================================================================

/// A named character statistic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Stat {
    /// Primary attribute feeding attack power and block value.
    Strength,
    /// Primary attribute feeding melee crit and armor.
    Agility,
    /// Primary attribute feeding health.
    Stamina,
    /// Primary attribute feeding mana and spell crit.
    Intellect,
    /// Primary attribute feeding mana regeneration.
    Spirit,
    /// Melee attack power.
    AttackPower,
    /// Spell damage bonus.
    SpellPower,
    /// Healing bonus.
    HealingPower,
    /// Melee hit chance, as a fraction.
    MeleeHit,
    /// Spell hit chance, as a fraction.
    SpellHit,
    /// Melee critical strike chance, as a fraction.
    MeleeCrit,
    /// Spell critical strike chance, as a fraction.
    SpellCrit,
    /// Melee haste, as a fraction.
    MeleeHaste,
    /// Spell haste, as a fraction.
    SpellHaste,
    /// Reduction of the target's dodge and parry chance, as a fraction.
    Expertise,
    /// Mana regenerated per five seconds.
    Mp5,
    /// Armor.
    Armor,
    /// Dodge chance, as a fraction.
    Dodge,
    /// Parry chance, as a fraction.
    Parry,
    /// Damage absorbed by a successful block.
    BlockValue,
}

impl Stat {
    /// Number of stats.
    pub const COUNT: usize = 20;

    /// Every stat, in index order.
    pub const ALL: [Stat; Self::COUNT] = [
        Stat::Strength,
        Stat::Agility,
        Stat::Stamina,
        Stat::Intellect,
        Stat::Spirit,
        Stat::AttackPower,
        Stat::SpellPower,
        Stat::HealingPower,
        Stat::MeleeHit,
        Stat::SpellHit,
        Stat::MeleeCrit,
        Stat::SpellCrit,
        Stat::MeleeHaste,
        Stat::SpellHaste,
        Stat::Expertise,
        Stat::Mp5,
        Stat::Armor,
        Stat::Dodge,
        Stat::Parry,
        Stat::BlockValue,
    ];

    /// Position of this stat in a [`Stats`] vector.
    #[must_use]
    pub const fn index(self) -> usize {
        self as usize
    }

    /// Default finite-difference increment used by stat-weight estimation.
    ///
    /// Rating-like stats stored as fractions get a 1% step; flat stats get a
    /// step large enough to move damage measurably.
    #[must_use]
    pub fn default_increment(self) -> f64 {
        match self {
            Stat::MeleeHit
            | Stat::SpellHit
            | Stat::MeleeCrit
            | Stat::SpellCrit
            | Stat::MeleeHaste
            | Stat::SpellHaste
            | Stat::Expertise
            | Stat::Dodge
            | Stat::Parry => 0.01,
            Stat::Armor => 500.0,
            Stat::Mp5 => 10.0,
            _ => 50.0,
        }
    }
}

impl fmt::Display for Stat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

// =============================================================================
// School
// =============================================================================

/// Damage school of a spell, dot or modifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum School {
    /// Weapon and bleed damage; mitigated by armor.
    Physical,
    /// Holy magic.
    Holy,
    /// Fire magic.
    Fire,
    /// Nature magic.
    Nature,
    /// Frost magic.
    Frost,
    /// Shadow magic.
    Shadow,
    /// Arcane magic.
    Arcane,
}

impl School {
    /// Whether this is the physical school.
    #[must_use]
    pub const fn is_physical(self) -> bool {
        matches!(self, School::Physical)
    }

    /// Haste stat that scales cast times and GCDs of this school.
    #[must_use]
    pub const fn haste_stat(self) -> Stat {
        if self.is_physical() {
            Stat::MeleeHaste
        } else {
            Stat::SpellHaste
        }
    }

    /// Crit stat used for this school.
    #[must_use]
    pub const fn crit_stat(self) -> Stat {
        if self.is_physical() {
            Stat::MeleeCrit
        } else {
            Stat::SpellCrit
        }
    }
}

// =============================================================================
// Stats
// =============================================================================

/// Fixed-size stat vector.
///
/// # Example
///
/// ```
/// use raidsim_core::stat::{Stat, Stats};
///
/// let stats = Stats::new().with(Stat::Strength, 100.0).with(Stat::MeleeCrit, 0.05);
/// assert_eq!(stats[Stat::Strength], 100.0);
/// assert_eq!(stats[Stat::AttackPower], 0.0);
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Stats([f64; Stat::COUNT]);

impl Stats {
    /// All-zero stats.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style setter.
    #[must_use]
    pub fn with(mut self, stat: Stat, value: f64) -> Self {
        self[stat] = value;
        self
    }

    /// Reads one stat.
    #[must_use]
    pub fn get(&self, stat: Stat) -> f64 {
        self.0[stat.index()]
    }

    /// Adds `delta` to one stat.
    pub fn add_to(&mut self, stat: Stat, delta: f64) {
        self.0[stat.index()] += delta;
    }

    /// Iterates `(stat, value)` pairs with non-zero values.
    pub fn iter_nonzero(&self) -> impl Iterator<Item = (Stat, f64)> + '_ {
        Stat::ALL
            .iter()
            .map(|s| (*s, self.get(*s)))
            .filter(|(_, v)| *v != 0.0)
    }

    /// Applies dependencies to a copy of these stats and returns the result.
    #[must_use]
    pub fn derive(&self, dependencies: &[StatDependency]) -> Self {
        let mut out = *self;
        for dep in dependencies {
            let source = out.get(dep.from);
            out.add_to(dep.to, source * dep.ratio);
        }
        out
    }
}

impl Index<Stat> for Stats {
    type Output = f64;

    fn index(&self, stat: Stat) -> &f64 {
        &self.0[stat.index()]
    }
}

impl IndexMut<Stat> for Stats {
    fn index_mut(&mut self, stat: Stat) -> &mut f64 {
        &mut self.0[stat.index()]
    }
}

impl Add for Stats {
    type Output = Self;

    fn add(mut self, rhs: Self) -> Self {
        self += rhs;
        self
    }
}

impl AddAssign for Stats {
    fn add_assign(&mut self, rhs: Self) {
        for (a, b) in self.0.iter_mut().zip(rhs.0.iter()) {
            *a += b;
        }
    }
}

// =============================================================================
// Stat Dependency
// =============================================================================

/// Linear conversion `to += from * ratio` applied when deriving effective
/// stats, e.g. one strength giving two attack power.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StatDependency {
    /// Source stat.
    pub from: Stat,
    /// Stat that receives the converted amount.
    pub to: Stat,
    /// Conversion factor.
    pub ratio: f64,
}

impl StatDependency {
    /// Creates a dependency.
    #[must_use]
    pub const fn new(from: Stat, to: Stat, ratio: f64) -> Self {
        Self { from, to, ratio }
    }
}
