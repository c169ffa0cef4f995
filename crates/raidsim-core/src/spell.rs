//! Spell and ability definitions.
//!
//! Every ability is one [`SpellDefinition`] driven through the same generic
//! pipeline; behaviour differences live in the data (cost model, GCD policy,
//! outcome policy, flags, conditions and hooks), never in per-kind types.

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

use crate::effect::{CastCondition, EffectHook};
use crate::kit::DotId;
use crate::outcome::OutcomePolicy;
use crate::resource::ResourceKind;
use crate::stat::{School, Stat};
use crate::time::SimTime;

bitflags! {
    /// Behaviour switches of a spell.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
    pub struct SpellFlags: u32 {
        /// Physical damage bypasses target armor.
        const IGNORE_ARMOR = 1 << 0;
        /// Cast time and GCD are not scaled by haste.
        const IGNORE_HASTE = 1 << 1;
        /// Caster damage-dealt auras do not apply.
        const IGNORE_MODIFIERS = 1 << 2;
        /// Magic damage is never partially resisted.
        const BINARY = 1 << 3;
    }
}

/// Power stat a coefficient scales with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PowerSource {
    /// Melee attack power.
    AttackPower,
    /// Spell damage.
    SpellPower,
    /// Healing power.
    HealingPower,
}

impl PowerSource {
    /// Stat read for this source.
    #[must_use]
    pub const fn stat(self) -> Stat {
        match self {
            Self::AttackPower => Stat::AttackPower,
            Self::SpellPower => Stat::SpellPower,
            Self::HealingPower => Stat::HealingPower,
        }
    }
}

/// How a spell's global cooldown is determined.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GcdPolicy {
    /// The engine default (1.5 s), hasted.
    Default,
    /// A custom GCD length, hasted.
    Custom(SimTime),
    /// Off the GCD entirely.
    None,
}

/// Resource cost of a spell.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CostModel {
    /// Pool charged.
    pub resource: ResourceKind,
    /// Amount required (and spent, unless `consume_all`).
    pub amount: f64,
    /// Fraction of the spent amount returned when the spell fails to land.
    pub refund_fraction: f64,
    /// Spend the whole pool (finishing moves); `amount` is then the minimum.
    pub consume_all: bool,
}

impl CostModel {
    /// A plain cost without refund.
    #[must_use]
    pub const fn new(resource: ResourceKind, amount: f64) -> Self {
        Self {
            resource,
            amount,
            refund_fraction: 0.0,
            consume_all: false,
        }
    }

    /// Refunds `fraction` of the cost on a miss.
    #[must_use]
    pub const fn with_refund(mut self, fraction: f64) -> Self {
        self.refund_fraction = fraction;
        self
    }

    /// Spends the whole pool on cast.
    #[must_use]
    pub const fn consuming_all(mut self) -> Self {
        self.consume_all = true;
        self
    }
}

/// Magnitude formula of a direct effect.
///
/// `base = roll(base_min, base_max) + weapon_coefficient * weapon damage
/// + power_coefficient * power + per_point * resource consumed`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DamageFormula {
    /// Lower bound of the fixed roll.
    pub base_min: f64,
    /// Upper bound of the fixed roll.
    pub base_max: f64,
    /// Scaling with a normalized weapon hit; zero without a weapon term.
    pub weapon_coefficient: f64,
    /// Scaling with the caster's power stat.
    pub power_coefficient: f64,
    /// Power stat used by `power_coefficient`.
    pub power: PowerSource,
    /// Bonus per unit of resource consumed by the cast.
    pub per_point: f64,
}

impl DamageFormula {
    /// A fixed-range formula.
    #[must_use]
    pub const fn flat(min: f64, max: f64) -> Self {
        Self {
            base_min: min,
            base_max: max,
            weapon_coefficient: 0.0,
            power_coefficient: 0.0,
            power: PowerSource::SpellPower,
            per_point: 0.0,
        }
    }

    /// A weapon-based formula with a flat bonus.
    #[must_use]
    pub const fn weapon(coefficient: f64, bonus: f64) -> Self {
        Self {
            base_min: bonus,
            base_max: bonus,
            weapon_coefficient: coefficient,
            power_coefficient: 0.0,
            power: PowerSource::AttackPower,
            per_point: 0.0,
        }
    }

    /// Adds power scaling.
    #[must_use]
    pub const fn with_power(mut self, power: PowerSource, coefficient: f64) -> Self {
        self.power = power;
        self.power_coefficient = coefficient;
        self
    }

    /// Adds a per-consumed-point term.
    #[must_use]
    pub const fn with_per_point(mut self, per_point: f64) -> Self {
        self.per_point = per_point;
        self
    }
}

/// Default target of a spell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SpellTarget {
    /// The caster's primary target.
    Enemy,
    /// The caster.
    Caster,
}

/// Immutable description of a spell.
///
/// # Example
///
/// ```
/// use raidsim_core::spell::{DamageFormula, GcdPolicy, SpellDefinition};
/// use raidsim_core::time::SimTime;
///
/// let strike = SpellDefinition::new("Strike")
///     .with_formula(DamageFormula::flat(50.0, 50.0))
///     .with_cooldown(SimTime::from_secs(1))
///     .with_gcd(GcdPolicy::None);
/// assert!(strike.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpellDefinition {
    /// Display label, also the metrics key.
    pub label: String,
    /// Damage school.
    pub school: School,
    /// Outcome policy.
    pub outcome: OutcomePolicy,
    /// Resource cost.
    pub cost: Option<CostModel>,
    /// Base cast time; zero is instant.
    pub cast_time: SimTime,
    /// GCD policy.
    pub gcd: GcdPolicy,
    /// Cooldown started on cast.
    pub cooldown: SimTime,
    /// Direct magnitude; `None` for pure utility spells.
    pub formula: Option<DamageFormula>,
    /// Spell-specific multiplier.
    pub damage_multiplier: f64,
    /// Multiplier on a critical result.
    pub crit_multiplier: f64,
    /// Extra hit chance.
    pub bonus_hit: f64,
    /// Extra crit chance.
    pub bonus_crit: f64,
    /// Behaviour switches.
    pub flags: SpellFlags,
    /// Default target.
    pub target: SpellTarget,
    /// Extra castability conditions.
    pub conditions: Vec<CastCondition>,
    /// Hooks run when the cast completes, before the outcome roll.
    pub on_cast: Vec<EffectHook>,
    /// Hooks run when the spell lands.
    pub on_landed: Vec<EffectHook>,
    /// Hooks run when the spell fails to land.
    pub on_missed: Vec<EffectHook>,
    /// Dot applied to the target when the spell lands.
    pub applies_dot: Option<DotId>,
}

impl SpellDefinition {
    /// An instant, always-hitting physical spell on the default GCD with no
    /// cost and no direct effect.
    #[must_use]
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            school: School::Physical,
            outcome: OutcomePolicy::AlwaysHit,
            cost: None,
            cast_time: SimTime::ZERO,
            gcd: GcdPolicy::Default,
            cooldown: SimTime::ZERO,
            formula: None,
            damage_multiplier: 1.0,
            crit_multiplier: 2.0,
            bonus_hit: 0.0,
            bonus_crit: 0.0,
            flags: SpellFlags::empty(),
            target: SpellTarget::Enemy,
            conditions: Vec::new(),
            on_cast: Vec::new(),
            on_landed: Vec::new(),
            on_missed: Vec::new(),
            applies_dot: None,
        }
    }

    /// Sets the school.
    #[must_use]
    pub fn with_school(mut self, school: School) -> Self {
        self.school = school;
        self
    }

    /// Sets the outcome policy.
    #[must_use]
    pub fn with_outcome(mut self, outcome: OutcomePolicy) -> Self {
        self.outcome = outcome;
        self
    }

    /// Sets the cost.
    #[must_use]
    pub fn with_cost(mut self, cost: CostModel) -> Self {
        self.cost = Some(cost);
        self
    }

    /// Sets the cast time.
    #[must_use]
    pub fn with_cast_time(mut self, cast_time: SimTime) -> Self {
        self.cast_time = cast_time;
        self
    }

    /// Sets the GCD policy.
    #[must_use]
    pub fn with_gcd(mut self, gcd: GcdPolicy) -> Self {
        self.gcd = gcd;
        self
    }

    /// Sets the cooldown.
    #[must_use]
    pub fn with_cooldown(mut self, cooldown: SimTime) -> Self {
        self.cooldown = cooldown;
        self
    }

    /// Sets the magnitude formula.
    #[must_use]
    pub fn with_formula(mut self, formula: DamageFormula) -> Self {
        self.formula = Some(formula);
        self
    }

    /// Sets the spell multiplier.
    #[must_use]
    pub fn with_damage_multiplier(mut self, multiplier: f64) -> Self {
        self.damage_multiplier = multiplier;
        self
    }

    /// Sets the crit multiplier.
    #[must_use]
    pub fn with_crit_multiplier(mut self, multiplier: f64) -> Self {
        self.crit_multiplier = multiplier;
        self
    }

    /// Adds crit chance.
    #[must_use]
    pub fn with_bonus_crit(mut self, bonus: f64) -> Self {
        self.bonus_crit = bonus;
        self
    }

    /// Sets flags.
    #[must_use]
    pub fn with_flags(mut self, flags: SpellFlags) -> Self {
        self.flags = flags;
        self
    }

    /// Sets the default target.
    #[must_use]
    pub fn targeting(mut self, target: SpellTarget) -> Self {
        self.target = target;
        self
    }

    /// Adds a castability condition.
    #[must_use]
    pub fn when(mut self, condition: CastCondition) -> Self {
        self.conditions.push(condition);
        self
    }

    /// Adds an on-cast hook.
    #[must_use]
    pub fn on_cast(mut self, hook: EffectHook) -> Self {
        self.on_cast.push(hook);
        self
    }

    /// Adds an on-landed hook.
    #[must_use]
    pub fn on_landed(mut self, hook: EffectHook) -> Self {
        self.on_landed.push(hook);
        self
    }

    /// Adds an on-missed hook.
    #[must_use]
    pub fn on_missed(mut self, hook: EffectHook) -> Self {
        self.on_missed.push(hook);
        self
    }

    /// Applies a dot on landing.
    #[must_use]
    pub fn applying(mut self, dot: DotId) -> Self {
        self.applies_dot = Some(dot);
        self
    }

    /// Whether the spell heals.
    #[must_use]
    pub fn is_healing(&self) -> bool {
        self.outcome == OutcomePolicy::Healing
    }

    /// Every hook of the definition.
    pub fn hooks(&self) -> impl Iterator<Item = &EffectHook> {
        self.on_cast
            .iter()
            .chain(&self.on_landed)
            .chain(&self.on_missed)
    }

    /// Checks numeric fields.
    ///
    /// # Errors
    ///
    /// Returns a human-readable reason.
    pub fn validate(&self) -> Result<(), String> {
        if let Some(cost) = &self.cost {
            if !cost.amount.is_finite() || cost.amount < 0.0 {
                return Err(format!("cost must be non-negative, got {}", cost.amount));
            }
            if !(0.0..=1.0).contains(&cost.refund_fraction) {
                return Err(format!(
                    "refund fraction must be in [0, 1], got {}",
                    cost.refund_fraction
                ));
            }
        }
        if let Some(formula) = &self.formula {
            if formula.base_min > formula.base_max {
                return Err("formula base_min exceeds base_max".into());
            }
            let terms = [
                formula.base_min,
                formula.base_max,
                formula.weapon_coefficient,
                formula.power_coefficient,
                formula.per_point,
            ];
            if terms.iter().any(|t| !t.is_finite()) {
                return Err("formula term is not finite".into());
            }
        }
        if !self.damage_multiplier.is_finite() || self.damage_multiplier < 0.0 {
            return Err("damage multiplier must be non-negative".into());
        }
        if self.crit_multiplier < 1.0 {
            return Err("crit multiplier below 1".into());
        }
        Ok(())
    }
}

/// Per-iteration state of one spell.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct SpellState {
    /// Earliest time the cooldown allows a cast.
    pub ready_at: SimTime,
    /// Casts started this iteration.
    pub casts: u32,
}

impl SpellState {
    /// Whether the cooldown has elapsed.
    #[must_use]
    pub fn is_ready(&self, now: SimTime) -> bool {
        self.ready_at <= now
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validate_catches_bad_refund() {
        let spell = SpellDefinition::new("Maul")
            .with_cost(CostModel::new(ResourceKind::Rage, 15.0).with_refund(1.5));
        assert!(spell.validate().is_err());
    }

    #[test]
    fn validate_catches_inverted_range() {
        let spell = SpellDefinition::new("Bolt").with_formula(DamageFormula::flat(10.0, 5.0));
        assert!(spell.validate().is_err());
    }

    #[test]
    fn flags_serialize() {
        let flags = SpellFlags::IGNORE_ARMOR | SpellFlags::BINARY;
        let json = serde_json::to_string(&flags).unwrap();
        let back: SpellFlags = serde_json::from_str(&json).unwrap();
        assert_eq!(back, flags);
    }

    #[test]
    fn hooks_iterate_in_phase_order() {
        let spell = SpellDefinition::new("Mangle")
            .on_cast(EffectHook::ClearSwingQueue)
            .on_landed(EffectHook::ResetResource {
                kind: ResourceKind::ComboPoints,
            });
        assert_eq!(spell.hooks().count(), 2);
        assert!(!spell.is_healing());
    }
}
