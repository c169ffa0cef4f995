//! Immutable simulation input.
//!
//! A [`SimSpec`] describes the encounter and the raid. It is shared
//! read-only by every iteration; each iteration builds its own actor graph
//! from it. Everything except custom rotations round-trips through serde.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::actor::{DefenseStats, SwingResourceGain, Weapon};
use crate::config::DEFAULT_ARMOR_CONSTANT;
use crate::effect::HandleRef;
use crate::error::{SimError, SimResult};
use crate::kit::{AuraId, Kit};
use crate::resource::ResourcePoolSpec;
use crate::rotation::{PriorityRotation, Rotation};
use crate::stat::{Stat, StatDependency, Stats};
use crate::time::SimTime;

/// Full input of a simulation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimSpec {
    /// Opposing side and encounter length.
    pub encounter: EncounterSpec,
    /// Players, in raid order.
    pub raid: Vec<PlayerSpec>,
}

/// Encounter description.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EncounterSpec {
    /// Base encounter length.
    pub duration: SimTime,
    /// Each iteration draws a uniform offset in `[-variation, +variation]`.
    pub duration_variation: SimTime,
    /// Armor constant `K` in `armor / (armor + K)`.
    pub armor_constant: f64,
    /// Targets, in order.
    pub targets: Vec<TargetSpec>,
}

impl EncounterSpec {
    /// One default target for `duration` without variation.
    #[must_use]
    pub fn single_target(duration: SimTime, defense: DefenseStats) -> Self {
        Self {
            duration,
            duration_variation: SimTime::ZERO,
            armor_constant: DEFAULT_ARMOR_CONSTANT,
            targets: vec![TargetSpec {
                name: "Target".into(),
                defense,
            }],
        }
    }

    /// Sets the duration variation.
    #[must_use]
    pub fn with_variation(mut self, variation: SimTime) -> Self {
        self.duration_variation = variation;
        self
    }
}

/// One encounter target.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TargetSpec {
    /// Display name.
    pub name: String,
    /// Defensive stats.
    pub defense: DefenseStats,
}

/// How a player picks actions.
#[derive(Clone, Serialize, Deserialize)]
pub enum RotationSpec {
    /// A declarative priority list.
    Priority(PriorityRotation),
    /// A custom policy. Not serializable.
    #[serde(skip)]
    Custom(Arc<dyn Rotation>),
}

impl RotationSpec {
    /// The rotation as a shareable trait object.
    #[must_use]
    pub fn to_rotation(&self) -> Arc<dyn Rotation> {
        match self {
            Self::Priority(priority) => Arc::new(priority.clone()),
            Self::Custom(custom) => Arc::clone(custom),
        }
    }
}

impl fmt::Debug for RotationSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Priority(priority) => f.debug_tuple("Priority").field(priority).finish(),
            Self::Custom(custom) => f.debug_tuple("Custom").field(&custom.label()).finish(),
        }
    }
}

/// One raid member.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlayerSpec {
    /// Display name.
    pub name: String,
    /// Gear-derived base stats.
    pub base_stats: Stats,
    /// Stat conversions applied when deriving effective stats.
    pub dependencies: Vec<StatDependency>,
    /// Resource pools.
    pub resources: Vec<ResourcePoolSpec>,
    /// Melee weapon; enables auto-attacks.
    pub weapon: Option<Weapon>,
    /// Resource generated by landed white swings.
    pub swing_gain: Option<SwingResourceGain>,
    /// Definition tables.
    pub kit: Arc<Kit>,
    /// Auras from the kit active at encounter start.
    pub starting_auras: Vec<AuraId>,
    /// Decision policy.
    pub rotation: RotationSpec,
    /// Index of the primary target in the encounter's target list.
    pub target: usize,
}

impl PlayerSpec {
    /// A player with no pools, weapon or starting auras, targeting the first
    /// target.
    #[must_use]
    pub fn new(name: impl Into<String>, kit: Kit, rotation: RotationSpec) -> Self {
        Self {
            name: name.into(),
            base_stats: Stats::new(),
            dependencies: Vec::new(),
            resources: Vec::new(),
            weapon: None,
            swing_gain: None,
            kit: Arc::new(kit),
            starting_auras: Vec::new(),
            rotation,
            target: 0,
        }
    }

    /// Sets base stats.
    #[must_use]
    pub fn with_stats(mut self, stats: Stats) -> Self {
        self.base_stats = stats;
        self
    }

    /// Adds a stat dependency.
    #[must_use]
    pub fn with_dependency(mut self, dependency: StatDependency) -> Self {
        self.dependencies.push(dependency);
        self
    }

    /// Adds a resource pool.
    #[must_use]
    pub fn with_resource(mut self, pool: ResourcePoolSpec) -> Self {
        self.resources.push(pool);
        self
    }

    /// Equips a weapon.
    #[must_use]
    pub fn with_weapon(mut self, weapon: Weapon) -> Self {
        self.weapon = Some(weapon);
        self
    }

    /// Generates resource from white swing damage.
    #[must_use]
    pub fn with_swing_gain(mut self, gain: SwingResourceGain) -> Self {
        self.swing_gain = Some(gain);
        self
    }

    /// Starts the encounter with an aura active.
    #[must_use]
    pub fn with_starting_aura(mut self, aura: AuraId) -> Self {
        self.starting_auras.push(aura);
        self
    }

    fn validate(&self, target_count: usize) -> SimResult<()> {
        let invalid = |label: &str, reason: String| SimError::InvalidDefinition {
            actor: self.name.clone(),
            label: label.to_string(),
            reason,
        };

        self.kit.validate(&self.name)?;
        if self.target >= target_count {
            return Err(invalid(
                "target",
                format!("target index {} out of {} targets", self.target, target_count),
            ));
        }
        for pool in &self.resources {
            pool.validate().map_err(|r| invalid("resources", r))?;
        }
        if let Some(weapon) = &self.weapon {
            weapon.validate().map_err(|r| invalid("weapon", r))?;
        }
        if let Some(gain) = &self.swing_gain {
            if !self.resources.iter().any(|p| p.kind == gain.kind) {
                return Err(invalid("swing gain", format!("generates {} but has no pool", gain.kind)));
            }
        }
        for aura in &self.starting_auras {
            if !self.kit.contains(HandleRef::Aura(*aura)) {
                return Err(invalid("starting auras", format!("unknown aura {aura:?}")));
            }
        }
        for (_, spell) in self.kit.spells() {
            if let Some(cost) = &spell.cost {
                if !self.resources.iter().any(|p| p.kind == cost.resource) {
                    return Err(invalid(&spell.label, format!("costs {} but has no pool", cost.resource)));
                }
            }
        }
        if let RotationSpec::Priority(priority) = &self.rotation {
            let mut handles = Vec::new();
            for entry in &priority.entries {
                handles.push(HandleRef::Spell(entry.spell));
                entry.conditions.iter().for_each(|c| c.collect_handles(&mut handles));
            }
            if let Some(missing) = handles.iter().find(|h| !self.kit.contains(**h)) {
                return Err(invalid(&priority.label, format!("unknown handle {missing:?}")));
            }
        }
        Ok(())
    }
}

impl SimSpec {
    /// Creates a spec.
    #[must_use]
    pub fn new(encounter: EncounterSpec, raid: Vec<PlayerSpec>) -> Self {
        Self { encounter, raid }
    }

    /// Checks the whole spec.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::InvalidEncounter`] for an unusable encounter and
    /// [`SimError::InvalidDefinition`] for the first malformed player.
    pub fn validate(&self) -> SimResult<()> {
        let encounter = &self.encounter;
        if encounter.duration == SimTime::ZERO {
            return Err(SimError::InvalidEncounter("duration must be non-zero".into()));
        }
        if encounter.targets.is_empty() {
            return Err(SimError::InvalidEncounter("at least one target is required".into()));
        }
        if self.raid.is_empty() {
            return Err(SimError::InvalidEncounter("at least one player is required".into()));
        }
        if !encounter.armor_constant.is_finite() || encounter.armor_constant <= 0.0 {
            return Err(SimError::InvalidEncounter("armor constant must be positive".into()));
        }
        for player in &self.raid {
            player.validate(encounter.targets.len())?;
        }
        Ok(())
    }

    /// A copy with one player's base stat raised by `delta`.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::UnknownPlayer`] for an out-of-range index.
    pub fn with_stat_delta(&self, player: usize, stat: Stat, delta: f64) -> SimResult<Self> {
        let mut spec = self.clone();
        let target = spec.raid.get_mut(player).ok_or(SimError::UnknownPlayer(player))?;
        target.base_stats.add_to(stat, delta);
        Ok(spec)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kit::SpellId;
    use crate::resource::ResourceKind;
    use crate::spell::{CostModel, SpellDefinition};

    fn minimal() -> SimSpec {
        let mut kit = Kit::new();
        let spell = kit.add_spell(SpellDefinition::new("Strike"));
        let rotation = RotationSpec::Priority(PriorityRotation::new("p").then_cast(spell));
        SimSpec::new(
            EncounterSpec::single_target(SimTime::from_secs(60), DefenseStats::default()),
            vec![PlayerSpec::new("p", kit, rotation)],
        )
    }

    #[test]
    fn minimal_spec_is_valid() {
        assert!(minimal().validate().is_ok());
    }

    #[test]
    fn empty_encounter_is_rejected() {
        let mut spec = minimal();
        spec.encounter.targets.clear();
        assert!(matches!(spec.validate(), Err(SimError::InvalidEncounter(_))));
        let mut spec = minimal();
        spec.raid.clear();
        assert!(matches!(spec.validate(), Err(SimError::InvalidEncounter(_))));
    }

    #[test]
    fn rotation_with_unknown_spell_is_rejected() {
        let mut spec = minimal();
        spec.raid[0].rotation =
            RotationSpec::Priority(PriorityRotation::new("p").then_cast(SpellId::new(9)));
        assert!(matches!(spec.validate(), Err(SimError::InvalidDefinition { .. })));
    }

    #[test]
    fn cost_without_pool_is_rejected() {
        let mut kit = Kit::new();
        let spell = kit.add_spell(
            SpellDefinition::new("Maul").with_cost(CostModel::new(ResourceKind::Rage, 15.0)),
        );
        let mut spec = minimal();
        spec.raid[0] = PlayerSpec::new(
            "bear",
            kit,
            RotationSpec::Priority(PriorityRotation::new("p").then_cast(spell)),
        );
        assert!(spec.validate().is_err());
    }

    #[test]
    fn stat_delta_touches_only_one_player() {
        let spec = minimal();
        let bumped = spec.with_stat_delta(0, Stat::AttackPower, 50.0).unwrap();
        assert_eq!(bumped.raid[0].base_stats[Stat::AttackPower], 50.0);
        assert_eq!(spec.raid[0].base_stats[Stat::AttackPower], 0.0);
        assert_eq!(
            spec.with_stat_delta(3, Stat::AttackPower, 1.0).unwrap_err(),
            SimError::UnknownPlayer(3)
        );
    }
}
