//! Spec builders shared by the cross-module tests.

use crate::actor::{DefenseStats, SwingResourceGain, Weapon};
use crate::aura::{AuraDefinition, AuraModifier};
use crate::dot::{DotApplyPolicy, DotDefinition, TickOutcome};
use crate::effect::{AuraHost, CastCondition, EffectHook};
use crate::kit::Kit;
use crate::outcome::OutcomePolicy;
use crate::resource::{Regen, ResourceKind, ResourcePoolSpec};
use crate::rotation::{PriorityEntry, PriorityRotation};
use crate::spec::{EncounterSpec, PlayerSpec, RotationSpec, SimSpec};
use crate::spell::{CostModel, DamageFormula, GcdPolicy, PowerSource, SpellDefinition, SpellTarget};
use crate::stat::{School, Stat, StatDependency, Stats};
use crate::time::SimTime;

/// Routes `tracing` output through the test harness. Safe to call repeatedly.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::DEBUG)
        .try_init();
}

/// One player spamming a fixed-damage, off-GCD strike with a cooldown.
pub fn strike_spec(duration: SimTime, damage: f64, cooldown: SimTime) -> SimSpec {
    let mut kit = Kit::new();
    let strike = kit.add_spell(
        SpellDefinition::new("Strike")
            .with_formula(DamageFormula::flat(damage, damage))
            .with_cooldown(cooldown)
            .with_gcd(GcdPolicy::None),
    );
    let rotation = RotationSpec::Priority(PriorityRotation::new("strike").then_cast(strike));
    SimSpec::new(
        EncounterSpec::single_target(duration, DefenseStats::default()),
        vec![PlayerSpec::new("striker", kit, rotation)],
    )
}

/// A tanking bear against a raid boss: rage from white swings, a queued
/// Maul, a proccing Mangle and a stacking Lacerate bleed.
///
/// Exercises most of the engine at once and draws from the RNG in many
/// places, which makes it a good determinism probe.
pub fn bear_spec() -> SimSpec {
    let mut kit = Kit::new();
    let bear_form = kit.add_aura(
        AuraDefinition::new("Bear Form", None)
            .with_modifier(AuraModifier::Stat { stat: Stat::AttackPower, per_stack: 200.0 }),
    );
    let ferocity = kit.add_aura(
        AuraDefinition::new("Ferocity", Some(SimTime::from_secs(8))).with_modifier(AuraModifier::DamageDealt {
            school: Some(School::Physical),
            per_stack: 0.1,
        }),
    );
    let lacerate_dot = kit.add_dot(
        DotDefinition {
            school: School::Physical,
            outcome: TickOutcome::RollCrit,
            apply: DotApplyPolicy::RefreshAndStack,
            ..DotDefinition::new("Lacerate", 5, SimTime::from_secs(3), 31.0)
        }
        .with_coefficient(PowerSource::AttackPower, 0.01)
        .stacking(5),
    );
    let lacerate_aura = kit.dot_aura(lacerate_dot).unwrap();

    let maul = kit.add_spell(
        SpellDefinition::new("Maul")
            .with_outcome(OutcomePolicy::MeleeSpecial)
            .with_cost(CostModel::new(ResourceKind::Rage, 15.0).with_refund(0.8))
            .with_formula(DamageFormula::weapon(1.0, 176.0))
            .with_gcd(GcdPolicy::None),
    );
    let queue_maul = kit.add_spell(
        SpellDefinition::new("Queue Maul")
            .targeting(SpellTarget::Caster)
            .with_gcd(GcdPolicy::None)
            .on_cast(EffectHook::QueueOnNextSwing { spell: maul }),
    );
    let mangle = kit.add_spell(
        SpellDefinition::new("Mangle")
            .with_outcome(OutcomePolicy::MeleeSpecial)
            .with_cost(CostModel::new(ResourceKind::Rage, 20.0).with_refund(0.8))
            .with_formula(DamageFormula::weapon(1.15, 155.0))
            .with_cooldown(SimTime::from_secs(6))
            .on_landed(EffectHook::Proc {
                chance: 0.5,
                then: vec![EffectHook::ActivateAura { aura: ferocity, on: AuraHost::Caster }],
            }),
    );
    let lacerate = kit.add_spell(
        SpellDefinition::new("Lacerate")
            .with_outcome(OutcomePolicy::MeleeSpecial)
            .with_cost(CostModel::new(ResourceKind::Rage, 13.0))
            .with_formula(DamageFormula::flat(88.0, 88.0))
            .applying(lacerate_dot),
    );

    let rotation = PriorityRotation::new("bear")
        .then(
            PriorityEntry::new(queue_maul)
                .when(CastCondition::SwingQueueEmpty)
                .when(CastCondition::ResourceAtLeast { kind: ResourceKind::Rage, amount: 50.0 }),
        )
        .then_cast(mangle)
        .then(PriorityEntry::new(lacerate).when(CastCondition::AuraStacksBelow {
            aura: lacerate_aura,
            on: AuraHost::Target,
            stacks: 5,
        }))
        .then(PriorityEntry::new(lacerate).when(CastCondition::DotRemainingBelow {
            dot: lacerate_dot,
            remaining: SimTime::from_secs(4),
        }));

    let player = PlayerSpec::new("bear", kit, RotationSpec::Priority(rotation))
        .with_stats(
            Stats::new()
                .with(Stat::Strength, 300.0)
                .with(Stat::AttackPower, 2000.0)
                .with(Stat::MeleeCrit, 0.25)
                .with(Stat::MeleeHit, 0.05)
                .with(Stat::Expertise, 0.05)
                .with(Stat::MeleeHaste, 0.1),
        )
        .with_dependency(StatDependency::new(Stat::Strength, Stat::AttackPower, 2.0))
        .with_resource(ResourcePoolSpec::empty(ResourceKind::Rage, 100.0))
        .with_weapon(Weapon::new(150.0, 200.0, SimTime::from_millis(2500)))
        .with_swing_gain(SwingResourceGain { kind: ResourceKind::Rage, per_damage: 0.04 })
        .with_starting_aura(bear_form);

    SimSpec::new(
        EncounterSpec::single_target(SimTime::from_secs(120), DefenseStats::raid_boss())
            .with_variation(SimTime::from_secs(10)),
        vec![player],
    )
}

/// A rogue building combo points with an energy spender and dumping them
/// into a finisher that scales per point.
pub fn rogue_spec(duration: SimTime) -> SimSpec {
    let mut kit = Kit::new();
    let sinister = kit.add_spell(
        SpellDefinition::new("Sinister Strike")
            .with_cost(CostModel::new(ResourceKind::Energy, 40.0))
            .with_formula(DamageFormula::flat(100.0, 100.0))
            .on_landed(EffectHook::GainResource { kind: ResourceKind::ComboPoints, amount: 1.0 }),
    );
    let eviscerate = kit.add_spell(
        SpellDefinition::new("Eviscerate")
            .with_cost(CostModel::new(ResourceKind::ComboPoints, 5.0).consuming_all())
            .with_formula(DamageFormula::flat(50.0, 50.0).with_per_point(100.0)),
    );
    let rotation = PriorityRotation::new("rogue").then_cast(eviscerate).then_cast(sinister);
    let player = PlayerSpec::new("rogue", kit, RotationSpec::Priority(rotation))
        .with_resource(ResourcePoolSpec::full(ResourceKind::Energy, 100.0).with_regen(Regen::PerTick {
            amount: 20.0,
            interval: SimTime::from_secs(2),
        }))
        .with_resource(ResourcePoolSpec::empty(ResourceKind::ComboPoints, 5.0));
    SimSpec::new(
        EncounterSpec::single_target(duration, DefenseStats::default()),
        vec![player],
    )
}
