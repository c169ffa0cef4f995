//! Spell pipeline: castability, commit, cast time and resolution.
//!
//! A cast commits (cost, cooldown, GCD) when it starts and resolves (hooks,
//! outcome roll, magnitude, dot) when it completes. Instant casts do both at
//! once. The spell's own cooldown is committed before any hook runs, so a
//! hook resetting it is never overwritten.

use crate::actor::{ActorId, PendingCast};
use crate::config::{DEFAULT_GCD, MIN_GCD};
use crate::effect::HookContext;
use crate::error::{CastFailure, SimError, SimResult};
use crate::kit::SpellId;
use crate::log::LogEvent;
use crate::metrics::AbilityKey;
use crate::outcome::{AttackTable, HitOutcome, OutcomePolicy, RollResult};
use crate::queue::Action;
use crate::resource::Overdraw;
use crate::spell::{DamageFormula, GcdPolicy, SpellDefinition, SpellFlags, SpellTarget};
use crate::stat::Stat;
use crate::view::RotationView;

use super::Simulation;

pub(super) fn unknown_spell(actor: ActorId, spell: SpellId) -> SimError {
    SimError::UnknownHandle {
        actor,
        kind: "spell",
        index: spell.raw(),
    }
}

/// Applies the outcome multiplier: crit multiplier, block reduction and
/// partial resist.
pub(super) fn apply_outcome(amount: f64, roll: &RollResult, crit_multiplier: f64, block_value: f64) -> f64 {
    let amount = match roll.outcome {
        HitOutcome::Crit => amount * crit_multiplier,
        HitOutcome::Block => (amount - block_value).max(0.0),
        _ => amount,
    };
    amount * (1.0 - roll.resisted)
}

impl Simulation {
    /// Starts a cast chosen by a rotation.
    ///
    /// Returns `Ok(Err(_))` for an uncastable spell; that is a local
    /// condition, not an error.
    pub(crate) fn start_cast(
        &mut self,
        caster: ActorId,
        spell: SpellId,
        target: Option<ActorId>,
    ) -> SimResult<Result<(), CastFailure>> {
        let now = self.now();
        let kit = self.kit_of(caster)?;
        let def = kit.spell(spell).ok_or_else(|| unknown_spell(caster, spell))?;

        let target = match self.cast_target(caster, spell, def, target, false)? {
            Ok(target) => target,
            Err(failure) => return Ok(Err(failure)),
        };
        let consumed = match self.commit_cast(caster, spell, def)? {
            Ok(consumed) => consumed,
            Err(failure) => return Ok(Err(failure)),
        };

        let actor = self.actor_mut(caster)?;
        let haste = if def.flags.contains(SpellFlags::IGNORE_HASTE) {
            0.0
        } else {
            actor.stat(def.school.haste_stat())
        };
        let gcd = match def.gcd {
            GcdPolicy::Default => Some(DEFAULT_GCD),
            GcdPolicy::Custom(gcd) => Some(gcd),
            GcdPolicy::None => None,
        };
        if let Some(base) = gcd {
            actor.gcd_ready_at = now + base.hasted(haste).max(MIN_GCD.min(base));
        }
        let completes_at = now + def.cast_time.hasted(haste);
        if completes_at > now {
            actor.casting = Some(PendingCast {
                spell,
                target,
                consumed,
                completes_at,
            });
        }

        self.log.record(
            now,
            caster,
            LogEvent::CastStarted {
                spell,
                target,
                completes_at,
            },
        );
        if completes_at > now {
            self.queue
                .schedule(completes_at, Action::CastComplete { actor: caster })?;
        } else {
            self.resolve_spell(caster, spell, target, consumed)?;
        }
        Ok(Ok(()))
    }

    /// Resolves the pending cast and wakes the caster.
    pub(crate) fn complete_cast(&mut self, caster: ActorId) -> SimResult<()> {
        let Some(pending) = self.actor_mut(caster)?.casting.take() else {
            return Ok(());
        };
        self.resolve_spell(caster, pending.spell, pending.target, pending.consumed)?;
        let at = self.actor_ref(caster)?.gcd_ready_at.max(self.now());
        self.schedule_ready(caster, at)
    }

    /// Checks castability and picks the target.
    pub(super) fn cast_target(
        &self,
        caster: ActorId,
        spell: SpellId,
        def: &SpellDefinition,
        explicit: Option<ActorId>,
        on_swing: bool,
    ) -> SimResult<Result<ActorId, CastFailure>> {
        let mut view = RotationView::new(self, caster).ok_or(SimError::UnknownActor(caster))?;
        if let Some(target) = explicit {
            self.actor_ref(target)?;
            view = view.with_target(target);
        }
        if let Err(failure) = view.castability(spell, def, on_swing) {
            return Ok(Err(failure));
        }
        let target = match def.target {
            SpellTarget::Caster => Some(explicit.unwrap_or(caster)),
            SpellTarget::Enemy => view.target().map(|t| t.id()),
        };
        Ok(target.ok_or(CastFailure::NoTarget))
    }

    /// Pays the cost and starts the cooldown. Returns the amount consumed.
    pub(super) fn commit_cast(
        &mut self,
        caster: ActorId,
        spell: SpellId,
        def: &SpellDefinition,
    ) -> SimResult<Result<f64, CastFailure>> {
        let now = self.now();
        let actor = self.actor_mut(caster)?;
        let mut consumed = 0.0;
        if let Some(cost) = &def.cost {
            let pool = actor
                .resources
                .get_mut(cost.resource)
                .ok_or(SimError::MissingResource {
                    actor: caster,
                    kind: cost.resource,
                })?;
            consumed = if cost.consume_all {
                pool.drain(now)
            } else {
                match pool.spend(now, cost.amount, Overdraw::Deny) {
                    Ok(spent) => spent,
                    Err(short) => return Ok(Err(CastFailure::Insufficient(short))),
                }
            };
        }

        let state = actor
            .spells
            .get_mut(spell.index())
            .ok_or_else(|| unknown_spell(caster, spell))?;
        state.ready_at = now + def.cooldown;
        state.casts += 1;
        let tally = actor.tally_mut(AbilityKey::Spell(spell));
        tally.casts += 1;
        tally.resource_spent += consumed;

        if let (Some(cost), true) = (&def.cost, consumed > 0.0) {
            self.log.record(
                now,
                caster,
                LogEvent::ResourceSpent {
                    kind: cost.resource,
                    amount: consumed,
                },
            );
        }
        Ok(Ok(consumed))
    }

    /// Runs on-cast hooks, rolls the outcome and applies the result.
    pub(super) fn resolve_spell(
        &mut self,
        caster: ActorId,
        spell: SpellId,
        target: ActorId,
        consumed: f64,
    ) -> SimResult<()> {
        let kit = self.kit_of(caster)?;
        let def = kit.spell(spell).ok_or_else(|| unknown_spell(caster, spell))?;
        let ctx = HookContext::new(caster, target);
        let key = AbilityKey::Spell(spell);

        self.run_hooks(ctx, &def.on_cast)?;
        let roll = self.roll_spell(caster, target, def)?;
        self.actor_mut(caster)?.tally_mut(key).record_outcome(&roll);

        let amount = match (&def.formula, roll.outcome.landed()) {
            (Some(formula), true) => self.spell_magnitude(caster, target, def, formula, consumed, &roll)?,
            _ => 0.0,
        };
        if amount > 0.0 {
            self.record_amount(caster, target, key, amount, def.is_healing())?;
        }
        self.log.record(
            self.now(),
            caster,
            LogEvent::SpellResolved {
                spell,
                target,
                outcome: roll.outcome,
                amount,
            },
        );

        if roll.outcome.landed() {
            self.run_hooks(ctx, &def.on_landed)?;
            if let Some(dot) = def.applies_dot {
                self.apply_dot(caster, target, dot)?;
            }
        } else {
            self.refund(caster, spell, def, consumed)?;
            self.run_hooks(ctx, &def.on_missed)?;
        }
        Ok(())
    }

    fn refund(&mut self, caster: ActorId, spell: SpellId, def: &SpellDefinition, consumed: f64) -> SimResult<()> {
        let Some(cost) = &def.cost else {
            return Ok(());
        };
        let amount = cost.refund_fraction * consumed;
        if amount <= 0.0 {
            return Ok(());
        }
        let now = self.now();
        let actor = self.actor_mut(caster)?;
        let refunded = actor
            .resources
            .get_mut(cost.resource)
            .ok_or(SimError::MissingResource {
                actor: caster,
                kind: cost.resource,
            })?
            .refund(now, amount);
        actor.tally_mut(AbilityKey::Spell(spell)).refunded += refunded;
        self.log.record(
            now,
            caster,
            LogEvent::ResourceRefunded {
                kind: cost.resource,
                amount: refunded,
            },
        );
        Ok(())
    }

    fn roll_spell(&mut self, caster: ActorId, target: ActorId, def: &SpellDefinition) -> SimResult<RollResult> {
        let attacker = &self.actor_ref(caster)?.stats;
        let defense = &self.actor_ref(target)?.defense;
        let mut table = match def.outcome {
            OutcomePolicy::AlwaysHit => return Ok(RollResult::of(HitOutcome::Hit)),
            OutcomePolicy::MeleeSpecial | OutcomePolicy::MeleeWhite => {
                AttackTable::melee(attacker, defense, def.bonus_hit, def.bonus_crit)
            }
            OutcomePolicy::Magic => AttackTable::spell(attacker, defense, def.bonus_hit, def.bonus_crit),
            OutcomePolicy::Healing => AttackTable::healing(attacker, def.bonus_crit),
        };
        if def.flags.contains(SpellFlags::BINARY) {
            table.resistance = 0.0;
        }
        Ok(table.roll(def.outcome, &mut self.rng))
    }

    fn spell_magnitude(
        &mut self,
        caster: ActorId,
        target: ActorId,
        def: &SpellDefinition,
        formula: &DamageFormula,
        consumed: f64,
        roll: &RollResult,
    ) -> SimResult<f64> {
        let attacker = self.actor_ref(caster)?;
        let defender = self.actor_ref(target)?;
        let weapon = attacker.weapon;
        let attack_power = attacker.stat(Stat::AttackPower);
        let power = attacker.stat(formula.power.stat());
        let dealt = if def.flags.contains(SpellFlags::IGNORE_MODIFIERS) {
            1.0
        } else {
            self.damage_modifier(attacker, def.school, true)
        };
        let (taken, armor, block_value) = if def.is_healing() {
            (1.0, 1.0, 0.0)
        } else {
            let armor = if def.school.is_physical() && !def.flags.contains(SpellFlags::IGNORE_ARMOR) {
                defender.defense.armor_multiplier(self.armor_constant)
            } else {
                1.0
            };
            (
                self.damage_modifier(defender, def.school, false),
                armor,
                defender.defense.block_value,
            )
        };

        let mut base = self.rng.roll(formula.base_min, formula.base_max);
        if let (Some(weapon), true) = (weapon, formula.weapon_coefficient > 0.0) {
            let hit = self.rng.roll(weapon.min_damage, weapon.max_damage) + weapon.power_bonus(attack_power);
            base += formula.weapon_coefficient * hit;
        }
        base += formula.power_coefficient * power + formula.per_point * consumed;

        let amount = base * def.damage_multiplier * dealt * taken * armor;
        Ok(apply_outcome(amount, roll, def.crit_multiplier, block_value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actor::DefenseStats;
    use crate::kit::Kit;
    use crate::rotation::PriorityRotation;
    use crate::spec::{EncounterSpec, PlayerSpec, RotationSpec, SimSpec};
    use crate::stat::{School, Stats};
    use crate::time::SimTime;

    fn one_spell(spell: SpellDefinition, stats: Stats) -> SimSpec {
        let mut kit = Kit::new();
        let id = kit.add_spell(spell);
        SimSpec::new(
            EncounterSpec::single_target(SimTime::from_secs(30), DefenseStats::default()),
            vec![PlayerSpec::new(
                "caster",
                kit,
                RotationSpec::Priority(PriorityRotation::new("p").then_cast(id)),
            )
            .with_stats(stats)],
        )
    }

    mod outcome_tests {
        use super::*;

        #[test]
        fn crit_block_and_resist_adjust_amount() {
            let crit = RollResult::of(HitOutcome::Crit);
            assert_eq!(apply_outcome(100.0, &crit, 2.0, 0.0), 200.0);
            let block = RollResult::of(HitOutcome::Block);
            assert_eq!(apply_outcome(100.0, &block, 2.0, 30.0), 70.0);
            assert_eq!(apply_outcome(10.0, &block, 2.0, 30.0), 0.0);
            let partial = RollResult {
                outcome: HitOutcome::Hit,
                resisted: 0.25,
            };
            assert_eq!(apply_outcome(100.0, &partial, 2.0, 0.0), 75.0);
        }
    }

    mod haste_tests {
        use super::*;

        #[test]
        fn gcd_is_floored_at_one_second() {
            let spec = one_spell(
                SpellDefinition::new("Strike"),
                Stats::new().with(Stat::MeleeHaste, 1.0),
            );
            let mut sim = Simulation::new(&spec, 1, false).unwrap();
            sim.advance_to(SimTime::ZERO).unwrap();
            let caster = sim.actor(ActorId::new(0)).unwrap();
            assert_eq!(caster.gcd_ready_at(), MIN_GCD);
        }

        #[test]
        fn cast_time_scales_with_school_haste() {
            let spec = one_spell(
                SpellDefinition::new("Fireball")
                    .with_school(School::Fire)
                    .with_cast_time(SimTime::from_secs(2)),
                Stats::new().with(Stat::SpellHaste, 1.0),
            );
            let mut sim = Simulation::new(&spec, 1, false).unwrap();
            sim.advance_to(SimTime::ZERO).unwrap();
            let caster = sim.actor(ActorId::new(0)).unwrap();
            assert_eq!(caster.casting().unwrap().completes_at, SimTime::from_secs(1));
        }
    }

    mod commit_tests {
        use super::*;
        use crate::spell::DamageFormula;

        #[test]
        fn cast_time_delays_damage() {
            let spec = one_spell(
                SpellDefinition::new("Bolt")
                    .with_school(School::Shadow)
                    .with_cast_time(SimTime::from_millis(2500))
                    .with_formula(DamageFormula::flat(100.0, 100.0)),
                Stats::new(),
            );
            let mut sim = Simulation::new(&spec, 1, false).unwrap();
            sim.advance_to(SimTime::from_millis(2499)).unwrap();
            assert_eq!(sim.actor(ActorId::new(0)).unwrap().damage_done(), 0.0);
            sim.advance_to(SimTime::from_millis(2500)).unwrap();
            assert_eq!(sim.actor(ActorId::new(0)).unwrap().damage_done(), 100.0);
        }
    }
}
