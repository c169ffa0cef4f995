//! Auto-attacks and the swing queue.
//!
//! An armed actor swings at its primary target every hasted weapon-speed
//! interval. A spell in the swing queue replaces the next white swing if it
//! can be paid for at that moment; otherwise the swing goes out white and
//! the queue slot is cleared either way.

use crate::actor::ActorId;
use crate::error::{SimError, SimResult};
use crate::kit::SpellId;
use crate::log::LogEvent;
use crate::metrics::AbilityKey;
use crate::outcome::{AttackTable, OutcomePolicy};
use crate::queue::Action;
use crate::stat::{School, Stat};

use super::cast::{apply_outcome, unknown_spell};
use super::Simulation;

/// Critical multiplier of white swings.
const WHITE_CRIT_MULTIPLIER: f64 = 2.0;

impl Simulation {
    pub(crate) fn on_auto_attack(&mut self, id: ActorId) -> SimResult<()> {
        let actor = self.actor_ref(id)?;
        let (Some(weapon), Some(target)) = (actor.weapon, actor.primary_target) else {
            return Ok(());
        };

        let queued = self.actor_mut(id)?.queued_swing.take();
        let replaced = match queued {
            Some(spell) => self.swing_spell(id, spell, target)?,
            None => false,
        };
        if !replaced {
            self.white_swing(id, target)?;
        }

        let now = self.now();
        let haste = self.actor_ref(id)?.stat(Stat::MeleeHaste);
        let at = now + weapon.speed.hasted(haste);
        self.actor_mut(id)?.next_swing_at = Some(at);
        self.queue.schedule(at, Action::AutoAttack { actor: id })
    }

    /// Resolves a queued spell in place of a white swing. Returns `false`
    /// when the spell cannot go out now.
    fn swing_spell(&mut self, id: ActorId, spell: SpellId, target: ActorId) -> SimResult<bool> {
        let kit = self.kit_of(id)?;
        let def = kit.spell(spell).ok_or_else(|| unknown_spell(id, spell))?;
        let target = match self.cast_target(id, spell, def, Some(target), true)? {
            Ok(target) => target,
            Err(_) => return Ok(false),
        };
        let consumed = match self.commit_cast(id, spell, def)? {
            Ok(consumed) => consumed,
            Err(_) => return Ok(false),
        };
        self.resolve_spell(id, spell, target, consumed)?;
        Ok(true)
    }

    fn white_swing(&mut self, id: ActorId, target: ActorId) -> SimResult<()> {
        let now = self.now();
        let attacker = self.actor_ref(id)?;
        let defender = self.actor_ref(target)?;
        let Some(weapon) = attacker.weapon else {
            return Ok(());
        };
        let table = AttackTable::melee(&attacker.stats, &defender.defense, 0.0, 0.0);
        let attack_power = attacker.stat(Stat::AttackPower);
        let swing_gain = attacker.swing_gain;
        let multiplier = self.damage_modifier(attacker, School::Physical, true)
            * self.damage_modifier(defender, School::Physical, false)
            * defender.defense.armor_multiplier(self.armor_constant);
        let block_value = defender.defense.block_value;

        let roll = table.roll(OutcomePolicy::MeleeWhite, &mut self.rng);
        let amount = if roll.outcome.landed() {
            let hit = self.rng.roll(weapon.min_damage, weapon.max_damage) + weapon.power_bonus(attack_power);
            apply_outcome(hit * multiplier, &roll, WHITE_CRIT_MULTIPLIER, block_value)
        } else {
            0.0
        };

        let tally = self.actor_mut(id)?.tally_mut(AbilityKey::Melee);
        tally.casts += 1;
        tally.record_outcome(&roll);
        if amount > 0.0 {
            self.record_amount(id, target, AbilityKey::Melee, amount, false)?;
        }
        self.log.record(
            now,
            id,
            LogEvent::Swing {
                target,
                outcome: roll.outcome,
                amount,
            },
        );

        let Some(gain) = swing_gain.filter(|_| amount > 0.0) else {
            return Ok(());
        };
        let gained = self
            .actor_mut(id)?
            .resources
            .get_mut(gain.kind)
            .ok_or(SimError::MissingResource {
                actor: id,
                kind: gain.kind,
            })?
            .gain(now, gain.per_damage * amount);
        if gained > 0.0 {
            self.log.record(
                now,
                id,
                LogEvent::ResourceGained {
                    kind: gain.kind,
                    amount: gained,
                },
            );
            self.nudge(id)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actor::{DefenseStats, SwingResourceGain, Weapon};
    use crate::effect::EffectHook;
    use crate::effect::HookContext;
    use crate::kit::Kit;
    use crate::metrics::MELEE_LABEL;
    use crate::resource::{ResourceKind, ResourcePoolSpec};
    use crate::rotation::PriorityRotation;
    use crate::spec::{EncounterSpec, PlayerSpec, RotationSpec, SimSpec};
    use crate::spell::{CostModel, DamageFormula, GcdPolicy, SpellDefinition};
    use crate::stat::Stats;
    use crate::time::SimTime;

    const PLAYER: ActorId = ActorId::new(0);
    const TARGET: ActorId = ActorId::new(1);

    fn bear(kit: Kit, stats: Stats) -> PlayerSpec {
        PlayerSpec::new("bear", kit, RotationSpec::Priority(PriorityRotation::new("idle")))
            .with_stats(stats)
            .with_weapon(Weapon::new(100.0, 100.0, SimTime::from_secs(2)))
            .with_resource(ResourcePoolSpec::empty(ResourceKind::Rage, 100.0))
            .with_swing_gain(SwingResourceGain {
                kind: ResourceKind::Rage,
                per_damage: 0.1,
            })
    }

    fn sim(player: PlayerSpec) -> Simulation {
        let spec = SimSpec::new(
            EncounterSpec::single_target(SimTime::from_secs(60), DefenseStats::default()),
            vec![player],
        );
        Simulation::new(&spec, 9, true).unwrap()
    }

    fn rage(sim: &Simulation) -> f64 {
        let now = sim.now();
        sim.actor(PLAYER)
            .unwrap()
            .resources()
            .get(ResourceKind::Rage)
            .unwrap()
            .current(now)
    }

    mod white_tests {
        use super::*;

        #[test]
        fn swings_on_weapon_speed_and_generate_rage() {
            let mut sim = sim(bear(Kit::new(), Stats::new()));
            sim.advance_to(SimTime::from_secs(9)).unwrap();
            assert_eq!(sim.actor(PLAYER).unwrap().damage_done(), 500.0);
            assert!((rage(&sim) - 50.0).abs() < 1e-9);
        }

        #[test]
        fn haste_shortens_the_interval() {
            let mut sim = sim(bear(Kit::new(), Stats::new().with(Stat::MeleeHaste, 1.0)));
            sim.advance_to(SimTime::from_millis(4500)).unwrap();
            // swings at 0, 1, 2, 3, 4
            assert_eq!(sim.actor(PLAYER).unwrap().damage_done(), 500.0);
        }

        #[test]
        fn attack_power_adds_normalized_bonus() {
            let stats = Stats::new().with(Stat::AttackPower, 1400.0);
            let mut sim = sim(bear(Kit::new(), stats));
            sim.advance_to(SimTime::ZERO).unwrap();
            // 100 + 1400 / 14 * 2
            assert_eq!(sim.actor(PLAYER).unwrap().damage_done(), 300.0);
        }
    }

    mod queue_tests {
        use super::*;

        fn maul_kit() -> (Kit, SpellId) {
            let mut kit = Kit::new();
            let maul = kit.add_spell(
                SpellDefinition::new("Maul")
                    .with_cost(CostModel::new(ResourceKind::Rage, 15.0))
                    .with_formula(DamageFormula::weapon(1.0, 50.0))
                    .with_gcd(GcdPolicy::None),
            );
            (kit, maul)
        }

        #[test]
        fn queued_spell_replaces_swing_when_affordable() {
            let (kit, maul) = maul_kit();
            let mut sim = sim(bear(kit, Stats::new()));
            sim.advance_to(SimTime::ZERO).unwrap();
            assert!((rage(&sim) - 10.0).abs() < 1e-9);

            sim.run_hook(HookContext::new(PLAYER, TARGET), &EffectHook::QueueOnNextSwing { spell: maul })
                .unwrap();
            sim.advance_to(SimTime::from_secs(2)).unwrap();
            // not enough rage: white swing, slot cleared
            let player = sim.actor(PLAYER).unwrap();
            assert_eq!(player.queued_swing(), None);
            assert_eq!(player.damage_done(), 200.0);

            sim.run_hook(HookContext::new(PLAYER, TARGET), &EffectHook::QueueOnNextSwing { spell: maul })
                .unwrap();
            sim.advance_to(SimTime::from_secs(4)).unwrap();
            let player = sim.actor(PLAYER).unwrap();
            assert_eq!(player.damage_done(), 350.0);
            assert!((rage(&sim) - 5.0).abs() < 1e-9);
            let result = sim.run().unwrap();
            assert!(result.players[0].ability(MELEE_LABEL).unwrap().casts >= 2);
            assert_eq!(result.players[0].ability("Maul").unwrap().casts, 1);
        }
    }
}
