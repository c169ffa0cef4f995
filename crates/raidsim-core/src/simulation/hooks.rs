//! Effect hook execution.
//!
//! Hooks run immediately with one exception: a hook that mutates an aura
//! instance whose own transition hooks are currently running is queued at
//! the current instant instead. Nested transitions therefore never observe a
//! half-applied state of the instance that triggered them.

use crate::aura::AuraKey;
use crate::effect::{EffectHook, HookContext};
use crate::error::{SimError, SimResult};
use crate::log::LogEvent;
use crate::queue::Action;

use super::auras::StackChange;
use super::cast::unknown_spell;
use super::Simulation;

impl Simulation {
    /// Runs hooks in order.
    pub(crate) fn run_hooks(&mut self, ctx: HookContext, hooks: &[EffectHook]) -> SimResult<()> {
        for hook in hooks {
            self.run_hook(ctx, hook)?;
        }
        Ok(())
    }

    /// Runs one hook, or defers it when it targets a transitioning aura.
    pub(crate) fn run_hook(&mut self, ctx: HookContext, hook: &EffectHook) -> SimResult<()> {
        if let Some((aura, on)) = hook.aura_target() {
            let bearer = ctx.host(on);
            if self.transitioning.contains(&(bearer, AuraKey::new(ctx.caster, aura))) {
                let now = self.now();
                return self.queue.schedule(
                    now,
                    Action::Hook {
                        ctx,
                        hook: hook.clone(),
                    },
                );
            }
        }

        let now = self.now();
        match hook {
            EffectHook::GainResource { kind, amount } => {
                let pool = self
                    .actor_mut(ctx.caster)?
                    .resources
                    .get_mut(*kind)
                    .ok_or(SimError::MissingResource {
                        actor: ctx.caster,
                        kind: *kind,
                    })?;
                let gained = pool.gain(now, *amount);
                if gained > 0.0 {
                    self.log.record(
                        now,
                        ctx.caster,
                        LogEvent::ResourceGained {
                            kind: *kind,
                            amount: gained,
                        },
                    );
                }
                Ok(())
            }
            EffectHook::ResetResource { kind } => {
                self.actor_mut(ctx.caster)?
                    .resources
                    .get_mut(*kind)
                    .ok_or(SimError::MissingResource {
                        actor: ctx.caster,
                        kind: *kind,
                    })?
                    .reset(now);
                Ok(())
            }
            EffectHook::ActivateAura { aura, on } => self
                .activate_aura(ctx.host(*on), AuraKey::new(ctx.caster, *aura))
                .map(drop),
            EffectHook::DeactivateAura { aura, on } => self
                .expire_aura(ctx.host(*on), AuraKey::new(ctx.caster, *aura))
                .map(drop),
            EffectHook::AddStack { aura, on } => {
                self.change_stacks(ctx.host(*on), AuraKey::new(ctx.caster, *aura), StackChange::Add)
            }
            EffectHook::RemoveStack { aura, on } => {
                self.change_stacks(ctx.host(*on), AuraKey::new(ctx.caster, *aura), StackChange::Remove)
            }
            EffectHook::ResetCooldown { spell } => {
                let state = self
                    .actor_mut(ctx.caster)?
                    .spells
                    .get_mut(spell.index())
                    .ok_or_else(|| unknown_spell(ctx.caster, *spell))?;
                state.ready_at = now;
                self.nudge(ctx.caster)
            }
            EffectHook::ApplyDot { dot } => self.apply_dot(ctx.caster, ctx.target, *dot),
            EffectHook::QueueOnNextSwing { spell } => {
                let actor = self.actor_mut(ctx.caster)?;
                if actor.kit.spell(*spell).is_none() {
                    return Err(unknown_spell(ctx.caster, *spell));
                }
                actor.queued_swing = Some(*spell);
                Ok(())
            }
            EffectHook::ClearSwingQueue => {
                self.actor_mut(ctx.caster)?.queued_swing = None;
                Ok(())
            }
            EffectHook::Proc { chance, then } => {
                if self.rng.proc(*chance) {
                    self.run_hooks(ctx, then)?;
                }
                Ok(())
            }
            EffectHook::Delayed { delay, then } => {
                let at = now + *delay;
                for hook in then {
                    self.queue.schedule(
                        at,
                        Action::Hook {
                            ctx,
                            hook: hook.clone(),
                        },
                    )?;
                }
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actor::{ActorId, DefenseStats};
    use crate::aura::AuraDefinition;
    use crate::effect::AuraHost;
    use crate::kit::{Kit, SpellId};
    use crate::resource::{ResourceKind, ResourcePoolSpec};
    use crate::rotation::PriorityRotation;
    use crate::spec::{EncounterSpec, PlayerSpec, RotationSpec, SimSpec};
    use crate::spell::SpellDefinition;
    use crate::time::SimTime;

    const PLAYER: ActorId = ActorId::new(0);
    const TARGET: ActorId = ActorId::new(1);

    fn sim(kit: Kit) -> Simulation {
        let player = PlayerSpec::new("p", kit, RotationSpec::Priority(PriorityRotation::new("idle")))
            .with_resource(ResourcePoolSpec::empty(ResourceKind::ComboPoints, 5.0));
        let spec = SimSpec::new(
            EncounterSpec::single_target(SimTime::from_secs(60), DefenseStats::default()),
            vec![player],
        );
        Simulation::new(&spec, 3, true).unwrap()
    }

    fn ctx() -> HookContext {
        HookContext::new(PLAYER, TARGET)
    }

    fn combo_points(sim: &Simulation) -> f64 {
        let now = sim.now();
        sim.actor(PLAYER)
            .unwrap()
            .resources()
            .get(ResourceKind::ComboPoints)
            .unwrap()
            .current(now)
    }

    mod resource_tests {
        use super::*;

        #[test]
        fn gain_caps_and_reset_empties() {
            let mut sim = sim(Kit::new());
            let gain = EffectHook::GainResource {
                kind: ResourceKind::ComboPoints,
                amount: 3.0,
            };
            sim.run_hooks(ctx(), &[gain.clone(), gain]).unwrap();
            assert_eq!(combo_points(&sim), 5.0);
            sim.run_hook(ctx(), &EffectHook::ResetResource { kind: ResourceKind::ComboPoints })
                .unwrap();
            assert_eq!(combo_points(&sim), 0.0);
        }

        #[test]
        fn missing_pool_is_fatal() {
            let mut sim = sim(Kit::new());
            let err = sim
                .run_hook(ctx(), &EffectHook::GainResource { kind: ResourceKind::Mana, amount: 1.0 })
                .unwrap_err();
            assert!(matches!(err, SimError::MissingResource { .. }));
        }
    }

    mod aura_tests {
        use super::*;

        #[test]
        fn debuff_lands_on_target_with_caster_as_owner() {
            let mut kit = Kit::new();
            let debuff = kit.add_aura(AuraDefinition::new("Sunder", Some(SimTime::from_secs(30))));
            let mut sim = sim(kit);
            sim.run_hook(ctx(), &EffectHook::ActivateAura { aura: debuff, on: AuraHost::Target })
                .unwrap();
            assert!(sim.actor(TARGET).unwrap().aura_active(AuraKey::new(PLAYER, debuff)));
            assert!(!sim.actor(PLAYER).unwrap().aura_active(AuraKey::new(PLAYER, debuff)));
        }
    }

    mod control_tests {
        use super::*;

        #[test]
        fn delayed_hooks_run_later() {
            let mut sim = sim(Kit::new());
            let delayed = EffectHook::Delayed {
                delay: SimTime::from_secs(2),
                then: vec![EffectHook::GainResource {
                    kind: ResourceKind::ComboPoints,
                    amount: 1.0,
                }],
            };
            sim.run_hook(ctx(), &delayed).unwrap();
            assert_eq!(combo_points(&sim), 0.0);
            sim.advance_to(SimTime::from_secs(2)).unwrap();
            assert_eq!(combo_points(&sim), 1.0);
        }

        #[test]
        fn certain_and_impossible_procs() {
            let mut sim = sim(Kit::new());
            let point = vec![EffectHook::GainResource {
                kind: ResourceKind::ComboPoints,
                amount: 1.0,
            }];
            sim.run_hook(ctx(), &EffectHook::Proc { chance: 0.0, then: point.clone() })
                .unwrap();
            sim.run_hook(ctx(), &EffectHook::Proc { chance: 1.0, then: point }).unwrap();
            assert_eq!(combo_points(&sim), 1.0);
        }

        #[test]
        fn swing_queue_accepts_only_known_spells() {
            let mut kit = Kit::new();
            let maul = kit.add_spell(SpellDefinition::new("Maul"));
            let mut sim = sim(kit);
            sim.run_hook(ctx(), &EffectHook::QueueOnNextSwing { spell: maul }).unwrap();
            assert_eq!(sim.actor(PLAYER).unwrap().queued_swing(), Some(maul));
            sim.run_hook(ctx(), &EffectHook::ClearSwingQueue).unwrap();
            assert_eq!(sim.actor(PLAYER).unwrap().queued_swing(), None);
            assert!(sim
                .run_hook(ctx(), &EffectHook::QueueOnNextSwing { spell: SpellId::new(4) })
                .is_err());
        }

        #[test]
        fn reset_cooldown_makes_spell_ready() {
            let mut kit = Kit::new();
            let slam = kit.add_spell(SpellDefinition::new("Slam").with_cooldown(SimTime::from_secs(10)));
            let mut sim = sim(kit);
            sim.actor_mut(PLAYER).unwrap().spells[slam.index()].ready_at = SimTime::from_secs(10);
            sim.run_hook(ctx(), &EffectHook::ResetCooldown { spell: slam }).unwrap();
            assert!(sim.actor(PLAYER).unwrap().spell_state(slam).unwrap().is_ready(sim.now()));
        }
    }
}
