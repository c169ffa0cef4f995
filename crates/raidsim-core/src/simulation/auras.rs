//! Aura transitions on the orchestrator side.
//!
//! [`AuraState`](crate::aura::AuraState) handles the state machine; this
//! module adds what needs the clock or other actors: expiration checks,
//! exclusivity groups with linger, stat recomputation, logging and hooks.

use crate::actor::ActorId;
use crate::aura::{Activation, AuraDefinition, AuraKey};
use crate::dot::DotKey;
use crate::effect::EffectHook;
use crate::error::{SimError, SimResult};
use crate::kit::AuraId;
use crate::log::LogEvent;
use crate::queue::Action;
use crate::time::SimTime;

use super::Simulation;

pub(super) fn unknown_aura(actor: ActorId, aura: AuraId) -> SimError {
    SimError::UnknownHandle {
        actor,
        kind: "aura",
        index: aura.raw(),
    }
}

/// Which way a stack hook moves the count.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum StackChange {
    Add,
    Remove,
}

impl Simulation {
    /// Activates (or refreshes) an aura on `bearer`.
    pub(crate) fn activate_aura(&mut self, bearer: ActorId, key: AuraKey) -> SimResult<Activation> {
        let now = self.now();
        let kit = self.kit_of(key.owner)?;
        let def = kit.aura(key.aura).ok_or_else(|| unknown_aura(key.owner, key.aura))?;

        if let Some(group) = def.exclusive_group {
            self.displace_exclusive(bearer, key, group, def)?;
        }

        let state = self.actor_mut(bearer)?.auras.entry(key).or_default();
        let activation = state.activate(def, now);
        let expires_at = state.expires_at();
        let generation = state.generation();

        match activation {
            Activation::Gained => {
                self.log.record(
                    now,
                    bearer,
                    LogEvent::AuraGained {
                        owner: key.owner,
                        aura: key.aura,
                    },
                );
            }
            Activation::Refreshed => {
                self.log.record(
                    now,
                    bearer,
                    LogEvent::AuraRefreshed {
                        owner: key.owner,
                        aura: key.aura,
                        expires_at,
                    },
                );
            }
            Activation::Rejected => return Ok(activation),
        }

        if let Some(group) = def.exclusive_group {
            self.actor_mut(bearer)?.exclusive.insert(group, key);
        }
        if !expires_at.is_never() {
            self.schedule_expiry(bearer, key, expires_at, generation)?;
        }
        if activation == Activation::Gained {
            if def.modifies_stats() {
                self.recompute_stats(bearer)?;
            }
            self.run_transition_hooks(bearer, key, &def.on_gain)?;
        }
        Ok(activation)
    }

    /// Frees an exclusivity group slot for `key`. With a linger window the
    /// holder is cut to that window if it has at least that long left and
    /// otherwise keeps its own expiry; without one it expires now.
    fn displace_exclusive(
        &mut self,
        bearer: ActorId,
        key: AuraKey,
        group: u16,
        def: &AuraDefinition,
    ) -> SimResult<()> {
        let now = self.now();
        let actor = self.actor_ref(bearer)?;
        let Some(holder) = actor.exclusive.get(&group).copied() else {
            return Ok(());
        };
        if holder == key {
            return Ok(());
        }
        if !actor.aura_active(holder) {
            self.actor_mut(bearer)?.exclusive.remove(&group);
            return Ok(());
        }

        let remaining = actor.aura(holder).map_or(SimTime::ZERO, |s| s.remaining(now));
        match def.linger {
            Some(linger) if remaining >= linger => {
                let at = now + linger;
                let state = self
                    .actor_mut(bearer)?
                    .auras
                    .get_mut(&holder)
                    .ok_or_else(|| unknown_aura(holder.owner, holder.aura))?;
                state.set_expires_at(at);
                let generation = state.generation();
                self.schedule_expiry(bearer, holder, at, generation)
            }
            // shorter than the linger window: runs out on its own schedule
            Some(_) => Ok(()),
            None => self.expire_aura(bearer, holder).map(drop),
        }
    }

    fn schedule_expiry(&mut self, bearer: ActorId, key: AuraKey, at: SimTime, generation: u64) -> SimResult<()> {
        self.queue.schedule(
            at,
            Action::AuraExpire {
                bearer,
                key,
                generation,
            },
        )
    }

    /// Handles a scheduled expiration check. Stale checks are ignored.
    pub(crate) fn on_aura_expire(&mut self, bearer: ActorId, key: AuraKey, generation: u64) -> SimResult<()> {
        let now = self.now();
        let current = self
            .actor_ref(bearer)?
            .aura(key)
            .filter(|s| s.is_active() && s.generation() == generation && s.expires_at() <= now);
        if current.is_some() {
            self.expire_aura(bearer, key)?;
        }
        Ok(())
    }

    /// Active -> Inactive. Returns `false` if the aura was not active.
    pub(crate) fn expire_aura(&mut self, bearer: ActorId, key: AuraKey) -> SimResult<bool> {
        let now = self.now();
        let kit = self.kit_of(key.owner)?;
        let def = kit.aura(key.aura).ok_or_else(|| unknown_aura(key.owner, key.aura))?;

        let actor = self.actor_mut(bearer)?;
        let expired = actor.auras.get_mut(&key).is_some_and(|s| s.expire(now));
        if !expired {
            return Ok(false);
        }
        if let Some(group) = def.exclusive_group {
            if actor.exclusive.get(&group) == Some(&key) {
                actor.exclusive.remove(&group);
            }
        }
        if let Some(dot) = kit.dot_for_aura(key.aura) {
            if let Some(state) = actor.dots.get_mut(&DotKey::new(key.owner, dot)) {
                if state.is_ticking() {
                    state.stop();
                }
            }
        }

        self.log.record(
            now,
            bearer,
            LogEvent::AuraExpired {
                owner: key.owner,
                aura: key.aura,
            },
        );
        if def.modifies_stats() {
            self.recompute_stats(bearer)?;
        }
        self.run_transition_hooks(bearer, key, &def.on_expire)?;
        Ok(true)
    }

    /// Adds or removes one stack. Removing the last stack expires the aura.
    pub(super) fn change_stacks(&mut self, bearer: ActorId, key: AuraKey, change: StackChange) -> SimResult<()> {
        let now = self.now();
        let kit = self.kit_of(key.owner)?;
        let def = kit.aura(key.aura).ok_or_else(|| unknown_aura(key.owner, key.aura))?;

        let Some(state) = self.actor_mut(bearer)?.auras.get_mut(&key) else {
            return Ok(());
        };
        let changed = match change {
            StackChange::Add => state.add_stack(def),
            StackChange::Remove => state.remove_stack(def),
        };
        let Some((_, stacks)) = changed else {
            return Ok(());
        };

        self.log.record(
            now,
            bearer,
            LogEvent::AuraStacks {
                owner: key.owner,
                aura: key.aura,
                stacks,
            },
        );
        if stacks == 0 {
            self.expire_aura(bearer, key)?;
            return Ok(());
        }
        if def.modifies_stats() {
            self.recompute_stats(bearer)?;
        }
        self.run_transition_hooks(bearer, key, &def.on_stack_change)
    }

    /// Runs an aura's transition hooks with the instance marked as
    /// transitioning, so hooks aimed back at it are deferred.
    fn run_transition_hooks(&mut self, bearer: ActorId, key: AuraKey, hooks: &[EffectHook]) -> SimResult<()> {
        if hooks.is_empty() {
            return Ok(());
        }
        let ctx = self.aura_context(bearer, key)?;
        let marked = self.transitioning.insert((bearer, key));
        let result = self.run_hooks(ctx, hooks);
        if marked {
            self.transitioning.remove(&(bearer, key));
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actor::DefenseStats;
    use crate::aura::{AuraModifier, RefreshPolicy};
    use crate::effect::AuraHost;
    use crate::kit::Kit;
    use crate::rotation::PriorityRotation;
    use crate::spec::{EncounterSpec, PlayerSpec, RotationSpec, SimSpec};
    use crate::stat::Stat;

    const PLAYER: ActorId = ActorId::new(0);

    fn sim_with(kit: Kit, starting: &[AuraId]) -> Simulation {
        let mut player = PlayerSpec::new("p", kit, RotationSpec::Priority(PriorityRotation::new("idle")));
        for aura in starting {
            player = player.with_starting_aura(*aura);
        }
        let spec = SimSpec::new(
            EncounterSpec::single_target(SimTime::from_secs(120), DefenseStats::default()),
            vec![player],
        );
        Simulation::new(&spec, 5, true).unwrap()
    }

    /// A marker aura whose expiry gives the queue an event at `at`, so
    /// `advance_to(at)` actually moves the clock there.
    fn clock(kit: &mut Kit, at: SimTime) -> AuraId {
        kit.add_aura(AuraDefinition::new("Clock", Some(at)))
    }

    mod lifecycle_tests {
        use super::*;

        #[test]
        fn stat_aura_raises_and_restores_stats() {
            let mut kit = Kit::new();
            let buff = kit.add_aura(
                AuraDefinition::new("Might", Some(SimTime::from_secs(10)))
                    .with_modifier(AuraModifier::Stat { stat: Stat::AttackPower, per_stack: 100.0 }),
            );
            let mut sim = sim_with(kit, &[buff]);
            assert_eq!(sim.actor(PLAYER).unwrap().stat(Stat::AttackPower), 100.0);
            sim.advance_to(SimTime::from_secs(10)).unwrap();
            let player = sim.actor(PLAYER).unwrap();
            assert!(!player.aura_active(AuraKey::new(PLAYER, buff)));
            assert_eq!(player.stat(Stat::AttackPower), 0.0);
        }

        #[test]
        fn refresh_makes_old_check_stale() {
            let mut kit = Kit::new();
            let buff = kit.add_aura(AuraDefinition::new("Buff", Some(SimTime::from_secs(10))));
            let tick = clock(&mut kit, SimTime::from_secs(4));
            let mut sim = sim_with(kit, &[buff, tick]);
            sim.advance_to(SimTime::from_secs(4)).unwrap();
            assert_eq!(sim.now(), SimTime::from_secs(4));
            let key = AuraKey::new(PLAYER, buff);
            assert_eq!(sim.activate_aura(PLAYER, key).unwrap(), Activation::Refreshed);
            sim.advance_to(SimTime::from_secs(10)).unwrap();
            assert!(sim.actor(PLAYER).unwrap().aura_active(key));
            sim.advance_to(SimTime::from_secs(14)).unwrap();
            assert!(!sim.actor(PLAYER).unwrap().aura_active(key));
        }

        #[test]
        fn reject_policy_reports_rejection() {
            let mut kit = Kit::new();
            let buff = kit.add_aura(
                AuraDefinition::new("Once", Some(SimTime::from_secs(10))).with_refresh(RefreshPolicy::Reject),
            );
            let mut sim = sim_with(kit, &[buff]);
            let key = AuraKey::new(PLAYER, buff);
            assert_eq!(sim.activate_aura(PLAYER, key).unwrap(), Activation::Rejected);
            assert_eq!(sim.actor(PLAYER).unwrap().aura(key).unwrap().expires_at(), SimTime::from_secs(10));
        }

        #[test]
        fn removing_last_stack_expires() {
            let mut kit = Kit::new();
            let stacks = kit.add_aura(AuraDefinition::new("Stacks", None).stacking(3));
            let mut sim = sim_with(kit, &[stacks]);
            let key = AuraKey::new(PLAYER, stacks);
            sim.change_stacks(PLAYER, key, StackChange::Add).unwrap();
            assert_eq!(sim.actor(PLAYER).unwrap().aura(key).unwrap().stacks(), 2);
            sim.change_stacks(PLAYER, key, StackChange::Remove).unwrap();
            sim.change_stacks(PLAYER, key, StackChange::Remove).unwrap();
            assert!(!sim.actor(PLAYER).unwrap().aura_active(key));
        }
    }

    mod exclusive_tests {
        use super::*;

        fn seals(linger: Option<SimTime>, replace_at: SimTime) -> (Kit, AuraId, AuraId, AuraId) {
            let mut kit = Kit::new();
            let a = kit.add_aura(AuraDefinition::new("Seal A", Some(SimTime::from_secs(30))).exclusive(1, linger));
            let b = kit.add_aura(AuraDefinition::new("Seal B", Some(SimTime::from_secs(30))).exclusive(1, linger));
            let tick = clock(&mut kit, replace_at);
            (kit, a, b, tick)
        }

        #[test]
        fn replacement_without_linger_expires_old() {
            let (kit, a, b, tick) = seals(None, SimTime::from_secs(5));
            let mut sim = sim_with(kit, &[a, tick]);
            sim.advance_to(SimTime::from_secs(5)).unwrap();
            sim.activate_aura(PLAYER, AuraKey::new(PLAYER, b)).unwrap();
            let player = sim.actor(PLAYER).unwrap();
            assert!(!player.aura_active(AuraKey::new(PLAYER, a)));
            assert_eq!(player.exclusive_slot(1), Some(AuraKey::new(PLAYER, b)));
        }

        #[test]
        fn replacement_with_linger_keeps_old_briefly() {
            let (kit, a, b, tick) = seals(Some(SimTime::from_millis(400)), SimTime::from_secs(5));
            let mut sim = sim_with(kit, &[a, tick]);
            sim.advance_to(SimTime::from_secs(5)).unwrap();
            assert_eq!(sim.now(), SimTime::from_secs(5));
            sim.activate_aura(PLAYER, AuraKey::new(PLAYER, b)).unwrap();

            let old = AuraKey::new(PLAYER, a);
            let state = sim.actor(PLAYER).unwrap().aura(old).unwrap();
            assert!(state.is_active());
            assert_eq!(state.expires_at(), SimTime::from_millis(5400));
            assert_eq!(sim.actor(PLAYER).unwrap().exclusive_slot(1), Some(AuraKey::new(PLAYER, b)));

            sim.advance_to(SimTime::from_millis(5399)).unwrap();
            assert!(sim.actor(PLAYER).unwrap().aura_active(old));
            sim.advance_to(SimTime::from_millis(5400)).unwrap();
            assert!(!sim.actor(PLAYER).unwrap().aura_active(old));
            // the original 30 s check is stale and must not touch the new holder
            sim.advance_to(SimTime::from_secs(30)).unwrap();
            assert!(sim.actor(PLAYER).unwrap().aura_active(AuraKey::new(PLAYER, b)));
        }

        #[test]
        fn holder_shorter_than_linger_runs_out_naturally() {
            let (kit, a, b, tick) = seals(Some(SimTime::from_millis(400)), SimTime::from_millis(29_800));
            let mut sim = sim_with(kit, &[a, tick]);
            sim.advance_to(SimTime::from_millis(29_800)).unwrap();
            assert_eq!(sim.now(), SimTime::from_millis(29_800));
            sim.activate_aura(PLAYER, AuraKey::new(PLAYER, b)).unwrap();

            let old = AuraKey::new(PLAYER, a);
            let state = sim.actor(PLAYER).unwrap().aura(old).unwrap();
            assert!(state.is_active(), "200 ms holder was cut short");
            assert_eq!(state.expires_at(), SimTime::from_secs(30));
            assert_eq!(sim.actor(PLAYER).unwrap().exclusive_slot(1), Some(AuraKey::new(PLAYER, b)));

            sim.advance_to(SimTime::from_secs(30)).unwrap();
            let player = sim.actor(PLAYER).unwrap();
            assert!(!player.aura_active(old));
            assert!(player.aura_active(AuraKey::new(PLAYER, b)));
            assert_eq!(player.exclusive_slot(1), Some(AuraKey::new(PLAYER, b)));
        }
    }

    mod reentrancy_tests {
        use super::*;

        #[test]
        fn hook_on_own_aura_is_deferred() {
            let mut kit = Kit::new();
            let aura = AuraId::new(0);
            let stacking = kit.add_aura(
                AuraDefinition::new("Self Stacker", Some(SimTime::from_secs(20)))
                    .stacking(5)
                    .on_gain(EffectHook::AddStack { aura, on: AuraHost::Caster }),
            );
            assert_eq!(stacking, aura);
            let mut sim = sim_with(kit, &[]);
            let key = AuraKey::new(PLAYER, aura);
            sim.activate_aura(PLAYER, key).unwrap();
            // the on-gain stack is queued, not applied inside the transition
            assert_eq!(sim.actor(PLAYER).unwrap().aura(key).unwrap().stacks(), 1);
            sim.advance_to(sim.now()).unwrap();
            assert_eq!(sim.actor(PLAYER).unwrap().aura(key).unwrap().stacks(), 2);
        }
    }
}
