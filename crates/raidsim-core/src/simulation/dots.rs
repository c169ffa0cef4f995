//! Periodic effects.
//!
//! A dot lives on its bearer under a [`DotKey`] and is mirrored by a backing
//! aura from the caster's kit. The aura carries stacks and visibility; the
//! tick chain carries timing. The final tick expires the aura, and forcing
//! the aura off stops the chain.

use crate::actor::ActorId;
use crate::aura::AuraKey;
use crate::dot::{DotApplyPolicy, DotDefinition, DotKey, DotSnapshot, SnapshotMode, TickOutcome};
use crate::error::{SimError, SimResult};
use crate::kit::DotId;
use crate::log::LogEvent;
use crate::metrics::AbilityKey;
use crate::queue::Action;

use super::auras::StackChange;
use super::Simulation;

fn unknown_dot(actor: ActorId, dot: DotId) -> SimError {
    SimError::UnknownHandle {
        actor,
        kind: "dot",
        index: dot.raw(),
    }
}

impl Simulation {
    /// Applies (or refreshes) `caster`'s dot on `target`.
    pub(crate) fn apply_dot(&mut self, caster: ActorId, target: ActorId, dot: DotId) -> SimResult<()> {
        let now = self.now();
        let kit = self.kit_of(caster)?;
        let def = kit.dot(dot).ok_or_else(|| unknown_dot(caster, dot))?;
        let aura = kit.dot_aura(dot).ok_or_else(|| unknown_dot(caster, dot))?;
        let aura_key = AuraKey::new(caster, aura);
        let key = DotKey::new(caster, dot);

        let ticking = self.actor_ref(target)?.dot(key).is_some_and(|s| s.is_ticking());
        self.activate_aura(target, aura_key)?;
        if ticking && def.apply == DotApplyPolicy::RefreshAndStack {
            self.change_stacks(target, aura_key, StackChange::Add)?;
        }

        let snapshot = self.snapshot(caster, target, aura_key, def)?;
        let state = self.actor_mut(target)?.dots.entry(key).or_default();
        if ticking {
            state.refresh(def, snapshot);
        } else {
            state.start(def, now, snapshot);
            let (at, generation) = (state.next_tick_at, state.generation);
            self.queue.schedule(
                at,
                Action::DotTick {
                    bearer: target,
                    key,
                    generation,
                },
            )?;
        }
        self.sync_backing_aura(target, aura_key, key, def)
    }

    /// Captures tick magnitude from the caster's current state.
    fn snapshot(
        &self,
        caster: ActorId,
        target: ActorId,
        aura_key: AuraKey,
        def: &DotDefinition,
    ) -> SimResult<DotSnapshot> {
        let attacker = self.actor_ref(caster)?;
        let stacks = if def.max_stacks > 0 {
            let bearer = self.actor_ref(target)?;
            f64::from(bearer.aura(aura_key).map_or(0, |s| s.stacks()))
        } else {
            1.0
        };
        let attacker_multiplier = if def.healing {
            1.0
        } else {
            self.damage_modifier(attacker, def.school, true)
        };
        let crit_chance = match def.outcome {
            TickOutcome::AlwaysHit => 0.0,
            TickOutcome::RollCrit => attacker.stat(def.school.crit_stat()),
        };
        Ok(DotSnapshot {
            base: (def.base_tick + def.coefficient * attacker.stat(def.power.stat())) * stacks,
            attacker_multiplier,
            crit_chance,
        })
    }

    /// Lines the backing aura's expiration up with the final tick.
    fn sync_backing_aura(
        &mut self,
        bearer: ActorId,
        aura_key: AuraKey,
        key: DotKey,
        def: &DotDefinition,
    ) -> SimResult<()> {
        let actor = self.actor_mut(bearer)?;
        let last = actor.dots.get(&key).map(|s| s.last_tick_at(def));
        if let (Some(last), Some(aura)) = (last, actor.auras.get_mut(&aura_key)) {
            if aura.is_active() {
                aura.set_expires_at(last);
            }
        }
        Ok(())
    }

    /// Handles one scheduled tick. Stale ticks are ignored.
    pub(crate) fn on_dot_tick(&mut self, bearer: ActorId, key: DotKey, generation: u64) -> SimResult<()> {
        let now = self.now();
        let kit = self.kit_of(key.owner)?;
        let def = kit.dot(key.dot).ok_or_else(|| unknown_dot(key.owner, key.dot))?;
        let aura = kit.dot_aura(key.dot).ok_or_else(|| unknown_dot(key.owner, key.dot))?;
        let aura_key = AuraKey::new(key.owner, aura);

        let Some(state) = self.actor_ref(bearer)?.dot(key) else {
            return Ok(());
        };
        if state.generation != generation || !state.is_ticking() {
            return Ok(());
        }
        let snapshot = match def.mode {
            SnapshotMode::Snapshot => state.snapshot,
            SnapshotMode::Dynamic => self.snapshot(key.owner, bearer, aura_key, def)?,
        };

        let mut amount = snapshot.base * snapshot.attacker_multiplier;
        if !def.healing {
            let defender = self.actor_ref(bearer)?;
            amount *= self.damage_modifier(defender, def.school, false);
        }
        let crit = self.rng.proc(snapshot.crit_chance);
        if crit {
            amount *= def.crit_multiplier;
        }

        let ability = AbilityKey::Dot(key.dot);
        self.record_amount(key.owner, bearer, ability, amount, def.healing)?;
        let tally = self.actor_mut(key.owner)?.tally_mut(ability);
        tally.ticks += 1;
        tally.tick_crits += u64::from(crit);
        self.log.record(
            now,
            key.owner,
            LogEvent::DotTick {
                dot: key.dot,
                target: bearer,
                amount,
                crit,
            },
        );

        let state = self
            .actor_mut(bearer)?
            .dots
            .get_mut(&key)
            .ok_or_else(|| unknown_dot(key.owner, key.dot))?;
        state.ticks_remaining -= 1;
        if state.is_ticking() {
            state.next_tick_at = now + def.tick_length;
            let (at, generation) = (state.next_tick_at, state.generation);
            return self.queue.schedule(
                at,
                Action::DotTick {
                    bearer,
                    key,
                    generation,
                },
            );
        }
        state.stop();
        self.expire_aura(bearer, aura_key).map(drop)
    }
}
