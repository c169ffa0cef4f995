//! The per-iteration orchestrator.
//!
//! A [`Simulation`] owns everything one encounter needs: the action queue and
//! its clock, the iteration's RNG, and a fresh actor table built from the
//! immutable [`SimSpec`]. Nothing is shared with other iterations, so an
//! iteration can run on any worker thread and reproduce exactly.
//!
//! # Execution loop
//!
//! 1. **BUILD**: validate the [`SimSpec`], draw the encounter length, build actors
//!    (players first, then targets) and activate starting auras
//! 2. **SEED**: schedule the first rotation wake-up, auto-attack and
//!    resource tick of every actor at time zero
//! 3. **RUN**: pop actions in `(time, sequence)` order and dispatch them by
//!    kind until the queue is empty or the next action lies past the end
//! 4. **FINISH**: settle pools and convert tallies into an
//!    [`IterationResult`]
//!
//! Dispatch targets live in private submodules: `cast` (spell pipeline),
//! `auras`, `dots`, `hooks` and `melee`.
//!
//! # Example
//!
//! ```
//! use raidsim_core::actor::DefenseStats;
//! use raidsim_core::kit::Kit;
//! use raidsim_core::rotation::PriorityRotation;
//! use raidsim_core::simulation::run_one_iteration;
//! use raidsim_core::spec::{EncounterSpec, PlayerSpec, RotationSpec, SimSpec};
//! use raidsim_core::spell::{DamageFormula, GcdPolicy, SpellDefinition};
//! use raidsim_core::time::SimTime;
//!
//! let mut kit = Kit::new();
//! let strike = kit.add_spell(
//!     SpellDefinition::new("Strike")
//!         .with_formula(DamageFormula::flat(50.0, 50.0))
//!         .with_cooldown(SimTime::from_secs(1))
//!         .with_gcd(GcdPolicy::None),
//! );
//! let rotation = RotationSpec::Priority(PriorityRotation::new("spam").then_cast(strike));
//! let spec = SimSpec::new(
//!     EncounterSpec::single_target(SimTime::from_secs(10), DefenseStats::default()),
//!     vec![PlayerSpec::new("player", kit, rotation)],
//! );
//!
//! let result = run_one_iteration(&spec, 7).unwrap();
//! assert_eq!(result.players[0].ability("Strike").unwrap().casts, 11);
//! ```

mod auras;
mod cast;
mod dots;
mod hooks;
mod melee;

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::sync::Arc;

use tracing::{trace, warn};

use crate::actor::{Actor, ActorId, ActorKind};
use crate::aura::{AuraDefinition, AuraKey, AuraModifier, AuraState};
use crate::config::{MAX_ACTIONS_PER_INSTANT, MIN_ENCOUNTER, REACTION_DELAY};
use crate::effect::HookContext;
use crate::error::{SimError, SimResult};
use crate::kit::Kit;
use crate::log::{EventLog, LogEvent, TraceDigest};
use crate::metrics::{AbilityKey, AbilityMetrics, ActorMetrics, IterationResult, MELEE_LABEL};
use crate::queue::{Action, ActionQueue};
use crate::resource::{Regen, ResourceKind, ResourceSet};
use crate::rng::SimRng;
use crate::rotation::Decision;
use crate::spec::{SimSpec, TargetSpec};
use crate::stat::School;
use crate::time::SimTime;
use crate::view::RotationView;

/// Runs one complete iteration of `spec` with `seed`.
///
/// # Errors
///
/// Returns the first [`SimError`] raised while building or running the
/// encounter.
pub fn run_one_iteration(spec: &SimSpec, seed: u64) -> SimResult<IterationResult> {
    Simulation::new(spec, seed, false)?.run()
}

// =============================================================================
// Simulation
// =============================================================================

/// One encounter in progress.
///
/// Built per iteration and consumed by [`Simulation::run`]. Tests can drive
/// it part of the way with [`Simulation::advance_to`] and inspect actors in
/// between.
pub struct Simulation {
    queue: ActionQueue,
    rng: SimRng,
    /// Players first, then targets; indexed by [`ActorId::index`].
    actors: Vec<Actor>,
    players: Vec<ActorId>,
    targets: Vec<ActorId>,
    end: SimTime,
    armor_constant: f64,
    seed: u64,
    log: EventLog,
    digest: TraceDigest,
    /// Aura instances whose transition hooks are running.
    transitioning: BTreeSet<(ActorId, AuraKey)>,
    instant: SimTime,
    instant_actions: u32,
}

impl fmt::Debug for Simulation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Simulation")
            .field("now", &self.queue.now())
            .field("end", &self.end)
            .field("seed", &self.seed)
            .field("actors", &format!("[{} actors]", self.actors.len()))
            .field("pending", &self.queue.len())
            .field("executed", &self.digest.count())
            .finish_non_exhaustive()
    }
}

impl Simulation {
    /// Builds the iteration: validates `spec`, draws the encounter length and
    /// seeds the queue.
    ///
    /// # Errors
    ///
    /// Returns a [`SimError`] if `spec` is invalid.
    pub fn new(spec: &SimSpec, seed: u64, record_log: bool) -> SimResult<Self> {
        spec.validate()?;
        let mut rng = SimRng::new(seed);
        let end = draw_duration(spec, &mut rng);

        let player_count = spec.raid.len();
        let mut actors = Vec::with_capacity(player_count + spec.encounter.targets.len());
        for (index, player) in spec.raid.iter().enumerate() {
            let id = actor_id(index)?;
            let mut actor = Actor::new(id, player.name.clone(), ActorKind::Player, Arc::clone(&player.kit));
            actor.base_stats = player.base_stats;
            actor.dependencies.clone_from(&player.dependencies);
            actor.stats = player.base_stats.derive(&player.dependencies);
            actor.resources = ResourceSet::from_specs(&player.resources);
            actor.weapon = player.weapon;
            actor.swing_gain = player.swing_gain;
            actor.rotation = Some(player.rotation.to_rotation());
            actor.primary_target = Some(actor_id(player_count + player.target)?);
            actors.push(actor);
        }
        let empty_kit = Arc::new(Kit::new());
        for (index, target) in spec.encounter.targets.iter().enumerate() {
            actors.push(build_target(actor_id(player_count + index)?, target, &empty_kit));
        }

        let players = actors.iter().take(player_count).map(Actor::id).collect();
        let targets = actors.iter().skip(player_count).map(Actor::id).collect();
        let mut sim = Self {
            queue: ActionQueue::new(),
            rng,
            actors,
            players,
            targets,
            end,
            armor_constant: spec.encounter.armor_constant,
            seed,
            log: if record_log {
                EventLog::enabled()
            } else {
                EventLog::disabled()
            },
            digest: TraceDigest::new(),
            transitioning: BTreeSet::new(),
            instant: SimTime::ZERO,
            instant_actions: 0,
        };
        sim.start(spec)?;
        Ok(sim)
    }

    fn start(&mut self, spec: &SimSpec) -> SimResult<()> {
        let players = self.players.clone();
        for (player, id) in spec.raid.iter().zip(players) {
            for aura in &player.starting_auras {
                self.activate_aura(id, AuraKey::new(id, *aura))?;
            }

            let actor = self.actor_mut(id)?;
            let mut ticks = Vec::new();
            for pool in actor.resources.iter_mut() {
                if let Regen::PerTick { interval, .. } = pool.regen() {
                    pool.set_next_tick_at(Some(interval));
                    ticks.push((interval, pool.kind()));
                }
            }
            let swings = actor.weapon.is_some();
            for (at, kind) in ticks {
                self.queue.schedule(at, Action::ResourceTick { actor: id, kind })?;
            }
            if swings {
                self.actor_mut(id)?.next_swing_at = Some(SimTime::ZERO);
                self.queue.schedule(SimTime::ZERO, Action::AutoAttack { actor: id })?;
            }
            self.schedule_ready(id, SimTime::ZERO)?;
        }
        Ok(())
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    /// Current simulated time.
    #[must_use]
    pub fn now(&self) -> SimTime {
        self.queue.now()
    }

    /// Encounter end for this iteration, after variation.
    #[must_use]
    pub fn end(&self) -> SimTime {
        self.end
    }

    /// Seed of this iteration's RNG.
    #[must_use]
    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Looks up an actor.
    #[must_use]
    pub fn actor(&self, id: ActorId) -> Option<&Actor> {
        self.actors.get(id.index())
    }

    /// Player ids in raid order.
    #[must_use]
    pub fn players(&self) -> &[ActorId] {
        &self.players
    }

    /// Target ids in encounter order.
    #[must_use]
    pub fn targets(&self) -> &[ActorId] {
        &self.targets
    }

    /// Execution log (empty unless recording was requested).
    #[must_use]
    pub fn log(&self) -> &EventLog {
        &self.log
    }

    /// Digest over every action executed so far.
    #[must_use]
    pub fn trace_digest(&self) -> u64 {
        self.digest.finish()
    }

    // =========================================================================
    // Loop
    // =========================================================================

    /// Executes every action due at or before `until` (capped at the end).
    ///
    /// # Errors
    ///
    /// Returns the first [`SimError`] raised by an action.
    pub fn advance_to(&mut self, until: SimTime) -> SimResult<()> {
        let limit = until.min(self.end);
        while let Some((at, action)) = self.queue.pop_next(limit) {
            self.execute(at, action)?;
        }
        Ok(())
    }

    /// Runs the encounter to its end and returns its metrics.
    ///
    /// # Errors
    ///
    /// Returns the first [`SimError`] raised by an action.
    pub fn run(mut self) -> SimResult<IterationResult> {
        self.advance_to(self.end)?;
        Ok(self.finish())
    }

    fn execute(&mut self, at: SimTime, action: Action) -> SimResult<()> {
        if at == self.instant {
            self.instant_actions += 1;
            if self.instant_actions > MAX_ACTIONS_PER_INSTANT {
                return Err(SimError::Stalled {
                    at,
                    events: self.instant_actions,
                });
            }
        } else {
            self.instant = at;
            self.instant_actions = 1;
        }

        let kind = action.kind_code();
        let actor = action.actor();
        self.digest.record(at, kind, Some(actor));
        trace!(%at, kind, %actor, "execute");

        match action {
            Action::ActorReady { actor, generation } => self.on_actor_ready(actor, generation),
            Action::CastComplete { actor } => self.complete_cast(actor),
            Action::AuraExpire {
                bearer,
                key,
                generation,
            } => self.on_aura_expire(bearer, key, generation),
            Action::DotTick {
                bearer,
                key,
                generation,
            } => self.on_dot_tick(bearer, key, generation),
            Action::ResourceTick { actor, kind } => self.on_resource_tick(actor, kind),
            Action::AutoAttack { actor } => self.on_auto_attack(actor),
            Action::Hook { ctx, hook } => self.run_hook(ctx, &hook),
        }
    }

    // =========================================================================
    // Rotation wake-ups
    // =========================================================================

    fn on_actor_ready(&mut self, id: ActorId, generation: u64) -> SimResult<()> {
        let actor = self.actor_ref(id)?;
        if actor.ready_generation != generation || actor.casting.is_some() {
            return Ok(());
        }
        let Some(rotation) = actor.rotation.clone() else {
            return Ok(());
        };
        let view = RotationView::new(self, id).ok_or(SimError::UnknownActor(id))?;
        let decision = rotation.next_action(&view);

        let now = self.now();
        match decision {
            Decision::Cast { spell, target } => match self.start_cast(id, spell, target)? {
                Ok(()) => {
                    let actor = self.actor_ref(id)?;
                    if actor.casting.is_none() {
                        let at = actor.gcd_ready_at.max(now);
                        self.schedule_ready(id, at)?;
                    }
                    Ok(())
                }
                Err(reason) => {
                    tracing::debug!(%now, actor = %id, %spell, ?reason, "cast rejected");
                    self.log.record(now, id, LogEvent::CastFailed { spell, reason });
                    let at = self.next_wake(id)?;
                    self.schedule_ready(id, at)
                }
            },
            Decision::WaitUntil(at) => {
                let at = if at <= now { now + REACTION_DELAY } else { at };
                self.schedule_ready(id, at)
            }
            Decision::Idle => {
                let at = self.next_wake(id)?;
                self.schedule_ready(id, at)
            }
        }
    }

    /// Schedules a wake-up, invalidating any pending one.
    pub(crate) fn schedule_ready(&mut self, id: ActorId, at: SimTime) -> SimResult<()> {
        let generation = self.actor_mut(id)?.next_ready_generation();
        self.queue.schedule(
            at,
            Action::ActorReady {
                actor: id,
                generation,
            },
        )
    }

    /// Schedules an extra wake-up alongside the pending one. Whichever fires
    /// first reschedules and makes the other stale.
    pub(crate) fn nudge(&mut self, id: ActorId) -> SimResult<()> {
        let now = self.now();
        let actor = self.actor_ref(id)?;
        if actor.rotation.is_none() || actor.casting.is_some() {
            return Ok(());
        }
        let at = actor.gcd_ready_at.max(now);
        let generation = actor.ready_generation;
        self.queue.schedule(
            at,
            Action::ActorReady {
                actor: id,
                generation,
            },
        )
    }

    /// Earliest future time at which the actor's options could change.
    fn next_wake(&self, id: ActorId) -> SimResult<SimTime> {
        let now = self.now();
        let actor = self.actor_ref(id)?;
        let mut candidates = vec![actor.gcd_ready_at];
        candidates.extend(actor.casting.map(|c| c.completes_at));
        candidates.extend(actor.spells.iter().map(|s| s.ready_at));
        candidates.extend(actor.next_swing_at);
        for pool in actor.resources.iter() {
            candidates.extend(pool.next_tick_at());
            if matches!(pool.regen(), Regen::Continuous { .. }) {
                candidates.push(now + REACTION_DELAY);
            }
        }
        candidates.extend(active_expiries(actor));
        if let Some(target) = actor.primary_target.and_then(|t| self.actor(t)) {
            candidates.extend(active_expiries(target));
            candidates.extend(
                target
                    .dots
                    .iter()
                    .filter(|(key, state)| key.owner == id && state.is_ticking())
                    .map(|(_, state)| state.next_tick_at),
            );
        }
        Ok(candidates
            .into_iter()
            .filter(|t| *t > now && !t.is_never())
            .min()
            .unwrap_or(now + REACTION_DELAY))
    }

    // =========================================================================
    // Resources
    // =========================================================================

    fn on_resource_tick(&mut self, id: ActorId, kind: ResourceKind) -> SimResult<()> {
        let now = self.now();
        let pool = self
            .actor_mut(id)?
            .resources
            .get_mut(kind)
            .ok_or(SimError::MissingResource { actor: id, kind })?;
        let Regen::PerTick { amount, interval } = pool.regen() else {
            return Ok(());
        };
        let gained = pool.gain(now, amount);
        let next = now + interval;
        pool.set_next_tick_at(Some(next));
        if gained > 0.0 {
            self.log.record(now, id, LogEvent::ResourceGained { kind, amount: gained });
        }
        self.queue.schedule(next, Action::ResourceTick { actor: id, kind })
    }

    // =========================================================================
    // Lookups
    // =========================================================================

    pub(crate) fn actor_ref(&self, id: ActorId) -> SimResult<&Actor> {
        self.actors.get(id.index()).ok_or(SimError::UnknownActor(id))
    }

    pub(crate) fn actor_mut(&mut self, id: ActorId) -> SimResult<&mut Actor> {
        self.actors.get_mut(id.index()).ok_or(SimError::UnknownActor(id))
    }

    /// A shared handle to an actor's kit, so definitions can be read while
    /// the simulation is mutated.
    pub(crate) fn kit_of(&self, id: ActorId) -> SimResult<Arc<Kit>> {
        Ok(Arc::clone(&self.actor_ref(id)?.kit))
    }

    fn aura_definition(&self, key: AuraKey) -> Option<&AuraDefinition> {
        self.actor(key.owner)?.kit.aura(key.aura)
    }

    /// Recomputes effective stats from base stats and active stat auras.
    pub(crate) fn recompute_stats(&mut self, id: ActorId) -> SimResult<()> {
        let actor = self.actor_ref(id)?;
        let mut stats = actor.base_stats;
        for (key, state) in actor.auras.iter().filter(|(_, s)| s.is_active()) {
            let Some(def) = self.aura_definition(*key) else {
                continue;
            };
            let stacks = f64::from(state.effective_stacks(def));
            for modifier in &def.modifiers {
                if let AuraModifier::Stat { stat, per_stack } = modifier {
                    stats.add_to(*stat, per_stack * stacks);
                }
            }
        }
        let derived = stats.derive(&actor.dependencies);
        self.actor_mut(id)?.stats = derived;
        Ok(())
    }

    /// Product of the damage-dealt (`dealt == true`) or damage-taken
    /// modifiers active on `actor` for `school`.
    pub(crate) fn damage_modifier(&self, actor: &Actor, school: School, dealt: bool) -> f64 {
        let mut multiplier = 1.0;
        for (key, state) in actor.auras.iter().filter(|(_, s)| s.is_active()) {
            let Some(def) = self.aura_definition(*key) else {
                continue;
            };
            let stacks = f64::from(state.effective_stacks(def));
            for modifier in &def.modifiers {
                let (filter, per_stack) = match (modifier, dealt) {
                    (AuraModifier::DamageDealt { school: filter, per_stack }, true)
                    | (AuraModifier::DamageTaken { school: filter, per_stack }, false) => {
                        (*filter, *per_stack)
                    }
                    _ => continue,
                };
                if filter.map_or(true, |s| s == school) {
                    multiplier *= 1.0 + per_stack * stacks;
                }
            }
        }
        multiplier
    }

    /// Hook context of an aura's transition hooks: the applier acts, against
    /// the bearer, or against the applier's primary target when the aura sits
    /// on the applier.
    pub(crate) fn aura_context(&self, bearer: ActorId, key: AuraKey) -> SimResult<HookContext> {
        let target = if bearer == key.owner {
            self.actor_ref(key.owner)?.primary_target.unwrap_or(bearer)
        } else {
            bearer
        };
        Ok(HookContext::new(key.owner, target))
    }

    /// Books an amount on the source's tally and totals.
    pub(crate) fn record_amount(
        &mut self,
        source: ActorId,
        target: ActorId,
        key: AbilityKey,
        amount: f64,
        healing: bool,
    ) -> SimResult<()> {
        let actor = self.actor_mut(source)?;
        let tally = actor.tally_mut(key);
        if healing {
            tally.healing += amount;
            actor.healing_done += amount;
        } else {
            tally.damage += amount;
            actor.damage_done += amount;
            self.actor_mut(target)?.damage_taken += amount;
        }
        Ok(())
    }

    // =========================================================================
    // Finish
    // =========================================================================

    fn finish(mut self) -> IterationResult {
        let end = self.end;
        for actor in &mut self.actors {
            for pool in actor.resources.iter_mut() {
                pool.settle(end);
            }
        }
        let players = self.players.iter().filter_map(|id| self.actor_metrics(*id)).collect();
        let targets = self.targets.iter().filter_map(|id| self.actor_metrics(*id)).collect();
        IterationResult {
            seed: self.seed,
            duration: end,
            players,
            targets,
            trace_digest: self.digest.finish(),
            actions_executed: self.digest.count(),
            log: self.log.is_enabled().then_some(self.log),
        }
    }

    fn actor_metrics(&self, id: ActorId) -> Option<ActorMetrics> {
        let actor = self.actor(id)?;
        let mut abilities: BTreeMap<String, AbilityMetrics> = BTreeMap::new();
        for (key, tally) in &actor.tally {
            let label = match key {
                AbilityKey::Spell(spell) => actor.kit.spell(*spell).map(|d| d.label.clone()),
                AbilityKey::Dot(dot) => actor.kit.dot(*dot).map(|d| d.label.clone()),
                AbilityKey::Melee => Some(MELEE_LABEL.to_string()),
            };
            if let Some(label) = label {
                abilities.entry(label).or_default().accumulate(tally);
            }
        }
        let resources = actor
            .resources
            .iter()
            .map(|pool| (pool.kind(), *pool.metrics()))
            .collect();
        let mut aura_uptime: BTreeMap<String, SimTime> = BTreeMap::new();
        for (key, state) in &actor.auras {
            if let Some(def) = self.aura_definition(*key) {
                *aura_uptime.entry(def.label.clone()).or_default() += state.uptime(self.end);
            }
        }
        Some(ActorMetrics {
            name: actor.name.clone(),
            damage_done: actor.damage_done,
            healing_done: actor.healing_done,
            damage_taken: actor.damage_taken,
            abilities,
            resources,
            aura_uptime,
        })
    }
}

// =============================================================================
// Helpers
// =============================================================================

fn actor_id(index: usize) -> SimResult<ActorId> {
    u32::try_from(index)
        .map(ActorId::new)
        .map_err(|_| SimError::InvalidEncounter("too many actors".into()))
}

fn build_target(id: ActorId, spec: &TargetSpec, kit: &Arc<Kit>) -> Actor {
    let mut actor = Actor::new(id, spec.name.clone(), ActorKind::Target, Arc::clone(kit));
    actor.defense = spec.defense;
    actor
}

/// Base duration plus a uniform offset in `[-variation, +variation]`,
/// floored at [`MIN_ENCOUNTER`].
fn draw_duration(spec: &SimSpec, rng: &mut SimRng) -> SimTime {
    let base = spec.encounter.duration;
    let variation = spec.encounter.duration_variation.as_secs_f64();
    if variation <= 0.0 {
        return base.max(MIN_ENCOUNTER);
    }
    let secs = base.as_secs_f64() + rng.roll(-variation, variation);
    let drawn = SimTime::from_secs_f64(secs);
    if drawn < MIN_ENCOUNTER {
        warn!(
            base = %base,
            drawn = secs,
            floor = %MIN_ENCOUNTER,
            "encounter length floored"
        );
        return MIN_ENCOUNTER;
    }
    drawn
}

fn active_expiries(actor: &Actor) -> impl Iterator<Item = SimTime> + '_ {
    actor
        .auras
        .values()
        .filter(|s| s.is_active())
        .map(AuraState::expires_at)
}
