//! Read-only view for rotations.
//!
//! A [`RotationView`] exposes the acting actor, its target and the clock,
//! and nothing mutable. Castability checks live here so the rotation and the
//! cast pipeline agree exactly on what "castable" means.

use crate::actor::{Actor, ActorId};
use crate::aura::AuraKey;
use crate::dot::DotKey;
use crate::effect::{AuraHost, CastCondition};
use crate::error::{CastFailure, InsufficientResource};
use crate::kit::{AuraId, DotId, SpellId};
use crate::resource::ResourceKind;
use crate::simulation::Simulation;
use crate::spell::{GcdPolicy, SpellDefinition, SpellTarget};
use crate::stat::Stat;
use crate::time::SimTime;

/// Read-only view of one actor, its target and the clock.
#[derive(Debug, Clone, Copy)]
pub struct RotationView<'a> {
    sim: &'a Simulation,
    actor: &'a Actor,
    target: Option<&'a Actor>,
}

impl<'a> RotationView<'a> {
    /// View of `actor` against its primary target.
    ///
    /// Returns `None` when `actor` is not part of the simulation.
    #[must_use]
    pub fn new(sim: &'a Simulation, actor: ActorId) -> Option<Self> {
        let actor = sim.actor(actor)?;
        let target = actor.primary_target.and_then(|t| sim.actor(t));
        Some(Self { sim, actor, target })
    }

    /// The same view against an explicit target.
    #[must_use]
    pub fn with_target(mut self, target: ActorId) -> Self {
        self.target = self.sim.actor(target);
        self
    }

    /// Current simulated time.
    #[must_use]
    pub fn now(&self) -> SimTime {
        self.sim.now()
    }

    /// Time left in the encounter.
    #[must_use]
    pub fn remaining(&self) -> SimTime {
        self.sim.end() - self.sim.now()
    }

    /// The acting actor.
    #[must_use]
    pub fn actor(&self) -> &'a Actor {
        self.actor
    }

    /// The target, if any.
    #[must_use]
    pub fn target(&self) -> Option<&'a Actor> {
        self.target
    }

    /// One of the actor's effective stats.
    #[must_use]
    pub fn stat(&self, stat: Stat) -> f64 {
        self.actor.stat(stat)
    }

    /// Amount in one of the actor's pools (zero if the pool does not exist).
    #[must_use]
    pub fn resource(&self, kind: ResourceKind) -> f64 {
        self.actor
            .resources
            .get(kind)
            .map_or(0.0, |pool| pool.current(self.now()))
    }

    fn host(&self, on: AuraHost) -> Option<&'a Actor> {
        match on {
            AuraHost::Caster => Some(self.actor),
            AuraHost::Target => self.target,
        }
    }

    fn aura_key(&self, aura: AuraId) -> AuraKey {
        AuraKey::new(self.actor.id, aura)
    }

    /// Whether the actor's own aura is active on the host.
    #[must_use]
    pub fn aura_active(&self, aura: AuraId, on: AuraHost) -> bool {
        self.host(on).is_some_and(|h| h.aura_active(self.aura_key(aura)))
    }

    /// Stacks of the actor's own aura on the host.
    #[must_use]
    pub fn aura_stacks(&self, aura: AuraId, on: AuraHost) -> u32 {
        self.host(on)
            .and_then(|h| h.aura(self.aura_key(aura)))
            .map_or(0, |state| state.stacks())
    }

    /// Time left on the actor's own aura on the host.
    #[must_use]
    pub fn aura_remaining(&self, aura: AuraId, on: AuraHost) -> SimTime {
        self.host(on)
            .and_then(|h| h.aura(self.aura_key(aura)))
            .map_or(SimTime::ZERO, |state| state.remaining(self.now()))
    }

    /// Whether the actor's dot is ticking on the target.
    #[must_use]
    pub fn dot_active(&self, dot: DotId) -> bool {
        self.target
            .and_then(|t| t.dot(DotKey::new(self.actor.id, dot)))
            .is_some_and(|state| state.is_ticking())
    }

    /// Time until the actor's dot on the target delivers its final tick.
    #[must_use]
    pub fn dot_remaining(&self, dot: DotId) -> SimTime {
        let Some(def) = self.actor.kit.dot(dot) else {
            return SimTime::ZERO;
        };
        self.target
            .and_then(|t| t.dot(DotKey::new(self.actor.id, dot)))
            .filter(|state| state.is_ticking())
            .map_or(SimTime::ZERO, |state| state.last_tick_at(def) - self.now())
    }

    /// Time until a spell's cooldown allows a cast.
    #[must_use]
    pub fn cooldown_remaining(&self, spell: SpellId) -> SimTime {
        self.actor
            .spell_state(spell)
            .map_or(SimTime::ZERO, |state| state.ready_at - self.now())
    }

    /// Time until the global cooldown ends.
    #[must_use]
    pub fn gcd_remaining(&self) -> SimTime {
        self.actor.gcd_ready_at - self.now()
    }

    /// Spell waiting in the swing queue slot.
    #[must_use]
    pub fn swing_queued(&self) -> Option<SpellId> {
        self.actor.queued_swing
    }

    /// Evaluates a condition for this actor and target.
    #[must_use]
    pub fn condition_holds(&self, condition: &CastCondition) -> bool {
        match condition {
            CastCondition::AuraActive { aura, on } => self.aura_active(*aura, *on),
            CastCondition::AuraInactive { aura, on } => !self.aura_active(*aura, *on),
            CastCondition::AuraStacksBelow { aura, on, stacks } => {
                self.aura_stacks(*aura, *on) < *stacks
            }
            CastCondition::DotInactive { dot } => !self.dot_active(*dot),
            CastCondition::DotRemainingBelow { dot, remaining } => {
                self.dot_remaining(*dot) < *remaining
            }
            CastCondition::ResourceAtLeast { kind, amount } => self.resource(*kind) >= *amount,
            CastCondition::ResourceBelow { kind, amount } => self.resource(*kind) < *amount,
            CastCondition::SwingQueueEmpty => self.actor.queued_swing.is_none(),
        }
    }

    /// Whether the spell could be cast right now.
    #[must_use]
    pub fn can_cast(&self, spell: SpellId) -> bool {
        matches!(self.check_cast(spell), Some(Ok(())))
    }

    /// Why the spell cannot be cast right now, if it cannot.
    #[must_use]
    pub fn cast_failure(&self, spell: SpellId) -> Option<CastFailure> {
        self.check_cast(spell).and_then(Result::err)
    }

    /// Full castability check; `None` when the handle does not resolve.
    #[must_use]
    pub fn check_cast(&self, spell: SpellId) -> Option<Result<(), CastFailure>> {
        let def = self.actor.kit.spell(spell)?;
        Some(self.castability(spell, def, false))
    }

    /// Castability against the already-resolved definition.
    ///
    /// `on_swing` skips the busy and GCD checks: a spell replacing an
    /// auto-attack swing is neither a cast nor on the GCD.
    pub(crate) fn castability(
        &self,
        spell: SpellId,
        def: &SpellDefinition,
        on_swing: bool,
    ) -> Result<(), CastFailure> {
        let now = self.now();
        if !on_swing {
            if let Some(cast) = &self.actor.casting {
                return Err(CastFailure::Busy {
                    until: cast.completes_at,
                });
            }
            if def.gcd != GcdPolicy::None && self.actor.gcd_ready_at > now {
                return Err(CastFailure::OnGcd {
                    ready_at: self.actor.gcd_ready_at,
                });
            }
        }
        if let Some(state) = self.actor.spell_state(spell) {
            if !state.is_ready(now) {
                return Err(CastFailure::OnCooldown {
                    ready_at: state.ready_at,
                });
            }
        }
        if let Some(cost) = &def.cost {
            let available = self.resource(cost.resource);
            if available < cost.amount {
                return Err(CastFailure::Insufficient(InsufficientResource {
                    kind: cost.resource,
                    required: cost.amount,
                    available,
                }));
            }
        }
        if def.target == SpellTarget::Enemy && self.target.is_none() {
            return Err(CastFailure::NoTarget);
        }
        match def.conditions.iter().position(|c| !self.condition_holds(c)) {
            Some(index) => Err(CastFailure::ConditionFailed { index }),
            None => Ok(()),
        }
    }
}
