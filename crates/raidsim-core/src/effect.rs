//! Effect hooks and cast conditions.
//!
//! Side effects of casts and aura transitions are data, not closures. An
//! [`EffectHook`] is a tagged descriptor that the orchestrator dispatches by
//! kind; a [`CastCondition`] is a predicate over the caster's and target's
//! state. Both refer to spells, auras and dots through handles into the
//! owning actor's [`Kit`](crate::kit::Kit).

use serde::{Deserialize, Serialize};

use crate::actor::ActorId;
use crate::kit::{AuraId, DotId, SpellId};
use crate::resource::ResourceKind;
use crate::time::SimTime;

/// Which actor an aura hook or condition refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AuraHost {
    /// The actor whose kit defines the effect.
    Caster,
    /// The caster's current target.
    Target,
}

/// Actors a hook runs against.
///
/// For cast hooks `caster` cast the spell and `target` is its target. For
/// aura hooks `caster` applied the aura and `target` is the bearer (or the
/// applier's primary target when the aura sits on the applier).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HookContext {
    /// Owner of the hook's handles.
    pub caster: ActorId,
    /// Actor on the receiving end.
    pub target: ActorId,
}

impl HookContext {
    /// Creates a context.
    #[must_use]
    pub const fn new(caster: ActorId, target: ActorId) -> Self {
        Self { caster, target }
    }

    /// Resolves an [`AuraHost`] to an actor.
    #[must_use]
    pub const fn host(&self, host: AuraHost) -> ActorId {
        match host {
            AuraHost::Caster => self.caster,
            AuraHost::Target => self.target,
        }
    }
}

/// A declarative side effect.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum EffectHook {
    /// The caster gains resource.
    GainResource {
        /// Pool to fill.
        kind: ResourceKind,
        /// Amount to add.
        amount: f64,
    },
    /// The caster's pool drops to zero (combo points after a finisher).
    ResetResource {
        /// Pool to empty.
        kind: ResourceKind,
    },
    /// Activate (or refresh) an aura from the caster's kit.
    ActivateAura {
        /// Aura handle.
        aura: AuraId,
        /// Bearer.
        on: AuraHost,
    },
    /// Force an aura to expire.
    DeactivateAura {
        /// Aura handle.
        aura: AuraId,
        /// Bearer.
        on: AuraHost,
    },
    /// Add one stack to an active aura.
    AddStack {
        /// Aura handle.
        aura: AuraId,
        /// Bearer.
        on: AuraHost,
    },
    /// Remove one stack; the aura expires at zero.
    RemoveStack {
        /// Aura handle.
        aura: AuraId,
        /// Bearer.
        on: AuraHost,
    },
    /// Make a spell of the caster ready immediately.
    ResetCooldown {
        /// Spell handle.
        spell: SpellId,
    },
    /// Apply (or refresh) a dot from the caster's kit on the target.
    ApplyDot {
        /// Dot handle.
        dot: DotId,
    },
    /// Replace the caster's next auto-attack swing with a spell.
    QueueOnNextSwing {
        /// Spell handle.
        spell: SpellId,
    },
    /// Empty the caster's swing queue slot.
    ClearSwingQueue,
    /// Run nested hooks with probability `chance`.
    Proc {
        /// Probability in `[0, 1]`.
        chance: f64,
        /// Hooks run on success.
        then: Vec<EffectHook>,
    },
    /// Run nested hooks after a delay.
    Delayed {
        /// Delay from now.
        delay: SimTime,
        /// Hooks to schedule.
        then: Vec<EffectHook>,
    },
}

/// A kit handle referenced by a hook or condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandleRef {
    /// Spell handle.
    Spell(SpellId),
    /// Aura handle.
    Aura(AuraId),
    /// Dot handle.
    Dot(DotId),
}

impl EffectHook {
    /// Collects every handle this hook (and its nested hooks) references.
    pub fn collect_handles(&self, out: &mut Vec<HandleRef>) {
        match self {
            Self::ActivateAura { aura, .. }
            | Self::DeactivateAura { aura, .. }
            | Self::AddStack { aura, .. }
            | Self::RemoveStack { aura, .. } => out.push(HandleRef::Aura(*aura)),
            Self::ResetCooldown { spell } | Self::QueueOnNextSwing { spell } => {
                out.push(HandleRef::Spell(*spell));
            }
            Self::ApplyDot { dot } => out.push(HandleRef::Dot(*dot)),
            Self::Proc { then, .. } | Self::Delayed { then, .. } => {
                for hook in then {
                    hook.collect_handles(out);
                }
            }
            Self::GainResource { .. } | Self::ResetResource { .. } | Self::ClearSwingQueue => {}
        }
    }

    /// The aura instance this hook mutates, if any, as `(aura, host)`.
    #[must_use]
    pub fn aura_target(&self) -> Option<(AuraId, AuraHost)> {
        match self {
            Self::ActivateAura { aura, on }
            | Self::DeactivateAura { aura, on }
            | Self::AddStack { aura, on }
            | Self::RemoveStack { aura, on } => Some((*aura, *on)),
            _ => None,
        }
    }
}

/// Extra predicate a spell (or priority entry) requires before casting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum CastCondition {
    /// The aura is active on the host.
    AuraActive {
        /// Aura handle.
        aura: AuraId,
        /// Host to inspect.
        on: AuraHost,
    },
    /// The aura is not active on the host.
    AuraInactive {
        /// Aura handle.
        aura: AuraId,
        /// Host to inspect.
        on: AuraHost,
    },
    /// The aura has fewer than `stacks` stacks (inactive counts as zero).
    AuraStacksBelow {
        /// Aura handle.
        aura: AuraId,
        /// Host to inspect.
        on: AuraHost,
        /// Exclusive upper bound.
        stacks: u32,
    },
    /// The dot is not ticking on the target.
    DotInactive {
        /// Dot handle.
        dot: DotId,
    },
    /// The dot is inactive or has less than `remaining` left.
    DotRemainingBelow {
        /// Dot handle.
        dot: DotId,
        /// Threshold.
        remaining: SimTime,
    },
    /// The caster's pool holds at least `amount`.
    ResourceAtLeast {
        /// Pool.
        kind: ResourceKind,
        /// Threshold.
        amount: f64,
    },
    /// The caster's pool holds less than `amount`.
    ResourceBelow {
        /// Pool.
        kind: ResourceKind,
        /// Threshold.
        amount: f64,
    },
    /// Nothing is queued on the caster's next swing.
    SwingQueueEmpty,
}

impl CastCondition {
    /// Collects the handle this condition references, if any.
    pub fn collect_handles(&self, out: &mut Vec<HandleRef>) {
        match self {
            Self::AuraActive { aura, .. }
            | Self::AuraInactive { aura, .. }
            | Self::AuraStacksBelow { aura, .. } => out.push(HandleRef::Aura(*aura)),
            Self::DotInactive { dot } | Self::DotRemainingBelow { dot, .. } => {
                out.push(HandleRef::Dot(*dot));
            }
            Self::ResourceAtLeast { .. } | Self::ResourceBelow { .. } | Self::SwingQueueEmpty => {}
        }
    }
}
