//! Timed effects (buffs, debuffs and the aura half of dots).
//!
//! An aura is either inactive, or active with an expiration time and a stack
//! count. [`AuraDefinition`] is the immutable description living in a kit;
//! [`AuraState`] is the per-iteration state machine living on the bearer.
//!
//! `AuraState` only handles the state transitions. Scheduling expiration
//! checks, running hooks and resolving exclusivity groups is the
//! orchestrator's job, because those need the clock and other actors.
//!
//! # Generations
//!
//! Every change to an aura's expiration bumps its generation. Expiration
//! checks carry the generation they were scheduled with, so a check made
//! stale by a refresh or forced expiry is simply ignored when it fires.

use serde::{Deserialize, Serialize};

use crate::actor::ActorId;
use crate::effect::EffectHook;
use crate::kit::AuraId;
use crate::stat::{School, Stat};
use crate::time::SimTime;

// =============================================================================
// Definition
// =============================================================================

/// What happens when an already-active aura is activated again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RefreshPolicy {
    /// Full duration from now.
    Reset,
    /// Add the duration to the remaining time, capped at
    /// `now + duration + max_bonus`.
    Extend {
        /// Maximum time beyond one full duration.
        max_bonus: SimTime,
    },
    /// Leave the aura untouched and report the activation as rejected.
    Reject,
}

/// A passive effect an active aura exerts on its bearer.
///
/// Amounts scale with the aura's stack count (non-stacking auras count as one
/// stack).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum AuraModifier {
    /// Flat stat bonus, added before stat dependencies are applied.
    Stat {
        /// Stat to raise.
        stat: Stat,
        /// Bonus per stack.
        per_stack: f64,
    },
    /// Multiplies damage the bearer deals by `1 + per_stack * stacks`.
    DamageDealt {
        /// School filter; `None` matches every school.
        school: Option<School>,
        /// Fractional bonus per stack.
        per_stack: f64,
    },
    /// Multiplies damage the bearer takes by `1 + per_stack * stacks`.
    DamageTaken {
        /// School filter; `None` matches every school.
        school: Option<School>,
        /// Fractional bonus per stack.
        per_stack: f64,
    },
}

impl AuraModifier {
    /// Whether this modifier changes the bearer's stats.
    #[must_use]
    pub const fn is_stat(&self) -> bool {
        matches!(self, Self::Stat { .. })
    }
}

/// Immutable description of an aura.
///
/// # Example
///
/// ```
/// use raidsim_core::aura::{AuraDefinition, AuraModifier, RefreshPolicy};
/// use raidsim_core::stat::School;
/// use raidsim_core::time::SimTime;
///
/// let mangle = AuraDefinition::new("Mangle", Some(SimTime::from_secs(12)))
///     .with_modifier(AuraModifier::DamageTaken { school: Some(School::Physical), per_stack: 0.3 });
/// assert_eq!(mangle.refresh, RefreshPolicy::Reset);
/// assert!(!mangle.is_stacking());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuraDefinition {
    /// Display label, also used as the metrics key.
    pub label: String,
    /// Duration; `None` never expires on its own.
    pub duration: Option<SimTime>,
    /// Maximum stacks; zero for a non-stacking aura.
    pub max_stacks: u32,
    /// Behaviour on re-activation.
    pub refresh: RefreshPolicy,
    /// Exclusivity group: activating one aura of a group replaces the
    /// bearer's current aura of that group.
    pub exclusive_group: Option<u16>,
    /// Grace window granted to the replaced aura of the same group.
    pub linger: Option<SimTime>,
    /// Passive effects while active.
    pub modifiers: Vec<AuraModifier>,
    /// Hooks run on Inactive -> Active.
    pub on_gain: Vec<EffectHook>,
    /// Hooks run on Active -> Inactive.
    pub on_expire: Vec<EffectHook>,
    /// Hooks run whenever the stack count changes.
    pub on_stack_change: Vec<EffectHook>,
}

impl AuraDefinition {
    /// Creates a non-stacking aura with [`RefreshPolicy::Reset`].
    #[must_use]
    pub fn new(label: impl Into<String>, duration: Option<SimTime>) -> Self {
        Self {
            label: label.into(),
            duration,
            max_stacks: 0,
            refresh: RefreshPolicy::Reset,
            exclusive_group: None,
            linger: None,
            modifiers: Vec::new(),
            on_gain: Vec::new(),
            on_expire: Vec::new(),
            on_stack_change: Vec::new(),
        }
    }

    /// Makes the aura stack up to `max_stacks`.
    #[must_use]
    pub fn stacking(mut self, max_stacks: u32) -> Self {
        self.max_stacks = max_stacks;
        self
    }

    /// Sets the refresh policy.
    #[must_use]
    pub fn with_refresh(mut self, refresh: RefreshPolicy) -> Self {
        self.refresh = refresh;
        self
    }

    /// Puts the aura in an exclusivity group with an optional linger window.
    #[must_use]
    pub fn exclusive(mut self, group: u16, linger: Option<SimTime>) -> Self {
        self.exclusive_group = Some(group);
        self.linger = linger;
        self
    }

    /// Adds a passive modifier.
    #[must_use]
    pub fn with_modifier(mut self, modifier: AuraModifier) -> Self {
        self.modifiers.push(modifier);
        self
    }

    /// Adds an on-gain hook.
    #[must_use]
    pub fn on_gain(mut self, hook: EffectHook) -> Self {
        self.on_gain.push(hook);
        self
    }

    /// Adds an on-expire hook.
    #[must_use]
    pub fn on_expire(mut self, hook: EffectHook) -> Self {
        self.on_expire.push(hook);
        self
    }

    /// Adds an on-stack-change hook.
    #[must_use]
    pub fn on_stack_change(mut self, hook: EffectHook) -> Self {
        self.on_stack_change.push(hook);
        self
    }

    /// Whether the aura tracks stacks.
    #[must_use]
    pub fn is_stacking(&self) -> bool {
        self.max_stacks > 0
    }

    /// Whether any modifier changes stats.
    #[must_use]
    pub fn modifies_stats(&self) -> bool {
        self.modifiers.iter().any(AuraModifier::is_stat)
    }

    /// Iterates every hook of the definition.
    pub fn hooks(&self) -> impl Iterator<Item = &EffectHook> {
        self.on_gain
            .iter()
            .chain(&self.on_expire)
            .chain(&self.on_stack_change)
    }

    /// Checks the definition for contradictions.
    ///
    /// # Errors
    ///
    /// Returns a human-readable reason.
    pub fn validate(&self) -> Result<(), String> {
        if self.duration == Some(SimTime::ZERO) {
            return Err("duration must be non-zero".into());
        }
        if self.linger.is_some() && self.exclusive_group.is_none() {
            return Err("linger requires an exclusivity group".into());
        }
        for modifier in &self.modifiers {
            let amount = match modifier {
                AuraModifier::Stat { per_stack, .. }
                | AuraModifier::DamageDealt { per_stack, .. }
                | AuraModifier::DamageTaken { per_stack, .. } => *per_stack,
            };
            if !amount.is_finite() {
                return Err("modifier amount is not finite".into());
            }
        }
        Ok(())
    }
}

// =============================================================================
// Runtime State
// =============================================================================

/// Key of an aura instance on its bearer: who applied it, and which aura of
/// their kit it is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct AuraKey {
    /// Actor whose kit defines the aura.
    pub owner: ActorId,
    /// Handle into the owner's kit.
    pub aura: AuraId,
}

impl AuraKey {
    /// Creates a key.
    #[must_use]
    pub const fn new(owner: ActorId, aura: AuraId) -> Self {
        Self { owner, aura }
    }
}

/// Result of an activation request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Activation {
    /// Inactive -> Active.
    Gained,
    /// Active -> Active with a new expiration.
    Refreshed,
    /// Active, and the refresh policy refused the change.
    Rejected,
}

/// Per-iteration state of one aura instance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuraState {
    active: bool,
    expires_at: SimTime,
    stacks: u32,
    generation: u64,
    gained_at: SimTime,
    uptime: SimTime,
    activations: u32,
}

impl Default for AuraState {
    fn default() -> Self {
        Self {
            active: false,
            expires_at: SimTime::ZERO,
            stacks: 0,
            generation: 0,
            gained_at: SimTime::ZERO,
            uptime: SimTime::ZERO,
            activations: 0,
        }
    }
}

impl AuraState {
    /// Whether the aura is active.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Expiration time; [`SimTime::NEVER`] for permanent auras. Meaningless
    /// while inactive.
    #[must_use]
    pub fn expires_at(&self) -> SimTime {
        self.expires_at
    }

    /// Current stacks (zero while inactive and for non-stacking auras).
    #[must_use]
    pub fn stacks(&self) -> u32 {
        self.stacks
    }

    /// Stack count used to scale modifiers: non-stacking auras count as one.
    #[must_use]
    pub fn effective_stacks(&self, def: &AuraDefinition) -> u32 {
        match (self.active, def.is_stacking()) {
            (false, _) => 0,
            (true, false) => 1,
            (true, true) => self.stacks,
        }
    }

    /// Generation of the current expiration.
    #[must_use]
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Number of Inactive -> Active transitions so far.
    #[must_use]
    pub fn activations(&self) -> u32 {
        self.activations
    }

    /// Time left until expiration; zero while inactive.
    #[must_use]
    pub fn remaining(&self, now: SimTime) -> SimTime {
        if self.active {
            self.expires_at - now
        } else {
            SimTime::ZERO
        }
    }

    /// Total active time, counting an ongoing activation up to `now`.
    #[must_use]
    pub fn uptime(&self, now: SimTime) -> SimTime {
        if self.active {
            self.uptime + (now - self.gained_at)
        } else {
            self.uptime
        }
    }

    /// Activates the aura, or applies the refresh policy when it is already
    /// active.
    pub fn activate(&mut self, def: &AuraDefinition, now: SimTime) -> Activation {
        if self.active {
            return self.refresh(def, now);
        }
        self.active = true;
        self.expires_at = def.duration.map_or(SimTime::NEVER, |d| now + d);
        self.stacks = u32::from(def.is_stacking());
        self.gained_at = now;
        self.activations += 1;
        self.generation += 1;
        Activation::Gained
    }

    /// Applies the refresh policy to an active aura. Stacks are untouched.
    ///
    /// Returns [`Activation::Rejected`] for inactive auras.
    pub fn refresh(&mut self, def: &AuraDefinition, now: SimTime) -> Activation {
        if !self.active {
            return Activation::Rejected;
        }
        let Some(duration) = def.duration else {
            return Activation::Refreshed;
        };
        match def.refresh {
            RefreshPolicy::Reset => self.expires_at = now + duration,
            RefreshPolicy::Extend { max_bonus } => {
                let cap = now + duration + max_bonus;
                self.expires_at = (self.expires_at + duration).min(cap);
            }
            RefreshPolicy::Reject => return Activation::Rejected,
        }
        self.generation += 1;
        Activation::Refreshed
    }

    /// Moves the expiration. Bumps the generation.
    pub fn set_expires_at(&mut self, at: SimTime) {
        self.expires_at = at;
        self.generation += 1;
    }

    /// Sets the stack count, clamped to `[0, max_stacks]`.
    ///
    /// Returns `(old, new)` when the count changed. Inactive and non-stacking
    /// auras are left untouched. Reaching zero does not expire the aura by
    /// itself; the caller does that so on-expire hooks run.
    pub fn set_stacks(&mut self, def: &AuraDefinition, stacks: u32) -> Option<(u32, u32)> {
        if !self.active || !def.is_stacking() {
            return None;
        }
        let new = stacks.min(def.max_stacks);
        let old = self.stacks;
        if new == old {
            return None;
        }
        self.stacks = new;
        Some((old, new))
    }

    /// Adds one stack (clamped).
    pub fn add_stack(&mut self, def: &AuraDefinition) -> Option<(u32, u32)> {
        self.set_stacks(def, self.stacks.saturating_add(1))
    }

    /// Removes one stack.
    pub fn remove_stack(&mut self, def: &AuraDefinition) -> Option<(u32, u32)> {
        self.set_stacks(def, self.stacks.saturating_sub(1))
    }

    /// Active -> Inactive. Returns `false` if the aura was not active.
    pub fn expire(&mut self, now: SimTime) -> bool {
        if !self.active {
            return false;
        }
        self.uptime += now - self.gained_at;
        self.active = false;
        self.stacks = 0;
        self.generation += 1;
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn secs(s: u64) -> SimTime {
        SimTime::from_secs(s)
    }

    mod refresh_tests {
        use super::*;

        #[test]
        fn reset_restarts_duration() {
            let def = AuraDefinition::new("Buff", Some(secs(10)));
            let mut state = AuraState::default();
            assert_eq!(state.activate(&def, secs(0)), Activation::Gained);
            assert_eq!(state.activate(&def, secs(4)), Activation::Refreshed);
            assert_eq!(state.expires_at(), secs(14));
        }

        #[test]
        fn extend_is_capped() {
            let def = AuraDefinition::new("Buff", Some(secs(10)))
                .with_refresh(RefreshPolicy::Extend { max_bonus: secs(5) });
            let mut state = AuraState::default();
            state.activate(&def, secs(0));
            state.activate(&def, secs(1));
            assert_eq!(state.expires_at(), secs(16));
            state.activate(&def, secs(2));
            assert_eq!(state.expires_at(), secs(17));
        }

        #[test]
        fn reject_leaves_state_alone() {
            let def = AuraDefinition::new("Buff", Some(secs(10))).with_refresh(RefreshPolicy::Reject);
            let mut state = AuraState::default();
            state.activate(&def, secs(0));
            let generation = state.generation();
            assert_eq!(state.activate(&def, secs(3)), Activation::Rejected);
            assert_eq!(state.expires_at(), secs(10));
            assert_eq!(state.generation(), generation);
        }

        #[test]
        fn refresh_on_inactive_is_rejected() {
            let def = AuraDefinition::new("Buff", Some(secs(10)));
            let mut state = AuraState::default();
            assert_eq!(state.refresh(&def, secs(0)), Activation::Rejected);
            assert!(!state.is_active());
        }
    }

    mod stack_tests {
        use super::*;

        #[test]
        fn stacking_aura_starts_at_one_and_clamps() {
            let def = AuraDefinition::new("Lacerate", Some(secs(15))).stacking(5);
            let mut state = AuraState::default();
            state.activate(&def, secs(0));
            assert_eq!(state.stacks(), 1);
            for _ in 0..10 {
                state.add_stack(&def);
            }
            assert_eq!(state.stacks(), 5);
            assert_eq!(state.add_stack(&def), None);
        }

        #[test]
        fn expire_clears_stacks_and_records_uptime() {
            let def = AuraDefinition::new("Lacerate", Some(secs(15))).stacking(5);
            let mut state = AuraState::default();
            state.activate(&def, secs(2));
            state.add_stack(&def);
            assert!(state.expire(secs(7)));
            assert_eq!(state.stacks(), 0);
            assert_eq!(state.uptime(secs(100)), secs(5));
            assert!(!state.expire(secs(8)));
        }

        #[test]
        fn non_stacking_counts_as_one() {
            let def = AuraDefinition::new("Buff", None);
            let mut state = AuraState::default();
            assert_eq!(state.effective_stacks(&def), 0);
            state.activate(&def, secs(0));
            assert_eq!(state.effective_stacks(&def), 1);
            assert_eq!(state.expires_at(), SimTime::NEVER);
        }
    }

    #[test]
    fn validate_rejects_linger_without_group() {
        let mut def = AuraDefinition::new("Seal", Some(secs(30)));
        def.linger = Some(SimTime::from_millis(400));
        assert!(def.validate().is_err());
        assert!(def.exclusive(1, Some(SimTime::from_millis(400))).validate().is_ok());
    }

    #[derive(Debug, Clone)]
    enum Op {
        Activate,
        AddStack,
        RemoveStack,
        SetStacks(u32),
        Expire,
        Advance(u64),
    }

    fn op() -> impl Strategy<Value = Op> {
        prop_oneof![
            Just(Op::Activate),
            Just(Op::AddStack),
            Just(Op::RemoveStack),
            (0u32..20).prop_map(Op::SetStacks),
            Just(Op::Expire),
            (0u64..3000).prop_map(Op::Advance),
        ]
    }

    proptest! {
        #[test]
        fn stacks_bounded_and_zero_while_inactive(
            max in 1u32..8,
            ops in prop::collection::vec(op(), 1..80),
        ) {
            let def = AuraDefinition::new("Stacker", Some(secs(10))).stacking(max);
            let mut state = AuraState::default();
            let mut now = SimTime::ZERO;
            for op in ops {
                match op {
                    Op::Activate => { state.activate(&def, now); }
                    Op::AddStack => { state.add_stack(&def); }
                    Op::RemoveStack => { state.remove_stack(&def); }
                    Op::SetStacks(n) => { state.set_stacks(&def, n); }
                    Op::Expire => { state.expire(now); }
                    Op::Advance(ms) => now += SimTime::from_millis(ms),
                }
                prop_assert!(state.stacks() <= max);
                if !state.is_active() {
                    prop_assert_eq!(state.stacks(), 0);
                }
            }
        }
    }
}
