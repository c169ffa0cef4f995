//! Event clock and action queue.
//!
//! Pending work is a tagged [`Action`] value ordered by `(time, sequence)`.
//! The sequence number is assigned at scheduling, so actions due at the same
//! instant run in the order they were scheduled. The clock only moves when
//! [`ActionQueue::pop_next`] dequeues the earliest entry.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use crate::actor::ActorId;
use crate::aura::AuraKey;
use crate::dot::DotKey;
use crate::effect::{EffectHook, HookContext};
use crate::error::{SimError, SimResult};
use crate::resource::ResourceKind;
use crate::time::SimTime;

/// A unit of deferred work.
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    /// Ask the actor's rotation what to do. Stale generations are ignored.
    ActorReady {
        /// Actor to wake.
        actor: ActorId,
        /// Wake-up generation at scheduling time.
        generation: u64,
    },
    /// The actor's pending cast finishes.
    CastComplete {
        /// Casting actor.
        actor: ActorId,
    },
    /// Expiration check of an aura.
    AuraExpire {
        /// Bearer.
        bearer: ActorId,
        /// Aura instance.
        key: AuraKey,
        /// Aura generation at scheduling time.
        generation: u64,
    },
    /// A periodic tick.
    DotTick {
        /// Bearer.
        bearer: ActorId,
        /// Dot instance.
        key: DotKey,
        /// Tick-chain generation at scheduling time.
        generation: u64,
    },
    /// Per-tick resource regeneration.
    ResourceTick {
        /// Pool owner.
        actor: ActorId,
        /// Pool.
        kind: ResourceKind,
    },
    /// An auto-attack swing.
    AutoAttack {
        /// Swinging actor.
        actor: ActorId,
    },
    /// A hook deferred by the re-entrancy rule or a delay.
    Hook {
        /// Actors the hook runs against.
        ctx: HookContext,
        /// The hook.
        hook: EffectHook,
    },
}

impl Action {
    /// Stable small code identifying the action kind, for trace digests.
    #[must_use]
    pub const fn kind_code(&self) -> u8 {
        match self {
            Self::ActorReady { .. } => 0,
            Self::CastComplete { .. } => 1,
            Self::AuraExpire { .. } => 2,
            Self::DotTick { .. } => 3,
            Self::ResourceTick { .. } => 4,
            Self::AutoAttack { .. } => 5,
            Self::Hook { .. } => 6,
        }
    }

    /// Actor primarily affected by the action.
    #[must_use]
    pub const fn actor(&self) -> ActorId {
        match self {
            Self::ActorReady { actor, .. }
            | Self::CastComplete { actor }
            | Self::ResourceTick { actor, .. }
            | Self::AutoAttack { actor } => *actor,
            Self::AuraExpire { bearer, .. } | Self::DotTick { bearer, .. } => *bearer,
            Self::Hook { ctx, .. } => ctx.caster,
        }
    }
}

/// Heap entry; ordered so the `BinaryHeap` pops the smallest `(at, seq)`.
#[derive(Debug)]
struct Entry {
    at: SimTime,
    seq: u64,
    action: Action,
}

impl PartialEq for Entry {
    fn eq(&self, other: &Self) -> bool {
        self.at == other.at && self.seq == other.seq
    }
}

impl Eq for Entry {}

impl PartialOrd for Entry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Entry {
    fn cmp(&self, other: &Self) -> Ordering {
        // reversed: BinaryHeap is a max-heap
        (other.at, other.seq).cmp(&(self.at, self.seq))
    }
}

/// The simulation clock plus its pending actions.
///
/// # Example
///
/// ```
/// use raidsim_core::actor::ActorId;
/// use raidsim_core::queue::{Action, ActionQueue};
/// use raidsim_core::time::SimTime;
///
/// let mut queue = ActionQueue::new();
/// let a = ActorId::new(0);
/// queue.schedule(SimTime::from_secs(2), Action::CastComplete { actor: a }).unwrap();
/// queue.schedule(SimTime::from_secs(1), Action::AutoAttack { actor: a }).unwrap();
///
/// let (at, action) = queue.pop_next(SimTime::from_secs(10)).unwrap();
/// assert_eq!(at, SimTime::from_secs(1));
/// assert_eq!(action, Action::AutoAttack { actor: a });
/// assert_eq!(queue.now(), SimTime::from_secs(1));
/// ```
#[derive(Debug, Default)]
pub struct ActionQueue {
    now: SimTime,
    next_seq: u64,
    heap: BinaryHeap<Entry>,
}

impl ActionQueue {
    /// An empty queue at time zero.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Current simulated time.
    #[must_use]
    pub fn now(&self) -> SimTime {
        self.now
    }

    /// Number of pending actions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.heap.len()
    }

    /// Whether nothing is pending.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    /// Time of the earliest pending action.
    #[must_use]
    pub fn peek_time(&self) -> Option<SimTime> {
        self.heap.peek().map(|e| e.at)
    }

    /// Enqueues `action` at `at`.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::ScheduledInPast`] when `at` is before the clock.
    pub fn schedule(&mut self, at: SimTime, action: Action) -> SimResult<()> {
        if at < self.now {
            return Err(SimError::ScheduledInPast { now: self.now, at });
        }
        let seq = self.next_seq;
        self.next_seq += 1;
        self.heap.push(Entry { at, seq, action });
        Ok(())
    }

    /// Enqueues `action` `delay` after the current time.
    ///
    /// # Errors
    ///
    /// Never fails in practice; kept fallible to share [`Self::schedule`].
    pub fn schedule_in(&mut self, delay: SimTime, action: Action) -> SimResult<()> {
        self.schedule(self.now + delay, action)
    }

    /// Dequeues the earliest action due at or before `end`, advancing the
    /// clock to its time.
    pub fn pop_next(&mut self, end: SimTime) -> Option<(SimTime, Action)> {
        if self.heap.peek()?.at > end {
            return None;
        }
        let entry = self.heap.pop()?;
        self.now = entry.at;
        Some((entry.at, entry.action))
    }
}
