//! Execution log and trace digest.
//!
//! The [`TraceDigest`] folds every executed action into a 64-bit hash and is
//! always on; it is how determinism is asserted cheaply. The [`EventLog`] is
//! an optional structured record of what happened, for diagnostics.
//!
//! # Example
//!
//! ```
//! use raidsim_core::actor::ActorId;
//! use raidsim_core::log::{EventLog, LogEvent, TraceDigest};
//! use raidsim_core::resource::ResourceKind;
//! use raidsim_core::time::SimTime;
//!
//! let mut log = EventLog::enabled();
//! log.record(SimTime::ZERO, ActorId::new(0), LogEvent::ResourceGained {
//!     kind: ResourceKind::Rage,
//!     amount: 10.0,
//! });
//! assert_eq!(log.len(), 1);
//!
//! let mut a = TraceDigest::new();
//! let mut b = TraceDigest::new();
//! a.record(SimTime::from_secs(1), 3, Some(ActorId::new(0)));
//! b.record(SimTime::from_secs(1), 3, Some(ActorId::new(0)));
//! assert_eq!(a.finish(), b.finish());
//! ```

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};

use crate::actor::ActorId;
use crate::error::CastFailure;
use crate::kit::{AuraId, DotId, SpellId};
use crate::outcome::HitOutcome;
use crate::resource::ResourceKind;
use crate::time::SimTime;

// =============================================================================
// Trace Digest
// =============================================================================

/// Running hash over (time, action kind, actor) of every executed action.
///
/// `DefaultHasher::new()` uses fixed keys, so the digest is stable across
/// runs and processes of the same build.
#[derive(Debug, Clone)]
pub struct TraceDigest {
    hasher: DefaultHasher,
    count: u64,
}

impl Default for TraceDigest {
    fn default() -> Self {
        Self::new()
    }
}

impl TraceDigest {
    /// An empty digest.
    #[must_use]
    pub fn new() -> Self {
        Self {
            hasher: DefaultHasher::new(),
            count: 0,
        }
    }

    /// Folds one executed action in.
    pub fn record(&mut self, at: SimTime, kind: u8, actor: Option<ActorId>) {
        at.hash(&mut self.hasher);
        kind.hash(&mut self.hasher);
        actor.hash(&mut self.hasher);
        self.count += 1;
    }

    /// Actions folded so far.
    #[must_use]
    pub fn count(&self) -> u64 {
        self.count
    }

    /// Current digest value.
    #[must_use]
    pub fn finish(&self) -> u64 {
        self.hasher.finish()
    }
}

/// Combines per-iteration digests in index order into one run digest.
#[must_use]
pub fn combine_digests(digests: impl IntoIterator<Item = u64>) -> u64 {
    let mut hasher = DefaultHasher::new();
    for digest in digests {
        digest.hash(&mut hasher);
    }
    hasher.finish()
}

// =============================================================================
// Event Log
// =============================================================================

/// Something worth recording.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum LogEvent {
    /// A cast began.
    CastStarted {
        /// Spell handle.
        spell: SpellId,
        /// Target.
        target: ActorId,
        /// When the cast completes.
        completes_at: SimTime,
    },
    /// A rotation chose a spell that could not be cast.
    CastFailed {
        /// Spell handle.
        spell: SpellId,
        /// Why.
        reason: CastFailure,
    },
    /// A cast resolved.
    SpellResolved {
        /// Spell handle.
        spell: SpellId,
        /// Target.
        target: ActorId,
        /// Outcome.
        outcome: HitOutcome,
        /// Damage or healing dealt.
        amount: f64,
    },
    /// A periodic tick.
    DotTick {
        /// Dot handle of the caster.
        dot: DotId,
        /// Bearer.
        target: ActorId,
        /// Magnitude.
        amount: f64,
        /// Whether the tick crit.
        crit: bool,
    },
    /// An auto-attack swing.
    Swing {
        /// Target.
        target: ActorId,
        /// Outcome.
        outcome: HitOutcome,
        /// Damage.
        amount: f64,
    },
    /// An aura became active on the logging actor (the bearer).
    AuraGained {
        /// Actor whose kit defines the aura.
        owner: ActorId,
        /// Aura handle.
        aura: AuraId,
    },
    /// An active aura was refreshed.
    AuraRefreshed {
        /// Actor whose kit defines the aura.
        owner: ActorId,
        /// Aura handle.
        aura: AuraId,
        /// New expiration.
        expires_at: SimTime,
    },
    /// Stack count changed.
    AuraStacks {
        /// Actor whose kit defines the aura.
        owner: ActorId,
        /// Aura handle.
        aura: AuraId,
        /// New stack count.
        stacks: u32,
    },
    /// An aura expired or was removed.
    AuraExpired {
        /// Actor whose kit defines the aura.
        owner: ActorId,
        /// Aura handle.
        aura: AuraId,
    },
    /// Resource gained.
    ResourceGained {
        /// Pool.
        kind: ResourceKind,
        /// Amount after the cap.
        amount: f64,
    },
    /// Resource spent on a cast.
    ResourceSpent {
        /// Pool.
        kind: ResourceKind,
        /// Amount.
        amount: f64,
    },
    /// Resource refunded after a miss.
    ResourceRefunded {
        /// Pool.
        kind: ResourceKind,
        /// Amount.
        amount: f64,
    },
}

/// One log line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEntry {
    /// Simulated time.
    pub at: SimTime,
    /// Actor the event is about.
    pub actor: ActorId,
    /// What happened.
    pub event: LogEvent,
}

/// Optional structured execution log.
///
/// When disabled, [`record`](Self::record) is a no-op so call sites never
/// need to check.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EventLog {
    enabled: bool,
    entries: Vec<LogEntry>,
}

impl EventLog {
    /// A log that records.
    #[must_use]
    pub fn enabled() -> Self {
        Self {
            enabled: true,
            entries: Vec::new(),
        }
    }

    /// A log that discards everything.
    #[must_use]
    pub fn disabled() -> Self {
        Self::default()
    }

    /// Whether entries are kept.
    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Appends an entry if enabled.
    pub fn record(&mut self, at: SimTime, actor: ActorId, event: LogEvent) {
        if self.enabled {
            self.entries.push(LogEntry { at, actor, event });
        }
    }

    /// Entries in execution order.
    #[must_use]
    pub fn entries(&self) -> &[LogEntry] {
        &self.entries
    }

    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no entry was recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries about one actor.
    pub fn for_actor(&self, actor: ActorId) -> impl Iterator<Item = &LogEntry> {
        self.entries.iter().filter(move |e| e.actor == actor)
    }
}
