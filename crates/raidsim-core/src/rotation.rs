//! Rotation contract.
//!
//! A [`Rotation`] decides what an idle actor does next. It reads the world
//! through a read-only [`RotationView`] and returns a [`Decision`]; it never
//! mutates state. The orchestrator executes the decision and, when the chosen
//! cast turns out not to be castable, simply asks again later.
//!
//! Decision *policy* is pluggable: [`PriorityRotation`] covers declarative
//! priority lists, and anything else implements the trait directly.
//!
//! # Example
//!
//! ```
//! use raidsim_core::rotation::{Decision, Rotation};
//! use raidsim_core::view::RotationView;
//! use raidsim_core::kit::SpellId;
//!
//! /// Casts the first spell whenever possible.
//! struct Spam;
//!
//! impl Rotation for Spam {
//!     fn label(&self) -> &str {
//!         "spam"
//!     }
//!
//!     fn next_action(&self, view: &RotationView<'_>) -> Decision {
//!         let spell = SpellId::new(0);
//!         if view.can_cast(spell) {
//!             Decision::cast(spell)
//!         } else {
//!             Decision::Idle
//!         }
//!     }
//! }
//! ```

use serde::{Deserialize, Serialize};

use crate::actor::ActorId;
use crate::effect::CastCondition;
use crate::kit::SpellId;
use crate::time::SimTime;
use crate::view::RotationView;

/// What an actor does next.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Decision {
    /// Cast a spell; `target` overrides the spell's default target.
    Cast {
        /// Spell from the actor's kit.
        spell: SpellId,
        /// Explicit target.
        target: Option<ActorId>,
    },
    /// Do nothing until the given time.
    WaitUntil(SimTime),
    /// Nothing to do; re-evaluate at the next wake time.
    Idle,
}

impl Decision {
    /// Cast on the spell's default target.
    #[must_use]
    pub const fn cast(spell: SpellId) -> Self {
        Self::Cast {
            spell,
            target: None,
        }
    }
}

/// Decision policy of one actor.
///
/// Implementations must be deterministic functions of the view: iterations
/// run on arbitrary worker threads and must reproduce exactly.
pub trait Rotation: Send + Sync {
    /// Short label used in logs.
    fn label(&self) -> &str;

    /// Chooses the next action.
    fn next_action(&self, view: &RotationView<'_>) -> Decision;
}

/// One entry of a priority list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriorityEntry {
    /// Spell to cast.
    pub spell: SpellId,
    /// Extra conditions on top of castability.
    pub conditions: Vec<CastCondition>,
}

impl PriorityEntry {
    /// An unconditional entry.
    #[must_use]
    pub fn new(spell: SpellId) -> Self {
        Self {
            spell,
            conditions: Vec::new(),
        }
    }

    /// Adds a condition.
    #[must_use]
    pub fn when(mut self, condition: CastCondition) -> Self {
        self.conditions.push(condition);
        self
    }
}

/// Casts the first entry whose conditions hold and whose spell is castable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriorityRotation {
    /// Label for logs.
    pub label: String,
    /// Entries, highest priority first.
    pub entries: Vec<PriorityEntry>,
}

impl PriorityRotation {
    /// An empty priority list.
    #[must_use]
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            entries: Vec::new(),
        }
    }

    /// Appends an entry.
    #[must_use]
    pub fn then(mut self, entry: PriorityEntry) -> Self {
        self.entries.push(entry);
        self
    }

    /// Appends an unconditional entry.
    #[must_use]
    pub fn then_cast(self, spell: SpellId) -> Self {
        self.then(PriorityEntry::new(spell))
    }
}

impl Rotation for PriorityRotation {
    fn label(&self) -> &str {
        &self.label
    }

    fn next_action(&self, view: &RotationView<'_>) -> Decision {
        self.entries
            .iter()
            .find(|entry| {
                entry.conditions.iter().all(|c| view.condition_holds(c)) && view.can_cast(entry.spell)
            })
            .map_or(Decision::Idle, |entry| Decision::cast(entry.spell))
    }
}
