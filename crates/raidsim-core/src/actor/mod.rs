//! Actors: players and targets.
//!
//! An [`Actor`] is rebuilt from the immutable spec at the start of every
//! iteration and dropped at its end. Cross-actor references are handles:
//! auras and dots on a bearer are keyed by the applier's [`ActorId`] plus a
//! handle into the applier's kit, and the actor-owned slots (exclusive aura
//! groups, the swing queue) hold handles resolved by lookup.
//!
//! - [`ActorId`]: index of the actor in its simulation
//! - [`Actor`]: all per-iteration state of one actor
//! - [`components`]: weapon and defense data

pub mod components;

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

pub use components::{DefenseStats, SwingResourceGain, Weapon, AP_PER_DPS};

use crate::aura::{AuraKey, AuraState};
use crate::dot::{DotKey, DotState};
use crate::kit::{Kit, SpellId};
use crate::metrics::{AbilityKey, AbilityMetrics};
use crate::resource::ResourceSet;
use crate::rotation::Rotation;
use crate::spell::SpellState;
use crate::stat::{Stat, StatDependency, Stats};
use crate::time::SimTime;

/// Identifier of an actor within one simulation.
///
/// Players are numbered first, in raid order, followed by targets in
/// encounter order.
///
/// # Example
///
/// ```
/// use raidsim_core::actor::ActorId;
///
/// let id = ActorId::new(2);
/// assert_eq!(id.index(), 2);
/// assert!(ActorId::new(1) < id);
/// ```
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ActorId(u32);

impl ActorId {
    /// Creates an id from a raw index.
    #[must_use]
    pub const fn new(id: u32) -> Self {
        Self(id)
    }

    /// Position in the simulation's actor table.
    #[must_use]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Debug for ActorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ActorId({})", self.0)
    }
}

impl fmt::Display for ActorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Side an actor is on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ActorKind {
    /// A raid member with a rotation.
    Player,
    /// An encounter target.
    Target,
}

/// A cast in progress.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PendingCast {
    /// Spell being cast.
    pub spell: SpellId,
    /// Its target.
    pub target: ActorId,
    /// Resource consumed when the cast started.
    pub consumed: f64,
    /// When the cast completes.
    pub completes_at: SimTime,
}

/// All per-iteration state of one actor.
pub struct Actor {
    pub(crate) id: ActorId,
    pub(crate) name: String,
    pub(crate) kind: ActorKind,
    pub(crate) kit: Arc<Kit>,
    pub(crate) base_stats: Stats,
    pub(crate) dependencies: Vec<StatDependency>,
    /// Effective stats: base plus aura bonuses, through dependencies.
    pub(crate) stats: Stats,
    pub(crate) defense: DefenseStats,
    pub(crate) weapon: Option<Weapon>,
    pub(crate) swing_gain: Option<SwingResourceGain>,
    pub(crate) resources: ResourceSet,
    pub(crate) auras: BTreeMap<AuraKey, AuraState>,
    pub(crate) dots: BTreeMap<DotKey, DotState>,
    pub(crate) spells: Vec<SpellState>,
    pub(crate) gcd_ready_at: SimTime,
    pub(crate) casting: Option<PendingCast>,
    pub(crate) next_swing_at: Option<SimTime>,
    /// Swing queue slot.
    pub(crate) queued_swing: Option<SpellId>,
    /// Exclusivity group slots.
    pub(crate) exclusive: BTreeMap<u16, AuraKey>,
    pub(crate) rotation: Option<Arc<dyn Rotation>>,
    pub(crate) ready_generation: u64,
    pub(crate) primary_target: Option<ActorId>,
    pub(crate) damage_done: f64,
    pub(crate) healing_done: f64,
    pub(crate) damage_taken: f64,
    pub(crate) tally: BTreeMap<AbilityKey, AbilityMetrics>,
}

impl fmt::Debug for Actor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Actor")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("kind", &self.kind)
            .field("stats", &self.stats)
            .field("resources", &self.resources)
            .field("auras", &self.auras.len())
            .field("dots", &self.dots.len())
            .field("casting", &self.casting)
            .field(
                "rotation",
                &self.rotation.as_ref().map(|r| r.label().to_string()),
            )
            .finish_non_exhaustive()
    }
}

impl Actor {
    /// Creates an actor with empty runtime state.
    #[must_use]
    pub(crate) fn new(id: ActorId, name: String, kind: ActorKind, kit: Arc<Kit>) -> Self {
        let spells = vec![SpellState::default(); kit.spell_count()];
        Self {
            id,
            name,
            kind,
            kit,
            base_stats: Stats::new(),
            dependencies: Vec::new(),
            stats: Stats::new(),
            defense: DefenseStats::default(),
            weapon: None,
            swing_gain: None,
            resources: ResourceSet::default(),
            auras: BTreeMap::new(),
            dots: BTreeMap::new(),
            spells,
            gcd_ready_at: SimTime::ZERO,
            casting: None,
            next_swing_at: None,
            queued_swing: None,
            exclusive: BTreeMap::new(),
            rotation: None,
            ready_generation: 0,
            primary_target: None,
            damage_done: 0.0,
            healing_done: 0.0,
            damage_taken: 0.0,
            tally: BTreeMap::new(),
        }
    }

    /// Identifier.
    #[must_use]
    pub fn id(&self) -> ActorId {
        self.id
    }

    /// Display name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Player or target.
    #[must_use]
    pub fn kind(&self) -> ActorKind {
        self.kind
    }

    /// Definition tables.
    #[must_use]
    pub fn kit(&self) -> &Kit {
        &self.kit
    }

    /// Effective stats.
    #[must_use]
    pub fn stats(&self) -> &Stats {
        &self.stats
    }

    /// One effective stat.
    #[must_use]
    pub fn stat(&self, stat: Stat) -> f64 {
        self.stats[stat]
    }

    /// Defensive stats.
    #[must_use]
    pub fn defense(&self) -> &DefenseStats {
        &self.defense
    }

    /// Resource pools.
    #[must_use]
    pub fn resources(&self) -> &ResourceSet {
        &self.resources
    }

    /// State of an aura instance on this actor.
    #[must_use]
    pub fn aura(&self, key: AuraKey) -> Option<&AuraState> {
        self.auras.get(&key)
    }

    /// Whether an aura instance is active on this actor.
    #[must_use]
    pub fn aura_active(&self, key: AuraKey) -> bool {
        self.auras.get(&key).is_some_and(AuraState::is_active)
    }

    /// State of a dot instance on this actor.
    #[must_use]
    pub fn dot(&self, key: DotKey) -> Option<&DotState> {
        self.dots.get(&key)
    }

    /// Runtime state of one of this actor's spells.
    #[must_use]
    pub fn spell_state(&self, spell: SpellId) -> Option<&SpellState> {
        self.spells.get(spell.index())
    }

    /// End of the running global cooldown.
    #[must_use]
    pub fn gcd_ready_at(&self) -> SimTime {
        self.gcd_ready_at
    }

    /// Cast in progress.
    #[must_use]
    pub fn casting(&self) -> Option<&PendingCast> {
        self.casting.as_ref()
    }

    /// Spell waiting in the swing queue slot.
    #[must_use]
    pub fn queued_swing(&self) -> Option<SpellId> {
        self.queued_swing
    }

    /// Aura currently holding an exclusivity group.
    #[must_use]
    pub fn exclusive_slot(&self, group: u16) -> Option<AuraKey> {
        self.exclusive.get(&group).copied()
    }

    /// Primary target.
    #[must_use]
    pub fn primary_target(&self) -> Option<ActorId> {
        self.primary_target
    }

    /// Damage dealt so far.
    #[must_use]
    pub fn damage_done(&self) -> f64 {
        self.damage_done
    }

    /// Damage taken so far.
    #[must_use]
    pub fn damage_taken(&self) -> f64 {
        self.damage_taken
    }

    /// Ability tally entry, created on first use.
    pub(crate) fn tally_mut(&mut self, key: AbilityKey) -> &mut AbilityMetrics {
        self.tally.entry(key).or_default()
    }

    /// Invalidates any pending wake-up and returns the new generation.
    pub(crate) fn next_ready_generation(&mut self) -> u64 {
        self.ready_generation += 1;
        self.ready_generation
    }
}
